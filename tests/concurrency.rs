use std::sync::Arc;
use std::thread;

use chrono::{TimeZone, Utc};
use loan_ledger_rs::{
    InMemoryLoanRepository, LedgerError, LedgerService, LoanAccount, LoanStatus, Money,
};
use rust_decimal_macros::dec;

#[test]
fn concurrent_payments_never_overdraw() {
    let issued = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let service = Arc::new(LedgerService::with_defaults(InMemoryLoanRepository::new()));

    let loan = LoanAccount::builder()
        .principal(Money::from_major(1_000))
        .flat_rate_percent(dec!(10))
        .issued_at(issued)
        .term_days(30)
        .build()
        .unwrap();
    let loan_id = service.open_loan(loan).unwrap();
    service.approve(loan_id, issued).unwrap();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                let mut accepted = Money::ZERO;
                for _ in 0..20 {
                    match service.register_payment(loan_id, Money::from_major(7), issued) {
                        Ok(entry) => accepted += entry.amount(),
                        Err(LedgerError::Overpayment { remaining, .. }) => {
                            assert!(remaining < Money::from_major(7));
                        }
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
                accepted
            })
        })
        .collect();

    let accepted: Money = handles.into_iter().map(|h| h.join().unwrap()).sum();

    // 157 x 7.00 fit into 1100.00
    assert_eq!(accepted, Money::from_major(1_099));
    assert_eq!(service.ledger(loan_id).unwrap().len(), 157);
    assert_eq!(service.remaining_balance(loan_id).unwrap(), Money::ONE);
    assert_eq!(service.status(loan_id).unwrap(), LoanStatus::Approved);

    service.register_payment(loan_id, Money::ONE, issued).unwrap();
    assert_eq!(service.remaining_balance(loan_id).unwrap(), Money::ZERO);
    assert_eq!(service.status(loan_id).unwrap(), LoanStatus::Paid);
}

#[test]
fn loans_do_not_block_each_other() {
    let issued = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let service = Arc::new(LedgerService::with_defaults(InMemoryLoanRepository::new()));

    let ids: Vec<_> = (0..8)
        .map(|_| {
            let loan = LoanAccount::builder()
                .principal(Money::from_major(100))
                .issued_at(issued)
                .term_days(15)
                .build()
                .unwrap();
            service.open_loan(loan).unwrap()
        })
        .collect();

    let handles: Vec<_> = ids
        .iter()
        .copied()
        .map(|id| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..10 {
                    service.register_payment(id, Money::from_major(10), issued).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for id in ids {
        assert_eq!(service.remaining_balance(id).unwrap(), Money::ZERO);
        assert_eq!(service.status(id).unwrap(), LoanStatus::Paid);
    }
}
