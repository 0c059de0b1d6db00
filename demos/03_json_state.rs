/// json state - persist a loan and its ledger, then restore them
use loan_ledger_rs::serialization::{ledger_from_json, ledger_to_json, loan_from_json, loan_to_json};
use loan_ledger_rs::{
    BalanceEngine, InMemoryLoanRepository, LedgerService, LoanAccount, LoanView, Money,
};
use chrono::Utc;
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let service = LedgerService::with_defaults(InMemoryLoanRepository::new());
    let loan = LoanAccount::builder()
        .borrower("client-7")
        .principal(Money::from_decimal(dec!(1500.50)))
        .flat_rate_percent(dec!(12.5))
        .issued_at(Utc::now())
        .term_days(90)
        .build()?;
    let id = service.open_loan(loan)?;
    service.register_payment_with_reference(id, Money::from_major(500), Utc::now(), "REC-001")?;

    let loan_json = loan_to_json(&service.loan(id)?)?;
    let ledger_json = ledger_to_json(&service.ledger(id)?)?;
    println!("loan:   {}", loan_json);
    println!("ledger: {}", ledger_json);

    let loan = loan_from_json(&loan_json)?;
    let ledger = ledger_from_json(loan.id, &ledger_json)?;
    let view = LoanView::build(&loan, &ledger, &BalanceEngine::default(), Utc::now());
    println!("\n{}", view.to_json_pretty()?);

    Ok(())
}
