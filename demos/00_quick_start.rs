/// quick start - open a loan, take a payment, print the balance
use loan_ledger_rs::{InMemoryLoanRepository, LedgerService, LoanAccount, Money};
use chrono::Utc;
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let service = LedgerService::with_defaults(InMemoryLoanRepository::new());

    // $1,000 at 10% flat, due in 30 days
    let loan = LoanAccount::builder()
        .borrower("client-1")
        .principal(Money::from_major(1_000))
        .flat_rate_percent(dec!(10))
        .issued_at(Utc::now())
        .term_days(30)
        .build()?;
    let id = service.open_loan(loan)?;
    service.approve(id, Utc::now())?;

    service.register_payment(id, Money::from_major(250), Utc::now())?;

    println!("total owed: {}", service.total_owed(id)?);
    println!("remaining:  {}", service.remaining_balance(id)?);
    println!("status:     {}", service.status(id)?);

    Ok(())
}
