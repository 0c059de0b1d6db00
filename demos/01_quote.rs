/// quote - simulate a fixed-installment loan and print its schedule
use loan_ledger_rs::{AmortizationQuoter, Money};
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== quote example ===\n");

    let quoter = AmortizationQuoter::new();
    let quote = quoter.quote(Money::from_major(1_000), dec!(12), 12)?;

    println!("monthly installment: {}", quote.monthly_installment);
    println!("total payable:       {}", quote.total_payable);
    println!("total interest:      {}", quote.total_interest);

    let start = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
    let schedule = quoter.schedule(&quote, start)?;

    println!("\n{:>3}  {:<10}  {:>10}  {:>9}  {:>9}  {:>10}", "#", "due", "payment", "interest", "principal", "balance");
    for row in &schedule.installments {
        println!(
            "{:>3}  {:<10}  {:>10}  {:>9}  {:>9}  {:>10}",
            row.number,
            row.due_date.format("%Y-%m-%d"),
            row.installment,
            row.interest_portion,
            row.principal_portion,
            row.closing_balance,
        );
    }

    Ok(())
}
