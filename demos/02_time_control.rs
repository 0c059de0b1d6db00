/// time control - drive overdue detection with a controlled clock
use loan_ledger_rs::{
    InMemoryLoanRepository, LedgerService, LoanAccount, Money, SafeTimeProvider, TimeSource,
};
use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== time control example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let service = LedgerService::with_defaults(InMemoryLoanRepository::new());
    let loan = LoanAccount::builder()
        .principal(Money::from_major(5_000))
        .flat_rate_percent(dec!(12))
        .moratory_rate_percent(dec!(36.5))
        .issued_at(time.now())
        .term_days(60)
        .build()?;
    let id = service.open_loan(loan)?;
    service.approve(id, time.now())?;
    println!("loan issued on {}", time.now().format("%Y-%m-%d"));

    controller.advance(Duration::days(30));
    service.register_payment_now(id, Money::from_major(2_000), &time)?;
    println!("paid 2000 on {}, status {}", time.now().format("%Y-%m-%d"), service.status(id)?);

    // skip past the due date
    controller.advance(Duration::days(45));
    for change in service.refresh_all(&time)? {
        println!("{}: {} -> {} ({})", change.at.format("%Y-%m-%d"), change.from, change.to, change.reason);
    }

    let summary = service.balance_summary(id, time.now())?;
    println!("\nremaining:         {}", summary.remaining_balance);
    println!("days past due:     {}", summary.days_past_due);
    println!("moratory interest: {}", summary.moratory.interest_amount);

    service.register_payment_now(id, summary.remaining_balance, &time)?;
    println!("\nfinal status: {}", service.status(id)?);

    Ok(())
}
