use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate, MAX_RATE_PERCENT};
use crate::errors::{LedgerError, Result};

/// longest term a quote may span (100 years)
pub const MAX_TERM_MONTHS: u32 = 1_200;

/// fixed-installment repayment quote for a prospective loan
///
/// Transient: produced on demand for the loan simulator and never attached
/// to a persisted loan account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationQuote {
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub monthly_installment: Money,
    pub total_payable: Money,
    pub total_interest: Money,
}

/// one month of an amortization schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    pub number: u32,
    pub due_date: DateTime<Utc>,
    pub opening_balance: Money,
    pub installment: Money,
    pub interest_portion: Money,
    pub principal_portion: Money,
    pub closing_balance: Money,
}

/// month-by-month breakdown of a quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub quote: AmortizationQuote,
    pub installments: Vec<ScheduledInstallment>,
    pub total_interest: Money,
    pub total_paid: Money,
}

/// stateless quoting engine
#[derive(Debug, Clone, Copy, Default)]
pub struct AmortizationQuoter;

impl AmortizationQuoter {
    pub fn new() -> Self {
        Self
    }

    /// quote a fixed monthly installment
    ///
    /// `annual_rate_percent` is a percentage (12 means 12% a year). All
    /// intermediate terms keep full precision; only the installment is
    /// rounded half-up to cents, and the totals follow from it.
    ///
    /// `total_interest` is floored at zero: a zero-rate installment rounded
    /// down (1000 over 3 months is 333.33) would otherwise report -0.01.
    pub fn quote(
        &self,
        principal: Money,
        annual_rate_percent: Decimal,
        term_months: u32,
    ) -> Result<AmortizationQuote> {
        validate_inputs(principal, annual_rate_percent, term_months)?;

        let annual_rate = Rate::from_percent_decimal(annual_rate_percent);
        let raw_installment = raw_installment(principal.as_decimal(), annual_rate, term_months)?;

        let monthly_installment = Money::from_decimal(raw_installment).round_cents();
        let total_payable = (monthly_installment * Decimal::from(term_months)).round_cents();
        // a zero-rate quote can undershoot the principal by sub-cent residue
        let total_interest = total_payable.saturating_sub(principal).round_cents();

        Ok(AmortizationQuote {
            principal,
            annual_rate,
            term_months,
            monthly_installment,
            total_payable,
            total_interest,
        })
    }

    /// expand a quote into its monthly schedule, first installment one
    /// month after `start_date`
    pub fn schedule(
        &self,
        quote: &AmortizationQuote,
        start_date: DateTime<Utc>,
    ) -> Result<AmortizationSchedule> {
        // quotes are plain data and may have been built by hand
        validate_inputs(quote.principal, quote.annual_rate.as_percentage(), quote.term_months)?;
        let monthly_rate = quote.annual_rate.monthly_rate().as_decimal();

        let mut installments = Vec::with_capacity(quote.term_months as usize);
        let mut balance = quote.principal;

        for number in 1..=quote.term_months {
            let due_date = start_date
                .checked_add_months(Months::new(number))
                .ok_or_else(|| LedgerError::InvalidQuoteInput {
                    message: format!("schedule date out of range at installment {}", number),
                })?;

            let interest_portion = Money::from_decimal(balance.as_decimal() * monthly_rate).round_cents();
            let is_last = number == quote.term_months;

            // the final row clears whatever rounding residue is left
            let (installment, principal_portion) = if is_last {
                (balance + interest_portion, balance)
            } else {
                let principal_portion = (quote.monthly_installment - interest_portion).min(balance);
                (principal_portion + interest_portion, principal_portion)
            };

            let closing_balance = balance.saturating_sub(principal_portion);

            installments.push(ScheduledInstallment {
                number,
                due_date,
                opening_balance: balance,
                installment,
                interest_portion,
                principal_portion,
                closing_balance,
            });

            balance = closing_balance;
        }

        let total_interest = installments.iter().map(|row| row.interest_portion).sum();
        let total_paid = installments.iter().map(|row| row.installment).sum();

        Ok(AmortizationSchedule {
            quote: quote.clone(),
            installments,
            total_interest,
            total_paid,
        })
    }
}

/// quote with the default quoter
pub fn quote(principal: Money, annual_rate_percent: Decimal, term_months: u32) -> Result<AmortizationQuote> {
    AmortizationQuoter::new().quote(principal, annual_rate_percent, term_months)
}

fn validate_inputs(principal: Money, annual_rate_percent: Decimal, term_months: u32) -> Result<()> {
    if !principal.is_positive() || principal.exceeds_max_amount() {
        return Err(LedgerError::InvalidQuoteInput {
            message: format!("principal must be positive and within limits, got {}", principal),
        });
    }
    if annual_rate_percent < Decimal::ZERO {
        return Err(LedgerError::InvalidQuoteInput {
            message: format!("annual rate must not be negative, got {}", annual_rate_percent),
        });
    }
    if annual_rate_percent > Decimal::from(MAX_RATE_PERCENT) {
        return Err(LedgerError::InvalidQuoteInput {
            message: format!("annual rate {}% exceeds the maximum of {}%", annual_rate_percent, MAX_RATE_PERCENT),
        });
    }
    if term_months == 0 || term_months > MAX_TERM_MONTHS {
        return Err(LedgerError::InvalidQuoteInput {
            message: format!("term must be between 1 and {} months, got {}", MAX_TERM_MONTHS, term_months),
        });
    }
    Ok(())
}

/// unrounded annuity installment
fn raw_installment(principal: Decimal, annual_rate: Rate, months: u32) -> Result<Decimal> {
    let r = annual_rate.monthly_rate().as_decimal();

    if r.is_zero() {
        return Ok(principal / Decimal::from(months));
    }

    // installment = P * r * (1 + r)^n / ((1 + r)^n - 1)
    let overflow = || LedgerError::InvalidQuoteInput {
        message: format!("rate {} over {} months exceeds decimal range", annual_rate, months),
    };

    let base = Decimal::ONE + r;
    let mut compound = Decimal::ONE;
    for _ in 0..months {
        compound = compound.checked_mul(base).ok_or_else(overflow)?;
    }

    let numerator = principal
        .checked_mul(r)
        .and_then(|v| v.checked_mul(compound))
        .ok_or_else(overflow)?;
    let denominator = compound - Decimal::ONE;

    numerator.checked_div(denominator).ok_or_else(overflow)
}
