use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::decimal::{Money, Rate, MAX_AMOUNT_MAJOR, MAX_RATE_PERCENT};
use crate::errors::{LedgerError, Result};
use crate::types::{LoanId, LoanStatus};

/// persisted record of a loan
///
/// Status is read through [`LoanAccount::status`] and only written by the
/// status state machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanAccount {
    pub id: LoanId,
    pub borrower: String,
    pub principal: Money,
    /// one-time interest charged on the principal at issuance
    pub flat_interest_rate: Rate,
    /// annual rate for overdue balances
    pub moratory_rate: Rate,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    status: LoanStatus,
    last_status_change: DateTime<Utc>,
}

impl LoanAccount {
    pub fn builder() -> LoanAccountBuilder {
        LoanAccountBuilder::new()
    }

    /// rebuild a loan from stored parts, re-checking every invariant
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: LoanId,
        borrower: String,
        principal: Money,
        flat_interest_rate: Rate,
        moratory_rate: Rate,
        issued_at: DateTime<Utc>,
        due_at: DateTime<Utc>,
        status: LoanStatus,
        last_status_change: DateTime<Utc>,
    ) -> Result<Self> {
        let loan = Self {
            id,
            borrower,
            principal,
            flat_interest_rate,
            moratory_rate,
            issued_at,
            due_at,
            status,
            last_status_change,
        };
        loan.validate()?;
        Ok(loan)
    }

    pub fn status(&self) -> LoanStatus {
        self.status
    }

    pub fn last_status_change(&self) -> DateTime<Utc> {
        self.last_status_change
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_terminal()
    }

    /// true once `as_of` is strictly after the due date
    pub fn is_past_due(&self, as_of: DateTime<Utc>) -> bool {
        as_of > self.due_at
    }

    /// whole days elapsed since the due date, zero before it
    pub fn days_past_due(&self, as_of: DateTime<Utc>) -> u32 {
        if !self.is_past_due(as_of) {
            return 0;
        }
        u32::try_from((as_of - self.due_at).num_days()).unwrap_or(u32::MAX)
    }

    pub fn term_days(&self) -> i64 {
        (self.due_at - self.issued_at).num_days()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.principal.is_positive() {
            return Err(LedgerError::InvalidLoan {
                message: format!("principal must be positive, got {}", self.principal),
            });
        }
        if self.principal.exceeds_max_amount() {
            return Err(LedgerError::InvalidLoan {
                message: format!("principal {} exceeds the maximum of {}", self.principal, MAX_AMOUNT_MAJOR),
            });
        }
        if self.flat_interest_rate.is_negative() {
            return Err(LedgerError::InvalidLoan {
                message: format!("flat interest rate must not be negative, got {}", self.flat_interest_rate),
            });
        }
        if self.moratory_rate.is_negative() {
            return Err(LedgerError::InvalidLoan {
                message: format!("moratory rate must not be negative, got {}", self.moratory_rate),
            });
        }
        for (name, rate) in [("flat interest", self.flat_interest_rate), ("moratory", self.moratory_rate)] {
            if rate.exceeds_max_rate() {
                return Err(LedgerError::InvalidLoan {
                    message: format!("{} rate {} exceeds the maximum of {}%", name, rate, MAX_RATE_PERCENT),
                });
            }
        }
        if self.due_at <= self.issued_at {
            return Err(LedgerError::InvalidLoan {
                message: format!(
                    "due date {} must be after issue date {}",
                    self.due_at, self.issued_at
                ),
            });
        }
        Ok(())
    }

    pub(crate) fn set_status(&mut self, status: LoanStatus, timestamp: DateTime<Utc>) {
        self.status = status;
        self.last_status_change = timestamp;
    }
}

/// builder for loan accounts
pub struct LoanAccountBuilder {
    id: Option<LoanId>,
    borrower: Option<String>,
    principal: Option<Money>,
    flat_interest_rate: Option<Rate>,
    moratory_rate: Option<Rate>,
    issued_at: Option<DateTime<Utc>>,
    due_at: Option<DateTime<Utc>>,
    term_days: Option<i64>,
    status: LoanStatus,
}

impl LoanAccountBuilder {
    pub fn new() -> Self {
        Self {
            id: None,
            borrower: None,
            principal: None,
            flat_interest_rate: None,
            moratory_rate: None,
            issued_at: None,
            due_at: None,
            term_days: None,
            status: LoanStatus::Pending,
        }
    }

    pub fn id(mut self, id: LoanId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn borrower(mut self, borrower: impl Into<String>) -> Self {
        self.borrower = Some(borrower.into());
        self
    }

    pub fn principal(mut self, principal: Money) -> Self {
        self.principal = Some(principal);
        self
    }

    /// flat interest as a percentage (10 means 10% of principal)
    pub fn flat_rate_percent(mut self, percent: Decimal) -> Self {
        self.flat_interest_rate = Some(Rate::from_percent_decimal(percent));
        self
    }

    /// annual moratory rate as a percentage
    pub fn moratory_rate_percent(mut self, percent: Decimal) -> Self {
        self.moratory_rate = Some(Rate::from_percent_decimal(percent));
        self
    }

    pub fn issued_at(mut self, issued_at: DateTime<Utc>) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    pub fn due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    /// due date relative to the issue date, ignored when `due_at` is set
    pub fn term_days(mut self, days: i64) -> Self {
        self.term_days = Some(days);
        self
    }

    /// loans normally start as PENDIENTE, and only PENDIENTE loans can be
    /// opened through the service; other statuses serve stored records
    pub fn status(mut self, status: LoanStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> Result<LoanAccount> {
        let principal = self.principal.ok_or(LedgerError::InvalidLoan {
            message: "principal is required".to_string(),
        })?;
        let issued_at = self.issued_at.ok_or(LedgerError::InvalidLoan {
            message: "issue date is required".to_string(),
        })?;
        let due_at = match (self.due_at, self.term_days) {
            (Some(due_at), _) => due_at,
            (None, Some(days)) => Duration::try_days(days)
                .and_then(|term| issued_at.checked_add_signed(term))
                .ok_or_else(|| LedgerError::InvalidLoan {
                    message: format!("term of {} days is out of range", days),
                })?,
            (None, None) => {
                return Err(LedgerError::InvalidLoan {
                    message: "due date or term is required".to_string(),
                })
            }
        };

        LoanAccount::restore(
            self.id.unwrap_or_else(Uuid::new_v4),
            self.borrower.unwrap_or_default(),
            principal,
            self.flat_interest_rate.unwrap_or(Rate::ZERO),
            self.moratory_rate.unwrap_or(Rate::ZERO),
            issued_at,
            due_at,
            self.status,
            issued_at,
        )
    }
}

impl Default for LoanAccountBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn issued() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let loan = LoanAccount::builder()
            .principal(Money::from_major(1_000))
            .flat_rate_percent(dec!(10))
            .issued_at(issued())
            .term_days(30)
            .build()
            .unwrap();

        assert_eq!(loan.status(), LoanStatus::Pending);
        assert_eq!(loan.due_at, Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap());
        assert_eq!(loan.moratory_rate, Rate::ZERO);
        assert_eq!(loan.last_status_change(), issued());
        assert_eq!(loan.term_days(), 30);
    }

    #[test]
    fn test_rejects_non_positive_principal() {
        let result = LoanAccount::builder()
            .principal(Money::ZERO)
            .issued_at(issued())
            .term_days(30)
            .build();
        assert!(matches!(result, Err(LedgerError::InvalidLoan { .. })));
    }

    #[test]
    fn test_rejects_due_before_issue() {
        let result = LoanAccount::builder()
            .principal(Money::from_major(100))
            .issued_at(issued())
            .due_at(issued())
            .build();
        assert!(matches!(result, Err(LedgerError::InvalidLoan { .. })));
    }

    #[test]
    fn test_rejects_negative_rates() {
        let result = LoanAccount::builder()
            .principal(Money::from_major(100))
            .moratory_rate_percent(dec!(-1))
            .issued_at(issued())
            .term_days(10)
            .build();
        assert!(matches!(result, Err(LedgerError::InvalidLoan { .. })));
    }

    #[test]
    fn test_rejects_amounts_whose_total_would_overflow() {
        let huge = Money::from_decimal(Decimal::from_i128_with_scale(5 * 10_i128.pow(28), 0));
        let result = LoanAccount::builder()
            .principal(huge)
            .flat_rate_percent(dec!(100))
            .issued_at(issued())
            .term_days(30)
            .build();
        assert!(matches!(result, Err(LedgerError::InvalidLoan { .. })));

        let result = LoanAccount::builder()
            .principal(Money::from_major(100))
            .flat_rate_percent(dec!(10000.5))
            .issued_at(issued())
            .term_days(30)
            .build();
        assert!(matches!(result, Err(LedgerError::InvalidLoan { .. })));

        // the largest accepted loan still derives its total
        let loan = LoanAccount::builder()
            .principal(Money::from_major(MAX_AMOUNT_MAJOR))
            .flat_rate_percent(Decimal::from(MAX_RATE_PERCENT))
            .issued_at(issued())
            .term_days(30)
            .build()
            .unwrap();
        assert_eq!(crate::balance::total_owed(&loan), Money::from_major(MAX_AMOUNT_MAJOR * 101));
    }

    #[test]
    fn test_rejects_out_of_range_term() {
        for days in [i64::MAX, i64::MIN, 1_000_000_000] {
            let result = LoanAccount::builder()
                .principal(Money::from_major(100))
                .issued_at(issued())
                .term_days(days)
                .build();
            assert!(matches!(result, Err(LedgerError::InvalidLoan { .. })), "term {}", days);
        }
    }

    #[test]
    fn test_days_past_due() {
        let loan = LoanAccount::builder()
            .principal(Money::from_major(100))
            .issued_at(issued())
            .term_days(10)
            .build()
            .unwrap();

        assert_eq!(loan.days_past_due(issued()), 0);
        assert_eq!(loan.days_past_due(loan.due_at), 0);
        assert!(!loan.is_past_due(loan.due_at));
        assert_eq!(loan.days_past_due(loan.due_at + Duration::days(7)), 7);
    }
}
