use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::loan::LoanAccount;
use crate::types::LoanStatus;

/// a status change applied to a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: LoanStatus,
    pub to: LoanStatus,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// sole authority over a loan's lifecycle status
///
/// ```text
/// PENDIENTE -> APROBADO -> PAGADO      (balance reaches zero)
///                       -> VENCIDO     (due date passed, balance > 0)
/// PENDIENTE | APROBADO  -> RECHAZADO   (administrative only)
/// any non-terminal      -> EN_MORA     (administrative only)
/// ```
///
/// PAGADO and RECHAZADO are terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusStateMachine;

impl StatusStateMachine {
    pub fn new() -> Self {
        Self
    }

    /// reject payments against terminal loans
    pub fn ensure_accepts_payments(&self, loan: &LoanAccount) -> Result<()> {
        if loan.status().is_terminal() {
            return Err(LedgerError::LoanClosed { status: loan.status() });
        }
        Ok(())
    }

    /// whether an administrator may move a loan from `from` to `to`
    pub fn can_transition(&self, from: LoanStatus, to: LoanStatus) -> bool {
        if from.is_terminal() {
            return false;
        }
        match to {
            // only ever derived from the balance
            LoanStatus::Paid => false,
            LoanStatus::Rejected => matches!(from, LoanStatus::Pending | LoanStatus::Approved),
            _ => true,
        }
    }

    /// administrative status write
    ///
    /// Returns `None` when the loan already has the requested status.
    pub fn transition(
        &self,
        loan: &mut LoanAccount,
        to: LoanStatus,
        reason: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<Option<StatusChange>> {
        let from = loan.status();
        if from.is_terminal() {
            return Err(LedgerError::LoanClosed { status: from });
        }
        if from == to {
            return Ok(None);
        }
        if !self.can_transition(from, to) {
            return Err(LedgerError::InvalidTransition { from, to });
        }
        Ok(Some(apply(loan, to, reason.into(), at)))
    }

    /// settle the loan once nothing is owed
    pub fn after_payment(
        &self,
        loan: &mut LoanAccount,
        remaining: Money,
        at: DateTime<Utc>,
    ) -> Option<StatusChange> {
        if loan.status().is_terminal() || remaining.is_positive() {
            return None;
        }
        Some(apply(loan, LoanStatus::Paid, "balance fully repaid".to_string(), at))
    }

    /// reopen a settled loan whose balance became positive again
    pub fn after_removal(
        &self,
        loan: &mut LoanAccount,
        remaining: Money,
        at: DateTime<Utc>,
    ) -> Option<StatusChange> {
        if loan.status() != LoanStatus::Paid || !remaining.is_positive() {
            return None;
        }
        let to = if loan.is_past_due(at) {
            LoanStatus::Overdue
        } else {
            LoanStatus::Approved
        };
        Some(apply(loan, to, "payment removed, balance outstanding".to_string(), at))
    }

    /// mark an approved loan VENCIDO once its due date has passed with a
    /// balance outstanding
    pub fn evaluate_overdue(
        &self,
        loan: &mut LoanAccount,
        remaining: Money,
        as_of: DateTime<Utc>,
    ) -> Option<StatusChange> {
        if loan.status() != LoanStatus::Approved
            || !remaining.is_positive()
            || !loan.is_past_due(as_of)
        {
            return None;
        }
        Some(apply(loan, LoanStatus::Overdue, "due date passed with balance outstanding".to_string(), as_of))
    }
}

fn apply(loan: &mut LoanAccount, to: LoanStatus, reason: String, at: DateTime<Utc>) -> StatusChange {
    let from = loan.status();
    loan.set_status(to, at);
    StatusChange { from, to, reason, at }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn loan_with(status: LoanStatus) -> LoanAccount {
        LoanAccount::builder()
            .principal(Money::from_major(1_000))
            .flat_rate_percent(dec!(10))
            .issued_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .term_days(30)
            .status(status)
            .build()
            .unwrap()
    }

    #[test]
    fn test_approval_flow() {
        let machine = StatusStateMachine::new();
        let mut loan = loan_with(LoanStatus::Pending);
        let at = loan.issued_at + Duration::hours(1);

        let change = machine.transition(&mut loan, LoanStatus::Approved, "credit check ok", at).unwrap().unwrap();
        assert_eq!(change.from, LoanStatus::Pending);
        assert_eq!(change.to, LoanStatus::Approved);
        assert_eq!(loan.status(), LoanStatus::Approved);
        assert_eq!(loan.last_status_change(), at);

        // repeating is a no-op
        assert!(machine.transition(&mut loan, LoanStatus::Approved, "again", at).unwrap().is_none());
    }

    #[test]
    fn test_paid_is_never_assigned_by_hand() {
        let machine = StatusStateMachine::new();
        let mut loan = loan_with(LoanStatus::Approved);
        let at = loan.issued_at;
        let result = machine.transition(&mut loan, LoanStatus::Paid, "manual", at);
        assert!(matches!(result, Err(LedgerError::InvalidTransition { .. })));
        assert_eq!(loan.status(), LoanStatus::Approved);
    }

    #[test]
    fn test_rejection_only_from_pending_or_approved() {
        let machine = StatusStateMachine::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        for from in [LoanStatus::Pending, LoanStatus::Approved] {
            let mut loan = loan_with(from);
            assert!(machine.transition(&mut loan, LoanStatus::Rejected, "policy", at).is_ok());
            assert_eq!(loan.status(), LoanStatus::Rejected);
        }

        for from in [LoanStatus::Overdue, LoanStatus::InArrears] {
            let mut loan = loan_with(from);
            let result = machine.transition(&mut loan, LoanStatus::Rejected, "policy", at);
            assert!(matches!(result, Err(LedgerError::InvalidTransition { .. })));
        }
    }

    #[test]
    fn test_terminal_states_refuse_everything() {
        let machine = StatusStateMachine::new();
        for terminal in [LoanStatus::Paid, LoanStatus::Rejected] {
            let mut loan = loan_with(terminal);
            let at = loan.issued_at;
            assert!(matches!(
                machine.transition(&mut loan, LoanStatus::Approved, "reopen", at),
                Err(LedgerError::LoanClosed { .. })
            ));
            assert!(matches!(
                machine.ensure_accepts_payments(&loan),
                Err(LedgerError::LoanClosed { .. })
            ));
        }
    }

    #[test]
    fn test_overdue_and_arrears_are_independent() {
        let machine = StatusStateMachine::new();
        let mut loan = loan_with(LoanStatus::Overdue);
        let at = loan.due_at + Duration::days(3);

        machine.transition(&mut loan, LoanStatus::InArrears, "collections", at).unwrap();
        assert_eq!(loan.status(), LoanStatus::InArrears);

        // no automatic move back to VENCIDO
        assert!(machine.evaluate_overdue(&mut loan, Money::from_major(10), at).is_none());
        assert_eq!(loan.status(), LoanStatus::InArrears);
    }

    #[test]
    fn test_payment_settles_from_any_open_status() {
        let machine = StatusStateMachine::new();
        for from in [LoanStatus::Pending, LoanStatus::Approved, LoanStatus::Overdue, LoanStatus::InArrears] {
            let mut loan = loan_with(from);
            let at = loan.issued_at;
            assert!(machine.after_payment(&mut loan, Money::from_major(1), at).is_none());
            let change = machine.after_payment(&mut loan, Money::ZERO, at).unwrap();
            assert_eq!(change.from, from);
            assert_eq!(loan.status(), LoanStatus::Paid);
        }
    }

    #[test]
    fn test_evaluate_overdue() {
        let machine = StatusStateMachine::new();
        let mut loan = loan_with(LoanStatus::Approved);
        let due = loan.due_at;

        assert!(machine.evaluate_overdue(&mut loan, Money::from_major(5), due).is_none());
        assert!(machine.evaluate_overdue(&mut loan, Money::ZERO, due + Duration::days(1)).is_none());

        let change = machine.evaluate_overdue(&mut loan, Money::from_major(5), due + Duration::days(1)).unwrap();
        assert_eq!(change.to, LoanStatus::Overdue);

        // pending loans are not yet in force
        let mut pending = loan_with(LoanStatus::Pending);
        assert!(machine.evaluate_overdue(&mut pending, Money::from_major(5), due + Duration::days(1)).is_none());
    }

    #[test]
    fn test_after_removal_reopens_paid_loan() {
        let machine = StatusStateMachine::new();

        let mut loan = loan_with(LoanStatus::Paid);
        let before_due = loan.due_at - Duration::days(1);
        let change = machine.after_removal(&mut loan, Money::from_major(50), before_due).unwrap();
        assert_eq!(change.to, LoanStatus::Approved);

        let mut loan = loan_with(LoanStatus::Paid);
        let after_due = loan.due_at + Duration::days(1);
        let change = machine.after_removal(&mut loan, Money::from_major(50), after_due).unwrap();
        assert_eq!(change.to, LoanStatus::Overdue);

        let mut loan = loan_with(LoanStatus::Approved);
        assert!(machine.after_removal(&mut loan, Money::from_major(50), after_due).is_none());
    }
}
