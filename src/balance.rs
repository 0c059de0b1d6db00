use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LedgerConfig;
use crate::decimal::{Money, CURRENCY_SCALE};
use crate::ledger::PaymentLedger;
use crate::loan::LoanAccount;
use crate::moratory::{MoratoryCalculation, MoratoryEngine};
use crate::types::{LoanId, LoanStatus};

/// point-in-time balance position of a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub loan_id: LoanId,
    pub status: LoanStatus,
    pub as_of: DateTime<Utc>,
    pub principal: Money,
    pub total_owed: Money,
    pub total_interest_charged: Money,
    pub total_paid: Money,
    pub remaining_balance: Money,
    pub payment_count: usize,
    pub last_payment_at: Option<DateTime<Utc>>,
    pub days_past_due: u32,
    /// informational, not included in `total_owed`
    pub moratory: MoratoryCalculation,
}

/// pure balance arithmetic over a loan and its ledger
///
/// Persisted loans carry a one-time flat interest charge:
/// `total_owed = principal + principal * flat_rate`, fixed at issuance.
#[derive(Debug, Clone)]
pub struct BalanceEngine {
    currency_scale: u32,
    moratory: MoratoryEngine,
}

impl Default for BalanceEngine {
    fn default() -> Self {
        Self {
            currency_scale: CURRENCY_SCALE,
            moratory: MoratoryEngine::default(),
        }
    }
}

impl BalanceEngine {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            currency_scale: config.currency_scale,
            moratory: MoratoryEngine::new(config.moratory.clone()),
        }
    }

    /// principal plus flat interest, rounded half-up to the currency scale
    pub fn total_owed(&self, loan: &LoanAccount) -> Money {
        (loan.principal + loan.principal.percentage(loan.flat_interest_rate))
            .round_half_up(self.currency_scale)
    }

    pub fn total_interest_charged(&self, loan: &LoanAccount) -> Money {
        self.total_owed(loan) - loan.principal
    }

    /// amount still owed, floored at zero
    pub fn remaining_balance(&self, loan: &LoanAccount, ledger: &PaymentLedger) -> Money {
        self.total_owed(loan).saturating_sub(ledger.total_paid())
    }

    /// remaining balance counting only payments recorded by `as_of`
    pub fn remaining_balance_as_of(
        &self,
        loan: &LoanAccount,
        ledger: &PaymentLedger,
        as_of: DateTime<Utc>,
    ) -> Money {
        self.total_owed(loan).saturating_sub(ledger.paid_as_of(as_of))
    }

    pub fn summarize(
        &self,
        loan: &LoanAccount,
        ledger: &PaymentLedger,
        as_of: DateTime<Utc>,
    ) -> BalanceSummary {
        let remaining_balance = self.remaining_balance(loan, ledger);

        BalanceSummary {
            loan_id: loan.id,
            status: loan.status(),
            as_of,
            principal: loan.principal,
            total_owed: self.total_owed(loan),
            total_interest_charged: self.total_interest_charged(loan),
            total_paid: ledger.total_paid(),
            remaining_balance,
            payment_count: ledger.len(),
            last_payment_at: ledger.last().map(|e| e.recorded_at()),
            days_past_due: if remaining_balance.is_positive() {
                loan.days_past_due(as_of)
            } else {
                0
            },
            moratory: self.moratory.calculate(loan, remaining_balance, as_of),
        }
    }
}

pub fn total_owed(loan: &LoanAccount) -> Money {
    BalanceEngine::default().total_owed(loan)
}

pub fn remaining_balance(loan: &LoanAccount, ledger: &PaymentLedger) -> Money {
    BalanceEngine::default().remaining_balance(loan, ledger)
}

pub fn total_interest_charged(loan: &LoanAccount) -> Money {
    BalanceEngine::default().total_interest_charged(loan)
}
