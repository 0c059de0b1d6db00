use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::MoratoryConfig;
use crate::decimal::{Money, Rate};
use crate::loan::LoanAccount;

/// engine for moratory (late) interest on overdue balances
///
/// The figure is informational: it is reported alongside the balance but
/// never added to the amount owed, so payment limits stay fixed at issuance.
#[derive(Debug, Clone, Default)]
pub struct MoratoryEngine {
    pub config: MoratoryConfig,
}

/// moratory interest calculation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoratoryCalculation {
    pub interest_amount: Money,
    pub daily_rate: Rate,
    pub days_overdue: u32,
    pub days_charged: u32,
    pub balance_base: Money,
    pub grace_applied: bool,
}

impl MoratoryCalculation {
    fn none(balance_base: Money, days_overdue: u32, grace_applied: bool) -> Self {
        Self {
            interest_amount: Money::ZERO,
            daily_rate: Rate::ZERO,
            days_overdue,
            days_charged: 0,
            balance_base,
            grace_applied,
        }
    }
}

impl MoratoryEngine {
    pub fn new(config: MoratoryConfig) -> Self {
        Self { config }
    }

    /// simple daily interest on `outstanding` for the days past due beyond
    /// the grace period
    pub fn calculate(
        &self,
        loan: &LoanAccount,
        outstanding: Money,
        as_of: DateTime<Utc>,
    ) -> MoratoryCalculation {
        let days_overdue = loan.days_past_due(as_of);

        if days_overdue == 0 || !outstanding.is_positive() || loan.moratory_rate.is_zero() {
            return MoratoryCalculation::none(outstanding, days_overdue, false);
        }
        if days_overdue <= self.config.grace_period_days {
            return MoratoryCalculation::none(outstanding, days_overdue, true);
        }

        let days_charged = days_overdue - self.config.grace_period_days;
        let daily_rate = loan.moratory_rate.daily_rate(self.config.day_count.days_in_year());
        let interest = outstanding.as_decimal() * daily_rate.as_decimal() * Decimal::from(days_charged);

        MoratoryCalculation {
            interest_amount: Money::from_decimal(interest).round_cents(),
            daily_rate,
            days_overdue,
            days_charged,
            balance_base: outstanding,
            grace_applied: false,
        }
    }
}
