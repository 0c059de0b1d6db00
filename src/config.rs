use serde::{Deserialize, Serialize};

use crate::decimal::{CURRENCY_SCALE, INTERNAL_SCALE};
use crate::errors::{LedgerError, Result};

/// engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// decimal places used when presenting currency amounts
    pub currency_scale: u32,
    pub moratory: MoratoryConfig,
    pub deletion_policy: DeletionPolicy,
    /// re-derive VENCIDO on every mutation, not only on explicit refresh
    pub auto_mark_overdue: bool,
}

/// moratory interest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoratoryConfig {
    /// days after the due date before moratory interest starts counting
    pub grace_period_days: u32,
    pub day_count: DayCountBasis,
}

/// day-count basis for daily moratory rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayCountBasis {
    Actual360,
    Actual365,
}

impl DayCountBasis {
    pub fn days_in_year(&self) -> u32 {
        match self {
            DayCountBasis::Actual360 => 360,
            DayCountBasis::Actual365 => 365,
        }
    }
}

/// which loans may have payment entries deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy {
    /// any non-rejected loan, settled loans reopen
    ReopenSettled,
    /// only loans that are not yet settled
    OpenLoansOnly,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            currency_scale: CURRENCY_SCALE,
            moratory: MoratoryConfig::default(),
            deletion_policy: DeletionPolicy::ReopenSettled,
            auto_mark_overdue: true,
        }
    }
}

impl Default for MoratoryConfig {
    fn default() -> Self {
        Self {
            grace_period_days: 0,
            day_count: DayCountBasis::Actual365,
        }
    }
}

impl LedgerConfig {
    /// configuration that never reopens settled loans and only marks
    /// overdue loans on explicit refresh
    pub fn conservative() -> Self {
        Self {
            deletion_policy: DeletionPolicy::OpenLoansOnly,
            auto_mark_overdue: false,
            ..Self::default()
        }
    }

    /// load from a json document, missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.currency_scale > INTERNAL_SCALE {
            return Err(LedgerError::InvalidConfiguration {
                message: format!(
                    "currency scale {} exceeds internal precision of {}",
                    self.currency_scale, INTERNAL_SCALE
                ),
            });
        }
        Ok(())
    }
}
