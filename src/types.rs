use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// unique identifier for a loan account
pub type LoanId = Uuid;

/// unique identifier for a payment entry
pub type PaymentId = Uuid;

/// loan lifecycle status
///
/// Serialized as the upper-case strings the loan desk stores, so records
/// written by other tools round-trip without a mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    /// requested, awaiting approval
    #[serde(rename = "PENDIENTE")]
    Pending,
    /// approved and performing
    #[serde(rename = "APROBADO")]
    Approved,
    /// fully repaid
    #[serde(rename = "PAGADO")]
    Paid,
    /// past due with an outstanding balance
    #[serde(rename = "VENCIDO")]
    Overdue,
    /// rejected by an administrator
    #[serde(rename = "RECHAZADO")]
    Rejected,
    /// manually flagged as in default
    #[serde(rename = "EN_MORA")]
    InArrears,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 6] = [
        LoanStatus::Pending,
        LoanStatus::Approved,
        LoanStatus::Paid,
        LoanStatus::Overdue,
        LoanStatus::Rejected,
        LoanStatus::InArrears,
    ];

    /// storage code for this status
    pub fn code(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "PENDIENTE",
            LoanStatus::Approved => "APROBADO",
            LoanStatus::Paid => "PAGADO",
            LoanStatus::Overdue => "VENCIDO",
            LoanStatus::Rejected => "RECHAZADO",
            LoanStatus::InArrears => "EN_MORA",
        }
    }

    /// terminal states accept no payments and no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Paid | LoanStatus::Rejected)
    }

    /// both overdue flavours
    pub fn is_overdue(&self) -> bool {
        matches!(self, LoanStatus::Overdue | LoanStatus::InArrears)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LoanStatus::ALL
            .iter()
            .copied()
            .find(|status| status.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown loan status: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        for status in LoanStatus::ALL {
            assert_eq!(status.code().parse::<LoanStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.code()));
        }
    }

    #[test]
    fn test_status_parse_is_lenient_on_case() {
        assert_eq!("pagado".parse::<LoanStatus>().unwrap(), LoanStatus::Paid);
        assert_eq!(" en_mora ".parse::<LoanStatus>().unwrap(), LoanStatus::InArrears);
        assert!("CANCELADO".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(LoanStatus::Paid.is_terminal());
        assert!(LoanStatus::Rejected.is_terminal());
        assert!(!LoanStatus::Overdue.is_terminal());
        assert!(!LoanStatus::InArrears.is_terminal());
        assert!(LoanStatus::InArrears.is_overdue());
    }
}
