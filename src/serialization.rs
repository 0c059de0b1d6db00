//! storage boundary: flat records with string-encoded decimals
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::balance::{BalanceEngine, BalanceSummary};
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::ledger::{PaymentEntry, PaymentLedger, RunningTotal};
use crate::loan::LoanAccount;
use crate::types::{LoanId, LoanStatus, PaymentId};

/// stored shape of a loan account; rates are percentages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: LoanId,
    #[serde(default)]
    pub borrower: String,
    pub principal: Money,
    pub flat_interest_rate: Decimal,
    #[serde(default)]
    pub moratory_rate: Decimal,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub status: LoanStatus,
    #[serde(default)]
    pub last_status_change: Option<DateTime<Utc>>,
}

/// stored shape of a payment entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub loan_id: LoanId,
    pub amount: Money,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl From<&LoanAccount> for LoanRecord {
    fn from(loan: &LoanAccount) -> Self {
        LoanRecord {
            id: loan.id,
            borrower: loan.borrower.clone(),
            principal: loan.principal,
            flat_interest_rate: loan.flat_interest_rate.as_percentage().normalize(),
            moratory_rate: loan.moratory_rate.as_percentage().normalize(),
            issued_at: loan.issued_at,
            due_at: loan.due_at,
            status: loan.status(),
            last_status_change: Some(loan.last_status_change()),
        }
    }
}

impl TryFrom<LoanRecord> for LoanAccount {
    type Error = LedgerError;

    fn try_from(record: LoanRecord) -> Result<Self> {
        LoanAccount::restore(
            record.id,
            record.borrower,
            record.principal,
            Rate::from_percent_decimal(record.flat_interest_rate),
            Rate::from_percent_decimal(record.moratory_rate),
            record.issued_at,
            record.due_at,
            record.status,
            record.last_status_change.unwrap_or(record.issued_at),
        )
    }
}

impl From<&PaymentEntry> for PaymentRecord {
    fn from(entry: &PaymentEntry) -> Self {
        PaymentRecord {
            id: entry.id(),
            loan_id: entry.loan_id(),
            amount: entry.amount(),
            recorded_at: entry.recorded_at(),
            reference: entry.reference().map(str::to_string),
        }
    }
}

impl TryFrom<PaymentRecord> for PaymentEntry {
    type Error = LedgerError;

    fn try_from(record: PaymentRecord) -> Result<Self> {
        PaymentEntry::restore(
            record.id,
            record.loan_id,
            record.amount,
            record.recorded_at,
            record.reference,
        )
    }
}

pub fn loan_to_json(loan: &LoanAccount) -> Result<String> {
    Ok(serde_json::to_string(&LoanRecord::from(loan))?)
}

pub fn loan_from_json(json: &str) -> Result<LoanAccount> {
    let record: LoanRecord = serde_json::from_str(json)?;
    LoanAccount::try_from(record)
}

pub fn ledger_to_json(ledger: &PaymentLedger) -> Result<String> {
    let records: Vec<PaymentRecord> = ledger.iter().map(PaymentRecord::from).collect();
    Ok(serde_json::to_string(&records)?)
}

pub fn ledger_from_json(loan_id: LoanId, json: &str) -> Result<PaymentLedger> {
    let records: Vec<PaymentRecord> = serde_json::from_str(json)?;
    let entries = records
        .into_iter()
        .map(PaymentEntry::try_from)
        .collect::<Result<Vec<_>>>()?;
    PaymentLedger::from_entries(loan_id, entries)
}

/// serializable read model of a loan with its balance and payment history
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub loan: LoanRecord,
    pub balance: BalanceSummary,
    pub payments: Vec<RunningTotal>,
}

impl LoanView {
    pub fn build(
        loan: &LoanAccount,
        ledger: &PaymentLedger,
        engine: &BalanceEngine,
        as_of: DateTime<Utc>,
    ) -> Self {
        LoanView {
            loan: LoanRecord::from(loan),
            balance: engine.summarize(loan, ledger, as_of),
            payments: ledger.running_totals(),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
