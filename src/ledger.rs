use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{LoanId, PaymentId};

/// an immutable payment recorded against a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentEntry {
    id: PaymentId,
    loan_id: LoanId,
    amount: Money,
    recorded_at: DateTime<Utc>,
    reference: Option<String>,
}

impl PaymentEntry {
    /// create a new entry with a fresh id
    pub fn new(loan_id: LoanId, amount: Money, recorded_at: DateTime<Utc>) -> Result<Self> {
        Self::restore(Uuid::new_v4(), loan_id, amount, recorded_at, None)
    }

    /// rebuild an entry from storage
    pub fn restore(
        id: PaymentId,
        loan_id: LoanId,
        amount: Money,
        recorded_at: DateTime<Utc>,
        reference: Option<String>,
    ) -> Result<Self> {
        if !amount.is_positive() || amount.exceeds_max_amount() {
            return Err(LedgerError::InvalidAmount { amount });
        }
        Ok(Self {
            id,
            loan_id,
            amount,
            recorded_at,
            reference,
        })
    }

    /// attach a receipt number or note
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn loan_id(&self) -> LoanId {
        self.loan_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }
}

/// cumulative position after one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningTotal {
    pub payment_id: PaymentId,
    pub recorded_at: DateTime<Utc>,
    pub amount: Money,
    pub cumulative: Money,
}

/// append-only payment history for one loan, ordered by `recorded_at`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentLedger {
    loan_id: LoanId,
    entries: Vec<PaymentEntry>,
}

impl PaymentLedger {
    pub fn new(loan_id: LoanId) -> Self {
        Self {
            loan_id,
            entries: Vec::new(),
        }
    }

    /// build from stored entries; ties on `recorded_at` keep their given order
    pub fn from_entries(loan_id: LoanId, mut entries: Vec<PaymentEntry>) -> Result<Self> {
        if let Some(foreign) = entries.iter().find(|e| e.loan_id != loan_id) {
            return Err(LedgerError::Storage {
                message: format!(
                    "payment {} belongs to loan {}, not {}",
                    foreign.id, foreign.loan_id, loan_id
                ),
            });
        }
        entries.sort_by_key(|e| e.recorded_at);
        Ok(Self { loan_id, entries })
    }

    pub fn loan_id(&self) -> LoanId {
        self.loan_id
    }

    /// append an entry; back-dated entries slot in after their peers
    pub fn append(&mut self, entry: PaymentEntry) -> Result<()> {
        if entry.loan_id != self.loan_id {
            return Err(LedgerError::Storage {
                message: format!(
                    "payment {} belongs to loan {}, not {}",
                    entry.id, entry.loan_id, self.loan_id
                ),
            });
        }
        let position = self
            .entries
            .partition_point(|existing| existing.recorded_at <= entry.recorded_at);
        self.entries.insert(position, entry);
        Ok(())
    }

    /// remove an entry wholesale
    pub fn remove(&mut self, payment_id: PaymentId) -> Result<PaymentEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id == payment_id)
            .ok_or(LedgerError::PaymentNotFound {
                loan_id: self.loan_id,
                payment_id,
            })?;
        Ok(self.entries.remove(index))
    }

    pub fn get(&self, payment_id: PaymentId) -> Option<&PaymentEntry> {
        self.entries.iter().find(|e| e.id == payment_id)
    }

    pub fn entries(&self) -> &[PaymentEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PaymentEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&PaymentEntry> {
        self.entries.last()
    }

    pub fn total_paid(&self) -> Money {
        self.entries.iter().map(|e| e.amount).sum()
    }

    /// sum of entries recorded at or before `as_of`
    pub fn paid_as_of(&self, as_of: DateTime<Utc>) -> Money {
        self.entries
            .iter()
            .take_while(|e| e.recorded_at <= as_of)
            .map(|e| e.amount)
            .sum()
    }

    pub fn running_totals(&self) -> Vec<RunningTotal> {
        let mut cumulative = Money::ZERO;
        self.entries
            .iter()
            .map(|e| {
                cumulative += e.amount;
                RunningTotal {
                    payment_id: e.id,
                    recorded_at: e.recorded_at,
                    amount: e.amount,
                    cumulative,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_entry_rejects_non_positive_amount() {
        let loan_id = Uuid::new_v4();
        assert!(matches!(
            PaymentEntry::new(loan_id, Money::ZERO, day(1)),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(matches!(
            PaymentEntry::new(loan_id, Money::from_major(-10), day(1)),
            Err(LedgerError::InvalidAmount { .. })
        ));
        assert!(matches!(
            PaymentEntry::new(loan_id, Money::from_major(crate::decimal::MAX_AMOUNT_MAJOR + 1), day(1)),
            Err(LedgerError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_append_keeps_chronological_order() {
        let loan_id = Uuid::new_v4();
        let mut ledger = PaymentLedger::new(loan_id);

        let a = PaymentEntry::new(loan_id, Money::from_major(10), day(5)).unwrap();
        let b = PaymentEntry::new(loan_id, Money::from_major(20), day(2)).unwrap();
        let c = PaymentEntry::new(loan_id, Money::from_major(30), day(5)).unwrap();
        let (a_id, b_id, c_id) = (a.id(), b.id(), c.id());

        ledger.append(a).unwrap();
        ledger.append(b).unwrap();
        ledger.append(c).unwrap();

        let order: Vec<_> = ledger.iter().map(|e| e.id()).collect();
        assert_eq!(order, vec![b_id, a_id, c_id]);
        assert_eq!(ledger.total_paid(), Money::from_major(60));
    }

    #[test]
    fn test_append_rejects_foreign_entry() {
        let mut ledger = PaymentLedger::new(Uuid::new_v4());
        let foreign = PaymentEntry::new(Uuid::new_v4(), Money::from_major(10), day(1)).unwrap();
        assert!(ledger.append(foreign).is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_remove() {
        let loan_id = Uuid::new_v4();
        let mut ledger = PaymentLedger::new(loan_id);
        let entry = PaymentEntry::new(loan_id, Money::from_major(10), day(1)).unwrap();
        let id = entry.id();
        ledger.append(entry).unwrap();

        let removed = ledger.remove(id).unwrap();
        assert_eq!(removed.amount(), Money::from_major(10));
        assert!(ledger.is_empty());
        assert!(matches!(ledger.remove(id), Err(LedgerError::PaymentNotFound { .. })));
    }

    #[test]
    fn test_running_totals_and_paid_as_of() {
        let loan_id = Uuid::new_v4();
        let entries = vec![
            PaymentEntry::new(loan_id, Money::from_major(300), day(10)).unwrap(),
            PaymentEntry::new(loan_id, Money::from_major(100), day(1)).unwrap(),
            PaymentEntry::new(loan_id, Money::from_major(200), day(5)).unwrap(),
        ];
        let ledger = PaymentLedger::from_entries(loan_id, entries).unwrap();

        let cumulative: Vec<_> = ledger.running_totals().iter().map(|t| t.cumulative).collect();
        assert_eq!(
            cumulative,
            vec![Money::from_major(100), Money::from_major(300), Money::from_major(600)]
        );
        assert_eq!(ledger.paid_as_of(day(5)), Money::from_major(300));
        assert_eq!(ledger.paid_as_of(day(1) - Duration::days(1)), Money::ZERO);
        assert_eq!(ledger.last().unwrap().amount(), Money::from_major(300));
    }

    #[test]
    fn test_reference() {
        let entry = PaymentEntry::new(Uuid::new_v4(), Money::from_major(5), day(1))
            .unwrap()
            .with_reference("REC-0042");
        assert_eq!(entry.reference(), Some("REC-0042"));
    }
}
