use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::{LedgerError, Result};
use crate::ledger::{PaymentEntry, PaymentLedger};
use crate::loan::LoanAccount;
use crate::types::{LoanId, LoanStatus, PaymentId};

/// persistence contract the ledger service runs against
///
/// Each call must be atomic on its own; the service serializes calls that
/// touch the same loan.
pub trait LoanRepository: Send + Sync {
    fn insert_loan(&self, loan: &LoanAccount) -> Result<()>;

    fn load_loan(&self, id: LoanId) -> Result<LoanAccount>;

    fn list_loan_ids(&self) -> Result<Vec<LoanId>>;

    /// entries ordered by `recorded_at`
    fn load_ledger(&self, loan_id: LoanId) -> Result<PaymentLedger>;

    fn append_payment_entry(&self, entry: &PaymentEntry) -> Result<()>;

    fn delete_payment_entry(&self, loan_id: LoanId, payment_id: PaymentId) -> Result<PaymentEntry>;

    fn update_loan_status(&self, id: LoanId, status: LoanStatus, at: DateTime<Utc>) -> Result<()>;
}

/// in-process repository backed by locked maps
#[derive(Debug, Default)]
pub struct InMemoryLoanRepository {
    loans: RwLock<HashMap<LoanId, LoanAccount>>,
    ledgers: RwLock<HashMap<LoanId, PaymentLedger>>,
}

impl InMemoryLoanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loan_count(&self) -> Result<usize> {
        Ok(self.read_loans()?.len())
    }

    fn read_loans(&self) -> Result<RwLockReadGuard<'_, HashMap<LoanId, LoanAccount>>> {
        self.loans.read().map_err(|_| poisoned("loans"))
    }

    fn write_loans(&self) -> Result<RwLockWriteGuard<'_, HashMap<LoanId, LoanAccount>>> {
        self.loans.write().map_err(|_| poisoned("loans"))
    }

    fn read_ledgers(&self) -> Result<RwLockReadGuard<'_, HashMap<LoanId, PaymentLedger>>> {
        self.ledgers.read().map_err(|_| poisoned("ledgers"))
    }

    fn write_ledgers(&self) -> Result<RwLockWriteGuard<'_, HashMap<LoanId, PaymentLedger>>> {
        self.ledgers.write().map_err(|_| poisoned("ledgers"))
    }
}

impl LoanRepository for InMemoryLoanRepository {
    fn insert_loan(&self, loan: &LoanAccount) -> Result<()> {
        let mut loans = self.write_loans()?;
        if loans.contains_key(&loan.id) {
            return Err(LedgerError::Storage {
                message: format!("loan {} already exists", loan.id),
            });
        }
        loans.insert(loan.id, loan.clone());
        self.write_ledgers()?.insert(loan.id, PaymentLedger::new(loan.id));
        Ok(())
    }

    fn load_loan(&self, id: LoanId) -> Result<LoanAccount> {
        self.read_loans()?
            .get(&id)
            .cloned()
            .ok_or(LedgerError::LoanNotFound { id })
    }

    fn list_loan_ids(&self) -> Result<Vec<LoanId>> {
        Ok(self.read_loans()?.keys().copied().collect())
    }

    fn load_ledger(&self, loan_id: LoanId) -> Result<PaymentLedger> {
        self.read_ledgers()?
            .get(&loan_id)
            .cloned()
            .ok_or(LedgerError::LoanNotFound { id: loan_id })
    }

    fn append_payment_entry(&self, entry: &PaymentEntry) -> Result<()> {
        self.write_ledgers()?
            .get_mut(&entry.loan_id())
            .ok_or(LedgerError::LoanNotFound { id: entry.loan_id() })?
            .append(entry.clone())
    }

    fn delete_payment_entry(&self, loan_id: LoanId, payment_id: PaymentId) -> Result<PaymentEntry> {
        self.write_ledgers()?
            .get_mut(&loan_id)
            .ok_or(LedgerError::LoanNotFound { id: loan_id })?
            .remove(payment_id)
    }

    fn update_loan_status(&self, id: LoanId, status: LoanStatus, at: DateTime<Utc>) -> Result<()> {
        self.write_loans()?
            .get_mut(&id)
            .ok_or(LedgerError::LoanNotFound { id })?
            .set_status(status, at);
        Ok(())
    }
}

fn poisoned(what: &str) -> LedgerError {
    LedgerError::Storage {
        message: format!("{} lock poisoned", what),
    }
}
