use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, instrument, warn};

use crate::balance::{BalanceEngine, BalanceSummary};
use crate::config::{DeletionPolicy, LedgerConfig};
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::{PaymentEntry, PaymentLedger};
use crate::loan::LoanAccount;
use crate::quote::{AmortizationQuote, AmortizationQuoter};
use crate::repository::LoanRepository;
use crate::status::{StatusChange, StatusStateMachine};
use crate::types::{LoanId, LoanStatus, PaymentId};

/// ledger service: every mutation of a loan runs under that loan's lock
///
/// Reads go straight to the repository and see whatever the last completed
/// mutation left behind. Emitted events accumulate until drained with
/// [`LedgerService::take_events`].
pub struct LedgerService<R: LoanRepository> {
    repository: R,
    config: LedgerConfig,
    balance: BalanceEngine,
    status: StatusStateMachine,
    quoter: AmortizationQuoter,
    locks: Mutex<HashMap<LoanId, Arc<Mutex<()>>>>,
    events: Mutex<EventStore>,
}

impl<R: LoanRepository> LedgerService<R> {
    pub fn new(repository: R, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            balance: BalanceEngine::new(&config),
            repository,
            config,
            status: StatusStateMachine::new(),
            quoter: AmortizationQuoter::new(),
            locks: Mutex::new(HashMap::new()),
            events: Mutex::new(EventStore::new()),
        })
    }

    pub fn with_defaults(repository: R) -> Self {
        Self {
            balance: BalanceEngine::default(),
            repository,
            config: LedgerConfig::default(),
            status: StatusStateMachine::new(),
            quoter: AmortizationQuoter::new(),
            locks: Mutex::new(HashMap::new()),
            events: Mutex::new(EventStore::new()),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// simulate a loan; touches no stored state
    pub fn quote(
        &self,
        principal: Money,
        annual_rate_percent: Decimal,
        term_months: u32,
    ) -> Result<AmortizationQuote> {
        self.quoter.quote(principal, annual_rate_percent, term_months)
    }

    /// persist a new loan; it must still be PENDIENTE
    #[instrument(name = "ledger.open_loan", skip(self, loan), fields(loan_id = %loan.id), err)]
    pub fn open_loan(&self, loan: LoanAccount) -> Result<LoanId> {
        loan.validate()?;
        if loan.status() != LoanStatus::Pending {
            return Err(LedgerError::InvalidLoan {
                message: format!(
                    "new loans open as {}, got {}",
                    LoanStatus::Pending,
                    loan.status()
                ),
            });
        }
        self.repository.insert_loan(&loan)?;

        let total_owed = self.balance.total_owed(&loan);
        info!(principal = %loan.principal, total_owed = %total_owed, "loan opened");

        self.emit(Event::LoanOpened {
            loan_id: loan.id,
            principal: loan.principal,
            total_owed,
            due_at: loan.due_at,
            timestamp: loan.issued_at,
        });
        Ok(loan.id)
    }

    pub fn loan(&self, loan_id: LoanId) -> Result<LoanAccount> {
        self.repository.load_loan(loan_id)
    }

    pub fn ledger(&self, loan_id: LoanId) -> Result<PaymentLedger> {
        self.repository.load_ledger(loan_id)
    }

    pub fn status(&self, loan_id: LoanId) -> Result<LoanStatus> {
        Ok(self.repository.load_loan(loan_id)?.status())
    }

    pub fn total_owed(&self, loan_id: LoanId) -> Result<Money> {
        let loan = self.repository.load_loan(loan_id)?;
        Ok(self.balance.total_owed(&loan))
    }

    pub fn total_interest_charged(&self, loan_id: LoanId) -> Result<Money> {
        let loan = self.repository.load_loan(loan_id)?;
        Ok(self.balance.total_interest_charged(&loan))
    }

    pub fn remaining_balance(&self, loan_id: LoanId) -> Result<Money> {
        let loan = self.repository.load_loan(loan_id)?;
        let ledger = self.repository.load_ledger(loan_id)?;
        Ok(self.balance.remaining_balance(&loan, &ledger))
    }

    pub fn balance_summary(&self, loan_id: LoanId, as_of: DateTime<Utc>) -> Result<BalanceSummary> {
        let loan = self.repository.load_loan(loan_id)?;
        let ledger = self.repository.load_ledger(loan_id)?;
        Ok(self.balance.summarize(&loan, &ledger, as_of))
    }

    /// record a payment against a loan
    ///
    /// Fails with `LoanClosed`, `InvalidAmount` or `Overpayment` without
    /// touching the ledger. A payment that clears the balance settles the
    /// loan; if that status write fails the entry is taken back out.
    pub fn register_payment(
        &self,
        loan_id: LoanId,
        amount: Money,
        recorded_at: DateTime<Utc>,
    ) -> Result<PaymentEntry> {
        self.record_payment(loan_id, amount, recorded_at, None)
    }

    pub fn register_payment_with_reference(
        &self,
        loan_id: LoanId,
        amount: Money,
        recorded_at: DateTime<Utc>,
        reference: impl Into<String>,
    ) -> Result<PaymentEntry> {
        self.record_payment(loan_id, amount, recorded_at, Some(reference.into()))
    }

    /// record a payment stamped with the provider's current time
    pub fn register_payment_now(
        &self,
        loan_id: LoanId,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentEntry> {
        self.record_payment(loan_id, amount, time_provider.now(), None)
    }

    #[instrument(name = "ledger.register_payment", skip(self, reference), err)]
    fn record_payment(
        &self,
        loan_id: LoanId,
        amount: Money,
        recorded_at: DateTime<Utc>,
        reference: Option<String>,
    ) -> Result<PaymentEntry> {
        self.with_loan_lock(loan_id, || {
            self.apply_payment(loan_id, amount, recorded_at, reference)
        })
    }

    fn apply_payment(
        &self,
        loan_id: LoanId,
        amount: Money,
        recorded_at: DateTime<Utc>,
        reference: Option<String>,
    ) -> Result<PaymentEntry> {
        let mut loan = self.repository.load_loan(loan_id)?;
        let ledger = self.repository.load_ledger(loan_id)?;

        let remaining = match self.validate_payment(&loan, &ledger, amount) {
            Ok(remaining) => remaining,
            Err(err) => {
                warn!(error = %err, "payment rejected");
                self.emit(Event::PaymentRejected {
                    loan_id,
                    amount,
                    reason: err.to_string(),
                    timestamp: recorded_at,
                });
                return Err(err);
            }
        };

        let mut entry = PaymentEntry::new(loan_id, amount, recorded_at)?;
        if let Some(reference) = reference {
            entry = entry.with_reference(reference);
        }
        self.repository.append_payment_entry(&entry)?;
        let remaining_after = remaining - amount;

        let settlement = self.status.after_payment(&mut loan, remaining_after, recorded_at);
        let settles = settlement.is_some();
        let change = match settlement {
            Some(change) => Some(change),
            None if self.config.auto_mark_overdue => {
                self.status.evaluate_overdue(&mut loan, remaining_after, recorded_at)
            }
            None => None,
        };
        if let Some(change) = &change {
            if let Err(err) = self.write_status(loan_id, change) {
                self.repository.delete_payment_entry(loan_id, entry.id())?;
                warn!(payment_id = %entry.id(), "status write failed, payment rolled back");
                return Err(err);
            }
        }

        info!(payment_id = %entry.id(), remaining = %remaining_after, "payment registered");
        self.emit(Event::PaymentRegistered {
            loan_id,
            payment_id: entry.id(),
            amount,
            remaining_balance: remaining_after,
            timestamp: recorded_at,
        });

        if let Some(change) = &change {
            self.announce_change(loan_id, change);
        }
        if settles {
            self.emit(Event::LoanSettled {
                loan_id,
                final_payment: amount,
                timestamp: recorded_at,
            });
        }

        Ok(entry)
    }

    /// remaining balance if `amount` may be paid
    fn validate_payment(&self, loan: &LoanAccount, ledger: &PaymentLedger, amount: Money) -> Result<Money> {
        self.status.ensure_accepts_payments(loan)?;

        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount });
        }

        let remaining = self.balance.remaining_balance(loan, ledger);
        if amount > remaining {
            return Err(LedgerError::Overpayment {
                requested: amount,
                remaining,
            });
        }
        Ok(remaining)
    }

    /// remove a payment entry wholesale and re-derive the loan's status
    #[instrument(name = "ledger.delete_payment", skip(self), err)]
    pub fn delete_payment(
        &self,
        loan_id: LoanId,
        payment_id: PaymentId,
        at: DateTime<Utc>,
    ) -> Result<PaymentEntry> {
        self.with_loan_lock(loan_id, || self.apply_deletion(loan_id, payment_id, at))
    }

    fn apply_deletion(&self, loan_id: LoanId, payment_id: PaymentId, at: DateTime<Utc>) -> Result<PaymentEntry> {
        let mut loan = self.repository.load_loan(loan_id)?;
        let status = loan.status();
        let closed = match self.config.deletion_policy {
            DeletionPolicy::ReopenSettled => status == LoanStatus::Rejected,
            DeletionPolicy::OpenLoansOnly => status.is_terminal(),
        };
        if closed {
            return Err(LedgerError::LoanClosed { status });
        }

        let mut ledger = self.repository.load_ledger(loan_id)?;
        if ledger.get(payment_id).is_none() {
            return Err(LedgerError::PaymentNotFound { loan_id, payment_id });
        }

        let removed = self.repository.delete_payment_entry(loan_id, payment_id)?;
        ledger.remove(payment_id)?;
        let remaining = self.balance.remaining_balance(&loan, &ledger);

        let change = match self.status.after_removal(&mut loan, remaining, at) {
            Some(change) => Some(change),
            None if self.config.auto_mark_overdue => self.status.evaluate_overdue(&mut loan, remaining, at),
            None => None,
        };
        if let Some(change) = &change {
            if let Err(err) = self.write_status(loan_id, change) {
                self.repository.append_payment_entry(&removed)?;
                warn!(payment_id = %payment_id, "status write failed, deletion rolled back");
                return Err(err);
            }
        }

        info!(amount = %removed.amount(), remaining = %remaining, "payment deleted");
        self.emit(Event::PaymentDeleted {
            loan_id,
            payment_id,
            amount: removed.amount(),
            remaining_balance: remaining,
            timestamp: at,
        });
        if let Some(change) = &change {
            self.announce_change(loan_id, change);
        }

        Ok(removed)
    }

    /// administrative status write, guarded only by terminal states
    #[instrument(name = "ledger.change_status", skip(self, reason), err)]
    pub fn change_status(
        &self,
        loan_id: LoanId,
        to: LoanStatus,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<StatusChange>> {
        self.with_loan_lock(loan_id, || {
            let mut loan = self.repository.load_loan(loan_id)?;
            let change = self.status.transition(&mut loan, to, reason, at)?;
            if let Some(change) = &change {
                self.persist_change(loan_id, change)?;
            }
            Ok(change)
        })
    }

    pub fn approve(&self, loan_id: LoanId, at: DateTime<Utc>) -> Result<Option<StatusChange>> {
        self.change_status(loan_id, LoanStatus::Approved, "approved", at)
    }

    pub fn reject(&self, loan_id: LoanId, reason: &str, at: DateTime<Utc>) -> Result<Option<StatusChange>> {
        self.change_status(loan_id, LoanStatus::Rejected, reason, at)
    }

    pub fn mark_overdue(&self, loan_id: LoanId, at: DateTime<Utc>) -> Result<Option<StatusChange>> {
        self.change_status(loan_id, LoanStatus::Overdue, "marked overdue", at)
    }

    pub fn mark_in_arrears(&self, loan_id: LoanId, reason: &str, at: DateTime<Utc>) -> Result<Option<StatusChange>> {
        self.change_status(loan_id, LoanStatus::InArrears, reason, at)
    }

    /// re-derive VENCIDO for one loan at the provider's current time
    #[instrument(name = "ledger.refresh_status", skip(self, time_provider), err)]
    pub fn refresh_status(
        &self,
        loan_id: LoanId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Option<StatusChange>> {
        self.refresh_status_at(loan_id, time_provider.now())
    }

    fn refresh_status_at(&self, loan_id: LoanId, now: DateTime<Utc>) -> Result<Option<StatusChange>> {
        self.with_loan_lock(loan_id, || {
            let mut loan = self.repository.load_loan(loan_id)?;
            let ledger = self.repository.load_ledger(loan_id)?;
            let remaining = self.balance.remaining_balance(&loan, &ledger);

            let change = self.status.evaluate_overdue(&mut loan, remaining, now);
            if let Some(change) = &change {
                self.persist_change(loan_id, change)?;
            }
            Ok(change)
        })
    }

    /// sweep every stored loan for newly overdue balances
    #[instrument(name = "ledger.refresh_all", skip(self, time_provider), err)]
    pub fn refresh_all(&self, time_provider: &SafeTimeProvider) -> Result<Vec<StatusChange>> {
        let now = time_provider.now();
        let mut changes = Vec::new();
        for loan_id in self.repository.list_loan_ids()? {
            if let Some(change) = self.refresh_status_at(loan_id, now)? {
                changes.push(change);
            }
        }
        debug!(changed = changes.len(), "overdue sweep complete");
        Ok(changes)
    }

    /// drain events emitted so far; callers are expected to drain regularly
    pub fn take_events(&self) -> Vec<Event> {
        self.event_store().take_events()
    }

    /// copies of the pending events for one loan, leaving them in place
    pub fn events_for(&self, loan_id: LoanId) -> Vec<Event> {
        self.event_store().for_loan(loan_id).into_iter().cloned().collect()
    }

    fn persist_change(&self, loan_id: LoanId, change: &StatusChange) -> Result<()> {
        self.write_status(loan_id, change)?;
        self.announce_change(loan_id, change);
        Ok(())
    }

    fn write_status(&self, loan_id: LoanId, change: &StatusChange) -> Result<()> {
        self.repository.update_loan_status(loan_id, change.to, change.at)
    }

    fn announce_change(&self, loan_id: LoanId, change: &StatusChange) {
        info!(
            loan_id = %loan_id,
            from = %change.from,
            to = %change.to,
            reason = %change.reason,
            "status changed"
        );
        self.emit(Event::StatusChanged {
            loan_id,
            old_status: change.from,
            new_status: change.to,
            reason: change.reason.clone(),
            timestamp: change.at,
        });
    }

    /// run `op` under the loan's lock; unknown loans never enter the table
    fn with_loan_lock<T>(&self, loan_id: LoanId, op: impl FnOnce() -> Result<T>) -> Result<T> {
        self.repository.load_loan(loan_id)?;
        let lock = self.loan_lock(loan_id)?;

        let result = match lock.lock() {
            Ok(_guard) => op(),
            Err(_) => Err(poisoned_loan_lock(loan_id)),
        };
        self.release_loan_lock(loan_id, &lock);

        if let Err(err) = &result {
            if !err.is_client_error() {
                error!(loan_id = %loan_id, error = %err, "ledger storage failure");
            }
        }
        result
    }

    fn loan_lock(&self, loan_id: LoanId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| LedgerError::Storage {
            message: "lock table poisoned".to_string(),
        })?;
        Ok(locks.entry(loan_id).or_default().clone())
    }

    /// drop the table entry once the table and `lock` are its only holders
    fn release_loan_lock(&self, loan_id: LoanId, lock: &Arc<Mutex<()>>) {
        if let Ok(mut locks) = self.locks.lock() {
            let ours = locks.get(&loan_id).is_some_and(|held| Arc::ptr_eq(held, lock));
            if ours && Arc::strong_count(lock) == 2 {
                locks.remove(&loan_id);
            }
        }
    }

    fn emit(&self, event: Event) {
        self.event_store().emit(event);
    }

    fn event_store(&self) -> MutexGuard<'_, EventStore> {
        // events are append-only, a panic mid-emit leaves nothing half-written
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn poisoned_loan_lock(loan_id: LoanId) -> LedgerError {
    LedgerError::Storage {
        message: format!("lock for loan {} poisoned", loan_id),
    }
}
