use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{LoanId, LoanStatus, PaymentId};

/// all events that can be emitted by the ledger service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    LoanOpened {
        loan_id: LoanId,
        principal: Money,
        total_owed: Money,
        due_at: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    LoanSettled {
        loan_id: LoanId,
        final_payment: Money,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentRegistered {
        loan_id: LoanId,
        payment_id: PaymentId,
        amount: Money,
        remaining_balance: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentRejected {
        loan_id: LoanId,
        amount: Money,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    PaymentDeleted {
        loan_id: LoanId,
        payment_id: PaymentId,
        amount: Money,
        remaining_balance: Money,
        timestamp: DateTime<Utc>,
    },

    // status change events
    StatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn loan_id(&self) -> LoanId {
        match self {
            Event::LoanOpened { loan_id, .. }
            | Event::LoanSettled { loan_id, .. }
            | Event::PaymentRegistered { loan_id, .. }
            | Event::PaymentRejected { loan_id, .. }
            | Event::PaymentDeleted { loan_id, .. }
            | Event::StatusChanged { loan_id, .. } => *loan_id,
        }
    }
}

/// event store for collecting events during operations
///
/// Unbounded: owners drain it with [`EventStore::take_events`].
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn for_loan(&self, loan_id: LoanId) -> Vec<&Event> {
        self.events.iter().filter(|e| e.loan_id() == loan_id).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn test_store_filters_and_drains() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut store = EventStore::new();
        store.emit(Event::LoanSettled { loan_id: a, final_payment: Money::from_major(1), timestamp: at });
        store.emit(Event::StatusChanged {
            loan_id: b,
            old_status: LoanStatus::Pending,
            new_status: LoanStatus::Approved,
            reason: "approved".to_string(),
            timestamp: at,
        });

        assert_eq!(store.for_loan(a).len(), 1);
        assert_eq!(store.len(), 2);

        let drained = store.take_events();
        assert_eq!(drained.len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_events_serialize_with_status_codes() {
        let event = Event::StatusChanged {
            loan_id: Uuid::nil(),
            old_status: LoanStatus::Approved,
            new_status: LoanStatus::Paid,
            reason: "balance fully repaid".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"old_status\":\"APROBADO\""));
        assert!(json.contains("\"new_status\":\"PAGADO\""));
    }
}
