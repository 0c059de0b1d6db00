pub mod balance;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod loan;
pub mod moratory;
pub mod quote;
pub mod repository;
pub mod serialization;
pub mod service;
pub mod status;
pub mod types;

// re-export key types
pub use balance::{BalanceEngine, BalanceSummary};
pub use config::{DayCountBasis, DeletionPolicy, LedgerConfig, MoratoryConfig};
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use ledger::{PaymentEntry, PaymentLedger, RunningTotal};
pub use loan::{LoanAccount, LoanAccountBuilder};
pub use moratory::{MoratoryCalculation, MoratoryEngine};
pub use quote::{quote, AmortizationQuote, AmortizationQuoter, AmortizationSchedule, ScheduledInstallment};
pub use repository::{InMemoryLoanRepository, LoanRepository};
pub use serialization::{LoanRecord, LoanView, PaymentRecord};
pub use service::LedgerService;
pub use status::{StatusChange, StatusStateMachine};
pub use types::{LoanId, LoanStatus, PaymentId};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
