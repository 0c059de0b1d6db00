use thiserror::Error;

use crate::decimal::Money;
use crate::types::{LoanId, LoanStatus, PaymentId};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid quote input: {message}")]
    InvalidQuoteInput {
        message: String,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("overpayment: requested {requested}, remaining balance {remaining}")]
    Overpayment {
        requested: Money,
        remaining: Money,
    },

    #[error("loan closed: current status is {status}")]
    LoanClosed {
        status: LoanStatus,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: LoanId,
    },

    #[error("payment {payment_id} not found on loan {loan_id}")]
    PaymentNotFound {
        loan_id: LoanId,
        payment_id: PaymentId,
    },

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: LoanStatus,
        to: LoanStatus,
    },

    #[error("invalid loan: {message}")]
    InvalidLoan {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    /// true for caller mistakes (4xx-equivalent); false for storage faults
    pub fn is_client_error(&self) -> bool {
        !matches!(self, LedgerError::Storage { .. } | LedgerError::Serialization(_))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
