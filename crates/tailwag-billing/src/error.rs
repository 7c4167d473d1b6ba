//! # Billing Error Types
//!
//! Errors surfaced by the orchestration layer. Domain and database errors
//! pass through transparently; gateway declines during synchronous checkout
//! are errors here, while declines inside a billing run are *outcomes*
//! (a failed invoice), not errors.

use thiserror::Error;

use crate::gateway::GatewayError;

/// Orchestration errors.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Business rule violation from the core.
    #[error(transparent)]
    Core(#[from] tailwag_core::CoreError),

    /// Persistence failure.
    #[error(transparent)]
    Db(#[from] tailwag_db::DbError),

    /// Synchronous charge failure (checkout path).
    #[error("Payment failed: {0}")]
    Payment(#[from] GatewayError),
}

/// Result type for orchestration operations.
pub type BillingResult<T> = Result<T, BillingError>;
