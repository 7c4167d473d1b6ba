//! # Error Types
//!
//! Domain-specific error types for tailwag-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tailwag-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── DiscountError    - Discount code rejection reasons                │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tailwag-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tailwag-billing errors (separate crate)                               │
//! │  └── BillingError     - Orchestration failures                         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → BillingError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (SKU, ID, shortfall, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each discount rejection maps to a distinct user-facing reason

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// Not-found variants are distinct from validation variants so callers can
/// tell "retrying will not help" apart from "fix the input".
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product variant cannot be found.
    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    /// Subscription cannot be found.
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// Order cannot be found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Order has no settled payment to refund.
    #[error("Order {order_id} cannot be refunded: {reason}")]
    OrderNotRefundable { order_id: String, reason: String },

    /// Insufficient stock to satisfy the requested quantity.
    ///
    /// ## When This Occurs
    /// - Variant tracks inventory, backorder is disallowed, and the current
    ///   quantity is below the requested quantity
    ///
    /// The shortfall is user-visible: checkout shows "only {available} left".
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Variant exists but is not purchasable (availability flag off).
    #[error("Variant {sku} is not available for purchase")]
    VariantUnavailable { sku: String },

    /// Subscription is not in a state that allows billing.
    ///
    /// Only `active` and `past_due` (retry) subscriptions may be charged.
    #[error("Subscription {subscription_id} is {status}, cannot bill")]
    SubscriptionNotBillable {
        subscription_id: String,
        status: String,
    },

    /// Subscription has no payment method on file.
    #[error("Subscription {0} has no payment method on file")]
    PaymentMethodMissing(String),

    /// Requested state transition is not allowed by the state machine.
    #[error("Cannot {event} a {from} subscription")]
    InvalidTransition { from: String, event: String },

    /// No tax rate configured for the destination state.
    #[error("No tax rate found for state {state}")]
    RateNotFound { state: String },

    /// Discount code rejection (wraps DiscountError).
    #[error("Discount rejected: {0}")]
    Discount(#[from] DiscountError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Discount Error
// =============================================================================

/// Reasons a discount code is rejected.
///
/// Each variant must surface as a distinct user-facing message at checkout;
/// the storefront shows these verbatim.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscountError {
    /// Code does not exist.
    #[error("Invalid discount code")]
    InvalidCode,

    /// Code exists but is deactivated.
    #[error("This discount code is no longer active")]
    Inactive,

    /// Code's validity window has not started.
    #[error("This discount code is not yet valid")]
    NotYetActive,

    /// Code's validity window has passed.
    #[error("This discount code has expired")]
    Expired,

    /// usage_count has reached usage_limit.
    #[error("This discount code has reached its usage limit")]
    UsageLimitReached,

    /// Order subtotal is below the code's minimum purchase.
    #[error("Minimum purchase of {minimum} required for this discount code")]
    BelowMinimumPurchase { minimum: crate::money::Money },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any side effect runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid state code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate SKU).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
