//! # Tailwag Core
//!
//! Pure business logic for Tailwag Commerce - the order, inventory, and
//! subscription consistency core behind a pet-nutrition storefront.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          tailwag-core                                   │
//! │                                                                         │
//! │  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌────────────────────┐   │
//! │  │   money   │  │   types   │  │   rates   │  │      schedule      │   │
//! │  │  ───────  │  │  ───────  │  │  ───────  │  │  ────────────────  │   │
//! │  │  Money    │  │  Order    │  │  tax      │  │  next_billing_date │   │
//! │  │  (cents)  │  │  Variant  │  │  shipping │  │  retry ladder      │   │
//! │  │  TaxRate  │  │  Subscr.  │  │  discount │  │  state machine     │   │
//! │  └───────────┘  └───────────┘  └───────────┘  └────────────────────┘   │
//! │                                                                         │
//! │  ┌───────────┐  ┌───────────┐                                          │
//! │  │ validation│  │   error   │     NO I/O. NO CLOCK READS. NO RNG       │
//! │  │           │  │           │     OUTSIDE ID GENERATION.               │
//! │  └───────────┘  └───────────┘                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is deterministic: callers inject the current time, the
//! loaded rate table, and the discount row. Persistence lives in
//! `tailwag-db`; orchestration (billing runs, checkout, notifications) in
//! `tailwag-billing`.

pub mod error;
pub mod money;
pub mod rates;
pub mod schedule;
pub mod types;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{CoreError, CoreResult, DiscountError, ValidationError};
pub use money::Money;
pub use types::{
    Address, AdjustmentReason, DiscountCode, DiscountType, Frequency, InventoryAdjustment,
    InvoiceStatus, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ProductVariant,
    StockStatus, Subscription, SubscriptionInvoice, SubscriptionItem, SubscriptionStatus, TaxRate,
    TaxRateEntry,
};
