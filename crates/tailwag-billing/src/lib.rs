//! # tailwag-billing: Billing & Checkout Orchestration
//!
//! The top layer of the workspace: sequences the pure logic in
//! `tailwag-core` and the persistence in `tailwag-db` against the two
//! external seams (payment gateway, notification delivery).
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         tailwag-billing                                 │
//! │                                                                         │
//! │   ┌───────────────┐        ┌───────────────────┐                        │
//! │   │  BillingRun   │        │  CheckoutService  │                        │
//! │   │  (recurring)  │        │  (one-off carts)  │                        │
//! │   └───────┬───────┘        └─────────┬─────────┘                        │
//! │           │                          │                                  │
//! │           ├──────────┬───────────────┤                                  │
//! │           ▼          ▼               ▼                                  │
//! │   dyn PaymentGateway │    NotificationDispatcher                        │
//! │                      ▼                                                  │
//! │              tailwag-db (Database) ── tailwag-core (rates, schedule)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both orchestrators share the same posture: validate and price with pure
//! core functions, move money through the gateway seam exactly once per
//! attempt, then record facts in the database. Notifications are always
//! last and always fire-and-forget.

pub mod billing;
pub mod checkout;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod profile;

pub use billing::{BillingOutcome, BillingRun, BillingRunSummary, SkipReason};
pub use checkout::{
    CarrierRates, CartLine, CheckoutRequest, CheckoutService, OrderQuote, PlacedOrder,
};
pub use error::{BillingError, BillingResult};
pub use gateway::{
    ChargeOutcome, ChargeRequest, CreateProfileRequest, GatewayError, MockGateway, PaymentGateway,
    RefundRequest, VaultProfile,
};
pub use notify::{
    LogNotifier, NotificationDispatcher, NotificationEvent, Notifier, RecordingNotifier,
};
pub use profile::PaymentProfileService;
