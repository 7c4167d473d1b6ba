//! # Repository Module
//!
//! Database repository implementations for Tailwag Commerce.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Billing Run / Checkout                                                 │
//! │       │                                                                 │
//! │       │  db.inventory().commit_adjustment(variant, -2, ctx)             │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  InventoryLedger                                                        │
//! │  ├── check_availability(&self, variant_id, quantity)                    │
//! │  ├── commit_adjustment(&self, variant_id, delta, ctx)                   │
//! │  └── history(&self, variant_id, limit)                                  │
//! │       │                                                                 │
//! │       │  SQL (one transaction per commit)                               │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • SQL is isolated in one place                                         │
//! │  • The quantity/ledger invariant has exactly one enforcement point      │
//! │  • Easy to test against an in-memory database                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`variant::VariantRepository`] - Variant catalog CRUD
//! - [`inventory::InventoryLedger`] - Availability checks + atomic quantity commits
//! - [`order::OrderRepository`] - Orders and line items
//! - [`subscription::SubscriptionRepository`] - Subscriptions, invoices, history
//! - [`payment_method::PaymentMethodRepository`] - Card-vault references
//! - [`discount::DiscountRepository`] - Discount codes and redemption
//! - [`tax_rate::TaxRateRepository`] - Tax jurisdiction table

pub mod discount;
pub mod inventory;
pub mod order;
pub mod payment_method;
pub mod subscription;
pub mod tax_rate;
pub mod variant;
