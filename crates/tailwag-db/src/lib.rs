//! # tailwag-db: Database Layer for Tailwag Commerce
//!
//! This crate provides database access for the Tailwag Commerce core.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Tailwag Commerce Data Flow                          │
//! │                                                                         │
//! │  Checkout / Billing Run (tailwag-billing)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                    tailwag-db (THIS CRATE)                      │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │    │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │   │    │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │   │    │
//! │  │   │               │    │ Inventory     │    │              │   │    │
//! │  │   │ SqlitePool    │◄───│ Subscription  │    │ 001_init.sql │   │    │
//! │  │   │ Connection    │    │ Order / Tax   │    │ ...          │   │    │
//! │  │   │ Management    │    │ Discount / PM │    │              │   │    │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL mode, foreign keys on)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (inventory, subscription, ...)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tailwag_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/tailwag.db")).await?;
//!
//! let variant = db.variants().get_by_sku("CHKN-BOWL-5LB").await?;
//! let check = db.inventory().check_availability(&variant.id, 2).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::discount::DiscountRepository;
pub use repository::inventory::InventoryLedger;
pub use repository::order::OrderRepository;
pub use repository::payment_method::PaymentMethodRepository;
pub use repository::subscription::SubscriptionRepository;
pub use repository::tax_rate::TaxRateRepository;
pub use repository::variant::VariantRepository;
