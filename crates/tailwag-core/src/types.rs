//! # Domain Types
//!
//! Core domain types used throughout Tailwag Commerce.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌─────────────────────┐  │
//! │  │ ProductVariant  │   │      Order       │   │    Subscription     │  │
//! │  │  ─────────────  │   │  ──────────────  │   │  ─────────────────  │  │
//! │  │  id (UUID)      │   │  id (UUID)       │   │  id (UUID)          │  │
//! │  │  sku (business) │   │  status          │   │  status / frequency │  │
//! │  │  price_cents    │   │  payment_status  │   │  next_billing_date  │  │
//! │  │  inventory_qty  │   │  total_cents     │   │  amount_cents       │  │
//! │  │  version        │   └──────────────────┘   └─────────────────────┘  │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  InventoryAdjustment   SubscriptionInvoice   PaymentMethod             │
//! │  DiscountCode          SubscriptionHistory   TaxRateEntry              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: (sku, invoice_number, code) - human-readable
//!
//! ## Quantity Ownership
//! `ProductVariant.inventory_quantity` is derived state owned by the
//! Inventory Ledger. Nothing outside the ledger's commit path may write it;
//! the `version` column backs the ledger's optimistic concurrency check.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 725 bps = 7.25% (e.g., North Carolina combined rate)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// A configured tax jurisdiction row.
///
/// Lookup precedence is ZIP > county > state: the most specific active row
/// wins. A row with neither county nor ZIP is the state-level fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TaxRateEntry {
    pub id: String,
    /// 2-letter state code, stored upper-case.
    pub state_code: String,
    pub state_name: String,
    pub county: Option<String>,
    pub zip_code: Option<String>,
    /// Rate in basis points (725 = 7.25%).
    pub rate_bps: i64,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaxRateEntry {
    /// Returns the rate as a TaxRate.
    #[inline]
    pub fn rate(&self) -> TaxRate {
        TaxRate::from_bps(self.rate_bps as u32)
    }
}

// =============================================================================
// Address
// =============================================================================

/// A shipping/billing address.
///
/// Only `state` (and for some paths `city`/`zip`) participates in rate
/// resolution; the street line is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    /// 2-letter state code.
    pub state: String,
    pub zip: String,
    pub country: String,
}

impl Address {
    /// Returns the state code normalized to upper-case.
    pub fn state_code(&self) -> String {
        self.state.trim().to_uppercase()
    }
}

// =============================================================================
// Product Variant
// =============================================================================

/// A purchasable product variant (size/flavor of a parent product).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductVariant {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Parent product reference.
    pub product_id: String,

    /// Stock Keeping Unit - unique business identifier.
    pub sku: String,

    /// Display name (e.g., "Chicken & Rice Bowl - 5 lb").
    pub title: String,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Shipping weight in ounces. Items without a known weight default to
    /// one pound at quote time.
    pub weight_oz: Option<i64>,

    /// Current inventory level. Derived state: written only by the ledger.
    pub inventory_quantity: i64,

    /// Threshold at or below which the variant counts as low stock.
    pub low_stock_threshold: i64,

    /// Whether to track inventory for this variant.
    pub track_inventory: bool,

    /// Permit selling past zero stock.
    pub allow_backorder: bool,

    /// Whether variant is purchasable at all.
    pub is_available: bool,

    /// Optimistic concurrency version, bumped by every ledger commit.
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductVariant {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether the requested quantity can be satisfied.
    ///
    /// Tracking off means always satisfiable. With tracking on, either the
    /// stock covers the request or backorder must be allowed - and the
    /// availability flag must be set either way.
    pub fn can_satisfy(&self, quantity: i64) -> bool {
        if !self.track_inventory {
            return true;
        }
        if !self.is_available {
            return false;
        }
        self.inventory_quantity >= quantity || self.allow_backorder
    }

    /// Stock status bucket for admin reporting.
    pub fn stock_status(&self) -> StockStatus {
        if !self.track_inventory {
            return StockStatus::Unlimited;
        }
        if self.inventory_quantity <= 0 {
            StockStatus::OutOfStock
        } else if self.inventory_quantity <= self.low_stock_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

/// Stock level bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    /// Inventory tracking disabled.
    Unlimited,
    InStock,
    LowStock,
    OutOfStock,
}

// =============================================================================
// Inventory Adjustment
// =============================================================================

/// Why an inventory adjustment happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentReason {
    /// One-off order decrement.
    Sale,
    /// Stock received.
    Restock,
    /// Customer return.
    Return,
    /// Damaged/spoiled stock written off.
    Damage,
    /// Manual correction (counts, bulk updates).
    Adjustment,
    /// Recurring billing decrement.
    Subscription,
}

/// One row of the append-only inventory ledger.
///
/// Never updated or deleted. Invariants:
/// - `quantity_after = quantity_before + quantity_change`
/// - the latest row's `quantity_after` equals the variant's stored quantity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryAdjustment {
    pub id: String,
    pub variant_id: String,
    /// Signed delta: negative for sales, positive for restocks.
    pub quantity_change: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reason: AdjustmentReason,
    pub order_id: Option<String>,
    pub subscription_id: Option<String>,
    /// Who committed it: "system", an admin identifier, etc.
    pub actor: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Orders
// =============================================================================

/// Fulfillment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Whether the fulfillment pipeline allows moving to `next`.
    ///
    /// The happy path is pending → processing → shipped → delivered;
    /// cancellation/refund branch off before delivery. A delivered order is
    /// immutable except for notes.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
                | (Pending, Refunded)
                | (Processing, Refunded)
                | (Shipped, Refunded)
        )
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

/// A customer order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    /// Set when the order was produced by a billing run.
    pub subscription_id: Option<String>,
    /// Gateway transaction reference.
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item in an order.
/// Uses snapshot pattern to freeze variant data at time of purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub variant_id: String,
    /// SKU at time of purchase (frozen).
    pub sku_snapshot: String,
    /// Variant title at time of purchase (frozen).
    pub title_snapshot: String,
    /// Unit price in cents at time of purchase (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// Line total before tax (unit_price × quantity).
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Subscriptions
// =============================================================================

/// Lifecycle status of a subscription.
///
/// Terminal states: `Cancelled`, `Expired`. A `PastDue` subscription is
/// still billable (that is what a retry is).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    PastDue,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    /// Terminal states accept no further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, SubscriptionStatus::Cancelled | SubscriptionStatus::Expired)
    }

    /// States in which a billing run may charge.
    pub const fn is_billable(self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::PastDue)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Paused => "paused",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// How often a subscription bills.
///
/// The n-week frequencies are fixed-day intervals; `Monthly` is a calendar
/// month (Jan 31 + 1 month clamps to Feb 28/29).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    #[serde(rename = "4-weeks")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "4-weeks"))]
    FourWeeks,
    #[serde(rename = "6-weeks")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "6-weeks"))]
    SixWeeks,
    #[serde(rename = "8-weeks")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "8-weeks"))]
    EightWeeks,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
            Frequency::FourWeeks => "4-weeks",
            Frequency::SixWeeks => "6-weeks",
            Frequency::EightWeeks => "8-weeks",
        };
        f.write_str(s)
    }
}

/// An item in a subscription's snapshot list.
///
/// Stored as a JSON array on the subscription row; quantities and prices are
/// frozen at opt-in and only change through an explicit items update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionItem {
    pub variant_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// A recurring subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub customer_id: String,
    pub status: SubscriptionStatus,
    pub frequency: Frequency,

    /// Amount charged each cycle, in cents.
    pub amount_cents: i64,

    /// Next date a billing run should charge this subscription.
    ///
    /// Always derived from (last billing date or start date, frequency) by
    /// the scheduler. Admin overrides go through an explicit, logged path.
    pub next_billing_date: NaiveDate,
    pub last_billing_date: Option<NaiveDate>,

    pub started_at: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,

    /// Card-vault payment method reference.
    pub payment_method_id: Option<String>,

    /// Frozen item list, one ledger decrement per item on successful billing.
    pub items: Vec<SubscriptionItem>,

    pub pause_reason: Option<String>,
    /// Customer-requested resume date recorded at pause time.
    pub resume_date: Option<NaiveDate>,

    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Returns the per-cycle charge amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Subscription Invoice
// =============================================================================

/// Status of a subscription invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// One invoice per billing **cycle**.
///
///// Retries mutate the same row: `attempt_count` increments and
/// `next_retry_at` advances in place, so the row is a full audit of the
/// cycle's attempts. A new cycle gets a new row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SubscriptionInvoice {
    pub id: String,
    pub subscription_id: String,
    /// Human-readable invoice number (INV-{millis}-{sub prefix}).
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method_id: Option<String>,
    pub transaction_id: Option<String>,
    /// Order produced by the successful charge, if any.
    pub order_id: Option<String>,
    /// The billing cycle this invoice covers (the subscription's
    /// next_billing_date at creation time). This is the idempotency key.
    pub billing_date: NaiveDate,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub attempt_count: i64,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionInvoice {
    /// Returns the invoice total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Subscription History
// =============================================================================

/// Auditable subscription lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionAction {
    Created,
    Updated,
    Paused,
    Resumed,
    Cancelled,
    PaymentSucceeded,
    PaymentFailed,
    ItemsChanged,
    FrequencyChanged,
    PaymentMethodChanged,
    BillingDateOverridden,
}

/// Who performed a subscription action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    Customer,
    Admin,
    System,
}

/// Append-only audit row for subscription changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SubscriptionHistory {
    pub id: String,
    pub subscription_id: String,
    pub action: SubscriptionAction,
    pub old_status: Option<SubscriptionStatus>,
    pub new_status: Option<SubscriptionStatus>,
    pub actor_type: ActorType,
    pub actor_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment Method
// =============================================================================

/// Detected card brand (from the vault's masked metadata).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Discover,
}

impl CardBrand {
    /// Maps a provider-reported brand string, case-insensitively. Unknown
    /// brands map to `None` rather than failing the vaulting flow.
    pub fn from_provider(brand: &str) -> Option<Self> {
        match brand.trim().to_ascii_lowercase().as_str() {
            "visa" => Some(CardBrand::Visa),
            "mastercard" | "master card" => Some(CardBrand::Mastercard),
            "amex" | "american express" => Some(CardBrand::Amex),
            "discover" => Some(CardBrand::Discover),
            _ => None,
        }
    }
}

/// A vaulted payment method.
///
/// Hard card data never lands here: the vault holds the PAN, we hold the
/// profile identifiers plus masked display metadata. Soft-deactivated
/// (is_active=false) rather than deleted while invoices reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PaymentMethod {
    pub id: String,
    pub customer_id: String,
    /// Vault customer profile identifier.
    pub customer_profile_id: String,
    /// Vault payment profile identifier.
    pub payment_profile_id: String,
    pub card_brand: Option<CardBrand>,
    pub last_four: Option<String>,
    pub expiration_month: Option<i64>,
    pub expiration_year: Option<i64>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Discount Code
// =============================================================================

/// Discount type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `value` is basis points off the subtotal (1_500 = 15%).
    Percentage,
    /// `value` is a fixed amount in cents.
    Fixed,
}

/// A discount code.
///
/// Codes are stored upper-case; lookup normalizes the same way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DiscountCode {
    pub id: String,
    pub code: String,
    pub discount_type: DiscountType,
    /// Percentage: basis points. Fixed: cents.
    pub value: i64,
    pub usage_limit: Option<i64>,
    pub usage_count: i64,
    pub minimum_purchase_cents: Option<i64>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(quantity: i64, track: bool, backorder: bool) -> ProductVariant {
        ProductVariant {
            id: "v1".into(),
            product_id: "p1".into(),
            sku: "CHKN-BOWL-5LB".into(),
            title: "Chicken & Rice Bowl - 5 lb".into(),
            price_cents: 4999,
            weight_oz: Some(80),
            inventory_quantity: quantity,
            low_stock_threshold: 5,
            track_inventory: track,
            allow_backorder: backorder,
            is_available: true,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_can_satisfy_tracking_off() {
        let v = variant(0, false, false);
        assert!(v.can_satisfy(1000));
    }

    #[test]
    fn test_can_satisfy_respects_stock_and_backorder() {
        // quantity=3, tracking on, no backorder, request 5
        let v = variant(3, true, false);
        assert!(!v.can_satisfy(5));
        assert!(v.can_satisfy(3));

        let v = variant(3, true, true);
        assert!(v.can_satisfy(5));
    }

    #[test]
    fn test_can_satisfy_unavailable_variant() {
        let mut v = variant(10, true, true);
        v.is_available = false;
        assert!(!v.can_satisfy(1));
    }

    #[test]
    fn test_stock_status_buckets() {
        assert_eq!(variant(0, false, false).stock_status(), StockStatus::Unlimited);
        assert_eq!(variant(0, true, false).stock_status(), StockStatus::OutOfStock);
        assert_eq!(variant(5, true, false).stock_status(), StockStatus::LowStock);
        assert_eq!(variant(50, true, false).stock_status(), StockStatus::InStock);
    }

    #[test]
    fn test_order_status_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Pending.can_transition_to(Cancelled));

        // Delivered orders are immutable
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Refunded));
        // No skipping straight to delivered
        assert!(!Pending.can_transition_to(Delivered));
    }

    #[test]
    fn test_subscription_status_flags() {
        assert!(SubscriptionStatus::Cancelled.is_terminal());
        assert!(SubscriptionStatus::Expired.is_terminal());
        assert!(!SubscriptionStatus::PastDue.is_terminal());

        assert!(SubscriptionStatus::Active.is_billable());
        assert!(SubscriptionStatus::PastDue.is_billable());
        assert!(!SubscriptionStatus::Paused.is_billable());
    }

    #[test]
    fn test_frequency_serde_round_trip() {
        let json = serde_json::to_string(&Frequency::FourWeeks).unwrap();
        assert_eq!(json, "\"4-weeks\"");
        let back: Frequency = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Frequency::FourWeeks);

        let json = serde_json::to_string(&Frequency::Monthly).unwrap();
        assert_eq!(json, "\"monthly\"");
    }
}
