//! # Rate/Amount Resolver
//!
//! Pure functions computing tax, shipping, and discount amounts from order
//! inputs. No side effects: callers load the rate table / discount row and
//! pass them in, together with the clock value.
//!
//! ## Resolution Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Rate/Amount Resolver                             │
//! │                                                                         │
//! │  TAX        address + rate table ──► most specific active row           │
//! │             precedence: ZIP > county > state                            │
//! │                                                                         │
//! │  SHIPPING   subtotal + weight + address ──► method list                 │
//! │             free ≥ $165 │ flat < 2 lb │ flat 2-5 lb │ zone-based > 5 lb │
//! │                                                                         │
//! │  DISCOUNT   code row + subtotal + now ──► clamped amount                │
//! │             active → window → usage limit → minimum purchase            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, DiscountError};
use crate::money::Money;
use crate::types::{Address, DiscountCode, DiscountType, TaxRate, TaxRateEntry};

// =============================================================================
// Tax
// =============================================================================

/// Tax configuration, passed explicitly per call.
///
/// The collection flag is read once at the call site and injected, never
/// consulted as shared mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxConfig {
    /// When false, every quote returns zero tax regardless of address.
    pub collection_enabled: bool,
}

impl TaxConfig {
    pub const fn enabled() -> Self {
        TaxConfig { collection_enabled: true }
    }

    pub const fn disabled() -> Self {
        TaxConfig { collection_enabled: false }
    }
}

/// Result of a tax computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxQuote {
    pub tax_amount: Money,
    pub rate: TaxRate,
}

impl TaxQuote {
    fn zero() -> Self {
        TaxQuote {
            tax_amount: Money::zero(),
            rate: TaxRate::zero(),
        }
    }
}

/// One line of an itemized tax computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxableItem {
    /// Unit price in cents.
    pub unit_price: Money,
    pub quantity: i64,
    /// Exempt categories (e.g., some pet food classifications) pass false.
    pub taxable: bool,
}

/// Itemized tax breakdown: one amount per input line, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemizedTaxQuote {
    pub line_amounts: Vec<Money>,
    pub tax_amount: Money,
    pub rate: TaxRate,
}

/// Resolves the applicable tax rate for an address.
///
/// ## Precedence
/// The most specific active row wins: an exact ZIP match beats a county
/// match beats the bare state row. Rows are compared case-insensitively on
/// county; ZIP matches on the 5-digit prefix.
///
/// ## Errors
/// `RateNotFound` if no active row matches the destination state at all.
pub fn resolve_rate(rates: &[TaxRateEntry], address: &Address) -> CoreResult<TaxRate> {
    let state = address.state_code();
    let zip5: String = address.zip.chars().take(5).collect();
    let city = address.city.trim().to_lowercase();

    let in_state = || {
        rates
            .iter()
            .filter(|r| r.is_active && r.state_code.eq_ignore_ascii_case(&state))
    };

    // ZIP match first
    if let Some(row) = in_state().find(|r| r.zip_code.as_deref() == Some(zip5.as_str())) {
        return Ok(row.rate());
    }

    // County next. The rate table stores counties; addresses carry cities, so
    // admin-entered county rows match when the row names the city's county
    // seat. A literal city==county comparison is what the rate table expects.
    if let Some(row) = in_state().find(|r| {
        r.county
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(&city))
    }) {
        return Ok(row.rate());
    }

    // State-level fallback: a row with neither county nor ZIP
    if let Some(row) = in_state().find(|r| r.county.is_none() && r.zip_code.is_none()) {
        return Ok(row.rate());
    }

    Err(CoreError::RateNotFound { state })
}

/// Computes tax on a flat amount (simple mode).
///
/// With collection disabled this short-circuits to a zero quote and never
/// touches the rate table, so a missing rate row cannot fail a quote in a
/// no-collection configuration.
pub fn compute_tax(
    config: TaxConfig,
    rates: &[TaxRateEntry],
    amount: Money,
    address: &Address,
) -> CoreResult<TaxQuote> {
    if !config.collection_enabled {
        return Ok(TaxQuote::zero());
    }
    let rate = resolve_rate(rates, address)?;
    Ok(TaxQuote {
        tax_amount: amount.tax_at(rate),
        rate,
    })
}

/// Computes tax per line item (itemized mode).
///
/// Each line rounds independently; the quote total is the sum of the rounded
/// line amounts, so it can differ from simple mode on the same subtotal by a
/// cent or two. Non-taxable lines contribute zero but still appear in the
/// breakdown.
pub fn compute_tax_itemized(
    config: TaxConfig,
    rates: &[TaxRateEntry],
    items: &[TaxableItem],
    address: &Address,
) -> CoreResult<ItemizedTaxQuote> {
    if !config.collection_enabled {
        return Ok(ItemizedTaxQuote {
            line_amounts: vec![Money::zero(); items.len()],
            tax_amount: Money::zero(),
            rate: TaxRate::zero(),
        });
    }

    let rate = resolve_rate(rates, address)?;
    let mut line_amounts = Vec::with_capacity(items.len());
    let mut total = Money::zero();
    for item in items {
        let line = if item.taxable {
            item.unit_price.multiply_quantity(item.quantity).tax_at(rate)
        } else {
            Money::zero()
        };
        total += line;
        line_amounts.push(line);
    }

    Ok(ItemizedTaxQuote {
        line_amounts,
        tax_amount: total,
        rate,
    })
}

// =============================================================================
// Shipping
// =============================================================================

/// Free shipping on orders at or above this subtotal ($165.00).
pub const FREE_SHIPPING_THRESHOLD: Money = Money::from_cents(16_500);

/// Flat rate for shipments under 2 lb.
pub const FLAT_RATE_SMALL: Money = Money::from_cents(999);

/// Flat rate for shipments of 2 lb up to 5 lb.
pub const FLAT_RATE_MEDIUM: Money = Money::from_cents(1_299);

/// Ounces per pound; all internal weights are integer ounces.
pub const OUNCES_PER_POUND: i64 = 16;

const WEIGHT_SMALL_OZ: i64 = 2 * OUNCES_PER_POUND;
const WEIGHT_MEDIUM_OZ: i64 = 5 * OUNCES_PER_POUND;

/// A static shipping zone: flat base plus a per-pound rate past 5 lb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShippingZone {
    pub id: &'static str,
    pub name: &'static str,
    states: &'static [&'static str],
    base_rate_cents: i64,
    per_pound_cents: i64,
    pub estimated_days: &'static str,
}

impl ShippingZone {
    pub fn base_rate(&self) -> Money {
        Money::from_cents(self.base_rate_cents)
    }
}

/// Zone table, ordered local-first. An unknown state falls through to the
/// last (most expensive) zone rather than failing the quote.
pub const SHIPPING_ZONES: &[ShippingZone] = &[
    ShippingZone {
        id: "local",
        name: "Local (Asheville Area)",
        states: &["NC"],
        base_rate_cents: 0,
        per_pound_cents: 0,
        estimated_days: "1-2 business days",
    },
    ShippingZone {
        id: "zone-1",
        name: "Zone 1 (Southeast)",
        states: &["NC", "SC", "GA", "TN", "VA", "WV", "KY", "FL", "AL", "MS"],
        base_rate_cents: 999,
        per_pound_cents: 50,
        estimated_days: "2-4 business days",
    },
    ShippingZone {
        id: "zone-2",
        name: "Zone 2 (Mid-Atlantic & Midwest)",
        states: &[
            "MD", "DE", "PA", "NJ", "NY", "OH", "IN", "IL", "MI", "WI", "MN", "IA", "MO",
        ],
        base_rate_cents: 1_299,
        per_pound_cents: 75,
        estimated_days: "3-5 business days",
    },
    ShippingZone {
        id: "zone-3",
        name: "Zone 3 (Northeast & Plains)",
        states: &[
            "CT", "RI", "MA", "VT", "NH", "ME", "ND", "SD", "NE", "KS", "OK", "AR", "LA", "TX",
        ],
        base_rate_cents: 1_499,
        per_pound_cents: 100,
        estimated_days: "4-6 business days",
    },
    ShippingZone {
        id: "zone-4",
        name: "Zone 4 (West)",
        states: &[
            "MT", "WY", "CO", "NM", "AZ", "UT", "ID", "NV", "CA", "OR", "WA",
        ],
        base_rate_cents: 1_799,
        per_pound_cents: 125,
        estimated_days: "5-7 business days",
    },
    ShippingZone {
        id: "zone-5",
        name: "Zone 5 (Alaska & Hawaii)",
        states: &["AK", "HI"],
        base_rate_cents: 2_999,
        per_pound_cents: 200,
        estimated_days: "7-10 business days",
    },
];

/// Cities in the Asheville delivery radius, matched case-insensitively.
const LOCAL_DELIVERY_CITIES: &[&str] = &[
    "asheville",
    "hendersonville",
    "fletcher",
    "arden",
    "black mountain",
    "weaverville",
    "candler",
    "fairview",
    "swannanoa",
    "leicester",
];

/// A shipping method offered for a quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub id: String,
    pub name: String,
    pub description: String,
    pub estimated_days: String,
    pub price: Money,
    pub is_free: bool,
}

/// Full shipping quote for a cart + destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingQuote {
    pub methods: Vec<ShippingMethod>,
    pub total_weight_oz: i64,
    pub qualifies_for_free_shipping: bool,
    /// How much more the customer must spend to cross the free threshold.
    /// Always reported, zero once qualified.
    pub amount_until_free_shipping: Money,
}

impl ShippingQuote {
    /// The standard-shipping price, which is what checkout charges.
    pub fn standard_price(&self) -> Money {
        self.methods
            .iter()
            .find(|m| m.id == "standard")
            .map(|m| m.price)
            .unwrap_or_else(Money::zero)
    }
}

/// Computes total shipment weight in ounces.
///
/// Items without a recorded weight count as one pound each; the total is
/// floored at one pound so an all-unknown cart never quotes as weightless.
pub fn compute_weight_oz(items: &[(Option<i64>, i64)]) -> i64 {
    let total: i64 = items
        .iter()
        .map(|(weight_oz, qty)| weight_oz.unwrap_or(OUNCES_PER_POUND) * qty)
        .sum();
    total.max(OUNCES_PER_POUND)
}

fn is_local_address(address: &Address) -> bool {
    if address.state_code() != "NC" {
        return false;
    }
    let city = address.city.trim().to_lowercase();
    LOCAL_DELIVERY_CITIES.iter().any(|local| city.contains(local))
}

/// Finds the zone for an address, local-aware.
pub fn find_zone(address: &Address) -> &'static ShippingZone {
    if is_local_address(address) {
        return &SHIPPING_ZONES[0];
    }
    let state = address.state_code();
    SHIPPING_ZONES
        .iter()
        .skip(1)
        .find(|z| z.states.contains(&state.as_str()))
        .unwrap_or(&SHIPPING_ZONES[SHIPPING_ZONES.len() - 1])
}

/// Computes the shipping quote for a cart.
///
/// ## Pricing Model
/// Hybrid flat/zone:
/// - subtotal ≥ $165 → standard shipping free
/// - under 2 lb → $9.99 flat
/// - 2 lb to under 5 lb → $12.99 flat
/// - 5 lb and up → zone base + per-pound rate on the weight past 5 lb
///
/// Local pickup is always offered; local delivery is added for the
/// Asheville-area city list.
pub fn compute_shipping(subtotal: Money, total_weight_oz: i64, address: &Address) -> ShippingQuote {
    let qualifies = subtotal >= FREE_SHIPPING_THRESHOLD;
    let until_free = (FREE_SHIPPING_THRESHOLD - subtotal).max(Money::zero());
    let zone = find_zone(address);

    let mut methods = Vec::with_capacity(3);

    methods.push(ShippingMethod {
        id: "local-pickup".into(),
        name: "Local Pickup".into(),
        description: "Pick up at our Asheville location".into(),
        estimated_days: "Same day / Next day".into(),
        price: Money::zero(),
        is_free: true,
    });

    if is_local_address(address) {
        methods.push(ShippingMethod {
            id: "local-delivery".into(),
            name: "Local Delivery".into(),
            description: "Free delivery in Asheville area".into(),
            estimated_days: "1-2 business days".into(),
            price: Money::zero(),
            is_free: true,
        });
    }

    let (price, description) = if qualifies {
        (Money::zero(), "Free shipping on orders $165+".to_string())
    } else if total_weight_oz < WEIGHT_SMALL_OZ {
        (FLAT_RATE_SMALL, "Flat rate for small items (< 2 lbs)".to_string())
    } else if total_weight_oz < WEIGHT_MEDIUM_OZ {
        (FLAT_RATE_MEDIUM, "Flat rate for medium items (2-5 lbs)".to_string())
    } else {
        // Per-pound charge on the overweight portion, half-up to the cent
        let extra_oz = total_weight_oz - WEIGHT_MEDIUM_OZ;
        let extra_cents =
            (extra_oz as i128 * zone.per_pound_cents as i128 + OUNCES_PER_POUND as i128 / 2)
                / OUNCES_PER_POUND as i128;
        (
            zone.base_rate() + Money::from_cents(extra_cents as i64),
            format!("Zone-based pricing to {}", zone.name),
        )
    };

    methods.push(ShippingMethod {
        id: "standard".into(),
        name: if qualifies {
            "Standard Shipping (FREE!)".into()
        } else {
            "Standard Shipping".into()
        },
        description,
        estimated_days: zone.estimated_days.into(),
        price,
        is_free: qualifies,
    });

    ShippingQuote {
        methods,
        total_weight_oz,
        qualifies_for_free_shipping: qualifies,
        amount_until_free_shipping: until_free,
    }
}

// =============================================================================
// Discount
// =============================================================================

/// Validates a discount code against a subtotal and computes the amount.
///
/// ## Check Order
/// active flag → start of window → end of window → usage limit → minimum
/// purchase. The first failing check wins, so a code that is both expired
/// and over its limit reports `Expired`. Callers map a missing row to
/// `InvalidCode` before getting here.
///
/// ## Amount
/// - percentage: `value` basis points of the subtotal
/// - fixed: `value` cents
///
/// Clamped to `[0, subtotal]` either way.
pub fn compute_discount(
    code: &DiscountCode,
    subtotal: Money,
    now: DateTime<Utc>,
) -> Result<Money, DiscountError> {
    if !code.is_active {
        return Err(DiscountError::Inactive);
    }
    if let Some(starts_at) = code.starts_at {
        if now < starts_at {
            return Err(DiscountError::NotYetActive);
        }
    }
    if let Some(expires_at) = code.expires_at {
        if now > expires_at {
            return Err(DiscountError::Expired);
        }
    }
    if let Some(limit) = code.usage_limit {
        if code.usage_count >= limit {
            return Err(DiscountError::UsageLimitReached);
        }
    }
    if let Some(minimum) = code.minimum_purchase_cents {
        let minimum = Money::from_cents(minimum);
        if subtotal < minimum {
            return Err(DiscountError::BelowMinimumPurchase { minimum });
        }
    }

    let computed = match code.discount_type {
        DiscountType::Percentage => subtotal.percentage(code.value as u32),
        DiscountType::Fixed => Money::from_cents(code.value),
    };

    Ok(computed.min(subtotal).max(Money::zero()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn addr(city: &str, state: &str, zip: &str) -> Address {
        Address {
            street: "12 Main St".into(),
            city: city.into(),
            state: state.into(),
            zip: zip.into(),
            country: "US".into(),
        }
    }

    fn rate_entry(
        state: &str,
        county: Option<&str>,
        zip: Option<&str>,
        bps: i64,
    ) -> TaxRateEntry {
        TaxRateEntry {
            id: uuid::Uuid::new_v4().to_string(),
            state_code: state.into(),
            state_name: state.into(),
            county: county.map(Into::into),
            zip_code: zip.map(Into::into),
            rate_bps: bps,
            is_active: true,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn discount(dtype: DiscountType, value: i64) -> DiscountCode {
        DiscountCode {
            id: uuid::Uuid::new_v4().to_string(),
            code: "WELCOME15".into(),
            discount_type: dtype,
            value,
            usage_limit: None,
            usage_count: 0,
            minimum_purchase_cents: None,
            starts_at: None,
            expires_at: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // -- tax ------------------------------------------------------------------

    #[test]
    fn test_tax_disabled_returns_zero() {
        // Disabled collection must not even consult the (empty) rate table
        let quote = compute_tax(
            TaxConfig::disabled(),
            &[],
            Money::from_cents(10_000),
            &addr("Asheville", "NC", "28801"),
        )
        .unwrap();
        assert!(quote.tax_amount.is_zero());
        assert!(quote.rate.is_zero());
    }

    #[test]
    fn test_tax_precedence_zip_over_county_over_state() {
        let rates = vec![
            rate_entry("NC", None, None, 475),
            rate_entry("NC", Some("Asheville"), None, 700),
            rate_entry("NC", None, Some("28801"), 725),
        ];
        let address = addr("Asheville", "NC", "28801");
        let rate = resolve_rate(&rates, &address).unwrap();
        assert_eq!(rate.bps(), 725);

        // No ZIP row → county wins
        let rate = resolve_rate(&rates[..2], &address).unwrap();
        assert_eq!(rate.bps(), 700);

        // Only the state row
        let rate = resolve_rate(&rates[..1], &address).unwrap();
        assert_eq!(rate.bps(), 475);
    }

    #[test]
    fn test_tax_rate_not_found() {
        let rates = vec![rate_entry("NC", None, None, 475)];
        let err = compute_tax(
            TaxConfig::enabled(),
            &rates,
            Money::from_cents(1_000),
            &addr("Austin", "TX", "78701"),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::RateNotFound { ref state } if state == "TX"));
    }

    #[test]
    fn test_tax_inactive_rows_are_skipped() {
        let mut row = rate_entry("NC", None, None, 475);
        row.is_active = false;
        let err = resolve_rate(&[row], &addr("Raleigh", "NC", "27601")).unwrap_err();
        assert!(matches!(err, CoreError::RateNotFound { .. }));
    }

    #[test]
    fn test_tax_itemized_skips_exempt_lines() {
        let rates = vec![rate_entry("NC", None, None, 1_000)]; // 10% for easy math
        let items = vec![
            TaxableItem {
                unit_price: Money::from_cents(1_000),
                quantity: 2,
                taxable: true,
            },
            TaxableItem {
                unit_price: Money::from_cents(5_000),
                quantity: 1,
                taxable: false,
            },
        ];
        let quote = compute_tax_itemized(
            TaxConfig::enabled(),
            &rates,
            &items,
            &addr("Raleigh", "NC", "27601"),
        )
        .unwrap();
        assert_eq!(quote.line_amounts[0].cents(), 200);
        assert!(quote.line_amounts[1].is_zero());
        assert_eq!(quote.tax_amount.cents(), 200);
    }

    // -- shipping -------------------------------------------------------------

    #[test]
    fn test_weight_defaults_and_floor() {
        // Unknown weights default to 1 lb each
        assert_eq!(compute_weight_oz(&[(None, 3)]), 48);
        // Floor at 1 lb total
        assert_eq!(compute_weight_oz(&[(Some(4), 1)]), 16);
        // Known weights multiply through
        assert_eq!(compute_weight_oz(&[(Some(80), 2), (Some(8), 1)]), 168);
    }

    #[test]
    fn test_free_shipping_threshold() {
        let quote = compute_shipping(
            Money::from_cents(16_500),
            200,
            &addr("Denver", "CO", "80201"),
        );
        assert!(quote.qualifies_for_free_shipping);
        assert!(quote.standard_price().is_zero());
        assert!(quote.amount_until_free_shipping.is_zero());

        let quote = compute_shipping(
            Money::from_cents(16_000),
            16,
            &addr("Denver", "CO", "80201"),
        );
        assert!(!quote.qualifies_for_free_shipping);
        assert_eq!(quote.amount_until_free_shipping.cents(), 500);
    }

    #[test]
    fn test_flat_rate_tiers() {
        let address = addr("Atlanta", "GA", "30301");
        // 1 lb → small flat rate
        let quote = compute_shipping(Money::from_cents(5_000), 16, &address);
        assert_eq!(quote.standard_price(), FLAT_RATE_SMALL);
        // 3 lb → medium flat rate
        let quote = compute_shipping(Money::from_cents(5_000), 48, &address);
        assert_eq!(quote.standard_price(), FLAT_RATE_MEDIUM);
    }

    #[test]
    fn test_zone_rate_above_five_pounds() {
        // 10 lb to GA (zone 1): $9.99 base + 5 lb × $0.50 = $12.49
        let quote = compute_shipping(Money::from_cents(5_000), 160, &addr("Atlanta", "GA", "30301"));
        assert_eq!(quote.standard_price().cents(), 1_249);

        // Same cart to HI (zone 5): $29.99 + 5 × $2.00 = $39.99
        let quote = compute_shipping(Money::from_cents(5_000), 160, &addr("Honolulu", "HI", "96801"));
        assert_eq!(quote.standard_price().cents(), 3_999);
    }

    #[test]
    fn test_unknown_state_falls_to_most_expensive_zone() {
        let quote = compute_shipping(Money::from_cents(5_000), 160, &addr("San Juan", "PR", "00901"));
        assert_eq!(find_zone(&addr("San Juan", "PR", "00901")).id, "zone-5");
        assert_eq!(quote.standard_price().cents(), 3_999);
    }

    #[test]
    fn test_local_delivery_offered_for_asheville_area() {
        let quote = compute_shipping(Money::from_cents(5_000), 16, &addr("Asheville", "NC", "28801"));
        assert!(quote.methods.iter().any(|m| m.id == "local-delivery"));

        // Non-local NC city gets pickup + standard only
        let quote = compute_shipping(Money::from_cents(5_000), 16, &addr("Raleigh", "NC", "27601"));
        assert!(!quote.methods.iter().any(|m| m.id == "local-delivery"));
        assert!(quote.methods.iter().any(|m| m.id == "local-pickup"));
    }

    // -- discount -------------------------------------------------------------

    #[test]
    fn test_percentage_discount() {
        // $100 subtotal, 15% code → $15.00 off
        let code = discount(DiscountType::Percentage, 1_500);
        let amount = compute_discount(&code, Money::from_cents(10_000), Utc::now()).unwrap();
        assert_eq!(amount.cents(), 1_500);
    }

    #[test]
    fn test_fixed_discount_clamps_to_subtotal() {
        let code = discount(DiscountType::Fixed, 5_000);
        let amount = compute_discount(&code, Money::from_cents(2_000), Utc::now()).unwrap();
        assert_eq!(amount.cents(), 2_000);
    }

    #[test]
    fn test_discount_rejection_order() {
        let now = Utc::now();

        let mut code = discount(DiscountType::Fixed, 500);
        code.is_active = false;
        // Inactive wins even though the window is also wrong
        code.expires_at = Some(now - Duration::days(1));
        assert_eq!(
            compute_discount(&code, Money::from_cents(10_000), now),
            Err(DiscountError::Inactive)
        );

        let mut code = discount(DiscountType::Fixed, 500);
        code.starts_at = Some(now + Duration::days(1));
        assert_eq!(
            compute_discount(&code, Money::from_cents(10_000), now),
            Err(DiscountError::NotYetActive)
        );

        let mut code = discount(DiscountType::Fixed, 500);
        code.expires_at = Some(now - Duration::hours(1));
        assert_eq!(
            compute_discount(&code, Money::from_cents(10_000), now),
            Err(DiscountError::Expired)
        );

        let mut code = discount(DiscountType::Fixed, 500);
        code.usage_limit = Some(10);
        code.usage_count = 10;
        assert_eq!(
            compute_discount(&code, Money::from_cents(10_000), now),
            Err(DiscountError::UsageLimitReached)
        );

        let mut code = discount(DiscountType::Fixed, 500);
        code.minimum_purchase_cents = Some(2_500);
        assert_eq!(
            compute_discount(&code, Money::from_cents(2_000), now),
            Err(DiscountError::BelowMinimumPurchase {
                minimum: Money::from_cents(2_500)
            })
        );
    }
}
