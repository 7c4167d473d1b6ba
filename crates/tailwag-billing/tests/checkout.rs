//! Checkout tests: quote composition (rates, shipping, discount) and the
//! place-order sequence, against an in-memory database.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use async_trait::async_trait;

use tailwag_billing::{
    BillingError, CarrierRates, CartLine, CheckoutRequest, CheckoutService, MockGateway,
    NotificationDispatcher, NotificationEvent, RecordingNotifier,
};
use tailwag_core::rates::{ShippingMethod, TaxConfig};
use tailwag_core::{
    Address, CoreError, DiscountError, DiscountType, Money, OrderStatus, PaymentStatus,
};
use tailwag_db::repository::discount::NewDiscountCode;
use tailwag_db::repository::payment_method::NewPaymentMethod;
use tailwag_db::repository::tax_rate::NewTaxRate;
use tailwag_db::repository::variant::NewVariant;
use tailwag_db::{Database, DbConfig};

// =============================================================================
// Fixture
// =============================================================================

struct Fixture {
    db: Database,
    gateway: Arc<MockGateway>,
    notifier: Arc<RecordingNotifier>,
    checkout: CheckoutService,
    bowl_id: String,
    payment_method_id: String,
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 25, 14, 0, 0).unwrap()
}

fn charlotte() -> Address {
    Address {
        street: "100 Trade St".into(),
        city: "Charlotte".into(),
        state: "NC".into(),
        zip: "28202".into(),
        country: "US".into(),
    }
}

/// One $29.99 five-pound bowl (10 in stock), NC state tax at 4.75%, a 15%
/// discount code with a $25 minimum, and one vaulted card.
async fn fixture(tax_config: TaxConfig) -> Fixture {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();

    let bowl = db
        .variants()
        .create(NewVariant {
            product_id: "prod-chicken".into(),
            sku: "CHKN-BOWL-5LB".into(),
            title: "Chicken & Sweet Potato Bowl, 5lb".into(),
            price_cents: 2_999,
            weight_oz: Some(80),
            initial_quantity: 10,
            low_stock_threshold: 3,
            track_inventory: true,
            allow_backorder: false,
        })
        .await
        .unwrap();

    db.tax_rates()
        .create(NewTaxRate {
            state_code: "NC".into(),
            state_name: "North Carolina".into(),
            county: None,
            zip_code: None,
            rate_bps: 475,
            notes: None,
        })
        .await
        .unwrap();

    db.discounts()
        .create(NewDiscountCode {
            code: "WELCOME15".into(),
            discount_type: DiscountType::Percentage,
            value: 1_500,
            usage_limit: Some(100),
            minimum_purchase_cents: Some(2_500),
            starts_at: None,
            expires_at: None,
        })
        .await
        .unwrap();

    let method = db
        .payment_methods()
        .create(NewPaymentMethod {
            customer_id: "cust-1".into(),
            customer_profile_id: "vault-cust-1".into(),
            payment_profile_id: "vault-card-1".into(),
            card_brand: None,
            last_four: Some("4242".into()),
            expiration_month: Some(12),
            expiration_year: Some(2030),
            make_default: true,
        })
        .await
        .unwrap();

    let gateway = Arc::new(MockGateway::approving());
    let notifier = Arc::new(RecordingNotifier::new());
    let checkout = CheckoutService::new(
        db.clone(),
        gateway.clone(),
        NotificationDispatcher::new(notifier.clone()),
        tax_config,
    );

    Fixture {
        db,
        gateway,
        notifier,
        checkout,
        bowl_id: bowl.id,
        payment_method_id: method.id,
    }
}

fn cart(fx: &Fixture, quantity: i64, discount_code: Option<&str>) -> CheckoutRequest {
    CheckoutRequest {
        customer_id: "cust-1".into(),
        items: vec![CartLine {
            variant_id: fx.bowl_id.clone(),
            quantity,
        }],
        shipping_address: charlotte(),
        discount_code: discount_code.map(String::from),
        payment_method_id: Some(fx.payment_method_id.clone()),
    }
}

// =============================================================================
// Quote
// =============================================================================

#[tokio::test]
async fn test_quote_composition() {
    let fx = fixture(TaxConfig::enabled()).await;

    // Two bowls: $59.98, 10 lb to Charlotte (zone 1)
    let quote = fx.checkout.quote(&cart(&fx, 2, None), now()).await.unwrap();

    assert_eq!(quote.subtotal.cents(), 5_998);
    assert_eq!(quote.discount.cents(), 0);
    // Zone 1 base $9.99 + 5 lb over the flat tier at $0.50/lb = $12.49
    assert_eq!(quote.shipping.standard_price().cents(), 1_249);
    assert!(!quote.shipping.qualifies_for_free_shipping);
    // NC state rate 4.75% on $59.98 = $2.85 (half-up)
    assert_eq!(quote.tax.tax_amount.cents(), 285);
    assert_eq!(quote.total.cents(), 5_998 + 1_249 + 285);
}

#[tokio::test]
async fn test_quote_applies_discount_before_tax() {
    let fx = fixture(TaxConfig::enabled()).await;

    let quote = fx
        .checkout
        .quote(&cart(&fx, 2, Some("welcome15")), now())
        .await
        .unwrap();

    // Codes are case-insensitive; 15% of $59.98 = $9.00
    assert_eq!(quote.discount.cents(), 900);
    // Tax on the discounted amount: 4.75% of $50.98 = $2.42
    assert_eq!(quote.tax.tax_amount.cents(), 242);
    assert_eq!(quote.total.cents(), 5_098 + 1_249 + 242);
}

#[tokio::test]
async fn test_quote_with_collection_disabled_is_tax_free() {
    let fx = fixture(TaxConfig::disabled()).await;

    let quote = fx.checkout.quote(&cart(&fx, 2, None), now()).await.unwrap();
    assert_eq!(quote.tax.tax_amount.cents(), 0);
    assert_eq!(quote.total.cents(), 5_998 + 1_249);
}

#[tokio::test]
async fn test_quote_rejects_unknown_code_and_short_carts() {
    let fx = fixture(TaxConfig::enabled()).await;

    let err = fx
        .checkout
        .quote(&cart(&fx, 2, Some("NOPE")), now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BillingError::Core(CoreError::Discount(DiscountError::InvalidCode))
    ));

    // A $4.99 treat alone is under the code's $25 minimum
    let treat = fx
        .db
        .variants()
        .create(NewVariant {
            product_id: "prod-treats".into(),
            sku: "TREAT-LIVER-4OZ".into(),
            title: "Freeze-Dried Liver Treats, 4oz".into(),
            price_cents: 499,
            weight_oz: Some(4),
            initial_quantity: 50,
            low_stock_threshold: 10,
            track_inventory: true,
            allow_backorder: false,
        })
        .await
        .unwrap();

    let mut request = cart(&fx, 1, Some("WELCOME15"));
    request.items = vec![CartLine {
        variant_id: treat.id,
        quantity: 1,
    }];
    let err = fx.checkout.quote(&request, now()).await.unwrap_err();
    assert!(matches!(
        err,
        BillingError::Core(CoreError::Discount(DiscountError::BelowMinimumPurchase { .. }))
    ));
}

#[tokio::test]
async fn test_quote_rejects_oversell() {
    let fx = fixture(TaxConfig::enabled()).await;

    let err = fx.checkout.quote(&cart(&fx, 11, None), now()).await.unwrap_err();
    match err {
        BillingError::Core(CoreError::InsufficientStock {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, 10);
            assert_eq!(requested, 11);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
}

// =============================================================================
// Place Order
// =============================================================================

#[tokio::test]
async fn test_place_order_charges_records_and_decrements() {
    let fx = fixture(TaxConfig::enabled()).await;

    let placed = fx
        .checkout
        .place_order(&cart(&fx, 2, Some("WELCOME15")), now())
        .await
        .unwrap();

    assert_eq!(placed.order.total_cents, 5_098 + 1_249 + 242);
    assert_eq!(placed.order.discount_cents, 900);
    assert_eq!(
        placed.order.transaction_id.as_deref(),
        Some(placed.transaction_id.as_str())
    );

    // One charge, for the grand total
    let requests = fx.gateway.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount.cents(), placed.order.total_cents);

    // Stock moved
    let bowl = fx.db.variants().get_by_id(&fx.bowl_id).await.unwrap();
    assert_eq!(bowl.inventory_quantity, 8);

    // Redemption counted
    let code = fx
        .db
        .discounts()
        .get_by_code("WELCOME15")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(code.usage_count, 1);

    // Confirmation went out
    assert!(fx.notifier.events().iter().any(|e| matches!(
        e,
        NotificationEvent::OrderConfirmation { order_id, .. }
            if *order_id == placed.order.id
    )));
}

#[tokio::test]
async fn test_last_discount_use_loser_is_not_charged() {
    let fx = fixture(TaxConfig::enabled()).await;

    fx.db
        .discounts()
        .create(NewDiscountCode {
            code: "ONEUSE".into(),
            discount_type: DiscountType::Fixed,
            value: 500,
            usage_limit: Some(1),
            minimum_purchase_cents: None,
            starts_at: None,
            expires_at: None,
        })
        .await
        .unwrap();

    fx.checkout
        .place_order(&cart(&fx, 1, Some("ONEUSE")), now())
        .await
        .unwrap();

    let err = fx
        .checkout
        .place_order(&cart(&fx, 1, Some("ONEUSE")), now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BillingError::Core(CoreError::Discount(DiscountError::UsageLimitReached))
    ));
    // The loser was turned away before any money moved
    assert_eq!(fx.gateway.charge_count(), 1);
}

#[tokio::test]
async fn test_refund_restocks_and_flips_statuses() {
    let fx = fixture(TaxConfig::enabled()).await;

    let placed = fx
        .checkout
        .place_order(&cart(&fx, 2, None), now())
        .await
        .unwrap();
    let bowl = fx.db.variants().get_by_id(&fx.bowl_id).await.unwrap();
    assert_eq!(bowl.inventory_quantity, 8);

    let refunded = fx
        .checkout
        .refund_order(&placed.order.id, now())
        .await
        .unwrap();

    assert_eq!(refunded.status, OrderStatus::Refunded);
    assert_eq!(refunded.payment_status, PaymentStatus::Refunded);

    let refunds = fx.gateway.refunds();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].transaction_id, placed.transaction_id);
    assert_eq!(refunds[0].amount.cents(), placed.order.total_cents);

    // Items back on the shelf
    let bowl = fx.db.variants().get_by_id(&fx.bowl_id).await.unwrap();
    assert_eq!(bowl.inventory_quantity, 10);

    // A second refund has nothing settled to reverse
    let err = fx
        .checkout
        .refund_order(&placed.order.id, now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BillingError::Core(CoreError::OrderNotRefundable { .. })
    ));
}

// =============================================================================
// Carrier Seam
// =============================================================================

struct FixedCarrier {
    price_cents: i64,
}

#[async_trait]
impl CarrierRates for FixedCarrier {
    async fn rate_shipment(
        &self,
        _address: &Address,
        _total_weight_oz: i64,
    ) -> Result<Vec<ShippingMethod>, String> {
        Ok(vec![ShippingMethod {
            id: "standard".into(),
            name: "Carrier Ground".into(),
            description: "Live carrier rate".into(),
            estimated_days: "2-4 business days".into(),
            price: Money::from_cents(self.price_cents),
            is_free: false,
        }])
    }
}

struct OutageCarrier;

#[async_trait]
impl CarrierRates for OutageCarrier {
    async fn rate_shipment(
        &self,
        _address: &Address,
        _total_weight_oz: i64,
    ) -> Result<Vec<ShippingMethod>, String> {
        Err("carrier API timed out".to_string())
    }
}

#[tokio::test]
async fn test_carrier_rate_wins_when_configured() {
    let fx = fixture(TaxConfig::enabled()).await;
    let checkout = CheckoutService::new(
        fx.db.clone(),
        fx.gateway.clone(),
        NotificationDispatcher::new(fx.notifier.clone()),
        TaxConfig::enabled(),
    )
    .with_carrier(Arc::new(FixedCarrier { price_cents: 800 }));

    let quote = checkout.quote(&cart(&fx, 2, None), now()).await.unwrap();
    assert_eq!(quote.shipping.standard_price().cents(), 800);
}

#[tokio::test]
async fn test_carrier_outage_falls_back_to_zone_table() {
    let fx = fixture(TaxConfig::enabled()).await;
    let checkout = CheckoutService::new(
        fx.db.clone(),
        fx.gateway.clone(),
        NotificationDispatcher::new(fx.notifier.clone()),
        TaxConfig::enabled(),
    )
    .with_carrier(Arc::new(OutageCarrier));

    let quote = checkout.quote(&cart(&fx, 2, None), now()).await.unwrap();
    // Same zone-1 price the unconfigured service quotes
    assert_eq!(quote.shipping.standard_price().cents(), 1_249);
}

#[tokio::test]
async fn test_place_order_requires_a_payment_method() {
    let fx = fixture(TaxConfig::enabled()).await;

    let mut request = cart(&fx, 1, None);
    request.payment_method_id = None;

    let err = fx.checkout.place_order(&request, now()).await.unwrap_err();
    assert!(matches!(
        err,
        BillingError::Core(CoreError::PaymentMethodMissing(_))
    ));
    assert_eq!(fx.gateway.charge_count(), 0);
}
