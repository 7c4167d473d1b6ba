//! # Checkout Orchestration
//!
//! Quotes a cart (rates, shipping, discount) and places one-off orders.
//!
//! ## Quote Composition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal   = Σ unit price × quantity     (availability checked first)  │
//! │  discount   = validated code, clamped to [0, subtotal]                  │
//! │  shipping   = zone table on total weight  (untaxed)                     │
//! │  tax        = resolved rate × (subtotal − discount)                     │
//! │  total      = subtotal − discount + shipping + tax                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `place_order` redeems the discount *before* charging, so the loser of a
//! last-use race is turned away with no money moved.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use tailwag_core::rates::{
    self, ShippingMethod, ShippingQuote, TaxConfig, TaxQuote, FREE_SHIPPING_THRESHOLD,
};
use tailwag_core::{
    AdjustmentReason, Address, CoreError, DiscountCode, DiscountError, Money, Order, OrderStatus,
    PaymentStatus,
};
use tailwag_db::repository::inventory::AdjustmentContext;
use tailwag_db::repository::order::{NewOrder, NewOrderItem};
use tailwag_db::{Database, DbError};

use crate::error::BillingResult;
use crate::gateway::{ChargeRequest, PaymentGateway, RefundRequest};
use crate::notify::{NotificationDispatcher, NotificationEvent};

/// Orders at or above this total page the admin channel.
pub const HIGH_VALUE_THRESHOLD: Money = Money::from_cents(30_000);

/// One cart line, as submitted by the storefront.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub variant_id: String,
    pub quantity: i64,
}

/// A cart to quote or place.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer_id: String,
    pub items: Vec<CartLine>,
    pub shipping_address: Address,
    pub discount_code: Option<String>,
    /// Payment method to charge; required for `place_order`, ignored by
    /// `quote`.
    pub payment_method_id: Option<String>,
}

/// One priced line of a quote, frozen from the variant at quote time.
#[derive(Debug, Clone)]
pub struct QuotedLine {
    pub variant_id: String,
    pub sku: String,
    pub title: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

/// A fully priced cart.
#[derive(Debug)]
pub struct OrderQuote {
    pub lines: Vec<QuotedLine>,
    pub subtotal: Money,
    pub discount: Money,
    /// The discount row that produced `discount`, kept for redemption.
    pub discount_code: Option<DiscountCode>,
    pub shipping: ShippingQuote,
    pub tax: TaxQuote,
    pub total: Money,
}

/// A placed, paid order.
#[derive(Debug)]
pub struct PlacedOrder {
    pub order: Order,
    pub transaction_id: String,
}

/// Optional live carrier rating seam.
///
/// When configured, the quote consults the carrier first and falls back to
/// the static zone table on any error or empty answer. Returned methods
/// must include one with id `"standard"` - that is the price checkout
/// charges.
#[async_trait]
pub trait CarrierRates: Send + Sync {
    async fn rate_shipment(
        &self,
        address: &Address,
        total_weight_oz: i64,
    ) -> Result<Vec<ShippingMethod>, String>;
}

/// Checkout orchestrator.
pub struct CheckoutService {
    db: Database,
    gateway: Arc<dyn PaymentGateway>,
    dispatcher: NotificationDispatcher,
    tax_config: TaxConfig,
    carrier: Option<Arc<dyn CarrierRates>>,
}

impl CheckoutService {
    pub fn new(
        db: Database,
        gateway: Arc<dyn PaymentGateway>,
        dispatcher: NotificationDispatcher,
        tax_config: TaxConfig,
    ) -> Self {
        CheckoutService {
            db,
            gateway,
            dispatcher,
            tax_config,
            carrier: None,
        }
    }

    /// Adds a live carrier rating provider.
    pub fn with_carrier(mut self, carrier: Arc<dyn CarrierRates>) -> Self {
        self.carrier = Some(carrier);
        self
    }

    /// Prices a cart without side effects.
    ///
    /// Availability is checked per line so the storefront can show "only N
    /// left" before the customer reaches payment. The check is advisory;
    /// `place_order` re-enforces it inside the ledger transaction.
    pub async fn quote(
        &self,
        request: &CheckoutRequest,
        now: DateTime<Utc>,
    ) -> BillingResult<OrderQuote> {
        let variants = self.db.variants();

        let mut lines = Vec::with_capacity(request.items.len());
        let mut weights = Vec::with_capacity(request.items.len());
        let mut subtotal = Money::zero();

        for item in &request.items {
            let variant = variants.get_by_id(&item.variant_id).await?;

            if !variant.is_available {
                return Err(CoreError::VariantUnavailable { sku: variant.sku }.into());
            }
            if !variant.can_satisfy(item.quantity) {
                return Err(CoreError::InsufficientStock {
                    sku: variant.sku,
                    available: variant.inventory_quantity,
                    requested: item.quantity,
                }
                .into());
            }

            let unit_price = Money::from_cents(variant.price_cents);
            let line_total = unit_price.multiply_quantity(item.quantity);
            subtotal = subtotal + line_total;
            weights.push((variant.weight_oz, item.quantity));

            lines.push(QuotedLine {
                variant_id: variant.id,
                sku: variant.sku,
                title: variant.title,
                unit_price,
                quantity: item.quantity,
                line_total,
            });
        }

        let (discount, discount_code) = match &request.discount_code {
            Some(code) => {
                let row = self
                    .db
                    .discounts()
                    .get_by_code(code)
                    .await?
                    .ok_or(CoreError::Discount(DiscountError::InvalidCode))?;
                let amount =
                    rates::compute_discount(&row, subtotal, now).map_err(CoreError::Discount)?;
                (amount, Some(row))
            }
            None => (Money::zero(), None),
        };

        let weight_oz = rates::compute_weight_oz(&weights);
        let shipping = self
            .shipping_quote(subtotal, weight_oz, &request.shipping_address)
            .await;

        // Tax applies to the discounted goods amount; shipping stays untaxed
        let taxable = subtotal - discount;
        let tax_rates = self
            .db
            .tax_rates()
            .list_active_for_state(&request.shipping_address.state_code())
            .await?;
        let tax = rates::compute_tax(
            self.tax_config,
            &tax_rates,
            taxable,
            &request.shipping_address,
        )?;

        let total = taxable + shipping.standard_price() + tax.tax_amount;

        Ok(OrderQuote {
            lines,
            subtotal,
            discount,
            discount_code,
            shipping,
            tax,
            total,
        })
    }

    /// Carrier-first shipping with zone fallback. Free-threshold orders
    /// never consult the carrier; the static quote already prices them free.
    async fn shipping_quote(
        &self,
        subtotal: Money,
        total_weight_oz: i64,
        address: &Address,
    ) -> ShippingQuote {
        if subtotal < FREE_SHIPPING_THRESHOLD {
            if let Some(carrier) = &self.carrier {
                match carrier.rate_shipment(address, total_weight_oz).await {
                    Ok(methods) if !methods.is_empty() => {
                        return ShippingQuote {
                            methods,
                            total_weight_oz,
                            qualifies_for_free_shipping: false,
                            amount_until_free_shipping: FREE_SHIPPING_THRESHOLD - subtotal,
                        };
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "Carrier rating failed, using zone table");
                    }
                }
            }
        }
        rates::compute_shipping(subtotal, total_weight_oz, address)
    }

    /// Quotes, charges, and records an order.
    ///
    /// Sequence: quote → redeem discount → charge → write order → decrement
    /// stock → notify. A redemption or charge failure leaves no state behind;
    /// once the charge clears, downstream hiccups are logged for admin
    /// follow-up rather than unwound.
    pub async fn place_order(
        &self,
        request: &CheckoutRequest,
        now: DateTime<Utc>,
    ) -> BillingResult<PlacedOrder> {
        let quote = self.quote(request, now).await?;

        let method_id = request
            .payment_method_id
            .as_deref()
            .ok_or_else(|| CoreError::PaymentMethodMissing(request.customer_id.clone()))?;
        let method = self.db.payment_methods().get_by_id(method_id).await?;
        if !method.is_active {
            return Err(CoreError::PaymentMethodMissing(request.customer_id.clone()).into());
        }

        // The last use of a capped code goes to whoever redeems first; the
        // loser errors out here, before any charge
        if let Some(code) = &quote.discount_code {
            match self.db.discounts().redeem(&code.id).await {
                Ok(()) => {}
                Err(DbError::Conflict { .. }) => {
                    return Err(
                        CoreError::Discount(DiscountError::UsageLimitReached).into()
                    )
                }
                Err(e) => return Err(e.into()),
            }
        }

        let reference = format!("ORD-{}", now.timestamp_millis());
        let outcome = self
            .gateway
            .charge(&ChargeRequest {
                customer_profile_id: method.customer_profile_id,
                payment_profile_id: method.payment_profile_id,
                amount: quote.total,
                reference,
                description: "Tailwag Meals order".to_string(),
            })
            .await?;

        let order = self
            .db
            .orders()
            .create(NewOrder {
                customer_id: request.customer_id.clone(),
                items: quote
                    .lines
                    .iter()
                    .map(|line| NewOrderItem {
                        variant_id: line.variant_id.clone(),
                        sku: line.sku.clone(),
                        title: line.title.clone(),
                        unit_price_cents: line.unit_price.cents(),
                        quantity: line.quantity,
                    })
                    .collect(),
                subtotal_cents: quote.subtotal.cents(),
                tax_cents: quote.tax.tax_amount.cents(),
                shipping_cents: quote.shipping.standard_price().cents(),
                discount_cents: quote.discount.cents(),
                total_cents: quote.total.cents(),
                payment_status: PaymentStatus::Paid,
                subscription_id: None,
                transaction_id: Some(outcome.transaction_id.clone()),
                notes: None,
            })
            .await?;

        let ledger = self.db.inventory();
        for line in &quote.lines {
            let result = ledger
                .commit_adjustment(
                    &line.variant_id,
                    -line.quantity,
                    AdjustmentContext::system(AdjustmentReason::Sale).order(&order.id),
                )
                .await;
            if let Err(err) = result {
                // Oversell between quote and charge: money is captured, so
                // this is an admin follow-up, not a checkout failure
                warn!(
                    order_id = %order.id,
                    variant_id = %line.variant_id,
                    error = %err,
                    "Order paid but stock could not be decremented"
                );
            }
        }

        info!(
            order_id = %order.id,
            customer_id = %request.customer_id,
            total = %quote.total,
            "Order placed"
        );

        self.dispatcher
            .notify(NotificationEvent::OrderConfirmation {
                order_id: order.id.clone(),
                customer_id: request.customer_id.clone(),
                total: quote.total,
            })
            .await;

        if quote.total >= HIGH_VALUE_THRESHOLD {
            self.dispatcher
                .notify(NotificationEvent::HighValuePurchase {
                    order_id: order.id.clone(),
                    total: quote.total,
                })
                .await;
        }

        Ok(PlacedOrder {
            order,
            transaction_id: outcome.transaction_id,
        })
    }

    /// Refunds a paid order in full and restocks its items.
    ///
    /// The gateway refund happens first; if the provider says no, nothing
    /// local changes. Restock failures after a successful refund are logged
    /// for admin follow-up.
    pub async fn refund_order(&self, order_id: &str, now: DateTime<Utc>) -> BillingResult<Order> {
        let orders = self.db.orders();
        let order = orders.get_by_id(order_id).await?;

        if order.payment_status != PaymentStatus::Paid {
            return Err(CoreError::OrderNotRefundable {
                order_id: order_id.to_string(),
                reason: "payment is not settled".to_string(),
            }
            .into());
        }
        let transaction_id =
            order
                .transaction_id
                .as_deref()
                .ok_or_else(|| CoreError::OrderNotRefundable {
                    order_id: order_id.to_string(),
                    reason: "no gateway transaction recorded".to_string(),
                })?;

        let refund = self
            .gateway
            .refund(&RefundRequest {
                transaction_id: transaction_id.to_string(),
                amount: order.total(),
                reference: format!("REF-{}", now.timestamp_millis()),
            })
            .await?;

        orders
            .record_payment(order_id, PaymentStatus::Refunded, Some(&refund.transaction_id))
            .await?;
        let order = orders.update_status(order_id, OrderStatus::Refunded).await?;

        let ledger = self.db.inventory();
        for item in orders.items(order_id).await? {
            let result = ledger
                .commit_adjustment(
                    &item.variant_id,
                    item.quantity,
                    AdjustmentContext::system(AdjustmentReason::Return).order(order_id),
                )
                .await;
            if let Err(err) = result {
                warn!(
                    order_id = %order_id,
                    variant_id = %item.variant_id,
                    error = %err,
                    "Refunded order could not be restocked"
                );
            }
        }

        info!(order_id = %order_id, total = %order.total(), "Order refunded");
        Ok(order)
    }
}
