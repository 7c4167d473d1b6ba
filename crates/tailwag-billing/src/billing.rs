//! # Billing Run
//!
//! Charges one subscription for its current cycle, with the dunning and
//! idempotency policy around it.
//!
//! ## Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  run_billing(subscription_id, now)                                      │
//! │                                                                         │
//! │  1. load subscription ── not billable? ──► error                        │
//! │  2. invoice for this cycle already exists?                              │
//! │        paid/pending ──► Skipped (idempotency guard)                     │
//! │        failed, retry not due ──► Skipped                                │
//! │        failed, ladder exhausted ──► cancel subscription, Skipped        │
//! │        failed, retry due ──► reuse THAT row                             │
//! │        none ──► create pending invoice                                  │
//! │  3. charge vaulted payment method                                       │
//! │        │                                                                │
//! │        ├─ success: order → invoice paid → advance schedule →            │
//! │        │           ledger decrement per item → history → notify         │
//! │        │                                                                │
//! │        └─ failure: invoice failed (attempt_count += 1, retry ladder)    │
//! │                    → past_due (or cancelled when exhausted)             │
//! │                    → history → notify. Inventory untouched.             │
//! │                                                                         │
//! │  Notification failures are logged and dropped - money and stock are     │
//! │  already committed and a mail outage must not unwind them.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Crash resumability comes from the idempotency guard, not transactions
//! spanning the gateway: re-invoking after a crash either finds the paid
//! invoice (done), the pending invoice (charge may have left the building -
//! hold for admin review), or nothing (safe to charge).

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use tailwag_core::schedule::{self, SubscriptionEvent};
use tailwag_core::types::{ActorType, SubscriptionAction};
use tailwag_core::{
    AdjustmentReason, CoreError, InvoiceStatus, Money, Subscription, SubscriptionInvoice,
    SubscriptionStatus,
};
use tailwag_db::repository::inventory::AdjustmentContext;
use tailwag_db::repository::order::{NewOrder, NewOrderItem};
use tailwag_db::repository::subscription::NewInvoice;
use tailwag_db::Database;

use crate::error::BillingResult;
use crate::gateway::{ChargeRequest, PaymentGateway};
use crate::notify::{NotificationDispatcher, NotificationEvent};

/// Why a billing run declined to charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The subscription's next billing date is still in the future.
    NotDue,
    /// The cycle already has a paid or in-flight invoice.
    CycleAlreadyBilled,
    /// The failed invoice's retry window has not opened yet.
    RetryNotDue,
    /// The retry ladder ran out; the subscription was cancelled.
    RetriesExhausted,
}

/// Outcome of one billing run invocation.
#[derive(Debug)]
pub enum BillingOutcome {
    /// Charge went through; the cycle is settled.
    Charged {
        invoice: SubscriptionInvoice,
        order_id: String,
    },
    /// Charge failed; dunning state advanced.
    Failed {
        invoice: SubscriptionInvoice,
        new_status: SubscriptionStatus,
    },
    /// Nothing to do for this cycle.
    Skipped(SkipReason),
}

/// Batch summary for a scheduled run over all due subscriptions.
#[derive(Debug, Default)]
pub struct BillingRunSummary {
    pub processed: usize,
    pub charged: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Subscriptions whose run errored outright (id, message).
    pub errors: Vec<(String, String)>,
}

/// The billing orchestrator.
pub struct BillingRun {
    db: Database,
    gateway: Arc<dyn PaymentGateway>,
    dispatcher: NotificationDispatcher,
}

impl BillingRun {
    /// Creates a billing run over the given database, gateway, and
    /// notification dispatcher.
    pub fn new(
        db: Database,
        gateway: Arc<dyn PaymentGateway>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        BillingRun {
            db,
            gateway,
            dispatcher,
        }
    }

    /// Bills one subscription for its current cycle.
    ///
    /// `now` is injected for determinism; production callers pass
    /// `Utc::now()`.
    pub async fn run_billing(
        &self,
        subscription_id: &str,
        now: DateTime<Utc>,
    ) -> BillingResult<BillingOutcome> {
        let subscription = self.db.subscriptions().get_by_id(subscription_id).await?;

        if !subscription.status.is_billable() {
            return Err(CoreError::SubscriptionNotBillable {
                subscription_id: subscription_id.to_string(),
                status: subscription.status.to_string(),
            }
            .into());
        }

        if subscription.next_billing_date > now.date_naive() {
            return Ok(BillingOutcome::Skipped(SkipReason::NotDue));
        }

        // A missing or deactivated payment method fails fast, before any
        // invoice exists and without burning a dunning attempt
        let method = self.resolve_payment_method(&subscription).await?;

        // Idempotency guard: one invoice per cycle, whatever happens to it
        let invoice = match self
            .db
            .subscriptions()
            .find_invoice_for_cycle(subscription_id, subscription.next_billing_date)
            .await?
        {
            Some(existing) => match existing.status {
                InvoiceStatus::Paid | InvoiceStatus::Pending | InvoiceStatus::Refunded => {
                    info!(
                        subscription_id = %subscription_id,
                        invoice = %existing.invoice_number,
                        status = ?existing.status,
                        "Cycle already has an invoice, skipping"
                    );
                    return Ok(BillingOutcome::Skipped(SkipReason::CycleAlreadyBilled));
                }
                InvoiceStatus::Failed => {
                    if schedule::retries_exhausted(existing.attempt_count) {
                        self.db
                            .subscriptions()
                            .apply_billing_transition(
                                subscription_id,
                                SubscriptionEvent::RetriesExhausted,
                                SubscriptionAction::Cancelled,
                                Some("billing retries exhausted"),
                            )
                            .await?;
                        return Ok(BillingOutcome::Skipped(SkipReason::RetriesExhausted));
                    }
                    if existing.next_retry_at.is_some_and(|at| at > now) {
                        return Ok(BillingOutcome::Skipped(SkipReason::RetryNotDue));
                    }
                    existing
                }
            },
            None => {
                self.db
                    .subscriptions()
                    .create_invoice(NewInvoice {
                        subscription_id: subscription_id.to_string(),
                        subtotal_cents: subscription.amount_cents,
                        tax_cents: 0,
                        shipping_cents: 0,
                        discount_cents: 0,
                        total_cents: subscription.amount_cents,
                        payment_method_id: subscription.payment_method_id.clone(),
                        billing_date: subscription.next_billing_date,
                    })
                    .await?
            }
        };

        match self.charge(&method, &invoice).await {
            Ok(transaction_id) => {
                self.settle_success(&subscription, &invoice, &transaction_id)
                    .await
            }
            Err(err) => {
                warn!(
                    subscription_id = %subscription_id,
                    invoice = %invoice.invoice_number,
                    error = %err,
                    "Charge failed"
                );
                self.settle_failure(&subscription, &invoice, now).await
            }
        }
    }

    /// Runs billing for every due subscription: active rows whose date has
    /// arrived plus past_due rows whose retry window has opened. One
    /// subscription's error never aborts the batch.
    pub async fn process_due_subscriptions(
        &self,
        now: DateTime<Utc>,
    ) -> BillingResult<BillingRunSummary> {
        let due = self
            .db
            .subscriptions()
            .list_due(now.date_naive(), now)
            .await?;

        info!(count = due.len(), "Processing due subscriptions");

        let mut summary = BillingRunSummary::default();
        for subscription in due {
            summary.processed += 1;
            match self.run_billing(&subscription.id, now).await {
                Ok(BillingOutcome::Charged { .. }) => summary.charged += 1,
                Ok(BillingOutcome::Failed { .. }) => summary.failed += 1,
                Ok(BillingOutcome::Skipped(_)) => summary.skipped += 1,
                Err(err) => {
                    warn!(subscription_id = %subscription.id, error = %err, "Billing run errored");
                    summary.errors.push((subscription.id, err.to_string()));
                }
            }
        }

        info!(
            processed = summary.processed,
            charged = summary.charged,
            failed = summary.failed,
            skipped = summary.skipped,
            errors = summary.errors.len(),
            "Billing batch complete"
        );
        Ok(summary)
    }

    async fn charge(
        &self,
        method: &tailwag_core::PaymentMethod,
        invoice: &SubscriptionInvoice,
    ) -> Result<String, crate::gateway::GatewayError> {
        let outcome = self
            .gateway
            .charge(&ChargeRequest {
                customer_profile_id: method.customer_profile_id.clone(),
                payment_profile_id: method.payment_profile_id.clone(),
                amount: invoice.total(),
                reference: invoice.invoice_number.clone(),
                description: "Tailwag Meals subscription".to_string(),
            })
            .await?;

        Ok(outcome.transaction_id)
    }

    async fn resolve_payment_method(
        &self,
        subscription: &Subscription,
    ) -> BillingResult<tailwag_core::PaymentMethod> {
        let method_id = subscription.payment_method_id.as_deref().ok_or_else(|| {
            CoreError::PaymentMethodMissing(subscription.id.clone())
        })?;
        let method = self.db.payment_methods().get_by_id(method_id).await?;
        if !method.is_active {
            return Err(CoreError::PaymentMethodMissing(subscription.id.clone()).into());
        }
        Ok(method)
    }

    async fn settle_success(
        &self,
        subscription: &Subscription,
        invoice: &SubscriptionInvoice,
        transaction_id: &str,
    ) -> BillingResult<BillingOutcome> {
        let subscriptions = self.db.subscriptions();

        // Order record for fulfillment, frozen from the subscription items
        let order = self
            .db
            .orders()
            .create(NewOrder {
                customer_id: subscription.customer_id.clone(),
                items: subscription
                    .items
                    .iter()
                    .map(|item| NewOrderItem {
                        variant_id: item.variant_id.clone(),
                        sku: item.sku.clone(),
                        title: item.name.clone(),
                        unit_price_cents: item.unit_price_cents,
                        quantity: item.quantity,
                    })
                    .collect(),
                subtotal_cents: invoice.subtotal_cents,
                tax_cents: invoice.tax_cents,
                shipping_cents: invoice.shipping_cents,
                discount_cents: invoice.discount_cents,
                total_cents: invoice.total_cents,
                payment_status: tailwag_core::PaymentStatus::Paid,
                subscription_id: Some(subscription.id.clone()),
                transaction_id: Some(transaction_id.to_string()),
                notes: None,
            })
            .await?;

        let invoice = subscriptions
            .mark_invoice_paid(&invoice.id, transaction_id, Some(&order.id))
            .await?;

        // Advance the schedule from the billed cycle, not from today
        let next = schedule::next_billing_date(invoice.billing_date, subscription.frequency);
        subscriptions
            .record_billing_success(&subscription.id, invoice.billing_date, next)
            .await?;

        if subscription.status == SubscriptionStatus::PastDue {
            subscriptions
                .apply_billing_transition(
                    &subscription.id,
                    SubscriptionEvent::RetrySucceeded,
                    SubscriptionAction::PaymentSucceeded,
                    Some("retry charge succeeded"),
                )
                .await?;
        } else {
            subscriptions
                .log_history(
                    &subscription.id,
                    SubscriptionAction::PaymentSucceeded,
                    ActorType::System,
                    Some(&invoice.invoice_number),
                )
                .await?;
        }

        // Stock decrements come after the money is settled; a shortfall is
        // an admin problem, never a reason to unwind the charge
        let ledger = self.db.inventory();
        for item in &subscription.items {
            let result = ledger
                .commit_adjustment(
                    &item.variant_id,
                    -item.quantity,
                    AdjustmentContext::system(AdjustmentReason::Subscription)
                        .subscription(&subscription.id)
                        .order(&order.id),
                )
                .await;
            if let Err(err) = result {
                warn!(
                    subscription_id = %subscription.id,
                    variant_id = %item.variant_id,
                    error = %err,
                    "Subscription fulfillment could not decrement stock"
                );
            }
        }

        info!(
            subscription_id = %subscription.id,
            invoice = %invoice.invoice_number,
            total = %Money::from_cents(invoice.total_cents),
            "Subscription billed"
        );

        self.dispatcher
            .notify(NotificationEvent::SubscriptionBilled {
                subscription_id: subscription.id.clone(),
                customer_id: subscription.customer_id.clone(),
                invoice_number: invoice.invoice_number.clone(),
                total: invoice.total(),
            })
            .await;

        Ok(BillingOutcome::Charged {
            invoice,
            order_id: order.id,
        })
    }

    async fn settle_failure(
        &self,
        subscription: &Subscription,
        invoice: &SubscriptionInvoice,
        now: DateTime<Utc>,
    ) -> BillingResult<BillingOutcome> {
        let subscriptions = self.db.subscriptions();

        let attempts = invoice.attempt_count + 1;
        let next_retry = schedule::next_retry_at(attempts, now);
        let invoice = subscriptions
            .record_invoice_failure(&invoice.id, next_retry)
            .await?;

        let new_status = if schedule::retries_exhausted(attempts) {
            subscriptions
                .apply_billing_transition(
                    &subscription.id,
                    SubscriptionEvent::RetriesExhausted,
                    SubscriptionAction::Cancelled,
                    Some("billing retries exhausted"),
                )
                .await?
        } else {
            subscriptions
                .apply_billing_transition(
                    &subscription.id,
                    SubscriptionEvent::BillingFailed,
                    SubscriptionAction::PaymentFailed,
                    Some(&invoice.invoice_number),
                )
                .await?
        };

        self.dispatcher
            .notify(NotificationEvent::SubscriptionPaymentFailed {
                subscription_id: subscription.id.clone(),
                customer_id: subscription.customer_id.clone(),
                invoice_number: invoice.invoice_number.clone(),
                attempt_count: invoice.attempt_count,
            })
            .await;

        Ok(BillingOutcome::Failed {
            invoice,
            new_status,
        })
    }
}
