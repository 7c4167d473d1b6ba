//! # Subscription Repository
//!
//! Database operations for subscriptions, their per-cycle invoices, and the
//! append-only history trail.
//!
//! ## Invoice-per-Cycle Idempotency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subscription_invoices: UNIQUE (subscription_id, billing_date)          │
//! │                                                                         │
//! │  cycle 2026-03-01  ──►  invoice #1  paid                                │
//! │  cycle 2026-04-01  ──►  invoice #2  failed  attempt_count=1             │
//! │                          │   retry mutates THIS row:                    │
//! │                          └─► attempt_count=2, next_retry_at advances    │
//! │                                                                         │
//! │  A second billing run for the same cycle finds the existing row and     │
//! │  backs off - the unique index is the hard guard underneath.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status transitions are validated against the state machine in
//! `tailwag_core::schedule` before any write, and every lifecycle change
//! appends a history row in the same transaction.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tailwag_core::schedule::{self, SubscriptionEvent};
use tailwag_core::types::{ActorType, SubscriptionAction, SubscriptionHistory};
use tailwag_core::{
    Frequency, InvoiceStatus, Subscription, SubscriptionInvoice, SubscriptionItem,
    SubscriptionStatus,
};

/// Input for creating a subscription.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub customer_id: String,
    pub frequency: Frequency,
    pub amount_cents: i64,
    pub items: Vec<SubscriptionItem>,
    pub payment_method_id: Option<String>,
    /// First billing date. The scheduler derives every later one.
    pub first_billing_date: NaiveDate,
    pub notes: Option<String>,
}

/// Input for creating a cycle invoice.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub subscription_id: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_method_id: Option<String>,
    /// The cycle being billed (the subscription's next_billing_date).
    pub billing_date: NaiveDate,
}

/// Raw subscription row; `items_json` decodes into the typed item list.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: String,
    customer_id: String,
    status: SubscriptionStatus,
    frequency: Frequency,
    amount_cents: i64,
    next_billing_date: NaiveDate,
    last_billing_date: Option<NaiveDate>,
    started_at: DateTime<Utc>,
    paused_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    payment_method_id: Option<String>,
    items_json: String,
    pause_reason: Option<String>,
    resume_date: Option<NaiveDate>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    fn into_subscription(self) -> DbResult<Subscription> {
        let items: Vec<SubscriptionItem> = serde_json::from_str(&self.items_json)?;
        Ok(Subscription {
            id: self.id,
            customer_id: self.customer_id,
            status: self.status,
            frequency: self.frequency,
            amount_cents: self.amount_cents,
            next_billing_date: self.next_billing_date,
            last_billing_date: self.last_billing_date,
            started_at: self.started_at,
            paused_at: self.paused_at,
            cancelled_at: self.cancelled_at,
            payment_method_id: self.payment_method_id,
            items,
            pause_reason: self.pause_reason,
            resume_date: self.resume_date,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for subscription, invoice, and history operations.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    pool: SqlitePool,
}

impl SubscriptionRepository {
    /// Creates a new SubscriptionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SubscriptionRepository { pool }
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Creates a subscription in `active` status and logs the creation.
    pub async fn create(&self, new: NewSubscription) -> DbResult<Subscription> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let items_json = serde_json::to_string(&new.items)?;

        debug!(customer_id = %new.customer_id, frequency = %new.frequency, "Creating subscription");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, customer_id, status, frequency, amount_cents,
                next_billing_date, started_at, payment_method_id, items_json,
                notes, created_at, updated_at
            )
            VALUES (?1, ?2, 'active', ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            "#,
        )
        .bind(&id)
        .bind(&new.customer_id)
        .bind(new.frequency)
        .bind(new.amount_cents)
        .bind(new.first_billing_date)
        .bind(now)
        .bind(&new.payment_method_id)
        .bind(&items_json)
        .bind(&new.notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        append_history(
            &mut tx,
            &id,
            SubscriptionAction::Created,
            None,
            Some(SubscriptionStatus::Active),
            ActorType::Customer,
            None,
            None,
        )
        .await?;

        tx.commit().await?;
        self.get_by_id(&id).await
    }

    /// Fetches a subscription by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Subscription> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT * FROM subscriptions WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Subscription", id))?;

        row.into_subscription()
    }

    /// Lists a customer's subscriptions, newest first.
    pub async fn list_by_customer(&self, customer_id: &str) -> DbResult<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT * FROM subscriptions WHERE customer_id = ?1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SubscriptionRow::into_subscription).collect()
    }

    /// Lists subscriptions a billing run should look at right now:
    /// `active` rows whose billing date has arrived, plus `past_due` rows
    /// whose failed invoice says the retry window has opened.
    pub async fn list_due(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT s.* FROM subscriptions s
            WHERE (s.status = 'active' AND s.next_billing_date <= ?1)
               OR (s.status = 'past_due' AND EXISTS (
                      SELECT 1 FROM subscription_invoices i
                      WHERE i.subscription_id = s.id
                        AND i.status = 'failed'
                        AND i.next_retry_at IS NOT NULL
                        AND i.next_retry_at <= ?2
                  ))
            ORDER BY s.next_billing_date
            "#,
        )
        .bind(today)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SubscriptionRow::into_subscription).collect()
    }

    /// Pauses an active subscription.
    ///
    /// Records the reason and the customer's requested resume date; billing
    /// skips the subscription until it is explicitly resumed.
    pub async fn pause(
        &self,
        id: &str,
        reason: Option<&str>,
        resume_date: Option<NaiveDate>,
        actor_type: ActorType,
        actor_id: Option<&str>,
    ) -> DbResult<Subscription> {
        let current = self.get_by_id(id).await?;
        let next = schedule::transition(current.status, SubscriptionEvent::Pause)
            .map_err(DbError::Domain)?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = ?2, paused_at = ?3, pause_reason = ?4, resume_date = ?5,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(next)
        .bind(now)
        .bind(reason)
        .bind(resume_date)
        .execute(&mut *tx)
        .await?;

        append_history(
            &mut tx,
            id,
            SubscriptionAction::Paused,
            Some(current.status),
            Some(next),
            actor_type,
            actor_id,
            reason,
        )
        .await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Resumes a paused subscription.
    ///
    /// The next billing date is recomputed from **today**, not the original
    /// schedule - a subscription paused across three missed cycles bills
    /// once, on the new schedule, with no retroactive charges.
    pub async fn resume(
        &self,
        id: &str,
        today: NaiveDate,
        actor_type: ActorType,
        actor_id: Option<&str>,
    ) -> DbResult<Subscription> {
        let current = self.get_by_id(id).await?;
        let next = schedule::transition(current.status, SubscriptionEvent::Resume)
            .map_err(DbError::Domain)?;
        let next_billing = schedule::next_billing_date(today, current.frequency);
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = ?2, next_billing_date = ?3, paused_at = NULL,
                pause_reason = NULL, resume_date = NULL, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(next)
        .bind(next_billing)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        append_history(
            &mut tx,
            id,
            SubscriptionAction::Resumed,
            Some(current.status),
            Some(next),
            actor_type,
            actor_id,
            None,
        )
        .await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Cancels a subscription from any non-terminal status.
    pub async fn cancel(
        &self,
        id: &str,
        actor_type: ActorType,
        actor_id: Option<&str>,
        notes: Option<&str>,
    ) -> DbResult<Subscription> {
        let current = self.get_by_id(id).await?;
        let next = schedule::transition(current.status, SubscriptionEvent::Cancel)
            .map_err(DbError::Domain)?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE subscriptions SET status = ?2, cancelled_at = ?3, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(next)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        append_history(
            &mut tx,
            id,
            SubscriptionAction::Cancelled,
            Some(current.status),
            Some(next),
            actor_type,
            actor_id,
            notes,
        )
        .await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    /// Applies a state-machine event with a history entry. Used by the
    /// billing run for the past_due / reactivation / exhaustion moves.
    pub async fn apply_billing_transition(
        &self,
        id: &str,
        event: SubscriptionEvent,
        action: SubscriptionAction,
        notes: Option<&str>,
    ) -> DbResult<SubscriptionStatus> {
        let current = self.get_by_id(id).await?;
        let next = schedule::transition(current.status, event).map_err(DbError::Domain)?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE subscriptions SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(next)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        append_history(
            &mut tx,
            id,
            action,
            Some(current.status),
            Some(next),
            ActorType::System,
            None,
            notes,
        )
        .await?;
        tx.commit().await?;

        Ok(next)
    }

    /// Records a successful billing: stamps the billed cycle and advances
    /// the schedule. Status handling is the caller's job (a past_due
    /// subscription also needs `apply_billing_transition`).
    pub async fn record_billing_success(
        &self,
        id: &str,
        billed_date: NaiveDate,
        next_billing_date: NaiveDate,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET last_billing_date = ?2, next_billing_date = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(billed_date)
        .bind(next_billing_date)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Subscription", id));
        }
        Ok(())
    }

    /// Swaps the vaulted payment method, with an audit entry.
    pub async fn update_payment_method(
        &self,
        id: &str,
        payment_method_id: &str,
        actor_type: ActorType,
        actor_id: Option<&str>,
    ) -> DbResult<()> {
        let current = self.get_by_id(id).await?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE subscriptions SET payment_method_id = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(payment_method_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        append_history(
            &mut tx,
            id,
            SubscriptionAction::PaymentMethodChanged,
            Some(current.status),
            Some(current.status),
            actor_type,
            actor_id,
            None,
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Invoices
    // =========================================================================

    /// Creates the invoice for a billing cycle.
    ///
    /// The `(subscription_id, billing_date)` unique index makes this the
    /// idempotency choke point: a concurrent duplicate run hits
    /// `UniqueViolation` here and backs off.
    pub async fn create_invoice(&self, new: NewInvoice) -> DbResult<SubscriptionInvoice> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let invoice_number = format!(
            "INV-{}-{}",
            now.timestamp_millis(),
            &new.subscription_id[..8.min(new.subscription_id.len())]
        );
        // Due a week after the cycle date
        let due_date = new.billing_date + Duration::days(7);

        sqlx::query(
            r#"
            INSERT INTO subscription_invoices (
                id, subscription_id, invoice_number, status,
                subtotal_cents, tax_cents, shipping_cents, discount_cents, total_cents,
                payment_method_id, billing_date, due_date, attempt_count,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0, ?12, ?12)
            "#,
        )
        .bind(&id)
        .bind(&new.subscription_id)
        .bind(&invoice_number)
        .bind(new.subtotal_cents)
        .bind(new.tax_cents)
        .bind(new.shipping_cents)
        .bind(new.discount_cents)
        .bind(new.total_cents)
        .bind(&new.payment_method_id)
        .bind(new.billing_date)
        .bind(due_date)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_invoice(&id).await
    }

    /// Fetches an invoice by ID.
    pub async fn get_invoice(&self, id: &str) -> DbResult<SubscriptionInvoice> {
        sqlx::query_as::<_, SubscriptionInvoice>(
            "SELECT * FROM subscription_invoices WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Invoice", id))
    }

    /// Finds the invoice covering a subscription's billing cycle, if any.
    pub async fn find_invoice_for_cycle(
        &self,
        subscription_id: &str,
        billing_date: NaiveDate,
    ) -> DbResult<Option<SubscriptionInvoice>> {
        let invoice = sqlx::query_as::<_, SubscriptionInvoice>(
            r#"
            SELECT * FROM subscription_invoices
            WHERE subscription_id = ?1 AND billing_date = ?2
            "#,
        )
        .bind(subscription_id)
        .bind(billing_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Lists a subscription's invoices, newest cycle first.
    pub async fn list_invoices(&self, subscription_id: &str) -> DbResult<Vec<SubscriptionInvoice>> {
        let invoices = sqlx::query_as::<_, SubscriptionInvoice>(
            r#"
            SELECT * FROM subscription_invoices
            WHERE subscription_id = ?1
            ORDER BY billing_date DESC
            "#,
        )
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    /// Marks an invoice paid and records the attempt that did it.
    pub async fn mark_invoice_paid(
        &self,
        id: &str,
        transaction_id: &str,
        order_id: Option<&str>,
    ) -> DbResult<SubscriptionInvoice> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE subscription_invoices
            SET status = 'paid', transaction_id = ?2, order_id = ?3,
                paid_at = ?4, last_attempt_at = ?4, next_retry_at = NULL,
                attempt_count = attempt_count + 1, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(transaction_id)
        .bind(order_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }
        self.get_invoice(id).await
    }

    /// Records a failed attempt on an invoice, mutating the cycle's row in
    /// place: `attempt_count` climbs, `next_retry_at` advances (or clears
    /// once the ladder is exhausted).
    pub async fn record_invoice_failure(
        &self,
        id: &str,
        next_retry_at: Option<DateTime<Utc>>,
    ) -> DbResult<SubscriptionInvoice> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE subscription_invoices
            SET status = 'failed', attempt_count = attempt_count + 1,
                last_attempt_at = ?2, next_retry_at = ?3, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(next_retry_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }
        self.get_invoice(id).await
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Lists the audit trail for a subscription, newest first.
    pub async fn history(&self, subscription_id: &str) -> DbResult<Vec<SubscriptionHistory>> {
        let rows = sqlx::query_as::<_, SubscriptionHistory>(
            r#"
            SELECT * FROM subscription_history
            WHERE subscription_id = ?1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Appends a standalone history entry (e.g., payment succeeded/failed
    /// notes from the billing run).
    pub async fn log_history(
        &self,
        subscription_id: &str,
        action: SubscriptionAction,
        actor_type: ActorType,
        notes: Option<&str>,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        append_history(
            &mut tx,
            subscription_id,
            action,
            None,
            None,
            actor_type,
            None,
            notes,
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
async fn append_history(
    tx: &mut Transaction<'_, Sqlite>,
    subscription_id: &str,
    action: SubscriptionAction,
    old_status: Option<SubscriptionStatus>,
    new_status: Option<SubscriptionStatus>,
    actor_type: ActorType,
    actor_id: Option<&str>,
    notes: Option<&str>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO subscription_history (
            id, subscription_id, action, old_status, new_status,
            actor_type, actor_id, notes, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(subscription_id)
    .bind(action)
    .bind(old_status)
    .bind(new_status)
    .bind(actor_type)
    .bind(actor_id)
    .bind(notes)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn weekly_box() -> NewSubscription {
        NewSubscription {
            customer_id: "cust-1".into(),
            frequency: Frequency::Weekly,
            amount_cents: 5_998,
            items: vec![SubscriptionItem {
                variant_id: Uuid::new_v4().to_string(),
                sku: "CHKN-BOWL-5LB".into(),
                name: "Chicken & Rice Bowl - 5 lb".into(),
                quantity: 2,
                unit_price_cents: 2_999,
            }],
            payment_method_id: Some("pm-1".into()),
            first_billing_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_round_trips_items() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.subscriptions();

        let sub = repo.create(weekly_box()).await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.items.len(), 1);
        assert_eq!(sub.items[0].quantity, 2);

        let history = repo.history(&sub.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, SubscriptionAction::Created);
    }

    #[tokio::test]
    async fn test_pause_resume_recomputes_from_today() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.subscriptions();
        let sub = repo.create(weekly_box()).await.unwrap();

        let paused = repo
            .pause(&sub.id, Some("vacation"), None, ActorType::Customer, None)
            .await
            .unwrap();
        assert_eq!(paused.status, SubscriptionStatus::Paused);
        assert_eq!(paused.pause_reason.as_deref(), Some("vacation"));

        // Resume long after several missed cycles
        let today = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();
        let resumed = repo
            .resume(&sub.id, today, ActorType::Customer, None)
            .await
            .unwrap();
        assert_eq!(resumed.status, SubscriptionStatus::Active);
        // One week from today, not from the stale March date
        assert_eq!(
            resumed.next_billing_date,
            NaiveDate::from_ymd_opt(2026, 5, 17).unwrap()
        );
        assert!(resumed.pause_reason.is_none());
    }

    #[tokio::test]
    async fn test_resume_requires_paused() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.subscriptions();
        let sub = repo.create(weekly_box()).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let err = repo
            .resume(&sub.id, today, ActorType::Customer, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(_)));
    }

    #[tokio::test]
    async fn test_cancel_is_terminal() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.subscriptions();
        let sub = repo.create(weekly_box()).await.unwrap();

        let cancelled = repo
            .cancel(&sub.id, ActorType::Admin, Some("admin-1"), None)
            .await
            .unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());

        assert!(repo
            .pause(&sub.id, None, None, ActorType::Customer, None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_invoice_per_cycle_unique() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.subscriptions();
        let sub = repo.create(weekly_box()).await.unwrap();

        let invoice = NewInvoice {
            subscription_id: sub.id.clone(),
            subtotal_cents: 5_998,
            tax_cents: 0,
            shipping_cents: 0,
            discount_cents: 0,
            total_cents: 5_998,
            payment_method_id: sub.payment_method_id.clone(),
            billing_date: sub.next_billing_date,
        };
        repo.create_invoice(invoice.clone()).await.unwrap();

        let err = repo.create_invoice(invoice).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_invoice_failure_mutates_in_place() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.subscriptions();
        let sub = repo.create(weekly_box()).await.unwrap();

        let invoice = repo
            .create_invoice(NewInvoice {
                subscription_id: sub.id.clone(),
                subtotal_cents: 5_998,
                tax_cents: 0,
                shipping_cents: 0,
                discount_cents: 0,
                total_cents: 5_998,
                payment_method_id: None,
                billing_date: sub.next_billing_date,
            })
            .await
            .unwrap();
        assert_eq!(invoice.attempt_count, 0);

        let retry_at = Utc::now() + Duration::days(3);
        let failed = repo
            .record_invoice_failure(&invoice.id, Some(retry_at))
            .await
            .unwrap();
        assert_eq!(failed.status, InvoiceStatus::Failed);
        assert_eq!(failed.attempt_count, 1);
        assert!(failed.next_retry_at.is_some());

        // Retry succeeds: same row flips to paid
        let paid = repo
            .mark_invoice_paid(&invoice.id, "txn-99", None)
            .await
            .unwrap();
        assert_eq!(paid.id, invoice.id);
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_eq!(paid.attempt_count, 2);
        assert!(paid.next_retry_at.is_none());

        // Still exactly one invoice for the cycle
        assert_eq!(repo.list_invoices(&sub.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_due_picks_up_active_and_retries() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.subscriptions();
        let sub = repo.create(weekly_box()).await.unwrap();

        let before = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        let on = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert!(repo.list_due(before, Utc::now()).await.unwrap().is_empty());
        assert_eq!(repo.list_due(on, Utc::now()).await.unwrap().len(), 1);

        // Fail the cycle and move to past_due: only due again once the
        // retry window opens
        let invoice = repo
            .create_invoice(NewInvoice {
                subscription_id: sub.id.clone(),
                subtotal_cents: 5_998,
                tax_cents: 0,
                shipping_cents: 0,
                discount_cents: 0,
                total_cents: 5_998,
                payment_method_id: None,
                billing_date: on,
            })
            .await
            .unwrap();
        repo.record_invoice_failure(&invoice.id, Some(Utc::now() + Duration::days(3)))
            .await
            .unwrap();
        repo.apply_billing_transition(
            &sub.id,
            SubscriptionEvent::BillingFailed,
            SubscriptionAction::PaymentFailed,
            None,
        )
        .await
        .unwrap();

        assert!(repo.list_due(on, Utc::now()).await.unwrap().is_empty());
        assert_eq!(
            repo.list_due(on, Utc::now() + Duration::days(4))
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
