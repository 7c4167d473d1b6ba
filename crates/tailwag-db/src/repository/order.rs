//! # Order Repository
//!
//! Database operations for orders and their line items. Order + items are
//! written in one transaction; line items freeze SKU, title, and unit price
//! at purchase time.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tailwag_core::{Order, OrderItem, OrderStatus, PaymentStatus};

/// Input line item for order creation.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub variant_id: String,
    pub sku: String,
    pub title: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

/// Input for creating an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: String,
    pub items: Vec<NewOrderItem>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub payment_status: PaymentStatus,
    pub subscription_id: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

/// Repository for order operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Creates an order with its line items in one transaction.
    pub async fn create(&self, new: NewOrder) -> DbResult<Order> {
        let order_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(
            customer_id = %new.customer_id,
            items = new.items.len(),
            total_cents = new.total_cents,
            "Creating order"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, status, payment_status,
                subtotal_cents, tax_cents, shipping_cents, discount_cents, total_cents,
                subscription_id, transaction_id, notes, created_at, updated_at
            )
            VALUES (?1, ?2, 'pending', ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
            "#,
        )
        .bind(&order_id)
        .bind(&new.customer_id)
        .bind(new.payment_status)
        .bind(new.subtotal_cents)
        .bind(new.tax_cents)
        .bind(new.shipping_cents)
        .bind(new.discount_cents)
        .bind(new.total_cents)
        .bind(&new.subscription_id)
        .bind(&new.transaction_id)
        .bind(&new.notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for item in &new.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, variant_id, sku_snapshot, title_snapshot,
                    unit_price_cents, quantity, line_total_cents, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&order_id)
            .bind(&item.variant_id)
            .bind(&item.sku)
            .bind(&item.title)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.unit_price_cents * item.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_by_id(&order_id).await
    }

    /// Fetches an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Order> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    /// Fetches an order's line items.
    pub async fn items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = ?1 ORDER BY created_at",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists a customer's orders, newest first.
    pub async fn list_by_customer(&self, customer_id: &str, limit: u32) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE customer_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(customer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Advances the fulfillment status.
    ///
    /// The transition is validated against the order state machine, so a
    /// delivered order cannot be cancelled and statuses cannot be skipped.
    pub async fn update_status(&self, id: &str, next: OrderStatus) -> DbResult<Order> {
        let order = self.get_by_id(id).await?;

        if !order.status.can_transition_to(next) {
            return Err(DbError::QueryFailed(format!(
                "Order {} cannot move from {:?} to {:?}",
                id, order.status, next
            )));
        }

        sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(next)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        debug!(order_id = %id, from = ?order.status, to = ?next, "Order status updated");
        self.get_by_id(id).await
    }

    /// Updates payment status and gateway transaction reference.
    pub async fn record_payment(
        &self,
        id: &str,
        payment_status: PaymentStatus,
        transaction_id: Option<&str>,
    ) -> DbResult<Order> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_status = ?2, transaction_id = COALESCE(?3, transaction_id),
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(payment_status)
        .bind(transaction_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }
        self.get_by_id(id).await
    }

    /// Appends to the order's notes. The only field mutable after delivery.
    pub async fn set_notes(&self, id: &str, notes: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE orders SET notes = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(notes)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn sample_order() -> NewOrder {
        NewOrder {
            customer_id: "cust-1".into(),
            items: vec![
                NewOrderItem {
                    variant_id: Uuid::new_v4().to_string(),
                    sku: "CHKN-BOWL-5LB".into(),
                    title: "Chicken & Rice Bowl - 5 lb".into(),
                    unit_price_cents: 4_999,
                    quantity: 2,
                },
                NewOrderItem {
                    variant_id: Uuid::new_v4().to_string(),
                    sku: "BEEF-TREAT-8OZ".into(),
                    title: "Beef Training Treats - 8 oz".into(),
                    unit_price_cents: 1_299,
                    quantity: 1,
                },
            ],
            subtotal_cents: 11_297,
            tax_cents: 819,
            shipping_cents: 999,
            discount_cents: 0,
            total_cents: 13_115,
            payment_status: PaymentStatus::Paid,
            subscription_id: None,
            transaction_id: Some("txn-42".into()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_order_with_items() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();

        let order = repo.create(sample_order()).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.total_cents, 13_115);

        let items = repo.items(&order.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].line_total_cents, 9_998);
        assert_eq!(items[0].sku_snapshot, "CHKN-BOWL-5LB");
    }

    #[tokio::test]
    async fn test_status_transitions_enforced() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();
        let order = repo.create(sample_order()).await.unwrap();

        // Can't skip straight to delivered
        assert!(repo
            .update_status(&order.id, OrderStatus::Delivered)
            .await
            .is_err());

        let order = repo
            .update_status(&order.id, OrderStatus::Processing)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        let order = repo
            .update_status(&order.id, OrderStatus::Shipped)
            .await
            .unwrap();
        let order = repo
            .update_status(&order.id, OrderStatus::Delivered)
            .await
            .unwrap();

        // Delivered orders are immutable except for notes
        assert!(repo
            .update_status(&order.id, OrderStatus::Cancelled)
            .await
            .is_err());
        repo.set_notes(&order.id, "left at front door").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_by_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.orders();

        repo.create(sample_order()).await.unwrap();
        repo.create(sample_order()).await.unwrap();

        let orders = repo.list_by_customer("cust-1", 10).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(repo.list_by_customer("cust-2", 10).await.unwrap().is_empty());
    }
}
