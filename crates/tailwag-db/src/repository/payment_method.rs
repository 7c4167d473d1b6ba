//! # Payment Method Repository
//!
//! Vault-reference storage. Rows hold the card vault's profile identifiers
//! plus masked display metadata; the PAN never touches this database.
//! Methods are soft-deactivated rather than deleted so historical invoices
//! keep a valid reference.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tailwag_core::types::{CardBrand, PaymentMethod};

/// Input for storing a vaulted payment method.
#[derive(Debug, Clone)]
pub struct NewPaymentMethod {
    pub customer_id: String,
    pub customer_profile_id: String,
    pub payment_profile_id: String,
    pub card_brand: Option<CardBrand>,
    pub last_four: Option<String>,
    pub expiration_month: Option<i64>,
    pub expiration_year: Option<i64>,
    pub make_default: bool,
}

/// Repository for payment method operations.
#[derive(Debug, Clone)]
pub struct PaymentMethodRepository {
    pool: SqlitePool,
}

impl PaymentMethodRepository {
    /// Creates a new PaymentMethodRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentMethodRepository { pool }
    }

    /// Stores a vaulted payment method.
    ///
    /// When `make_default` is set, any previous default for the customer is
    /// demoted in the same transaction.
    pub async fn create(&self, new: NewPaymentMethod) -> DbResult<PaymentMethod> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(customer_id = %new.customer_id, "Storing payment method");

        let mut tx = self.pool.begin().await?;

        if new.make_default {
            sqlx::query(
                "UPDATE payment_methods SET is_default = 0, updated_at = ?2 WHERE customer_id = ?1",
            )
            .bind(&new.customer_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO payment_methods (
                id, customer_id, customer_profile_id, payment_profile_id,
                card_brand, last_four, expiration_month, expiration_year,
                is_default, is_active, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?10)
            "#,
        )
        .bind(&id)
        .bind(&new.customer_id)
        .bind(&new.customer_profile_id)
        .bind(&new.payment_profile_id)
        .bind(new.card_brand)
        .bind(&new.last_four)
        .bind(new.expiration_month)
        .bind(new.expiration_year)
        .bind(new.make_default)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get_by_id(&id).await
    }

    /// Fetches a payment method by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<PaymentMethod> {
        sqlx::query_as::<_, PaymentMethod>("SELECT * FROM payment_methods WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Payment method", id))
    }

    /// Lists a customer's active payment methods, default first.
    pub async fn list_active(&self, customer_id: &str) -> DbResult<Vec<PaymentMethod>> {
        let methods = sqlx::query_as::<_, PaymentMethod>(
            r#"
            SELECT * FROM payment_methods
            WHERE customer_id = ?1 AND is_active = 1
            ORDER BY is_default DESC, created_at DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(methods)
    }

    /// Returns the customer's default active method, if any.
    pub async fn get_default(&self, customer_id: &str) -> DbResult<Option<PaymentMethod>> {
        let method = sqlx::query_as::<_, PaymentMethod>(
            r#"
            SELECT * FROM payment_methods
            WHERE customer_id = ?1 AND is_active = 1 AND is_default = 1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(method)
    }

    /// Makes the given method the customer's default, demoting the rest.
    pub async fn set_default(&self, id: &str) -> DbResult<()> {
        let method = self.get_by_id(id).await?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE payment_methods SET is_default = 0, updated_at = ?2 WHERE customer_id = ?1",
        )
        .bind(&method.customer_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE payment_methods SET is_default = 1, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Soft-deactivates a payment method.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE payment_methods SET is_active = 0, is_default = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payment method", id));
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

    fn visa(customer: &str, payment_profile: &str, default: bool) -> NewPaymentMethod {
        NewPaymentMethod {
            customer_id: customer.into(),
            customer_profile_id: "vault-cust-1".into(),
            payment_profile_id: payment_profile.into(),
            card_brand: Some(CardBrand::Visa),
            last_four: Some("4242".into()),
            expiration_month: Some(12),
            expiration_year: Some(2028),
            make_default: default,
        }
    }

    #[tokio::test]
    async fn test_default_is_exclusive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.payment_methods();

        let first = repo.create(visa("cust-1", "pp-1", true)).await.unwrap();
        let second = repo.create(visa("cust-1", "pp-2", true)).await.unwrap();

        let methods = repo.list_active("cust-1").await.unwrap();
        assert_eq!(methods.len(), 2);
        let default = repo.get_default("cust-1").await.unwrap().unwrap();
        assert_eq!(default.id, second.id);

        repo.set_default(&first.id).await.unwrap();
        let default = repo.get_default("cust-1").await.unwrap().unwrap();
        assert_eq!(default.id, first.id);
    }

    #[tokio::test]
    async fn test_deactivate_hides_but_keeps_row() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.payment_methods();

        let method = repo.create(visa("cust-1", "pp-1", true)).await.unwrap();
        repo.deactivate(&method.id).await.unwrap();

        assert!(repo.list_active("cust-1").await.unwrap().is_empty());
        assert!(repo.get_default("cust-1").await.unwrap().is_none());
        // The row itself survives for invoice references
        let row = repo.get_by_id(&method.id).await.unwrap();
        assert!(!row.is_active);
    }

    #[tokio::test]
    async fn test_duplicate_vault_profile_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.payment_methods();

        repo.create(visa("cust-1", "pp-1", true)).await.unwrap();
        let err = repo.create(visa("cust-1", "pp-1", false)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
