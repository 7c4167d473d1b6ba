//! # Discount Repository
//!
//! Discount code storage and redemption. Codes are stored upper-case;
//! lookups normalize the same way, so the customer can type the code in any
//! case.
//!
//! Redemption uses a conditional increment (`usage_count < usage_limit` in
//! the UPDATE predicate) so two simultaneous redemptions of a
//! one-use-remaining code cannot both slip past the limit.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tailwag_core::validation::normalize_discount_code;
use tailwag_core::{DiscountCode, DiscountType};

/// Input for creating a discount code.
#[derive(Debug, Clone)]
pub struct NewDiscountCode {
    pub code: String,
    pub discount_type: DiscountType,
    /// Percentage: basis points. Fixed: cents.
    pub value: i64,
    pub usage_limit: Option<i64>,
    pub minimum_purchase_cents: Option<i64>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Repository for discount code operations.
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    /// Creates a new DiscountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Creates a discount code (stored in canonical upper-case form).
    pub async fn create(&self, new: NewDiscountCode) -> DbResult<DiscountCode> {
        let code = normalize_discount_code(&new.code).map_err(tailwag_core::CoreError::from)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(code = %code, "Creating discount code");

        sqlx::query(
            r#"
            INSERT INTO discount_codes (
                id, code, discount_type, value, usage_limit, usage_count,
                minimum_purchase_cents, starts_at, expires_at, is_active,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, 1, ?9, ?9)
            "#,
        )
        .bind(&id)
        .bind(&code)
        .bind(new.discount_type)
        .bind(new.value)
        .bind(new.usage_limit)
        .bind(new.minimum_purchase_cents)
        .bind(new.starts_at)
        .bind(new.expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_code(&code)
            .await?
            .ok_or_else(|| DbError::not_found("Discount code", code))
    }

    /// Looks up a code by its (case-normalized) text. `None` when absent -
    /// validation maps that to the invalid-code rejection.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<DiscountCode>> {
        let normalized = match normalize_discount_code(code) {
            Ok(c) => c,
            // Malformed input can't match any stored code
            Err(_) => return Ok(None),
        };

        let row = sqlx::query_as::<_, DiscountCode>(
            "SELECT * FROM discount_codes WHERE code = ?1",
        )
        .bind(&normalized)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Burns one use of the code.
    ///
    /// The limit check sits inside the UPDATE predicate, so the increment
    /// and the check are one atomic statement. A redemption that loses the
    /// race gets `Conflict` and the caller rejects the order.
    pub async fn redeem(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE discount_codes
            SET usage_count = usage_count + 1, updated_at = ?2
            WHERE id = ?1
              AND is_active = 1
              AND (usage_limit IS NULL OR usage_count < usage_limit)
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Discount code", id));
        }
        Ok(())
    }

    /// Deactivates a code without deleting its redemption history.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE discount_codes SET is_active = 0, updated_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Discount code", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
