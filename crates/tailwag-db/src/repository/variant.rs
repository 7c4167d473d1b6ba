//! # Variant Repository
//!
//! Database operations for product variants: lookup, creation, catalog
//! flags. Inventory quantity is deliberately absent from the write surface
//! here - every quantity change goes through the [`InventoryLedger`]
//! commit path.
//!
//! [`InventoryLedger`]: crate::repository::inventory::InventoryLedger

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tailwag_core::ProductVariant;

/// Input for creating a variant.
#[derive(Debug, Clone)]
pub struct NewVariant {
    pub product_id: String,
    pub sku: String,
    pub title: String,
    pub price_cents: i64,
    pub weight_oz: Option<i64>,
    pub initial_quantity: i64,
    pub low_stock_threshold: i64,
    pub track_inventory: bool,
    pub allow_backorder: bool,
}

/// Repository for product variant operations.
#[derive(Debug, Clone)]
pub struct VariantRepository {
    pool: SqlitePool,
}

impl VariantRepository {
    /// Creates a new VariantRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VariantRepository { pool }
    }

    /// Creates a variant.
    ///
    /// The initial quantity is written directly here (version 0); every
    /// later change goes through the ledger.
    pub async fn create(&self, new: NewVariant) -> DbResult<ProductVariant> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(sku = %new.sku, "Creating variant");

        sqlx::query(
            r#"
            INSERT INTO product_variants (
                id, product_id, sku, title, price_cents, weight_oz,
                inventory_quantity, low_stock_threshold, track_inventory,
                allow_backorder, is_available, version, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, 0, ?11, ?11)
            "#,
        )
        .bind(&id)
        .bind(&new.product_id)
        .bind(&new.sku)
        .bind(&new.title)
        .bind(new.price_cents)
        .bind(new.weight_oz)
        .bind(new.initial_quantity)
        .bind(new.low_stock_threshold)
        .bind(new.track_inventory)
        .bind(new.allow_backorder)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id).await
    }

    /// Fetches a variant by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<ProductVariant> {
        sqlx::query_as::<_, ProductVariant>(
            "SELECT * FROM product_variants WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Variant", id))
    }

    /// Fetches a variant by SKU (the business identifier).
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<ProductVariant> {
        sqlx::query_as::<_, ProductVariant>(
            "SELECT * FROM product_variants WHERE sku = ?1",
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Variant", sku))
    }

    /// Lists purchasable variants ordered by title.
    pub async fn list_available(&self, limit: u32) -> DbResult<Vec<ProductVariant>> {
        let variants = sqlx::query_as::<_, ProductVariant>(
            r#"
            SELECT * FROM product_variants
            WHERE is_available = 1
            ORDER BY title
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(variants)
    }

    /// Flips the availability flag.
    pub async fn set_availability(&self, id: &str, is_available: bool) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE product_variants SET is_available = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(is_available)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Variant", id));
        }
        Ok(())
    }

    /// Updates price and title (catalog edit, not an inventory operation).
    pub async fn update_catalog(
        &self,
        id: &str,
        title: &str,
        price_cents: i64,
        weight_oz: Option<i64>,
    ) -> DbResult<ProductVariant> {
        let result = sqlx::query(
            r#"
            UPDATE product_variants
            SET title = ?2, price_cents = ?3, weight_oz = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(price_cents)
        .bind(weight_oz)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Variant", id));
        }
        self.get_by_id(id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
