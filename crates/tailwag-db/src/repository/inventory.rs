//! # Inventory Ledger
//!
//! The single write path for `inventory_quantity`, paired with an
//! append-only adjustment trail.
//!
//! ## Commit Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    commit_adjustment(variant, delta)                    │
//! │                                                                         │
//! │  BEGIN TRANSACTION                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT quantity, version  ──► before = quantity                        │
//! │       │                        after  = before + delta                  │
//! │       ▼                                                                 │
//! │  UPDATE product_variants                                                │
//! │     SET inventory_quantity = after, version = version + 1               │
//! │   WHERE id = ? AND version = ?   ← optimistic concurrency guard         │
//! │       │                                                                 │
//! │       ├── 0 rows? another commit won the race → ROLLBACK, retry         │
//! │       ▼                                                                 │
//! │  INSERT inventory_adjustments (before, after, reason, actor, ...)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT  ← quantity and ledger row land together or not at all          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two simultaneous decrements of the same variant cannot both read the
//! same "before": the loser's conditional UPDATE matches zero rows and the
//! whole attempt re-reads.

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tailwag_core::{AdjustmentReason, InventoryAdjustment, ProductVariant};

/// Version-conflict retries before giving up on a commit.
const MAX_COMMIT_RETRIES: u32 = 3;

/// Result of an availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub available: bool,
    /// Human-readable reason when unavailable.
    pub reason: Option<String>,
}

impl Availability {
    fn yes() -> Self {
        Availability {
            available: true,
            reason: None,
        }
    }

    fn no(reason: impl Into<String>) -> Self {
        Availability {
            available: false,
            reason: Some(reason.into()),
        }
    }
}

/// A committed ledger entry's identifying facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedAdjustment {
    pub adjustment_id: String,
    pub before: i64,
    pub after: i64,
}

/// Context for a ledger commit: why, on whose behalf, tied to what.
#[derive(Debug, Clone)]
pub struct AdjustmentContext {
    pub reason: AdjustmentReason,
    pub order_id: Option<String>,
    pub subscription_id: Option<String>,
    pub actor: String,
    pub notes: Option<String>,
}

impl AdjustmentContext {
    /// A system-actor context with just a reason.
    pub fn system(reason: AdjustmentReason) -> Self {
        AdjustmentContext {
            reason,
            order_id: None,
            subscription_id: None,
            actor: "system".to_string(),
            notes: None,
        }
    }

    pub fn order(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn subscription(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// One row of a bulk (CSV-driven) stock update request, keyed by SKU.
#[derive(Debug, Clone)]
pub struct BulkStockRow {
    pub sku: String,
    pub new_quantity: i64,
}

/// Per-row outcome of a bulk update. A failed row never aborts the batch.
#[derive(Debug)]
pub struct BulkRowResult {
    pub sku: String,
    pub outcome: DbResult<CommittedAdjustment>,
}

/// The inventory ledger.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    pool: SqlitePool,
}

impl InventoryLedger {
    /// Creates a new InventoryLedger.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryLedger { pool }
    }

    /// Checks whether `quantity` units of a variant can be sold right now.
    ///
    /// ## Rules
    /// - tracking off → always available
    /// - availability flag off → unavailable regardless of stock
    /// - otherwise available when stock covers the request or backorder is
    ///   allowed
    ///
    /// Advisory only: the commit path re-checks inside its transaction.
    pub async fn check_availability(
        &self,
        variant_id: &str,
        quantity: i64,
    ) -> DbResult<Availability> {
        let variant = self.fetch_variant(&self.pool, variant_id).await?;

        if !variant.track_inventory {
            return Ok(Availability::yes());
        }
        if !variant.is_available {
            return Ok(Availability::no(format!(
                "{} is not available for purchase",
                variant.sku
            )));
        }
        if variant.inventory_quantity >= quantity || variant.allow_backorder {
            return Ok(Availability::yes());
        }
        Ok(Availability::no(format!(
            "Insufficient stock for {}: available {}, requested {}",
            variant.sku, variant.inventory_quantity, quantity
        )))
    }

    /// Commits a quantity change atomically: new quantity plus ledger row
    /// in one transaction, guarded by the variant's version.
    ///
    /// ## Arguments
    /// * `delta` - signed change: negative for sales, positive for restocks
    ///
    /// ## Errors
    /// - `InsufficientStock` if the result would be negative for a tracked,
    ///   no-backorder variant
    /// - `Conflict` after exhausting version-conflict retries
    pub async fn commit_adjustment(
        &self,
        variant_id: &str,
        delta: i64,
        ctx: AdjustmentContext,
    ) -> DbResult<CommittedAdjustment> {
        for attempt in 0..MAX_COMMIT_RETRIES {
            match self.try_commit(variant_id, delta, &ctx).await {
                Err(DbError::Conflict { .. }) if attempt + 1 < MAX_COMMIT_RETRIES => {
                    warn!(
                        variant_id = %variant_id,
                        attempt = attempt + 1,
                        "Ledger commit lost version race, retrying"
                    );
                    continue;
                }
                other => return other,
            }
        }
        Err(DbError::conflict("Variant", variant_id))
    }

    async fn try_commit(
        &self,
        variant_id: &str,
        delta: i64,
        ctx: &AdjustmentContext,
    ) -> DbResult<CommittedAdjustment> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT sku, inventory_quantity, version, track_inventory, allow_backorder
            FROM product_variants WHERE id = ?1
            "#,
        )
        .bind(variant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Variant", variant_id))?;

        let before: i64 = row.get("inventory_quantity");
        let version: i64 = row.get("version");
        let track_inventory: bool = row.get("track_inventory");
        let allow_backorder: bool = row.get("allow_backorder");
        let after = before + delta;

        if after < 0 && track_inventory && !allow_backorder {
            return Err(DbError::InsufficientStock {
                id: variant_id.to_string(),
                available: before,
                requested: -delta,
            });
        }

        let now = Utc::now();
        let updated = sqlx::query(
            r#"
            UPDATE product_variants
            SET inventory_quantity = ?2, version = version + 1, updated_at = ?3
            WHERE id = ?1 AND version = ?4
            "#,
        )
        .bind(variant_id)
        .bind(after)
        .bind(now)
        .bind(version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Someone else committed between our read and write
            return Err(DbError::conflict("Variant", variant_id));
        }

        let adjustment_id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO inventory_adjustments (
                id, variant_id, quantity_change, quantity_before, quantity_after,
                reason, order_id, subscription_id, actor, notes, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&adjustment_id)
        .bind(variant_id)
        .bind(delta)
        .bind(before)
        .bind(after)
        .bind(ctx.reason)
        .bind(&ctx.order_id)
        .bind(&ctx.subscription_id)
        .bind(&ctx.actor)
        .bind(&ctx.notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            variant_id = %variant_id,
            delta = delta,
            before = before,
            after = after,
            reason = ?ctx.reason,
            "Committed inventory adjustment"
        );

        Ok(CommittedAdjustment {
            adjustment_id,
            before,
            after,
        })
    }

    /// Lists the adjustment trail for a variant, newest first.
    pub async fn history(
        &self,
        variant_id: &str,
        limit: u32,
    ) -> DbResult<Vec<InventoryAdjustment>> {
        let rows = sqlx::query_as::<_, InventoryAdjustment>(
            r#"
            SELECT * FROM inventory_adjustments
            WHERE variant_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(variant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Lists tracked variants at or below their low-stock threshold.
    pub async fn list_low_stock(&self) -> DbResult<Vec<ProductVariant>> {
        let rows = sqlx::query_as::<_, ProductVariant>(
            r#"
            SELECT * FROM product_variants
            WHERE track_inventory = 1
              AND inventory_quantity <= low_stock_threshold
            ORDER BY inventory_quantity ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Applies a bulk (CSV-driven) stock update.
    ///
    /// Rows resolve by SKU. A missing SKU fails that row only; every
    /// successful row still goes through the full commit path, so the
    /// quantity/ledger invariant holds per row.
    pub async fn bulk_update_by_sku(
        &self,
        rows: Vec<BulkStockRow>,
        actor: &str,
    ) -> DbResult<Vec<BulkRowResult>> {
        let mut results = Vec::with_capacity(rows.len());

        for row in rows {
            let outcome = self.bulk_row(&row, actor).await;
            if let Err(err) = &outcome {
                warn!(sku = %row.sku, error = %err, "Bulk stock row failed");
            }
            results.push(BulkRowResult {
                sku: row.sku,
                outcome,
            });
        }

        Ok(results)
    }

    async fn bulk_row(&self, row: &BulkStockRow, actor: &str) -> DbResult<CommittedAdjustment> {
        let variant = sqlx::query(
            "SELECT id, inventory_quantity FROM product_variants WHERE sku = ?1",
        )
        .bind(&row.sku)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Variant", &row.sku))?;

        let id: String = variant.get("id");
        let current: i64 = variant.get("inventory_quantity");
        let delta = row.new_quantity - current;

        self.commit_adjustment(
            &id,
            delta,
            AdjustmentContext::system(AdjustmentReason::Adjustment)
                .actor(actor)
                .notes("bulk stock update"),
        )
        .await
    }

    async fn fetch_variant(
        &self,
        pool: &SqlitePool,
        variant_id: &str,
    ) -> DbResult<ProductVariant> {
        sqlx::query_as::<_, ProductVariant>("SELECT * FROM product_variants WHERE id = ?1")
            .bind(variant_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::not_found("Variant", variant_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::variant::NewVariant;

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let variant = db
            .variants()
            .create(NewVariant {
                product_id: Uuid::new_v4().to_string(),
                sku: "CHKN-BOWL-5LB".into(),
                title: "Chicken & Rice Bowl - 5 lb".into(),
                price_cents: 4_999,
                weight_oz: Some(80),
                initial_quantity: 10,
                low_stock_threshold: 5,
                track_inventory: true,
                allow_backorder: false,
            })
            .await
            .unwrap();
        (db, variant.id)
    }

    #[tokio::test]
    async fn test_check_availability() {
        let (db, id) = setup().await;
        let ledger = db.inventory();

        let ok = ledger.check_availability(&id, 10).await.unwrap();
        assert!(ok.available);

        let short = ledger.check_availability(&id, 11).await.unwrap();
        assert!(!short.available);
        assert!(short.reason.unwrap().contains("available 10, requested 11"));
    }

    #[tokio::test]
    async fn test_commit_writes_quantity_and_ledger_atomically() {
        let (db, id) = setup().await;
        let ledger = db.inventory();

        let committed = ledger
            .commit_adjustment(
                &id,
                -3,
                AdjustmentContext::system(AdjustmentReason::Sale).order("order-1"),
            )
            .await
            .unwrap();
        assert_eq!(committed.before, 10);
        assert_eq!(committed.after, 7);

        let variant = db.variants().get_by_id(&id).await.unwrap();
        assert_eq!(variant.inventory_quantity, 7);
        // Every commit bumps the version
        assert_eq!(variant.version, 1);

        let history = ledger.history(&id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].quantity_before, 10);
        assert_eq!(history[0].quantity_after, 7);
        assert_eq!(history[0].reason, AdjustmentReason::Sale);
        assert_eq!(history[0].order_id.as_deref(), Some("order-1"));
    }

    #[tokio::test]
    async fn test_commit_rejects_negative_result() {
        let (db, id) = setup().await;
        let ledger = db.inventory();

        let err = ledger
            .commit_adjustment(&id, -11, AdjustmentContext::system(AdjustmentReason::Sale))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InsufficientStock { available: 10, .. }));

        // Nothing committed: quantity untouched, ledger empty
        let variant = db.variants().get_by_id(&id).await.unwrap();
        assert_eq!(variant.inventory_quantity, 10);
        assert!(ledger.history(&id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restock_and_low_stock_report() {
        let (db, id) = setup().await;
        let ledger = db.inventory();

        ledger
            .commit_adjustment(&id, -6, AdjustmentContext::system(AdjustmentReason::Sale))
            .await
            .unwrap();

        // 4 left, threshold 5 → low stock
        let low = ledger.list_low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, id);

        ledger
            .commit_adjustment(&id, 20, AdjustmentContext::system(AdjustmentReason::Restock))
            .await
            .unwrap();
        assert!(ledger.list_low_stock().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_update_reports_per_row() {
        let (db, id) = setup().await;
        let ledger = db.inventory();

        let results = ledger
            .bulk_update_by_sku(
                vec![
                    BulkStockRow {
                        sku: "CHKN-BOWL-5LB".into(),
                        new_quantity: 25,
                    },
                    BulkStockRow {
                        sku: "NO-SUCH-SKU".into(),
                        new_quantity: 5,
                    },
                ],
                "admin:jess",
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].outcome.is_ok());
        assert!(matches!(
            results[1].outcome,
            Err(DbError::NotFound { .. })
        ));

        // The good row went through the commit path
        let variant = db.variants().get_by_id(&id).await.unwrap();
        assert_eq!(variant.inventory_quantity, 25);
        let history = ledger.history(&id, 10).await.unwrap();
        assert_eq!(history[0].quantity_change, 15);
        assert_eq!(history[0].reason, AdjustmentReason::Adjustment);
        assert_eq!(history[0].actor, "admin:jess");
    }
}
