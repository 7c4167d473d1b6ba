//! # Tax Rate Repository
//!
//! Storage for the tax jurisdiction table. Rate *resolution* (ZIP > county >
//! state precedence) is pure logic in `tailwag_core::rates`; this repository
//! just loads the candidate rows for a state.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tailwag_core::validation::normalize_state_code;
use tailwag_core::TaxRateEntry;

/// Input for creating a tax rate row.
#[derive(Debug, Clone)]
pub struct NewTaxRate {
    pub state_code: String,
    pub state_name: String,
    pub county: Option<String>,
    pub zip_code: Option<String>,
    pub rate_bps: i64,
    pub notes: Option<String>,
}

/// Repository for tax rate operations.
#[derive(Debug, Clone)]
pub struct TaxRateRepository {
    pool: SqlitePool,
}

impl TaxRateRepository {
    /// Creates a new TaxRateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TaxRateRepository { pool }
    }

    /// Creates a tax rate row. State codes normalize to upper-case.
    pub async fn create(&self, new: NewTaxRate) -> DbResult<TaxRateEntry> {
        let state_code =
            normalize_state_code(&new.state_code).map_err(tailwag_core::CoreError::from)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO tax_rates (
                id, state_code, state_name, county, zip_code, rate_bps,
                is_active, notes, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8, ?8)
            "#,
        )
        .bind(&id)
        .bind(&state_code)
        .bind(&new.state_name)
        .bind(&new.county)
        .bind(&new.zip_code)
        .bind(new.rate_bps)
        .bind(&new.notes)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id).await
    }

    /// Fetches a rate row by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<TaxRateEntry> {
        sqlx::query_as::<_, TaxRateEntry>("SELECT * FROM tax_rates WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Tax rate", id))
    }

    /// Loads the active candidate rows for a state, for the resolver.
    pub async fn list_active_for_state(&self, state_code: &str) -> DbResult<Vec<TaxRateEntry>> {
        let state = state_code.trim().to_uppercase();
        let rows = sqlx::query_as::<_, TaxRateEntry>(
            r#"
            SELECT * FROM tax_rates
            WHERE state_code = ?1 AND is_active = 1
            ORDER BY zip_code IS NULL, county IS NULL
            "#,
        )
        .bind(&state)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Deactivates a rate row (kept for audit, skipped by the resolver).
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE tax_rates SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Tax rate", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
