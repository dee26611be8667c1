//! Postgres ledger store
//!
//! sqlx-backed implementation of the store contract. The schema is
//! bootstrapped lazily on first use; the commit transaction maps directly
//! onto a Postgres transaction.

use crate::error::PipelineError;
use crate::models::CategoryKind;
use crate::store::{
    LedgerStore, NewEntry, NewInstallment, NewPerson, RawResultSet, StoreTransaction,
};
use crate::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Postgres, Row, Transaction, TypeInfo, ValueRef};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Postgres-backed ledger store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    /// Build a store over a lazily-connected pool.
    pub fn connect_lazy(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(url)
            .map_err(|e| {
                PipelineError::Database(format!("Failed to build Postgres pool: {}", e))
            })?;

        info!("Ledger store backend: postgres");
        Ok(Self::new(pool))
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS persons (
                      id BIGSERIAL PRIMARY KEY,
                      kind TEXT NOT NULL,
                      legal_name TEXT NOT NULL,
                      trade_name TEXT,
                      tax_id TEXT UNIQUE,
                      status TEXT NOT NULL DEFAULT 'ACTIVE'
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS categories (
                      id BIGSERIAL PRIMARY KEY,
                      kind TEXT NOT NULL,
                      label TEXT NOT NULL UNIQUE,
                      status TEXT NOT NULL DEFAULT 'ACTIVE'
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS ledger_entries (
                      id BIGSERIAL PRIMARY KEY,
                      direction TEXT NOT NULL,
                      document_number TEXT NOT NULL,
                      issue_date DATE NOT NULL,
                      description TEXT,
                      total_amount NUMERIC(10,2) NOT NULL,
                      status TEXT NOT NULL DEFAULT 'PENDING',
                      supplier_id BIGINT NOT NULL REFERENCES persons(id),
                      billed_party_id BIGINT NOT NULL REFERENCES persons(id)
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS installments (
                      id BIGSERIAL PRIMARY KEY,
                      entry_id BIGINT NOT NULL REFERENCES ledger_entries(id) ON DELETE CASCADE,
                      label TEXT NOT NULL,
                      due_date DATE NOT NULL,
                      amount NUMERIC(10,2) NOT NULL,
                      paid_amount NUMERIC(10,2) NOT NULL DEFAULT 0,
                      remaining_balance NUMERIC(10,2) NOT NULL,
                      status TEXT NOT NULL DEFAULT 'PENDING'
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS entry_categories (
                      entry_id BIGINT NOT NULL REFERENCES ledger_entries(id) ON DELETE CASCADE,
                      category_id BIGINT NOT NULL REFERENCES categories(id),
                      UNIQUE (entry_id, category_id)
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                PipelineError::Database(format!("Failed to initialize ledger schema: {}", e))
            })?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl LedgerStore for PostgresStore {
    async fn find_person_by_tax_id(&self, tax_id: &str) -> Result<Option<i64>> {
        self.ensure_schema().await?;

        sqlx::query_scalar::<_, i64>("SELECT id FROM persons WHERE tax_id = $1")
            .bind(tax_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PipelineError::Database(format!("Person lookup failed: {}", e)))
    }

    async fn find_category_by_label(
        &self,
        kind: CategoryKind,
        label: &str,
    ) -> Result<Option<i64>> {
        self.ensure_schema().await?;

        sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE label = $1 AND kind = $2")
            .bind(label)
            .bind(kind.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PipelineError::Database(format!("Category lookup failed: {}", e)))
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        self.ensure_schema().await?;

        let tx = self.pool.begin().await.map_err(|e| {
            PipelineError::Database(format!("Failed to begin transaction: {}", e))
        })?;

        Ok(Box::new(PgStoreTransaction { tx }))
    }

    async fn select_rows(&self, query: &str) -> Result<RawResultSet> {
        self.ensure_schema().await?;

        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PipelineError::Execution(e.to_string()))?;

        let columns = match rows.first() {
            Some(row) => row
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            None => Vec::new(),
        };

        let rows = rows
            .iter()
            .map(|row| {
                (0..row.columns().len())
                    .map(|index| decode_column(row, index))
                    .collect()
            })
            .collect();

        Ok(RawResultSet { columns, rows })
    }
}

/// Convert one column value to a portable JSON form.
///
/// Dates become ISO-8601 strings and fixed-point numerics become plain
/// numbers so the answer synthesizer receives renderable values.
fn decode_column(row: &PgRow, index: usize) -> Value {
    let is_null = match row.try_get_raw(index) {
        Ok(raw) => raw.is_null(),
        Err(_) => true,
    };
    if is_null {
        return Value::Null;
    }

    let type_name = row.columns()[index].type_info().name();

    match type_name {
        "INT2" => row
            .try_get::<i16, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "INT4" => row
            .try_get::<i32, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "INT8" => row
            .try_get::<i64, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "FLOAT4" => row
            .try_get::<f32, _>(index)
            .map(|v| Value::from(v as f64))
            .unwrap_or(Value::Null),
        "FLOAT8" => row
            .try_get::<f64, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "NUMERIC" => row
            .try_get::<Decimal, _>(index)
            .ok()
            .and_then(|d| d.to_f64())
            .map(Value::from)
            .unwrap_or(Value::Null),
        "BOOL" => row
            .try_get::<bool, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "DATE" => row
            .try_get::<NaiveDate, _>(index)
            .map(|d| Value::String(d.to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(index)
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(index)
            .map(|d| Value::String(d.to_rfc3339()))
            .unwrap_or(Value::Null),
        "UUID" => row
            .try_get::<uuid::Uuid, _>(index)
            .map(|u| Value::String(u.to_string()))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn create_person(&mut self, person: NewPerson) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO persons (kind, legal_name, trade_name, tax_id, status)
            VALUES ($1, $2, $3, $4, 'ACTIVE')
            RETURNING id
            "#,
        )
        .bind(person.kind.to_string())
        .bind(&person.legal_name)
        .bind(&person.trade_name)
        .bind(&person.tax_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| PipelineError::Database(format!("Failed to create person: {}", e)))
    }

    async fn create_category(&mut self, kind: CategoryKind, label: &str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO categories (kind, label, status)
            VALUES ($1, $2, 'ACTIVE')
            RETURNING id
            "#,
        )
        .bind(kind.to_string())
        .bind(label)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| PipelineError::Database(format!("Failed to create category: {}", e)))
    }

    async fn create_entry(&mut self, entry: NewEntry) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO ledger_entries
              (direction, document_number, issue_date, description, total_amount, status, supplier_id, billed_party_id)
            VALUES
              ($1, $2, $3, $4, $5, 'PENDING', $6, $7)
            RETURNING id
            "#,
        )
        .bind(entry.direction.to_string())
        .bind(&entry.document_number)
        .bind(entry.issue_date)
        .bind(&entry.description)
        .bind(entry.total_amount)
        .bind(entry.supplier_id)
        .bind(entry.billed_party_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| PipelineError::Database(format!("Failed to create ledger entry: {}", e)))
    }

    async fn link_category(&mut self, entry_id: i64, category_id: i64) -> Result<()> {
        sqlx::query("INSERT INTO entry_categories (entry_id, category_id) VALUES ($1, $2)")
            .bind(entry_id)
            .bind(category_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                PipelineError::Database(format!("Failed to link category: {}", e))
            })?;
        Ok(())
    }

    async fn create_installment(
        &mut self,
        entry_id: i64,
        installment: NewInstallment,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO installments
              (entry_id, label, due_date, amount, paid_amount, remaining_balance, status)
            VALUES
              ($1, $2, $3, $4, 0, $5, 'PENDING')
            "#,
        )
        .bind(entry_id)
        .bind(&installment.label)
        .bind(installment.due_date)
        .bind(installment.amount)
        .bind(installment.amount)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| PipelineError::Database(format!("Failed to create installment: {}", e)))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| PipelineError::Database(format!("Failed to commit transaction: {}", e)))
    }
}
