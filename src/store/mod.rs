//! Ledger store contract
//!
//! Narrow read/write surface the core needs from the relational store:
//! exact-key entity lookups, a write transaction for the commit sequence,
//! and read-only query execution for the question-answering path.

use crate::models::{CategoryKind, EntryDirection, PersonKind};
use crate::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

pub const STATUS_ACTIVE: &str = "ACTIVE";
pub const STATUS_PENDING: &str = "PENDING";

/// A person row to be created inside a commit transaction.
#[derive(Debug, Clone)]
pub struct NewPerson {
    pub kind: PersonKind,
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub tax_id: Option<String>,
}

/// A ledger entry row to be created inside a commit transaction.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub direction: EntryDirection,
    pub document_number: String,
    pub issue_date: NaiveDate,
    pub description: Option<String>,
    pub total_amount: Decimal,
    pub supplier_id: i64,
    pub billed_party_id: i64,
}

/// An installment row to be created inside a commit transaction.
/// Paid amount starts at zero and the remaining balance equals the amount.
#[derive(Debug, Clone)]
pub struct NewInstallment {
    pub label: String,
    pub due_date: NaiveDate,
    pub amount: Decimal,
}

/// Raw tabular result of a read-only query. Column order matches the
/// query's column order; row values are already converted to portable
/// JSON forms (dates as ISO strings, numerics as numbers).
#[derive(Debug, Clone, Default)]
pub struct RawResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Trait for the ledger store collaborator
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    /// Exact, case-sensitive lookup of a person by tax id.
    async fn find_person_by_tax_id(&self, tax_id: &str) -> Result<Option<i64>>;

    /// Exact, case-sensitive lookup of a category by label, filtered to the
    /// given kind.
    async fn find_category_by_label(
        &self,
        kind: CategoryKind,
        label: &str,
    ) -> Result<Option<i64>>;

    /// Open a write transaction. Writes become visible only after
    /// [`StoreTransaction::commit`]; dropping the transaction rolls back.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    /// Execute a read-only query and return the full raw result.
    async fn select_rows(&self, query: &str) -> Result<RawResultSet>;
}

/// One open write transaction against the ledger store.
#[async_trait::async_trait]
pub trait StoreTransaction: Send {
    async fn create_person(&mut self, person: NewPerson) -> Result<i64>;

    async fn create_category(&mut self, kind: CategoryKind, label: &str) -> Result<i64>;

    async fn create_entry(&mut self, entry: NewEntry) -> Result<i64>;

    async fn link_category(&mut self, entry_id: i64, category_id: i64) -> Result<()>;

    async fn create_installment(
        &mut self,
        entry_id: i64,
        installment: NewInstallment,
    ) -> Result<()>;

    /// Make every write in this transaction durable at once.
    async fn commit(self: Box<Self>) -> Result<()>;
}
