//! In-memory ledger store
//!
//! Backs tests and the no-database dev fallback. Transactions stage rows
//! locally and apply them under a single write lock, so a failed commit
//! sequence leaves no partial rows behind.

use crate::error::PipelineError;
use crate::models::{CategoryKind, PersonKind};
use crate::store::{
    LedgerStore, NewEntry, NewInstallment, NewPerson, RawResultSet, StoreTransaction,
    STATUS_ACTIVE, STATUS_PENDING,
};
use crate::Result;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct PersonRow {
    pub id: i64,
    pub kind: PersonKind,
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub tax_id: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct CategoryRow {
    pub id: i64,
    pub kind: CategoryKind,
    pub label: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct EntryRow {
    pub id: i64,
    pub entry: NewEntry,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct InstallmentRow {
    pub id: i64,
    pub entry_id: i64,
    pub label: String,
    pub due_date: chrono::NaiveDate,
    pub amount: Decimal,
    pub paid_amount: Decimal,
    pub remaining_balance: Decimal,
    pub status: String,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    persons: Vec<PersonRow>,
    categories: Vec<CategoryRow>,
    entries: Vec<EntryRow>,
    installments: Vec<InstallmentRow>,
    entry_categories: Vec<(i64, i64)>,
}

/// In-memory store, shareable across tasks.
#[derive(Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    // =============================
    // Inspection helpers
    // =============================

    pub async fn person_count(&self) -> usize {
        self.tables.read().await.persons.len()
    }

    pub async fn category_count(&self) -> usize {
        self.tables.read().await.categories.len()
    }

    pub async fn entry_count(&self) -> usize {
        self.tables.read().await.entries.len()
    }

    pub async fn installment_count(&self) -> usize {
        self.tables.read().await.installments.len()
    }

    pub async fn link_count(&self) -> usize {
        self.tables.read().await.entry_categories.len()
    }

    pub async fn entry(&self, entry_id: i64) -> Option<EntryRow> {
        self.tables
            .read()
            .await
            .entries
            .iter()
            .find(|e| e.id == entry_id)
            .cloned()
    }

    pub async fn installments_for(&self, entry_id: i64) -> Vec<InstallmentRow> {
        self.tables
            .read()
            .await
            .installments
            .iter()
            .filter(|i| i.entry_id == entry_id)
            .cloned()
            .collect()
    }

    pub async fn categories_for(&self, entry_id: i64) -> Vec<i64> {
        self.tables
            .read()
            .await
            .entry_categories
            .iter()
            .filter(|(e, _)| *e == entry_id)
            .map(|(_, c)| *c)
            .collect()
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LedgerStore for InMemoryStore {
    async fn find_person_by_tax_id(&self, tax_id: &str) -> Result<Option<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .persons
            .iter()
            .find(|p| p.tax_id.as_deref() == Some(tax_id))
            .map(|p| p.id))
    }

    async fn find_category_by_label(
        &self,
        kind: CategoryKind,
        label: &str,
    ) -> Result<Option<i64>> {
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .iter()
            .find(|c| c.kind == kind && c.label == label)
            .map(|c| c.id))
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemTransaction {
            store: self.clone(),
            staged: Tables::default(),
        }))
    }

    async fn select_rows(&self, _query: &str) -> Result<RawResultSet> {
        Err(PipelineError::Execution(
            "the in-memory store does not execute SQL queries".to_string(),
        ))
    }
}

/// Staged transaction over the in-memory tables.
struct MemTransaction {
    store: InMemoryStore,
    staged: Tables,
}

impl MemTransaction {
    async fn tax_id_in_use(&self, tax_id: &str) -> bool {
        let committed = self.store.tables.read().await;
        committed
            .persons
            .iter()
            .chain(self.staged.persons.iter())
            .any(|p| p.tax_id.as_deref() == Some(tax_id))
    }

    async fn label_in_use(&self, label: &str) -> bool {
        let committed = self.store.tables.read().await;
        committed
            .categories
            .iter()
            .chain(self.staged.categories.iter())
            .any(|c| c.label == label)
    }

    async fn entry_exists(&self, entry_id: i64) -> bool {
        let committed = self.store.tables.read().await;
        committed
            .entries
            .iter()
            .chain(self.staged.entries.iter())
            .any(|e| e.id == entry_id)
    }
}

#[async_trait::async_trait]
impl StoreTransaction for MemTransaction {
    async fn create_person(&mut self, person: NewPerson) -> Result<i64> {
        if let Some(tax_id) = person.tax_id.as_deref() {
            if self.tax_id_in_use(tax_id).await {
                return Err(PipelineError::Database(format!(
                    "duplicate tax id: {}",
                    tax_id
                )));
            }
        }

        let id = self.store.allocate_id();
        self.staged.persons.push(PersonRow {
            id,
            kind: person.kind,
            legal_name: person.legal_name,
            trade_name: person.trade_name,
            tax_id: person.tax_id,
            status: STATUS_ACTIVE.to_string(),
        });
        Ok(id)
    }

    async fn create_category(&mut self, kind: CategoryKind, label: &str) -> Result<i64> {
        if self.label_in_use(label).await {
            return Err(PipelineError::Database(format!(
                "duplicate category label: {}",
                label
            )));
        }

        let id = self.store.allocate_id();
        self.staged.categories.push(CategoryRow {
            id,
            kind,
            label: label.to_string(),
            status: STATUS_ACTIVE.to_string(),
        });
        Ok(id)
    }

    async fn create_entry(&mut self, entry: NewEntry) -> Result<i64> {
        let id = self.store.allocate_id();
        self.staged.entries.push(EntryRow {
            id,
            entry,
            status: STATUS_PENDING.to_string(),
        });
        Ok(id)
    }

    async fn link_category(&mut self, entry_id: i64, category_id: i64) -> Result<()> {
        if !self.entry_exists(entry_id).await {
            return Err(PipelineError::Database(format!(
                "unknown ledger entry: {}",
                entry_id
            )));
        }
        if self
            .staged
            .entry_categories
            .iter()
            .any(|(e, c)| *e == entry_id && *c == category_id)
        {
            return Err(PipelineError::Database(format!(
                "category {} already linked to entry {}",
                category_id, entry_id
            )));
        }

        self.staged.entry_categories.push((entry_id, category_id));
        Ok(())
    }

    async fn create_installment(
        &mut self,
        entry_id: i64,
        installment: NewInstallment,
    ) -> Result<()> {
        if !self.entry_exists(entry_id).await {
            return Err(PipelineError::Database(format!(
                "unknown ledger entry: {}",
                entry_id
            )));
        }

        let id = self.store.allocate_id();
        self.staged.installments.push(InstallmentRow {
            id,
            entry_id,
            label: installment.label,
            due_date: installment.due_date,
            amount: installment.amount,
            paid_amount: Decimal::ZERO,
            remaining_balance: installment.amount,
            status: STATUS_PENDING.to_string(),
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let tables = Arc::clone(&self.store.tables);
        let mut committed = tables.write().await;

        // Re-validate uniqueness against writers that committed since this
        // transaction staged its rows; fail before applying anything.
        for person in &self.staged.persons {
            if let Some(tax_id) = person.tax_id.as_deref() {
                if committed
                    .persons
                    .iter()
                    .any(|p| p.tax_id.as_deref() == Some(tax_id))
                {
                    return Err(PipelineError::Database(format!(
                        "duplicate tax id: {}",
                        tax_id
                    )));
                }
            }
        }
        for category in &self.staged.categories {
            if committed.categories.iter().any(|c| c.label == category.label) {
                return Err(PipelineError::Database(format!(
                    "duplicate category label: {}",
                    category.label
                )));
            }
        }

        committed.persons.extend(self.staged.persons);
        committed.categories.extend(self.staged.categories);
        committed.entries.extend(self.staged.entries);
        committed.installments.extend(self.staged.installments);
        committed.entry_categories.extend(self.staged.entry_categories);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn person(tax_id: Option<&str>) -> NewPerson {
        NewPerson {
            kind: PersonKind::Supplier,
            legal_name: "ACME Farm Supplies Ltd".to_string(),
            trade_name: None,
            tax_id: tax_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_lookup_is_exact_and_case_sensitive() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let id = tx.create_person(person(Some("12.345.678/0001-90"))).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            store.find_person_by_tax_id("12.345.678/0001-90").await.unwrap(),
            Some(id)
        );
        assert_eq!(store.find_person_by_tax_id("12345678000190").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dropped_transaction_leaves_no_rows() {
        let store = InMemoryStore::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.create_person(person(Some("11.111.111/0001-11"))).await.unwrap();
            tx.create_category(CategoryKind::Expense, "FARM INPUTS").await.unwrap();
            // dropped without commit
        }

        assert_eq!(store.person_count().await, 0);
        assert_eq!(store.category_count().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_tax_id_rejected_within_transaction() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.create_person(person(Some("22.222.222/0001-22"))).await.unwrap();
        let err = tx.create_person(person(Some("22.222.222/0001-22"))).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_multiple_null_tax_ids_allowed() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.create_person(person(None)).await.unwrap();
        tx.create_person(person(None)).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.person_count().await, 2);
    }

    #[tokio::test]
    async fn test_installment_defaults() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let supplier = tx.create_person(person(Some("33.333.333/0001-33"))).await.unwrap();
        let billed = tx.create_person(person(None)).await.unwrap();
        let entry_id = tx
            .create_entry(NewEntry {
                direction: crate::models::EntryDirection::Payable,
                document_number: "NF-1".to_string(),
                issue_date: NaiveDate::from_ymd_opt(2024, 10, 30).unwrap(),
                description: None,
                total_amount: Decimal::new(10000, 2),
                supplier_id: supplier,
                billed_party_id: billed,
            })
            .await
            .unwrap();
        tx.create_installment(
            entry_id,
            NewInstallment {
                label: "1/1".to_string(),
                due_date: NaiveDate::from_ymd_opt(2024, 11, 30).unwrap(),
                amount: Decimal::new(10000, 2),
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let installments = store.installments_for(entry_id).await;
        assert_eq!(installments.len(), 1);
        assert_eq!(installments[0].paid_amount, Decimal::ZERO);
        assert_eq!(installments[0].remaining_balance, Decimal::new(10000, 2));
        assert_eq!(installments[0].status, STATUS_PENDING);
    }
}
