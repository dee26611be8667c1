//! Entity reconciliation
//!
//! Classifies every entity referenced by an extracted record against the
//! ledger store: exact, case-sensitive key lookups, no fuzzy matching, and
//! no writes. Creation of unmatched entities is the commit coordinator's
//! job.

use crate::models::{
    CategoryKind, CategoryMatch, Party, PartyMatch, ReconciliationResult, StructuredRecord,
};
use crate::store::LedgerStore;
use crate::Result;
use std::sync::Arc;
use tracing::debug;

pub struct Reconciler {
    store: Arc<dyn LedgerStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Match the supplier, the billed party and every category label of the
    /// record. Each referenced entity appears exactly once in the result,
    /// categories in record order.
    pub async fn reconcile(&self, record: &StructuredRecord) -> Result<ReconciliationResult> {
        let supplier = self.match_party(&record.supplier).await?;
        let billed_party = self.match_party(&record.billed_party).await?;

        let mut categories = Vec::with_capacity(record.expense_categories.len());
        for label in &record.expense_categories {
            let matched = self
                .store
                .find_category_by_label(CategoryKind::Expense, label)
                .await?;

            categories.push(match matched {
                Some(id) => CategoryMatch::matched(id, label.clone()),
                None => CategoryMatch::unmatched(label.clone()),
            });
        }

        debug!(
            supplier = ?supplier.status,
            billed_party = ?billed_party.status,
            categories = categories.len(),
            "Reconciliation complete"
        );

        Ok(ReconciliationResult {
            supplier,
            billed_party,
            categories,
        })
    }

    async fn match_party(&self, party: &Party) -> Result<PartyMatch> {
        // A missing or empty tax id is a valid extraction outcome, not an
        // error: the party is unmatched and gets created at commit time.
        let tax_id = match party.tax_id.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Ok(PartyMatch::unmatched(party.clone())),
        };

        Ok(match self.store.find_person_by_tax_id(tax_id).await? {
            Some(id) => PartyMatch::matched(id, party.clone()),
            None => PartyMatch::unmatched(party.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchStatus, PersonKind};
    use crate::store::{InMemoryStore, NewPerson, StoreTransaction};

    fn record() -> StructuredRecord {
        crate::extract::sample_record()
    }

    async fn seed_supplier(store: &InMemoryStore, tax_id: &str) -> i64 {
        let mut tx = store.begin().await.unwrap();
        let id = tx
            .create_person(NewPerson {
                kind: PersonKind::Supplier,
                legal_name: "Greenfield Farm Supplies Ltd".to_string(),
                trade_name: Some("Greenfield".to_string()),
                tax_id: Some(tax_id.to_string()),
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_matched_supplier_unmatched_billed_party() {
        let store = Arc::new(InMemoryStore::new());
        let supplier_id = seed_supplier(&store, "12.345.678/0001-90").await;
        let reconciler = Reconciler::new(store);

        let result = reconciler.reconcile(&record()).await.unwrap();

        assert_eq!(result.supplier.status, MatchStatus::Matched);
        assert_eq!(result.supplier.person_id, Some(supplier_id));
        assert_eq!(result.billed_party.status, MatchStatus::Unmatched);
        assert_eq!(result.billed_party.person_id, None);
        // Detail payload kept intact for later creation.
        assert_eq!(result.billed_party.detail.name, "John Carter");
    }

    #[tokio::test]
    async fn test_every_category_appears_once_in_record_order() {
        let store = Arc::new(InMemoryStore::new());
        let reconciler = Reconciler::new(store);

        let mut rec = record();
        rec.expense_categories =
            vec!["FARM INPUTS".to_string(), "ADMINISTRATIVE".to_string()];

        let result = reconciler.reconcile(&rec).await.unwrap();

        assert_eq!(result.categories.len(), 2);
        assert_eq!(result.categories[0].label, "FARM INPUTS");
        assert_eq!(result.categories[1].label, "ADMINISTRATIVE");
        assert!(result
            .categories
            .iter()
            .all(|c| c.status == MatchStatus::Unmatched));
    }

    #[tokio::test]
    async fn test_category_lookup_is_case_sensitive() {
        let store = Arc::new(InMemoryStore::new());
        {
            let mut tx = store.begin().await.unwrap();
            tx.create_category(CategoryKind::Expense, "FARM INPUTS")
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }
        let reconciler = Reconciler::new(store);

        let mut rec = record();
        rec.expense_categories = vec!["farm inputs".to_string()];

        let result = reconciler.reconcile(&rec).await.unwrap();
        assert_eq!(result.categories[0].status, MatchStatus::Unmatched);
    }

    #[tokio::test]
    async fn test_missing_tax_id_is_unmatched_not_an_error() {
        let store = Arc::new(InMemoryStore::new());
        let reconciler = Reconciler::new(store);

        let mut rec = record();
        rec.billed_party.tax_id = None;
        rec.supplier.tax_id = Some("   ".to_string());

        let result = reconciler.reconcile(&rec).await.unwrap();

        assert_eq!(result.supplier.status, MatchStatus::Unmatched);
        assert_eq!(result.billed_party.status, MatchStatus::Unmatched);
        assert_eq!(result.supplier.detail.name, "Greenfield Farm Supplies Ltd");
    }
}
