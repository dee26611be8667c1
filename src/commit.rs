//! Commit coordination
//!
//! Turns a confirmed pipeline output into ledger rows inside one
//! all-or-nothing store transaction: unmatched entities first, then the
//! entry, its category links and its installments. Invoked only after
//! human confirmation; never idempotent — the caller is responsible for
//! single-submission discipline.

use crate::error::PipelineError;
use crate::models::{
    CategoryKind, CommitReceipt, EntryDirection, PersonKind, ReconciliationResult,
    StructuredRecord,
};
use crate::store::{LedgerStore, NewEntry, NewInstallment, NewPerson, StoreTransaction};
use crate::Result;
use std::sync::Arc;
use tracing::info;

pub struct CommitCoordinator {
    store: Arc<dyn LedgerStore>,
}

impl CommitCoordinator {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Atomically create every missing entity plus the ledger entry, its
    /// category links and its installments. Any failure rolls the whole
    /// sequence back.
    pub async fn commit(
        &self,
        record: &StructuredRecord,
        reconciliation: &ReconciliationResult,
    ) -> Result<CommitReceipt> {
        let mut tx = self.store.begin().await.map_err(as_commit_error)?;
        let mut created_items = Vec::new();

        let supplier_id = match reconciliation.supplier.person_id {
            Some(id) => id,
            None => {
                let detail = &reconciliation.supplier.detail;
                let id = tx
                    .create_person(NewPerson {
                        kind: PersonKind::Supplier,
                        legal_name: detail.name.clone(),
                        trade_name: detail.trade_name.clone(),
                        tax_id: detail.tax_id.clone(),
                    })
                    .await
                    .map_err(as_commit_error)?;
                created_items.push(format!("Supplier: {}", detail.name));
                id
            }
        };

        let billed_party_id = match reconciliation.billed_party.person_id {
            Some(id) => id,
            None => {
                let detail = &reconciliation.billed_party.detail;
                let id = tx
                    .create_person(NewPerson {
                        kind: PersonKind::Billed,
                        legal_name: detail.name.clone(),
                        trade_name: detail.trade_name.clone(),
                        tax_id: detail.tax_id.clone(),
                    })
                    .await
                    .map_err(as_commit_error)?;
                created_items.push(format!("Billed party: {}", detail.name));
                id
            }
        };

        let mut category_ids = Vec::with_capacity(reconciliation.categories.len());
        for category in &reconciliation.categories {
            let id = match category.category_id {
                Some(id) => id,
                None => {
                    let id = tx
                        .create_category(CategoryKind::Expense, &category.label)
                        .await
                        .map_err(as_commit_error)?;
                    created_items.push(format!("Category: {}", category.label));
                    id
                }
            };
            category_ids.push(id);
        }

        let total_amount = record.total_amount();

        let entry_id = tx
            .create_entry(NewEntry {
                direction: EntryDirection::Payable,
                document_number: record.document_number.clone(),
                issue_date: record.issue_date,
                description: Some(record.product_descriptions.join(", ")),
                total_amount,
                supplier_id,
                billed_party_id,
            })
            .await
            .map_err(as_commit_error)?;

        for category_id in &category_ids {
            tx.link_category(entry_id, *category_id)
                .await
                .map_err(as_commit_error)?;
        }

        let installment_count = record.installments.len();
        for (index, spec) in record.installments.iter().enumerate() {
            tx.create_installment(
                entry_id,
                NewInstallment {
                    label: format!("{}/{}", index + 1, installment_count),
                    due_date: spec.due_date,
                    amount: spec.amount,
                },
            )
            .await
            .map_err(as_commit_error)?;
        }

        tx.commit().await.map_err(as_commit_error)?;

        created_items.push(format!("Ledger entry #{}", entry_id));

        info!(
            entry_id,
            %total_amount,
            created = created_items.len(),
            "Commit complete"
        );

        Ok(CommitReceipt {
            entry_id,
            created_items,
        })
    }
}

/// Every failure inside the commit sequence surfaces as a commit error to
/// the confirming caller.
fn as_commit_error(e: PipelineError) -> PipelineError {
    match e {
        PipelineError::Commit(_) => e,
        other => PipelineError::Commit(other.to_string()),
    }
}
