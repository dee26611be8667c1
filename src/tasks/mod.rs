//! Intake task orchestration
//!
//! submit → background worker runs extractor → risk scorer → reconciler,
//! publishing progress through a pollable state record. The worker and the
//! polling caller share nothing but that record. No store writes happen
//! here; commit is a separate, caller-triggered step.

use crate::extract::DocumentExtractor;
use crate::models::{PipelineOutput, TaskState};
use crate::reconcile::Reconciler;
use crate::risk::RiskScorer;
use crate::store::LedgerStore;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Registry of task states.
///
/// Transitions are monotonic: once a task reaches SUCCESS or FAILURE,
/// further updates are ignored, so every subsequent poll returns the same
/// terminal state.
#[derive(Clone)]
pub struct TaskRegistry {
    tasks: Arc<RwLock<HashMap<Uuid, TaskState>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn insert_pending(&self, task_id: Uuid) {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task_id, TaskState::Pending);
    }

    async fn set(&self, task_id: Uuid, state: TaskState) {
        let mut tasks = self.tasks.write().await;
        match tasks.get(&task_id) {
            Some(current) if current.is_terminal() => {
                warn!(%task_id, "Ignoring state update for terminal task");
            }
            _ => {
                tasks.insert(task_id, state);
            }
        }
    }

    pub async fn get(&self, task_id: Uuid) -> Option<TaskState> {
        let tasks = self.tasks.read().await;
        tasks.get(&task_id).cloned()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the intake pipeline for submitted documents on background workers.
pub struct IntakeOrchestrator {
    extractor: Arc<dyn DocumentExtractor>,
    risk_scorer: Arc<dyn RiskScorer>,
    reconciler: Arc<Reconciler>,
    registry: TaskRegistry,
}

impl IntakeOrchestrator {
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        risk_scorer: Arc<dyn RiskScorer>,
        store: Arc<dyn LedgerStore>,
    ) -> Self {
        Self {
            extractor,
            risk_scorer,
            reconciler: Arc::new(Reconciler::new(store)),
            registry: TaskRegistry::new(),
        }
    }

    /// Submit a document for processing. Returns immediately; the pipeline
    /// runs on a background worker and is observed through [`poll`].
    ///
    /// [`poll`]: IntakeOrchestrator::poll
    pub async fn submit(&self, document: Vec<u8>) -> Uuid {
        let task_id = Uuid::new_v4();
        self.registry.insert_pending(task_id).await;

        info!(%task_id, bytes = document.len(), "Task submitted");

        let extractor = Arc::clone(&self.extractor);
        let risk_scorer = Arc::clone(&self.risk_scorer);
        let reconciler = Arc::clone(&self.reconciler);
        let registry = self.registry.clone();

        tokio::spawn(async move {
            let outcome =
                run_pipeline(&extractor, &risk_scorer, &reconciler, &registry, task_id, &document)
                    .await;

            match outcome {
                Ok(output) => {
                    info!(%task_id, "Task complete");
                    registry.set(task_id, TaskState::Success { output }).await;
                }
                Err(e) => {
                    warn!(%task_id, error = %e, "Task failed");
                    registry
                        .set(
                            task_id,
                            TaskState::Failure {
                                kind: e.kind().to_string(),
                                message: e.to_string(),
                            },
                        )
                        .await;
                }
            }
        });

        task_id
    }

    /// Read the current state of a task. Idempotent and read-only; may be
    /// called any number of times.
    pub async fn poll(&self, task_id: Uuid) -> Result<TaskState> {
        self.registry
            .get(task_id)
            .await
            .ok_or(crate::error::PipelineError::TaskNotFound(task_id))
    }
}

async fn run_pipeline(
    extractor: &Arc<dyn DocumentExtractor>,
    risk_scorer: &Arc<dyn RiskScorer>,
    reconciler: &Arc<Reconciler>,
    registry: &TaskRegistry,
    task_id: Uuid,
    document: &[u8],
) -> Result<PipelineOutput> {
    registry
        .set(
            task_id,
            TaskState::Progress {
                message: "Extracting structured fields from the document (stage 1 of 3)..."
                    .to_string(),
            },
        )
        .await;
    let record = extractor.extract(document).await?;
    debug!(%task_id, document_number = %record.document_number, "Extraction complete");

    registry
        .set(
            task_id,
            TaskState::Progress {
                message: "Auditing the record for risk signals (stage 2 of 3)...".to_string(),
            },
        )
        .await;
    let risk = risk_scorer.score(&record).await?;
    debug!(%task_id, score = risk.score, "Risk scoring complete");

    registry
        .set(
            task_id,
            TaskState::Progress {
                message: "Reconciling entities against the ledger (stage 3 of 3)...".to_string(),
            },
        )
        .await;
    let reconciliation = reconciler.reconcile(&record).await?;

    Ok(PipelineOutput {
        record,
        risk,
        reconciliation,
    })
}
