use invoice_intake_orchestrator::{
    commit::CommitCoordinator,
    extract::MockExtractor,
    models::{MatchStatus, PersonKind, TaskState},
    risk::MockRiskScorer,
    store::{InMemoryStore, LedgerStore, NewPerson, StoreTransaction},
    tasks::IntakeOrchestrator,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Invoice Intake Orchestrator - demo pipeline run");

    // In-memory store seeded with a known supplier, so reconciliation has
    // something to match against.
    let store = Arc::new(InMemoryStore::new());
    {
        let mut tx = store.begin().await?;
        tx.create_person(NewPerson {
            kind: PersonKind::Supplier,
            legal_name: "Greenfield Farm Supplies Ltd".to_string(),
            trade_name: Some("Greenfield".to_string()),
            tax_id: Some("12.345.678/0001-90".to_string()),
        })
        .await?;
        tx.commit().await?;
    }

    // Mock capabilities keep the demo deterministic and offline.
    let orchestrator = IntakeOrchestrator::new(
        Arc::new(MockExtractor::new()),
        Arc::new(MockRiskScorer::new()),
        store.clone() as Arc<dyn LedgerStore>,
    );

    let document = b"INVOICE NF-4512 Greenfield Farm Supplies Ltd".to_vec();
    let task_id = orchestrator.submit(document).await;
    info!(%task_id, "Document submitted");

    // Poll the task the way a frontend would.
    let output = loop {
        match orchestrator.poll(task_id).await? {
            TaskState::Pending => println!("Task queued..."),
            TaskState::Progress { message } => println!("{}", message),
            TaskState::Success { output } => break output,
            TaskState::Failure { kind, message } => {
                eprintln!("Task failed ({}): {}", kind, message);
                return Err(message.into());
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    };

    println!("\n=== PIPELINE OUTPUT ===");
    println!("Document: {}", output.record.document_number);
    println!(
        "Risk score: {}/10 ({})",
        output.risk.score, output.risk.summary
    );
    println!(
        "Supplier: {:?} ({})",
        output.reconciliation.supplier.status, output.reconciliation.supplier.detail.name
    );
    println!(
        "Billed party: {:?} ({})",
        output.reconciliation.billed_party.status, output.reconciliation.billed_party.detail.name
    );
    for category in &output.reconciliation.categories {
        println!("Category: {:?} ({})", category.status, category.label);
    }

    assert_eq!(
        output.reconciliation.supplier.status,
        MatchStatus::Matched,
        "seeded supplier should reconcile"
    );

    // Operator confirmation happens here in the real flow.
    let coordinator = CommitCoordinator::new(store.clone() as Arc<dyn LedgerStore>);
    let receipt = coordinator
        .commit(&output.record, &output.reconciliation)
        .await?;

    println!("\n=== COMMIT RECEIPT ===");
    println!("Ledger entry id: {}", receipt.entry_id);
    for item in &receipt.created_items {
        println!("Created: {}", item);
    }

    println!(
        "\nStore now holds {} person(s), {} entr(ies), {} installment(s).",
        store.person_count().await,
        store.entry_count().await,
        store.installment_count().await,
    );

    Ok(())
}
