use invoice_intake_orchestrator::{
    api::{start_server, ApiState},
    commit::CommitCoordinator,
    extract::GeminiExtractor,
    gemini::GeminiClient,
    rag::{
        corpus::{ExampleCorpus, IndexedCorpus},
        embed::{EmbeddingProvider, GeminiEmbedder},
        retriever::ExampleRetriever,
        synthesize::GeminiAnswerSynthesizer,
        translate::GeminiQueryTranslator,
        QueryAgent,
    },
    risk::GeminiRiskScorer,
    store::{InMemoryStore, LedgerStore, PostgresStore},
    tasks::IntakeOrchestrator,
};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let gemini_api_key = std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
        eprintln!("GEMINI_API_KEY not set in .env - capability calls will fail");
        String::new()
    });

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("Invoice Intake Orchestrator - API Server");
    info!("Port: {}", api_port);

    // Ledger store: Postgres when configured, in-memory otherwise.
    let store: Arc<dyn LedgerStore> = match std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("POSTGRES_URL"))
    {
        Ok(url) => match PostgresStore::connect_lazy(&url) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!("Failed to initialize postgres store, falling back to in-memory: {}", e);
                Arc::new(InMemoryStore::new())
            }
        },
        Err(_) => {
            info!("Ledger store backend: in-memory (DATABASE_URL not set)");
            Arc::new(InMemoryStore::new())
        }
    };

    // Generative capabilities share one pooled client.
    let client = GeminiClient::new(gemini_api_key);
    let extractor = Arc::new(GeminiExtractor::new(client.clone()));
    let risk_scorer = Arc::new(GeminiRiskScorer::new(client.clone()));
    let translator = Arc::new(GeminiQueryTranslator::new(client.clone()));
    let synthesizer = Arc::new(GeminiAnswerSynthesizer::new(client.clone()));
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(GeminiEmbedder::new(client));

    // Index the example corpus once at startup; retrieval degrades to
    // empty results if embedding is unavailable.
    info!("Indexing example corpus...");
    let corpus = Arc::new(IndexedCorpus::build(ExampleCorpus::builtin(), embedder.as_ref()).await);

    let orchestrator = Arc::new(IntakeOrchestrator::new(
        extractor,
        risk_scorer,
        store.clone(),
    ));
    let commit = Arc::new(CommitCoordinator::new(store.clone()));
    let query_agent = Arc::new(QueryAgent::new(
        ExampleRetriever::new(corpus, embedder),
        translator,
        synthesizer,
        store,
    ));

    info!("Orchestrator initialized");
    info!("Starting API server...");

    start_server(ApiState::new(orchestrator, commit, query_agent), api_port).await?;

    Ok(())
}
