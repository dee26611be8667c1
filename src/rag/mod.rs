//! Question answering over the ledger
//!
//! retrieve similar examples → translate the question to SQL → reject
//! unsafe queries → execute read-only → synthesize a natural-language
//! answer. Every failure on this path degrades into a friendly answer;
//! nothing here surfaces a raw error to the end user.

use crate::error::PipelineError;
use crate::rag::executor::QueryExecutor;
use crate::rag::retriever::ExampleRetriever;
use crate::rag::synthesize::AnswerSynthesizer;
use crate::rag::translate::{QueryTranslator, NO_QUERY};
use crate::store::LedgerStore;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

pub mod corpus;
pub mod embed;
pub mod executor;
pub mod retriever;
pub mod safety;
pub mod schema;
pub mod synthesize;
pub mod translate;

pub use corpus::{ExampleCorpus, IndexedCorpus};

/// Number of similar examples handed to the translator.
const RETRIEVED_EXAMPLES: usize = 3;

/// Last-resort answer when even synthesis fails.
const FALLBACK_ANSWER: &str =
    "Sorry, something went wrong while processing your question. Please try again.";

pub struct QueryAgent {
    retriever: ExampleRetriever,
    translator: Arc<dyn QueryTranslator>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    executor: QueryExecutor,
}

impl QueryAgent {
    pub fn new(
        retriever: ExampleRetriever,
        translator: Arc<dyn QueryTranslator>,
        synthesizer: Arc<dyn AnswerSynthesizer>,
        store: Arc<dyn LedgerStore>,
    ) -> Self {
        Self {
            retriever,
            translator,
            synthesizer,
            executor: QueryExecutor::new(store),
        }
    }

    /// Answer a natural-language question. Never returns an error payload
    /// to the caller: failures are folded into the answer text.
    pub async fn answer(&self, question: &str) -> String {
        match self.answer_inner(question).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Answer synthesis failed: {}", e);
                FALLBACK_ANSWER.to_string()
            }
        }
    }

    async fn answer_inner(&self, question: &str) -> crate::Result<String> {
        let examples = self.retriever.top_k(question, RETRIEVED_EXAMPLES).await;

        let query = match self
            .translator
            .translate(question, schema::SCHEMA_DESCRIPTION, &examples)
            .await
        {
            Ok(query) => query,
            Err(e) => {
                // Translation failure degrades to the no-query case; the
                // synthesizer explains it as out-of-scope.
                warn!("Query translation failed: {}", e);
                NO_QUERY.to_string()
            }
        };

        info!(query = %query, "Question translated");

        let result_json = self.run_query(&query).await;

        self.synthesizer
            .synthesize(question, &query, &result_json)
            .await
    }

    /// Gate and execute the generated query, folding every outcome into a
    /// JSON payload for the synthesizer.
    async fn run_query(&self, query: &str) -> String {
        if query.eq_ignore_ascii_case(NO_QUERY) {
            return json!({
                "error": "The question does not appear to be a database query."
            })
            .to_string();
        }

        match safety::check(query) {
            safety::GateDecision::Reject(reason) => {
                let rejected = PipelineError::UnsafeQuery(reason);
                warn!(query = %query, "{}", rejected);
                json!({
                    "error": format!(
                        "Query rejected: only read-only SELECT queries are allowed ({})",
                        rejected
                    )
                })
                .to_string()
            }
            safety::GateDecision::Accept => match self.executor.execute(query).await {
                Ok(result) => result.render_json(),
                Err(e) => {
                    warn!(query = %query, "Query execution failed: {}", e);
                    json!({
                        "error": format!("Query execution failed: {}", e)
                    })
                    .to_string()
                }
            },
        }
    }
}
