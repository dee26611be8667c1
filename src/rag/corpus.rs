//! Knowledge corpus for the question-to-query translator
//!
//! Pairs of natural-language question and reference SQL the translator
//! receives as few-shot examples. Read-only at runtime; the indexed form
//! with precomputed vectors is built once at startup and injected into the
//! retriever.

use crate::rag::embed::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExamplePair {
    pub question: String,
    pub query: String,
}

impl ExamplePair {
    fn new(question: &str, query: &str) -> Self {
        Self {
            question: question.to_string(),
            query: query.to_string(),
        }
    }
}

/// Fixed set of (question, query) pairs.
#[derive(Debug, Clone, Default)]
pub struct ExampleCorpus {
    pairs: Vec<ExamplePair>,
}

impl ExampleCorpus {
    pub fn new(pairs: Vec<ExamplePair>) -> Self {
        Self { pairs }
    }

    pub fn pairs(&self) -> &[ExamplePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Built-in corpus covering the curated schema.
    pub fn builtin() -> Self {
        Self::new(vec![
            ExamplePair::new(
                "How many suppliers are registered?",
                r#"SELECT count(*) FROM persons WHERE UPPER(kind) = 'SUPPLIER';"#,
            ),
            ExamplePair::new(
                "List the name and tax id of every active client.",
                r#"SELECT legal_name, tax_id FROM persons WHERE UPPER(kind) = 'CLIENT' AND UPPER(status) = 'ACTIVE';"#,
            ),
            ExamplePair::new(
                "What is the total amount of all pending payables?",
                r#"SELECT SUM(total_amount) FROM ledger_entries WHERE UPPER(direction) = 'PAYABLE' AND UPPER(status) = 'PENDING';"#,
            ),
            ExamplePair::new(
                "How much do I have to receive in total?",
                r#"SELECT SUM(total_amount) FROM ledger_entries WHERE UPPER(direction) = 'RECEIVABLE';"#,
            ),
            ExamplePair::new(
                "Which expense categories are available?",
                r#"SELECT label FROM categories WHERE UPPER(kind) = 'EXPENSE';"#,
            ),
            ExamplePair::new(
                "How many ledger entries were registered in total?",
                r#"SELECT count(*) FROM ledger_entries;"#,
            ),
            ExamplePair::new(
                "What is the tax id of the person named 'Exact Person Name'?",
                r#"SELECT tax_id FROM persons WHERE UPPER(legal_name) = UPPER('Exact Person Name');"#,
            ),
            ExamplePair::new(
                "List every pending installment ordered by due date.",
                r#"SELECT label, amount, due_date FROM installments WHERE UPPER(status) = 'PENDING' ORDER BY due_date ASC;"#,
            ),
            ExamplePair::new(
                "What were the last 5 payable entries?",
                r#"SELECT document_number, total_amount, issue_date FROM ledger_entries WHERE UPPER(direction) = 'PAYABLE' ORDER BY issue_date DESC LIMIT 5;"#,
            ),
            ExamplePair::new(
                "Who is the supplier on invoice 'NF-123'?",
                r#"SELECT T1.legal_name FROM persons T1 JOIN ledger_entries T2 ON T1.id = T2.supplier_id WHERE UPPER(T2.document_number) = UPPER('NF-123');"#,
            ),
            ExamplePair::new(
                "Who was billed on the entry with id 10?",
                r#"SELECT T1.legal_name FROM persons T1 JOIN ledger_entries T2 ON T1.id = T2.billed_party_id WHERE T2.id = 10;"#,
            ),
            ExamplePair::new(
                "Are there people registered as INACTIVE?",
                r#"SELECT legal_name, status FROM persons WHERE UPPER(status) = 'INACTIVE';"#,
            ),
            ExamplePair::new(
                "What is the average amount of the payable entries?",
                r#"SELECT AVG(total_amount) FROM ledger_entries WHERE UPPER(direction) = 'PAYABLE';"#,
            ),
            ExamplePair::new(
                "What are the installments of the entry for invoice 'NF-456'?",
                r#"SELECT T1.label, T1.amount FROM installments T1 JOIN ledger_entries T2 ON T1.entry_id = T2.id WHERE UPPER(T2.document_number) = UPPER('NF-456');"#,
            ),
            ExamplePair::new(
                "List the entries issued on October 30th, 2024.",
                r#"SELECT document_number, total_amount FROM ledger_entries WHERE issue_date = '2024-10-30';"#,
            ),
            ExamplePair::new(
                "Which receivables were issued in October 2024?",
                r#"SELECT document_number, total_amount, issue_date FROM ledger_entries WHERE UPPER(direction) = 'RECEIVABLE' AND issue_date BETWEEN '2024-10-01' AND '2024-10-31';"#,
            ),
            ExamplePair::new(
                "Which categories does the entry with id 15 belong to?",
                r#"SELECT T2.label FROM entry_categories T1 JOIN categories T2 ON T1.category_id = T2.id WHERE T1.entry_id = 15;"#,
            ),
            ExamplePair::new(
                "Which entries belong to the category 'FARM INPUTS'?",
                r#"SELECT T2.id, T2.document_number FROM categories T1 JOIN entry_categories T_JOIN ON T1.id = T_JOIN.category_id JOIN ledger_entries T2 ON T_JOIN.entry_id = T2.id WHERE UPPER(T1.label) = UPPER('FARM INPUTS');"#,
            ),
            ExamplePair::new(
                "Do we have overdue installments that are still pending?",
                r#"SELECT label, amount, due_date FROM installments WHERE UPPER(status) = 'PENDING' AND due_date < CURRENT_DATE;"#,
            ),
            ExamplePair::new(
                "What is the largest single installment amount on record?",
                r#"SELECT MAX(amount) FROM installments;"#,
            ),
        ])
    }
}

/// Corpus plus one similarity vector per pair.
///
/// Process-wide, immutable after construction. When indexing fails the
/// vectors stay empty and retrieval simply returns nothing: the corpus is a
/// quality booster, never a hard dependency.
#[derive(Debug, Clone)]
pub struct IndexedCorpus {
    pairs: Vec<ExamplePair>,
    vectors: Vec<Vec<f32>>,
}

impl IndexedCorpus {
    /// Embed every corpus question once. Any failure degrades to an
    /// unindexed corpus.
    pub async fn build(corpus: ExampleCorpus, embedder: &dyn EmbeddingProvider) -> Self {
        if corpus.is_empty() {
            return Self::unindexed(corpus);
        }

        let questions: Vec<String> =
            corpus.pairs().iter().map(|p| p.question.clone()).collect();

        match embedder.embed(&questions).await {
            Ok(vectors) if vectors.len() == corpus.len() => {
                info!(examples = corpus.len(), "Example corpus indexed");
                Self {
                    pairs: corpus.pairs,
                    vectors,
                }
            }
            Ok(vectors) => {
                warn!(
                    expected = corpus.len(),
                    got = vectors.len(),
                    "Corpus embedding count mismatch; retrieval disabled"
                );
                Self::unindexed(ExampleCorpus { pairs: corpus.pairs })
            }
            Err(e) => {
                warn!("Failed to index example corpus, retrieval disabled: {}", e);
                Self::unindexed(ExampleCorpus { pairs: corpus.pairs })
            }
        }
    }

    /// Corpus without vectors; retrieval over it returns nothing.
    pub fn unindexed(corpus: ExampleCorpus) -> Self {
        Self {
            pairs: corpus.pairs,
            vectors: Vec::new(),
        }
    }

    /// Corpus with externally computed vectors, one per pair.
    pub fn with_vectors(corpus: ExampleCorpus, vectors: Vec<Vec<f32>>) -> Self {
        debug_assert_eq!(corpus.len(), vectors.len());
        Self {
            pairs: corpus.pairs,
            vectors,
        }
    }

    pub fn pairs(&self) -> &[ExamplePair] {
        &self.pairs
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::safety::{check, GateDecision};

    #[test]
    fn test_builtin_corpus_is_populated() {
        let corpus = ExampleCorpus::builtin();
        assert!(corpus.len() >= 15);
        assert!(corpus.pairs().iter().all(|p| !p.question.is_empty()));
    }

    #[test]
    fn test_builtin_queries_are_read_only() {
        // Every reference query must pass the same gate generated queries do.
        for pair in ExampleCorpus::builtin().pairs() {
            assert_eq!(
                check(&pair.query),
                GateDecision::Accept,
                "corpus query rejected: {}",
                pair.query
            );
        }
    }
}
