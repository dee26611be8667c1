//! Example retrieval by vector similarity
//!
//! Finds the corpus questions closest to the incoming question by dot
//! product and hands their (question, query) pairs to the translator as
//! few-shot examples. Strictly best-effort: every failure path returns an
//! empty list.

use crate::rag::corpus::{ExamplePair, IndexedCorpus};
use crate::rag::embed::EmbeddingProvider;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ExampleRetriever {
    corpus: Arc<IndexedCorpus>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl ExampleRetriever {
    pub fn new(corpus: Arc<IndexedCorpus>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { corpus, embedder }
    }

    /// The k most similar pairs, descending by similarity; ties keep
    /// corpus order.
    pub async fn top_k(&self, question: &str, k: usize) -> Vec<ExamplePair> {
        if self.corpus.vectors().is_empty() || k == 0 {
            return Vec::new();
        }

        let question_vector = match self.embedder.embed(&[question.to_string()]).await {
            Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
            Ok(_) => return Vec::new(),
            Err(e) => {
                warn!("Question embedding failed, skipping example retrieval: {}", e);
                return Vec::new();
            }
        };

        let mut scored: Vec<(usize, f32)> = self
            .corpus
            .vectors()
            .iter()
            .enumerate()
            .map(|(index, vector)| (index, dot(vector, &question_vector)))
            .collect();

        // Stable sort: equal similarities keep corpus order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let selected: Vec<ExamplePair> = scored
            .into_iter()
            .take(k)
            .map(|(index, _)| self.corpus.pairs()[index].clone())
            .collect();

        debug!(
            requested = k,
            returned = selected.len(),
            "Example retrieval complete"
        );

        selected
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::rag::corpus::ExampleCorpus;
    use crate::Result;
    use async_trait::async_trait;

    struct FixedEmbedder {
        vector: Vec<f32>,
    }

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.vector.clone()).collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(PipelineError::Capability("embedding unavailable".to_string()))
        }
    }

    fn pair(question: &str) -> ExamplePair {
        ExamplePair {
            question: question.to_string(),
            query: format!("SELECT 1; -- {}", question),
        }
    }

    fn corpus_with(vectors: Vec<Vec<f32>>) -> Arc<IndexedCorpus> {
        let pairs = (0..vectors.len())
            .map(|i| pair(&format!("question {}", i)))
            .collect();
        Arc::new(IndexedCorpus::with_vectors(
            ExampleCorpus::new(pairs),
            vectors,
        ))
    }

    #[tokio::test]
    async fn test_top_k_sorted_by_descending_similarity() {
        // Question vector [1, 0]: similarities are 0.1, 0.9, 0.5.
        let corpus = corpus_with(vec![vec![0.1, 0.0], vec![0.9, 0.0], vec![0.5, 0.0]]);
        let retriever =
            ExampleRetriever::new(corpus, Arc::new(FixedEmbedder { vector: vec![1.0, 0.0] }));

        let result = retriever.top_k("which suppliers", 3).await;

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].question, "question 1");
        assert_eq!(result[1].question, "question 2");
        assert_eq!(result[2].question, "question 0");
    }

    #[tokio::test]
    async fn test_top_k_returns_at_most_k() {
        let corpus = corpus_with(vec![
            vec![0.1],
            vec![0.2],
            vec![0.3],
            vec![0.4],
            vec![0.5],
        ]);
        let retriever =
            ExampleRetriever::new(corpus, Arc::new(FixedEmbedder { vector: vec![1.0] }));

        let result = retriever.top_k("anything", 3).await;
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].question, "question 4");
    }

    #[tokio::test]
    async fn test_ties_keep_corpus_order() {
        let corpus = corpus_with(vec![vec![0.5], vec![0.5], vec![0.5]]);
        let retriever =
            ExampleRetriever::new(corpus, Arc::new(FixedEmbedder { vector: vec![1.0] }));

        let result = retriever.top_k("anything", 2).await;
        assert_eq!(result[0].question, "question 0");
        assert_eq!(result[1].question, "question 1");
    }

    #[tokio::test]
    async fn test_empty_corpus_returns_empty() {
        let corpus = Arc::new(IndexedCorpus::unindexed(ExampleCorpus::default()));
        let retriever =
            ExampleRetriever::new(corpus, Arc::new(FixedEmbedder { vector: vec![1.0] }));

        assert!(retriever.top_k("anything", 3).await.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_returns_empty() {
        let corpus = corpus_with(vec![vec![0.5], vec![0.6]]);
        let retriever = ExampleRetriever::new(corpus, Arc::new(FailingEmbedder));

        assert!(retriever.top_k("anything", 3).await.is_empty());
    }
}
