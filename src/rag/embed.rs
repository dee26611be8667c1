//! Embedding capability
//!
//! Similarity vectors for corpus questions and incoming user questions.

use crate::gemini::GeminiClient;
use crate::Result;
use async_trait::async_trait;

/// Trait for similarity embedding (generative capability)
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// One vector per input text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Gemini embedding-001 backed provider.
pub struct GeminiEmbedder {
    client: GeminiClient,
}

impl GeminiEmbedder {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client.embed(texts).await
    }
}

/// Deterministic embedder for development & testing: byte-frequency
/// buckets, so identical texts map to identical vectors and texts sharing
/// vocabulary land closer together.
pub struct MockEmbedder;

const MOCK_DIMS: usize = 16;

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0f32; MOCK_DIMS];
                for byte in text.to_lowercase().bytes() {
                    vector[(byte as usize) % MOCK_DIMS] += 1.0;
                }
                let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for v in &mut vector {
                        *v /= norm;
                    }
                }
                vector
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_embedder_is_deterministic() {
        let embedder = MockEmbedder;
        let a = embedder
            .embed(&["how many suppliers".to_string()])
            .await
            .unwrap();
        let b = embedder
            .embed(&["how many suppliers".to_string()])
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), MOCK_DIMS);
    }

    #[tokio::test]
    async fn test_mock_embedder_preserves_input_order() {
        let embedder = MockEmbedder;
        let vectors = embedder
            .embed(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_ne!(vectors[0], vectors[1]);
    }
}
