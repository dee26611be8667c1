//! Gemini API client shared by the generative capabilities
//!
//! One long-lived reqwest::Client for connection pooling; text generation
//! and content embedding endpoints.

use crate::error::PipelineError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const GENERATE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";
const EMBED_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/embedding-001:batchEmbedContents";
const EMBED_MODEL: &str = "models/embedding-001";

/// Reusable Gemini client (connection-pooled)
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()
            .expect("Failed to build HTTP client");

        Self { client, api_key }
    }

    fn check_key(&self) -> crate::Result<()> {
        if self.api_key.is_empty() {
            return Err(PipelineError::Capability(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate a plain-text response.
    pub async fn generate(&self, prompt: &str) -> crate::Result<String> {
        self.request_text(prompt, None).await
    }

    /// Generate a response constrained to a JSON mime type.
    pub async fn generate_json(&self, prompt: &str) -> crate::Result<String> {
        self.request_text(prompt, Some("application/json")).await
    }

    async fn request_text(
        &self,
        prompt: &str,
        response_mime_type: Option<&str>,
    ) -> crate::Result<String> {
        self.check_key()?;

        let url = format!("{}?key={}", GENERATE_URL, self.api_key);

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 2048,
                response_mime_type: response_mime_type.map(str::to_string),
            },
        };

        info!("Calling Gemini generateContent");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                PipelineError::Capability(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(PipelineError::Capability(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            PipelineError::Capability(format!("Gemini parse error: {}", e))
        })?;

        let answer = generated
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| {
                PipelineError::Capability("Empty response from Gemini".to_string())
            })?;

        Ok(answer)
    }

    /// Embed a batch of texts, one vector per input, in input order.
    pub async fn embed(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        self.check_key()?;

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}?key={}", EMBED_URL, self.api_key);

        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedRequest {
                    model: EMBED_MODEL.to_string(),
                    content: Content {
                        parts: vec![Part { text: text.clone() }],
                    },
                })
                .collect(),
        };

        info!(count = texts.len(), "Calling Gemini batchEmbedContents");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini embed request failed: {}", e);
                PipelineError::Capability(format!("Gemini embed error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini embed error response: {}", error_text);
            return Err(PipelineError::Capability(format!(
                "Gemini embed error: {}",
                error_text
            )));
        }

        let embedded: BatchEmbedResponse = response.json().await.map_err(|e| {
            PipelineError::Capability(format!("Gemini embed parse error: {}", e))
        })?;

        if embedded.embeddings.len() != texts.len() {
            return Err(PipelineError::Capability(format!(
                "Gemini returned {} embeddings for {} inputs",
                embedded.embeddings.len(),
                texts.len()
            )));
        }

        Ok(embedded.embeddings.into_iter().map(|e| e.values).collect())
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Strip an optional markdown code fence from a model response.
///
/// Gemini frequently wraps JSON and SQL answers in ```json / ```sql fences
/// even when asked not to.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```sql"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .trim()
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or_else(|| without_open.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "Translate this question".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 2048,
                response_mime_type: Some("application/json".to_string()),
            },
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("Translate this question"));
        assert!(json.contains("application/json"));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```sql\nSELECT 1;\n```"), "SELECT 1;");
        assert_eq!(strip_code_fence("SELECT 1;"), "SELECT 1;");
        assert_eq!(strip_code_fence("  plain text  "), "plain text");
    }

    #[test]
    fn test_embed_response_parsing() {
        let raw = r#"{"embeddings":[{"values":[0.1,0.2]},{"values":[0.3,0.4]}]}"#;
        let parsed: BatchEmbedResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.embeddings.len(), 2);
        assert_eq!(parsed.embeddings[1].values, vec![0.3, 0.4]);
    }
}
