//! Gemini-powered risk analysis
//!
//! Senior-analyst style audit of an extracted record. Internal failures
//! degrade to a zero-score report instead of propagating, so risk scoring
//! can never block the intake pipeline.

use crate::gemini::{strip_code_fence, GeminiClient};
use crate::models::{RedFlag, RiskReport, StructuredRecord};
use crate::risk::RiskScorer;
use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

pub struct GeminiRiskScorer {
    client: GeminiClient,
}

impl GeminiRiskScorer {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    fn build_prompt(record: &StructuredRecord, today: chrono::NaiveDate) -> String {
        let record_json =
            serde_json::to_string_pretty(record).unwrap_or_else(|_| "{}".to_string());

        format!(
            r#"You are a senior financial risk analyst.

TEMPORAL CONTEXT:
- Today is: {today}
- Use this date to decide whether the issue date lies in the future.

TASK:
Analyze the data extracted from the invoice and produce a technical opinion as JSON.

INVOICE DATA:
{record_json}

CRITERIA:
1. Temporal validity: an issue date after {today} is suspicious.
2. Inconsistency: products vs. category.
3. Prices: values outside market range.
4. Suspicious patterns.

MANDATORY JSON FORMAT:
{{
  "risk_score": <int, 0-10>,
  "summary": "<string, short opinion>",
  "red_flags": [
    {{ "type": "<string>", "description": "<string>" }}
  ]
}}
"#,
        )
    }

    async fn score_inner(&self, record: &StructuredRecord) -> Result<RiskReport> {
        let today = chrono::Utc::now().date_naive();
        let prompt = Self::build_prompt(record, today);

        let response = self.client.generate_json(&prompt).await?;
        let cleaned = strip_code_fence(&response);

        let wire: RiskReportWire = serde_json::from_str(cleaned).map_err(|e| {
            crate::error::PipelineError::Capability(format!(
                "Malformed risk report: {} | raw={}",
                e, response
            ))
        })?;

        Ok(RiskReport {
            score: wire.risk_score.clamp(0, 10) as u8,
            summary: wire.summary,
            red_flags: wire.red_flags,
        })
    }
}

#[async_trait]
impl RiskScorer for GeminiRiskScorer {
    /// Never-block policy: any internal failure is converted into a
    /// degraded report (score 0, summary carrying the reason, no flags).
    async fn score(&self, record: &StructuredRecord) -> Result<RiskReport> {
        match self.score_inner(record).await {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!("Risk scoring failed, returning degraded report: {}", e);
                Ok(RiskReport::degraded(format!(
                    "Automatic risk analysis failed: {}",
                    e
                )))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RiskReportWire {
    risk_score: i64,
    summary: String,
    #[serde(default)]
    red_flags: Vec<RedFlag>,
}
