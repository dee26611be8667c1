//! Risk scoring capability
//!
//! Produces an advisory risk report for an extracted record. The report
//! never blocks the pipeline or the commit.

use crate::models::{RiskReport, StructuredRecord};
use crate::Result;
use async_trait::async_trait;

pub mod gemini;
pub use gemini::GeminiRiskScorer;

/// Trait for risk assessment (generative capability)
#[async_trait]
pub trait RiskScorer: Send + Sync {
    async fn score(&self, record: &StructuredRecord) -> Result<RiskReport>;
}

/// Mock risk scorer for development & testing
pub struct MockRiskScorer {
    report: RiskReport,
}

impl MockRiskScorer {
    pub fn new() -> Self {
        Self {
            report: RiskReport {
                score: 2,
                summary: "No material inconsistencies found".to_string(),
                red_flags: Vec::new(),
            },
        }
    }

    pub fn with_report(report: RiskReport) -> Self {
        Self { report }
    }
}

impl Default for MockRiskScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RiskScorer for MockRiskScorer {
    async fn score(&self, _record: &StructuredRecord) -> Result<RiskReport> {
        Ok(self.report.clone())
    }
}
