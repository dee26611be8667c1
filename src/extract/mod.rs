//! Document extraction capability
//!
//! Turns raw document bytes into a structured record. The real
//! implementation is a generative model call; the trait keeps the pipeline
//! testable with deterministic stand-ins.

use crate::models::{InstallmentSpec, Party, StructuredRecord};
use crate::Result;
use async_trait::async_trait;

pub mod gemini;
pub use gemini::GeminiExtractor;

/// Trait for structured extraction (generative capability)
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Extract a structured record from raw document bytes.
    /// Fails with an extraction error when no text is recoverable.
    async fn extract(&self, document: &[u8]) -> Result<StructuredRecord>;
}

/// Mock extractor for development & testing
/// Keeps the pipeline functional without LLM dependency
pub struct MockExtractor {
    record: StructuredRecord,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            record: sample_record(),
        }
    }

    pub fn with_record(record: StructuredRecord) -> Self {
        Self { record }
    }
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentExtractor for MockExtractor {
    async fn extract(&self, document: &[u8]) -> Result<StructuredRecord> {
        if document.is_empty() {
            return Err(crate::error::PipelineError::Extraction(
                "Document is empty".to_string(),
            ));
        }

        Ok(self.record.clone())
    }
}

/// Representative invoice record used by the mock extractor and the demo
/// binary.
pub fn sample_record() -> StructuredRecord {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    StructuredRecord {
        supplier: Party {
            name: "Greenfield Farm Supplies Ltd".to_string(),
            trade_name: Some("Greenfield".to_string()),
            tax_id: Some("12.345.678/0001-90".to_string()),
        },
        billed_party: Party {
            name: "John Carter".to_string(),
            trade_name: None,
            tax_id: Some("123.456.789-09".to_string()),
        },
        document_number: "NF-4512".to_string(),
        issue_date: NaiveDate::from_ymd_opt(2024, 10, 30).unwrap(),
        product_descriptions: vec![
            "NPK fertilizer 20kg".to_string(),
            "Corn seed bag".to_string(),
        ],
        installments: vec![
            InstallmentSpec {
                due_date: NaiveDate::from_ymd_opt(2024, 11, 30).unwrap(),
                amount: Decimal::new(62550, 2),
            },
            InstallmentSpec {
                due_date: NaiveDate::from_ymd_opt(2024, 12, 30).unwrap(),
                amount: Decimal::new(62550, 2),
            },
        ],
        expense_categories: vec!["FARM INPUTS".to_string()],
    }
}
