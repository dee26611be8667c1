//! Gemini-powered document extraction
//!
//! Recovers the document text and asks the model for the structured fields
//! of a fiscal invoice as strict JSON.

use crate::error::PipelineError;
use crate::extract::DocumentExtractor;
use crate::gemini::{strip_code_fence, GeminiClient};
use crate::models::StructuredRecord;
use crate::Result;
use async_trait::async_trait;
use tracing::info;

/// Expense category catalog offered to the model. Items that fit nothing
/// else are classified as ADMINISTRATIVE.
const EXPENSE_CATEGORIES: &[&str] = &[
    "FARM INPUTS",
    "MAINTENANCE AND OPERATIONS",
    "HUMAN RESOURCES",
    "OPERATIONAL SERVICES",
    "INFRASTRUCTURE AND UTILITIES",
    "ADMINISTRATIVE",
    "INSURANCE AND PROTECTION",
    "TAXES AND FEES",
    "INVESTMENTS",
];

pub struct GeminiExtractor {
    client: GeminiClient,
}

impl GeminiExtractor {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    fn build_prompt(document_text: &str) -> String {
        format!(
            r#"You are an AI assistant specialized in extracting data from fiscal invoices. Extract the requested fields and classify the expenses.

THE FINAL JSON STRUCTURE MUST BE EXACTLY THIS:
{{
  "supplier": {{ "name": "string", "trade_name": "string or null", "tax_id": "string or null" }},
  "billed_party": {{ "name": "string", "tax_id": "string or null" }},
  "document_number": "string",
  "issue_date": "string (YYYY-MM-DD format)",
  "product_descriptions": ["string"],
  "installments": [{{ "due_date": "string (YYYY-MM-DD format)", "amount": number }}],
  "expense_categories": ["string"]
}}

CRITICAL EXECUTION RULES:
1. **EXPENSE CLASSIFICATION (PRIORITY TASK)**:
   - The 'expense_categories' field MUST be a list of strings and CANNOT be null or empty.
   - Analyze 'product_descriptions' and pick ONE OR MORE categories from the list below.
   - If an item fits nothing exactly (e.g. office supplies), classify it as 'ADMINISTRATIVE'.
2. **BILLED PARTY NAME**: the 'billed_party.name' field is mandatory.
3. **OTHER RULES**: fill every other field. Use `null` for an optional field that is not found.

EXPENSE CATEGORY LIST:
- {}

Analyze the following text and return ONLY the complete JSON.

--- INVOICE TEXT ---
{}
--- END OF TEXT ---
"#,
            EXPENSE_CATEGORIES.join("\n- "),
            document_text,
        )
    }
}

#[async_trait]
impl DocumentExtractor for GeminiExtractor {
    async fn extract(&self, document: &[u8]) -> Result<StructuredRecord> {
        let text = recover_text(document)?;

        info!(bytes = document.len(), "Extracting structured fields");

        let prompt = Self::build_prompt(&text);
        let response = self.client.generate_json(&prompt).await?;
        let cleaned = strip_code_fence(&response);

        let record: StructuredRecord = serde_json::from_str(cleaned).map_err(|e| {
            PipelineError::Capability(format!(
                "Malformed extraction output: {} | raw={}",
                e, response
            ))
        })?;

        Ok(record)
    }
}

/// Recover plain text from raw document bytes.
///
/// Documents arrive as text-bearing payloads; binary or empty input has no
/// recoverable text and is a fatal extraction failure.
pub fn recover_text(document: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(document).map_err(|_| {
        PipelineError::Extraction(
            "No text could be recovered from the document. The file may be binary or corrupted."
                .to_string(),
        )
    })?;

    if text.trim().is_empty() {
        return Err(PipelineError::Extraction(
            "No text could be recovered from the document. The file may be empty.".to_string(),
        ));
    }

    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recover_text_from_utf8() {
        let text = recover_text("INVOICE NF-1 total 100.00".as_bytes()).unwrap();
        assert!(text.contains("NF-1"));
    }

    #[test]
    fn test_recover_text_rejects_empty() {
        let err = recover_text(b"   \n  ").unwrap_err();
        assert_eq!(err.kind(), "extraction");
    }

    #[test]
    fn test_recover_text_rejects_binary() {
        let err = recover_text(&[0xff, 0xfe, 0x00, 0x9c]).unwrap_err();
        assert_eq!(err.kind(), "extraction");
    }

    #[test]
    fn test_extraction_output_parses_into_record() {
        let raw = r#"{
            "supplier": { "name": "Greenfield Farm Supplies Ltd", "trade_name": "Greenfield", "tax_id": "12.345.678/0001-90" },
            "billed_party": { "name": "John Carter", "tax_id": null },
            "document_number": "NF-4512",
            "issue_date": "2024-10-30",
            "product_descriptions": ["NPK fertilizer 20kg"],
            "installments": [{ "due_date": "2024-11-30", "amount": 625.50 }],
            "expense_categories": ["FARM INPUTS"]
        }"#;

        let record: StructuredRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.document_number, "NF-4512");
        assert_eq!(record.billed_party.tax_id, None);
        assert_eq!(record.installments.len(), 1);
    }
}
