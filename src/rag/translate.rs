//! Question-to-query translation capability
//!
//! Translates a natural-language question into SQL over the curated
//! schema. Out-of-domain questions translate to the NO_QUERY sentinel,
//! which downstream treats as a no-result case rather than an error.

use crate::gemini::{strip_code_fence, GeminiClient};
use crate::rag::corpus::ExamplePair;
use crate::Result;
use async_trait::async_trait;
use tracing::info;

/// Sentinel returned for questions with no relevant query.
pub const NO_QUERY: &str = "NO_QUERY";

/// Trait for query translation (generative capability)
#[async_trait]
pub trait QueryTranslator: Send + Sync {
    async fn translate(
        &self,
        question: &str,
        schema: &str,
        examples: &[ExamplePair],
    ) -> Result<String>;
}

pub struct GeminiQueryTranslator {
    client: GeminiClient,
}

impl GeminiQueryTranslator {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    fn format_examples(examples: &[ExamplePair]) -> String {
        if examples.is_empty() {
            return String::new();
        }

        let mut formatted = String::from("\n--- RELEVANT EXAMPLES FOUND ---\n");
        for example in examples {
            formatted.push_str(&format!("Example question: {}\n", example.question));
            formatted.push_str(&format!("Example SQL: {}\n---\n", example.query));
        }
        formatted
    }

    fn build_prompt(question: &str, schema: &str, examples: &[ExamplePair]) -> String {
        format!(
            r#"You are a PostgreSQL SQL expert assistant.
Your job is to translate the user's question into a SQL query based on the database schema provided.
The user does NOT know the schema, so use the table and column names from the schema.

CRITICAL RULES:
1. Generate ONLY the SQL query.
2. Do NOT include '```sql' or any other formatting.
3. If the question has NOTHING to do with the database (e.g. "hi", "good morning"), return ONLY the word '{sentinel}'.
4. **CASE INSENSITIVITY (MOST IMPORTANT):** for ALL string comparisons (in `WHERE` or `JOIN` clauses),
   apply `UPPER()` to both sides so the search is not case sensitive.
   Example: `WHERE UPPER(T1.label) = UPPER('user value')`

--- SYNONYM RULE (IMPORTANT) ---
- The user may say "client". In the store this can be `kind = 'CLIENT'` or `kind = 'BILLED'`.
- If the user asks about "clients", search for BOTH: `... WHERE UPPER(kind) IN ('CLIENT', 'BILLED') ...`
- If the user asks specifically about the "billed party", search only `UPPER(kind) = 'BILLED'`.
--- END OF SYNONYM RULE ---

--- DATABASE SCHEMA ---
{schema}
--- END OF SCHEMA ---
{examples}
USER QUESTION: "{question}"

GENERATED SQL:
"#,
            sentinel = NO_QUERY,
            schema = schema,
            examples = Self::format_examples(examples),
            question = question,
        )
    }
}

#[async_trait]
impl QueryTranslator for GeminiQueryTranslator {
    async fn translate(
        &self,
        question: &str,
        schema: &str,
        examples: &[ExamplePair],
    ) -> Result<String> {
        let prompt = Self::build_prompt(question, schema, examples);
        let response = self.client.generate(&prompt).await?;

        let query = strip_code_fence(&response).trim().to_string();

        if query.is_empty() {
            info!("Translator returned nothing, treating as out-of-domain");
            return Ok(NO_QUERY.to_string());
        }

        Ok(query)
    }
}

/// Mock translator for development & testing
pub struct MockTranslator {
    query: String,
}

impl MockTranslator {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }

    pub fn out_of_domain() -> Self {
        Self::new(NO_QUERY)
    }
}

#[async_trait]
impl QueryTranslator for MockTranslator {
    async fn translate(
        &self,
        _question: &str,
        _schema: &str,
        _examples: &[ExamplePair],
    ) -> Result<String> {
        Ok(self.query.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_includes_schema_and_examples() {
        let examples = vec![ExamplePair {
            question: "How many suppliers?".to_string(),
            query: "SELECT count(*) FROM persons;".to_string(),
        }];

        let prompt =
            GeminiQueryTranslator::build_prompt("how many suppliers", "Table persons", &examples);

        assert!(prompt.contains("Table persons"));
        assert!(prompt.contains("How many suppliers?"));
        assert!(prompt.contains(NO_QUERY));
    }

    #[test]
    fn test_prompt_without_examples_has_no_example_header() {
        let prompt = GeminiQueryTranslator::build_prompt("hi", "schema", &[]);
        assert!(!prompt.contains("RELEVANT EXAMPLES"));
    }
}
