//! Answer synthesis capability
//!
//! Turns the executed query result (or its failure payload) into a
//! natural-language answer for the end user.

use crate::gemini::GeminiClient;
use crate::Result;
use async_trait::async_trait;

/// Trait for answer synthesis (generative capability)
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        question: &str,
        query: &str,
        result_json: &str,
    ) -> Result<String>;
}

pub struct GeminiAnswerSynthesizer {
    client: GeminiClient,
}

impl GeminiAnswerSynthesizer {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    fn build_prompt(question: &str, query: &str, result_json: &str) -> String {
        format!(
            r#"You are a friendly financial assistant.
The user's question was: "{question}"
To answer it, I executed (or tried to execute) the SQL query:
`{query}`
And obtained the following results from the database (in JSON format):
{result_json}

Based on these results, write a clear, friendly answer for the user.
ANSWER RULES:
- If the SQL is '{sentinel}' or the result says the question does not look like a database query,
  explain kindly that you are an assistant focused on financial data (e.g. "Hello! I'm an assistant focused on data. How can I help with your finances?").
- If the results are an empty list, say that "No data was found for this query."
- If the result is an error (other than '{sentinel}'), explain the error in simple terms.
- If the result is a number (e.g. a count), answer directly.
- If the result is a list of items, format them in a readable way.
- If the result carries a truncation note, mention that only the first rows are shown.

FRIENDLY ANSWER:
"#,
            question = question,
            query = query,
            result_json = result_json,
            sentinel = crate::rag::translate::NO_QUERY,
        )
    }
}

#[async_trait]
impl AnswerSynthesizer for GeminiAnswerSynthesizer {
    async fn synthesize(
        &self,
        question: &str,
        query: &str,
        result_json: &str,
    ) -> Result<String> {
        let prompt = Self::build_prompt(question, query, result_json);
        self.client.generate(&prompt).await
    }
}

/// Mock synthesizer for development & testing: echoes the payload it was
/// handed so tests can assert on the synthesis input.
pub struct MockSynthesizer;

#[async_trait]
impl AnswerSynthesizer for MockSynthesizer {
    async fn synthesize(
        &self,
        _question: &str,
        query: &str,
        result_json: &str,
    ) -> Result<String> {
        Ok(format!("query={} result={}", query, result_json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_question_query_and_result() {
        let prompt = GeminiAnswerSynthesizer::build_prompt(
            "How many suppliers?",
            "SELECT count(*) FROM persons;",
            r#"[{"count":3}]"#,
        );

        assert!(prompt.contains("How many suppliers?"));
        assert!(prompt.contains("SELECT count(*) FROM persons;"));
        assert!(prompt.contains(r#"[{"count":3}]"#));
        assert!(prompt.contains("NO_QUERY"));
    }
}
