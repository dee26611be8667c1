//! Read-only query execution and result shaping
//!
//! Runs a gated query against the store and bounds the result to the first
//! 50 rows. Truncation is silent toward the caller but flagged to the
//! answer synthesizer.

use crate::store::LedgerStore;
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Hard bound on rows handed to the synthesizer. A resource bound, not a
/// correctness limit.
pub const MAX_ROWS: usize = 50;

/// Shaped tabular result: column order matches the query's column order,
/// values are portable JSON forms.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// True when the raw result had more than [`MAX_ROWS`] rows.
    pub truncated: bool,
}

impl ResultSet {
    /// Render as JSON for the synthesizer prompt, preserving column order
    /// and carrying the truncation note when rows were dropped.
    pub fn render_json(&self) -> String {
        let mut rows_json = String::from("[");
        for (row_index, row) in self.rows.iter().enumerate() {
            if row_index > 0 {
                rows_json.push(',');
            }
            rows_json.push('{');
            for (column_index, column) in self.columns.iter().enumerate() {
                if column_index > 0 {
                    rows_json.push(',');
                }
                rows_json.push_str(&serde_json::to_string(column).unwrap_or_default());
                rows_json.push(':');
                let value = row.get(column_index).unwrap_or(&Value::Null);
                rows_json.push_str(
                    &serde_json::to_string(value).unwrap_or_else(|_| "null".to_string()),
                );
            }
            rows_json.push('}');
        }
        rows_json.push(']');

        if self.truncated {
            format!(
                r#"{{"rows":{},"note":"results may be truncated; only the first {} rows are shown"}}"#,
                rows_json, MAX_ROWS
            )
        } else {
            rows_json
        }
    }
}

pub struct QueryExecutor {
    store: Arc<dyn LedgerStore>,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Execute a gated query and shape the result.
    pub async fn execute(&self, query: &str) -> Result<ResultSet> {
        let raw = self.store.select_rows(query).await?;

        let truncated = raw.rows.len() > MAX_ROWS;
        let rows: Vec<Vec<Value>> = raw.rows.into_iter().take(MAX_ROWS).collect();

        debug!(
            columns = raw.columns.len(),
            rows = rows.len(),
            truncated,
            "Query executed"
        );

        Ok(ResultSet {
            columns: raw.columns,
            rows,
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryKind;
    use crate::store::{RawResultSet, StoreTransaction};
    use async_trait::async_trait;
    use serde_json::json;

    /// Store stub producing a fixed tabular result.
    struct StubStore {
        result: RawResultSet,
    }

    #[async_trait]
    impl LedgerStore for StubStore {
        async fn find_person_by_tax_id(&self, _tax_id: &str) -> Result<Option<i64>> {
            Ok(None)
        }

        async fn find_category_by_label(
            &self,
            _kind: CategoryKind,
            _label: &str,
        ) -> Result<Option<i64>> {
            Ok(None)
        }

        async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
            unimplemented!("stub store is read-only")
        }

        async fn select_rows(&self, _query: &str) -> Result<RawResultSet> {
            Ok(self.result.clone())
        }
    }

    fn executor_with_rows(row_count: usize) -> QueryExecutor {
        let rows = (0..row_count)
            .map(|i| vec![json!(i as i64), json!(format!("NF-{}", i))])
            .collect();
        QueryExecutor::new(Arc::new(StubStore {
            result: RawResultSet {
                columns: vec!["id".to_string(), "document_number".to_string()],
                rows,
            },
        }))
    }

    #[tokio::test]
    async fn test_truncates_to_first_50_rows() {
        let executor = executor_with_rows(120);
        let result = executor.execute("SELECT id, document_number FROM ledger_entries").await.unwrap();

        assert_eq!(result.rows.len(), MAX_ROWS);
        assert!(result.truncated);
        // Original column order and the first rows are preserved.
        assert_eq!(result.columns, vec!["id", "document_number"]);
        assert_eq!(result.rows[0][0], json!(0));
        assert_eq!(result.rows[49][1], json!("NF-49"));
    }

    #[tokio::test]
    async fn test_small_results_pass_through() {
        let executor = executor_with_rows(3);
        let result = executor.execute("SELECT 1").await.unwrap();

        assert_eq!(result.rows.len(), 3);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_empty_result() {
        let executor = executor_with_rows(0);
        let result = executor.execute("SELECT 1").await.unwrap();

        assert!(result.rows.is_empty());
        assert!(!result.truncated);
        assert_eq!(result.render_json(), "[]");
    }

    #[test]
    fn test_render_preserves_column_order() {
        let result = ResultSet {
            columns: vec!["z_last".to_string(), "a_first".to_string()],
            rows: vec![vec![json!(1), json!("x")]],
            truncated: false,
        };

        let rendered = result.render_json();
        assert_eq!(rendered, r#"[{"z_last":1,"a_first":"x"}]"#);
    }

    #[test]
    fn test_render_flags_truncation() {
        let result = ResultSet {
            columns: vec!["id".to_string()],
            rows: vec![vec![json!(1)]],
            truncated: true,
        };

        let rendered = result.render_json();
        assert!(rendered.contains("results may be truncated"));
        assert!(rendered.contains(r#""rows":[{"id":1}]"#));
    }
}
