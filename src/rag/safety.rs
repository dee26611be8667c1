//! Query safety gate
//!
//! Deterministic filter between the translator and the executor. This is a
//! textual substring check, not a parser: a mutating keyword anywhere in
//! the query text rejects it, even inside a string literal or identifier.
//! Over-rejection is the accepted tradeoff; the gate must never let a
//! mutating statement through.

/// Keywords whose presence anywhere in the text rejects the query.
pub const MUTATING_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "create", "alter", "truncate",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Accept,
    Reject(String),
}

/// Check a generated query against the read-only policy.
pub fn check(query: &str) -> GateDecision {
    let lowered = query.to_lowercase();

    for keyword in MUTATING_KEYWORDS {
        if lowered.contains(keyword) {
            return GateDecision::Reject(format!(
                "query contains the mutating keyword '{}'",
                keyword
            ));
        }
    }

    GateDecision::Accept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_select_accepted() {
        assert_eq!(check("SELECT 1"), GateDecision::Accept);
        assert_eq!(
            check("SELECT legal_name FROM persons WHERE UPPER(kind) = 'SUPPLIER'"),
            GateDecision::Accept
        );
    }

    #[test]
    fn test_multi_statement_mutation_rejected() {
        assert!(matches!(
            check("select * from x; drop table x"),
            GateDecision::Reject(_)
        ));
    }

    #[test]
    fn test_rejection_is_case_insensitive() {
        for query in [
            "INSERT INTO persons VALUES (1)",
            "UpDaTe persons SET status = 'INACTIVE'",
            "DELETE FROM ledger_entries",
            "DROP TABLE installments",
            "CREATE TABLE x (id int)",
            "ALTER TABLE persons ADD COLUMN x int",
            "TRUNCATE installments",
        ] {
            assert!(matches!(check(query), GateDecision::Reject(_)), "{}", query);
        }
    }

    #[test]
    fn test_keyword_inside_literal_also_rejected() {
        // Documented false positive: substring match, no SQL parsing.
        assert!(matches!(
            check("SELECT * FROM persons WHERE legal_name = 'Update Industries'"),
            GateDecision::Reject(_)
        ));
    }

    #[test]
    fn test_rejection_names_the_keyword() {
        let GateDecision::Reject(reason) = check("select 1; truncate persons") else {
            panic!("expected rejection");
        };
        assert!(reason.contains("truncate"));
    }
}
