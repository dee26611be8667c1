//! Core data models for the intake pipeline and the query subsystem

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Enums =================
//

/// Kind of a person row in the ledger store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PersonKind {
    Supplier,
    Client,
    Billed,
}

/// Kind of a classification row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryKind {
    Expense,
    Revenue,
}

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryDirection {
    Payable,
    Receivable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchStatus {
    Matched,
    Unmatched,
}

//
// ================= Structured Record =================
//

/// A party named on the document (supplier or billed party).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Party {
    pub name: String,
    #[serde(default)]
    pub trade_name: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
}

/// One scheduled partial payment as extracted from the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallmentSpec {
    pub due_date: NaiveDate,
    pub amount: Decimal,
}

/// Structured fields extracted from a raw document.
///
/// Produced once per document by the extractor capability and immutable
/// afterwards; consumed by the reconciler and the commit coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructuredRecord {
    pub supplier: Party,
    pub billed_party: Party,
    pub document_number: String,
    pub issue_date: NaiveDate,
    pub product_descriptions: Vec<String>,
    pub installments: Vec<InstallmentSpec>,
    pub expense_categories: Vec<String>,
}

impl StructuredRecord {
    /// Sum of installment amounts. This is the total the committed ledger
    /// entry must carry.
    pub fn total_amount(&self) -> Decimal {
        self.installments.iter().map(|i| i.amount).sum()
    }
}

//
// ================= Risk Report =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedFlag {
    #[serde(rename = "type")]
    pub flag_type: String,
    pub description: String,
}

/// Advisory risk assessment for an extracted record. Never blocks commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskReport {
    pub score: u8,
    pub summary: String,
    pub red_flags: Vec<RedFlag>,
}

impl RiskReport {
    /// Degraded report used when the scoring capability fails internally:
    /// score 0, summary carrying the failure reason, no flags.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            score: 0,
            summary: reason.into(),
            red_flags: Vec::new(),
        }
    }
}

//
// ================= Reconciliation =================
//

/// Match outcome for one party referenced by a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartyMatch {
    pub status: MatchStatus,
    /// Present iff status is MATCHED.
    pub person_id: Option<i64>,
    /// Original extracted detail, kept so an UNMATCHED party can be created
    /// verbatim at commit time.
    pub detail: Party,
}

impl PartyMatch {
    pub fn matched(person_id: i64, detail: Party) -> Self {
        Self {
            status: MatchStatus::Matched,
            person_id: Some(person_id),
            detail,
        }
    }

    pub fn unmatched(detail: Party) -> Self {
        Self {
            status: MatchStatus::Unmatched,
            person_id: None,
            detail,
        }
    }
}

/// Match outcome for one expense category label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryMatch {
    pub status: MatchStatus,
    pub category_id: Option<i64>,
    pub label: String,
}

impl CategoryMatch {
    pub fn matched(category_id: i64, label: impl Into<String>) -> Self {
        Self {
            status: MatchStatus::Matched,
            category_id: Some(category_id),
            label: label.into(),
        }
    }

    pub fn unmatched(label: impl Into<String>) -> Self {
        Self {
            status: MatchStatus::Unmatched,
            category_id: None,
            label: label.into(),
        }
    }
}

/// Per-entity match status of a record against the ledger store.
///
/// Every entity referenced by the source record appears exactly once:
/// the supplier, the billed party, and each category label in record order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconciliationResult {
    pub supplier: PartyMatch,
    pub billed_party: PartyMatch,
    pub categories: Vec<CategoryMatch>,
}

//
// ================= Task State =================
//

/// Full output of a successful intake pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineOutput {
    pub record: StructuredRecord,
    pub risk: RiskReport,
    pub reconciliation: ReconciliationResult,
}

/// Pollable state of a submitted intake task.
///
/// Transitions are monotonic: PENDING → PROGRESS(*) → SUCCESS | FAILURE.
/// Terminal states are final; polling after completion always returns the
/// same state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "UPPERCASE")]
pub enum TaskState {
    Pending,
    Progress { message: String },
    Success { output: PipelineOutput },
    Failure { kind: String, message: String },
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Success { .. } | TaskState::Failure { .. })
    }
}

//
// ================= Commit Receipt =================
//

/// Result of a confirmed commit: the new ledger entry id plus a
/// human-readable list of every entity the commit had to create.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitReceipt {
    pub entry_id: i64,
    pub created_items: Vec<String>,
}

impl fmt::Display for PersonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PersonKind::Supplier => "SUPPLIER",
            PersonKind::Client => "CLIENT",
            PersonKind::Billed => "BILLED",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CategoryKind::Expense => "EXPENSE",
            CategoryKind::Revenue => "REVENUE",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryDirection::Payable => "PAYABLE",
            EntryDirection::Receivable => "RECEIVABLE",
        };
        write!(f, "{}", s)
    }
}
