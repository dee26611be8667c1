//! Invoice Intake Orchestrator
//!
//! Turns unstructured fiscal documents and natural-language questions into
//! validated ledger records and safe query answers:
//! - Intake: extract structured fields → score risk → reconcile against
//!   known entities → (after human confirmation) atomic commit
//! - Query: retrieve similar examples → translate → safety gate →
//!   read-only execution → synthesized answer
//!
//! Both paths share one pattern:
//! UNTRUSTED GENERATIVE STEP → DETERMINISTIC GATE → EXECUTE → PACKAGE

pub mod api;
pub mod commit;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod models;
pub mod rag;
pub mod reconcile;
pub mod risk;
pub mod store;
pub mod tasks;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use tasks::IntakeOrchestrator;
