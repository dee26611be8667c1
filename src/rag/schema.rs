//! Curated store schema exposed to the query translator
//!
//! Manually maintained rather than introspected: the translator only ever
//! sees the tables and columns listed here, never unrelated ones.

pub const SCHEMA_DESCRIPTION: &str = r#"
Table "persons":
  - id (int): unique person id
  - kind (string): kind of person (SUPPLIER, CLIENT, BILLED)
  - legal_name (string): legal name or full name
  - trade_name (string): trade name, may be null
  - tax_id (string): company or personal tax id
  - status (string): ACTIVE or INACTIVE

Table "categories":
  - id (int): unique classification id
  - kind (string): kind of classification (EXPENSE, REVENUE)
  - label (string): classification label (e.g. FARM INPUTS)
  - status (string): ACTIVE or INACTIVE

Table "ledger_entries":
  - id (int): unique entry id
  - direction (string): entry direction (PAYABLE, RECEIVABLE)
  - document_number (string): fiscal document number
  - issue_date (date): issue date
  - total_amount (decimal): total amount of the entry
  - status (string): PENDING, PAID, CANCELLED
  - supplier_id (int): foreign key into "persons" (the supplier or client)
  - billed_party_id (int): foreign key into "persons" (who was billed)

Table "installments":
  - id (int): unique installment id
  - entry_id (int): foreign key into "ledger_entries"
  - label (string): installment label (e.g. 1/3)
  - due_date (date): due date
  - amount (decimal): installment amount
  - paid_amount (decimal): amount already paid
  - remaining_balance (decimal): remaining balance
  - status (string): PENDING, PAID

Table "entry_categories":
  - entry_id (int): foreign key into "ledger_entries"
  - category_id (int): foreign key into "categories"
"#;
