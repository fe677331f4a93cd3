//! # Ledger Core
//!
//! Double-entry ledger and reconciliation engine for a furniture business.
//!
//! ## Features
//!
//! - **Double-entry bookkeeping**: balanced journal entries posted atomically with their balance increments
//! - **Account management**: chart of accounts with lazily created partner equity accounts
//! - **Document postings**: standard entries for investments, purchases, payments, refunds, loans and expenses
//! - **Reconciliation**: outstanding balances recomputed from payment trails, auto-balance audit of missing entries
//! - **Reporting**: receivable/payable aging, cash day sheet and cash-flow trend
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use bigdecimal::BigDecimal;
//! use ledger_core::{Investment, Ledger, LedgerResult, MemoryStorage, PaymentMethod, SourceDocument};
//!
//! async fn record_investment(ledger: &Ledger<MemoryStorage>) -> LedgerResult<()> {
//!     ledger.setup_standard_chart_of_accounts().await?;
//!     let investment = SourceDocument::Investment(Investment {
//!         id: "INV-1".to_string(),
//!         partner_id: "P1".to_string(),
//!         partner_name: "Nadia".to_string(),
//!         amount: BigDecimal::from(50000),
//!         method: PaymentMethod::Cash,
//!         invested_at: "2024-04-02T10:00:00".to_string(),
//!     });
//!     let outcome = ledger.record_business_event((), &investment).await;
//!     assert!(outcome.is_balanced());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod documents;
pub mod ledger;
pub mod reconciliation;
pub mod reports;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use documents::*;
pub use ledger::*;
pub use reconciliation::*;
pub use reports::*;
pub use traits::*;
pub use types::*;
pub use utils::{MemoryDocuments, MemoryStorage};
