//! Reconciliation of documents against their payment trails and the journal

pub mod auditor;
pub mod outstanding;

pub use auditor::*;
pub use outstanding::*;
