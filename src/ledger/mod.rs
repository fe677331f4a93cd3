//! Ledger module containing account management, journal posting and the
//! standard postings for business documents

pub mod account;
pub mod core;
pub mod journal;
pub mod outcome;
pub mod postings;

pub use account::*;
pub use core::*;
pub use journal::*;
pub use outcome::*;
pub use postings::PostingAccounts;
