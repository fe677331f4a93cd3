//! Two-phase outcome of a business event and its accounting

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::{JournalEntry, SourceDocumentType};

/// A business action succeeded but its journal entry could not be posted
///
/// Carries what the auto-balance audit needs to find and repair the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationGap {
    pub document_type: SourceDocumentType,
    pub document_id: String,
    pub amount: BigDecimal,
    /// Accounts the posting tried to use, by id, when they were resolved
    pub attempted_accounts: Vec<String>,
    pub reason: String,
}

/// Accounting side of a business event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccountingStatus {
    Posted(JournalEntry),
    Gap(ReconciliationGap),
}

/// Result of an action whose primary effect stands regardless of the books
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountedOutcome<T> {
    pub primary: T,
    pub accounting: AccountingStatus,
}

impl<T> AccountedOutcome<T> {
    pub fn is_balanced(&self) -> bool {
        matches!(self.accounting, AccountingStatus::Posted(_))
    }

    pub fn journal_entry(&self) -> Option<&JournalEntry> {
        match self.accounting {
            AccountingStatus::Posted(ref entry) => Some(entry),
            AccountingStatus::Gap(_) => None,
        }
    }

    pub fn gap(&self) -> Option<&ReconciliationGap> {
        match self.accounting {
            AccountingStatus::Gap(ref gap) => Some(gap),
            AccountingStatus::Posted(_) => None,
        }
    }
}
