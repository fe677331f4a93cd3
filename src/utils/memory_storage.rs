//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::traits::*;
use crate::types::*;

type SourceKey = (SourceDocumentType, String);

#[derive(Debug, Default)]
struct JournalState {
    entries: HashMap<String, JournalEntry>,
    lines: HashMap<String, Vec<JournalLine>>,
    /// Unique `(source_document_type, source_reference)` -> entry id
    source_index: HashMap<SourceKey, String>,
    sequence: u64,
}

/// In-memory storage implementation for testing and development
///
/// Locks are always taken journal first, accounts second. A commit holds
/// both write locks for its whole duration, which makes the entry insert and
/// the balance increments a single atomic step.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    journal: Arc<RwLock<JournalState>>,
}

fn poisoned<T>(_: PoisonError<T>) -> LedgerError {
    LedgerError::Storage("memory storage lock poisoned".to_string())
}

fn source_key(entry: &JournalEntry) -> SourceKey {
    (entry.source_document_type, entry.source_reference.clone())
}

/// Every line must reference an existing account; inactive ones are refused
/// unless `allow_inactive` is set
fn check_lines(
    accounts: &HashMap<String, Account>,
    lines: &[JournalLine],
    allow_inactive: bool,
) -> LedgerResult<()> {
    for line in lines {
        let account = accounts
            .get(&line.account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(line.account_id.clone()))?;
        if !account.is_active && !allow_inactive {
            return Err(LedgerError::InactiveAccount(account.code.clone()));
        }
    }
    Ok(())
}

fn apply_lines(accounts: &mut HashMap<String, Account>, lines: &[JournalLine]) {
    for line in lines {
        if let Some(account) = accounts.get_mut(&line.account_id) {
            account.apply_line(line);
        }
    }
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> LedgerResult<()> {
        let mut journal = self.journal.write().map_err(poisoned)?;
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        *journal = JournalState::default();
        accounts.clear();
        Ok(())
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn save_account(&self, account: &Account) -> LedgerResult<()> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        if accounts.contains_key(&account.id) || accounts.values().any(|a| a.code == account.code)
        {
            return Err(LedgerError::DuplicateAccount(account.code.clone()));
        }
        accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .map_err(poisoned)?
            .get(account_id)
            .cloned())
    }

    async fn get_account_by_code(&self, code: &str) -> LedgerResult<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .map_err(poisoned)?
            .values()
            .find(|a| a.code == code)
            .cloned())
    }

    async fn list_accounts(&self, filter: &AccountFilter) -> LedgerResult<Vec<Account>> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        let mut filtered: Vec<Account> = accounts
            .values()
            .filter(|account| filter.matches(account))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(filtered)
    }

    async fn set_account_active(
        &self,
        account_id: &str,
        is_active: bool,
    ) -> LedgerResult<Account> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        let account = accounts
            .get_mut(account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;
        account.is_active = is_active;
        account.updated_at = chrono::Utc::now().naive_utc();
        Ok(account.clone())
    }

    async fn next_journal_sequence(&self) -> LedgerResult<u64> {
        let mut journal = self.journal.write().map_err(poisoned)?;
        journal.sequence += 1;
        Ok(journal.sequence)
    }

    async fn save_draft(&self, entry: &JournalEntry, lines: &[JournalLine]) -> LedgerResult<()> {
        let mut journal = self.journal.write().map_err(poisoned)?;
        if let Some(existing) = journal.entries.get(&entry.id) {
            if existing.status != JournalStatus::Draft {
                return Err(LedgerError::InvalidState(format!(
                    "Journal entry {} is already posted",
                    existing.journal_number
                )));
            }
        }
        journal.entries.insert(entry.id.clone(), entry.clone());
        journal.lines.insert(entry.id.clone(), lines.to_vec());
        Ok(())
    }

    async fn delete_draft(&self, entry_id: &str) -> LedgerResult<()> {
        let mut journal = self.journal.write().map_err(poisoned)?;
        match journal.entries.get(entry_id) {
            None => return Err(LedgerError::JournalEntryNotFound(entry_id.to_string())),
            Some(entry) if entry.status != JournalStatus::Draft => {
                return Err(LedgerError::InvalidState(format!(
                    "Posted journal entry {} cannot be deleted",
                    entry.journal_number
                )));
            }
            Some(_) => {}
        }
        journal.entries.remove(entry_id);
        journal.lines.remove(entry_id);
        Ok(())
    }

    async fn commit_journal_entry(
        &self,
        entry: &JournalEntry,
        lines: &[JournalLine],
    ) -> LedgerResult<()> {
        let mut journal = self.journal.write().map_err(poisoned)?;
        let mut accounts = self.accounts.write().map_err(poisoned)?;

        if let Some(existing) = journal.entries.get(&entry.id) {
            if existing.status != JournalStatus::Draft {
                return Err(LedgerError::InvalidState(format!(
                    "Journal entry {} is already posted",
                    existing.journal_number
                )));
            }
        }

        let key = source_key(entry);
        if entry.source_document_type.is_indexed() && journal.source_index.contains_key(&key) {
            return Err(LedgerError::DuplicatePosting {
                source_type: entry.source_document_type,
                reference: entry.source_reference.clone(),
            });
        }

        check_lines(&accounts, lines, false)?;
        apply_lines(&mut accounts, lines);

        if entry.source_document_type.is_indexed() {
            journal.source_index.insert(key, entry.id.clone());
        }
        journal.entries.insert(entry.id.clone(), entry.clone());
        journal.lines.insert(entry.id.clone(), lines.to_vec());
        Ok(())
    }

    async fn commit_reversal(
        &self,
        original_id: &str,
        reversal: &JournalEntry,
        lines: &[JournalLine],
    ) -> LedgerResult<()> {
        let mut journal = self.journal.write().map_err(poisoned)?;
        let mut accounts = self.accounts.write().map_err(poisoned)?;

        let original = journal
            .entries
            .get(original_id)
            .cloned()
            .ok_or_else(|| LedgerError::JournalEntryNotFound(original_id.to_string()))?;
        if original.status != JournalStatus::Posted {
            return Err(LedgerError::InvalidState(format!(
                "Only posted entries can be reversed; {} is {:?}",
                original.journal_number, original.status
            )));
        }
        if original.entry_type == JournalEntryKind::Reversal {
            return Err(LedgerError::InvalidState(format!(
                "{} is itself a reversal",
                original.journal_number
            )));
        }

        let reversal_key = source_key(reversal);
        if journal.source_index.contains_key(&reversal_key) {
            return Err(LedgerError::DuplicatePosting {
                source_type: reversal.source_document_type,
                reference: reversal.source_reference.clone(),
            });
        }

        // Corrections must stay possible after an account is retired
        check_lines(&accounts, lines, true)?;
        apply_lines(&mut accounts, lines);

        let original_key = source_key(&original);
        if journal.source_index.get(&original_key) == Some(&original.id) {
            journal.source_index.remove(&original_key);
        }
        if let Some(stored) = journal.entries.get_mut(original_id) {
            stored.status = JournalStatus::Reversed;
            stored.reversed_by = Some(reversal.id.clone());
        }

        journal
            .source_index
            .insert(reversal_key, reversal.id.clone());
        journal.entries.insert(reversal.id.clone(), reversal.clone());
        journal.lines.insert(reversal.id.clone(), lines.to_vec());
        Ok(())
    }

    async fn get_journal_entry(&self, entry_id: &str) -> LedgerResult<Option<JournalEntry>> {
        Ok(self
            .journal
            .read()
            .map_err(poisoned)?
            .entries
            .get(entry_id)
            .cloned())
    }

    async fn get_journal_lines(&self, entry_id: &str) -> LedgerResult<Vec<JournalLine>> {
        let journal = self.journal.read().map_err(poisoned)?;
        let mut lines = journal.lines.get(entry_id).cloned().unwrap_or_default();
        lines.sort_by_key(|l| l.line_number);
        Ok(lines)
    }

    async fn find_entry_by_source(
        &self,
        source_type: SourceDocumentType,
        reference: &str,
    ) -> LedgerResult<Option<JournalEntry>> {
        let journal = self.journal.read().map_err(poisoned)?;
        Ok(journal
            .source_index
            .get(&(source_type, reference.to_string()))
            .and_then(|id| journal.entries.get(id))
            .cloned())
    }

    async fn list_journal_entries(
        &self,
        filter: &JournalFilter,
    ) -> LedgerResult<Vec<JournalEntry>> {
        let journal = self.journal.read().map_err(poisoned)?;
        let mut entries: Vec<JournalEntry> = journal
            .entries
            .values()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            a.entry_date
                .cmp(&b.entry_date)
                .then_with(|| a.journal_number.cmp(&b.journal_number))
        });
        Ok(entries)
    }

    async fn list_balance_lines(
        &self,
        account_id: Option<&str>,
    ) -> LedgerResult<Vec<JournalLine>> {
        let journal = self.journal.read().map_err(poisoned)?;
        let lines = journal
            .entries
            .values()
            .filter(|entry| entry.status.affects_balances())
            .filter_map(|entry| journal.lines.get(&entry.id))
            .flatten()
            .filter(|line| account_id.is_none_or(|id| line.account_id == id))
            .cloned()
            .collect();
        Ok(lines)
    }
}
