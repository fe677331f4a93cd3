//! Main ledger orchestrator that coordinates accounts and journal entries

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::LedgerConfig;
use crate::documents::SourceDocument;
use crate::ledger::outcome::*;
use crate::ledger::postings::{self, PostingAccounts};
use crate::ledger::{AccountManager, JournalEngine};
use crate::traits::*;
use crate::types::*;

/// Main ledger system that orchestrates all accounting operations
pub struct Ledger<S: LedgerStorage> {
    config: LedgerConfig,
    account_manager: AccountManager<S>,
    journal_engine: JournalEngine<S>,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a new ledger with the default configuration
    pub fn new(storage: S) -> Self {
        let config = LedgerConfig::default();
        Self {
            account_manager: AccountManager::new(storage.clone()),
            journal_engine: JournalEngine::new(storage, &config),
            config,
        }
    }

    /// Create a new ledger with a validated configuration
    pub fn with_config(storage: S, config: LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self {
            account_manager: AccountManager::new(storage.clone()),
            journal_engine: JournalEngine::new(storage, &config),
            config,
        })
    }

    /// Create a new ledger with custom validators
    pub fn with_validators(
        storage: S,
        config: LedgerConfig,
        account_validator: Box<dyn AccountValidator>,
        journal_validator: Box<dyn JournalValidator>,
    ) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self {
            account_manager: AccountManager::with_validator(storage.clone(), account_validator),
            journal_engine: JournalEngine::with_validator(storage, &config, journal_validator),
            config,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // Account operations
    /// Create a new account
    pub async fn create_account(
        &self,
        code: String,
        name: String,
        account_type: AccountType,
        parent_id: Option<String>,
        opening_balance: BigDecimal,
    ) -> LedgerResult<Account> {
        self.account_manager
            .create_account(code, name, account_type, parent_id, opening_balance)
            .await
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        self.account_manager.get_account(account_id).await
    }

    /// Get an account by code
    pub async fn get_account_by_code(&self, code: &str) -> LedgerResult<Account> {
        self.account_manager.get_account_by_code(code).await
    }

    /// List accounts matching a filter
    pub async fn list_accounts(&self, filter: &AccountFilter) -> LedgerResult<Vec<Account>> {
        self.account_manager.list_accounts(filter).await
    }

    pub async fn deactivate_account(&self, account_id: &str) -> LedgerResult<Account> {
        self.account_manager.deactivate_account(account_id).await
    }

    pub async fn reactivate_account(&self, account_id: &str) -> LedgerResult<Account> {
        self.account_manager.reactivate_account(account_id).await
    }

    /// Running balance of an account
    pub async fn get_account_balance(&self, account_id: &str) -> LedgerResult<BigDecimal> {
        self.account_manager.get_balance(account_id).await
    }

    /// Equity account of a partner, created on first use
    pub async fn ensure_partner_equity_account(
        &self,
        partner_id: &str,
        partner_name: &str,
    ) -> LedgerResult<Account> {
        self.account_manager
            .ensure_partner_equity_account(&self.config.accounts, partner_id, partner_name)
            .await
    }

    /// Setup the standard chart of accounts from the configured codes
    pub async fn setup_standard_chart_of_accounts(&self) -> LedgerResult<HashMap<String, Account>> {
        crate::ledger::account::utils::create_standard_chart(
            &self.account_manager,
            &self.config.accounts,
        )
        .await
    }

    // Journal operations
    /// Validate and post a balanced journal entry
    pub async fn post_journal_entry(&self, request: PostingRequest) -> LedgerResult<JournalEntry> {
        self.journal_engine.post_journal_entry(request).await
    }

    /// Offset a posted entry with a reversing entry
    pub async fn reverse_journal_entry(
        &self,
        entry_id: &str,
        reversal_date: NaiveDate,
        reason: &str,
    ) -> LedgerResult<JournalEntry> {
        self.journal_engine
            .reverse_journal_entry(entry_id, reversal_date, reason)
            .await
    }

    pub async fn save_draft(&self, request: PostingRequest) -> LedgerResult<JournalEntry> {
        self.journal_engine.save_draft(request).await
    }

    pub async fn post_draft(&self, entry_id: &str) -> LedgerResult<JournalEntry> {
        self.journal_engine.post_draft(entry_id).await
    }

    pub async fn delete_draft(&self, entry_id: &str) -> LedgerResult<()> {
        self.journal_engine.delete_draft(entry_id).await
    }

    pub async fn get_journal_entry(&self, entry_id: &str) -> LedgerResult<Option<JournalEntry>> {
        self.journal_engine.get_journal_entry(entry_id).await
    }

    pub async fn get_journal_lines(&self, entry_id: &str) -> LedgerResult<Vec<JournalLine>> {
        self.journal_engine.get_journal_lines(entry_id).await
    }

    pub async fn list_journal_entries(
        &self,
        filter: &JournalFilter,
    ) -> LedgerResult<Vec<JournalEntry>> {
        self.journal_engine.list_journal_entries(filter).await
    }

    pub async fn find_entry_by_source(
        &self,
        source_type: SourceDocumentType,
        reference: &str,
    ) -> LedgerResult<Option<JournalEntry>> {
        self.journal_engine
            .find_entry_by_source(source_type, reference)
            .await
    }

    // Document postings
    /// Resolve the configured control accounts (and partner equity) for a document
    pub async fn resolve_posting_accounts(
        &self,
        document: &SourceDocument,
    ) -> LedgerResult<PostingAccounts> {
        let codes = &self.config.accounts;

        let partner_equity = match document {
            SourceDocument::Investment(d) => Some(
                self.ensure_partner_equity_account(&d.partner_id, &d.partner_name)
                    .await?
                    .id,
            ),
            SourceDocument::Withdrawal(d) => Some(
                self.ensure_partner_equity_account(&d.partner_id, &d.partner_name)
                    .await?
                    .id,
            ),
            _ => None,
        };

        Ok(PostingAccounts {
            cash: self.account_id(&codes.cash).await?,
            bank: self.account_id(&codes.bank).await?,
            accounts_receivable: self.account_id(&codes.accounts_receivable).await?,
            inventory: self.account_id(&codes.inventory).await?,
            fixed_assets: self.account_id(&codes.fixed_assets).await?,
            accounts_payable: self.account_id(&codes.accounts_payable).await?,
            store_credit: self.account_id(&codes.store_credit).await?,
            loans_payable: self.account_id(&codes.loans_payable).await?,
            refund_expense: self.account_id(&codes.refund_expense).await?,
            operating_expense: self.account_id(&codes.operating_expense).await?,
            interest_expense: self.account_id(&codes.interest_expense).await?,
            partner_equity,
        })
    }

    async fn account_id(&self, code: &str) -> LedgerResult<String> {
        Ok(self.account_manager.get_account_by_code(code).await?.id)
    }

    /// Standard posting for a document, not yet posted
    pub async fn derive_posting(&self, document: &SourceDocument) -> LedgerResult<PostingRequest> {
        let accounts = self.resolve_posting_accounts(document).await?;
        postings::derive(document, &accounts)
    }

    /// Derive and post the standard entry for a document
    pub async fn post_document(&self, document: &SourceDocument) -> LedgerResult<JournalEntry> {
        let request = self.derive_posting(document).await?;
        self.post_journal_entry(request).await
    }

    /// Account for a business action that has already happened
    ///
    /// The primary result is returned whatever happens to the posting; a
    /// failed posting comes back as a [`ReconciliationGap`] and is logged
    /// for the auto-balance audit.
    pub async fn record_business_event<T>(
        &self,
        primary: T,
        document: &SourceDocument,
    ) -> AccountedOutcome<T> {
        let mut attempted_accounts = Vec::new();
        let result = match self.derive_posting(document).await {
            Ok(request) => {
                attempted_accounts = request
                    .lines
                    .iter()
                    .map(|line| line.account_id.clone())
                    .collect();
                self.post_journal_entry(request).await
            }
            Err(e) => Err(e),
        };

        let accounting = match result {
            Ok(entry) => AccountingStatus::Posted(entry),
            Err(e) => {
                let gap = ReconciliationGap {
                    document_type: document.source_type(),
                    document_id: document.source_id().to_string(),
                    amount: document.amount(),
                    attempted_accounts,
                    reason: e.to_string(),
                };
                log::warn!(
                    "reconciliation gap: {} '{}' amount {} accounts {:?}: {}",
                    gap.document_type,
                    gap.document_id,
                    gap.amount,
                    gap.attempted_accounts,
                    gap.reason
                );
                AccountingStatus::Gap(gap)
            }
        };

        AccountedOutcome {
            primary,
            accounting,
        }
    }

    // Balance and integrity
    /// Trial balance over the current running balances
    pub async fn trial_balance(&self) -> LedgerResult<TrialBalance> {
        let accounts = self.list_accounts(&AccountFilter::default()).await?;
        let mut balances = HashMap::new();
        let mut total_debits = BigDecimal::from(0);
        let mut total_credits = BigDecimal::from(0);

        for account in accounts {
            let row = AccountBalance::from_account(account);
            if let Some(ref debit) = row.debit_balance {
                total_debits += debit;
            }
            if let Some(ref credit) = row.credit_balance {
                total_credits += credit;
            }
            balances.insert(row.account.code.clone(), row);
        }

        let is_balanced = total_debits == total_credits;

        Ok(TrialBalance {
            generated_at: chrono::Utc::now().naive_utc(),
            balances,
            total_debits,
            total_credits,
            is_balanced,
        })
    }

    /// Recompute every balance from the journal and check every entry
    pub async fn validate_integrity(&self) -> LedgerResult<LedgerIntegrityReport> {
        let storage = &self.account_manager.storage;
        let accounts = storage.list_accounts(&AccountFilter::default()).await?;
        let lines = storage.list_balance_lines(None).await?;

        let mut lines_by_account: HashMap<&str, Vec<&JournalLine>> = HashMap::new();
        for line in &lines {
            lines_by_account
                .entry(line.account_id.as_str())
                .or_default()
                .push(line);
        }

        let mut issues = Vec::new();
        let mut balance_mismatches = Vec::new();

        for account in &accounts {
            let mut expected = account.opening_balance.clone();
            for line in lines_by_account.get(account.id.as_str()).into_iter().flatten() {
                expected += account.line_delta(line);
            }
            if expected != account.current_balance {
                issues.push(format!(
                    "Account {} balance {} does not match its journal ({})",
                    account.code, account.current_balance, expected
                ));
                balance_mismatches.push(BalanceMismatch {
                    account_id: account.id.clone(),
                    code: account.code.clone(),
                    expected,
                    actual: account.current_balance.clone(),
                });
            }
        }

        let entries = storage.list_journal_entries(&JournalFilter::default()).await?;
        let mut entries_checked = 0;
        for entry in entries.iter().filter(|e| e.status.affects_balances()) {
            entries_checked += 1;
            let entry_lines = storage.get_journal_lines(&entry.id).await?;
            let debits: BigDecimal = entry_lines.iter().map(|l| &l.debit_amount).sum();
            let credits: BigDecimal = entry_lines.iter().map(|l| &l.credit_amount).sum();
            if debits != credits || debits != entry.total_debit || credits != entry.total_credit {
                issues.push(format!(
                    "Journal entry {} is not balanced: lines {} / {}, header {} / {}",
                    entry.journal_number, debits, credits, entry.total_debit, entry.total_credit
                ));
            }
        }

        let trial_balance = self.trial_balance().await?;
        if !trial_balance.is_balanced {
            issues.push(format!(
                "Trial balance is not balanced: debits = {}, credits = {}",
                trial_balance.total_debits, trial_balance.total_credits
            ));
        }

        Ok(LedgerIntegrityReport {
            checked_at: chrono::Utc::now().naive_utc(),
            is_valid: issues.is_empty(),
            issues,
            accounts_checked: accounts.len(),
            entries_checked,
            balance_mismatches,
            trial_balance_total_debits: trial_balance.total_debits,
            trial_balance_total_credits: trial_balance.total_credits,
        })
    }
}

/// An account whose running balance disagrees with its journal lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceMismatch {
    pub account_id: String,
    pub code: String,
    pub expected: BigDecimal,
    pub actual: BigDecimal,
}

/// Report on ledger integrity and validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerIntegrityReport {
    pub checked_at: NaiveDateTime,
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub accounts_checked: usize,
    pub entries_checked: usize,
    pub balance_mismatches: Vec<BalanceMismatch>,
    pub trial_balance_total_debits: BigDecimal,
    pub trial_balance_total_credits: BigDecimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::*;
    use crate::utils::memory_storage::MemoryStorage;

    fn investment(id: &str, amount: i64) -> SourceDocument {
        SourceDocument::Investment(Investment {
            id: id.to_string(),
            partner_id: "P1".to_string(),
            partner_name: "Nadia".to_string(),
            amount: BigDecimal::from(amount),
            method: PaymentMethod::Cash,
            invested_at: "2024-01-01T09:00:00".to_string(),
        })
    }

    #[tokio::test]
    async fn test_ledger_basic_operations() {
        let ledger = Ledger::new(MemoryStorage::new());
        let accounts = ledger.setup_standard_chart_of_accounts().await.unwrap();

        let entry = ledger.post_document(&investment("INV-1", 1000)).await.unwrap();
        assert_eq!(entry.source_document_type, SourceDocumentType::PartnerInvestment);

        let cash_balance = ledger
            .get_account_balance(&accounts["cash"].id)
            .await
            .unwrap();
        assert_eq!(cash_balance, BigDecimal::from(1000));

        let partner = ledger.get_account_by_code("3015-P1").await.unwrap();
        assert_eq!(partner.current_balance, BigDecimal::from(1000));

        let trial_balance = ledger.trial_balance().await.unwrap();
        assert!(trial_balance.is_balanced);

        let report = ledger.validate_integrity().await.unwrap();
        assert!(report.is_valid, "{:?}", report.issues);
        assert_eq!(report.entries_checked, 1);
    }

    #[tokio::test]
    async fn test_missing_chart_becomes_gap() {
        let ledger = Ledger::new(MemoryStorage::new());
        let outcome = ledger
            .record_business_event("payment saved", &investment("INV-2", 300))
            .await;

        assert_eq!(outcome.primary, "payment saved");
        assert!(!outcome.is_balanced());
        let gap = outcome.gap().unwrap();
        assert_eq!(gap.document_id, "INV-2");
        assert_eq!(gap.amount, BigDecimal::from(300));
        assert!(gap.reason.contains("Account not found"));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = LedgerConfig::default();
        config.journal_number_prefix = String::new();
        assert!(Ledger::with_config(MemoryStorage::new(), config).is_err());
    }
}
