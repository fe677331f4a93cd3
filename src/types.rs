//! Core types and data structures for the ledger

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Account types following standard accounting principles
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Assets - what the business owns (Cash, Bank, Inventory, Receivables)
    Asset,
    /// Liabilities - what the business owes (Payables, Loans, Store Credit)
    Liability,
    /// Equity - partners' interest in the business
    Equity,
    /// Revenue - money earned from sales
    Revenue,
    /// Expenses - costs incurred by the business
    Expense,
}

impl AccountType {
    /// Returns the normal balance side for this account type
    /// Assets and Expenses normally have debit balances
    /// Liabilities, Equity, and Revenue normally have credit balances
    pub fn normal_balance(&self) -> EntryType {
        match self {
            AccountType::Asset | AccountType::Expense => EntryType::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => {
                EntryType::Credit
            }
        }
    }
}

/// Sides of a double-entry line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// Debit - increases Assets and Expenses, decreases Liabilities, Equity, and Revenue
    Debit,
    /// Credit - increases Liabilities, Equity, and Revenue, decreases Assets and Expenses
    Credit,
}

impl EntryType {
    pub fn opposite(&self) -> EntryType {
        match self {
            EntryType::Debit => EntryType::Credit,
            EntryType::Credit => EntryType::Debit,
        }
    }
}

/// Chart of accounts entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for the account
    pub id: String,
    /// Unique, hierarchical account code (e.g. `1010`, `3015-P7`)
    pub code: String,
    /// Human-readable account name
    pub name: String,
    /// Type of account (Asset, Liability, etc.)
    pub account_type: AccountType,
    /// Side on which this account increases
    pub normal_balance: EntryType,
    /// Optional parent account for hierarchical chart of accounts
    pub parent_id: Option<String>,
    /// Balance carried in when the account was created
    pub opening_balance: BigDecimal,
    /// Opening balance plus every posted line against the account
    pub current_balance: BigDecimal,
    /// Inactive accounts reject new postings
    pub is_active: bool,
    /// Additional metadata
    pub metadata: HashMap<String, String>,
    /// When the account was created
    pub created_at: NaiveDateTime,
    /// When the account was last updated
    pub updated_at: NaiveDateTime,
}

impl Account {
    /// Create a new active account with a zero opening balance
    pub fn new(
        code: String,
        name: String,
        account_type: AccountType,
        parent_id: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            code,
            name,
            normal_balance: account_type.normal_balance(),
            account_type,
            parent_id,
            opening_balance: BigDecimal::from(0),
            current_balance: BigDecimal::from(0),
            is_active: true,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the opening balance; the running balance starts from it
    pub fn with_opening_balance(mut self, opening_balance: BigDecimal) -> Self {
        self.current_balance = opening_balance.clone();
        self.opening_balance = opening_balance;
        self
    }

    /// Amount by which an entry of the given side moves this account's balance
    pub fn signed_amount(&self, entry_type: EntryType, amount: &BigDecimal) -> BigDecimal {
        if entry_type == self.normal_balance {
            amount.clone()
        } else {
            -amount.clone()
        }
    }

    /// Signed effect of a journal line on this account
    pub fn line_delta(&self, line: &JournalLine) -> BigDecimal {
        self.signed_amount(EntryType::Debit, &line.debit_amount)
            + self.signed_amount(EntryType::Credit, &line.credit_amount)
    }

    /// Increment the running balance by a journal line
    pub fn apply_line(&mut self, line: &JournalLine) {
        let delta = self.line_delta(line);
        self.current_balance += delta;
        self.updated_at = chrono::Utc::now().naive_utc();
    }
}

/// Filter for listing accounts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountFilter {
    pub account_type: Option<AccountType>,
    pub active_only: bool,
    pub code_prefix: Option<String>,
}

impl AccountFilter {
    pub fn by_type(account_type: AccountType) -> Self {
        Self {
            account_type: Some(account_type),
            ..Self::default()
        }
    }

    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, account: &Account) -> bool {
        if let Some(ref account_type) = self.account_type {
            if &account.account_type != account_type {
                return false;
            }
        }
        if self.active_only && !account.is_active {
            return false;
        }
        if let Some(ref prefix) = self.code_prefix {
            if !account.code.starts_with(prefix.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Lifecycle of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JournalStatus {
    /// Saved but not applied to balances
    Draft,
    /// Applied to balances, immutable
    Posted,
    /// Posted and later offset by a reversing entry
    Reversed,
}

impl JournalStatus {
    /// Whether the entry's lines count towards account balances
    pub fn affects_balances(&self) -> bool {
        matches!(self, JournalStatus::Posted | JournalStatus::Reversed)
    }
}

/// How a journal entry came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JournalEntryKind {
    /// Entered by hand
    Manual,
    /// Derived from a business document
    Automatic,
    /// Offsets a previously posted entry
    Reversal,
}

/// Business document types that originate journal entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceDocumentType {
    Manual,
    PartnerInvestment,
    PartnerWithdrawal,
    PurchaseOrder,
    SupplierPayment,
    CustomerPayment,
    InvoiceRefund,
    LoanDisbursement,
    LoanRepayment,
    Expense,
    Reversal,
}

impl SourceDocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceDocumentType::Manual => "MANUAL",
            SourceDocumentType::PartnerInvestment => "PARTNER_INVESTMENT",
            SourceDocumentType::PartnerWithdrawal => "PARTNER_WITHDRAWAL",
            SourceDocumentType::PurchaseOrder => "PURCHASE_ORDER",
            SourceDocumentType::SupplierPayment => "SUPPLIER_PAYMENT",
            SourceDocumentType::CustomerPayment => "CUSTOMER_PAYMENT",
            SourceDocumentType::InvoiceRefund => "INVOICE_REFUND",
            SourceDocumentType::LoanDisbursement => "LOAN_DISBURSEMENT",
            SourceDocumentType::LoanRepayment => "LOAN_REPAYMENT",
            SourceDocumentType::Expense => "EXPENSE",
            SourceDocumentType::Reversal => "REVERSAL",
        }
    }

    /// Whether entries of this type participate in the one-document-one-entry index
    pub fn is_indexed(&self) -> bool {
        !matches!(self, SourceDocumentType::Manual)
    }
}

impl fmt::Display for SourceDocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header of a double-entry journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    /// Unique human-readable number, e.g. `JV-20240105-000042`
    pub journal_number: String,
    pub entry_date: NaiveDate,
    pub description: String,
    pub entry_type: JournalEntryKind,
    pub status: JournalStatus,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    pub source_document_type: SourceDocumentType,
    /// Id of the originating document
    pub source_reference: String,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub posted_at: Option<NaiveDateTime>,
    /// Id of the entry that reversed this one
    pub reversed_by: Option<String>,
}

impl JournalEntry {
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit
    }
}

/// A single debit or credit line of a journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    pub journal_entry_id: String,
    /// 1-based position within the entry
    pub line_number: u32,
    pub account_id: String,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    pub description: Option<String>,
    pub reference: Option<String>,
}

impl JournalLine {
    /// Side of the line; a line carries exactly one non-zero column
    pub fn entry_type(&self) -> EntryType {
        if self.debit_amount > BigDecimal::from(0) {
            EntryType::Debit
        } else {
            EntryType::Credit
        }
    }

    /// The non-zero amount of the line
    pub fn amount(&self) -> &BigDecimal {
        match self.entry_type() {
            EntryType::Debit => &self.debit_amount,
            EntryType::Credit => &self.credit_amount,
        }
    }
}

/// One requested line of a posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingLine {
    /// Account being affected
    pub account_id: String,
    /// Side of the line
    pub entry_type: EntryType,
    /// Strictly positive amount
    pub amount: BigDecimal,
    pub description: Option<String>,
    pub reference: Option<String>,
}

impl PostingLine {
    pub fn new(
        account_id: String,
        entry_type: EntryType,
        amount: BigDecimal,
        description: Option<String>,
    ) -> Self {
        Self {
            account_id,
            entry_type,
            amount,
            description,
            reference: None,
        }
    }

    /// Create a debit line
    pub fn debit(account_id: String, amount: BigDecimal, description: Option<String>) -> Self {
        Self::new(account_id, EntryType::Debit, amount, description)
    }

    /// Create a credit line
    pub fn credit(account_id: String, amount: BigDecimal, description: Option<String>) -> Self {
        Self::new(account_id, EntryType::Credit, amount, description)
    }

    /// Materialize the line against a journal entry
    pub fn to_journal_line(&self, journal_entry_id: &str, line_number: u32) -> JournalLine {
        let (debit_amount, credit_amount) = match self.entry_type {
            EntryType::Debit => (self.amount.clone(), BigDecimal::from(0)),
            EntryType::Credit => (BigDecimal::from(0), self.amount.clone()),
        };
        JournalLine {
            journal_entry_id: journal_entry_id.to_string(),
            line_number,
            account_id: self.account_id.clone(),
            debit_amount,
            credit_amount,
            description: self.description.clone(),
            reference: self.reference.clone(),
        }
    }
}

/// Everything needed to post one journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingRequest {
    pub source_type: SourceDocumentType,
    pub source_reference: String,
    pub entry_date: NaiveDate,
    pub description: String,
    pub entry_type: JournalEntryKind,
    pub created_by: Option<String>,
    pub lines: Vec<PostingLine>,
}

impl PostingRequest {
    pub fn new(
        source_type: SourceDocumentType,
        source_reference: String,
        entry_date: NaiveDate,
        description: String,
    ) -> Self {
        let entry_type = match source_type {
            SourceDocumentType::Manual => JournalEntryKind::Manual,
            SourceDocumentType::Reversal => JournalEntryKind::Reversal,
            _ => JournalEntryKind::Automatic,
        };
        Self {
            source_type,
            source_reference,
            entry_date,
            description,
            entry_type,
            created_by: None,
            lines: Vec::new(),
        }
    }

    /// Calculate total debits
    pub fn total_debits(&self) -> BigDecimal {
        self.lines
            .iter()
            .filter(|l| l.entry_type == EntryType::Debit)
            .map(|l| &l.amount)
            .sum()
    }

    /// Calculate total credits
    pub fn total_credits(&self) -> BigDecimal {
        self.lines
            .iter()
            .filter(|l| l.entry_type == EntryType::Credit)
            .map(|l| &l.amount)
            .sum()
    }

    /// Check if the posting is balanced (debits = credits)
    pub fn is_balanced(&self) -> bool {
        self.total_debits() == self.total_credits()
    }

    /// Double-entry validation performed before any write
    pub fn validate(&self) -> LedgerResult<()> {
        if self.lines.is_empty() {
            return Err(LedgerError::Validation(
                "Journal entry must have at least one line".to_string(),
            ));
        }

        if self.lines.len() < 2 {
            return Err(LedgerError::Validation(
                "Journal entry must have at least two lines for double-entry bookkeeping"
                    .to_string(),
            ));
        }

        for line in &self.lines {
            if line.amount <= BigDecimal::from(0) {
                return Err(LedgerError::Validation(format!(
                    "Line amounts must be positive (account '{}')",
                    line.account_id
                )));
            }
        }

        if !self.is_balanced() {
            return Err(LedgerError::Validation(format!(
                "Journal entry is not balanced: debits = {}, credits = {}",
                self.total_debits(),
                self.total_credits()
            )));
        }

        if self.source_type.is_indexed() && self.source_reference.trim().is_empty() {
            return Err(LedgerError::Validation(format!(
                "{} posting requires a source reference",
                self.source_type
            )));
        }

        Ok(())
    }
}

/// Filter for listing journal entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub source_type: Option<SourceDocumentType>,
    pub status: Option<JournalStatus>,
}

impl JournalFilter {
    pub fn matches(&self, entry: &JournalEntry) -> bool {
        if let Some(start) = self.start_date {
            if entry.entry_date < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if entry.entry_date > end {
                return false;
            }
        }
        if let Some(source_type) = self.source_type {
            if entry.source_document_type != source_type {
                return false;
            }
        }
        if let Some(status) = self.status {
            if entry.status != status {
                return false;
            }
        }
        true
    }
}

/// Trial Balance - snapshot of all account balances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub generated_at: NaiveDateTime,
    /// Account balances keyed by account code
    pub balances: HashMap<String, AccountBalance>,
    pub total_debits: BigDecimal,
    pub total_credits: BigDecimal,
    pub is_balanced: bool,
}

/// Account balance information for trial balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account: Account,
    pub debit_balance: Option<BigDecimal>,
    pub credit_balance: Option<BigDecimal>,
}

impl AccountBalance {
    /// Place an account's running balance on its debit or credit column
    pub fn from_account(account: Account) -> Self {
        let balance = account.current_balance.clone();
        let side = if balance >= BigDecimal::from(0) {
            account.normal_balance
        } else {
            account.normal_balance.opposite()
        };
        let amount = balance.abs();
        let (debit_balance, credit_balance) = match side {
            EntryType::Debit => (Some(amount), None),
            EntryType::Credit => (None, Some(amount)),
        };
        Self {
            account,
            debit_balance,
            credit_balance,
        }
    }

    /// Get the balance amount regardless of debit/credit
    pub fn balance_amount(&self) -> BigDecimal {
        self.debit_balance
            .clone()
            .or_else(|| self.credit_balance.clone())
            .unwrap_or_else(|| BigDecimal::from(0))
    }
}

/// Errors that can occur in the ledger system
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Journal entry not found: {0}")]
    JournalEntryNotFound(String),
    #[error("Document not found: {0}")]
    DocumentNotFound(String),
    #[error("Account code already exists: {0}")]
    DuplicateAccount(String),
    #[error("{source_type} document '{reference}' already has a posted journal entry")]
    DuplicatePosting {
        source_type: SourceDocumentType,
        reference: String,
    },
    #[error("Account is inactive: {0}")]
    InactiveAccount(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),
}

impl LedgerError {
    /// Caller input was rejected before any write
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::Validation(_)
                | LedgerError::DuplicateAccount(_)
                | LedgerError::DuplicatePosting { .. }
                | LedgerError::InactiveAccount(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::AccountNotFound(_)
                | LedgerError::JournalEntryNotFound(_)
                | LedgerError::DocumentNotFound(_)
        )
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
