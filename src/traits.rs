//! Traits for storage abstraction and extensibility

use async_trait::async_trait;

use crate::documents::*;
use crate::types::*;
use crate::utils::validation::validate_account_code;

/// Storage abstraction for the chart of accounts and the journal
///
/// This trait allows the ledger to work with any storage backend
/// (PostgreSQL, SQLite, in-memory, etc.). Methods take `&self` so one store
/// can be shared by concurrent request handlers; implementations provide
/// their own synchronization.
///
/// [`LedgerStorage::commit_journal_entry`] and
/// [`LedgerStorage::commit_reversal`] are the only paths that change
/// `current_balance`. They must behave as one atomic unit: either the entry,
/// its lines and every balance increment become visible together, or none
/// of them do. Balances are incremented in place, never read and written
/// back by the caller.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Insert a new account; fails with `DuplicateAccount` if the code is taken
    async fn save_account(&self, account: &Account) -> LedgerResult<()>;

    /// Get an account by ID
    async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>>;

    /// Get an account by its unique code
    async fn get_account_by_code(&self, code: &str) -> LedgerResult<Option<Account>>;

    /// List accounts matching a filter, ordered by code
    async fn list_accounts(&self, filter: &AccountFilter) -> LedgerResult<Vec<Account>>;

    /// Activate or deactivate an account
    async fn set_account_active(&self, account_id: &str, is_active: bool)
        -> LedgerResult<Account>;

    /// Next value of the journal number sequence
    async fn next_journal_sequence(&self) -> LedgerResult<u64>;

    /// Store (or replace) a draft entry and its lines without touching balances
    async fn save_draft(&self, entry: &JournalEntry, lines: &[JournalLine]) -> LedgerResult<()>;

    /// Remove a draft entry and its lines
    async fn delete_draft(&self, entry_id: &str) -> LedgerResult<()>;

    /// Atomically store a posted entry, its lines and the balance increments
    ///
    /// Fails with `DuplicatePosting` when an indexed source already has a
    /// posted entry, `AccountNotFound` / `InactiveAccount` for bad lines.
    /// A draft with the same id is replaced.
    async fn commit_journal_entry(
        &self,
        entry: &JournalEntry,
        lines: &[JournalLine],
    ) -> LedgerResult<()>;

    /// Atomically post a reversing entry and mark the original reversed
    ///
    /// The original's slot in the source index is released.
    async fn commit_reversal(
        &self,
        original_id: &str,
        reversal: &JournalEntry,
        lines: &[JournalLine],
    ) -> LedgerResult<()>;

    /// Get a journal entry by ID
    async fn get_journal_entry(&self, entry_id: &str) -> LedgerResult<Option<JournalEntry>>;

    /// Lines of an entry ordered by line number
    async fn get_journal_lines(&self, entry_id: &str) -> LedgerResult<Vec<JournalLine>>;

    /// Posted entry occupying the `(source_type, reference)` index slot
    async fn find_entry_by_source(
        &self,
        source_type: SourceDocumentType,
        reference: &str,
    ) -> LedgerResult<Option<JournalEntry>>;

    /// List journal entries matching a filter, ordered by date then number
    async fn list_journal_entries(&self, filter: &JournalFilter)
        -> LedgerResult<Vec<JournalEntry>>;

    /// Lines of every entry that affects balances, optionally for one account
    async fn list_balance_lines(&self, account_id: Option<&str>)
        -> LedgerResult<Vec<JournalLine>>;
}

/// Read access to the business documents owned by other workflows
///
/// Range-filtered feeds return rows whose stored timestamp falls in the
/// range; implementations that cannot interpret a timestamp may return the
/// row anyway and leave it to the caller to skip.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn get_sales_order(&self, order_id: &str) -> LedgerResult<Option<SalesOrder>>;

    async fn list_sales_orders(&self) -> LedgerResult<Vec<SalesOrder>>;

    async fn payments_for_order(&self, order_id: &str) -> LedgerResult<Vec<CustomerPayment>>;

    async fn refunds_for_order(&self, order_id: &str) -> LedgerResult<Vec<InvoiceRefund>>;

    async fn get_vendor_bill(&self, bill_id: &str) -> LedgerResult<Option<VendorBill>>;

    async fn list_vendor_bills(&self) -> LedgerResult<Vec<VendorBill>>;

    async fn payments_for_bill(&self, bill_id: &str) -> LedgerResult<Vec<VendorPayment>>;

    async fn customer_payments(&self, range: Option<&DateRange>)
        -> LedgerResult<Vec<CustomerPayment>>;

    async fn vendor_payments(&self, range: Option<&DateRange>) -> LedgerResult<Vec<VendorPayment>>;

    async fn purchase_orders(&self, range: Option<&DateRange>) -> LedgerResult<Vec<PurchaseOrder>>;

    async fn investments(&self, range: Option<&DateRange>) -> LedgerResult<Vec<Investment>>;

    async fn withdrawals(&self, range: Option<&DateRange>) -> LedgerResult<Vec<Withdrawal>>;

    async fn loan_disbursements(&self, range: Option<&DateRange>)
        -> LedgerResult<Vec<LoanDisbursement>>;

    async fn liability_payments(&self, range: Option<&DateRange>)
        -> LedgerResult<Vec<LiabilityPayment>>;

    async fn invoice_refunds(&self, range: Option<&DateRange>) -> LedgerResult<Vec<InvoiceRefund>>;

    async fn expenses(&self, range: Option<&DateRange>) -> LedgerResult<Vec<Expense>>;
}

/// Trait for implementing custom account validation rules
pub trait AccountValidator: Send + Sync {
    /// Validate an account before saving
    fn validate_account(&self, account: &Account) -> LedgerResult<()>;
}

/// Trait for implementing custom journal validation rules
pub trait JournalValidator: Send + Sync {
    /// Validate a posting before anything is written
    fn validate_posting(&self, request: &PostingRequest) -> LedgerResult<()>;
}

/// Default account validator with basic rules
pub struct DefaultAccountValidator;

impl AccountValidator for DefaultAccountValidator {
    fn validate_account(&self, account: &Account) -> LedgerResult<()> {
        validate_account_code(&account.code)?;

        if account.name.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Account name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Default journal validator with the double-entry rules
pub struct DefaultJournalValidator;

impl JournalValidator for DefaultJournalValidator {
    fn validate_posting(&self, request: &PostingRequest) -> LedgerResult<()> {
        request.validate()
    }
}
