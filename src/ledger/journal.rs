//! Journal posting, drafts and reversals

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::config::LedgerConfig;
use crate::traits::*;
use crate::types::*;

/// Journal engine: validates postings and commits them through the store
///
/// The engine never touches `current_balance` itself; every balance change
/// goes through [`LedgerStorage::commit_journal_entry`] or
/// [`LedgerStorage::commit_reversal`].
pub struct JournalEngine<S: LedgerStorage> {
    storage: S,
    validator: Box<dyn JournalValidator>,
    journal_number_prefix: String,
    default_created_by: String,
}

impl<S: LedgerStorage> JournalEngine<S> {
    /// Create a new journal engine
    pub fn new(storage: S, config: &LedgerConfig) -> Self {
        Self::with_validator(storage, config, Box::new(DefaultJournalValidator))
    }

    /// Create a new journal engine with custom validator
    pub fn with_validator(
        storage: S,
        config: &LedgerConfig,
        validator: Box<dyn JournalValidator>,
    ) -> Self {
        Self {
            storage,
            validator,
            journal_number_prefix: config.journal_number_prefix.clone(),
            default_created_by: config.default_created_by.clone(),
        }
    }

    /// Validate and post a balanced entry in one atomic step
    pub async fn post_journal_entry(&self, request: PostingRequest) -> LedgerResult<JournalEntry> {
        self.validator.validate_posting(&request)?;
        self.check_accounts(&request).await?;

        let id = uuid::Uuid::new_v4().to_string();
        let journal_number = self.next_journal_number(request.entry_date).await?;
        let (entry, lines) = self.materialize(&request, id, journal_number, JournalStatus::Posted);

        self.storage.commit_journal_entry(&entry, &lines).await?;
        log::info!(
            "posted {} ({} {}) for {}",
            entry.journal_number,
            entry.source_document_type,
            entry.source_reference,
            entry.total_debit
        );

        Ok(entry)
    }

    /// Store an entry as a draft; balances are untouched until it is posted
    pub async fn save_draft(&self, request: PostingRequest) -> LedgerResult<JournalEntry> {
        if request.lines.is_empty() {
            return Err(LedgerError::Validation(
                "Draft journal entry must have at least one line".to_string(),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let journal_number = self.next_journal_number(request.entry_date).await?;
        let (entry, lines) = self.materialize(&request, id, journal_number, JournalStatus::Draft);

        self.storage.save_draft(&entry, &lines).await?;
        Ok(entry)
    }

    /// Validate and post a previously saved draft under its own id and number
    pub async fn post_draft(&self, entry_id: &str) -> LedgerResult<JournalEntry> {
        let draft = self.get_journal_entry_required(entry_id).await?;
        if draft.status != JournalStatus::Draft {
            return Err(LedgerError::InvalidState(format!(
                "Journal entry {} is not a draft",
                draft.journal_number
            )));
        }

        let lines = self.storage.get_journal_lines(entry_id).await?;
        let mut request = PostingRequest::new(
            draft.source_document_type,
            draft.source_reference.clone(),
            draft.entry_date,
            draft.description.clone(),
        );
        request.entry_type = draft.entry_type;
        request.created_by = Some(draft.created_by.clone());
        request.lines = lines.iter().map(posting_line_from).collect();

        self.validator.validate_posting(&request)?;
        self.check_accounts(&request).await?;

        let (mut entry, lines) = self.materialize(
            &request,
            draft.id.clone(),
            draft.journal_number.clone(),
            JournalStatus::Posted,
        );
        entry.created_at = draft.created_at;

        self.storage.commit_journal_entry(&entry, &lines).await?;
        log::info!("posted draft {}", entry.journal_number);

        Ok(entry)
    }

    /// Delete a draft and its lines
    pub async fn delete_draft(&self, entry_id: &str) -> LedgerResult<()> {
        self.storage.delete_draft(entry_id).await
    }

    /// Offset a posted entry with a mirror-image entry
    ///
    /// The original is marked reversed and its document slot is released, so
    /// the document can be posted again with corrected figures.
    pub async fn reverse_journal_entry(
        &self,
        entry_id: &str,
        reversal_date: NaiveDate,
        reason: &str,
    ) -> LedgerResult<JournalEntry> {
        let original = self.get_journal_entry_required(entry_id).await?;
        if original.status != JournalStatus::Posted {
            return Err(LedgerError::InvalidState(format!(
                "Only posted entries can be reversed; {} is {:?}",
                original.journal_number, original.status
            )));
        }
        if original.entry_type == JournalEntryKind::Reversal {
            return Err(LedgerError::InvalidState(format!(
                "{} is itself a reversal; post the correction as a new entry",
                original.journal_number
            )));
        }
        if reversal_date < original.entry_date {
            return Err(LedgerError::Validation(format!(
                "Reversal date {} precedes the original entry date {}",
                reversal_date, original.entry_date
            )));
        }

        let original_lines = self.storage.get_journal_lines(entry_id).await?;
        let mut request = PostingRequest::new(
            SourceDocumentType::Reversal,
            original.id.clone(),
            reversal_date,
            format!("Reversal of {}: {}", original.journal_number, reason),
        );
        request.lines = original_lines
            .iter()
            .map(|line| {
                let mut reversed = posting_line_from(line);
                reversed.entry_type = reversed.entry_type.opposite();
                reversed.reference = Some(original.journal_number.clone());
                reversed
            })
            .collect();

        self.validator.validate_posting(&request)?;

        let id = uuid::Uuid::new_v4().to_string();
        let journal_number = self.next_journal_number(reversal_date).await?;
        let (entry, lines) = self.materialize(&request, id, journal_number, JournalStatus::Posted);

        self.storage
            .commit_reversal(&original.id, &entry, &lines)
            .await?;
        log::info!(
            "reversed {} with {}: {}",
            original.journal_number,
            entry.journal_number,
            reason
        );

        Ok(entry)
    }

    /// Get a journal entry by ID
    pub async fn get_journal_entry(&self, entry_id: &str) -> LedgerResult<Option<JournalEntry>> {
        self.storage.get_journal_entry(entry_id).await
    }

    /// Get a journal entry by ID, returning an error if not found
    pub async fn get_journal_entry_required(&self, entry_id: &str) -> LedgerResult<JournalEntry> {
        self.storage
            .get_journal_entry(entry_id)
            .await?
            .ok_or_else(|| LedgerError::JournalEntryNotFound(entry_id.to_string()))
    }

    pub async fn get_journal_lines(&self, entry_id: &str) -> LedgerResult<Vec<JournalLine>> {
        self.get_journal_entry_required(entry_id).await?;
        self.storage.get_journal_lines(entry_id).await
    }

    /// The posted entry recorded for a business document, if any
    pub async fn find_entry_by_source(
        &self,
        source_type: SourceDocumentType,
        reference: &str,
    ) -> LedgerResult<Option<JournalEntry>> {
        self.storage.find_entry_by_source(source_type, reference).await
    }

    pub async fn list_journal_entries(
        &self,
        filter: &JournalFilter,
    ) -> LedgerResult<Vec<JournalEntry>> {
        self.storage.list_journal_entries(filter).await
    }

    /// Verify all referenced accounts exist and accept postings
    async fn check_accounts(&self, request: &PostingRequest) -> LedgerResult<()> {
        for line in &request.lines {
            let account = self
                .storage
                .get_account(&line.account_id)
                .await?
                .ok_or_else(|| LedgerError::AccountNotFound(line.account_id.clone()))?;
            if !account.is_active {
                return Err(LedgerError::InactiveAccount(account.code));
            }
        }
        Ok(())
    }

    async fn next_journal_number(&self, date: NaiveDate) -> LedgerResult<String> {
        let sequence = self.storage.next_journal_sequence().await?;
        Ok(format!(
            "{}-{}-{:06}",
            self.journal_number_prefix,
            date.format("%Y%m%d"),
            sequence
        ))
    }

    fn materialize(
        &self,
        request: &PostingRequest,
        id: String,
        journal_number: String,
        status: JournalStatus,
    ) -> (JournalEntry, Vec<JournalLine>) {
        let now = chrono::Utc::now().naive_utc();
        let lines: Vec<JournalLine> = request
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| line.to_journal_line(&id, i as u32 + 1))
            .collect();

        let entry = JournalEntry {
            id,
            journal_number,
            entry_date: request.entry_date,
            description: request.description.clone(),
            entry_type: request.entry_type,
            status,
            total_debit: request.total_debits(),
            total_credit: request.total_credits(),
            source_document_type: request.source_type,
            source_reference: request.source_reference.clone(),
            created_by: request
                .created_by
                .clone()
                .unwrap_or_else(|| self.default_created_by.clone()),
            created_at: now,
            posted_at: (status == JournalStatus::Posted).then_some(now),
            reversed_by: None,
        };

        (entry, lines)
    }
}

fn posting_line_from(line: &JournalLine) -> PostingLine {
    PostingLine {
        account_id: line.account_id.clone(),
        entry_type: line.entry_type(),
        amount: line.amount().clone(),
        description: line.description.clone(),
        reference: line.reference.clone(),
    }
}

/// Builder for hand-made journal entries
#[derive(Debug)]
pub struct JournalEntryBuilder {
    request: PostingRequest,
}

impl JournalEntryBuilder {
    /// Create a new builder
    pub fn new(
        source_type: SourceDocumentType,
        source_reference: String,
        date: NaiveDate,
        description: String,
    ) -> Self {
        Self {
            request: PostingRequest::new(source_type, source_reference, date, description),
        }
    }

    /// Start a manual entry that is not tied to a business document
    pub fn manual(date: NaiveDate, description: String) -> Self {
        Self::new(SourceDocumentType::Manual, String::new(), date, description)
    }

    /// Record who made the entry
    pub fn created_by(mut self, user: String) -> Self {
        self.request.created_by = Some(user);
        self
    }

    /// Add a debit line
    pub fn debit(
        mut self,
        account_id: String,
        amount: BigDecimal,
        description: Option<String>,
    ) -> Self {
        self.request
            .lines
            .push(PostingLine::debit(account_id, amount, description));
        self
    }

    /// Add a credit line
    pub fn credit(
        mut self,
        account_id: String,
        amount: BigDecimal,
        description: Option<String>,
    ) -> Self {
        self.request
            .lines
            .push(PostingLine::credit(account_id, amount, description));
        self
    }

    /// Add a custom line
    pub fn line(mut self, line: PostingLine) -> Self {
        self.request.lines.push(line);
        self
    }

    /// Build the request, checking the double-entry rules
    pub fn build(self) -> LedgerResult<PostingRequest> {
        self.request.validate()?;
        Ok(self.request)
    }

    /// Build without validation, for drafts that are still being assembled
    pub fn build_draft(self) -> PostingRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryStorage;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    async fn setup() -> (MemoryStorage, JournalEngine<MemoryStorage>, Account, Account) {
        let storage = MemoryStorage::new();
        let cash = Account::new("1010".into(), "Cash".into(), AccountType::Asset, None);
        let revenue = Account::new("4010".into(), "Sales".into(), AccountType::Revenue, None);
        storage.save_account(&cash).await.unwrap();
        storage.save_account(&revenue).await.unwrap();
        let engine = JournalEngine::new(storage.clone(), &LedgerConfig::default());
        (storage, engine, cash, revenue)
    }

    #[tokio::test]
    async fn test_post_assigns_number_and_totals() {
        let (storage, engine, cash, revenue) = setup().await;
        let mut sale = PostingLine::credit(revenue.id.clone(), BigDecimal::from(700), None);
        sale.reference = Some("RCPT-7".into());
        let request = JournalEntryBuilder::manual(date(2), "Cash sale".into())
            .debit(cash.id.clone(), BigDecimal::from(700), None)
            .line(sale)
            .build()
            .unwrap();

        let entry = engine.post_journal_entry(request).await.unwrap();
        assert_eq!(entry.journal_number, "JV-20240402-000001");
        assert_eq!(entry.status, JournalStatus::Posted);
        assert_eq!(entry.total_debit, BigDecimal::from(700));
        assert!(entry.is_balanced());
        assert!(entry.posted_at.is_some());

        let lines = engine.get_journal_lines(&entry.id).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line_number, 1);
        assert_eq!(lines[1].reference.as_deref(), Some("RCPT-7"));

        let cash_now = storage.get_account(&cash.id).await.unwrap().unwrap();
        assert_eq!(cash_now.current_balance, BigDecimal::from(700));
    }

    #[tokio::test]
    async fn test_unbalanced_rejected_before_any_write() {
        let (storage, engine, cash, revenue) = setup().await;
        let request = JournalEntryBuilder::manual(date(2), "Broken".into())
            .debit(cash.id.clone(), BigDecimal::from(700), None)
            .credit(revenue.id.clone(), BigDecimal::from(600), None)
            .build_draft();

        let err = engine.post_journal_entry(request).await.unwrap_err();
        assert!(err.is_validation());
        assert!(storage
            .list_journal_entries(&JournalFilter::default())
            .await
            .unwrap()
            .is_empty());
        // The sequence is only consumed by valid postings
        assert_eq!(storage.next_journal_sequence().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_draft_lifecycle() {
        let (storage, engine, cash, revenue) = setup().await;
        let request = JournalEntryBuilder::manual(date(3), "Pending sale".into())
            .debit(cash.id.clone(), BigDecimal::from(300), None)
            .credit(revenue.id.clone(), BigDecimal::from(300), None)
            .build_draft();

        let draft = engine.save_draft(request).await.unwrap();
        assert_eq!(draft.status, JournalStatus::Draft);
        let cash_now = storage.get_account(&cash.id).await.unwrap().unwrap();
        assert_eq!(cash_now.current_balance, BigDecimal::from(0));

        let posted = engine.post_draft(&draft.id).await.unwrap();
        assert_eq!(posted.id, draft.id);
        assert_eq!(posted.journal_number, draft.journal_number);
        let cash_now = storage.get_account(&cash.id).await.unwrap().unwrap();
        assert_eq!(cash_now.current_balance, BigDecimal::from(300));

        assert!(matches!(
            engine.delete_draft(&draft.id).await,
            Err(LedgerError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_unbalanced_draft_cannot_be_posted_but_can_be_deleted() {
        let (_, engine, cash, revenue) = setup().await;
        let request = JournalEntryBuilder::manual(date(3), "Half done".into())
            .debit(cash.id.clone(), BigDecimal::from(300), None)
            .credit(revenue.id.clone(), BigDecimal::from(100), None)
            .build_draft();

        let draft = engine.save_draft(request).await.unwrap();
        assert!(engine.post_draft(&draft.id).await.unwrap_err().is_validation());
        engine.delete_draft(&draft.id).await.unwrap();
        assert!(engine.get_journal_entry(&draft.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reversal_restores_balances() {
        let (storage, engine, cash, revenue) = setup().await;
        let request = JournalEntryBuilder::new(
            SourceDocumentType::CustomerPayment,
            "PAY-9".into(),
            date(4),
            "Payment".into(),
        )
        .debit(cash.id.clone(), BigDecimal::from(1200), None)
        .credit(revenue.id.clone(), BigDecimal::from(1200), None)
        .build()
        .unwrap();
        let original = engine.post_journal_entry(request).await.unwrap();

        let reversal = engine
            .reverse_journal_entry(&original.id, date(5), "keyed twice")
            .await
            .unwrap();
        assert_eq!(reversal.entry_type, JournalEntryKind::Reversal);
        assert_eq!(reversal.source_reference, original.id);

        let original = engine.get_journal_entry_required(&original.id).await.unwrap();
        assert_eq!(original.status, JournalStatus::Reversed);
        assert_eq!(original.reversed_by, Some(reversal.id.clone()));

        let cash_now = storage.get_account(&cash.id).await.unwrap().unwrap();
        assert_eq!(cash_now.current_balance, BigDecimal::from(0));

        // Slot released: the document can be posted again
        assert!(engine
            .find_entry_by_source(SourceDocumentType::CustomerPayment, "PAY-9")
            .await
            .unwrap()
            .is_none());

        assert!(matches!(
            engine
                .reverse_journal_entry(&original.id, date(6), "again")
                .await,
            Err(LedgerError::InvalidState(_))
        ));
    }
}
