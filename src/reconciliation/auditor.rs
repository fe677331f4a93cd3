//! Auto-balance audit: finds business documents without a posted journal
//! entry and posts the missing entries

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::documents::*;
use crate::ledger::Ledger;
use crate::traits::*;
use crate::types::*;

/// What happened to one document during an auto-balance run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AutoBalanceOutcome {
    Created { journal_entry_id: String },
    Failed { error: String },
    AlreadyBalanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoBalanceResult {
    pub document_id: String,
    pub outcome: AutoBalanceOutcome,
}

/// Per-document results of an auto-balance run plus aggregate counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoBalanceReport {
    pub document_type: SourceDocumentType,
    pub results: Vec<AutoBalanceResult>,
    pub created: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl AutoBalanceReport {
    fn new(document_type: SourceDocumentType) -> Self {
        Self {
            document_type,
            results: Vec::new(),
            created: 0,
            failed: 0,
            skipped: 0,
        }
    }

    fn record(&mut self, document_id: &str, outcome: AutoBalanceOutcome) {
        match outcome {
            AutoBalanceOutcome::Created { .. } => self.created += 1,
            AutoBalanceOutcome::Failed { .. } => self.failed += 1,
            AutoBalanceOutcome::AlreadyBalanced => self.skipped += 1,
        }
        self.results.push(AutoBalanceResult {
            document_id: document_id.to_string(),
            outcome,
        });
    }
}

/// Enforces one posted journal entry per business document
///
/// The missing set is always re-derived from the journal's source index, so
/// repeated runs never post a document twice.
pub struct AutoBalanceAuditor<'a, S: LedgerStorage, D: DocumentSource> {
    ledger: &'a Ledger<S>,
    documents: &'a D,
}

impl<'a, S: LedgerStorage + Clone, D: DocumentSource> AutoBalanceAuditor<'a, S, D> {
    pub fn new(ledger: &'a Ledger<S>, documents: &'a D) -> Self {
        Self { ledger, documents }
    }

    /// Ids of documents of a type with no posted entry in the source index
    pub async fn find_missing_journals(
        &self,
        document_type: SourceDocumentType,
    ) -> LedgerResult<Vec<String>> {
        let documents = self.load_documents(document_type).await?;
        let mut missing = Vec::new();

        for document in &documents {
            if self
                .ledger
                .find_entry_by_source(document_type, document.source_id())
                .await?
                .is_none()
            {
                missing.push(document.source_id().to_string());
            }
        }

        Ok(missing)
    }

    /// Post the standard entry for every missing document, or for the
    /// requested subset of them
    ///
    /// Requested ids that already have an entry are reported as
    /// `AlreadyBalanced`; ids that match no document fail.
    pub async fn create_missing_journals(
        &self,
        document_type: SourceDocumentType,
        ids: Option<&[String]>,
    ) -> LedgerResult<AutoBalanceReport> {
        let documents = self.load_documents(document_type).await?;
        let mut report = AutoBalanceReport::new(document_type);

        let targets: Vec<&str> = match ids {
            Some(ids) => {
                let mut seen = HashSet::new();
                ids.iter()
                    .map(String::as_str)
                    .filter(|id| seen.insert(*id))
                    .collect()
            }
            None => documents.iter().map(|d| d.source_id()).collect(),
        };

        for id in targets {
            let Some(document) = documents.iter().find(|d| d.source_id() == id) else {
                report.record(
                    id,
                    AutoBalanceOutcome::Failed {
                        error: LedgerError::DocumentNotFound(format!("{} {}", document_type, id))
                            .to_string(),
                    },
                );
                continue;
            };

            if self
                .ledger
                .find_entry_by_source(document_type, id)
                .await?
                .is_some()
            {
                // Only requested ids are reported when already balanced
                if ids.is_some() {
                    report.record(id, AutoBalanceOutcome::AlreadyBalanced);
                }
                continue;
            }

            let outcome = match self.ledger.post_document(document).await {
                Ok(entry) => AutoBalanceOutcome::Created {
                    journal_entry_id: entry.id,
                },
                Err(LedgerError::DuplicatePosting { .. }) => AutoBalanceOutcome::AlreadyBalanced,
                Err(e) => {
                    log::warn!("auto-balance failed for {} '{}': {}", document_type, id, e);
                    AutoBalanceOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.record(id, outcome);
        }

        log::info!(
            "auto-balance {}: {} created, {} failed, {} skipped",
            document_type,
            report.created,
            report.failed,
            report.skipped
        );

        Ok(report)
    }

    /// Every document of a type that should carry a journal entry
    async fn load_documents(
        &self,
        document_type: SourceDocumentType,
    ) -> LedgerResult<Vec<SourceDocument>> {
        let source = self.documents;
        let documents = match document_type {
            SourceDocumentType::PurchaseOrder => source
                .purchase_orders(None)
                .await?
                .into_iter()
                .map(SourceDocument::PurchaseOrder)
                .collect(),
            SourceDocumentType::SupplierPayment => source
                .vendor_payments(None)
                .await?
                .into_iter()
                .map(SourceDocument::SupplierPayment)
                .collect(),
            SourceDocumentType::CustomerPayment => source
                .customer_payments(None)
                .await?
                .into_iter()
                .map(SourceDocument::CustomerPayment)
                .collect(),
            SourceDocumentType::PartnerInvestment => source
                .investments(None)
                .await?
                .into_iter()
                .map(SourceDocument::Investment)
                .collect(),
            SourceDocumentType::PartnerWithdrawal => source
                .withdrawals(None)
                .await?
                .into_iter()
                .map(SourceDocument::Withdrawal)
                .collect(),
            SourceDocumentType::InvoiceRefund => source
                .invoice_refunds(None)
                .await?
                .into_iter()
                .filter(|r| r.status == RefundStatus::Completed)
                .map(SourceDocument::Refund)
                .collect(),
            SourceDocumentType::LoanDisbursement => source
                .loan_disbursements(None)
                .await?
                .into_iter()
                .map(SourceDocument::LoanDisbursement)
                .collect(),
            SourceDocumentType::LoanRepayment => source
                .liability_payments(None)
                .await?
                .into_iter()
                .map(SourceDocument::LoanRepayment)
                .collect(),
            SourceDocumentType::Expense => source
                .expenses(None)
                .await?
                .into_iter()
                .map(SourceDocument::Expense)
                .collect(),
            SourceDocumentType::Manual | SourceDocumentType::Reversal => {
                return Err(LedgerError::Validation(format!(
                    "{} entries are not derived from documents",
                    document_type
                )))
            }
        };

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{MemoryDocuments, MemoryStorage};
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn purchase_order(id: &str, amount: i64) -> PurchaseOrder {
        PurchaseOrder {
            id: id.to_string(),
            supplier_id: "S1".to_string(),
            total_amount: BigDecimal::from(amount),
            order_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            category: PurchaseCategory::Inventory,
        }
    }

    async fn setup() -> (Ledger<MemoryStorage>, MemoryDocuments) {
        let ledger = Ledger::new(MemoryStorage::new());
        ledger.setup_standard_chart_of_accounts().await.unwrap();
        let docs = MemoryDocuments::new();
        docs.add_purchase_order(purchase_order("PO1", 1000)).unwrap();
        docs.add_purchase_order(purchase_order("PO2", 2500)).unwrap();
        docs.add_purchase_order(purchase_order("PO3", 0)).unwrap();
        (ledger, docs)
    }

    #[tokio::test]
    async fn test_second_run_finds_nothing_missing() {
        let (ledger, docs) = setup().await;
        let auditor = AutoBalanceAuditor::new(&ledger, &docs);

        let missing = auditor
            .find_missing_journals(SourceDocumentType::PurchaseOrder)
            .await
            .unwrap();
        assert_eq!(missing, vec!["PO1", "PO2", "PO3"]);

        let first = auditor
            .create_missing_journals(SourceDocumentType::PurchaseOrder, None)
            .await
            .unwrap();
        assert_eq!(first.created, 2);
        assert_eq!(first.failed, 1);

        let second = auditor
            .create_missing_journals(SourceDocumentType::PurchaseOrder, None)
            .await
            .unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.failed, 1);

        let missing = auditor
            .find_missing_journals(SourceDocumentType::PurchaseOrder)
            .await
            .unwrap();
        assert_eq!(missing, vec!["PO3"]);

        let inventory = ledger.get_account_by_code("1300").await.unwrap();
        assert_eq!(inventory.current_balance, BigDecimal::from(3500));
    }

    #[tokio::test]
    async fn test_requested_subset() {
        let (ledger, docs) = setup().await;
        let auditor = AutoBalanceAuditor::new(&ledger, &docs);

        let requested = vec!["PO2".to_string(), "PO2".to_string(), "PO9".to_string()];
        let report = auditor
            .create_missing_journals(SourceDocumentType::PurchaseOrder, Some(&requested))
            .await
            .unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.results.len(), 2);

        let again = auditor
            .create_missing_journals(SourceDocumentType::PurchaseOrder, Some(&requested[..1]))
            .await
            .unwrap();
        assert_eq!(again.skipped, 1);
        assert_eq!(again.results[0].outcome, AutoBalanceOutcome::AlreadyBalanced);
    }

    #[tokio::test]
    async fn test_manual_type_rejected() {
        let (ledger, docs) = setup().await;
        let auditor = AutoBalanceAuditor::new(&ledger, &docs);
        let err = auditor
            .find_missing_journals(SourceDocumentType::Manual)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}
