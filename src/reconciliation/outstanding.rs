//! Outstanding balances of sales orders and vendor bills
//!
//! Cached `paid_amount` counters drift from the payment trail they summarize.
//! Every balance here is recomputed from the trail and reconciled as
//! `max(cached, history)`.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::documents::*;
use crate::traits::DocumentSource;
use crate::types::*;

/// Whether anything is still owed on a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementState {
    Open,
    Settled,
    Overpaid,
}

/// Reconciled balance of one receivable or payable document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutstandingBalance {
    pub document: DocumentRef,
    pub document_id: String,
    pub party_id: String,
    pub party_name: String,
    pub party_contact: Option<String>,
    pub total: BigDecimal,
    pub paid: BigDecimal,
    pub waived: BigDecimal,
    pub outstanding: BigDecimal,
    /// Date the document starts aging from
    pub origin_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub state: SettlementState,
}

impl OutstandingBalance {
    fn new(
        document: DocumentRef,
        party: (String, String, Option<String>),
        total: BigDecimal,
        paid: BigDecimal,
        waived: BigDecimal,
        origin_date: NaiveDate,
        due_date: Option<NaiveDate>,
    ) -> Self {
        let outstanding = &total - &paid - &waived;
        let zero = BigDecimal::from(0);
        let state = if outstanding > zero {
            SettlementState::Open
        } else if outstanding == zero {
            SettlementState::Settled
        } else {
            SettlementState::Overpaid
        };
        let document_id = match document {
            DocumentRef::SalesOrder(ref id) | DocumentRef::VendorBill(ref id) => id.clone(),
        };
        let (party_id, party_name, party_contact) = party;

        Self {
            document,
            document_id,
            party_id,
            party_name,
            party_contact,
            total,
            paid,
            waived,
            outstanding,
            origin_date,
            due_date,
            state,
        }
    }
}

/// A document whose numbers do not add up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub document: DocumentRef,
    pub party_id: String,
    pub outstanding: BigDecimal,
    pub message: String,
}

impl Anomaly {
    fn negative_outstanding(balance: &OutstandingBalance) -> Self {
        Self {
            document: balance.document.clone(),
            party_id: balance.party_id.clone(),
            outstanding: balance.outstanding.clone(),
            message: format!(
                "outstanding is negative: total {} - paid {} - waived {} = {}",
                balance.total, balance.paid, balance.waived, balance.outstanding
            ),
        }
    }
}

/// Open documents of one kind, with what was set aside while collecting them
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpenDocuments {
    pub documents: Vec<OutstandingBalance>,
    pub anomalies: Vec<Anomaly>,
    /// Feeds that could not be read; affected balances use the cached counters
    pub unavailable_sources: Vec<String>,
}

impl OpenDocuments {
    fn note_unavailable(&mut self, table: String) {
        if !self.unavailable_sources.contains(&table) {
            log::warn!("{} unavailable, using cached paid amounts", table);
            self.unavailable_sources.push(table);
        }
    }

    fn absorb(&mut self, balance: OutstandingBalance) {
        match balance.state {
            SettlementState::Open => self.documents.push(balance),
            SettlementState::Settled => {}
            SettlementState::Overpaid => {
                log::debug!(
                    "dropping {} from the open set: outstanding {}",
                    balance.document_id,
                    balance.outstanding
                );
                self.anomalies.push(Anomaly::negative_outstanding(&balance));
            }
        }
    }
}

/// Joins documents with their payment trails
pub struct DocumentReconciler<D: DocumentSource> {
    source: D,
}

impl<D: DocumentSource> DocumentReconciler<D> {
    pub fn new(source: D) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    /// Outstanding balance of a sales order
    pub async fn outstanding_for_order(&self, order_id: &str) -> LedgerResult<OutstandingBalance> {
        let order = self
            .source
            .get_sales_order(order_id)
            .await?
            .ok_or_else(|| LedgerError::DocumentNotFound(format!("sales order {}", order_id)))?;
        let history = self.order_history_paid(order_id).await?;
        Ok(order_balance(order, history))
    }

    /// Outstanding balance of a vendor bill
    pub async fn outstanding_for_bill(&self, bill_id: &str) -> LedgerResult<OutstandingBalance> {
        let bill = self
            .source
            .get_vendor_bill(bill_id)
            .await?
            .ok_or_else(|| LedgerError::DocumentNotFound(format!("vendor bill {}", bill_id)))?;
        let history = self.bill_history_paid(bill_id).await?;
        Ok(bill_balance(bill, history))
    }

    pub async fn compute_outstanding(
        &self,
        document: &DocumentRef,
    ) -> LedgerResult<OutstandingBalance> {
        match document {
            DocumentRef::SalesOrder(id) => self.outstanding_for_order(id).await,
            DocumentRef::VendorBill(id) => self.outstanding_for_bill(id).await,
        }
    }

    /// Sales orders with money still owed as of a date
    ///
    /// Orders created after `as_of` are left out. When a payment feed cannot
    /// be read, balances fall back to the cached counters and the feed is
    /// listed in `unavailable_sources`.
    pub async fn open_receivables(&self, as_of: NaiveDate) -> LedgerResult<OpenDocuments> {
        let mut open = OpenDocuments::default();

        for order in self.source.list_sales_orders().await? {
            if !order.status.is_open_receivable() || order.created_at.date() > as_of {
                continue;
            }

            let history = match self.order_history_paid(&order.id).await {
                Ok(history) => history,
                Err(LedgerError::SourceUnavailable(table)) => {
                    open.note_unavailable(table);
                    None
                }
                Err(e) => return Err(e),
            };
            open.absorb(order_balance(order, history));
        }

        Ok(open)
    }

    /// Vendor bills with money still owed as of a date
    pub async fn open_payables(&self, as_of: NaiveDate) -> LedgerResult<OpenDocuments> {
        let mut open = OpenDocuments::default();

        for bill in self.source.list_vendor_bills().await? {
            if !bill.status.is_open_payable() || bill.bill_date > as_of {
                continue;
            }

            let history = match self.bill_history_paid(&bill.id).await {
                Ok(history) => history,
                Err(LedgerError::SourceUnavailable(table)) => {
                    open.note_unavailable(table);
                    None
                }
                Err(e) => return Err(e),
            };
            open.absorb(bill_balance(bill, history));
        }

        Ok(open)
    }

    /// Customer payments less completed cash refunds
    async fn order_history_paid(&self, order_id: &str) -> LedgerResult<Option<BigDecimal>> {
        let payments = self.source.payments_for_order(order_id).await?;
        let refunds = self.source.refunds_for_order(order_id).await?;

        let received: BigDecimal = payments.iter().map(|p| &p.amount).sum();
        let returned: BigDecimal = refunds
            .iter()
            .filter(|r| r.status == RefundStatus::Completed && r.method.moves_cash())
            .map(|r| &r.amount)
            .sum();

        Ok(Some(received - returned))
    }

    async fn bill_history_paid(&self, bill_id: &str) -> LedgerResult<Option<BigDecimal>> {
        let payments = self.source.payments_for_bill(bill_id).await?;
        Ok(Some(payments.iter().map(|p| &p.amount).sum()))
    }
}

fn reconciled_paid(cached: &BigDecimal, history: Option<BigDecimal>) -> BigDecimal {
    match history {
        Some(history) if history > *cached => history,
        _ => cached.clone(),
    }
}

fn order_balance(order: SalesOrder, history: Option<BigDecimal>) -> OutstandingBalance {
    let paid = reconciled_paid(&order.paid_amount, history);
    OutstandingBalance::new(
        DocumentRef::SalesOrder(order.id),
        (order.customer_id, order.customer_name, order.customer_contact),
        order.grand_total,
        paid,
        order.waived_amount,
        order.created_at.date(),
        None,
    )
}

fn bill_balance(bill: VendorBill, history: Option<BigDecimal>) -> OutstandingBalance {
    let paid = reconciled_paid(&bill.paid_amount, history);
    OutstandingBalance::new(
        DocumentRef::VendorBill(bill.id),
        (bill.supplier_id, bill.supplier_name, bill.supplier_contact),
        bill.total_amount,
        paid,
        BigDecimal::from(0),
        bill.bill_date,
        bill.due_date,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryDocuments;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn order(id: &str, total: i64, paid: i64, waived: i64, status: OrderStatus) -> SalesOrder {
        SalesOrder {
            id: id.to_string(),
            customer_id: "C1".to_string(),
            customer_name: "Karim Traders".to_string(),
            customer_contact: None,
            grand_total: BigDecimal::from(total),
            paid_amount: BigDecimal::from(paid),
            waived_amount: BigDecimal::from(waived),
            created_at: date(2024, 3, 1).and_hms_opt(10, 0, 0).unwrap(),
            status,
        }
    }

    fn customer_payment(id: &str, order_id: &str, amount: i64) -> CustomerPayment {
        CustomerPayment {
            id: id.to_string(),
            order_id: order_id.to_string(),
            customer_id: "C1".to_string(),
            amount: BigDecimal::from(amount),
            method: PaymentMethod::Cash,
            paid_at: "2024-03-02 12:00:00".to_string(),
            reference: None,
        }
    }

    fn bill(id: &str, total: i64, paid: i64, status: BillStatus) -> VendorBill {
        VendorBill {
            id: id.to_string(),
            supplier_id: "S1".to_string(),
            supplier_name: "Teak House".to_string(),
            supplier_contact: Some("01700000000".to_string()),
            total_amount: BigDecimal::from(total),
            paid_amount: BigDecimal::from(paid),
            bill_date: date(2024, 2, 1),
            due_date: Some(date(2024, 3, 1)),
            status,
        }
    }

    fn vendor_payment(id: &str, bill_id: &str, amount: i64) -> VendorPayment {
        VendorPayment {
            id: id.to_string(),
            bill_id: bill_id.to_string(),
            supplier_id: "S1".to_string(),
            amount: BigDecimal::from(amount),
            method: PaymentMethod::BankTransfer,
            paid_at: "2024-02-10".to_string(),
            reference: None,
        }
    }

    #[tokio::test]
    async fn test_bill_history_beats_stale_counter() {
        let docs = MemoryDocuments::new();
        docs.add_vendor_bill(bill("B1", 20000, 5000, BillStatus::Partial))
            .unwrap();
        docs.add_vendor_payment(vendor_payment("VP1", "B1", 5000)).unwrap();
        docs.add_vendor_payment(vendor_payment("VP2", "B1", 3000)).unwrap();

        let reconciler = DocumentReconciler::new(docs);
        let balance = reconciler.outstanding_for_bill("B1").await.unwrap();

        assert_eq!(balance.paid, BigDecimal::from(8000));
        assert_eq!(balance.outstanding, BigDecimal::from(12000));
        assert_eq!(balance.state, SettlementState::Open);

        // The trail is read again on every call
        reconciler
            .source()
            .add_vendor_payment(vendor_payment("VP3", "B1", 12000))
            .unwrap();
        let balance = reconciler.outstanding_for_bill("B1").await.unwrap();
        assert_eq!(balance.outstanding, BigDecimal::from(0));
        assert_eq!(balance.state, SettlementState::Settled);
    }

    #[tokio::test]
    async fn test_cached_counter_used_when_history_is_short() {
        let docs = MemoryDocuments::new();
        docs.add_sales_order(order("SO1", 10000, 4000, 0, OrderStatus::Confirmed))
            .unwrap();
        docs.add_customer_payment(customer_payment("P1", "SO1", 1000))
            .unwrap();

        let reconciler = DocumentReconciler::new(docs);
        let balance = reconciler
            .compute_outstanding(&DocumentRef::SalesOrder("SO1".to_string()))
            .await
            .unwrap();

        assert_eq!(balance.paid, BigDecimal::from(4000));
        assert_eq!(balance.outstanding, BigDecimal::from(6000));
    }

    #[tokio::test]
    async fn test_completed_cash_refund_reduces_history() {
        let docs = MemoryDocuments::new();
        docs.add_sales_order(order("SO1", 5000, 0, 0, OrderStatus::Delivered))
            .unwrap();
        docs.add_customer_payment(customer_payment("P1", "SO1", 5000))
            .unwrap();
        for (id, method, status) in [
            ("R1", PaymentMethod::Cash, RefundStatus::Completed),
            ("R2", PaymentMethod::StoreCredit, RefundStatus::Completed),
            ("R3", PaymentMethod::Cash, RefundStatus::Pending),
        ] {
            docs.add_invoice_refund(InvoiceRefund {
                id: id.to_string(),
                order_id: "SO1".to_string(),
                customer_id: "C1".to_string(),
                amount: BigDecimal::from(1000),
                method,
                status,
                refunded_at: "2024-03-05".to_string(),
                reason: None,
            })
            .unwrap();
        }

        let reconciler = DocumentReconciler::new(docs);
        let balance = reconciler.outstanding_for_order("SO1").await.unwrap();
        assert_eq!(balance.paid, BigDecimal::from(4000));
        assert_eq!(balance.outstanding, BigDecimal::from(1000));
    }

    #[tokio::test]
    async fn test_open_sets_filter_status_and_flag_overpayment() {
        let docs = MemoryDocuments::new();
        docs.add_sales_order(order("SO1", 1000, 0, 0, OrderStatus::Shipped))
            .unwrap();
        docs.add_sales_order(order("SO2", 1000, 0, 0, OrderStatus::Draft))
            .unwrap();
        docs.add_sales_order(order("SO3", 1000, 0, 0, OrderStatus::Cancelled))
            .unwrap();
        docs.add_sales_order(order("SO4", 1000, 1000, 0, OrderStatus::Delivered))
            .unwrap();
        docs.add_sales_order(order("SO5", 1000, 1200, 0, OrderStatus::Confirmed))
            .unwrap();
        docs.add_vendor_bill(bill("B1", 500, 0, BillStatus::Paid)).unwrap();
        docs.add_vendor_bill(bill("B2", 500, 100, BillStatus::Overdue))
            .unwrap();

        let reconciler = DocumentReconciler::new(docs);
        let receivables = reconciler.open_receivables(date(2024, 4, 1)).await.unwrap();
        let ids: Vec<_> = receivables
            .documents
            .iter()
            .map(|b| b.document_id.as_str())
            .collect();
        assert_eq!(ids, vec!["SO1"]);
        assert_eq!(receivables.anomalies.len(), 1);
        assert_eq!(
            receivables.anomalies[0].document,
            DocumentRef::SalesOrder("SO5".to_string())
        );
        assert_eq!(receivables.anomalies[0].outstanding, BigDecimal::from(-200));

        let payables = reconciler.open_payables(date(2024, 4, 1)).await.unwrap();
        assert_eq!(payables.documents.len(), 1);
        assert_eq!(payables.documents[0].outstanding, BigDecimal::from(400));
    }

    #[tokio::test]
    async fn test_unavailable_history_falls_back_to_cached_paid() {
        let docs = MemoryDocuments::new();
        docs.add_vendor_bill(bill("B1", 2000, 500, BillStatus::Pending))
            .unwrap();
        docs.set_unavailable(DocumentFeed::VendorPaymentHistory, true)
            .unwrap();

        let reconciler = DocumentReconciler::new(docs);
        let payables = reconciler.open_payables(date(2024, 4, 1)).await.unwrap();
        assert_eq!(payables.documents[0].outstanding, BigDecimal::from(1500));
        assert_eq!(payables.unavailable_sources, vec!["vendor_payment_history"]);

        let err = reconciler.outstanding_for_bill("B1").await.unwrap_err();
        assert!(matches!(err, LedgerError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unknown_document_is_not_found() {
        let reconciler = DocumentReconciler::new(MemoryDocuments::new());
        let err = reconciler.outstanding_for_order("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
