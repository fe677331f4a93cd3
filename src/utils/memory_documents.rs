//! In-memory document source for testing

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use crate::documents::*;
use crate::traits::DocumentSource;
use crate::types::*;

#[derive(Debug, Default)]
struct DocumentState {
    sales_orders: Vec<SalesOrder>,
    customer_payments: Vec<CustomerPayment>,
    invoice_refunds: Vec<InvoiceRefund>,
    vendor_bills: Vec<VendorBill>,
    vendor_payments: Vec<VendorPayment>,
    purchase_orders: Vec<PurchaseOrder>,
    investments: Vec<Investment>,
    withdrawals: Vec<Withdrawal>,
    loan_disbursements: Vec<LoanDisbursement>,
    liability_payments: Vec<LiabilityPayment>,
    expenses: Vec<Expense>,
    unavailable: HashSet<DocumentFeed>,
}

/// In-memory document tables standing in for the record store
///
/// Range-filtered feeds also return rows whose timestamp cannot be parsed,
/// the way a loosely typed table scan would.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocuments {
    state: Arc<RwLock<DocumentState>>,
}

fn poisoned<T>(_: PoisonError<T>) -> LedgerError {
    LedgerError::Storage("memory documents lock poisoned".to_string())
}

fn in_range(range: Option<&DateRange>, raw: &str) -> bool {
    match range {
        None => true,
        Some(range) => parse_timestamp(raw).is_none_or(|t| range.contains(t.date())),
    }
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read of a feed fail, as if its table were unreachable
    pub fn set_unavailable(&self, feed: DocumentFeed, unavailable: bool) -> LedgerResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if unavailable {
            state.unavailable.insert(feed);
        } else {
            state.unavailable.remove(&feed);
        }
        Ok(())
    }

    pub fn add_sales_order(&self, order: SalesOrder) -> LedgerResult<()> {
        self.state.write().map_err(poisoned)?.sales_orders.push(order);
        Ok(())
    }

    pub fn add_customer_payment(&self, payment: CustomerPayment) -> LedgerResult<()> {
        self.state
            .write()
            .map_err(poisoned)?
            .customer_payments
            .push(payment);
        Ok(())
    }

    pub fn add_invoice_refund(&self, refund: InvoiceRefund) -> LedgerResult<()> {
        self.state
            .write()
            .map_err(poisoned)?
            .invoice_refunds
            .push(refund);
        Ok(())
    }

    pub fn add_vendor_bill(&self, bill: VendorBill) -> LedgerResult<()> {
        self.state.write().map_err(poisoned)?.vendor_bills.push(bill);
        Ok(())
    }

    pub fn add_vendor_payment(&self, payment: VendorPayment) -> LedgerResult<()> {
        self.state
            .write()
            .map_err(poisoned)?
            .vendor_payments
            .push(payment);
        Ok(())
    }

    pub fn add_purchase_order(&self, order: PurchaseOrder) -> LedgerResult<()> {
        self.state
            .write()
            .map_err(poisoned)?
            .purchase_orders
            .push(order);
        Ok(())
    }

    pub fn add_investment(&self, investment: Investment) -> LedgerResult<()> {
        self.state
            .write()
            .map_err(poisoned)?
            .investments
            .push(investment);
        Ok(())
    }

    pub fn add_withdrawal(&self, withdrawal: Withdrawal) -> LedgerResult<()> {
        self.state
            .write()
            .map_err(poisoned)?
            .withdrawals
            .push(withdrawal);
        Ok(())
    }

    pub fn add_loan_disbursement(&self, loan: LoanDisbursement) -> LedgerResult<()> {
        self.state
            .write()
            .map_err(poisoned)?
            .loan_disbursements
            .push(loan);
        Ok(())
    }

    pub fn add_liability_payment(&self, payment: LiabilityPayment) -> LedgerResult<()> {
        self.state
            .write()
            .map_err(poisoned)?
            .liability_payments
            .push(payment);
        Ok(())
    }

    pub fn add_expense(&self, expense: Expense) -> LedgerResult<()> {
        self.state.write().map_err(poisoned)?.expenses.push(expense);
        Ok(())
    }

    /// Read one table, honouring simulated outages
    fn read<T, F>(&self, feed: DocumentFeed, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&DocumentState) -> T,
    {
        let state = self.state.read().map_err(poisoned)?;
        if state.unavailable.contains(&feed) {
            return Err(LedgerError::SourceUnavailable(feed.table_name().to_string()));
        }
        Ok(f(&state))
    }
}

#[async_trait]
impl DocumentSource for MemoryDocuments {
    async fn get_sales_order(&self, order_id: &str) -> LedgerResult<Option<SalesOrder>> {
        self.read(DocumentFeed::SalesOrders, |s| {
            s.sales_orders.iter().find(|o| o.id == order_id).cloned()
        })
    }

    async fn list_sales_orders(&self) -> LedgerResult<Vec<SalesOrder>> {
        self.read(DocumentFeed::SalesOrders, |s| s.sales_orders.clone())
    }

    async fn payments_for_order(&self, order_id: &str) -> LedgerResult<Vec<CustomerPayment>> {
        self.read(DocumentFeed::CustomerPayments, |s| {
            s.customer_payments
                .iter()
                .filter(|p| p.order_id == order_id)
                .cloned()
                .collect()
        })
    }

    async fn refunds_for_order(&self, order_id: &str) -> LedgerResult<Vec<InvoiceRefund>> {
        self.read(DocumentFeed::InvoiceRefunds, |s| {
            s.invoice_refunds
                .iter()
                .filter(|r| r.order_id == order_id)
                .cloned()
                .collect()
        })
    }

    async fn get_vendor_bill(&self, bill_id: &str) -> LedgerResult<Option<VendorBill>> {
        self.read(DocumentFeed::VendorBills, |s| {
            s.vendor_bills.iter().find(|b| b.id == bill_id).cloned()
        })
    }

    async fn list_vendor_bills(&self) -> LedgerResult<Vec<VendorBill>> {
        self.read(DocumentFeed::VendorBills, |s| s.vendor_bills.clone())
    }

    async fn payments_for_bill(&self, bill_id: &str) -> LedgerResult<Vec<VendorPayment>> {
        self.read(DocumentFeed::VendorPaymentHistory, |s| {
            s.vendor_payments
                .iter()
                .filter(|p| p.bill_id == bill_id)
                .cloned()
                .collect()
        })
    }

    async fn customer_payments(
        &self,
        range: Option<&DateRange>,
    ) -> LedgerResult<Vec<CustomerPayment>> {
        self.read(DocumentFeed::CustomerPayments, |s| {
            s.customer_payments
                .iter()
                .filter(|p| in_range(range, &p.paid_at))
                .cloned()
                .collect()
        })
    }

    async fn vendor_payments(&self, range: Option<&DateRange>) -> LedgerResult<Vec<VendorPayment>> {
        self.read(DocumentFeed::VendorPaymentHistory, |s| {
            s.vendor_payments
                .iter()
                .filter(|p| in_range(range, &p.paid_at))
                .cloned()
                .collect()
        })
    }

    async fn purchase_orders(&self, range: Option<&DateRange>) -> LedgerResult<Vec<PurchaseOrder>> {
        self.read(DocumentFeed::PurchaseOrders, |s| {
            s.purchase_orders
                .iter()
                .filter(|o| range.is_none_or(|r| r.contains(o.order_date)))
                .cloned()
                .collect()
        })
    }

    async fn investments(&self, range: Option<&DateRange>) -> LedgerResult<Vec<Investment>> {
        self.read(DocumentFeed::Investments, |s| {
            s.investments
                .iter()
                .filter(|i| in_range(range, &i.invested_at))
                .cloned()
                .collect()
        })
    }

    async fn withdrawals(&self, range: Option<&DateRange>) -> LedgerResult<Vec<Withdrawal>> {
        self.read(DocumentFeed::Withdrawals, |s| {
            s.withdrawals
                .iter()
                .filter(|w| in_range(range, &w.withdrawn_at))
                .cloned()
                .collect()
        })
    }

    async fn loan_disbursements(
        &self,
        range: Option<&DateRange>,
    ) -> LedgerResult<Vec<LoanDisbursement>> {
        self.read(DocumentFeed::LoanDisbursements, |s| {
            s.loan_disbursements
                .iter()
                .filter(|l| in_range(range, &l.disbursed_at))
                .cloned()
                .collect()
        })
    }

    async fn liability_payments(
        &self,
        range: Option<&DateRange>,
    ) -> LedgerResult<Vec<LiabilityPayment>> {
        self.read(DocumentFeed::LiabilityPayments, |s| {
            s.liability_payments
                .iter()
                .filter(|p| in_range(range, &p.paid_at))
                .cloned()
                .collect()
        })
    }

    async fn invoice_refunds(&self, range: Option<&DateRange>) -> LedgerResult<Vec<InvoiceRefund>> {
        self.read(DocumentFeed::InvoiceRefunds, |s| {
            s.invoice_refunds
                .iter()
                .filter(|r| in_range(range, &r.refunded_at))
                .cloned()
                .collect()
        })
    }

    async fn expenses(&self, range: Option<&DateRange>) -> LedgerResult<Vec<Expense>> {
        self.read(DocumentFeed::Expenses, |s| {
            s.expenses
                .iter()
                .filter(|e| in_range(range, &e.incurred_at))
                .cloned()
                .collect()
        })
    }
}
