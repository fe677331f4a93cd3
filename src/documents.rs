//! Business documents the ledger reads but does not own
//!
//! Sales orders, vendor bills and their payment trails are written by the
//! order and procurement workflows. Cash-bearing feeds keep their timestamps
//! as the record store returns them; [`parse_timestamp`] turns them into
//! [`NaiveDateTime`] and rejects anything it cannot read.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::{LedgerError, LedgerResult, SourceDocumentType};

/// How money moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    MobileBanking,
    Cheque,
    StoreCredit,
    Other,
}

impl PaymentMethod {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::MobileBanking => "mobile_banking",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::StoreCredit => "store_credit",
            PaymentMethod::Other => "other",
        }
    }

    /// Store credit settles against a liability, no cash changes hands
    pub fn moves_cash(&self) -> bool {
        !matches!(self, PaymentMethod::StoreCredit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Confirmed,
    Shipped,
    Delivered,
    ReadyForDelivery,
    PartialDeliveryReady,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Statuses whose orders can still carry an open receivable
    pub fn is_open_receivable(&self) -> bool {
        matches!(
            self,
            OrderStatus::Confirmed
                | OrderStatus::Shipped
                | OrderStatus::Delivered
                | OrderStatus::ReadyForDelivery
                | OrderStatus::PartialDeliveryReady
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Draft,
    Pending,
    Partial,
    Overdue,
    Paid,
    Cancelled,
}

impl BillStatus {
    /// Statuses whose bills can still carry an open payable
    pub fn is_open_payable(&self) -> bool {
        matches!(
            self,
            BillStatus::Pending | BillStatus::Partial | BillStatus::Overdue
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Completed,
    Rejected,
}

/// Sales order with its cached payment counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_contact: Option<String>,
    pub grand_total: BigDecimal,
    /// Denormalized counter maintained by the payment workflow
    pub paid_amount: BigDecimal,
    pub waived_amount: BigDecimal,
    pub created_at: NaiveDateTime,
    pub status: OrderStatus,
}

/// Payment received against a sales order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerPayment {
    pub id: String,
    pub order_id: String,
    pub customer_id: String,
    pub amount: BigDecimal,
    pub method: PaymentMethod,
    pub paid_at: String,
    pub reference: Option<String>,
}

/// Refund issued against a sales order's invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRefund {
    pub id: String,
    pub order_id: String,
    pub customer_id: String,
    pub amount: BigDecimal,
    pub method: PaymentMethod,
    pub status: RefundStatus,
    pub refunded_at: String,
    pub reason: Option<String>,
}

/// Supplier invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorBill {
    pub id: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub supplier_contact: Option<String>,
    pub total_amount: BigDecimal,
    /// Denormalized counter; may lag the payment history
    pub paid_amount: BigDecimal,
    pub bill_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: BillStatus,
}

/// One row of a vendor bill's payment history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorPayment {
    pub id: String,
    pub bill_id: String,
    pub supplier_id: String,
    pub amount: BigDecimal,
    pub method: PaymentMethod,
    pub paid_at: String,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseCategory {
    /// Stock for resale or production
    Inventory,
    /// Consumed immediately
    Expense,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: String,
    pub supplier_id: String,
    pub total_amount: BigDecimal,
    pub order_date: NaiveDate,
    pub category: PurchaseCategory,
}

/// Capital contributed by a partner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub id: String,
    pub partner_id: String,
    pub partner_name: String,
    pub amount: BigDecimal,
    pub method: PaymentMethod,
    pub invested_at: String,
}

/// Capital drawn by a partner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: String,
    pub partner_id: String,
    pub partner_name: String,
    pub amount: BigDecimal,
    pub method: PaymentMethod,
    pub withdrawn_at: String,
}

/// Opening of a loan: cash received from a lender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanDisbursement {
    pub id: String,
    pub lender: String,
    pub amount: BigDecimal,
    pub method: PaymentMethod,
    pub disbursed_at: String,
}

/// Repayment of a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiabilityPayment {
    pub id: String,
    pub loan_id: String,
    pub principal: BigDecimal,
    pub interest: BigDecimal,
    pub method: PaymentMethod,
    pub paid_at: String,
}

impl LiabilityPayment {
    pub fn total(&self) -> BigDecimal {
        &self.principal + &self.interest
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseKind {
    /// Day-to-day running costs
    Operating,
    /// Fixed-asset purchases (tools, vehicles, showroom fittings)
    Capital,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    /// Free-form bucket such as "rent" or "transport"
    pub category: String,
    pub kind: ExpenseKind,
    pub amount: BigDecimal,
    pub method: PaymentMethod,
    pub incurred_at: String,
    pub description: Option<String>,
}

/// Tables the ledger reads documents from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFeed {
    SalesOrders,
    CustomerPayments,
    InvoiceRefunds,
    VendorBills,
    VendorPaymentHistory,
    PurchaseOrders,
    Investments,
    Withdrawals,
    LoanDisbursements,
    LiabilityPayments,
    Expenses,
}

impl DocumentFeed {
    pub fn table_name(&self) -> &'static str {
        match self {
            DocumentFeed::SalesOrders => "sales_orders",
            DocumentFeed::CustomerPayments => "payments",
            DocumentFeed::InvoiceRefunds => "invoice_refunds",
            DocumentFeed::VendorBills => "vendor_bills",
            DocumentFeed::VendorPaymentHistory => "vendor_payment_history",
            DocumentFeed::PurchaseOrders => "purchase_orders",
            DocumentFeed::Investments => "investments",
            DocumentFeed::Withdrawals => "withdrawals",
            DocumentFeed::LoanDisbursements => "loan_opening_balances",
            DocumentFeed::LiabilityPayments => "liability_payments",
            DocumentFeed::Expenses => "expenses",
        }
    }
}

/// Document whose outstanding amount can be reconciled
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentRef {
    SalesOrder(String),
    VendorBill(String),
}

/// A business document that derives a journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceDocument {
    Investment(Investment),
    Withdrawal(Withdrawal),
    PurchaseOrder(PurchaseOrder),
    SupplierPayment(VendorPayment),
    CustomerPayment(CustomerPayment),
    Refund(InvoiceRefund),
    LoanDisbursement(LoanDisbursement),
    LoanRepayment(LiabilityPayment),
    Expense(Expense),
}

impl SourceDocument {
    pub fn source_type(&self) -> SourceDocumentType {
        match self {
            SourceDocument::Investment(_) => SourceDocumentType::PartnerInvestment,
            SourceDocument::Withdrawal(_) => SourceDocumentType::PartnerWithdrawal,
            SourceDocument::PurchaseOrder(_) => SourceDocumentType::PurchaseOrder,
            SourceDocument::SupplierPayment(_) => SourceDocumentType::SupplierPayment,
            SourceDocument::CustomerPayment(_) => SourceDocumentType::CustomerPayment,
            SourceDocument::Refund(_) => SourceDocumentType::InvoiceRefund,
            SourceDocument::LoanDisbursement(_) => SourceDocumentType::LoanDisbursement,
            SourceDocument::LoanRepayment(_) => SourceDocumentType::LoanRepayment,
            SourceDocument::Expense(_) => SourceDocumentType::Expense,
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            SourceDocument::Investment(d) => &d.id,
            SourceDocument::Withdrawal(d) => &d.id,
            SourceDocument::PurchaseOrder(d) => &d.id,
            SourceDocument::SupplierPayment(d) => &d.id,
            SourceDocument::CustomerPayment(d) => &d.id,
            SourceDocument::Refund(d) => &d.id,
            SourceDocument::LoanDisbursement(d) => &d.id,
            SourceDocument::LoanRepayment(d) => &d.id,
            SourceDocument::Expense(d) => &d.id,
        }
    }

    /// Total money moved by the document
    pub fn amount(&self) -> BigDecimal {
        match self {
            SourceDocument::Investment(d) => d.amount.clone(),
            SourceDocument::Withdrawal(d) => d.amount.clone(),
            SourceDocument::PurchaseOrder(d) => d.total_amount.clone(),
            SourceDocument::SupplierPayment(d) => d.amount.clone(),
            SourceDocument::CustomerPayment(d) => d.amount.clone(),
            SourceDocument::Refund(d) => d.amount.clone(),
            SourceDocument::LoanDisbursement(d) => d.amount.clone(),
            SourceDocument::LoanRepayment(d) => d.total(),
            SourceDocument::Expense(d) => d.amount.clone(),
        }
    }

    /// Accounting date of the document
    pub fn entry_date(&self) -> LedgerResult<NaiveDate> {
        let raw = match self {
            SourceDocument::PurchaseOrder(d) => return Ok(d.order_date),
            SourceDocument::Investment(d) => &d.invested_at,
            SourceDocument::Withdrawal(d) => &d.withdrawn_at,
            SourceDocument::SupplierPayment(d) => &d.paid_at,
            SourceDocument::CustomerPayment(d) => &d.paid_at,
            SourceDocument::Refund(d) => &d.refunded_at,
            SourceDocument::LoanDisbursement(d) => &d.disbursed_at,
            SourceDocument::LoanRepayment(d) => &d.paid_at,
            SourceDocument::Expense(d) => &d.incurred_at,
        };
        parse_timestamp(raw).map(|t| t.date()).ok_or_else(|| {
            LedgerError::Validation(format!(
                "{} '{}' has an unreadable date: '{}'",
                self.source_type(),
                self.source_id(),
                raw
            ))
        })
    }

    pub fn description(&self) -> String {
        match self {
            SourceDocument::Investment(d) => format!("Investment by {}", d.partner_name),
            SourceDocument::Withdrawal(d) => format!("Withdrawal by {}", d.partner_name),
            SourceDocument::PurchaseOrder(d) => {
                format!("Purchase order {} from supplier {}", d.id, d.supplier_id)
            }
            SourceDocument::SupplierPayment(d) => format!("Payment for vendor bill {}", d.bill_id),
            SourceDocument::CustomerPayment(d) => format!("Payment for order {}", d.order_id),
            SourceDocument::Refund(d) => format!("Refund for order {}", d.order_id),
            SourceDocument::LoanDisbursement(d) => format!("Loan received from {}", d.lender),
            SourceDocument::LoanRepayment(d) => format!("Repayment of loan {}", d.loan_id),
            SourceDocument::Expense(d) => match d.description {
                Some(ref text) => format!("{} expense: {}", d.category, text),
                None => format!("{} expense", d.category),
            },
        }
    }
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a stored timestamp; `None` when the value cannot be read
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> LedgerResult<Self> {
        if end < start {
            return Err(LedgerError::Validation(format!(
                "Date range ends ({}) before it starts ({})",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Every day of the range in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Whether a stored timestamp falls inside the range; unreadable values do not
    pub fn contains_timestamp(&self, raw: &str) -> bool {
        parse_timestamp(raw).is_some_and(|t| self.contains(t.date()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 3)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-05-03T14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-03 14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-03T14:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-03T20:30:00+06:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-05-03"),
            NaiveDate::from_ymd_opt(2024, 5, 3)
                .unwrap()
                .and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
    }

    #[test]
    fn test_open_status_sets() {
        assert!(OrderStatus::ReadyForDelivery.is_open_receivable());
        assert!(!OrderStatus::Draft.is_open_receivable());
        assert!(!OrderStatus::Cancelled.is_open_receivable());
        assert!(BillStatus::Overdue.is_open_payable());
        assert!(!BillStatus::Paid.is_open_payable());
    }

    #[test]
    fn test_date_range_days() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 2, 27).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        )
        .unwrap();
        assert_eq!(range.days().count(), 4);
        assert!(range.contains_timestamp("2024-02-29 23:59:59"));
        assert!(!range.contains_timestamp("not a date"));
    }

    #[test]
    fn test_unreadable_entry_date_is_validation_error() {
        let doc = SourceDocument::CustomerPayment(CustomerPayment {
            id: "PAY-1".into(),
            order_id: "SO-1".into(),
            customer_id: "C-1".into(),
            amount: BigDecimal::from(10),
            method: PaymentMethod::Cash,
            paid_at: "??".into(),
            reference: None,
        });
        assert!(doc.entry_date().unwrap_err().is_validation());
    }
}
