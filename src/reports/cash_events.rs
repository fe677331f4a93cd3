//! Normalized cash movements
//!
//! Every cash-bearing feed has its own row shape. Each gets one constructor
//! here that produces the same [`CashEvent`]; a row whose timestamp cannot be
//! read produces nothing.

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::documents::*;

/// Feed a cash event came from; declaration order breaks timestamp ties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashSourceKind {
    CustomerPayment,
    SupplierPayment,
    Expense,
    LoanDisbursement,
    LoanRepayment,
    Investment,
    Withdrawal,
    Refund,
}

impl CashSourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            CashSourceKind::CustomerPayment => "Customer payment",
            CashSourceKind::SupplierPayment => "Supplier payment",
            CashSourceKind::Expense => "Expense",
            CashSourceKind::LoanDisbursement => "Loan disbursement",
            CashSourceKind::LoanRepayment => "Loan repayment",
            CashSourceKind::Investment => "Partner investment",
            CashSourceKind::Withdrawal => "Partner withdrawal",
            CashSourceKind::Refund => "Refund",
        }
    }

    pub fn feed(&self) -> DocumentFeed {
        match self {
            CashSourceKind::CustomerPayment => DocumentFeed::CustomerPayments,
            CashSourceKind::SupplierPayment => DocumentFeed::VendorPaymentHistory,
            CashSourceKind::Expense => DocumentFeed::Expenses,
            CashSourceKind::LoanDisbursement => DocumentFeed::LoanDisbursements,
            CashSourceKind::LoanRepayment => DocumentFeed::LiabilityPayments,
            CashSourceKind::Investment => DocumentFeed::Investments,
            CashSourceKind::Withdrawal => DocumentFeed::Withdrawals,
            CashSourceKind::Refund => DocumentFeed::InvoiceRefunds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CashCategory {
    Operating,
    Investing,
    Financing,
}

impl CashCategory {
    pub const ALL: [CashCategory; 3] = [
        CashCategory::Operating,
        CashCategory::Investing,
        CashCategory::Financing,
    ];
}

enum Flow {
    In(BigDecimal),
    Out(BigDecimal),
}

/// One inflow or outflow of cash
///
/// `debit` is money in, `credit` is money out; exactly one is non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashEvent {
    pub time: NaiveDateTime,
    pub source_kind: CashSourceKind,
    pub category: CashCategory,
    pub payment_method: PaymentMethod,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    /// Document the movement settles or belongs to
    pub reference: String,
    pub source_id: String,
    /// Grouping label for expense breakdowns
    pub label: String,
}

impl CashEvent {
    fn build(
        raw_time: &str,
        source_kind: CashSourceKind,
        category: CashCategory,
        payment_method: PaymentMethod,
        flow: Flow,
        reference: &str,
        source_id: &str,
    ) -> Option<Self> {
        let time = parse_timestamp(raw_time)?;
        let (debit, credit) = match flow {
            Flow::In(amount) => (amount, BigDecimal::from(0)),
            Flow::Out(amount) => (BigDecimal::from(0), amount),
        };
        Some(Self {
            time,
            source_kind,
            category,
            payment_method,
            debit,
            credit,
            reference: reference.to_string(),
            source_id: source_id.to_string(),
            label: source_kind.label().to_string(),
        })
    }

    pub fn customer_payment(payment: &CustomerPayment) -> Option<Self> {
        Self::build(
            &payment.paid_at,
            CashSourceKind::CustomerPayment,
            CashCategory::Operating,
            payment.method,
            Flow::In(payment.amount.clone()),
            &payment.order_id,
            &payment.id,
        )
    }

    pub fn supplier_payment(payment: &VendorPayment) -> Option<Self> {
        Self::build(
            &payment.paid_at,
            CashSourceKind::SupplierPayment,
            CashCategory::Operating,
            payment.method,
            Flow::Out(payment.amount.clone()),
            &payment.bill_id,
            &payment.id,
        )
    }

    /// Capital expenses are investing outflows, the rest operating
    pub fn expense(expense: &Expense) -> Option<Self> {
        let category = match expense.kind {
            ExpenseKind::Operating => CashCategory::Operating,
            ExpenseKind::Capital => CashCategory::Investing,
        };
        Self::build(
            &expense.incurred_at,
            CashSourceKind::Expense,
            category,
            expense.method,
            Flow::Out(expense.amount.clone()),
            &expense.category,
            &expense.id,
        )
        .map(|event| CashEvent {
            label: expense.category.clone(),
            ..event
        })
    }

    pub fn loan_disbursement(loan: &LoanDisbursement) -> Option<Self> {
        Self::build(
            &loan.disbursed_at,
            CashSourceKind::LoanDisbursement,
            CashCategory::Financing,
            loan.method,
            Flow::In(loan.amount.clone()),
            &loan.lender,
            &loan.id,
        )
    }

    /// Principal and interest leave together
    pub fn loan_repayment(payment: &LiabilityPayment) -> Option<Self> {
        Self::build(
            &payment.paid_at,
            CashSourceKind::LoanRepayment,
            CashCategory::Financing,
            payment.method,
            Flow::Out(payment.total()),
            &payment.loan_id,
            &payment.id,
        )
    }

    pub fn investment(investment: &Investment) -> Option<Self> {
        Self::build(
            &investment.invested_at,
            CashSourceKind::Investment,
            CashCategory::Financing,
            investment.method,
            Flow::In(investment.amount.clone()),
            &investment.partner_id,
            &investment.id,
        )
    }

    pub fn withdrawal(withdrawal: &Withdrawal) -> Option<Self> {
        Self::build(
            &withdrawal.withdrawn_at,
            CashSourceKind::Withdrawal,
            CashCategory::Financing,
            withdrawal.method,
            Flow::Out(withdrawal.amount.clone()),
            &withdrawal.partner_id,
            &withdrawal.id,
        )
    }

    pub fn refund(refund: &InvoiceRefund) -> Option<Self> {
        Self::build(
            &refund.refunded_at,
            CashSourceKind::Refund,
            CashCategory::Operating,
            refund.method,
            Flow::Out(refund.amount.clone()),
            &refund.order_id,
            &refund.id,
        )
    }

    pub fn net(&self) -> BigDecimal {
        &self.debit - &self.credit
    }

    pub fn is_inflow(&self) -> bool {
        self.debit > BigDecimal::from(0)
    }

    /// Time ascending, then source kind, then source id
    pub fn timeline_order(a: &CashEvent, b: &CashEvent) -> Ordering {
        a.time
            .cmp(&b.time)
            .then_with(|| a.source_kind.cmp(&b.source_kind))
            .then_with(|| a.source_id.cmp(&b.source_id))
    }
}
