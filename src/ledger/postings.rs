//! Standard postings derived from business documents
//!
//! Each function maps one document to a balanced line list. They are pure:
//! account ids are resolved beforehand into [`PostingAccounts`], nothing is
//! read or written here.

use bigdecimal::BigDecimal;

use crate::documents::*;
use crate::types::*;

/// Resolved account ids the derivations post against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingAccounts {
    pub cash: String,
    pub bank: String,
    pub accounts_receivable: String,
    pub inventory: String,
    pub fixed_assets: String,
    pub accounts_payable: String,
    pub store_credit: String,
    pub loans_payable: String,
    pub refund_expense: String,
    pub operating_expense: String,
    pub interest_expense: String,
    /// Equity account of the partner named by the document, when it has one
    pub partner_equity: Option<String>,
}

impl PostingAccounts {
    /// Account money moves through for a payment method
    pub fn settlement_account(&self, method: PaymentMethod) -> String {
        match method {
            PaymentMethod::Cash => self.cash.clone(),
            PaymentMethod::StoreCredit => self.store_credit.clone(),
            _ => self.bank.clone(),
        }
    }

    fn partner_equity(&self, partner_id: &str) -> LedgerResult<String> {
        self.partner_equity.clone().ok_or_else(|| {
            LedgerError::Validation(format!(
                "No equity account resolved for partner '{}'",
                partner_id
            ))
        })
    }
}

fn request_for(document: &SourceDocument) -> LedgerResult<PostingRequest> {
    Ok(PostingRequest::new(
        document.source_type(),
        document.source_id().to_string(),
        document.entry_date()?,
        document.description(),
    ))
}

fn finish(mut request: PostingRequest, lines: Vec<PostingLine>) -> LedgerResult<PostingRequest> {
    request.lines = lines;
    request.validate()?;
    Ok(request)
}

/// Debit Cash/Bank, Credit Partner-Equity
pub fn investment(
    document: &SourceDocument,
    investment: &Investment,
    accounts: &PostingAccounts,
) -> LedgerResult<PostingRequest> {
    let equity = accounts.partner_equity(&investment.partner_id)?;
    finish(
        request_for(document)?,
        vec![
            PostingLine::debit(
                accounts.settlement_account(investment.method),
                investment.amount.clone(),
                Some("Capital received".to_string()),
            ),
            PostingLine::credit(
                equity,
                investment.amount.clone(),
                Some(format!("Capital contribution by {}", investment.partner_name)),
            ),
        ],
    )
}

/// Debit Partner-Equity, Credit Cash/Bank
pub fn withdrawal(
    document: &SourceDocument,
    withdrawal: &Withdrawal,
    accounts: &PostingAccounts,
) -> LedgerResult<PostingRequest> {
    let equity = accounts.partner_equity(&withdrawal.partner_id)?;
    finish(
        request_for(document)?,
        vec![
            PostingLine::debit(
                equity,
                withdrawal.amount.clone(),
                Some(format!("Drawings by {}", withdrawal.partner_name)),
            ),
            PostingLine::credit(
                accounts.settlement_account(withdrawal.method),
                withdrawal.amount.clone(),
                Some("Capital paid out".to_string()),
            ),
        ],
    )
}

/// Debit Inventory or Operating Expense, Credit Accounts-Payable
pub fn purchase_order(
    document: &SourceDocument,
    order: &PurchaseOrder,
    accounts: &PostingAccounts,
) -> LedgerResult<PostingRequest> {
    let debit_account = match order.category {
        PurchaseCategory::Inventory => accounts.inventory.clone(),
        PurchaseCategory::Expense => accounts.operating_expense.clone(),
    };
    finish(
        request_for(document)?,
        vec![
            PostingLine::debit(debit_account, order.total_amount.clone(), None),
            PostingLine::credit(
                accounts.accounts_payable.clone(),
                order.total_amount.clone(),
                Some(format!("Owed to supplier {}", order.supplier_id)),
            ),
        ],
    )
}

/// Debit Accounts-Payable, Credit Cash/Bank
pub fn supplier_payment(
    document: &SourceDocument,
    payment: &VendorPayment,
    accounts: &PostingAccounts,
) -> LedgerResult<PostingRequest> {
    let mut credit = PostingLine::credit(
        accounts.settlement_account(payment.method),
        payment.amount.clone(),
        None,
    );
    credit.reference = payment.reference.clone();
    finish(
        request_for(document)?,
        vec![
            PostingLine::debit(
                accounts.accounts_payable.clone(),
                payment.amount.clone(),
                Some(format!("Settles bill {}", payment.bill_id)),
            ),
            credit,
        ],
    )
}

/// Debit Cash/Bank, Credit Accounts-Receivable
pub fn customer_payment(
    document: &SourceDocument,
    payment: &CustomerPayment,
    accounts: &PostingAccounts,
) -> LedgerResult<PostingRequest> {
    let mut debit = PostingLine::debit(
        accounts.settlement_account(payment.method),
        payment.amount.clone(),
        None,
    );
    debit.reference = payment.reference.clone();
    finish(
        request_for(document)?,
        vec![
            debit,
            PostingLine::credit(
                accounts.accounts_receivable.clone(),
                payment.amount.clone(),
                Some(format!("Collected on order {}", payment.order_id)),
            ),
        ],
    )
}

/// Debit Refund-Expense, Credit Cash/Bank/Store-Credit
pub fn refund(
    document: &SourceDocument,
    refund: &InvoiceRefund,
    accounts: &PostingAccounts,
) -> LedgerResult<PostingRequest> {
    if refund.status != RefundStatus::Completed {
        return Err(LedgerError::Validation(format!(
            "Refund '{}' is not completed",
            refund.id
        )));
    }
    finish(
        request_for(document)?,
        vec![
            PostingLine::debit(
                accounts.refund_expense.clone(),
                refund.amount.clone(),
                refund.reason.clone(),
            ),
            PostingLine::credit(
                accounts.settlement_account(refund.method),
                refund.amount.clone(),
                Some(format!("Refunded on order {}", refund.order_id)),
            ),
        ],
    )
}

/// Debit Cash/Bank, Credit Loans-Payable
pub fn loan_disbursement(
    document: &SourceDocument,
    loan: &LoanDisbursement,
    accounts: &PostingAccounts,
) -> LedgerResult<PostingRequest> {
    finish(
        request_for(document)?,
        vec![
            PostingLine::debit(
                accounts.settlement_account(loan.method),
                loan.amount.clone(),
                Some("Loan proceeds".to_string()),
            ),
            PostingLine::credit(
                accounts.loans_payable.clone(),
                loan.amount.clone(),
                Some(format!("Owed to {}", loan.lender)),
            ),
        ],
    )
}

/// Debit Loans-Payable (principal) and Interest-Expense, Credit Cash/Bank
pub fn loan_repayment(
    document: &SourceDocument,
    payment: &LiabilityPayment,
    accounts: &PostingAccounts,
) -> LedgerResult<PostingRequest> {
    let zero = BigDecimal::from(0);
    let mut lines = Vec::with_capacity(3);
    if payment.principal > zero {
        lines.push(PostingLine::debit(
            accounts.loans_payable.clone(),
            payment.principal.clone(),
            Some("Principal".to_string()),
        ));
    }
    if payment.interest > zero {
        lines.push(PostingLine::debit(
            accounts.interest_expense.clone(),
            payment.interest.clone(),
            Some("Interest".to_string()),
        ));
    }
    lines.push(PostingLine::credit(
        accounts.settlement_account(payment.method),
        payment.total(),
        None,
    ));
    finish(request_for(document)?, lines)
}

/// Debit Operating Expense or Fixed Assets, Credit Cash/Bank
pub fn expense(
    document: &SourceDocument,
    expense: &Expense,
    accounts: &PostingAccounts,
) -> LedgerResult<PostingRequest> {
    let debit_account = match expense.kind {
        ExpenseKind::Operating => accounts.operating_expense.clone(),
        ExpenseKind::Capital => accounts.fixed_assets.clone(),
    };
    finish(
        request_for(document)?,
        vec![
            PostingLine::debit(debit_account, expense.amount.clone(), expense.description.clone()),
            PostingLine::credit(
                accounts.settlement_account(expense.method),
                expense.amount.clone(),
                None,
            ),
        ],
    )
}

/// Derive the standard posting for any supported document
pub fn derive(document: &SourceDocument, accounts: &PostingAccounts) -> LedgerResult<PostingRequest> {
    match document {
        SourceDocument::Investment(d) => investment(document, d, accounts),
        SourceDocument::Withdrawal(d) => withdrawal(document, d, accounts),
        SourceDocument::PurchaseOrder(d) => purchase_order(document, d, accounts),
        SourceDocument::SupplierPayment(d) => supplier_payment(document, d, accounts),
        SourceDocument::CustomerPayment(d) => customer_payment(document, d, accounts),
        SourceDocument::Refund(d) => refund(document, d, accounts),
        SourceDocument::LoanDisbursement(d) => loan_disbursement(document, d, accounts),
        SourceDocument::LoanRepayment(d) => loan_repayment(document, d, accounts),
        SourceDocument::Expense(d) => expense(document, d, accounts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn accounts() -> PostingAccounts {
        PostingAccounts {
            cash: "cash".into(),
            bank: "bank".into(),
            accounts_receivable: "ar".into(),
            inventory: "inventory".into(),
            fixed_assets: "fixed".into(),
            accounts_payable: "ap".into(),
            store_credit: "store_credit".into(),
            loans_payable: "loans".into(),
            refund_expense: "refunds".into(),
            operating_expense: "opex".into(),
            interest_expense: "interest".into(),
            partner_equity: Some("equity-p1".into()),
        }
    }

    fn sides(request: &PostingRequest) -> Vec<(String, EntryType, BigDecimal)> {
        request
            .lines
            .iter()
            .map(|l| (l.account_id.clone(), l.entry_type, l.amount.clone()))
            .collect()
    }

    #[test]
    fn test_investment_posting() {
        let doc = SourceDocument::Investment(Investment {
            id: "INV-1".into(),
            partner_id: "P1".into(),
            partner_name: "Karim".into(),
            amount: BigDecimal::from(50000),
            method: PaymentMethod::Cash,
            invested_at: "2024-01-10 10:00:00".into(),
        });
        let request = derive(&doc, &accounts()).unwrap();
        assert_eq!(request.source_type, SourceDocumentType::PartnerInvestment);
        assert_eq!(request.source_reference, "INV-1");
        assert_eq!(request.entry_date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(
            sides(&request),
            vec![
                ("cash".to_string(), EntryType::Debit, BigDecimal::from(50000)),
                ("equity-p1".to_string(), EntryType::Credit, BigDecimal::from(50000)),
            ]
        );
    }

    #[test]
    fn test_investment_without_partner_account_is_rejected() {
        let doc = SourceDocument::Investment(Investment {
            id: "INV-1".into(),
            partner_id: "P1".into(),
            partner_name: "Karim".into(),
            amount: BigDecimal::from(100),
            method: PaymentMethod::BankTransfer,
            invested_at: "2024-01-10".into(),
        });
        let mut resolved = accounts();
        resolved.partner_equity = None;
        assert!(derive(&doc, &resolved).unwrap_err().is_validation());
    }

    #[test]
    fn test_purchase_order_posting() {
        let doc = SourceDocument::PurchaseOrder(PurchaseOrder {
            id: "PO-3".into(),
            supplier_id: "S1".into(),
            total_amount: BigDecimal::from(8000),
            order_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            category: PurchaseCategory::Inventory,
        });
        let request = derive(&doc, &accounts()).unwrap();
        assert_eq!(
            sides(&request),
            vec![
                ("inventory".to_string(), EntryType::Debit, BigDecimal::from(8000)),
                ("ap".to_string(), EntryType::Credit, BigDecimal::from(8000)),
            ]
        );
    }

    #[test]
    fn test_store_credit_refund_credits_liability() {
        let doc = SourceDocument::Refund(InvoiceRefund {
            id: "RF-1".into(),
            order_id: "SO-1".into(),
            customer_id: "C1".into(),
            amount: BigDecimal::from(450),
            method: PaymentMethod::StoreCredit,
            status: RefundStatus::Completed,
            refunded_at: "2024-02-03T09:15:00".into(),
            reason: Some("Scratched table top".into()),
        });
        let request = derive(&doc, &accounts()).unwrap();
        assert_eq!(
            sides(&request),
            vec![
                ("refunds".to_string(), EntryType::Debit, BigDecimal::from(450)),
                ("store_credit".to_string(), EntryType::Credit, BigDecimal::from(450)),
            ]
        );
    }

    #[test]
    fn test_pending_refund_is_not_posted() {
        let doc = SourceDocument::Refund(InvoiceRefund {
            id: "RF-2".into(),
            order_id: "SO-1".into(),
            customer_id: "C1".into(),
            amount: BigDecimal::from(450),
            method: PaymentMethod::Cash,
            status: RefundStatus::Pending,
            refunded_at: "2024-02-03".into(),
            reason: None,
        });
        assert!(derive(&doc, &accounts()).is_err());
    }

    #[test]
    fn test_loan_repayment_splits_interest() {
        let doc = SourceDocument::LoanRepayment(LiabilityPayment {
            id: "LP-1".into(),
            loan_id: "L-1".into(),
            principal: BigDecimal::from(900),
            interest: BigDecimal::from(100),
            method: PaymentMethod::BankTransfer,
            paid_at: "2024-03-01".into(),
        });
        let request = derive(&doc, &accounts()).unwrap();
        assert_eq!(
            sides(&request),
            vec![
                ("loans".to_string(), EntryType::Debit, BigDecimal::from(900)),
                ("interest".to_string(), EntryType::Debit, BigDecimal::from(100)),
                ("bank".to_string(), EntryType::Credit, BigDecimal::from(1000)),
            ]
        );
    }

    #[test]
    fn test_zero_amount_payment_is_rejected() {
        let doc = SourceDocument::CustomerPayment(CustomerPayment {
            id: "PAY-0".into(),
            order_id: "SO-1".into(),
            customer_id: "C1".into(),
            amount: BigDecimal::from(0),
            method: PaymentMethod::Card,
            paid_at: "2024-03-01".into(),
            reference: None,
        });
        assert!(derive(&doc, &accounts()).unwrap_err().is_validation());
    }

    #[test]
    fn test_withdrawal_posting() {
        let doc = SourceDocument::Withdrawal(Withdrawal {
            id: "WD-1".into(),
            partner_id: "P1".into(),
            partner_name: "Karim".into(),
            amount: BigDecimal::from(3000),
            method: PaymentMethod::Cheque,
            withdrawn_at: "2024-05-02T14:00:00".into(),
        });
        let request = derive(&doc, &accounts()).unwrap();
        assert_eq!(request.source_type, SourceDocumentType::PartnerWithdrawal);
        assert_eq!(
            sides(&request),
            vec![
                ("equity-p1".to_string(), EntryType::Debit, BigDecimal::from(3000)),
                ("bank".to_string(), EntryType::Credit, BigDecimal::from(3000)),
            ]
        );
    }

    #[test]
    fn test_loan_disbursement_posting() {
        let doc = SourceDocument::LoanDisbursement(LoanDisbursement {
            id: "LN-1".into(),
            lender: "City Bank".into(),
            amount: BigDecimal::from(200000),
            method: PaymentMethod::BankTransfer,
            disbursed_at: "2024-05-01".into(),
        });
        let request = derive(&doc, &accounts()).unwrap();
        assert_eq!(request.source_type, SourceDocumentType::LoanDisbursement);
        assert_eq!(
            sides(&request),
            vec![
                ("bank".to_string(), EntryType::Debit, BigDecimal::from(200000)),
                ("loans".to_string(), EntryType::Credit, BigDecimal::from(200000)),
            ]
        );
    }

    #[test]
    fn test_expense_postings_by_kind() {
        let rent = Expense {
            id: "EX-1".into(),
            category: "rent".into(),
            kind: ExpenseKind::Operating,
            amount: BigDecimal::from(15000),
            method: PaymentMethod::Cash,
            incurred_at: "2024-05-01".into(),
            description: Some("Showroom rent".into()),
        };
        let saw = Expense {
            id: "EX-2".into(),
            category: "machinery".into(),
            kind: ExpenseKind::Capital,
            amount: BigDecimal::from(42000),
            method: PaymentMethod::MobileBanking,
            incurred_at: "2024-05-03".into(),
            description: None,
        };

        let request = derive(&SourceDocument::Expense(rent), &accounts()).unwrap();
        assert_eq!(
            sides(&request),
            vec![
                ("opex".to_string(), EntryType::Debit, BigDecimal::from(15000)),
                ("cash".to_string(), EntryType::Credit, BigDecimal::from(15000)),
            ]
        );
        assert_eq!(request.lines[0].description.as_deref(), Some("Showroom rent"));

        let request = derive(&SourceDocument::Expense(saw), &accounts()).unwrap();
        assert_eq!(
            sides(&request),
            vec![
                ("fixed".to_string(), EntryType::Debit, BigDecimal::from(42000)),
                ("bank".to_string(), EntryType::Credit, BigDecimal::from(42000)),
            ]
        );
    }

    #[test]
    fn test_supplier_payment_by_cheque_goes_through_bank() {
        let doc = SourceDocument::SupplierPayment(VendorPayment {
            id: "VP-1".into(),
            bill_id: "BILL-1".into(),
            supplier_id: "S1".into(),
            amount: BigDecimal::from(5000),
            method: PaymentMethod::Cheque,
            paid_at: "2024-05-04T10:00:00".into(),
            reference: Some("CHQ-2231".into()),
        });
        let request = derive(&doc, &accounts()).unwrap();
        assert_eq!(
            sides(&request),
            vec![
                ("ap".to_string(), EntryType::Debit, BigDecimal::from(5000)),
                ("bank".to_string(), EntryType::Credit, BigDecimal::from(5000)),
            ]
        );
        assert_eq!(request.lines[1].reference.as_deref(), Some("CHQ-2231"));
    }

    #[test]
    fn test_customer_payment_settlement_accounts() {
        let payment = |method| {
            SourceDocument::CustomerPayment(CustomerPayment {
                id: "PAY-1".into(),
                order_id: "SO-1".into(),
                customer_id: "C1".into(),
                amount: BigDecimal::from(2500),
                method,
                paid_at: "2024-05-04".into(),
                reference: None,
            })
        };

        let by_card = derive(&payment(PaymentMethod::Card), &accounts()).unwrap();
        assert_eq!(
            sides(&by_card),
            vec![
                ("bank".to_string(), EntryType::Debit, BigDecimal::from(2500)),
                ("ar".to_string(), EntryType::Credit, BigDecimal::from(2500)),
            ]
        );

        let by_credit = derive(&payment(PaymentMethod::StoreCredit), &accounts()).unwrap();
        assert_eq!(by_credit.lines[0].account_id, "store_credit");

        let in_cash = derive(&payment(PaymentMethod::Cash), &accounts()).unwrap();
        assert_eq!(in_cash.lines[0].account_id, "cash");
    }
}
