//! Chart of accounts management

use bigdecimal::BigDecimal;
use std::collections::HashMap;

use crate::config::AccountCodes;
use crate::traits::*;
use crate::types::*;

/// Account manager for handling chart of accounts operations
pub struct AccountManager<S: LedgerStorage> {
    pub(crate) storage: S,
    validator: Box<dyn AccountValidator>,
}

impl<S: LedgerStorage> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultAccountValidator),
        }
    }

    /// Create a new account manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn AccountValidator>) -> Self {
        Self { storage, validator }
    }

    /// Create a new account
    pub async fn create_account(
        &self,
        code: String,
        name: String,
        account_type: AccountType,
        parent_id: Option<String>,
        opening_balance: BigDecimal,
    ) -> LedgerResult<Account> {
        let account =
            Account::new(code, name, account_type, parent_id).with_opening_balance(opening_balance);

        self.validator.validate_account(&account)?;

        if self.storage.get_account_by_code(&account.code).await?.is_some() {
            return Err(LedgerError::DuplicateAccount(account.code));
        }

        // Validate parent account exists if specified
        if let Some(ref parent_id) = account.parent_id {
            if self.storage.get_account(parent_id).await?.is_none() {
                return Err(LedgerError::Validation(format!(
                    "Parent account '{}' does not exist",
                    parent_id
                )));
            }
        }

        self.storage.save_account(&account).await?;
        log::info!("created account {} ({})", account.code, account.name);

        Ok(account)
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        self.storage.get_account(account_id).await
    }

    /// Get an account by ID, returning an error if not found
    pub async fn get_account_required(&self, account_id: &str) -> LedgerResult<Account> {
        self.storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    /// Get an account by code, returning an error if not found
    pub async fn get_account_by_code(&self, code: &str) -> LedgerResult<Account> {
        self.storage
            .get_account_by_code(code)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(code.to_string()))
    }

    /// List accounts matching a filter
    pub async fn list_accounts(&self, filter: &AccountFilter) -> LedgerResult<Vec<Account>> {
        self.storage.list_accounts(filter).await
    }

    /// Retire an account; its history and balance stay, new postings are refused
    pub async fn deactivate_account(&self, account_id: &str) -> LedgerResult<Account> {
        let account = self.storage.set_account_active(account_id, false).await?;
        log::info!("deactivated account {}", account.code);
        Ok(account)
    }

    pub async fn reactivate_account(&self, account_id: &str) -> LedgerResult<Account> {
        self.storage.set_account_active(account_id, true).await
    }

    /// Get the running balance of an account
    pub async fn get_balance(&self, account_id: &str) -> LedgerResult<BigDecimal> {
        Ok(self.get_account_required(account_id).await?.current_balance)
    }

    /// Return the account with `code`, creating it on first use
    ///
    /// Two requests racing to create the same code both end up with the
    /// account the winner stored.
    pub async fn ensure_account(
        &self,
        code: &str,
        name: &str,
        account_type: AccountType,
        parent_id: Option<String>,
    ) -> LedgerResult<Account> {
        if let Some(existing) = self.storage.get_account_by_code(code).await? {
            return Ok(existing);
        }

        match self
            .create_account(
                code.to_string(),
                name.to_string(),
                account_type,
                parent_id,
                BigDecimal::from(0),
            )
            .await
        {
            Err(LedgerError::DuplicateAccount(_)) => self.get_account_by_code(code).await,
            other => other,
        }
    }

    /// Equity account of a partner, `<partner_capital>-<partner_id>`
    pub async fn ensure_partner_equity_account(
        &self,
        codes: &AccountCodes,
        partner_id: &str,
        partner_name: &str,
    ) -> LedgerResult<Account> {
        if partner_id.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Partner id is required for an equity account".to_string(),
            ));
        }

        let parent_id = self
            .storage
            .get_account_by_code(&codes.partner_capital)
            .await?
            .map(|parent| parent.id);

        self.ensure_account(
            &codes.partner_equity(partner_id),
            &format!("Partner Capital - {}", partner_name),
            AccountType::Equity,
            parent_id,
        )
        .await
    }

    /// All direct child accounts of a parent account
    pub async fn child_accounts(&self, parent_id: &str) -> LedgerResult<Vec<Account>> {
        let all_accounts = self.list_accounts(&AccountFilter::default()).await?;
        Ok(all_accounts
            .into_iter()
            .filter(|account| account.parent_id.as_deref() == Some(parent_id))
            .collect())
    }

    /// The full path to an account, root first
    pub async fn account_path(&self, account_id: &str) -> LedgerResult<Vec<Account>> {
        let mut path: Vec<Account> = Vec::new();
        let mut current_account_id = Some(account_id.to_string());

        while let Some(id) = current_account_id {
            if path.iter().any(|a| a.id == id) {
                return Err(LedgerError::InvalidState(format!(
                    "Account hierarchy loops at '{}'",
                    id
                )));
            }
            let account = self.get_account_required(&id).await?;
            current_account_id = account.parent_id.clone();
            path.insert(0, account);
        }

        Ok(path)
    }
}

/// Utility functions for working with accounts
pub mod utils {
    use super::*;

    /// Create the standard chart of accounts for a furniture business
    ///
    /// Accounts that already exist are returned as they are, so the call can
    /// be repeated safely.
    pub async fn create_standard_chart<S: LedgerStorage>(
        account_manager: &AccountManager<S>,
        codes: &AccountCodes,
    ) -> LedgerResult<HashMap<String, Account>> {
        let chart: [(&str, &String, &str, AccountType); 14] = [
            ("cash", &codes.cash, "Cash in Hand", AccountType::Asset),
            ("bank", &codes.bank, "Bank Accounts", AccountType::Asset),
            (
                "accounts_receivable",
                &codes.accounts_receivable,
                "Accounts Receivable",
                AccountType::Asset,
            ),
            ("inventory", &codes.inventory, "Inventory", AccountType::Asset),
            (
                "fixed_assets",
                &codes.fixed_assets,
                "Furniture, Fixtures and Equipment",
                AccountType::Asset,
            ),
            (
                "accounts_payable",
                &codes.accounts_payable,
                "Accounts Payable",
                AccountType::Liability,
            ),
            (
                "store_credit",
                &codes.store_credit,
                "Customer Store Credit",
                AccountType::Liability,
            ),
            (
                "loans_payable",
                &codes.loans_payable,
                "Loans Payable",
                AccountType::Liability,
            ),
            (
                "partner_capital",
                &codes.partner_capital,
                "Partner Capital",
                AccountType::Equity,
            ),
            (
                "sales_revenue",
                &codes.sales_revenue,
                "Furniture Sales",
                AccountType::Revenue,
            ),
            (
                "cost_of_goods_sold",
                &codes.cost_of_goods_sold,
                "Cost of Goods Sold",
                AccountType::Expense,
            ),
            (
                "refund_expense",
                &codes.refund_expense,
                "Sales Refunds",
                AccountType::Expense,
            ),
            (
                "operating_expense",
                &codes.operating_expense,
                "Operating Expenses",
                AccountType::Expense,
            ),
            (
                "interest_expense",
                &codes.interest_expense,
                "Interest Expense",
                AccountType::Expense,
            ),
        ];

        let mut accounts = HashMap::new();
        for (key, code, name, account_type) in chart {
            let account = account_manager
                .ensure_account(code, name, account_type, None)
                .await?;
            accounts.insert(key.to_string(), account);
        }

        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::MemoryStorage;

    #[tokio::test]
    async fn test_partner_equity_account_created_once() {
        let manager = AccountManager::new(MemoryStorage::new());
        let codes = AccountCodes::default();
        let chart = utils::create_standard_chart(&manager, &codes).await.unwrap();

        let first = manager
            .ensure_partner_equity_account(&codes, "P7", "Rahim")
            .await
            .unwrap();
        let second = manager
            .ensure_partner_equity_account(&codes, "P7", "Rahim")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.code, "3015-P7");
        assert_eq!(first.account_type, AccountType::Equity);
        assert_eq!(first.parent_id, Some(chart["partner_capital"].id.clone()));

        let path = manager.account_path(&first.id).await.unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].code, "3015");
    }

    #[tokio::test]
    async fn test_standard_chart_is_repeatable() {
        let manager = AccountManager::new(MemoryStorage::new());
        let codes = AccountCodes::default();
        let first = utils::create_standard_chart(&manager, &codes).await.unwrap();
        let second = utils::create_standard_chart(&manager, &codes).await.unwrap();
        assert_eq!(first["cash"].id, second["cash"].id);
        assert_eq!(
            manager
                .list_accounts(&AccountFilter::default())
                .await
                .unwrap()
                .len(),
            14
        );
    }

    #[tokio::test]
    async fn test_unknown_parent_rejected() {
        let manager = AccountManager::new(MemoryStorage::new());
        let result = manager
            .create_account(
                "1011".to_string(),
                "Petty Cash".to_string(),
                AccountType::Asset,
                Some("missing".to_string()),
                BigDecimal::from(0),
            )
            .await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_malformed_code_rejected_by_default() {
        let manager = AccountManager::new(MemoryStorage::new());
        for code in ["10 10".to_string(), "1".repeat(51)] {
            let result = manager
                .create_account(
                    code,
                    "Petty Cash".to_string(),
                    AccountType::Asset,
                    None,
                    BigDecimal::from(0),
                )
                .await;
            assert!(matches!(result, Err(LedgerError::Validation(_))));
        }
        assert!(manager
            .list_accounts(&AccountFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_deactivated_account_is_filtered() {
        let manager = AccountManager::new(MemoryStorage::new());
        let account = manager
            .create_account(
                "1011".to_string(),
                "Petty Cash".to_string(),
                AccountType::Asset,
                None,
                BigDecimal::from(500),
            )
            .await
            .unwrap();
        manager.deactivate_account(&account.id).await.unwrap();

        assert!(manager
            .list_accounts(&AccountFilter::active())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            manager.get_balance(&account.id).await.unwrap(),
            BigDecimal::from(500)
        );
    }
}
