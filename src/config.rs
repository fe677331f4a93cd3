//! Ledger configuration
//!
//! Account codes used by the derived postings, journal numbering and
//! defaults for automatically created entries. Every field has a default so a
//! partial JSON document is enough to override a single code.

use serde::{Deserialize, Serialize};

use crate::types::{LedgerError, LedgerResult};

/// Codes of the control accounts the derived postings resolve against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountCodes {
    pub cash: String,
    pub bank: String,
    pub accounts_receivable: String,
    pub inventory: String,
    pub fixed_assets: String,
    pub accounts_payable: String,
    pub store_credit: String,
    pub loans_payable: String,
    /// Control account for partner capital; partner accounts are `<code>-<partner_id>`
    pub partner_capital: String,
    pub sales_revenue: String,
    pub cost_of_goods_sold: String,
    pub refund_expense: String,
    pub operating_expense: String,
    pub interest_expense: String,
}

impl Default for AccountCodes {
    fn default() -> Self {
        Self {
            cash: "1010".to_string(),
            bank: "1020".to_string(),
            accounts_receivable: "1200".to_string(),
            inventory: "1300".to_string(),
            fixed_assets: "1500".to_string(),
            accounts_payable: "2010".to_string(),
            store_credit: "2050".to_string(),
            loans_payable: "2100".to_string(),
            partner_capital: "3015".to_string(),
            sales_revenue: "4010".to_string(),
            cost_of_goods_sold: "5010".to_string(),
            refund_expense: "5200".to_string(),
            operating_expense: "6010".to_string(),
            interest_expense: "6500".to_string(),
        }
    }
}

impl AccountCodes {
    /// Code of a partner's equity account
    pub fn partner_equity(&self, partner_id: &str) -> String {
        format!("{}-{}", self.partner_capital, partner_id)
    }

    fn all(&self) -> [(&'static str, &String); 14] {
        [
            ("cash", &self.cash),
            ("bank", &self.bank),
            ("accounts_receivable", &self.accounts_receivable),
            ("inventory", &self.inventory),
            ("fixed_assets", &self.fixed_assets),
            ("accounts_payable", &self.accounts_payable),
            ("store_credit", &self.store_credit),
            ("loans_payable", &self.loans_payable),
            ("partner_capital", &self.partner_capital),
            ("sales_revenue", &self.sales_revenue),
            ("cost_of_goods_sold", &self.cost_of_goods_sold),
            ("refund_expense", &self.refund_expense),
            ("operating_expense", &self.operating_expense),
            ("interest_expense", &self.interest_expense),
        ]
    }
}

/// Top-level ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub accounts: AccountCodes,
    /// Prefix of generated journal numbers
    pub journal_number_prefix: String,
    /// Recorded as `created_by` when a posting does not name a user
    pub default_created_by: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            accounts: AccountCodes::default(),
            journal_number_prefix: "JV".to_string(),
            default_created_by: "system".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> LedgerResult<Self> {
        let config: LedgerConfig =
            serde_json::from_str(json).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.journal_number_prefix.trim().is_empty() {
            return Err(LedgerError::Config(
                "journal_number_prefix cannot be empty".to_string(),
            ));
        }

        let codes = self.accounts.all();
        for (i, (name, code)) in codes.iter().enumerate() {
            if code.trim().is_empty() {
                return Err(LedgerError::Config(format!(
                    "account code '{}' cannot be empty",
                    name
                )));
            }
            if let Some((other, _)) = codes[i + 1..].iter().find(|(_, c)| c == code) {
                return Err(LedgerError::Config(format!(
                    "account codes '{}' and '{}' share the code {}",
                    name, other, code
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            LedgerConfig::from_json_str(r#"{"accounts": {"cash": "1001"}, "journal_number_prefix": "GJ"}"#)
                .unwrap();
        assert_eq!(config.accounts.cash, "1001");
        assert_eq!(config.accounts.bank, "1020");
        assert_eq!(config.journal_number_prefix, "GJ");
        assert_eq!(config.default_created_by, "system");
    }

    #[test]
    fn test_duplicate_codes_rejected() {
        let err = LedgerConfig::from_json_str(r#"{"accounts": {"bank": "1010"}}"#).unwrap_err();
        assert!(matches!(err, LedgerError::Config(_)));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(LedgerConfig::from_json_str("{accounts").is_err());
    }

    #[test]
    fn test_partner_equity_code() {
        let codes = AccountCodes::default();
        assert_eq!(codes.partner_equity("42"), "3015-42");
    }
}
