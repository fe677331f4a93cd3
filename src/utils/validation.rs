//! Validation utilities

use crate::traits::*;
use crate::types::*;
use bigdecimal::BigDecimal;
use std::collections::HashSet;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> LedgerResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(LedgerError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that an account code is valid
pub fn validate_account_code(code: &str) -> LedgerResult<()> {
    if code.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account code cannot be empty".to_string(),
        ));
    }

    if code.len() > 50 {
        return Err(LedgerError::Validation(
            "Account code cannot exceed 50 characters".to_string(),
        ));
    }

    // Partner accounts append their id with a dash, e.g. 3015-P7
    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(LedgerError::Validation(
            "Account code can only contain alphanumeric characters, dashes, and underscores"
                .to_string(),
        ));
    }

    Ok(())
}

/// Validate that an account name is valid
pub fn validate_account_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account name cannot be empty".to_string(),
        ));
    }

    if name.len() > 100 {
        return Err(LedgerError::Validation(
            "Account name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a journal description is valid
pub fn validate_journal_description(description: &str) -> LedgerResult<()> {
    if description.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Journal description cannot be empty".to_string(),
        ));
    }

    if description.len() > 500 {
        return Err(LedgerError::Validation(
            "Journal description cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// Enhanced journal validator with detailed checks
pub struct EnhancedJournalValidator;

impl JournalValidator for EnhancedJournalValidator {
    fn validate_posting(&self, request: &PostingRequest) -> LedgerResult<()> {
        request.validate()?;

        validate_journal_description(&request.description)?;

        for line in &request.lines {
            if line.account_id.trim().is_empty() {
                return Err(LedgerError::Validation(
                    "Journal line is missing its account".to_string(),
                ));
            }
            validate_positive_amount(&line.amount)?;
        }

        // Same account cannot appear twice on the same side
        let mut combinations = HashSet::new();
        for line in &request.lines {
            if !combinations.insert((&line.account_id, line.entry_type)) {
                return Err(LedgerError::Validation(format!(
                    "Account '{}' appears multiple times with the same side in one entry",
                    line.account_id
                )));
            }
        }

        Ok(())
    }
}

/// Enhanced account validator with detailed checks
pub struct EnhancedAccountValidator;

impl AccountValidator for EnhancedAccountValidator {
    fn validate_account(&self, account: &Account) -> LedgerResult<()> {
        validate_account_code(&account.code)?;
        validate_account_name(&account.name)?;

        if account.normal_balance != account.account_type.normal_balance() {
            return Err(LedgerError::Validation(format!(
                "Account '{}' has a normal balance that does not match its type",
                account.code
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_account_code_rules() {
        assert!(validate_account_code("3015-P7").is_ok());
        assert!(validate_account_code("").is_err());
        assert!(validate_account_code("10 10").is_err());
        assert!(validate_account_code(&"9".repeat(51)).is_err());
    }

    #[test]
    fn test_enhanced_validator_rejects_repeated_side() {
        let mut request = PostingRequest::new(
            SourceDocumentType::Manual,
            String::new(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "Split".to_string(),
        );
        request.lines = vec![
            PostingLine::debit("cash".into(), BigDecimal::from(50), None),
            PostingLine::debit("cash".into(), BigDecimal::from(50), None),
            PostingLine::credit("equity".into(), BigDecimal::from(100), None),
        ];
        assert!(DefaultJournalValidator.validate_posting(&request).is_ok());
        assert!(EnhancedJournalValidator.validate_posting(&request).is_err());
    }

    #[test]
    fn test_enhanced_validator_requires_description() {
        let mut request = PostingRequest::new(
            SourceDocumentType::Manual,
            String::new(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "  ".to_string(),
        );
        request.lines = vec![
            PostingLine::debit("cash".into(), BigDecimal::from(50), None),
            PostingLine::credit("equity".into(), BigDecimal::from(50), None),
        ];
        assert!(EnhancedJournalValidator.validate_posting(&request).is_err());
    }
}
