//! Receivable and payable aging

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::reconciliation::{Anomaly, DocumentReconciler, OpenDocuments, OutstandingBalance};
use crate::traits::DocumentSource;
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgingKind {
    Receivables,
    Payables,
}

/// One of the five aging periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgingPeriod {
    Current,
    Days1To30,
    Days31To60,
    Days61To90,
    Days90Plus,
}

impl AgingPeriod {
    /// Period for a number of days outstanding; boundaries are inclusive
    pub fn for_days(days_outstanding: i64) -> Self {
        match days_outstanding {
            d if d <= 0 => AgingPeriod::Current,
            d if d <= 30 => AgingPeriod::Days1To30,
            d if d <= 60 => AgingPeriod::Days31To60,
            d if d <= 90 => AgingPeriod::Days61To90,
            _ => AgingPeriod::Days90Plus,
        }
    }
}

/// Amounts split across the five aging periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingBucket {
    pub current: BigDecimal,
    pub days_1_to_30: BigDecimal,
    pub days_31_to_60: BigDecimal,
    pub days_61_to_90: BigDecimal,
    pub days_90_plus: BigDecimal,
}

impl Default for AgingBucket {
    fn default() -> Self {
        Self {
            current: BigDecimal::from(0),
            days_1_to_30: BigDecimal::from(0),
            days_31_to_60: BigDecimal::from(0),
            days_61_to_90: BigDecimal::from(0),
            days_90_plus: BigDecimal::from(0),
        }
    }
}

impl AgingBucket {
    pub fn add(&mut self, period: AgingPeriod, amount: &BigDecimal) {
        let slot = match period {
            AgingPeriod::Current => &mut self.current,
            AgingPeriod::Days1To30 => &mut self.days_1_to_30,
            AgingPeriod::Days31To60 => &mut self.days_31_to_60,
            AgingPeriod::Days61To90 => &mut self.days_61_to_90,
            AgingPeriod::Days90Plus => &mut self.days_90_plus,
        };
        *slot += amount;
    }

    pub fn amount(&self, period: AgingPeriod) -> &BigDecimal {
        match period {
            AgingPeriod::Current => &self.current,
            AgingPeriod::Days1To30 => &self.days_1_to_30,
            AgingPeriod::Days31To60 => &self.days_31_to_60,
            AgingPeriod::Days61To90 => &self.days_61_to_90,
            AgingPeriod::Days90Plus => &self.days_90_plus,
        }
    }

    pub fn total(&self) -> BigDecimal {
        &self.current
            + &self.days_1_to_30
            + &self.days_31_to_60
            + &self.days_61_to_90
            + &self.days_90_plus
    }
}

/// Aging of everything one customer or supplier owes or is owed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyAgingRow {
    pub party_id: String,
    pub party_name: String,
    pub party_contact: Option<String>,
    pub buckets: AgingBucket,
    pub total_due: BigDecimal,
    /// Largest days outstanding across the party's documents
    pub oldest_days: i64,
    pub oldest_date: NaiveDate,
    pub document_count: usize,
}

impl PartyAgingRow {
    fn start(balance: &OutstandingBalance, days: i64) -> Self {
        Self {
            party_id: balance.party_id.clone(),
            party_name: balance.party_name.clone(),
            party_contact: balance.party_contact.clone(),
            buckets: AgingBucket::default(),
            total_due: BigDecimal::from(0),
            oldest_days: days,
            oldest_date: balance.origin_date,
            document_count: 0,
        }
    }

    fn merge(&mut self, balance: &OutstandingBalance, days: i64, period: AgingPeriod) {
        self.buckets.add(period, &balance.outstanding);
        self.total_due += &balance.outstanding;
        self.document_count += 1;
        if days > self.oldest_days {
            self.oldest_days = days;
            self.oldest_date = balance.origin_date;
        }
        if self.party_contact.is_none() {
            self.party_contact = balance.party_contact.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgingReport {
    pub as_of_date: NaiveDate,
    pub kind: AgingKind,
    pub summary: AgingBucket,
    pub grand_total: BigDecimal,
    /// Sorted by `total_due` descending
    pub details: Vec<PartyAgingRow>,
    pub anomalies: Vec<Anomaly>,
    pub unavailable_sources: Vec<String>,
}

/// Buckets open documents by days outstanding
pub struct AgingCalculator<D: DocumentSource> {
    reconciler: DocumentReconciler<D>,
}

impl<D: DocumentSource> AgingCalculator<D> {
    pub fn new(source: D) -> Self {
        Self {
            reconciler: DocumentReconciler::new(source),
        }
    }

    pub fn from_reconciler(reconciler: DocumentReconciler<D>) -> Self {
        Self { reconciler }
    }

    pub async fn build_aging_report(
        &self,
        as_of: NaiveDate,
        kind: AgingKind,
    ) -> LedgerResult<AgingReport> {
        let open = match kind {
            AgingKind::Receivables => self.reconciler.open_receivables(as_of).await,
            AgingKind::Payables => self.reconciler.open_payables(as_of).await,
        };
        let open = match open {
            Ok(open) => open,
            Err(LedgerError::SourceUnavailable(table)) => {
                log::warn!("{} unavailable, aging report is empty", table);
                OpenDocuments {
                    unavailable_sources: vec![table],
                    ..OpenDocuments::default()
                }
            }
            Err(e) => return Err(e),
        };

        Ok(age_documents(as_of, kind, open))
    }
}

/// Bucket already reconciled documents
pub fn age_documents(as_of: NaiveDate, kind: AgingKind, open: OpenDocuments) -> AgingReport {
    let mut summary = AgingBucket::default();
    let mut rows: HashMap<String, PartyAgingRow> = HashMap::new();

    for balance in &open.documents {
        let days = (as_of - balance.origin_date).num_days();
        let period = AgingPeriod::for_days(days);

        summary.add(period, &balance.outstanding);
        rows.entry(balance.party_id.clone())
            .or_insert_with(|| PartyAgingRow::start(balance, days))
            .merge(balance, days, period);
    }

    let mut details: Vec<PartyAgingRow> = rows.into_values().collect();
    details.sort_by(|a, b| {
        b.total_due
            .cmp(&a.total_due)
            .then_with(|| a.party_id.cmp(&b.party_id))
    });

    AgingReport {
        as_of_date: as_of,
        kind,
        grand_total: summary.total(),
        summary,
        details,
        anomalies: open.anomalies,
        unavailable_sources: open.unavailable_sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::*;
    use crate::utils::MemoryDocuments;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn order(id: &str, customer: &str, total: i64, created: NaiveDate) -> SalesOrder {
        SalesOrder {
            id: id.to_string(),
            customer_id: customer.to_string(),
            customer_name: format!("Customer {}", customer),
            customer_contact: None,
            grand_total: BigDecimal::from(total),
            paid_amount: BigDecimal::from(0),
            waived_amount: BigDecimal::from(0),
            created_at: created.and_hms_opt(9, 0, 0).unwrap(),
            status: OrderStatus::Confirmed,
        }
    }

    #[test]
    fn test_period_boundaries() {
        assert_eq!(AgingPeriod::for_days(-3), AgingPeriod::Current);
        assert_eq!(AgingPeriod::for_days(0), AgingPeriod::Current);
        assert_eq!(AgingPeriod::for_days(1), AgingPeriod::Days1To30);
        assert_eq!(AgingPeriod::for_days(30), AgingPeriod::Days1To30);
        assert_eq!(AgingPeriod::for_days(31), AgingPeriod::Days31To60);
        assert_eq!(AgingPeriod::for_days(60), AgingPeriod::Days31To60);
        assert_eq!(AgingPeriod::for_days(90), AgingPeriod::Days61To90);
        assert_eq!(AgingPeriod::for_days(91), AgingPeriod::Days90Plus);
    }

    #[tokio::test]
    async fn test_party_rows_merge_documents() {
        let as_of = date(2024, 6, 30);
        let docs = MemoryDocuments::new();
        docs.add_sales_order(order("SO1", "C1", 1000, date(2024, 6, 20)))
            .unwrap();
        docs.add_sales_order(order("SO2", "C1", 2000, date(2024, 2, 1)))
            .unwrap();
        docs.add_sales_order(order("SO3", "C1", 500, date(2024, 6, 1)))
            .unwrap();
        docs.add_sales_order(order("SO4", "C2", 4000, date(2024, 6, 30)))
            .unwrap();

        let calculator = AgingCalculator::new(docs);
        let report = calculator
            .build_aging_report(as_of, AgingKind::Receivables)
            .await
            .unwrap();

        assert_eq!(report.grand_total, BigDecimal::from(7500));
        assert_eq!(report.summary.total(), report.grand_total);
        assert_eq!(report.summary.current, BigDecimal::from(4000));
        assert_eq!(report.summary.days_90_plus, BigDecimal::from(2000));

        assert_eq!(report.details[0].party_id, "C2");
        let c1 = &report.details[1];
        assert_eq!(c1.total_due, BigDecimal::from(3500));
        assert_eq!(c1.document_count, 3);
        assert_eq!(c1.oldest_date, date(2024, 2, 1));
        assert_eq!(c1.oldest_days, 150);
        assert_eq!(c1.buckets.days_1_to_30, BigDecimal::from(1500));
        assert_eq!(
            c1.buckets.amount(AgingPeriod::Days90Plus),
            &report.summary.days_90_plus
        );
    }

    #[tokio::test]
    async fn test_unavailable_bills_give_empty_report() {
        let docs = MemoryDocuments::new();
        docs.set_unavailable(DocumentFeed::VendorBills, true).unwrap();
        let calculator = AgingCalculator::new(docs);
        let report = calculator
            .build_aging_report(date(2024, 6, 30), AgingKind::Payables)
            .await
            .unwrap();
        assert!(report.details.is_empty());
        assert_eq!(report.grand_total, BigDecimal::from(0));
        assert_eq!(report.unavailable_sources, vec!["vendor_bills"]);
    }
}
