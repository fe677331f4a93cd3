//! Day sheet and cash-flow trend over every cash-bearing feed

use bigdecimal::BigDecimal;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::documents::*;
use crate::reports::cash_events::*;
use crate::traits::DocumentSource;
use crate::types::*;

/// Receipts and payments of one cash-flow category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: CashCategory,
    pub receipts: BigDecimal,
    pub payments: BigDecimal,
    pub net: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSummary {
    pub method: PaymentMethod,
    pub receipts: BigDecimal,
    pub payments: BigDecimal,
    pub net: BigDecimal,
    pub transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySheetRow {
    pub event: CashEvent,
    pub running_balance: BigDecimal,
}

/// Every cash movement of one day in time order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySheet {
    pub date: NaiveDate,
    pub transactions: Vec<DaySheetRow>,
    pub categories: Vec<CategorySummary>,
    pub payment_methods: Vec<MethodSummary>,
    pub total_receipts: BigDecimal,
    pub total_payments: BigDecimal,
    pub net_change: BigDecimal,
    /// Rows dropped because their timestamp could not be read
    pub skipped_rows: usize,
    pub unavailable_sources: Vec<String>,
}

/// Rolling window of a cash-flow trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendRange {
    Week,
    Month,
    Quarter,
    Year,
}

impl TrendRange {
    pub fn days(&self) -> i64 {
        match self {
            TrendRange::Week => 7,
            TrendRange::Month => 30,
            TrendRange::Quarter => 90,
            TrendRange::Year => 365,
        }
    }

    /// Window ending on `as_of`, inclusive
    pub fn window(&self, as_of: NaiveDate) -> DateRange {
        DateRange {
            start: as_of - Duration::days(self.days() - 1),
            end: as_of,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCashFlow {
    pub date: NaiveDate,
    pub inflow: BigDecimal,
    pub outflow: BigDecimal,
    pub net: BigDecimal,
    pub cumulative: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCashFlow {
    pub year: i32,
    pub month: u32,
    pub inflow: BigDecimal,
    pub outflow: BigDecimal,
    pub net: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub total_inflow: BigDecimal,
    pub total_outflow: BigDecimal,
    pub net_flow: BigDecimal,
    pub average_daily_net: BigDecimal,
    /// Population standard deviation of daily net flow
    pub volatility: BigDecimal,
    /// Inflow over outflow; `None` when nothing went out
    pub cash_flow_ratio: Option<BigDecimal>,
    pub by_category: Vec<CategorySummary>,
}

/// Outflows sharing a label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseShare {
    pub label: String,
    pub amount: BigDecimal,
    pub share_percent: BigDecimal,
    pub transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowTrend {
    pub range: TrendRange,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub daily: Vec<DailyCashFlow>,
    pub monthly: Vec<MonthlyCashFlow>,
    pub summary: TrendSummary,
    /// Sorted by amount descending
    pub expense_breakdown: Vec<ExpenseShare>,
    pub unavailable_sources: Vec<String>,
    pub skipped_rows: usize,
}

/// Events gathered from every feed for one window
#[derive(Debug, Default)]
struct CollectedEvents {
    events: Vec<CashEvent>,
    skipped_rows: usize,
    unavailable_sources: Vec<String>,
}

impl CollectedEvents {
    fn absorb<T>(
        &mut self,
        kind: CashSourceKind,
        rows: LedgerResult<Vec<T>>,
        range: &DateRange,
        moves_cash: impl Fn(&T) -> bool,
        normalize: impl Fn(&T) -> Option<CashEvent>,
    ) {
        let rows = match rows {
            Ok(rows) => rows,
            Err(e) => {
                let table = kind.feed().table_name().to_string();
                log::warn!("cash source {} unavailable: {}", table, e);
                if !self.unavailable_sources.contains(&table) {
                    self.unavailable_sources.push(table);
                }
                return;
            }
        };

        for row in rows.iter().filter(|row| moves_cash(row)) {
            match normalize(row) {
                Some(event) if range.contains(event.time.date()) => self.events.push(event),
                Some(_) => {}
                None => {
                    log::debug!("skipping {} row with unreadable timestamp", kind.label());
                    self.skipped_rows += 1;
                }
            }
        }
    }
}

/// Builds cash views from the raw document feeds
pub struct CashPositionAggregator<D: DocumentSource> {
    source: D,
}

impl<D: DocumentSource> CashPositionAggregator<D> {
    pub fn new(source: D) -> Self {
        Self { source }
    }

    /// Every cash movement of a calendar day with a running balance
    ///
    /// The running balance starts from zero at the first movement of the day.
    pub async fn build_day_sheet(&self, date: NaiveDate) -> LedgerResult<DaySheet> {
        let collected = self.collect(&DateRange::single_day(date)).await;

        let mut running_balance = BigDecimal::from(0);
        let mut transactions = Vec::with_capacity(collected.events.len());
        let mut methods: BTreeMap<PaymentMethod, MethodSummary> = BTreeMap::new();

        for event in &collected.events {
            running_balance += event.net();

            let method = methods
                .entry(event.payment_method)
                .or_insert_with(|| MethodSummary {
                    method: event.payment_method,
                    receipts: BigDecimal::from(0),
                    payments: BigDecimal::from(0),
                    net: BigDecimal::from(0),
                    transactions: 0,
                });
            method.receipts += &event.debit;
            method.payments += &event.credit;
            method.net += event.net();
            method.transactions += 1;

            transactions.push(DaySheetRow {
                event: event.clone(),
                running_balance: running_balance.clone(),
            });
        }

        let (total_receipts, total_payments) = totals(collected.events.iter());

        Ok(DaySheet {
            date,
            categories: category_summaries(&collected.events),
            payment_methods: methods.into_values().collect(),
            net_change: &total_receipts - &total_payments,
            total_receipts,
            total_payments,
            transactions,
            skipped_rows: collected.skipped_rows,
            unavailable_sources: collected.unavailable_sources,
        })
    }

    /// Daily and monthly cash flow over a rolling window ending on `as_of`
    pub async fn build_cash_flow_trend(
        &self,
        range: TrendRange,
        as_of: NaiveDate,
    ) -> LedgerResult<CashFlowTrend> {
        let window = range.window(as_of);
        let collected = self.collect(&window).await;
        let zero = BigDecimal::from(0);

        let mut by_day: BTreeMap<NaiveDate, (BigDecimal, BigDecimal)> = window
            .days()
            .map(|day| (day, (zero.clone(), zero.clone())))
            .collect();
        let mut by_month: BTreeMap<(i32, u32), (BigDecimal, BigDecimal)> = window
            .days()
            .map(|day| ((day.year(), day.month()), (zero.clone(), zero.clone())))
            .collect();

        for event in &collected.events {
            let day = event.time.date();
            if let Some((inflow, outflow)) = by_day.get_mut(&day) {
                *inflow += &event.debit;
                *outflow += &event.credit;
            }
            if let Some((inflow, outflow)) = by_month.get_mut(&(day.year(), day.month())) {
                *inflow += &event.debit;
                *outflow += &event.credit;
            }
        }

        let mut cumulative = zero.clone();
        let daily: Vec<DailyCashFlow> = by_day
            .into_iter()
            .map(|(date, (inflow, outflow))| {
                let net = &inflow - &outflow;
                cumulative += &net;
                DailyCashFlow {
                    date,
                    inflow,
                    outflow,
                    net,
                    cumulative: cumulative.clone(),
                }
            })
            .collect();

        let monthly = by_month
            .into_iter()
            .map(|((year, month), (inflow, outflow))| MonthlyCashFlow {
                year,
                month,
                net: &inflow - &outflow,
                inflow,
                outflow,
            })
            .collect();

        let (total_inflow, total_outflow) = totals(collected.events.iter());
        let net_flow = &total_inflow - &total_outflow;
        let day_count = BigDecimal::from(daily.len() as i64);
        let mean = &net_flow / &day_count;
        let variance: BigDecimal = daily
            .iter()
            .map(|d| {
                let deviation = &d.net - &mean;
                &deviation * &deviation
            })
            .sum::<BigDecimal>()
            / &day_count;
        let volatility = variance
            .sqrt()
            .unwrap_or_else(|| BigDecimal::from(0))
            .round(2);
        let cash_flow_ratio =
            (total_outflow > zero).then(|| (&total_inflow / &total_outflow).round(2));

        Ok(CashFlowTrend {
            range,
            start: window.start,
            end: window.end,
            daily,
            monthly,
            summary: TrendSummary {
                average_daily_net: mean.round(2),
                volatility,
                cash_flow_ratio,
                by_category: category_summaries(&collected.events),
                net_flow,
                total_inflow,
                total_outflow: total_outflow.clone(),
            },
            expense_breakdown: expense_breakdown(&collected.events, &total_outflow),
            unavailable_sources: collected.unavailable_sources,
            skipped_rows: collected.skipped_rows,
        })
    }

    async fn collect(&self, range: &DateRange) -> CollectedEvents {
        let source = &self.source;
        let scope = Some(range);
        let mut collected = CollectedEvents::default();

        collected.absorb(
            CashSourceKind::CustomerPayment,
            source.customer_payments(scope).await,
            range,
            |p: &CustomerPayment| p.method.moves_cash(),
            CashEvent::customer_payment,
        );
        collected.absorb(
            CashSourceKind::SupplierPayment,
            source.vendor_payments(scope).await,
            range,
            |p: &VendorPayment| p.method.moves_cash(),
            CashEvent::supplier_payment,
        );
        collected.absorb(
            CashSourceKind::Expense,
            source.expenses(scope).await,
            range,
            |e: &Expense| e.method.moves_cash(),
            CashEvent::expense,
        );
        collected.absorb(
            CashSourceKind::LoanDisbursement,
            source.loan_disbursements(scope).await,
            range,
            |l: &LoanDisbursement| l.method.moves_cash(),
            CashEvent::loan_disbursement,
        );
        collected.absorb(
            CashSourceKind::LoanRepayment,
            source.liability_payments(scope).await,
            range,
            |p: &LiabilityPayment| p.method.moves_cash(),
            CashEvent::loan_repayment,
        );
        collected.absorb(
            CashSourceKind::Investment,
            source.investments(scope).await,
            range,
            |i: &Investment| i.method.moves_cash(),
            CashEvent::investment,
        );
        collected.absorb(
            CashSourceKind::Withdrawal,
            source.withdrawals(scope).await,
            range,
            |w: &Withdrawal| w.method.moves_cash(),
            CashEvent::withdrawal,
        );
        // Only completed refunds paid out in money leave the till
        collected.absorb(
            CashSourceKind::Refund,
            source.invoice_refunds(scope).await,
            range,
            |r: &InvoiceRefund| r.status == RefundStatus::Completed && r.method.moves_cash(),
            CashEvent::refund,
        );

        collected.events.sort_by(CashEvent::timeline_order);
        collected
    }
}

fn totals<'a>(events: impl Iterator<Item = &'a CashEvent> + Clone) -> (BigDecimal, BigDecimal) {
    let receipts: BigDecimal = events.clone().map(|e| &e.debit).sum();
    let payments: BigDecimal = events.map(|e| &e.credit).sum();
    (receipts, payments)
}

/// One summary per category, all three always present
fn category_summaries(events: &[CashEvent]) -> Vec<CategorySummary> {
    CashCategory::ALL
        .iter()
        .map(|category| {
            let (receipts, payments) =
                totals(events.iter().filter(|e| e.category == *category));
            CategorySummary {
                category: *category,
                net: &receipts - &payments,
                receipts,
                payments,
            }
        })
        .collect()
}

fn expense_breakdown(events: &[CashEvent], total_outflow: &BigDecimal) -> Vec<ExpenseShare> {
    let zero = BigDecimal::from(0);
    let mut groups: HashMap<&str, (BigDecimal, usize)> = HashMap::new();
    for event in events.iter().filter(|e| e.credit > zero) {
        let group = groups
            .entry(event.label.as_str())
            .or_insert_with(|| (zero.clone(), 0));
        group.0 += &event.credit;
        group.1 += 1;
    }

    let mut shares: Vec<ExpenseShare> = groups
        .into_iter()
        .map(|(label, (amount, transactions))| {
            let share_percent = if *total_outflow > zero {
                (&amount * BigDecimal::from(100) / total_outflow).round(2)
            } else {
                zero.clone()
            };
            ExpenseShare {
                label: label.to_string(),
                amount,
                share_percent,
                transactions,
            }
        })
        .collect();
    shares.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.label.cmp(&b.label)));
    shares
}
