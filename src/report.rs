//! The aggregation engine: joins ledger income with spreadsheet spend into
//! daily results, range reports, and the all-buyers listing.

use crate::ledger::RevenueLedger;
use crate::lookup::SpendSheets;
use crate::model::{Buyer, BuyerSummary, DailyResult, RangeReport};
use crate::Result;
use anyhow::{ensure, Context};
use chrono::NaiveDate;
use futures::future::join_all;
use std::collections::HashMap;
use tracing::debug;

/// Return on investment as a whole-number percentage.
///
/// Zero spend (or a non-finite intermediate) reports as 0 rather than
/// infinity, so a buyer with income and no recorded spend shows ROI 0, not a
/// divide-by-zero artifact.
pub fn roi(income: f64, spend: f64) -> i64 {
    if spend == 0.0 {
        return 0;
    }
    let pct = (income - spend) / spend * 100.0;
    if pct.is_finite() {
        pct.round() as i64
    } else {
        0
    }
}

/// Produces reports by combining the ledger and the spend sheets.
pub struct Reporter {
    ledger: RevenueLedger,
    sheets: SpendSheets,
}

impl Reporter {
    pub fn new(ledger: RevenueLedger, sheets: SpendSheets) -> Self {
        Self { ledger, sheets }
    }

    /// One buyer's result for one day. Income is zero when the ledger has no
    /// record for the day; spend lookup failures also count as zero so the
    /// result is always produced.
    pub async fn daily(&self, buyer_name: &str, date: NaiveDate) -> Result<DailyResult> {
        let buyer = self.require_buyer(buyer_name).await?;
        let income = self
            .ledger
            .records_in_range(&buyer, date, date)
            .await?
            .first()
            .map(|r| r.income())
            .unwrap_or(0.0);
        let (agency, account) = self.day_spend_or_zero(buyer_name, date).await;
        Ok(combine(date, income, agency, account))
    }

    /// A buyer's full report over `[start, end]` inclusive: one row per
    /// calendar day, plus range totals. Per-day spend lookups are dispatched
    /// concurrently so an N-day range costs about one round trip.
    ///
    /// The total expenses come from a range scan of the sheets and the total
    /// income from the ledger with the reject adjustment applied, so the
    /// totals are not simply the sums of the rows.
    pub async fn range(
        &self,
        buyer_name: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RangeReport> {
        ensure!(start <= end, "Range start {start} is after its end {end}");
        let buyer = self.require_buyer(buyer_name).await?;

        let records = self.ledger.records_in_range(&buyer, start, end).await?;
        let income_by_day: HashMap<NaiveDate, f64> = records
            .iter()
            .map(|record| (record.date(), record.income()))
            .collect();
        let days: Vec<NaiveDate> = start.iter_days().take_while(|day| *day <= end).collect();
        let spends = join_all(
            days.iter()
                .map(|day| self.day_spend_or_zero(buyer_name, *day)),
        )
        .await;
        let rows: Vec<DailyResult> = days
            .iter()
            .zip(spends)
            .map(|(day, (agency, account))| {
                let income = income_by_day.get(day).copied().unwrap_or(0.0);
                combine(*day, income, agency, account)
            })
            .collect();

        let totals = self.ledger.query_range(&buyer, start, end).await?;
        let expenses = self.sheets.range_total(buyer_name, start, end).await;
        Ok(RangeReport {
            total_records_count: rows.len(),
            records: rows,
            total_income: totals.income,
            total_expenses_agency: expenses.agency,
            total_expenses_account: expenses.account,
            total_profit: totals.income - expenses.sum_spent,
            total_roi: roi(totals.income, expenses.sum_spent),
            total_firstdeps: totals.firstdeps,
        })
    }

    /// Range totals for every known buyer, ordered by name.
    pub async fn all_buyers(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<BuyerSummary>> {
        ensure!(start <= end, "Range start {start} is after its end {end}");
        let buyers = self.ledger.buyers().await?;
        let summaries = join_all(
            buyers
                .iter()
                .map(|buyer| self.summarize(buyer, start, end)),
        )
        .await;
        summaries.into_iter().collect()
    }

    async fn summarize(
        &self,
        buyer: &Buyer,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BuyerSummary> {
        let totals = self.ledger.query_range(buyer, start, end).await?;
        let expenses = self.sheets.range_total(buyer.name(), start, end).await;
        Ok(BuyerSummary {
            name: buyer.name().to_string(),
            total_income: totals.income,
            total_firstdeps: totals.firstdeps,
            expenses_agency: expenses.agency,
            expenses_account: expenses.account,
            profit: totals.income - expenses.sum_spent,
            roi: roi(totals.income, expenses.sum_spent),
        })
    }

    async fn require_buyer(&self, name: &str) -> Result<Buyer> {
        self.ledger
            .buyer_by_name(name)
            .await?
            .with_context(|| format!("No buyer named '{name}'"))
    }

    /// Spend for one day, treating any lookup failure as zero so reporting
    /// stays available when the sheets are unreachable or incomplete.
    async fn day_spend_or_zero(&self, buyer_name: &str, date: NaiveDate) -> (f64, f64) {
        match self.sheets.day_spend(buyer_name, date).await {
            Ok(spend) => (spend.agency, spend.account),
            Err(e) => {
                debug!("using zero spend for '{buyer_name}' on {date}: {e:#}");
                (0.0, 0.0)
            }
        }
    }
}

fn combine(date: NaiveDate, income: f64, agency: f64, account: f64) -> DailyResult {
    let spend = agency + account;
    DailyResult {
        date,
        income,
        expenses_agency: agency,
        expenses_account: account,
        profit: income - spend,
        roi: roi(income, spend),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestSheet;
    use crate::cache::test_clock::ManualClock;
    use crate::cache::Clock;
    use crate::db::Db;
    use crate::model::Postback;
    use chrono::{FixedOffset, TimeZone, Utc};
    use std::str::FromStr;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    /// A single sheet where Artur spent 10+5 on Jan 1 and nothing on Jan 2.
    fn single_sheet() -> Vec<(String, Vec<Vec<String>>)> {
        vec![(
            "Facebook".to_string(),
            vec![
                vec!["Date".into(), "Artur".into(), "acc".into()],
                vec!["week totals".into(), "".into(), "".into()],
                vec!["currency USD".into(), "".into(), "".into()],
                vec!["2024-01-01".into(), "10".into(), "5".into()],
                vec!["2024-01-02".into(), "0".into(), "0".into()],
            ],
        )]
    }

    async fn reporter_with(
        sheets: Vec<(String, Vec<Vec<String>>)>,
    ) -> (TempDir, Reporter, Arc<ManualClock>) {
        let tmp = TempDir::new().unwrap();
        let db = Db::init(&tmp.path().join("test.sqlite")).await.unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let tz = FixedOffset::from_str("+03:00").unwrap();
        let ledger = RevenueLedger::new(db, tz, Arc::clone(&clock) as Arc<dyn Clock>);
        let engine = SpendSheets::new(
            Arc::new(TestSheet::new(sheets)),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        (tmp, Reporter::new(ledger, engine), clock)
    }

    /// Books 100 on Jan 1 and 50 on Jan 2 for Artur.
    async fn seed_artur(reporter: &Reporter, clock: &ManualClock) {
        reporter
            .ledger
            .record_event(&Postback::new("us|fb|Artur", 100.0))
            .await
            .unwrap();
        clock.set(Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap());
        reporter
            .ledger
            .record_event(&Postback::new("us|fb|Artur", 50.0))
            .await
            .unwrap();
    }

    #[test]
    fn roi_rounds_to_whole_percent() {
        assert_eq!(roi(150.0, 15.0), 900);
        assert_eq!(roi(100.0, 150.0), -33);
        assert_eq!(roi(10.0, 3.0), 233);
    }

    #[test]
    fn roi_with_zero_spend_is_zero() {
        assert_eq!(roi(100.0, 0.0), 0);
        assert_eq!(roi(0.0, 0.0), 0);
        assert_eq!(roi(-50.0, 0.0), 0);
    }

    #[tokio::test]
    async fn range_report_totals() {
        let (_tmp, reporter, clock) = reporter_with(single_sheet()).await;
        seed_artur(&reporter, &clock).await;

        let report = reporter
            .range("Artur", day("2024-01-01"), day("2024-01-02"))
            .await
            .unwrap();
        assert_eq!(report.total_income, 150.0);
        assert_eq!(report.total_expenses_agency, 10.0);
        assert_eq!(report.total_expenses_account, 5.0);
        assert_eq!(report.total_profit, 135.0);
        assert_eq!(report.total_roi, 900);
        assert_eq!(report.total_firstdeps, 2);
        assert_eq!(report.total_records_count, 2);

        // Day rows carry raw income; the range totals, not the rows, absorb
        // the reject adjustment.
        assert_eq!(report.records[0].date, day("2024-01-01"));
        assert_eq!(report.records[0].income, 100.0);
        assert_eq!(report.records[0].profit, 85.0);
        assert_eq!(report.records[0].roi, roi(100.0, 15.0));
        assert_eq!(report.records[1].income, 50.0);
        assert_eq!(report.records[1].profit, 50.0);
        assert_eq!(report.records[1].roi, 0);

        // On a single sheet the per-day spends sum to the range total.
        let row_spend: f64 = report
            .records
            .iter()
            .map(|r| r.expenses_agency + r.expenses_account)
            .sum();
        assert_eq!(
            row_spend,
            report.total_expenses_agency + report.total_expenses_account
        );
    }

    #[tokio::test]
    async fn daily_totals_match_range_rows_on_one_sheet() {
        let (_tmp, reporter, clock) = reporter_with(single_sheet()).await;
        seed_artur(&reporter, &clock).await;

        let daily = reporter.daily("Artur", day("2024-01-01")).await.unwrap();
        assert_eq!(daily.income, 100.0);
        assert_eq!(daily.expenses_agency, 10.0);
        assert_eq!(daily.expenses_account, 5.0);
        assert_eq!(daily.profit, 85.0);

        let report = reporter
            .range("Artur", day("2024-01-01"), day("2024-01-02"))
            .await
            .unwrap();
        assert_eq!(report.records[0], daily);
    }

    #[tokio::test]
    async fn daily_with_no_ledger_record_is_zero_income() {
        let (_tmp, reporter, clock) = reporter_with(single_sheet()).await;
        seed_artur(&reporter, &clock).await;

        let daily = reporter.daily("Artur", day("2024-01-05")).await.unwrap();
        assert_eq!(daily.income, 0.0);
        assert_eq!(daily.expenses_agency, 0.0);
        assert_eq!(daily.profit, 0.0);
    }

    #[tokio::test]
    async fn unknown_ledger_buyer_is_an_error() {
        let (_tmp, reporter, _) = reporter_with(single_sheet()).await;
        let err = reporter
            .range("Nobody", day("2024-01-01"), day("2024-01-02"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Nobody"));
    }

    #[tokio::test]
    async fn buyer_missing_from_sheets_reports_zero_spend() {
        // Mike exists in the ledger but no sheet has his column.
        let (_tmp, reporter, _) = reporter_with(single_sheet()).await;
        reporter
            .ledger
            .record_event(&Postback::new("us|fb|Mike", 40.0))
            .await
            .unwrap();

        let report = reporter
            .range("Mike", day("2024-01-01"), day("2024-01-02"))
            .await
            .unwrap();
        assert_eq!(report.total_income, 40.0);
        assert_eq!(report.total_expenses_agency, 0.0);
        assert_eq!(report.total_profit, 40.0);
        assert_eq!(report.total_roi, 0);

        // One row per calendar day, even for the day without an event.
        assert_eq!(report.total_records_count, 2);
        assert_eq!(report.records[0].income, 40.0);
        assert_eq!(report.records[1].income, 0.0);
        assert_eq!(report.records[1].expenses_agency, 0.0);
    }

    #[tokio::test]
    async fn reject_is_applied_once_to_range_totals() {
        let (_tmp, reporter, clock) = reporter_with(single_sheet()).await;
        seed_artur(&reporter, &clock).await;
        reporter.ledger.set_reject("Artur", 30.0).await.unwrap();

        let report = reporter
            .range("Artur", day("2024-01-01"), day("2024-01-02"))
            .await
            .unwrap();
        assert_eq!(report.total_income, 120.0);
        assert_eq!(report.total_profit, 105.0);
        // The per-day rows still show raw income.
        let row_income: f64 = report.records.iter().map(|r| r.income).sum();
        assert_eq!(row_income, 150.0);
    }

    #[tokio::test]
    async fn all_buyers_listing_is_name_ordered() {
        let (_tmp, reporter, _) = reporter_with(single_sheet()).await;
        reporter
            .ledger
            .record_event(&Postback::new("us|fb|Vlad", 20.0))
            .await
            .unwrap();
        reporter
            .ledger
            .record_event(&Postback::new("us|fb|Artur", 100.0))
            .await
            .unwrap();

        let summaries = reporter
            .all_buyers(day("2024-01-01"), day("2024-01-02"))
            .await
            .unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].name, "Artur");
        assert_eq!(summaries[0].total_income, 100.0);
        assert_eq!(summaries[0].expenses_agency, 10.0);
        assert_eq!(summaries[0].profit, 85.0);
        assert_eq!(summaries[1].name, "Vlad");
        assert_eq!(summaries[1].expenses_agency, 0.0);
        assert_eq!(summaries[1].profit, 20.0);
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let (_tmp, reporter, clock) = reporter_with(single_sheet()).await;
        seed_artur(&reporter, &clock).await;
        assert!(reporter
            .range("Artur", day("2024-01-02"), day("2024-01-01"))
            .await
            .is_err());
        assert!(reporter
            .all_buyers(day("2024-01-02"), day("2024-01-01"))
            .await
            .is_err());
    }
}
