use chrono::NaiveDate;
use serde::Serialize;

/// Income, spend, profit and ROI for one buyer on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DailyResult {
    pub date: NaiveDate,
    pub income: f64,
    pub expenses_agency: f64,
    pub expenses_account: f64,
    pub profit: f64,
    pub roi: i64,
}

/// A buyer's report over an inclusive date range: one `DailyResult` per day
/// plus range-level totals.
///
/// The total expenses come from an independent range scan of the sheets, not
/// from summing the per-day figures; when a buyer's column appears on more
/// than one sheet the two can legitimately disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RangeReport {
    pub records: Vec<DailyResult>,
    pub total_income: f64,
    pub total_expenses_agency: f64,
    pub total_expenses_account: f64,
    pub total_profit: f64,
    pub total_roi: i64,
    pub total_firstdeps: i64,
    pub total_records_count: usize,
}

/// One line of the all-buyers listing: range totals only, no per-day rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BuyerSummary {
    pub name: String,
    pub total_income: f64,
    pub total_firstdeps: i64,
    pub expenses_agency: f64,
    pub expenses_account: f64,
    pub profit: f64,
    pub roi: i64,
}
