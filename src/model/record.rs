use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One buyer's revenue for one calendar day, unique per `(buyer_id, date)`.
///
/// Same-day postbacks accumulate into the existing record rather than
/// overwriting it. The `expenses` column is reserved; spend always comes from
/// the spreadsheet at read time and is never written back here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "snake_case")]
pub struct RevenueRecord {
    id: i64,
    buyer_id: i64,
    date: NaiveDate,
    income: f64,
    expenses: f64,
    profit: f64,
    firstdeps: i64,
}

impl RevenueRecord {
    pub fn buyer_id(&self) -> i64 {
        self.buyer_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn income(&self) -> f64 {
        self.income
    }

    pub fn profit(&self) -> f64 {
        self.profit
    }

    pub fn firstdeps(&self) -> i64 {
        self.firstdeps
    }
}
