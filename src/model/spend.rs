use serde::Serialize;

/// Spend for one buyer on one date, with the sheet it was found on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DaySpend {
    pub agency: f64,
    pub account: f64,
    pub sum_spent: f64,
    pub sheet_name: String,
}

impl DaySpend {
    pub fn new(agency: f64, account: f64, sheet_name: impl Into<String>) -> Self {
        Self {
            agency,
            account,
            sum_spent: agency + account,
            sheet_name: sheet_name.into(),
        }
    }
}

/// Spend accumulated over a date range, possibly across several sheets.
/// Transient, always recomputed from the cached rows, never persisted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ExpenseTotal {
    pub agency: f64,
    pub account: f64,
    pub sum_spent: f64,
}

impl ExpenseTotal {
    pub fn add(&mut self, agency: f64, account: f64) {
        self.agency += agency;
        self.account += account;
        self.sum_spent += agency + account;
    }
}
