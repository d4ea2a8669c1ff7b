//! Implements the `SpendSheet` trait using in-memory data for testing.
//!
//! Note: this is compiled even in the "production" version of this app so that
//! we can run the whole app, top-to-bottom, without using Google Sheets.

use crate::api::SpendSheet;
use crate::error::ProviderError;
use crate::Result;
use anyhow::anyhow;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An implementation of `SpendSheet` that serves rows from memory. Sheets are
/// kept as an ordered list so "workbook order" is the insertion order. The
/// fetch counter lets tests assert how often the cache really went upstream.
#[derive(Debug)]
pub(crate) struct TestSheet {
    sheets: Vec<(String, Vec<Vec<String>>)>,
    fetches: AtomicUsize,
}

impl TestSheet {
    /// Create a new `TestSheet` from `(sheet name, rows)` pairs.
    pub(crate) fn new(sheets: Vec<(String, Vec<Vec<String>>)>) -> Self {
        Self {
            sheets,
            fetches: AtomicUsize::new(0),
        }
    }

    /// How many row fetches have been served.
    #[cfg(test)]
    pub(crate) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SpendSheet for TestSheet {
    async fn sheet_names(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.sheets.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn rows(&self, sheet_name: &str) -> Result<Vec<Vec<String>>, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.sheets
            .iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| ProviderError::Request(anyhow!("Sheet '{sheet_name}' not found")))
    }
}

impl Default for TestSheet {
    /// Loads seed data from this module.
    fn default() -> Self {
        Self::new(default_data())
    }
}

/// Provides the seed data from this module: two sheets, with the buyer "Artur"
/// appearing on both so range totals exercise the cross-sheet sum.
fn default_data() -> Vec<(String, Vec<Vec<String>>)> {
    vec![
        ("Facebook".to_string(), load_csv(FACEBOOK_DATA).unwrap()),
        ("Google".to_string(), load_csv(GOOGLE_DATA).unwrap()),
    ]
}

/// Loads rows from a CSV-formatted string.
fn load_csv(csv_data: &str) -> Result<Vec<Vec<String>>> {
    let bytes = csv_data.as_bytes();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false) // Ensure headers are treated as part of the data
        .from_reader(Cursor::new(bytes));

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row: Vec<String> = record.iter().map(|field| field.to_string()).collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Seed spend data. Row 0 holds buyer names; a buyer's agency spend sits in
/// the header column and account spend in the next column. Rows 1-2 mirror the
/// metadata rows real workbooks carry above the data.
const FACEBOOK_DATA: &str = r##"Date,Artur,acc,Vlad,acc
week totals,,,,
currency USD,,,,
2024-01-01,10,5,7,3
2024-01-02,0,0,2,1
2024-01-03,4.50,1.50,$12.00,0
"##;

const GOOGLE_DATA: &str = r##"Date,Artur,acc
week totals,,
currency USD,,
2024-01-01,2,1
2024-01-02,3,0
"##;
