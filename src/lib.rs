//! Tracks affiliate buyer revenue against spreadsheet ad spend.
//!
//! Revenue arrives as tracker postback events and accumulates per buyer per
//! calendar day in SQLite. Ad spend is read, cached, and indexed from a Google
//! Sheets workbook whose header rows name the buyers. Reports join the two
//! into profit and ROI.

mod api;
pub mod args;
mod cache;
pub mod commands;
mod config;
mod db;
mod error;
mod ledger;
mod lookup;
mod model;
mod report;
mod utils;

pub use api::{Mode, SpendSheet};
pub use cache::{Clock, SystemClock};
pub use config::Config;
pub use error::{Error, LookupError, ProviderError, Result};
pub use ledger::{LedgerTotals, RevenueLedger};
pub use lookup::SpendSheets;
pub use model::{
    format_currency, Buyer, BuyerSummary, DailyResult, DaySpend, ExpenseTotal, Postback,
    RangeReport, RevenueRecord,
};
pub use report::{roi, Reporter};
