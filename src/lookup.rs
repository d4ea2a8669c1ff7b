//! The spend-sheet cache and lookup engine.
//!
//! `SpendSheets` owns two caches in front of the provider: a singleton entry
//! for the sheet-name list (expiry tied to the credential cache's freshness
//! stamp) and one entry per sheet for raw rows (independent per-entry expiry,
//! 30 minutes, no eviction beyond staleness). When a sheet is fetched its
//! buyer-column schema is resolved once and cached alongside the rows, so
//! lookups never re-scan the header.
//!
//! The two lookup operations deliberately differ:
//! - a point lookup uses only the first sheet that has the buyer's column and
//!   fails loudly when the buyer or date is missing;
//! - a range total sums the buyer's columns across every sheet that has them
//!   and never fails, so aggregate reporting stays usable under partial
//!   data-source failure.

use crate::api::{self, Mode, SpendSheet};
use crate::cache::{cache_ttl, CacheEntry, Clock, FreshnessStamp};
use crate::error::{LookupError, ProviderError};
use crate::model::{parse_spend_cell, DaySpend, ExpenseTotal};
use crate::{Config, Result};
use chrono::{DateTime, Duration, NaiveDate};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Rows above this index are headers and week/currency metadata, excluded from
/// range summation.
const DATA_START_ROW: usize = 3;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column positions for one buyer on one sheet: the header column holds the
/// agency spend and the adjacent column holds the account spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SpendColumns {
    agency: usize,
    account: usize,
}

/// One sheet's rows plus the buyer-column schema resolved at fetch time.
#[derive(Debug)]
struct CachedSheet {
    rows: Vec<Vec<String>>,
    columns: HashMap<String, SpendColumns>,
}

impl CachedSheet {
    fn new(rows: Vec<Vec<String>>) -> Self {
        let mut columns = HashMap::new();
        if let Some(header) = rows.first() {
            for (ix, name) in header.iter().enumerate() {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                // First occurrence wins when a name repeats in the header.
                columns
                    .entry(name.to_string())
                    .or_insert(SpendColumns { agency: ix, account: ix + 1 });
            }
        }
        Self { rows, columns }
    }

    fn spend_at(&self, row: &[String], cols: SpendColumns) -> (f64, f64) {
        let agency = row.get(cols.agency).map(|c| parse_spend_cell(c)).unwrap_or(0.0);
        let account = row.get(cols.account).map(|c| parse_spend_cell(c)).unwrap_or(0.0);
        (agency, account)
    }
}

/// Cached, indexed access to the spend workbook.
pub struct SpendSheets {
    provider: Arc<dyn SpendSheet>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    stamp: Arc<FreshnessStamp>,
    names: Mutex<Option<CacheEntry<Arc<Vec<String>>>>>,
    sheets: Mutex<HashMap<String, CacheEntry<Arc<CachedSheet>>>>,
}

impl SpendSheets {
    /// Builds the engine for `mode`, wiring the Google provider's credential
    /// cache to the same freshness stamp as the sheet-name cache.
    pub async fn connect(config: &Config, mode: Mode, clock: Arc<dyn Clock>) -> Result<Self> {
        let stamp = Arc::new(FreshnessStamp::default());
        let provider =
            api::provider(config, mode, Arc::clone(&clock), Arc::clone(&stamp)).await?;
        Ok(Self::with_stamp(provider, clock, stamp))
    }

    pub(crate) fn new(provider: Arc<dyn SpendSheet>, clock: Arc<dyn Clock>) -> Self {
        Self::with_stamp(provider, clock, Arc::new(FreshnessStamp::default()))
    }

    fn with_stamp(
        provider: Arc<dyn SpendSheet>,
        clock: Arc<dyn Clock>,
        stamp: Arc<FreshnessStamp>,
    ) -> Self {
        Self {
            provider,
            clock,
            ttl: cache_ttl(),
            stamp,
            names: Mutex::new(None),
            sheets: Mutex::new(HashMap::new()),
        }
    }

    /// The workbook's sheet names, cached on the shared freshness stamp.
    pub async fn sheet_names(&self) -> Result<Arc<Vec<String>>, ProviderError> {
        let now = self.clock.now();
        {
            let guard = self.names.lock().unwrap();
            if let Some(entry) = guard.as_ref() {
                if self.stamp.is_fresh(now, self.ttl) {
                    return Ok(Arc::clone(entry.value()));
                }
            }
        }
        // Stale or missing. The lock is not held across the fetch, so two
        // concurrent misses may both go upstream; the read is idempotent and
        // the second insert simply overwrites the first.
        let names = Arc::new(self.provider.sheet_names().await?);
        self.stamp.touch(now);
        *self.names.lock().unwrap() = Some(CacheEntry::new(Arc::clone(&names), now));
        Ok(names)
    }

    /// One sheet's cached rows and column schema, refetched when stale.
    async fn sheet(&self, name: &str) -> Result<Arc<CachedSheet>, ProviderError> {
        let now = self.clock.now();
        {
            let sheets = self.sheets.lock().unwrap();
            if let Some(entry) = sheets.get(name) {
                if entry.is_fresh(now, self.ttl) {
                    return Ok(Arc::clone(entry.value()));
                }
            }
        }
        debug!("fetching sheet '{name}' from the provider");
        let rows = self.provider.rows(name).await?;
        let sheet = Arc::new(CachedSheet::new(rows));
        self.sheets
            .lock()
            .unwrap()
            .insert(name.to_string(), CacheEntry::new(Arc::clone(&sheet), now));
        Ok(sheet)
    }

    /// Finds a buyer's spend for a single date.
    ///
    /// The first sheet (in workbook order) whose header contains the buyer is
    /// authoritative; other sheets are not consulted even if that sheet lacks
    /// the date.
    pub async fn day_spend(&self, buyer: &str, date: NaiveDate) -> Result<DaySpend, LookupError> {
        let names = self.sheet_names().await?;
        let date_str = date.format(DATE_FORMAT).to_string();
        for name in names.iter() {
            let sheet = self.sheet(name).await?;
            let Some(cols) = sheet.columns.get(buyer).copied() else {
                continue;
            };
            let row = sheet
                .rows
                .iter()
                .find(|row| row.first().map(String::as_str) == Some(date_str.as_str()));
            return match row {
                Some(row) => {
                    let (agency, account) = sheet.spend_at(row, cols);
                    Ok(DaySpend::new(agency, account, name.as_str()))
                }
                None => Err(LookupError::DateNotFound {
                    buyer: buyer.to_string(),
                    date,
                }),
            };
        }
        Err(LookupError::BuyerNotFound(buyer.to_string()))
    }

    /// Sums a buyer's spend over `[start, end]` inclusive, across every sheet
    /// that has the buyer's column.
    ///
    /// Never fails: an absent column or a provider error yields zero totals so
    /// an aggregate report can always be produced.
    pub async fn range_total(&self, buyer: &str, start: NaiveDate, end: NaiveDate) -> ExpenseTotal {
        match self.try_range_total(buyer, start, end).await {
            Ok(total) => total,
            Err(e) => {
                warn!("using zero spend for buyer '{buyer}' over {start}..={end}: {e:#}");
                ExpenseTotal::default()
            }
        }
    }

    async fn try_range_total(
        &self,
        buyer: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ExpenseTotal, ProviderError> {
        let names = self.sheet_names().await?;
        let mut total = ExpenseTotal::default();
        for name in names.iter() {
            let sheet = self.sheet(name).await?;
            let Some(cols) = sheet.columns.get(buyer).copied() else {
                continue;
            };
            for row in sheet.rows.iter().skip(DATA_START_ROW) {
                let Some(date) = row.first().and_then(|cell| parse_day(cell)) else {
                    continue;
                };
                if date < start || date > end {
                    continue;
                }
                let (agency, account) = sheet.spend_at(row, cols);
                total.add(agency, account);
            }
        }
        Ok(total)
    }
}

/// Parses a date cell down to its calendar day, ignoring any time-of-day
/// component.
fn parse_day(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(cell, DATE_FORMAT) {
        return Some(date);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(cell, format) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(cell) {
        return Some(dt.date_naive());
    }
    None
}
