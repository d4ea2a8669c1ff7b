//! The revenue ledger: accumulates postback events into per-buyer, per-day
//! records and answers range queries over them.
//!
//! Calendar days are taken in the configured reference timezone, not the
//! machine's local zone, so an event arriving at 23:30 local still lands on
//! the business day the operators expect.

use crate::cache::Clock;
use crate::db::Db;
use crate::model::{Buyer, Postback, RevenueRecord};
use crate::Result;
use anyhow::bail;
use chrono::{FixedOffset, NaiveDate};
use std::sync::Arc;
use tracing::info;

/// Aggregated income and deposit count over a date range, with the buyer's
/// reject adjustment already subtracted from the income.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerTotals {
    pub income: f64,
    pub firstdeps: i64,
}

/// Records revenue events and serves range aggregates.
#[derive(Debug, Clone)]
pub struct RevenueLedger {
    db: Db,
    tz: FixedOffset,
    clock: Arc<dyn Clock>,
}

impl RevenueLedger {
    pub fn new(db: Db, tz: FixedOffset, clock: Arc<dyn Clock>) -> Self {
        Self { db, tz, clock }
    }

    /// Today's date in the reference timezone.
    fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.tz).date_naive()
    }

    /// Books a postback event: the buyer's lifetime totals and today's record
    /// both gain the event's floored payout and one deposit. The buyer is
    /// created on first sight.
    pub async fn record_event(&self, postback: &Postback) -> Result<()> {
        let name = postback.buyer_name();
        if name.is_empty() {
            bail!(
                "Cannot determine the buyer from campaign '{}'",
                postback.campaign_name()
            );
        }
        let amount = postback.amount();
        let date = self.today();
        let buyer_id = self.db.accumulate_buyer(name, amount).await?;
        self.db.accumulate_revenue(buyer_id, date, amount).await?;
        info!("recorded {amount} for buyer '{name}' on {date}");
        Ok(())
    }

    /// Total income and deposits for `buyer` over `[start, end]` inclusive.
    ///
    /// The reject adjustment is subtracted exactly once per query, however
    /// many days or events the range covers.
    pub async fn query_range(
        &self,
        buyer: &Buyer,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<LedgerTotals> {
        let (income, firstdeps) = self.db.sum_revenue(buyer.id(), start, end).await?;
        Ok(LedgerTotals {
            income: income - buyer.reject(),
            firstdeps,
        })
    }

    /// The buyer's per-day records over `[start, end]` inclusive, oldest
    /// first. Days without events have no record.
    pub async fn records_in_range(
        &self,
        buyer: &Buyer,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RevenueRecord>> {
        self.db.revenue_in_range(buyer.id(), start, end).await
    }

    pub async fn buyer_by_name(&self, name: &str) -> Result<Option<Buyer>> {
        self.db.buyer_by_name(name).await
    }

    pub async fn buyers(&self) -> Result<Vec<Buyer>> {
        self.db.buyers().await
    }

    /// Sets the buyer's manual reject adjustment. Replaces any previous value.
    pub async fn set_reject(&self, name: &str, amount: f64) -> Result<()> {
        self.db.set_reject(name, amount).await
    }
}
