use crate::cache::SystemClock;
use crate::commands::Out;
use crate::lookup::SpendSheets;
use crate::model::{format_currency, DaySpend};
use crate::{Config, Mode, Result};
use chrono::NaiveDate;
use std::sync::Arc;

/// Looks up one buyer's spend for a single date. Unlike range reporting, a
/// missing buyer or date is an error here, not a zero.
pub async fn expenses(
    config: &Config,
    mode: Mode,
    buyer: &str,
    date: NaiveDate,
) -> Result<Out<DaySpend>> {
    let sheets = SpendSheets::connect(config, mode, Arc::new(SystemClock)).await?;
    let spend = sheets.day_spend(buyer, date).await?;
    Ok(Out::new(
        format!(
            "'{buyer}' spent {} on {date} (agency {}, account {}) per sheet '{}'",
            format_currency(spend.sum_spent),
            format_currency(spend.agency),
            format_currency(spend.account),
            spend.sheet_name
        ),
        spend,
    ))
}
