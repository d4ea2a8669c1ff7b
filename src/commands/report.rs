use crate::cache::SystemClock;
use crate::commands::Out;
use crate::lookup::SpendSheets;
use crate::model::{format_currency, BuyerSummary, RangeReport};
use crate::report::Reporter;
use crate::{Config, Mode, Result};
use chrono::NaiveDate;
use std::sync::Arc;

/// One buyer's report over a date range: per-day rows plus totals.
pub async fn report_range(
    config: &Config,
    mode: Mode,
    buyer: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Out<RangeReport>> {
    let report = reporter(config, mode).await?.range(buyer, start, end).await?;
    Ok(Out::new(
        format!(
            "'{buyer}' {start}..{end}: income {}, spend {}, profit {}, ROI {}%, {} deposit(s) \
             over {} day(s)",
            format_currency(report.total_income),
            format_currency(report.total_expenses_agency + report.total_expenses_account),
            format_currency(report.total_profit),
            report.total_roi,
            report.total_firstdeps,
            report.total_records_count,
        ),
        report,
    ))
}

/// Range totals for every known buyer.
pub async fn report_all(
    config: &Config,
    mode: Mode,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Out<Vec<BuyerSummary>>> {
    let summaries = reporter(config, mode).await?.all_buyers(start, end).await?;
    let message = if summaries.is_empty() {
        "No buyers recorded yet".to_string()
    } else {
        summaries
            .iter()
            .map(|s| {
                format!(
                    "'{}': income {}, spend {}, profit {}, ROI {}%",
                    s.name,
                    format_currency(s.total_income),
                    format_currency(s.expenses_agency + s.expenses_account),
                    format_currency(s.profit),
                    s.roi
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    Ok(Out::new(message, summaries))
}

async fn reporter(config: &Config, mode: Mode) -> Result<Reporter> {
    let clock = Arc::new(SystemClock);
    let sheets = SpendSheets::connect(config, mode, clock).await?;
    Ok(Reporter::new(super::ledger(config), sheets))
}
