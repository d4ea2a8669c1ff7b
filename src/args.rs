//! The CLI interface for the afftrack binary.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// afftrack: tracks affiliate buyer revenue against spreadsheet ad spend.
///
/// Revenue arrives as tracker postback events (`afftrack record`) and is
/// accumulated per buyer per day in a local SQLite database. Ad spend is read
/// from a Google Sheet where each sheet's header row names the buyers. The
/// `report` command joins the two into profit and ROI figures.
///
/// You will need a Google OAuth client for the Sheets API; run `afftrack init`
/// with the downloaded client secret, then `afftrack auth`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory, the config file, and an empty database.
    ///
    /// Run this once before anything else. You need the URL of the spend
    /// spreadsheet and the OAuth client secret file downloaded from Google
    /// Cloud Console.
    Init(InitArgs),
    /// Authorize with Google Sheets via OAuth, or verify the stored token.
    Auth(AuthArgs),
    /// Record a postback event from the affiliate tracker.
    Record(RecordArgs),
    /// Look up one buyer's ad spend for a single date.
    Expenses(ExpensesArgs),
    /// Report income, spend, profit and ROI over a date range.
    Report(ReportArgs),
    /// Set a buyer's manual reject adjustment.
    Reject(RejectArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where afftrack data and configuration is held.
    /// Defaults to ~/afftrack
    #[arg(long, env = "AFFTRACK_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The URL of the Google Sheet where ad spend is recorded. It looks like:
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    #[arg(long)]
    sheet_url: String,

    /// The path to your downloaded OAuth client credentials. This file will be
    /// moved to the secrets location in the home directory.
    #[arg(long)]
    client_secret: PathBuf,

    /// The UTC offset whose calendar day partitions revenue records,
    /// e.g. "+03:00". Defaults to +03:00.
    #[arg(long)]
    utc_offset: Option<String>,
}

impl InitArgs {
    pub fn sheet_url(&self) -> &str {
        &self.sheet_url
    }

    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }

    pub fn utc_offset(&self) -> Option<&str> {
        self.utc_offset.as_deref()
    }
}

#[derive(Debug, Parser, Clone)]
pub struct AuthArgs {
    /// Verify the stored token by listing the workbook's sheets instead of
    /// running the consent flow.
    #[arg(long)]
    verify: bool,
}

impl AuthArgs {
    pub fn verify(&self) -> bool {
        self.verify
    }
}

#[derive(Debug, Parser, Clone)]
pub struct RecordArgs {
    /// The path to a JSON file holding the postback payload. When omitted the
    /// payload is read from stdin.
    #[arg(long)]
    file: Option<PathBuf>,
}

impl RecordArgs {
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

#[derive(Debug, Parser, Clone)]
pub struct ExpensesArgs {
    /// The buyer whose spend to look up.
    #[arg(long)]
    buyer: String,

    /// The date to look up, e.g. 2024-01-15.
    #[arg(long)]
    date: NaiveDate,
}

impl ExpensesArgs {
    pub fn buyer(&self) -> &str {
        &self.buyer
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    /// The first day of the range (inclusive), e.g. 2024-01-01.
    #[arg(long)]
    start: NaiveDate,

    /// The last day of the range (inclusive), e.g. 2024-01-31.
    #[arg(long)]
    end: NaiveDate,

    /// Report a single buyer.
    #[arg(long, conflicts_with = "all")]
    buyer: Option<String>,

    /// Report range totals for every known buyer.
    #[arg(long, required_unless_present = "buyer")]
    all: bool,
}

impl ReportArgs {
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn buyer(&self) -> Option<&str> {
        self.buyer.as_deref()
    }

    pub fn all(&self) -> bool {
        self.all
    }
}

#[derive(Debug, Parser, Clone)]
pub struct RejectArgs {
    /// The buyer to adjust.
    #[arg(long)]
    buyer: String,

    /// The amount to subtract, once, from the buyer's reported income over any
    /// query range. Replaces the previous adjustment.
    #[arg(long)]
    amount: f64,
}

impl RejectArgs {
    pub fn buyer(&self) -> &str {
        &self.buyer
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("afftrack"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or AFFTRACK_HOME instead of relying on the default home \
                directory. If you continue using the program right now, you may have problems!",
            );
            PathBuf::from("afftrack")
        }
    })
}

/// A `PathBuf` wrapper that implements `Display` so clap can show a default.
#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn report_requires_buyer_or_all() {
        let result = Args::try_parse_from([
            "afftrack", "report", "--start", "2024-01-01", "--end", "2024-01-31",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn report_buyer_conflicts_with_all() {
        let result = Args::try_parse_from([
            "afftrack", "report", "--start", "2024-01-01", "--end", "2024-01-31", "--buyer",
            "Artur", "--all",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn report_with_buyer_parses() {
        let args = Args::try_parse_from([
            "afftrack", "report", "--start", "2024-01-01", "--end", "2024-01-31", "--buyer",
            "Artur",
        ])
        .unwrap();
        match args.command() {
            Command::Report(report) => {
                assert_eq!(report.buyer(), Some("Artur"));
                assert!(!report.all());
                assert_eq!(report.start(), "2024-01-01".parse().unwrap());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn expenses_parses_date() {
        let args = Args::try_parse_from([
            "afftrack", "expenses", "--buyer", "Artur", "--date", "2024-01-15",
        ])
        .unwrap();
        match args.command() {
            Command::Expenses(expenses) => {
                assert_eq!(expenses.buyer(), "Artur");
                assert_eq!(expenses.date(), "2024-01-15".parse().unwrap());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
