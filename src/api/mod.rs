//! The seam to the spend-data provider.
//!
//! `SpendSheet` abstracts read-only access to the spend workbook so that the
//! engine can run against the real Google Sheets API or against in-memory
//! data. The test implementation is compiled into the production binary so the
//! whole app can run, top-to-bottom, without touching Google.

mod files;
mod oauth;
mod sheet;
mod test_sheet;

use crate::cache::{Clock, FreshnessStamp};
use crate::error::ProviderError;
use crate::{Config, Result};
use serde::{Deserialize, Serialize};
use sheet::GoogleSpendSheet;
use std::fmt::Debug;
use std::sync::Arc;

pub(crate) use oauth::{authorize, TokenProvider};
pub(crate) use test_sheet::TestSheet;

/// Scopes required for read-only Sheets access.
pub(super) const OAUTH_SCOPES: &[&str] =
    &["https://www.googleapis.com/auth/spreadsheets.readonly"];

/// Read-only access to the spend workbook.
#[async_trait::async_trait]
pub trait SpendSheet: Send + Sync + Debug {
    /// The names of every sheet in the workbook, in workbook order.
    async fn sheet_names(&self) -> Result<Vec<String>, ProviderError>;

    /// The full row range of one sheet. Row 0 is the header row of buyer
    /// names; cells are the provider's formatted strings.
    async fn rows(&self, sheet_name: &str) -> Result<Vec<Vec<String>>, ProviderError>;
}

/// Selects the real Google provider or the in-memory test provider.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Google,
    Test,
}

serde_plain::derive_display_from_serialize!(Mode);
serde_plain::derive_fromstr_from_deserialize!(Mode);

impl Mode {
    /// When `AFFTRACK_IN_TEST_MODE` is set and non-zero in length, the mode is
    /// `Test`, otherwise `Google`.
    pub fn from_env() -> Self {
        match std::env::var("AFFTRACK_IN_TEST_MODE") {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }
}

/// Creates the spend provider for `mode`. The Google provider shares `stamp`
/// with the sheet-metadata cache so that both expire on the same clock.
pub(crate) async fn provider(
    config: &Config,
    mode: Mode,
    clock: Arc<dyn Clock>,
    stamp: Arc<FreshnessStamp>,
) -> Result<Arc<dyn SpendSheet>> {
    Ok(match mode {
        Mode::Google => Arc::new(GoogleSpendSheet::new(config, clock, stamp).await?),
        Mode::Test => Arc::new(TestSheet::default()),
    })
}
