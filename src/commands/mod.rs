//! Command handlers for the afftrack CLI.

mod auth;
mod expenses;
mod init;
mod record;
mod reject;
mod report;

use crate::cache::SystemClock;
use crate::ledger::RevenueLedger;
use crate::Config;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info};

pub use auth::{auth, auth_verify};
pub use expenses::expenses;
pub use init::init;
pub use record::record;
pub use reject::reject;
pub use report::{report_all, report_range};

/// Builds the ledger the command handlers write to and query.
fn ledger(config: &Config) -> RevenueLedger {
    RevenueLedger::new(
        config.db().clone(),
        config.reference_timezone(),
        Arc::new(SystemClock),
    )
}

/// The output type for a command: a human-readable message plus, optionally,
/// structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the
    /// command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as
    /// JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}
