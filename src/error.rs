//! Error types. General plumbing failures use `anyhow`; the spend-lookup path
//! uses explicit enums because callers branch on the failure kind (point
//! lookups surface it, aggregate paths absorb it).

use chrono::NaiveDate;

pub type Error = anyhow::Error;
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures from the spend-data provider itself.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The credential was invalid or could not be refreshed. Fatal for the
    /// current request; never retried.
    #[error("spend provider authorization failed")]
    Authorization(#[source] anyhow::Error),

    /// The provider call failed after authorization (transport, API error,
    /// malformed response).
    #[error("spend provider request failed")]
    Request(#[source] anyhow::Error),
}

/// Outcome of a point lookup against the spend sheets.
///
/// `BuyerNotFound` and `DateNotFound` are terminal for a single-date lookup.
/// Range totals and aggregate reports treat every variant as zero spend.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// No sheet's header row contains a column for this buyer.
    #[error("no sheet has a spend column for buyer '{0}'")]
    BuyerNotFound(String),

    /// The buyer's sheet has no row for the requested date.
    #[error("no spend row for buyer '{buyer}' on {date}")]
    DateNotFound { buyer: String, date: NaiveDate },
}
