use serde::{Deserialize, Deserializer, Serialize};

/// A conversion notification from the tracker: a campaign label carrying the
/// responsible buyer's name, and a payout amount.
///
/// Trackers are inconsistent about whether `payout` arrives as a number or a
/// string, so deserialization accepts both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Postback {
    campaign_name: String,
    #[serde(deserialize_with = "number_or_string")]
    payout: f64,
}

impl Postback {
    pub fn new(campaign_name: impl Into<String>, payout: f64) -> Self {
        Self {
            campaign_name: campaign_name.into(),
            payout,
        }
    }

    /// The buyer responsible for this conversion: the last `|`-separated
    /// segment of the campaign label, trimmed. A label with no separator is
    /// itself the buyer name.
    pub fn buyer_name(&self) -> &str {
        self.campaign_name
            .rsplit('|')
            .next()
            .unwrap_or("")
            .trim()
    }

    /// The payout floored to whole units, the amount the ledger accumulates.
    pub fn amount(&self) -> f64 {
        self.payout.floor()
    }

    pub fn campaign_name(&self) -> &str {
        &self.campaign_name
    }
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s.trim().parse().unwrap_or(0.0),
    })
}
