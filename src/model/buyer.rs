use serde::{Deserialize, Serialize};

/// An affiliate/traffic-source identity tracked for revenue and spend.
///
/// Buyers are created the first time a postback references an unknown name and
/// are never deleted. The name is the join key to the spreadsheet side; no
/// numeric id correlation exists there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "snake_case")]
pub struct Buyer {
    id: i64,
    name: String,
    /// Running revenue total accumulated across every postback.
    count_revenue: f64,
    /// Running first-deposit count accumulated across every postback.
    count_firstdeps: i64,
    /// A manually set adjustment subtracted once from reported income over any
    /// query range.
    reject: f64,
}

impl Buyer {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count_revenue(&self) -> f64 {
        self.count_revenue
    }

    pub fn count_firstdeps(&self) -> i64 {
        self.count_firstdeps
    }

    pub fn reject(&self) -> f64 {
        self.reject
    }
}
