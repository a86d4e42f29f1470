//! Price observation entity and candidate record types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::identity;

/// One (date, name, price) fact recorded from a crawl.
///
/// Observations are append-only: once stored they are never mutated or
/// deleted. The `identity` token is the uniqueness key that makes repeated
/// ingestion of the same fact a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Short content-hash over (date, name, price).
    pub identity: String,
    /// Calendar day the observation was taken.
    pub date: NaiveDate,
    /// Product display name, whitespace-normalized, non-empty.
    pub name: String,
    /// Price in euros.
    pub price: f64,
}

impl PriceObservation {
    /// Build an observation, normalizing the name and deriving the identity
    /// token.
    pub fn new(date: NaiveDate, name: impl Into<String>, price: f64) -> Self {
        let name = normalize_name(&name.into());
        let identity = identity::identity_token(date, &name, price);
        Self {
            identity,
            date,
            name,
            price,
        }
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
