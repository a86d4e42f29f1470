//! Content-derived identity tokens for idempotent ingestion.

use chrono::NaiveDate;

/// Number of hex characters kept from the digest.
///
/// The store's UNIQUE constraint on this truncated token is the idempotence
/// enforcement point; the residual collision probability is an accepted
/// trade-off recorded in DESIGN.md.
pub const IDENTITY_LEN: usize = 8;

/// Derive the identity token for a (date, name, price) observation.
///
/// The digest input uses fixed, locale-independent formatting (ISO date,
/// two-decimal price), so equal facts always hash identically.
pub fn identity_token(date: NaiveDate, name: &str, price: f64) -> String {
    let input = format!("{}-{}-{:.2}", date.format("%Y-%m-%d"), name, price);
    let digest = blake3::hash(input.as_bytes());
    digest.to_hex().as_str()[..IDENTITY_LEN].to_string()
}
