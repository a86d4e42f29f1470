//! Beer price tracker
//!
//! Crawls beer product listings (name, price) from a retailer's storefront,
//! persists them as dated snapshots in SQLite, and reports price movement
//! across the most recent snapshots.

pub mod application;
pub mod domain;
pub mod infrastructure;
