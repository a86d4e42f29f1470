//! Change matrix types for the price movement report.

use chrono::NaiveDate;
use serde::Serialize;

/// Row-level classification used as a styling hint by the presentation layer.
///
/// `Missing` takes priority over `Changed`: a row with both an absent cell
/// and a price change is classified as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Stable,
    Changed,
    Missing,
}

impl RowStatus {
    /// Classify a row from its cells, restricted to the report window.
    pub fn classify(cells: &[Option<f64>]) -> Self {
        if cells.iter().any(Option::is_none) {
            return Self::Missing;
        }
        let mut cents: Vec<i64> = cells
            .iter()
            .flatten()
            .map(|price| (price * 100.0).round() as i64)
            .collect();
        cents.sort_unstable();
        cents.dedup();
        if cents.len() > 1 {
            Self::Changed
        } else {
            Self::Stable
        }
    }
}

/// One product's prices across the selected date window.
#[derive(Debug, Clone, Serialize)]
pub struct MatrixRow {
    pub name: String,
    /// One cell per window date, in `ChangeMatrix::dates` order.
    pub cells: Vec<Option<f64>>,
    pub status: RowStatus,
}

impl MatrixRow {
    /// Whether the row should surface in the default report.
    pub fn is_flagged(&self) -> bool {
        self.status != RowStatus::Stable
    }
}

/// Date-indexed pivot of observations per product.
///
/// Derived fresh from the stored observations on each report request; every
/// present cell equals some stored observation's price for that (name, date).
#[derive(Debug, Clone, Serialize)]
pub struct ChangeMatrix {
    /// Selected window dates, ascending.
    pub dates: Vec<NaiveDate>,
    /// Rows sorted by product name.
    pub rows: Vec<MatrixRow>,
}

impl ChangeMatrix {
    pub fn flagged_rows(&self) -> impl Iterator<Item = &MatrixRow> {
        self.rows.iter().filter(|row| row.is_flagged())
    }
}
