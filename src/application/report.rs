//! Change reporter: pivots stored observations into the change matrix and
//! formats it for the presentation layer.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::observation::PriceObservation;
use crate::domain::report::{ChangeMatrix, MatrixRow, RowStatus};

/// Marker for an absent cell in rendered output.
pub const ABSENT_MARKER: &str = "-";

/// Shown when no row is flagged across the window.
pub const NO_CHANGES_MESSAGE: &str = "Ei muutoksia olut valikoimassa";

/// Row-major table handed to the presentation layer.
///
/// First column is the product name, remaining columns are ISO dates; cells
/// are formatted prices or [`ABSENT_MARKER`], and each row carries its
/// styling hint.
#[derive(Debug, Clone, Serialize)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub name: String,
    pub cells: Vec<String>,
    pub status: RowStatus,
}

/// Pivot observations into rows-by-name, columns-by-date over the most
/// recent `window_size` distinct dates.
///
/// Where duplicate logical entries exist for a (name, date), the first in
/// store order wins. Products with no observation inside the window get no
/// row at all.
pub fn build_matrix(observations: &[PriceObservation], window_size: usize) -> ChangeMatrix {
    if window_size == 0 {
        return ChangeMatrix {
            dates: Vec::new(),
            rows: Vec::new(),
        };
    }

    let mut dates: Vec<NaiveDate> = observations
        .iter()
        .map(|obs| obs.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if dates.len() > window_size {
        dates = dates.split_off(dates.len() - window_size);
    }

    let mut by_name: BTreeMap<&str, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for obs in observations {
        if !dates.contains(&obs.date) {
            continue;
        }
        by_name
            .entry(obs.name.as_str())
            .or_default()
            .entry(obs.date)
            .or_insert(obs.price);
    }

    let rows = by_name
        .into_iter()
        .map(|(name, prices)| {
            let cells: Vec<Option<f64>> = dates.iter().map(|d| prices.get(d).copied()).collect();
            let status = RowStatus::classify(&cells);
            MatrixRow {
                name: name.to_string(),
                cells,
                status,
            }
        })
        .collect();

    ChangeMatrix { dates, rows }
}

/// Format the matrix for the presentation layer.
///
/// The default report passes `only_flagged = true`: stable, fully-present
/// rows are noise — the report exists to draw attention to movement.
pub fn to_table(matrix: &ChangeMatrix, only_flagged: bool) -> ReportTable {
    let mut columns = vec!["name".to_string()];
    columns.extend(matrix.dates.iter().map(|d| d.format("%Y-%m-%d").to_string()));

    let rows = matrix
        .rows
        .iter()
        .filter(|row| !only_flagged || row.is_flagged())
        .map(|row| ReportRow {
            name: row.name.clone(),
            cells: row
                .cells
                .iter()
                .map(|cell| {
                    cell.map(|price| format!("{price:.2}"))
                        .unwrap_or_else(|| ABSENT_MARKER.to_string())
                })
                .collect(),
            status: row.status,
        })
        .collect();

    ReportTable { columns, rows }
}

/// Plain-text rendering for the CLI.
pub fn render_text(table: &ReportTable) -> String {
    if table.rows.is_empty() {
        return NO_CHANGES_MESSAGE.to_string();
    }

    let status_label = |status: RowStatus| match status {
        RowStatus::Stable => "stable",
        RowStatus::Changed => "changed",
        RowStatus::Missing => "missing",
    };

    let mut widths: Vec<usize> = table.columns.iter().map(String::len).collect();
    for row in &table.rows {
        widths[0] = widths[0].max(row.name.len());
        for (i, cell) in row.cells.iter().enumerate() {
            widths[i + 1] = widths[i + 1].max(cell.len());
        }
    }

    let mut out = String::new();
    for (i, column) in table.columns.iter().enumerate() {
        out.push_str(&format!("{:<width$}  ", column, width = widths[i]));
    }
    out.push_str("status\n");

    for row in &table.rows {
        out.push_str(&format!("{:<width$}  ", row.name, width = widths[0]));
        for (i, cell) in row.cells.iter().enumerate() {
            out.push_str(&format!("{:<width$}  ", cell, width = widths[i + 1]));
        }
        out.push_str(status_label(row.status));
        out.push('\n');
    }
    out
}
