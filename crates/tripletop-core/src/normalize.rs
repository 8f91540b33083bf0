//! Schema normalization.
//!
//! Each listing names its columns differently (`name`/`Name`,
//! `symbol`/`Symbol`/`Ticker`, `country`/`Country`, `rank`/`Rank`). The
//! normalizer locates those roles case-insensitively, trims every cell and
//! keeps all original columns for the audit artifacts.

use tracing::{debug, warn};

use crate::table::RawTable;
use crate::{CompanyRecord, Dataset, SchemaError, Symbol};

const NAME_HEADERS: [&str; 3] = ["name", "company", "company name"];
const SYMBOL_HEADERS: [&str; 2] = ["symbol", "ticker"];
const RANK_HEADERS: [&str; 1] = ["rank"];
const COUNTRY_HEADERS: [&str; 1] = ["country"];

/// Column index per canonical role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRoles {
    pub name: usize,
    pub symbol: Option<usize>,
    pub rank: Option<usize>,
    pub country: Option<usize>,
    /// First numeric column that is neither an identity nor a price column.
    pub metric: Option<usize>,
}

/// A source table mapped onto the canonical record shape.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub dataset: Dataset,
    pub columns: Vec<String>,
    pub roles: ColumnRoles,
    pub records: Vec<CompanyRecord>,
}

impl NormalizedTable {
    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    /// Re-materializes the normalized cells as a raw table.
    pub fn to_raw(&self) -> RawTable {
        RawTable::new(
            self.columns.clone(),
            self.records
                .iter()
                .map(|record| record.cells.clone())
                .collect(),
        )
    }
}

/// Normalizes one raw source table.
///
/// # Errors
///
/// Returns [`SchemaError::MissingNameColumn`] when no column denotes the
/// company name.
pub fn normalize(dataset: Dataset, table: &RawTable) -> Result<NormalizedTable, SchemaError> {
    let columns = table
        .headers
        .iter()
        .map(|header| header.trim().to_owned())
        .collect::<Vec<_>>();

    let name = find_column(&columns, &NAME_HEADERS).ok_or_else(|| {
        SchemaError::MissingNameColumn {
            dataset,
            columns: columns.clone(),
        }
    })?;
    let symbol = find_column(&columns, &SYMBOL_HEADERS);
    let rank = find_column(&columns, &RANK_HEADERS);
    let country = find_column(&columns, &COUNTRY_HEADERS);

    // Metric detection only sees rows that become records.
    let (rows, skipped): (Vec<_>, Vec<_>) = table
        .rows
        .iter()
        .map(|row| {
            let mut cells = row.iter().map(|cell| cell.trim().to_owned()).collect::<Vec<_>>();
            cells.resize(columns.len(), String::new());
            cells
        })
        .partition(|cells| !cells[name].is_empty());
    let skipped = skipped.len();

    let reserved = [Some(name), symbol, rank, country];
    let metric = (0..columns.len()).find(|&index| {
        !reserved.contains(&Some(index))
            && !columns[index].to_lowercase().contains("price")
            && is_numeric_column(&rows, index)
    });

    let roles = ColumnRoles {
        name,
        symbol,
        rank,
        country,
        metric,
    };

    let records = rows
        .into_iter()
        .map(|cells| to_record(dataset, &roles, cells))
        .collect::<Vec<_>>();

    if skipped > 0 {
        warn!(%dataset, skipped, "dropped rows without a company name");
    }
    debug!(
        %dataset,
        rows = records.len(),
        symbol_column = ?symbol.map(|index| &columns[index]),
        rank_column = ?rank.map(|index| &columns[index]),
        metric_column = ?metric.map(|index| &columns[index]),
        "normalized table"
    );

    Ok(NormalizedTable {
        dataset,
        columns,
        roles,
        records,
    })
}

/// Parses a numeric cell, tolerating thousands separators and a leading `$`.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cleaned = cell.trim().trim_start_matches('$').replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn parse_rank(cell: &str) -> Option<i64> {
    parse_number(cell)
        .filter(|value| value.fract() == 0.0 && value.abs() < i64::MAX as f64)
        .map(|value| value as i64)
}

fn find_column(columns: &[String], candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|candidate| {
        columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(candidate))
    })
}

fn is_numeric_column(rows: &[Vec<String>], index: usize) -> bool {
    let mut seen_value = false;
    for row in rows {
        let cell = row[index].as_str();
        if cell.is_empty() {
            continue;
        }
        if parse_number(cell).is_none() {
            return false;
        }
        seen_value = true;
    }
    seen_value
}

fn to_record(dataset: Dataset, roles: &ColumnRoles, cells: Vec<String>) -> CompanyRecord {
    let symbol = roles.symbol.and_then(|index| {
        let cell = cells[index].as_str();
        if cell.is_empty() {
            return None;
        }
        match Symbol::parse(cell) {
            Ok(symbol) => Some(symbol),
            Err(error) => {
                debug!(%dataset, cell, %error, "ignoring unusable symbol");
                None
            }
        }
    });

    CompanyRecord {
        name: cells[roles.name].clone(),
        symbol,
        rank: roles.rank.and_then(|index| parse_rank(&cells[index])),
        metric: roles.metric.and_then(|index| parse_number(&cells[index])),
        country: roles
            .country
            .map(|index| cells[index].clone())
            .filter(|country| !country.is_empty()),
        cells,
    }
}
