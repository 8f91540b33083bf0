//! Top-N selection per dataset.

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::normalize::NormalizedTable;
use crate::{CompanyRecord, RankedTable, RankingBasis};

pub const DEFAULT_TOP_N: usize = 100;

/// Country filter and size bound for one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionCriteria {
    pub country: Option<String>,
    pub top_n: usize,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            country: None,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl SelectionCriteria {
    pub fn new(country: Option<String>, top_n: usize) -> Self {
        Self {
            country: country
                .map(|country| country.trim().to_owned())
                .filter(|country| !country.is_empty()),
            top_n,
        }
    }
}

/// Reduces a normalized table to its top-N records.
///
/// Ordering is by explicit rank when the table has a rank column, else by
/// the detected metric descending, else source order. All sorts are stable,
/// so ties keep their original row order.
pub fn select_top(table: &NormalizedTable, criteria: &SelectionCriteria) -> RankedTable {
    let dataset = table.dataset;
    let mut records: Vec<&CompanyRecord> = match (&criteria.country, table.roles.country) {
        (Some(country), Some(_)) => table
            .records
            .iter()
            .filter(|record| {
                record
                    .country
                    .as_deref()
                    .is_some_and(|value| value.trim().eq_ignore_ascii_case(country))
            })
            .collect(),
        (Some(country), None) => {
            warn!(%dataset, %country, "table has no country column; country filter not applied");
            table.records.iter().collect()
        }
        (None, _) => table.records.iter().collect(),
    };

    let basis = if let Some(index) = table.roles.rank {
        records.sort_by(|a, b| compare_missing_last(a.rank, b.rank, |x, y| x.cmp(&y)));
        RankingBasis::Rank(column_label(table, index))
    } else if let Some(index) = table.roles.metric {
        records.sort_by(|a, b| compare_missing_last(a.metric, b.metric, |x, y| y.total_cmp(&x)));
        RankingBasis::Metric(column_label(table, index))
    } else {
        RankingBasis::SourceOrder
    };

    records.truncate(criteria.top_n);
    debug!(%dataset, %basis, selected = records.len(), "selected top records");

    RankedTable {
        dataset,
        columns: table.columns.clone(),
        basis,
        records: records.into_iter().cloned().collect(),
    }
}

fn column_label(table: &NormalizedTable, index: usize) -> String {
    table.column_name(index).unwrap_or_default().to_owned()
}

fn compare_missing_last<T: Copy>(
    a: Option<T>,
    b: Option<T>,
    compare: impl Fn(T, T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
