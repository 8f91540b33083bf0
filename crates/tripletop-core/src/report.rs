//! Final ordering and tabular form of the enriched intersection.

use std::cmp::Ordering;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::table::RawTable;
use crate::{ArtifactError, EnrichedCompany};

pub const REPORT_COLUMNS: [&str; 3] = ["name", "symbol", "valuation_ratio"];

/// Enriched companies ordered by ascending valuation ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    companies: Vec<EnrichedCompany>,
}

impl Report {
    pub fn companies(&self) -> &[EnrichedCompany] {
        &self.companies
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    pub fn with_ratio(&self) -> usize {
        self.companies
            .iter()
            .filter(|company| company.valuation_ratio().is_some())
            .count()
    }

    pub fn to_table(&self) -> ReportTable {
        ReportTable {
            header: REPORT_COLUMNS.map(String::from).to_vec(),
            rows: self
                .companies
                .iter()
                .map(|company| {
                    vec![
                        company.name().to_owned(),
                        company
                            .symbol()
                            .map(ToString::to_string)
                            .unwrap_or_default(),
                        company
                            .valuation_ratio()
                            .map(|ratio| ratio.to_string())
                            .unwrap_or_default(),
                    ]
                })
                .collect(),
        }
    }
}

/// Sorts ascending by ratio; missing ratios go last and ties keep input order.
pub fn build_report(mut companies: Vec<EnrichedCompany>) -> Report {
    companies.sort_by(|a, b| compare_ratio(a.valuation_ratio(), b.valuation_ratio()));
    let report = Report { companies };
    info!(
        rows = report.len(),
        with_ratio = report.with_ratio(),
        "built valuation report"
    );
    report
}

fn compare_ratio(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Text form of a report: the header row plus one row per company.
///
/// Missing values are empty strings. This is the shape handed to sinks and
/// the shape read back from a report artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header and rows as one grid, header first.
    pub fn values(&self) -> Vec<Vec<String>> {
        std::iter::once(self.header.clone())
            .chain(self.rows.iter().cloned())
            .collect()
    }

    /// Reads a previously written report artifact.
    pub fn read_csv(path: &Path) -> Result<Self, ArtifactError> {
        let file = std::fs::File::open(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw = RawTable::from_csv_reader(file).map_err(|source| ArtifactError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_raw(raw).map_err(|message| ArtifactError::Malformed {
            path: path.to_path_buf(),
            message,
        })
    }

    fn from_raw(raw: RawTable) -> Result<Self, String> {
        let normalized_header = raw
            .headers
            .iter()
            .map(|column| column.trim().to_ascii_lowercase())
            .collect::<Vec<_>>();
        if normalized_header != REPORT_COLUMNS {
            return Err(format!(
                "expected columns {}, found {}",
                REPORT_COLUMNS.join(","),
                raw.headers.join(",")
            ));
        }
        Ok(Self {
            header: REPORT_COLUMNS.map(String::from).to_vec(),
            rows: raw.rows,
        })
    }
}
