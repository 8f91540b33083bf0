//! End-to-end orchestration: acquire, normalize, select, intersect, enrich, report.
//!
//! Nothing is written to disk until [`Pipeline::run`] has produced the full
//! report; [`ArtifactWriter`] then persists every artifact in one pass.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::enrich::EnrichmentFetcher;
use crate::intersect::{self, Intersection};
use crate::normalize::normalize;
use crate::report::{build_report, Report, ReportTable};
use crate::select::{select_top, SelectionCriteria};
use crate::source::TableSource;
use crate::{ArtifactError, Dataset, PipelineError, RankedTable, TopTables};

pub const COMMON_COMPANIES_FILE: &str = "common_companies.csv";
pub const REPORT_FILE: &str = "common_with_pe_sorted.csv";

/// Everything a run produced, kept in memory until artifacts are written.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub top_tables: TopTables,
    pub intersection: Intersection,
    pub report: Report,
}

/// Wires a table source, selection criteria and enrichment fetcher together.
pub struct Pipeline {
    tables: Arc<dyn TableSource>,
    criteria: SelectionCriteria,
    fetcher: EnrichmentFetcher,
}

impl Pipeline {
    pub fn new(
        tables: Arc<dyn TableSource>,
        criteria: SelectionCriteria,
        fetcher: EnrichmentFetcher,
    ) -> Self {
        Self {
            tables,
            criteria,
            fetcher,
        }
    }

    pub fn criteria(&self) -> &SelectionCriteria {
        &self.criteria
    }

    /// Runs every stage in order.
    ///
    /// # Errors
    ///
    /// A dataset that cannot be fetched or has no name column aborts the
    /// run. Valuation lookup failures never do.
    pub async fn run(&self) -> Result<PipelineOutput, PipelineError> {
        let marketcap = self.ranked(Dataset::Marketcap).await?;
        let revenue = self.ranked(Dataset::Revenue).await?;
        let earnings = self.ranked(Dataset::Earnings).await?;
        let top_tables = TopTables {
            marketcap,
            revenue,
            earnings,
        };

        let intersection = intersect::resolve(&top_tables);
        let enriched = self.fetcher.enrich_all(&intersection.companies).await;
        let report = build_report(enriched);

        Ok(PipelineOutput {
            top_tables,
            intersection,
            report,
        })
    }

    async fn ranked(&self, dataset: Dataset) -> Result<RankedTable, PipelineError> {
        info!(%dataset, source = %self.tables.describe(dataset), "fetching dataset");
        let raw = self.tables.fetch(dataset).await?;
        let normalized = normalize(dataset, &raw)?;
        let ranked = select_top(&normalized, &self.criteria);
        info!(
            %dataset,
            rows = normalized.records.len(),
            selected = ranked.len(),
            basis = %ranked.basis,
            "selected top companies"
        );
        Ok(ranked)
    }
}

/// Paths of the artifacts written for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPaths {
    pub marketcap: PathBuf,
    pub revenue: PathBuf,
    pub earnings: PathBuf,
    pub common_companies: PathBuf,
    pub report: PathBuf,
}

/// Writes run artifacts into one output directory.
///
/// Each file is written to a temporary sibling and renamed into place, so a
/// reader never observes a partially written artifact.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `top{N}_{dataset}_{country}.csv`, with `all` when no country filter applies.
    pub fn top_table_file(criteria: &SelectionCriteria, dataset: Dataset) -> String {
        let country = criteria
            .country
            .as_deref()
            .map(file_label)
            .unwrap_or_else(|| String::from("all"));
        format!("top{}_{dataset}_{country}.csv", criteria.top_n)
    }

    pub fn write_all(
        &self,
        output: &PipelineOutput,
        criteria: &SelectionCriteria,
    ) -> Result<ArtifactPaths, ArtifactError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| ArtifactError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let marketcap = self.write_ranked(&output.top_tables.marketcap, criteria)?;
        let revenue = self.write_ranked(&output.top_tables.revenue, criteria)?;
        let earnings = self.write_ranked(&output.top_tables.earnings, criteria)?;

        let common_companies = self.dir.join(COMMON_COMPANIES_FILE);
        self.write_rows(
            &common_companies,
            ["name", "symbol"],
            output.intersection.companies.iter().map(|company| {
                vec![
                    company.name.clone(),
                    company
                        .symbol
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                ]
            }),
        )?;

        let report = self.write_report(&output.report.to_table())?;

        let paths = ArtifactPaths {
            marketcap,
            revenue,
            earnings,
            common_companies,
            report,
        };
        info!(dir = %self.dir.display(), "artifacts written");
        Ok(paths)
    }

    pub fn write_report(&self, table: &ReportTable) -> Result<PathBuf, ArtifactError> {
        let path = self.dir.join(REPORT_FILE);
        self.write_rows(&path, &table.header, table.rows.iter().cloned())?;
        Ok(path)
    }

    fn write_ranked(
        &self,
        table: &RankedTable,
        criteria: &SelectionCriteria,
    ) -> Result<PathBuf, ArtifactError> {
        let path = self
            .dir
            .join(Self::top_table_file(criteria, table.dataset));
        self.write_rows(
            &path,
            &table.columns,
            table.records.iter().map(|record| record.cells.clone()),
        )?;
        Ok(path)
    }

    fn write_rows<H, I>(&self, path: &Path, header: H, rows: I) -> Result<(), ArtifactError>
    where
        H: IntoIterator,
        H::Item: AsRef<[u8]>,
        I: IntoIterator<Item = Vec<String>>,
    {
        let io_error = |source: std::io::Error| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        };
        let csv_error = |source: csv::Error| ArtifactError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let temp = NamedTempFile::new_in(&self.dir).map_err(io_error)?;
        let mut writer = csv::Writer::from_writer(temp);
        writer.write_record(header).map_err(csv_error)?;
        for row in rows {
            writer.write_record(&row).map_err(csv_error)?;
        }
        let temp = writer
            .into_inner()
            .map_err(|error| io_error(error.into_error()))?;
        temp.persist(path).map_err(|error| io_error(error.error))?;
        Ok(())
    }
}

fn file_label(country: &str) -> String {
    country
        .trim()
        .to_lowercase()
        .chars()
        .map(|ch| if ch.is_alphanumeric() { ch } else { '_' })
        .collect()
}
