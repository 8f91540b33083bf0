use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};
use tripletop_core::{
    ArtifactPaths, ArtifactWriter, DirectoryTableSource, EnrichedCompany, HttpClient,
    HttpTableSource, Pipeline, PipelineConfig, PublishReceipt, ReportSink, TableSource,
};

use crate::cli::RunArgs;
use crate::error::CliError;

use super::{enrichment_fetcher, sheets_sink, CommandResult};

#[derive(Debug, Serialize)]
struct RunData {
    country: Option<String>,
    top_n: usize,
    selected: SelectedCounts,
    common: usize,
    with_ratio: usize,
    without_symbol: usize,
    lookup_failures: usize,
    artifacts: ArtifactPaths,
    #[serde(skip_serializing_if = "Option::is_none")]
    published: Option<PublishReceipt>,
    rows: Vec<ReportRow>,
}

#[derive(Debug, Serialize)]
struct SelectedCounts {
    marketcap: usize,
    revenue: usize,
    earnings: usize,
}

#[derive(Debug, Serialize)]
struct ReportRow {
    name: String,
    symbol: Option<String>,
    valuation_ratio: Option<f64>,
    outcome: String,
}

impl From<&EnrichedCompany> for ReportRow {
    fn from(company: &EnrichedCompany) -> Self {
        Self {
            name: company.name().to_owned(),
            symbol: company.symbol().map(ToString::to_string),
            valuation_ratio: company.valuation_ratio(),
            outcome: company.outcome().to_string(),
        }
    }
}

pub async fn run(
    args: &RunArgs,
    config: PipelineConfig,
    http_client: Arc<dyn HttpClient>,
) -> Result<CommandResult, CliError> {
    let config = apply_overrides(config, args)?;

    let tables: Arc<dyn TableSource> = match &args.input_dir {
        Some(dir) => Arc::new(DirectoryTableSource::new(dir)),
        None => Arc::new(
            HttpTableSource::new(Arc::clone(&http_client), config.sources.clone())
                .with_timeout_ms(config.fetch_timeout_ms),
        ),
    };
    let fetcher = enrichment_fetcher(&config, Arc::clone(&http_client), None, None);
    let pipeline = Pipeline::new(tables, config.selection_criteria(), fetcher);

    let output = pipeline.run().await?;
    let artifacts = ArtifactWriter::new(&config.output_dir).write_all(&output, pipeline.criteria())?;
    info!(report = %artifacts.report.display(), "report written");

    let mut warnings = Vec::new();
    for coverage in &output.intersection.coverage {
        if !coverage.is_complete() {
            warnings.push(format!(
                "{} table: {} of {} selected companies have a symbol",
                coverage.dataset, coverage.with_symbol, coverage.records
            ));
        }
    }
    let lookup_failures = output
        .report
        .companies()
        .iter()
        .filter(|company| company.outcome().had_failure())
        .count();
    if lookup_failures > 0 {
        warnings.push(format!("{lookup_failures} valuation lookups failed"));
    }

    let mut publish_error = None;
    let published = if args.publish {
        let publish = async {
            let sink = sheets_sink(&config, http_client, args.share_with.clone())?;
            sink.publish(&output.report.to_table()).await
        };
        match publish.await {
            Ok(receipt) => Some(receipt),
            Err(sink_error) => {
                error!(error = %sink_error, "publishing failed; local artifacts are kept");
                publish_error = Some(sink_error.to_string());
                None
            }
        }
    } else {
        None
    };

    let report = &output.report;
    let data = RunData {
        country: pipeline.criteria().country.clone(),
        top_n: pipeline.criteria().top_n,
        selected: SelectedCounts {
            marketcap: output.top_tables.marketcap.len(),
            revenue: output.top_tables.revenue.len(),
            earnings: output.top_tables.earnings.len(),
        },
        common: output.intersection.len(),
        with_ratio: report.with_ratio(),
        without_symbol: report
            .companies()
            .iter()
            .filter(|company| company.symbol().is_none())
            .count(),
        lookup_failures,
        artifacts,
        published,
        rows: report.companies().iter().map(ReportRow::from).collect(),
    };

    let mut result = CommandResult::ok(serde_json::to_value(data)?).with_warnings(warnings);
    if let Some(message) = publish_error {
        result = result.with_error(message);
    }
    Ok(result)
}

fn apply_overrides(mut config: PipelineConfig, args: &RunArgs) -> Result<PipelineConfig, CliError> {
    if let Some(country) = &args.country {
        config.country = country.clone();
    }
    if let Some(top_n) = args.top_n {
        config.top_n = top_n;
    }
    if let Some(dir) = &args.out_dir {
        config.output_dir = dir.clone();
    }
    if let Some(concurrency) = args.concurrency {
        if !(1..=8).contains(&concurrency) {
            return Err(CliError::Usage(format!(
                "--concurrency must be between 1 and 8, got {concurrency}"
            )));
        }
        config.max_concurrency = concurrency;
    }
    if let Some(throttle_ms) = args.throttle_ms {
        config.throttle_ms = throttle_ms;
    }
    if let Some(email) = &args.share_with {
        config.sheets.share_with = Some(email.clone());
    }
    config.validate()?;
    Ok(config)
}
