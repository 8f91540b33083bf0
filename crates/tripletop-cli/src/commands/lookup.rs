use std::sync::Arc;

use serde::Serialize;
use tripletop_core::{HttpClient, PipelineConfig, ResolvedCompany, Symbol};

use crate::cli::LookupArgs;
use crate::error::CliError;

use super::{enrichment_fetcher, CommandResult};

#[derive(Debug, Serialize)]
struct LookupRow {
    symbol: Symbol,
    valuation_ratio: Option<f64>,
    outcome: &'static str,
    detail: String,
}

#[derive(Debug, Serialize)]
struct LookupData {
    results: Vec<LookupRow>,
}

pub async fn run(
    args: &LookupArgs,
    config: &PipelineConfig,
    http_client: Arc<dyn HttpClient>,
) -> Result<CommandResult, CliError> {
    if let Some(concurrency) = args.concurrency {
        if !(1..=8).contains(&concurrency) {
            return Err(CliError::Usage(format!(
                "--concurrency must be between 1 and 8, got {concurrency}"
            )));
        }
    }

    let companies = args
        .symbols
        .iter()
        .map(|raw| Symbol::parse(raw).map(|symbol| ResolvedCompany::new(raw.trim(), Some(symbol))))
        .collect::<Result<Vec<_>, _>>()?;

    let fetcher = enrichment_fetcher(config, http_client, args.concurrency, args.throttle_ms);
    let enriched = fetcher.enrich_all(&companies).await;

    let warnings = enriched
        .iter()
        .filter(|company| company.outcome().had_failure())
        .map(|company| format!("{}: {}", company.name(), company.outcome()))
        .collect();
    let results = enriched
        .iter()
        .filter_map(|company| {
            company.symbol().map(|symbol| LookupRow {
                symbol: symbol.clone(),
                valuation_ratio: company.valuation_ratio(),
                outcome: company.outcome().label(),
                detail: company.outcome().to_string(),
            })
        })
        .collect();

    Ok(CommandResult::ok(serde_json::to_value(LookupData { results })?).with_warnings(warnings))
}
