mod lookup;
mod publish;
mod run;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::info_span;
use tracing::Instrument;
use tripletop_core::{
    EnrichmentFetcher, GoogleSheetsSink, HttpClient, PipelineConfig, PoliteThrottle,
    ReqwestHttpClient, SinkError, YahooValuationSource,
};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::{RunId, Summary};

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Summary, CliError> {
    let config = PipelineConfig::load(cli.config.as_deref())?;
    let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());

    let run_id = RunId::new_v4();
    let started = Instant::now();
    let (command, span) = match &cli.command {
        Command::Run(_) => ("run", info_span!("run", %run_id)),
        Command::Publish(_) => ("publish", info_span!("publish", %run_id)),
        Command::Lookup(_) => ("lookup", info_span!("lookup", %run_id)),
    };

    let result = async {
        match &cli.command {
            Command::Run(args) => run::run(args, config, http_client).await,
            Command::Publish(args) => publish::run(args, &config, http_client).await,
            Command::Lookup(args) => lookup::run(args, &config, http_client).await,
        }
    }
    .instrument(span)
    .await?;

    Ok(Summary {
        run_id,
        command,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        warnings: result.warnings,
        errors: result.errors,
        data: result.data,
    })
}

fn enrichment_fetcher(
    config: &PipelineConfig,
    http_client: Arc<dyn HttpClient>,
    concurrency: Option<usize>,
    throttle_ms: Option<u64>,
) -> EnrichmentFetcher {
    let source = YahooValuationSource::new(http_client).with_timeout_ms(config.lookup_timeout_ms);
    let throttle =
        PoliteThrottle::new(Duration::from_millis(throttle_ms.unwrap_or(config.throttle_ms)));
    EnrichmentFetcher::new(Arc::new(source), throttle)
        .with_market_suffix(config.market_suffix.clone())
        .with_max_concurrency(concurrency.unwrap_or(config.max_concurrency))
}

fn sheets_sink(
    config: &PipelineConfig,
    http_client: Arc<dyn HttpClient>,
    share_with: Option<String>,
) -> Result<GoogleSheetsSink, SinkError> {
    let token = config
        .sheets
        .access_token
        .clone()
        .ok_or_else(|| {
            SinkError::MissingCredentials(String::from(
                "set GOOGLE_OAUTH_ACCESS_TOKEN or sheets.access_token",
            ))
        })?;
    Ok(GoogleSheetsSink::new(http_client, token)
        .with_share_with(share_with.or_else(|| config.sheets.share_with.clone()))
        .with_title_prefix(config.sheets.title_prefix.clone()))
}
