use std::sync::Arc;

use tracing::info;
use tripletop_core::{HttpClient, PipelineConfig, ReportSink, ReportTable};

use crate::cli::PublishArgs;
use crate::error::CliError;

use super::{sheets_sink, CommandResult};

pub async fn run(
    args: &PublishArgs,
    config: &PipelineConfig,
    http_client: Arc<dyn HttpClient>,
) -> Result<CommandResult, CliError> {
    let table = ReportTable::read_csv(&args.report)?;
    info!(report = %args.report.display(), rows = table.len(), "publishing report");

    let sink = sheets_sink(config, http_client, args.share_with.clone())?;
    let receipt = sink.publish(&table).await?;

    Ok(CommandResult::ok(serde_json::to_value(receipt)?))
}
