//! Spreadsheet publishing.
//!
//! The Google sink talks to the Sheets v4 and Drive v3 REST APIs with an
//! OAuth bearer token. Publishing creates a fresh spreadsheet, optionally
//! shares it, then writes the report grid as raw text. Local artifacts are
//! never touched, whatever the outcome.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::{debug, info};

use crate::http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::report::ReportTable;
use crate::SinkError;

pub const DEFAULT_TITLE_PREFIX: &str = "common_with_sorted_pe";

const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const DEFAULT_SINK_TIMEOUT_MS: u64 = 30_000;

/// Where a report ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub spreadsheet_id: String,
    pub url: String,
    pub title: String,
    pub rows: usize,
    pub shared_with: Option<String>,
}

/// Destination for a finished report.
pub trait ReportSink: Send + Sync {
    fn name(&self) -> &'static str;

    fn publish<'a>(
        &'a self,
        table: &'a ReportTable,
    ) -> Pin<Box<dyn Future<Output = Result<PublishReceipt, SinkError>> + Send + 'a>>;
}

/// `{prefix}-YYYY-MM-DD`.
pub fn sheet_title(prefix: &str, date: Date) -> Result<String, SinkError> {
    let day = date
        .format(format_description!("[year]-[month]-[day]"))
        .map_err(|error| SinkError::Title(error.to_string()))?;
    Ok(format!("{prefix}-{day}"))
}

#[derive(Clone)]
pub struct GoogleSheetsSink {
    http_client: Arc<dyn HttpClient>,
    access_token: String,
    share_with: Option<String>,
    title_prefix: String,
    timeout_ms: u64,
}

impl GoogleSheetsSink {
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: impl Into<String>) -> Self {
        Self {
            http_client,
            access_token: access_token.into(),
            share_with: None,
            title_prefix: String::from(DEFAULT_TITLE_PREFIX),
            timeout_ms: DEFAULT_SINK_TIMEOUT_MS,
        }
    }

    pub fn with_share_with(mut self, email: Option<String>) -> Self {
        self.share_with = email
            .map(|email| email.trim().to_owned())
            .filter(|email| !email.is_empty());
        self
    }

    pub fn with_title_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.title_prefix = prefix.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    async fn publish_table(&self, table: &ReportTable) -> Result<PublishReceipt, SinkError> {
        if self.access_token.trim().is_empty() {
            return Err(SinkError::MissingCredentials(String::from(
                "no Google OAuth access token configured",
            )));
        }

        let title = sheet_title(&self.title_prefix, OffsetDateTime::now_utc().date())?;
        info!(%title, rows = table.len(), "creating spreadsheet");
        let created = self.create_spreadsheet(&title).await?;

        if let Some(email) = &self.share_with {
            self.share(&created.spreadsheet_id, email).await?;
            info!(recipient = %email, "spreadsheet shared");
        }

        let sheet = created
            .sheets
            .first()
            .map(|sheet| sheet.properties.title.clone())
            .unwrap_or_else(|| String::from("Sheet1"));
        self.write_values(&created.spreadsheet_id, &sheet, table).await?;

        let url = created.spreadsheet_url.unwrap_or_else(|| {
            format!(
                "https://docs.google.com/spreadsheets/d/{}",
                created.spreadsheet_id
            )
        });
        info!(%url, "report published");
        Ok(PublishReceipt {
            spreadsheet_id: created.spreadsheet_id,
            url,
            title,
            rows: table.len(),
            shared_with: self.share_with.clone(),
        })
    }

    async fn create_spreadsheet(&self, title: &str) -> Result<CreatedSpreadsheet, SinkError> {
        let body = json!({ "properties": { "title": title } });
        let response = self.send(HttpRequest::post(SHEETS_URL).with_json(&body)).await?;
        serde_json::from_str(&response.body)
            .map_err(|e| SinkError::Malformed(format!("unexpected create response: {e}")))
    }

    async fn share(&self, spreadsheet_id: &str, email: &str) -> Result<(), SinkError> {
        let url = format!(
            "{DRIVE_FILES_URL}/{}/permissions?sendNotificationEmail=true",
            urlencoding::encode(spreadsheet_id)
        );
        let body = json!({ "type": "user", "role": "writer", "emailAddress": email });
        self.send(HttpRequest::post(url).with_json(&body)).await?;
        Ok(())
    }

    async fn write_values(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        table: &ReportTable,
    ) -> Result<(), SinkError> {
        let range = format!("'{}'!A1", sheet.replace('\'', "''"));
        let url = format!(
            "{SHEETS_URL}/{}/values/{}?valueInputOption=RAW",
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(&range)
        );
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": table.values(),
        });
        self.send(HttpRequest::put(url).with_json(&body)).await?;
        debug!(%spreadsheet_id, cells = (table.len() + 1) * table.header.len(), "values written");
        Ok(())
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SinkError> {
        let request = request
            .with_auth(&HttpAuth::BearerToken(self.access_token.clone()))
            .with_timeout_ms(self.timeout_ms);
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(transport_error)?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(status_error(&response))
        }
    }
}

impl std::fmt::Debug for GoogleSheetsSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsSink")
            .field("access_token", &"<redacted>")
            .field("share_with", &self.share_with)
            .field("title_prefix", &self.title_prefix)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl ReportSink for GoogleSheetsSink {
    fn name(&self) -> &'static str {
        "google_sheets"
    }

    fn publish<'a>(
        &'a self,
        table: &'a ReportTable,
    ) -> Pin<Box<dyn Future<Output = Result<PublishReceipt, SinkError>> + Send + 'a>> {
        Box::pin(self.publish_table(table))
    }
}

fn transport_error(error: HttpError) -> SinkError {
    SinkError::Transport(error.message().to_owned())
}

fn status_error(response: &HttpResponse) -> SinkError {
    let detail = serde_json::from_str::<GoogleErrorEnvelope>(&response.body)
        .ok()
        .map(|envelope| envelope.error);
    let message = detail
        .as_ref()
        .and_then(|error| error.message.clone())
        .unwrap_or_else(|| format!("status {}", response.status));
    let exhausted = detail
        .as_ref()
        .and_then(|error| error.status.as_deref())
        .is_some_and(|status| status == "RESOURCE_EXHAUSTED")
        || message.to_lowercase().contains("quota");

    match response.status {
        429 => SinkError::Quota(message),
        403 if exhausted => SinkError::Quota(message),
        401 | 403 => SinkError::Unauthorized {
            status: response.status,
            message,
        },
        status => SinkError::Upstream { status, message },
    }
}

// ============================================================================
// Google API response structures
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSpreadsheet {
    spreadsheet_id: String,
    #[serde(default)]
    spreadsheet_url: Option<String>,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}
