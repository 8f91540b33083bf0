//! Acquisition of the three raw ranking tables.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::http_client::{HttpClient, HttpRequest};
use crate::table::RawTable;
use crate::{Dataset, SourceFetchError};

pub const DEFAULT_MARKETCAP_URL: &str = "https://companiesmarketcap.com/inr?download=csv";
pub const DEFAULT_REVENUE_URL: &str =
    "https://companiesmarketcap.com/largest-companies-by-revenue?download=csv";
pub const DEFAULT_EARNINGS_URL: &str =
    "https://companiesmarketcap.com/most-profitable-companies/?download=csv";
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Download location of each dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceUrls {
    pub marketcap: String,
    pub revenue: String,
    pub earnings: String,
}

impl SourceUrls {
    pub fn url(&self, dataset: Dataset) -> &str {
        match dataset {
            Dataset::Marketcap => &self.marketcap,
            Dataset::Revenue => &self.revenue,
            Dataset::Earnings => &self.earnings,
        }
    }
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self {
            marketcap: String::from(DEFAULT_MARKETCAP_URL),
            revenue: String::from(DEFAULT_REVENUE_URL),
            earnings: String::from(DEFAULT_EARNINGS_URL),
        }
    }
}

/// Provider of raw dataset tables.
pub trait TableSource: Send + Sync {
    fn describe(&self, dataset: Dataset) -> String;

    fn fetch<'a>(
        &'a self,
        dataset: Dataset,
    ) -> Pin<Box<dyn Future<Output = Result<RawTable, SourceFetchError>> + Send + 'a>>;
}

/// Downloads each dataset as CSV. One attempt per dataset, bounded by a timeout.
#[derive(Clone)]
pub struct HttpTableSource {
    http_client: Arc<dyn HttpClient>,
    urls: SourceUrls,
    timeout_ms: u64,
}

impl HttpTableSource {
    pub fn new(http_client: Arc<dyn HttpClient>, urls: SourceUrls) -> Self {
        Self {
            http_client,
            urls,
            timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    async fn download(&self, dataset: Dataset) -> Result<RawTable, SourceFetchError> {
        let url = self.urls.url(dataset);
        debug!(%dataset, url, "downloading dataset");

        let request = HttpRequest::get(url)
            .with_header("accept", "text/csv,*/*")
            .with_timeout_ms(self.timeout_ms);
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| SourceFetchError::Transport {
                dataset,
                message: error.message().to_owned(),
            })?;

        if !response.is_success() {
            return Err(SourceFetchError::Status {
                dataset,
                status: response.status,
            });
        }

        let table = parse_payload(dataset, &response.body)?;
        info!(%dataset, rows = table.len(), columns = table.width(), "dataset downloaded");
        Ok(table)
    }
}

impl TableSource for HttpTableSource {
    fn describe(&self, dataset: Dataset) -> String {
        self.urls.url(dataset).to_owned()
    }

    fn fetch<'a>(
        &'a self,
        dataset: Dataset,
    ) -> Pin<Box<dyn Future<Output = Result<RawTable, SourceFetchError>> + Send + 'a>> {
        Box::pin(self.download(dataset))
    }
}

/// Reads `<dir>/<dataset>.csv` for offline runs.
#[derive(Debug, Clone)]
pub struct DirectoryTableSource {
    dir: PathBuf,
}

impl DirectoryTableSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, dataset: Dataset) -> PathBuf {
        self.dir.join(format!("{dataset}.csv"))
    }
}

impl TableSource for DirectoryTableSource {
    fn describe(&self, dataset: Dataset) -> String {
        self.path(dataset).display().to_string()
    }

    fn fetch<'a>(
        &'a self,
        dataset: Dataset,
    ) -> Pin<Box<dyn Future<Output = Result<RawTable, SourceFetchError>> + Send + 'a>> {
        Box::pin(async move {
            let path = self.path(dataset);
            let body = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| SourceFetchError::Io {
                    dataset,
                    path: path.clone(),
                    source,
                })?;
            let table = parse_payload(dataset, &body)?;
            info!(%dataset, path = %path.display(), rows = table.len(), "dataset loaded");
            Ok(table)
        })
    }
}

fn parse_payload(dataset: Dataset, body: &str) -> Result<RawTable, SourceFetchError> {
    let table = RawTable::from_csv_str(body).map_err(|error| SourceFetchError::Malformed {
        dataset,
        message: error.to_string(),
    })?;

    if table.headers.iter().all(|header| header.trim().is_empty()) {
        return Err(SourceFetchError::Malformed {
            dataset,
            message: String::from("payload has no header row"),
        });
    }
    if body.trim_start().starts_with('<') {
        return Err(SourceFetchError::Malformed {
            dataset,
            message: String::from("payload is HTML, not CSV"),
        });
    }
    Ok(table)
}
