use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

use crate::http_client::{HttpClient, HttpError, HttpRequest};
use crate::valuation::{ValuationSnapshot, ValuationSource};
use crate::{LookupError, Symbol};

const REFERER: &str = "https://finance.yahoo.com/";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URLS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
const QUOTE_SUMMARY_URL: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";
const SUMMARY_MODULES: &str = "summaryDetail,defaultKeyStatistics,price";
const CRUMB_TTL: Duration = Duration::from_secs(3600);

// ============================================================================
// Crumb cache
// ============================================================================

#[derive(Debug)]
struct CachedCrumb {
    value: String,
    fetched_at: Instant,
}

/// Cookie/crumb session for Yahoo's unofficial API.
///
/// Yahoo requires a session cookie from `fc.yahoo.com` (kept by the client's
/// cookie jar) and a crumb token passed as a query parameter. The lock is
/// held while refreshing so concurrent lookups share one handshake.
#[derive(Debug, Default)]
pub struct YahooCrumbCache {
    inner: tokio::sync::Mutex<Option<CachedCrumb>>,
}

impl YahooCrumbCache {
    pub async fn crumb(
        &self,
        http_client: &dyn HttpClient,
        timeout_ms: u64,
    ) -> Result<String, LookupError> {
        let mut cached = self.inner.lock().await;
        if let Some(crumb) = cached.as_ref() {
            if crumb.fetched_at.elapsed() < CRUMB_TTL {
                return Ok(crumb.value.clone());
            }
        }

        let value = fetch_crumb(http_client, timeout_ms).await?;
        *cached = Some(CachedCrumb {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    /// Drops the cached crumb so the next lookup performs a fresh handshake.
    pub async fn invalidate(&self) {
        *self.inner.lock().await = None;
    }
}

async fn fetch_crumb(http_client: &dyn HttpClient, timeout_ms: u64) -> Result<String, LookupError> {
    // fc.yahoo.com answers 404 but still sets the session cookie.
    let cookie_request = HttpRequest::get(COOKIE_URL)
        .with_header("referer", REFERER)
        .with_timeout_ms(timeout_ms);
    http_client
        .execute(cookie_request)
        .await
        .map_err(transport_error)?;

    for endpoint in CRUMB_URLS {
        let request = HttpRequest::get(endpoint)
            .with_header("referer", REFERER)
            .with_timeout_ms(timeout_ms);

        match http_client.execute(request).await {
            Ok(response) if response.status == 429 => {
                return Err(LookupError::RateLimited(429));
            }
            Ok(response) if response.is_success() => {
                let body = response.body.trim();
                if body.to_lowercase().contains("too many requests") {
                    return Err(LookupError::RateLimited(response.status));
                }
                if is_plausible_crumb(body) {
                    return Ok(body.to_owned());
                }
            }
            Ok(_) | Err(_) => continue,
        }
    }

    Err(LookupError::Auth(String::from(
        "failed to fetch Yahoo crumb from all endpoints",
    )))
}

fn is_plausible_crumb(body: &str) -> bool {
    !body.is_empty() && body.len() < 100 && !body.contains(char::is_whitespace) && !body.contains('<')
}

// ============================================================================
// Valuation source
// ============================================================================

/// Yahoo Finance `quoteSummary` valuation lookup.
#[derive(Clone)]
pub struct YahooValuationSource {
    http_client: Arc<dyn HttpClient>,
    crumbs: Arc<YahooCrumbCache>,
    timeout_ms: u64,
}

impl YahooValuationSource {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            crumbs: Arc::new(YahooCrumbCache::default()),
            timeout_ms: 10_000,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    async fn fetch(&self, symbol: &Symbol) -> Result<ValuationSnapshot, LookupError> {
        let crumb = self
            .crumbs
            .crumb(self.http_client.as_ref(), self.timeout_ms)
            .await?;

        let endpoint = format!(
            "{QUOTE_SUMMARY_URL}/{}?modules={SUMMARY_MODULES}&crumb={}",
            urlencoding::encode(symbol.as_str()),
            urlencoding::encode(&crumb)
        );
        let request = HttpRequest::get(endpoint)
            .with_header("referer", REFERER)
            .with_timeout_ms(self.timeout_ms);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(transport_error)?;

        match response.status {
            401 | 403 => {
                // Stale session; the next lookup re-authenticates.
                self.crumbs.invalidate().await;
                return Err(LookupError::Auth(format!(
                    "yahoo rejected session with status {}",
                    response.status
                )));
            }
            429 => {
                self.crumbs.invalidate().await;
                return Err(LookupError::RateLimited(429));
            }
            404 => return Err(LookupError::NotFound),
            status if !(200..300).contains(&status) => return Err(LookupError::Status(status)),
            _ => {}
        }

        parse_quote_summary(symbol, &response.body)
    }
}

impl ValuationSource for YahooValuationSource {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn snapshot<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<ValuationSnapshot, LookupError>> + Send + 'a>> {
        Box::pin(self.fetch(symbol))
    }
}

fn transport_error(error: HttpError) -> LookupError {
    if error.is_timeout() {
        LookupError::Timeout(error.message().to_owned())
    } else {
        LookupError::Transport(error.message().to_owned())
    }
}

fn parse_quote_summary(symbol: &Symbol, body: &str) -> Result<ValuationSnapshot, LookupError> {
    let response: YahooQuoteSummaryResponse = serde_json::from_str(body)
        .map_err(|e| LookupError::Malformed(format!("failed to parse quoteSummary: {e}")))?;

    if let Some(error) = response.quote_summary.error {
        let code = error.code.unwrap_or_default();
        let description = error.description.unwrap_or_default();
        if code.eq_ignore_ascii_case("not found") || description.contains("No fundamentals data") {
            return Err(LookupError::NotFound);
        }
        return Err(LookupError::Malformed(format!(
            "quoteSummary error {code}: {description}"
        )));
    }

    let result = response
        .quote_summary
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or(LookupError::NotFound)?;

    let snapshot = ValuationSnapshot {
        symbol: symbol.clone(),
        trailing_pe: result
            .summary_detail
            .and_then(|detail| detail.trailing_pe)
            .and_then(|value| value.value()),
        price: result
            .price
            .and_then(|price| price.regular_market_price)
            .and_then(|value| value.value()),
        trailing_eps: result
            .default_key_statistics
            .and_then(|stats| stats.trailing_eps)
            .and_then(|value| value.value()),
    };
    debug!(%symbol, ?snapshot.trailing_pe, ?snapshot.price, ?snapshot.trailing_eps, "yahoo snapshot");
    Ok(snapshot)
}

// ============================================================================
// Yahoo quoteSummary response structures
// ============================================================================

#[derive(Debug, Deserialize)]
struct YahooQuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: YahooQuoteSummary,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteSummary {
    #[serde(default)]
    result: Option<Vec<YahooQuoteSummaryResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Deserialize)]
struct YahooApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteSummaryResult {
    #[serde(rename = "summaryDetail", default)]
    summary_detail: Option<YahooSummaryDetail>,
    #[serde(rename = "defaultKeyStatistics", default)]
    default_key_statistics: Option<YahooKeyStatistics>,
    #[serde(default)]
    price: Option<YahooPrice>,
}

#[derive(Debug, Deserialize)]
struct YahooSummaryDetail {
    #[serde(rename = "trailingPE", default)]
    trailing_pe: Option<YahooNumber>,
}

#[derive(Debug, Deserialize)]
struct YahooKeyStatistics {
    #[serde(rename = "trailingEps", default)]
    trailing_eps: Option<YahooNumber>,
}

#[derive(Debug, Deserialize)]
struct YahooPrice {
    #[serde(rename = "regularMarketPrice", default)]
    regular_market_price: Option<YahooNumber>,
}

/// Yahoo wraps most numbers as `{"raw": 1.0, "fmt": "1.00"}`, sends `{}`
/// when a value is missing and occasionally a bare number or a string
/// such as `"Infinity"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YahooNumber {
    Plain(f64),
    Wrapped {
        #[serde(default)]
        raw: Option<serde_json::Value>,
    },
    Other(serde_json::Value),
}

impl YahooNumber {
    fn value(&self) -> Option<f64> {
        let value = match self {
            Self::Plain(value) => Some(*value),
            Self::Wrapped { raw } => raw.as_ref().and_then(serde_json::Value::as_f64),
            Self::Other(_) => None,
        };
        value.filter(|value| value.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::HttpResponse;
    use std::sync::Mutex;

    /// Routes requests by URL substring and records every call.
    struct ScriptedHttpClient {
        routes: Vec<(&'static str, Result<HttpResponse, HttpError>)>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        fn new(routes: Vec<(&'static str, Result<HttpResponse, HttpError>)>) -> Self {
            Self {
                routes,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn count(&self, fragment: &str) -> usize {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .iter()
                .filter(|request| request.url.contains(fragment))
                .count()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            let response = self
                .routes
                .iter()
                .find(|(fragment, _)| request.url.contains(fragment))
                .map(|(_, response)| response.clone())
                .unwrap_or_else(|| Ok(HttpResponse::new(404, "")));
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            Box::pin(async move { response })
        }
    }

    fn symbol(raw: &str) -> Symbol {
        Symbol::parse(raw).expect("valid symbol")
    }

    fn yahoo_with(
        routes: Vec<(&'static str, Result<HttpResponse, HttpError>)>,
    ) -> (Arc<ScriptedHttpClient>, YahooValuationSource) {
        let client = Arc::new(ScriptedHttpClient::new(routes));
        let source = YahooValuationSource::new(client.clone());
        (client, source)
    }

    #[tokio::test]
    async fn reads_trailing_pe_and_price_fields() {
        let body = r#"{"quoteSummary":{"result":[{
            "summaryDetail":{"trailingPE":{"raw":28.4,"fmt":"28.40"}},
            "defaultKeyStatistics":{"trailingEps":{"raw":120.5}},
            "price":{"regularMarketPrice":{"raw":3422.2}}
        }],"error":null}}"#;
        let (client, source) = yahoo_with(vec![
            ("getcrumb", Ok(HttpResponse::ok("abcCrumb"))),
            ("quoteSummary/TCS.NS", Ok(HttpResponse::ok(body))),
        ]);

        let snapshot = source.snapshot(&symbol("TCS.NS")).await.expect("lookup succeeds");

        assert_eq!(snapshot.trailing_pe, Some(28.4));
        assert_eq!(snapshot.trailing_eps, Some(120.5));
        assert_eq!(snapshot.price, Some(3422.2));
        assert_eq!(snapshot.ratio(), Some(28.4));
        assert_eq!(client.count("crumb=abcCrumb"), 1);
    }

    #[tokio::test]
    async fn missing_values_and_infinity_are_absent() {
        let body = r#"{"quoteSummary":{"result":[{
            "summaryDetail":{"trailingPE":"Infinity"},
            "defaultKeyStatistics":{"trailingEps":{}},
            "price":{"regularMarketPrice":512.0}
        }],"error":null}}"#;
        let (_, source) = yahoo_with(vec![
            ("getcrumb", Ok(HttpResponse::ok("crumb"))),
            ("quoteSummary", Ok(HttpResponse::ok(body))),
        ]);

        let snapshot = source.snapshot(&symbol("ACM")).await.expect("lookup succeeds");

        assert_eq!(snapshot.trailing_pe, None);
        assert_eq!(snapshot.trailing_eps, None);
        assert_eq!(snapshot.price, Some(512.0));
        assert_eq!(snapshot.ratio(), None);
    }

    #[tokio::test]
    async fn not_found_is_reported_as_such() {
        let body = r#"{"quoteSummary":{"result":null,"error":{"code":"Not Found","description":"Quote not found for ticker symbol: TCS"}}}"#;
        let (_, source) = yahoo_with(vec![
            ("getcrumb", Ok(HttpResponse::ok("crumb"))),
            ("quoteSummary", Ok(HttpResponse::new(404, body))),
        ]);

        let error = source.snapshot(&symbol("TCS")).await.expect_err("must fail");
        assert_eq!(error, LookupError::NotFound);
    }

    #[tokio::test]
    async fn timeouts_are_classified() {
        let (_, source) = yahoo_with(vec![
            ("getcrumb", Ok(HttpResponse::ok("crumb"))),
            ("quoteSummary", Err(HttpError::timeout("request timeout"))),
        ]);

        let error = source.snapshot(&symbol("TCS")).await.expect_err("must fail");
        assert!(matches!(error, LookupError::Timeout(_)));
    }

    #[tokio::test]
    async fn crumb_is_cached_and_invalidated_on_unauthorized() {
        let (client, source) = yahoo_with(vec![
            ("getcrumb", Ok(HttpResponse::ok("crumb"))),
            ("quoteSummary", Ok(HttpResponse::new(401, "Unauthorized"))),
        ]);

        let first = source.snapshot(&symbol("TCS")).await.expect_err("must fail");
        assert!(matches!(first, LookupError::Auth(_)));
        let _ = source.snapshot(&symbol("INFY")).await;

        assert_eq!(client.count("getcrumb"), 2);
        assert_eq!(client.count("quoteSummary"), 2);
    }

    #[tokio::test]
    async fn unusable_crumb_is_an_auth_error() {
        let (_, source) = yahoo_with(vec![(
            "getcrumb",
            Ok(HttpResponse::ok("<html>blocked</html>")),
        )]);

        let error = source.snapshot(&symbol("TCS")).await.expect_err("must fail");
        assert!(matches!(error, LookupError::Auth(_)));
    }
}
