//! Behavior-driven tests for spreadsheet publishing
//!
//! A scripted transport stands in for the Google APIs; the tests check the
//! requests a publish issues and how upstream failures are reported.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tempfile::tempdir;
use tripletop_core::{
    GoogleSheetsSink, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReportSink,
    ReportTable, SinkError,
};

// =============================================================================
// Fakes
// =============================================================================

struct GoogleStub {
    routes: Vec<(HttpMethod, &'static str, HttpResponse)>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl GoogleStub {
    fn new(routes: Vec<(HttpMethod, &'static str, HttpResponse)>) -> Arc<Self> {
        Arc::new(Self {
            routes,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl HttpClient for GoogleStub {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = self
            .routes
            .iter()
            .find(|(method, fragment, _)| *method == request.method && request.url.contains(fragment))
            .map(|(_, _, response)| response.clone())
            .unwrap_or_else(|| HttpResponse::new(404, "unrouted"));
        self.requests.lock().expect("requests lock").push(request);
        Box::pin(async move { Ok(response) })
    }
}

const CREATED: &str = r#"{
    "spreadsheetId": "sheet-123",
    "spreadsheetUrl": "https://docs.google.com/spreadsheets/d/sheet-123/edit",
    "sheets": [{ "properties": { "sheetId": 0, "title": "Sheet1" } }]
}"#;

fn happy_routes() -> Vec<(HttpMethod, &'static str, HttpResponse)> {
    vec![
        (HttpMethod::Post, "/permissions", HttpResponse::ok(r#"{"id":"perm-1"}"#)),
        (HttpMethod::Post, "sheets.googleapis.com/v4/spreadsheets", HttpResponse::ok(CREATED)),
        (HttpMethod::Put, "/values/", HttpResponse::ok(r#"{"updatedRows":3}"#)),
    ]
}

fn report() -> ReportTable {
    ReportTable {
        header: vec![
            String::from("name"),
            String::from("symbol"),
            String::from("valuation_ratio"),
        ],
        rows: vec![
            vec![String::from("Acme"), String::from("ACM"), String::from("15.2")],
            vec![String::from("Unlisted Co"), String::new(), String::new()],
        ],
    }
}

fn body(request: &HttpRequest) -> Value {
    serde_json::from_str(request.body.as_deref().expect("request has a body")).expect("json body")
}

// =============================================================================
// Publishing
// =============================================================================

#[tokio::test]
async fn publish_creates_shares_and_fills_a_dated_sheet() {
    // Given: A sink with a token and a recipient
    let http = GoogleStub::new(happy_routes());
    let sink = GoogleSheetsSink::new(http.clone(), "ya29.token")
        .with_share_with(Some(String::from("analyst@example.com")));

    // When: The report is published
    let receipt = sink.publish(&report()).await.expect("publish succeeds");

    // Then: A dated spreadsheet was created, shared, then filled
    let requests = http.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].method, HttpMethod::Post);
    let title = body(&requests[0])["properties"]["title"]
        .as_str()
        .expect("title")
        .to_owned();
    assert!(title.starts_with("common_with_sorted_pe-"));
    assert_eq!(title.len(), "common_with_sorted_pe-YYYY-MM-DD".len());

    assert!(requests[1].url.contains("/files/sheet-123/permissions"));
    assert_eq!(body(&requests[1])["role"], "writer");
    assert_eq!(body(&requests[1])["emailAddress"], "analyst@example.com");

    assert_eq!(requests[2].method, HttpMethod::Put);
    assert!(requests[2].url.contains("valueInputOption=RAW"));
    assert_eq!(
        body(&requests[2])["values"],
        serde_json::json!([
            ["name", "symbol", "valuation_ratio"],
            ["Acme", "ACM", "15.2"],
            ["Unlisted Co", "", ""]
        ])
    );

    // And: Every call carried the bearer token
    assert!(requests.iter().all(|request| {
        request.headers.get("authorization").map(String::as_str) == Some("Bearer ya29.token")
    }));

    // And: The receipt points at the new sheet
    assert_eq!(receipt.spreadsheet_id, "sheet-123");
    assert_eq!(receipt.title, title);
    assert_eq!(receipt.rows, 2);
    assert_eq!(receipt.shared_with.as_deref(), Some("analyst@example.com"));
}

#[tokio::test]
async fn publish_without_recipient_skips_sharing() {
    // Given: A sink without a recipient
    let http = GoogleStub::new(happy_routes());
    let sink = GoogleSheetsSink::new(http.clone(), "ya29.token").with_share_with(None);

    // When: The report is published
    sink.publish(&report()).await.expect("publish succeeds");

    // Then: No Drive permission was requested
    assert!(http
        .requests()
        .iter()
        .all(|request| !request.url.contains("/permissions")));
}

#[tokio::test]
async fn report_artifact_can_be_published_after_the_run() {
    // Given: A report artifact left by an earlier run
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("common_with_pe_sorted.csv");
    std::fs::write(&path, "name,symbol,valuation_ratio\nAcme,ACM,15.2\nUnlisted Co,,\n")
        .expect("write artifact");
    let http = GoogleStub::new(happy_routes());
    let sink = GoogleSheetsSink::new(http.clone(), "ya29.token");

    // When: It is read back and published
    let table = ReportTable::read_csv(&path).expect("artifact is a report");
    let receipt = sink.publish(&table).await.expect("publish succeeds");

    // Then: The uploaded grid matches the file
    assert_eq!(table, report());
    assert_eq!(receipt.rows, 2);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn missing_token_fails_without_any_request() {
    // Given: A sink without credentials
    let http = GoogleStub::new(happy_routes());
    let sink = GoogleSheetsSink::new(http.clone(), "");

    // When: Publishing is attempted
    let error = sink.publish(&report()).await.expect_err("no credentials");

    // Then: The failure is a credentials problem and nothing was sent
    assert!(matches!(error, SinkError::MissingCredentials(_)));
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn rejected_token_is_reported_as_unauthorized() {
    // Given: Google rejects the access token
    let http = GoogleStub::new(vec![(
        HttpMethod::Post,
        "sheets.googleapis.com",
        HttpResponse::new(
            401,
            r#"{"error":{"code":401,"message":"Request had invalid authentication credentials.","status":"UNAUTHENTICATED"}}"#,
        ),
    )]);
    let sink = GoogleSheetsSink::new(http.clone(), "expired");

    // When: Publishing is attempted
    let error = sink.publish(&report()).await.expect_err("unauthorized");

    // Then: The upstream message is surfaced and no further calls were made
    assert_eq!(
        error,
        SinkError::Unauthorized {
            status: 401,
            message: String::from("Request had invalid authentication credentials.")
        }
    );
    assert_eq!(http.requests().len(), 1);
}

#[tokio::test]
async fn exhausted_quota_is_reported_as_quota() {
    // Given: The values write is throttled
    let http = GoogleStub::new(vec![
        (HttpMethod::Post, "sheets.googleapis.com", HttpResponse::ok(CREATED)),
        (
            HttpMethod::Put,
            "/values/",
            HttpResponse::new(
                429,
                r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#,
            ),
        ),
    ]);
    let sink = GoogleSheetsSink::new(http, "ya29.token");

    // When: Publishing is attempted
    let error = sink.publish(&report()).await.expect_err("quota");

    // Then: The failure is classified as quota exhaustion
    assert_eq!(error, SinkError::Quota(String::from("Quota exceeded")));
}
