//! Behavior-driven tests for a full reconciliation run
//!
//! These tests drive the pipeline with in-memory datasets and a scripted
//! valuation source, then check what a user observes: the report rows and
//! the artifact files.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tempfile::tempdir;
use tripletop_core::pipeline::{COMMON_COMPANIES_FILE, REPORT_FILE};
use tripletop_core::{
    normalize, ArtifactWriter, Dataset, DirectoryTableSource, EnrichmentFetcher, LookupError,
    Pipeline, PipelineError, PoliteThrottle, RawTable, SelectionCriteria, SourceFetchError,
    Symbol, TableSource, ValuationSnapshot, ValuationSource,
};

// =============================================================================
// Fakes
// =============================================================================

struct InMemoryTables {
    tables: HashMap<Dataset, &'static str>,
}

impl InMemoryTables {
    fn new(marketcap: &'static str, revenue: &'static str, earnings: &'static str) -> Self {
        Self {
            tables: HashMap::from([
                (Dataset::Marketcap, marketcap),
                (Dataset::Revenue, revenue),
                (Dataset::Earnings, earnings),
            ]),
        }
    }
}

impl TableSource for InMemoryTables {
    fn describe(&self, dataset: Dataset) -> String {
        format!("memory:{dataset}")
    }

    fn fetch<'a>(
        &'a self,
        dataset: Dataset,
    ) -> Pin<Box<dyn Future<Output = Result<RawTable, SourceFetchError>> + Send + 'a>> {
        Box::pin(async move {
            let body = self.tables.get(&dataset).ok_or(SourceFetchError::Status {
                dataset,
                status: 404,
            })?;
            RawTable::from_csv_str(body).map_err(|error| SourceFetchError::Malformed {
                dataset,
                message: error.to_string(),
            })
        })
    }
}

#[derive(Default)]
struct ScriptedValuations {
    ratios: HashMap<&'static str, f64>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedValuations {
    fn with(mut self, symbol: &'static str, ratio: f64) -> Self {
        self.ratios.insert(symbol, ratio);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl ValuationSource for ScriptedValuations {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn snapshot<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<ValuationSnapshot, LookupError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().expect("calls lock").push(symbol.to_string());
            self.ratios
                .get(symbol.as_str())
                .map(|ratio| ValuationSnapshot::with_trailing_pe(symbol.clone(), *ratio))
                .ok_or(LookupError::NotFound)
        })
    }
}

fn pipeline(
    tables: InMemoryTables,
    valuations: Arc<ScriptedValuations>,
    criteria: SelectionCriteria,
) -> Pipeline {
    let fetcher = EnrichmentFetcher::new(valuations, PoliteThrottle::disabled());
    Pipeline::new(Arc::new(tables), criteria, fetcher)
}

fn india(top_n: usize) -> SelectionCriteria {
    SelectionCriteria::new(Some(String::from("India")), top_n)
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).expect("artifact is readable")
}

// =============================================================================
// End-to-end runs
// =============================================================================

#[tokio::test]
async fn company_in_all_three_rankings_is_reported_with_its_ratio() {
    // Given: Acme carries a symbol only in the market-cap ranking
    let tables = InMemoryTables::new(
        "Rank,Name,Symbol,marketcap,price (USD),country\n1,Acme,ACM,1000,10,India\n2,Orbit,ORB,900,5,India\n",
        "Rank,Name,Symbol,revenue,country\n1, acme ,,500,India\n2,Zenith,ZEN,400,India\n",
        "Rank,Name,Symbol,earnings,country\n1,ACME,,120,India\n",
    );
    let valuations = Arc::new(ScriptedValuations::default().with("ACM", 15.2));

    // When: The pipeline runs and artifacts are written
    let run = pipeline(tables, valuations.clone(), india(100));
    let output = run.run().await.expect("run succeeds");
    let dir = tempdir().expect("tempdir");
    let paths = ArtifactWriter::new(dir.path())
        .write_all(&output, run.criteria())
        .expect("artifacts written");

    // Then: The report has exactly one row with the market-cap symbol and its ratio
    let rows = output.report.to_table().rows;
    assert_eq!(rows, vec![vec!["Acme", "ACM", "15.2"]]);
    assert_eq!(valuations.calls(), vec!["ACM"]);

    // And: The report artifact carries the same content
    assert_eq!(
        read(&paths.report),
        "name,symbol,valuation_ratio\nAcme,ACM,15.2\n"
    );
    assert_eq!(paths.report, dir.path().join(REPORT_FILE));

    // And: The intersection and per-dataset artifacts are present
    assert_eq!(read(&dir.path().join(COMMON_COMPANIES_FILE)), "name,symbol\nAcme,ACM\n");
    assert!(paths.marketcap.ends_with("top100_marketcap_india.csv"));
    assert!(read(&paths.revenue).starts_with("Rank,Name,Symbol,revenue,country\n"));
}

#[tokio::test]
async fn companies_outside_the_top_n_or_country_are_not_reported() {
    // Given: Rankings where one company is outside India and another outside the top 2
    let tables = InMemoryTables::new(
        "Rank,Name,Symbol,country\n1,Alpha,ALP,India\n2,Globex,GLX,United States\n3,Beta,BET,India\n4,Gamma,GAM,India\n",
        "Rank,Name,Symbol,country\n1,Gamma,,India\n2,Beta,,India\n3,Alpha,,India\n4,Globex,,United States\n",
        "Rank,Name,Symbol,country\n1,Beta,,India\n2,Alpha,,India\n3,Gamma,,India\n",
    );
    let valuations = Arc::new(
        ScriptedValuations::default()
            .with("ALP", 30.0)
            .with("BET", 12.5)
            .with("GAM", 8.0),
    );

    // When: The top 2 per ranking are intersected
    let output = pipeline(tables, valuations, india(2))
        .run()
        .await
        .expect("run succeeds");

    // Then: Only Beta ranks in the top 2 of all three Indian rankings
    let names = output
        .report
        .companies()
        .iter()
        .map(|company| company.name())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Beta"]);
    assert!(output.top_tables.marketcap.len() <= 2);
}

#[tokio::test]
async fn report_is_sorted_by_ratio_with_missing_values_last() {
    // Given: Five companies common to all rankings, two without a usable ratio
    let listing = "Name,Symbol\nA Corp,AAA\nB Corp,BBB\nC Corp,CCC\nD Corp,DDD\nE Corp,EEE\n";
    let tables = InMemoryTables::new(listing, listing, listing);
    let valuations = Arc::new(
        ScriptedValuations::default()
            .with("AAA", 3.1)
            .with("CCC", 1.0)
            .with("EEE", 2.0),
    );

    // When: The pipeline runs without a country filter
    let output = pipeline(tables, valuations, SelectionCriteria::new(None, 100))
        .run()
        .await
        .expect("run succeeds");

    // Then: Ratios ascend and companies without one keep name order at the end
    let names = output
        .report
        .companies()
        .iter()
        .map(|company| company.name())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["C Corp", "E Corp", "A Corp", "B Corp", "D Corp"]);
}

// =============================================================================
// Fatal errors
// =============================================================================

#[tokio::test]
async fn missing_name_column_aborts_before_any_artifact_is_written() {
    // Given: The revenue table has no column identifying the company
    let tables = InMemoryTables::new(
        "Name,Symbol\nAcme,ACM\n",
        "Ticker,revenue\nACM,500\n",
        "Name,Symbol\nAcme,ACM\n",
    );
    let valuations = Arc::new(ScriptedValuations::default());
    let dir = tempdir().expect("tempdir");
    let out_dir = dir.path().join("outputs");

    // When: The pipeline runs
    let error = pipeline(tables, valuations.clone(), india(100))
        .run()
        .await
        .expect_err("schema error is fatal");

    // Then: The failure names the dataset and no lookup or artifact happened
    assert!(matches!(
        error,
        PipelineError::Schema(tripletop_core::SchemaError::MissingNameColumn {
            dataset: Dataset::Revenue,
            ..
        })
    ));
    assert!(valuations.calls().is_empty());
    assert!(!out_dir.exists());
}

#[tokio::test]
async fn offline_directory_missing_a_dataset_is_a_fetch_error() {
    // Given: A snapshot directory with only the market-cap CSV
    let dir = tempdir().expect("tempdir");
    std::fs::write(dir.path().join("marketcap.csv"), "Name,Symbol\nAcme,ACM\n")
        .expect("write snapshot");
    let fetcher = EnrichmentFetcher::new(
        Arc::new(ScriptedValuations::default()),
        PoliteThrottle::disabled(),
    );
    let run = Pipeline::new(
        Arc::new(DirectoryTableSource::new(dir.path())),
        india(100),
        fetcher,
    );

    // When: The pipeline runs
    let error = run.run().await.expect_err("revenue.csv is missing");

    // Then: The revenue dataset is reported as unavailable
    match error {
        PipelineError::SourceFetch(error) => assert_eq!(error.dataset(), Dataset::Revenue),
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// Normalization properties
// =============================================================================

#[test]
fn normalizing_a_normalized_table_changes_nothing() {
    // Given: A messy source table with padded headers, cells and a nameless row
    let raw = RawTable::from_csv_str(
        " Rank , Name ,Symbol, Market Cap (USD) ,Price (USD), Country \n\
         1,  Reliance Industries ,RELIANCE.NS,\"$200,000\",30, India\n\
         2,,XXX,10,1,India\n\
         3,Tata Consultancy Services,TCS.NS,\"150,000\",40,India\n",
    )
    .expect("csv parses");

    // When: It is normalized twice
    let once = normalize(Dataset::Marketcap, &raw).expect("normalizes");
    let twice = normalize(Dataset::Marketcap, &once.to_raw()).expect("normalizes again");

    // Then: The second pass is a no-op
    assert_eq!(once, twice);
    assert_eq!(once.records.len(), 2);
    assert_eq!(once.records[0].name, "Reliance Industries");
    assert_eq!(once.records[0].metric, Some(200_000.0));
    assert_eq!(
        once.column_name(once.roles.metric.expect("metric column")),
        Some("Market Cap (USD)")
    );
}
