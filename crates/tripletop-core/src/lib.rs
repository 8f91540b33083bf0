//! # Tripletop Core
//!
//! Finds the companies that rank in the top-N of a country by market
//! capitalization, revenue and earnings at the same time, attaches a
//! price-to-earnings ratio to each, and produces a report sorted by that
//! ratio.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`table`] | Raw CSV tables as delivered by a source |
//! | [`source`] | Dataset acquisition (HTTP download, local directory) |
//! | [`normalize`] | Column role detection and canonical records |
//! | [`select`] | Country filter and top-N selection |
//! | [`intersect`] | Name intersection and symbol resolution |
//! | [`enrich`] | Valuation lookups with market-suffix fallback |
//! | [`valuation`] | Valuation source contract and Yahoo adapter |
//! | [`throttling`] | Global politeness delay between external calls |
//! | [`report`] | Ratio ordering and tabular report |
//! | [`pipeline`] | Stage orchestration and artifact files |
//! | [`sink`] | Spreadsheet publishing |
//! | [`config`] | TOML configuration with environment overrides |
//! | [`domain`] | Domain models |
//! | [`error`] | Error types |
//! | [`http_client`] | HTTP client abstraction |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ TableSource  │──▶│ normalize   │──▶│ select_top   │  x3 datasets
//! └──────────────┘   └─────────────┘   └──────┬───────┘
//!                                             ▼
//!                    ┌─────────────┐   ┌──────────────┐
//!                    │ enrich_all  │◀──│ intersect    │
//!                    └──────┬──────┘   └──────────────┘
//!                           │  ▲
//!                           │  └── ValuationSource + PoliteThrottle
//!                           ▼
//!                    ┌─────────────┐   ┌──────────────┐
//!                    │ build_report│──▶│ artifacts /  │
//!                    └─────────────┘   │ ReportSink   │
//!                                      └──────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Dataset acquisition and schema problems abort a run with
//! [`PipelineError`] before any artifact is written. Valuation lookup
//! failures never escape enrichment: they are recorded per company in
//! [`EnrichmentOutcome`] and the ratio is left empty.
//!
//! ```rust
//! use tripletop_core::{EnrichmentOutcome, LookupError};
//!
//! fn describe(outcome: &EnrichmentOutcome) -> &'static str {
//!     if outcome.had_failure() {
//!         "lookup failed"
//!     } else if outcome.ratio().is_none() {
//!         "no ratio reported"
//!     } else {
//!         "ok"
//!     }
//! }
//!
//! let _ = LookupError::NotFound;
//! assert_eq!(describe(&EnrichmentOutcome::NoSymbol), "no ratio reported");
//! ```
//!
//! ## Security
//!
//! - The spreadsheet access token is read from config or environment and is
//!   never logged or serialized

pub mod config;
pub mod domain;
pub mod enrich;
pub mod error;
pub mod http_client;
pub mod intersect;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod select;
pub mod sink;
pub mod source;
pub mod table;
pub mod throttling;
pub mod valuation;

// Configuration
pub use config::{PipelineConfig, SheetsConfig};

// Domain models
pub use domain::{
    name_key, AttemptResult, CompanyRecord, Dataset, EnrichedCompany, EnrichmentOutcome,
    LookupAttempt, RankedTable, RankingBasis, ResolvedCompany, Symbol, TopTables,
};

// Error types
pub use error::{
    ArtifactError, ConfigError, LookupError, PipelineError, SchemaError, SinkError,
    SourceFetchError, ValidationError,
};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};

// Pipeline stages
pub use enrich::EnrichmentFetcher;
pub use intersect::{resolve, Intersection, SymbolCoverage};
pub use normalize::{normalize, ColumnRoles, NormalizedTable};
pub use pipeline::{ArtifactPaths, ArtifactWriter, Pipeline, PipelineOutput};
pub use report::{build_report, Report, ReportTable};
pub use select::{select_top, SelectionCriteria};
pub use table::RawTable;

// Collaborators
pub use sink::{GoogleSheetsSink, PublishReceipt, ReportSink};
pub use source::{DirectoryTableSource, HttpTableSource, SourceUrls, TableSource};
pub use throttling::PoliteThrottle;
pub use valuation::{ValuationSnapshot, ValuationSource, YahooValuationSource};
