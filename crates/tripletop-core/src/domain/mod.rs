//! # Domain Models
//!
//! Canonical types that flow through the reconciliation pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Dataset`] | The three ranked listings (marketcap, revenue, earnings) |
//! | [`Symbol`] | Normalized exchange ticker |
//! | [`CompanyRecord`] | One normalized source row |
//! | [`RankedTable`] | Top-N slice of one dataset |
//! | [`TopTables`] | The three ranked tables in symbol-priority order |
//! | [`ResolvedCompany`] | Company present in all three tables |
//! | [`EnrichedCompany`] | Resolved company plus valuation ratio |
//! | [`EnrichmentOutcome`] | Why a ratio is present or absent |

mod dataset;
mod models;
mod symbol;

pub use dataset::Dataset;
pub use models::{
    name_key, AttemptResult, CompanyRecord, EnrichedCompany, EnrichmentOutcome, LookupAttempt,
    RankedTable, RankingBasis, ResolvedCompany, TopTables,
};
pub use symbol::Symbol;
