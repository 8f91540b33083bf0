use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{Dataset, LookupError, Symbol};

/// Join key for company names: trimmed and case-folded.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One company row after schema normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyRecord {
    pub name: String,
    pub symbol: Option<Symbol>,
    pub rank: Option<i64>,
    pub metric: Option<f64>,
    pub country: Option<String>,
    /// Trimmed original cells, aligned with the owning table's columns.
    pub cells: Vec<String>,
}

impl CompanyRecord {
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }
}

/// Criterion a ranked table was ordered by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "column")]
pub enum RankingBasis {
    Rank(String),
    Metric(String),
    SourceOrder,
}

impl Display for RankingBasis {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rank(column) => write!(f, "rank column '{column}'"),
            Self::Metric(column) => write!(f, "metric column '{column}' (descending)"),
            Self::SourceOrder => f.write_str("source order"),
        }
    }
}

/// Top-N slice of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTable {
    pub dataset: Dataset,
    pub columns: Vec<String>,
    pub basis: RankingBasis,
    pub records: Vec<CompanyRecord>,
}

impl RankedTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record per name key; later duplicates are ignored.
    pub fn authoritative_records(&self) -> BTreeMap<String, &CompanyRecord> {
        let mut index = BTreeMap::new();
        for record in &self.records {
            index.entry(record.name_key()).or_insert(record);
        }
        index
    }
}

/// The three ranked tables, in symbol-priority order.
#[derive(Debug, Clone, PartialEq)]
pub struct TopTables {
    pub marketcap: RankedTable,
    pub revenue: RankedTable,
    pub earnings: RankedTable,
}

impl TopTables {
    pub fn in_priority_order(&self) -> [&RankedTable; 3] {
        [&self.marketcap, &self.revenue, &self.earnings]
    }
}

/// A company present in all three ranked tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCompany {
    pub name: String,
    pub symbol: Option<Symbol>,
}

impl ResolvedCompany {
    pub fn new(name: impl Into<String>, symbol: Option<Symbol>) -> Self {
        Self {
            name: name.into(),
            symbol,
        }
    }
}

/// Result of one valuation lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptResult {
    Ratio(f64),
    /// The lookup succeeded but carried no usable ratio.
    NoRatio,
    Failed(LookupError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupAttempt {
    pub symbol: Symbol,
    pub result: AttemptResult,
}

/// Why a company does or does not carry a valuation ratio.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentOutcome {
    Ratio { symbol: Symbol, ratio: f64 },
    NoSymbol,
    Unavailable { attempts: Vec<LookupAttempt> },
}

impl EnrichmentOutcome {
    pub fn ratio(&self) -> Option<f64> {
        match self {
            Self::Ratio { ratio, .. } => Some(*ratio),
            Self::NoSymbol | Self::Unavailable { .. } => None,
        }
    }

    /// True when at least one lookup errored, as opposed to answering without a ratio.
    pub fn had_failure(&self) -> bool {
        match self {
            Self::Unavailable { attempts } => attempts
                .iter()
                .any(|attempt| matches!(attempt.result, AttemptResult::Failed(_))),
            Self::Ratio { .. } | Self::NoSymbol => false,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ratio { .. } => "ratio",
            Self::NoSymbol => "no_symbol",
            Self::Unavailable { .. } => "unavailable",
        }
    }
}

impl Display for EnrichmentOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ratio { symbol, ratio } => write!(f, "{ratio} via {symbol}"),
            Self::NoSymbol => f.write_str("no symbol to look up"),
            Self::Unavailable { attempts } => {
                f.write_str("no ratio")?;
                for attempt in attempts {
                    match &attempt.result {
                        AttemptResult::Failed(error) => write!(f, "; {}: {error}", attempt.symbol)?,
                        AttemptResult::NoRatio => write!(f, "; {}: no usable value", attempt.symbol)?,
                        AttemptResult::Ratio(ratio) => write!(f, "; {}: {ratio}", attempt.symbol)?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// A resolved company with its valuation ratio. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedCompany {
    company: ResolvedCompany,
    outcome: EnrichmentOutcome,
}

impl EnrichedCompany {
    pub fn new(company: ResolvedCompany, outcome: EnrichmentOutcome) -> Self {
        Self { company, outcome }
    }

    pub fn company(&self) -> &ResolvedCompany {
        &self.company
    }

    pub fn name(&self) -> &str {
        &self.company.name
    }

    pub fn symbol(&self) -> Option<&Symbol> {
        self.company.symbol.as_ref()
    }

    pub fn valuation_ratio(&self) -> Option<f64> {
        self.outcome.ratio()
    }

    pub fn outcome(&self) -> &EnrichmentOutcome {
        &self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, symbol: Option<&str>) -> CompanyRecord {
        CompanyRecord {
            name: name.to_owned(),
            symbol: symbol.map(|raw| Symbol::parse(raw).expect("valid symbol")),
            rank: None,
            metric: None,
            country: None,
            cells: vec![name.to_owned()],
        }
    }

    #[test]
    fn first_record_per_name_is_authoritative() {
        let table = RankedTable {
            dataset: Dataset::Revenue,
            columns: vec![String::from("Name")],
            basis: RankingBasis::SourceOrder,
            records: vec![record("Acme", Some("ACM")), record(" ACME ", Some("XYZ"))],
        };

        let index = table.authoritative_records();
        assert_eq!(index.len(), 1);
        assert_eq!(
            index["acme"].symbol.as_ref().map(Symbol::as_str),
            Some("ACM")
        );
    }

    #[test]
    fn failed_lookups_are_distinguishable_from_missing_values() {
        let symbol = Symbol::parse("TCS").expect("valid");
        let failed = EnrichmentOutcome::Unavailable {
            attempts: vec![LookupAttempt {
                symbol: symbol.clone(),
                result: AttemptResult::Failed(LookupError::NotFound),
            }],
        };
        let empty = EnrichmentOutcome::Unavailable {
            attempts: vec![LookupAttempt {
                symbol,
                result: AttemptResult::NoRatio,
            }],
        };

        assert!(failed.had_failure());
        assert!(!empty.had_failure());
        assert_eq!(failed.ratio(), None);
        assert_eq!(empty.ratio(), None);
    }
}
