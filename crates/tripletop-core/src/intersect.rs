//! Intersection of the three ranked tables.
//!
//! Set membership is decided by company name alone. Symbol coverage differs
//! between listings, so joining on tickers would drop legitimate matches;
//! symbols are resolved afterwards by priority search over the tables.

use serde::Serialize;
use tracing::info;

use crate::{Dataset, RankedTable, ResolvedCompany, TopTables};

/// Share of records in one ranked table that carry a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SymbolCoverage {
    pub dataset: Dataset,
    pub records: usize,
    pub with_symbol: usize,
}

impl SymbolCoverage {
    pub fn of(table: &RankedTable) -> Self {
        Self {
            dataset: table.dataset,
            records: table.len(),
            with_symbol: table
                .records
                .iter()
                .filter(|record| record.symbol.is_some())
                .count(),
        }
    }

    pub const fn is_complete(&self) -> bool {
        self.with_symbol == self.records
    }
}

/// Companies present in all three tables, sorted by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Intersection {
    pub companies: Vec<ResolvedCompany>,
    pub coverage: [SymbolCoverage; 3],
}

impl Intersection {
    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}

/// Computes the name intersection and resolves one canonical symbol per company.
pub fn resolve(tables: &TopTables) -> Intersection {
    let ordered = tables.in_priority_order();
    let [marketcap, revenue, earnings] = ordered.map(RankedTable::authoritative_records);

    let mut resolved = marketcap
        .iter()
        .filter(|(key, _)| revenue.contains_key(*key) && earnings.contains_key(*key))
        .map(|(key, record)| {
            let symbol = [marketcap.get(key), revenue.get(key), earnings.get(key)]
                .into_iter()
                .flatten()
                .find_map(|record| record.symbol.clone());
            (key.clone(), ResolvedCompany::new(record.name.clone(), symbol))
        })
        .collect::<Vec<_>>();

    resolved.sort_by(|(key_a, a), (key_b, b)| a.name.cmp(&b.name).then_with(|| key_a.cmp(key_b)));

    let coverage = ordered.map(SymbolCoverage::of);
    let without_symbol = resolved
        .iter()
        .filter(|(_, company)| company.symbol.is_none())
        .count();
    info!(
        common = resolved.len(),
        without_symbol,
        marketcap_symbols = coverage[0].with_symbol,
        revenue_symbols = coverage[1].with_symbol,
        earnings_symbols = coverage[2].with_symbol,
        "resolved intersection"
    );

    Intersection {
        companies: resolved.into_iter().map(|(_, company)| company).collect(),
        coverage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompanyRecord, RankingBasis, Symbol};

    fn table(dataset: Dataset, rows: &[(&str, Option<&str>)]) -> RankedTable {
        RankedTable {
            dataset,
            columns: vec![String::from("Name"), String::from("Symbol")],
            basis: RankingBasis::SourceOrder,
            records: rows
                .iter()
                .map(|(name, symbol)| CompanyRecord {
                    name: (*name).to_owned(),
                    symbol: symbol.map(|raw| Symbol::parse(raw).expect("valid symbol")),
                    rank: None,
                    metric: None,
                    country: None,
                    cells: vec![(*name).to_owned(), symbol.unwrap_or_default().to_owned()],
                })
                .collect(),
        }
    }

    fn symbols(intersection: &Intersection) -> Vec<(&str, Option<&str>)> {
        intersection
            .companies
            .iter()
            .map(|company| (company.name.as_str(), company.symbol.as_ref().map(Symbol::as_str)))
            .collect()
    }

    #[test]
    fn keeps_only_names_present_in_all_three_tables() {
        let tables = TopTables {
            marketcap: table(
                Dataset::Marketcap,
                &[("Zeta", None), ("Acme", None), ("Only Cap", None)],
            ),
            revenue: table(Dataset::Revenue, &[(" acme ", None), ("ZETA", None)]),
            earnings: table(Dataset::Earnings, &[("Acme", None), ("Zeta", None), ("Only Cap", None)]),
        };

        let intersection = resolve(&tables);

        assert_eq!(symbols(&intersection), vec![("Acme", None), ("Zeta", None)]);
    }

    #[test]
    fn marketcap_symbol_has_priority() {
        let tables = TopTables {
            marketcap: table(Dataset::Marketcap, &[("Acme", Some("ACM")), ("Beta", None)]),
            revenue: table(Dataset::Revenue, &[("Acme", Some("ACME.NS")), ("Beta", None)]),
            earnings: table(Dataset::Earnings, &[("Acme", None), ("Beta", Some("BTA"))]),
        };

        let intersection = resolve(&tables);

        assert_eq!(
            symbols(&intersection),
            vec![("Acme", Some("ACM")), ("Beta", Some("BTA"))]
        );
    }

    #[test]
    fn symbol_mismatch_does_not_exclude_a_name_match() {
        let tables = TopTables {
            marketcap: table(Dataset::Marketcap, &[("Acme", Some("ACM"))]),
            revenue: table(Dataset::Revenue, &[("Acme", Some("OTHER"))]),
            earnings: table(Dataset::Earnings, &[("Acme", None)]),
        };

        let intersection = resolve(&tables);

        assert_eq!(symbols(&intersection), vec![("Acme", Some("ACM"))]);
        assert!(!intersection.coverage[2].is_complete());
    }

    #[test]
    fn unresolvable_symbol_stays_absent() {
        let tables = TopTables {
            marketcap: table(Dataset::Marketcap, &[("Acme", None)]),
            revenue: table(Dataset::Revenue, &[("Acme", None)]),
            earnings: table(Dataset::Earnings, &[("Acme", None)]),
        };

        assert_eq!(symbols(&resolve(&tables)), vec![("Acme", None)]);
    }

    #[test]
    fn output_is_sorted_byte_wise_by_name() {
        let names = [("beta", None), ("Alpha", None), ("Émile", None), ("Zulu", None)];
        let tables = TopTables {
            marketcap: table(Dataset::Marketcap, &names),
            revenue: table(Dataset::Revenue, &names),
            earnings: table(Dataset::Earnings, &names),
        };

        let resolved = resolve(&tables);
        let ordered = resolved
            .companies
            .iter()
            .map(|company| company.name.as_str())
            .collect::<Vec<_>>();

        assert_eq!(ordered, vec!["Alpha", "Zulu", "beta", "Émile"]);
    }
}
