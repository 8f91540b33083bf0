//! Valuation enrichment of resolved companies.
//!
//! Lookup failures never escape this module: each company ends up with an
//! [`EnrichmentOutcome`] that records what was tried and why no ratio is
//! available, and the ratio itself is simply absent.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::throttling::PoliteThrottle;
use crate::valuation::ValuationSource;
use crate::{
    AttemptResult, EnrichedCompany, EnrichmentOutcome, LookupAttempt, LookupError,
    ResolvedCompany, Symbol,
};

pub const DEFAULT_MARKET_SUFFIX: &str = ".NS";
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const MAX_CONCURRENCY_LIMIT: usize = 8;

/// Looks up valuation ratios, primary symbol first, market-suffixed form second.
#[derive(Clone)]
pub struct EnrichmentFetcher {
    source: Arc<dyn ValuationSource>,
    throttle: PoliteThrottle,
    market_suffix: String,
    max_concurrency: usize,
}

impl EnrichmentFetcher {
    pub fn new(source: Arc<dyn ValuationSource>, throttle: PoliteThrottle) -> Self {
        Self {
            source,
            throttle,
            market_suffix: String::from(DEFAULT_MARKET_SUFFIX),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_market_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.market_suffix = suffix.into();
        self
    }

    /// Worker count for [`enrich_all`](Self::enrich_all), clamped to `1..=8`.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.clamp(1, MAX_CONCURRENCY_LIMIT);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Enriches one company. Never fails and never alters name or symbol.
    pub async fn enrich(&self, company: &ResolvedCompany) -> EnrichedCompany {
        let Some(symbol) = company.symbol.clone() else {
            debug!(name = %company.name, "no symbol; skipping lookup");
            return EnrichedCompany::new(company.clone(), EnrichmentOutcome::NoSymbol);
        };

        let mut attempts = Vec::with_capacity(2);
        for candidate in self.candidates(&symbol) {
            let result = self.attempt(&candidate).await;
            if let AttemptResult::Ratio(ratio) = result {
                debug!(name = %company.name, symbol = %candidate, ratio, "valuation ratio found");
                return EnrichedCompany::new(
                    company.clone(),
                    EnrichmentOutcome::Ratio {
                        symbol: candidate,
                        ratio,
                    },
                );
            }
            attempts.push(LookupAttempt {
                symbol: candidate,
                result,
            });
        }

        let outcome = EnrichmentOutcome::Unavailable { attempts };
        if outcome.had_failure() {
            warn!(name = %company.name, %outcome, "valuation lookup failed");
        } else {
            debug!(name = %company.name, %outcome, "no valuation ratio available");
        }
        EnrichedCompany::new(company.clone(), outcome)
    }

    /// Enriches every company, preserving input order in the result.
    ///
    /// Workers pull companies from a shared cursor; results are keyed by
    /// input position, so completion order has no effect on the output.
    pub async fn enrich_all(&self, companies: &[ResolvedCompany]) -> Vec<EnrichedCompany> {
        let workers = self.max_concurrency.min(companies.len()).max(1);
        info!(
            companies = companies.len(),
            workers,
            source = self.source.name(),
            "enriching companies"
        );

        let enriched = if workers == 1 {
            let mut enriched = Vec::with_capacity(companies.len());
            for company in companies {
                enriched.push(self.enrich(company).await);
            }
            enriched
        } else {
            self.enrich_concurrently(companies, workers).await
        };

        let with_ratio = enriched
            .iter()
            .filter(|company| company.valuation_ratio().is_some())
            .count();
        info!(with_ratio, without_ratio = enriched.len() - with_ratio, "enrichment finished");
        enriched
    }

    async fn enrich_concurrently(
        &self,
        companies: &[ResolvedCompany],
        workers: usize,
    ) -> Vec<EnrichedCompany> {
        let queue: Arc<Vec<ResolvedCompany>> = Arc::new(companies.to_vec());
        let cursor = Arc::new(AtomicUsize::new(0));
        let mut tasks = JoinSet::new();

        for _ in 0..workers {
            let fetcher = self.clone();
            let queue = Arc::clone(&queue);
            let cursor = Arc::clone(&cursor);
            tasks.spawn(async move {
                let mut done = Vec::new();
                loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(company) = queue.get(index) else {
                        break;
                    };
                    done.push((index, fetcher.enrich(company).await));
                }
                done
            });
        }

        let mut results: BTreeMap<usize, EnrichedCompany> = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(done) => results.extend(done),
                Err(error) => warn!(%error, "enrichment worker aborted"),
            }
        }

        companies
            .iter()
            .enumerate()
            .map(|(index, company)| match results.remove(&index) {
                Some(enriched) if enriched.company() == company => enriched,
                _ => EnrichedCompany::new(
                    company.clone(),
                    EnrichmentOutcome::Unavailable {
                        attempts: company
                            .symbol
                            .iter()
                            .map(|symbol| LookupAttempt {
                                symbol: symbol.clone(),
                                result: AttemptResult::Failed(LookupError::Transport(
                                    String::from("enrichment worker aborted"),
                                )),
                            })
                            .collect(),
                    },
                ),
            })
            .collect()
    }

    fn candidates(&self, symbol: &Symbol) -> Vec<Symbol> {
        let mut candidates = vec![symbol.clone()];
        if symbol.is_alphabetic() && !self.market_suffix.trim().is_empty() {
            match symbol.with_suffix(&self.market_suffix) {
                Ok(suffixed) => candidates.push(suffixed),
                Err(error) => debug!(%symbol, %error, "cannot build suffixed symbol"),
            }
        }
        candidates
    }

    async fn attempt(&self, symbol: &Symbol) -> AttemptResult {
        self.throttle.wait().await;
        match self.source.snapshot(symbol).await {
            Ok(snapshot) => snapshot
                .ratio()
                .map_or(AttemptResult::NoRatio, AttemptResult::Ratio),
            Err(error) => {
                debug!(%symbol, %error, "lookup attempt failed");
                AttemptResult::Failed(error)
            }
        }
    }
}
