//! Valuation lookup service contract.
//!
//! A source answers one symbol at a time with the raw fields a
//! price-to-earnings ratio can be derived from. Choosing the ratio is done
//! here, not in the adapter, so every source follows the same preference:
//! trailing P/E first, then price divided by trailing EPS.

mod yahoo;

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::{LookupError, Symbol};

pub use yahoo::{YahooCrumbCache, YahooValuationSource};

/// Raw valuation fields reported for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationSnapshot {
    pub symbol: Symbol,
    pub trailing_pe: Option<f64>,
    pub price: Option<f64>,
    pub trailing_eps: Option<f64>,
}

impl ValuationSnapshot {
    pub fn empty(symbol: Symbol) -> Self {
        Self {
            symbol,
            trailing_pe: None,
            price: None,
            trailing_eps: None,
        }
    }

    pub fn with_trailing_pe(symbol: Symbol, trailing_pe: f64) -> Self {
        Self {
            trailing_pe: Some(trailing_pe),
            ..Self::empty(symbol)
        }
    }

    /// Usable price-to-earnings ratio, if any.
    pub fn ratio(&self) -> Option<f64> {
        self.trailing_pe.filter(|value| is_usable(*value)).or_else(|| {
            match (self.price, self.trailing_eps) {
                (Some(price), Some(eps)) if is_usable(price) && is_usable(eps) => {
                    Some(price / eps).filter(|value| is_usable(*value))
                }
                _ => None,
            }
        })
    }
}

fn is_usable(value: f64) -> bool {
    value.is_finite() && value != 0.0
}

/// Valuation lookup collaborator.
///
/// Implementations must bound every call with a timeout and report failures
/// as [`LookupError`]; the caller decides how failures degrade.
pub trait ValuationSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn snapshot<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<ValuationSnapshot, LookupError>> + Send + 'a>>;
}
