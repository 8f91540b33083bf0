use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// The three ranked listings that take part in the intersection.
///
/// Declaration order is the symbol priority order: market-cap listings most
/// reliably carry exchange tickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Marketcap,
    Revenue,
    Earnings,
}

impl Dataset {
    pub const ALL: [Dataset; 3] = [Self::Marketcap, Self::Revenue, Self::Earnings];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Marketcap => "marketcap",
            Self::Revenue => "revenue",
            Self::Earnings => "earnings",
        }
    }
}

impl Display for Dataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
