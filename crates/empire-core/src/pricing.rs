//! Currencies and minimum-price selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Currencies every listing is priced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    Usd,
    Vnd,
}

impl Currency {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Vnd => "vnd",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::Usd),
            "vnd" => Ok(Self::Vnd),
            other => Err(Error::validation(format!("Unsupported currency: {other}"))),
        }
    }
}

/// Anything carrying a price per currency.
pub trait Priced {
    fn price(&self, currency: Currency) -> f64;
}

/// Select the cheapest entry in `currency`.
///
/// Ties keep the first entry encountered. Returns `None` for an empty slice.
pub fn min_price_variant<T: Priced>(items: &[T], currency: Currency) -> Option<&T> {
    items.iter().reduce(|best, candidate| {
        if candidate.price(currency) < best.price(currency) {
            candidate
        } else {
            best
        }
    })
}

/// Cheapest price in `currency`, if there is anything priced at all.
pub fn min_price<T: Priced>(items: &[T], currency: Currency) -> Option<f64> {
    min_price_variant(items, currency).map(|v| v.price(currency))
}
