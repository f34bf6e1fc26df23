//! Listing filter and sort for account and course lists.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pricing::Currency;

/// Something that can appear in a product list.
pub trait Listing {
    fn category_id(&self) -> Option<&str>;
    /// Display price in `currency`; `None` when the listing has nothing to sell.
    fn list_price(&self, currency: Currency) -> Option<f64>;
}

/// The two kinds of thing the store sells; also the subject type of comments
/// and cart lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ItemType {
    Account,
    Course,
}

impl ItemType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Course => "course",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "account" => Ok(Self::Account),
            "course" => Ok(Self::Course),
            other => Err(Error::validation(format!(
                "Invalid item_type '{other}': expected 'account' or 'course'"
            ))),
        }
    }
}

/// List ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Keep store order.
    #[default]
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "price-asc")]
    PriceAsc,
    #[serde(rename = "price-desc")]
    PriceDesc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "default" => Ok(Self::Default),
            "price-asc" => Ok(Self::PriceAsc),
            "price-desc" => Ok(Self::PriceDesc),
            other => Err(Error::validation(format!("Unknown sort order: {other}"))),
        }
    }
}

/// Inclusive price bounds; a missing bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    /// Parse bounds as typed into a form, where blank means "no bound".
    pub fn parse(min: Option<&str>, max: Option<&str>) -> Result<Self> {
        Ok(Self {
            min: parse_bound(min, "min_price")?,
            max: parse_bound(max, "max_price")?,
        })
    }

    pub const fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, price: f64) -> bool {
        self.min.is_none_or(|min| price >= min) && self.max.is_none_or(|max| price <= max)
    }
}

fn parse_bound(raw: Option<&str>, name: &str) -> Result<Option<f64>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let value: f64 = raw
        .parse()
        .map_err(|_| Error::validation(format!("{name} must be a number")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(Error::validation(format!(
            "{name} must be a non-negative number"
        )));
    }
    Ok(Some(value))
}

/// Everything a list request can ask for.
#[derive(Debug, Clone, Default)]
pub struct ListingQuery {
    /// Category id; blank or `"all"` matches everything.
    pub category: Option<String>,
    pub range: PriceRange,
    pub sort: SortOrder,
    pub currency: Currency,
}

impl ListingQuery {
    fn category_matches<T: Listing>(&self, item: &T) -> bool {
        match self.category.as_deref().map(str::trim) {
            None | Some("" | "all") => true,
            Some(wanted) => item.category_id() == Some(wanted),
        }
    }

    fn price_matches<T: Listing>(&self, item: &T) -> bool {
        if self.range.is_unbounded() {
            return true;
        }
        item.list_price(self.currency)
            .is_some_and(|p| self.range.contains(p))
    }

    /// Filter then sort. The sort is stable; unpriced listings sort last.
    pub fn apply<T: Listing>(&self, items: Vec<T>) -> Vec<T> {
        let mut items: Vec<T> = items
            .into_iter()
            .filter(|item| self.category_matches(item) && self.price_matches(item))
            .collect();

        let currency = self.currency;
        match self.sort {
            SortOrder::Default => {}
            SortOrder::PriceAsc => items.sort_by(|a, b| {
                compare_prices(a.list_price(currency), b.list_price(currency), false)
            }),
            SortOrder::PriceDesc => items.sort_by(|a, b| {
                compare_prices(a.list_price(currency), b.list_price(currency), true)
            }),
        }
        items
    }
}

// Unpriced listings go last in both directions.
fn compare_prices(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.total_cmp(&a),
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
