//! Promotion status derivation and discount evaluation.
//!
//! The status is never stored: it is a pure function of the current time
//! and the promotion's date range, evaluated whenever a promotion is read.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lifecycle phase of a promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionStatus {
    Scheduled,
    Active,
    Expired,
}

/// Derive the status at `now`. Both bounds are inclusive.
pub const fn derive_status(now: i64, start_date: i64, end_date: i64) -> PromotionStatus {
    if now < start_date {
        PromotionStatus::Scheduled
    } else if now > end_date {
        PromotionStatus::Expired
    } else {
        PromotionStatus::Active
    }
}

/// The fields of a promotion that decide whether and how much it discounts.
#[derive(Debug, Clone, PartialEq)]
pub struct PromotionTerms {
    pub discount_percent: i64,
    pub max_discount_amount: Option<f64>,
    pub min_order_amount: Option<f64>,
    pub start_date: i64,
    pub end_date: i64,
    pub usage_limit: Option<i64>,
    pub used_count: i64,
}

/// Outcome of applying a promotion to an order total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Discount {
    pub discount_amount: f64,
    pub final_amount: f64,
}

impl PromotionTerms {
    pub const fn status(&self, now: i64) -> PromotionStatus {
        derive_status(now, self.start_date, self.end_date)
    }

    pub fn is_exhausted(&self) -> bool {
        self.usage_limit.is_some_and(|limit| self.used_count >= limit)
    }

    /// Apply the promotion to `order_amount` at `now`.
    pub fn evaluate(&self, order_amount: f64, now: i64) -> Result<Discount> {
        if !order_amount.is_finite() || order_amount < 0.0 {
            return Err(Error::validation("Order amount must be a non-negative number"));
        }
        match self.status(now) {
            PromotionStatus::Scheduled => {
                return Err(Error::validation("Promotion has not started yet"));
            }
            PromotionStatus::Expired => {
                return Err(Error::validation("Promotion has expired"));
            }
            PromotionStatus::Active => {}
        }
        if self.is_exhausted() {
            return Err(Error::validation("Promotion usage limit reached"));
        }
        if let Some(min) = self.min_order_amount {
            if order_amount < min {
                return Err(Error::validation(format!(
                    "Order amount must be at least {min}"
                )));
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let mut discount = order_amount * self.discount_percent as f64 / 100.0;
        if let Some(cap) = self.max_discount_amount {
            discount = discount.min(cap);
        }
        discount = discount.min(order_amount);

        Ok(Discount {
            discount_amount: discount,
            final_amount: order_amount - discount,
        })
    }
}
