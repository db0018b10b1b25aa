// coursepay/src/model/course.rs

use super::CourseId;
use serde::{Deserialize, Serialize};

/// A purchasable course as the checkout sees it. Prices are integer minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
  pub id: CourseId,
  pub title: String,
  pub price_cents: i64,
  pub currency: String,
}

impl Course {
  pub fn new(id: CourseId, title: impl Into<String>, price_cents: i64, currency: impl Into<String>) -> Self {
    Self {
      id,
      title: title.into(),
      price_cents,
      currency: currency.into(),
    }
  }

  /// Price in major units, for gateways that take a decimal amount.
  pub fn unit_price(&self) -> f64 {
    self.price_cents as f64 / 100.0
  }

  /// Price as a two-decimal string ("12.50"), computed without floating point.
  pub fn price_decimal(&self) -> String {
    let sign = if self.price_cents < 0 { "-" } else { "" };
    let abs = self.price_cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn formats_price_in_major_units() {
    let course = Course::new(CourseId::new("c1").unwrap(), "Rust", 1250, "USD");
    assert_eq!(course.price_decimal(), "12.50");
    assert!((course.unit_price() - 12.5).abs() < f64::EPSILON);

    let cheap = Course::new(CourseId::new("c2").unwrap(), "Intro", 5, "USD");
    assert_eq!(cheap.price_decimal(), "0.05");
  }
}
