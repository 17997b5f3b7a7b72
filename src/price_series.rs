//! Validated daily price series.
//!
//! The core never fetches prices itself; callers hand it an already
//! materialized series. Construction enforces the invariants every model in
//! this crate relies on: strictly ascending dates, no duplicates, strictly
//! positive finite closes (required for the log transform). Once built, a
//! series is immutable.

use crate::errors::{MarketAnalysisError, MarketResult};
use chrono::NaiveDate;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single daily observation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PricePoint {
    /// Observation date
    pub date: NaiveDate,
    /// Closing price, strictly positive
    pub close: f64,
}

/// Ordered, validated price history.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

/// Buy price resolved against a series.
///
/// `used_fallback` is set when the requested date was absent and the nearest
/// available observation was substituted instead.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResolvedBuy {
    /// Resolved purchase price
    pub price: f64,
    /// Date of the observation actually used
    pub date: NaiveDate,
    /// True if the exact requested date was not in the series
    pub used_fallback: bool,
}

impl PriceSeries {
    /// Build a series from observations, validating all invariants.
    pub fn from_points(points: Vec<PricePoint>) -> MarketResult<Self> {
        if points.is_empty() {
            return Err(MarketAnalysisError::SeriesError {
                reason: "series is empty".to_string(),
            });
        }

        for (i, p) in points.iter().enumerate() {
            if !p.close.is_finite() || p.close <= 0.0 {
                return Err(MarketAnalysisError::SeriesError {
                    reason: format!(
                        "non-positive or non-finite close {} at index {}",
                        p.close, i
                    ),
                });
            }
            if i > 0 && points[i - 1].date >= p.date {
                return Err(MarketAnalysisError::SeriesError {
                    reason: format!(
                        "dates not strictly ascending at index {} ({} >= {})",
                        i,
                        points[i - 1].date,
                        p.date
                    ),
                });
            }
        }

        Ok(Self { points })
    }

    /// Build a series from (date, close) pairs.
    pub fn from_pairs<I>(pairs: I) -> MarketResult<Self>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self::from_points(
            pairs
                .into_iter()
                .map(|(date, close)| PricePoint { date, close })
                .collect(),
        )
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// A validated series is never empty; provided for API completeness.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All observations, oldest first.
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Most recent observation.
    pub fn last(&self) -> &PricePoint {
        // Invariant: points is nonempty.
        &self.points[self.points.len() - 1]
    }

    /// Most recent close.
    pub fn last_close(&self) -> f64 {
        self.last().close
    }

    /// Closing prices, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Natural log of closing prices.
    pub fn log_closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close.ln()).collect()
    }

    /// Simple returns between consecutive closes; one shorter than the series.
    pub fn simple_returns(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|w| w[1].close / w[0].close - 1.0)
            .collect()
    }

    /// Observations on or before `date`, as a new series.
    ///
    /// Returns `None` when no observation is that old.
    pub fn slice_on_or_before(&self, date: NaiveDate) -> Option<PriceSeries> {
        let cut = self.points.partition_point(|p| p.date <= date);
        if cut == 0 {
            return None;
        }
        Some(PriceSeries {
            points: self.points[..cut].to_vec(),
        })
    }

    /// Number of observations strictly after `date`.
    pub fn count_after(&self, date: NaiveDate) -> usize {
        self.points.len() - self.points.partition_point(|p| p.date <= date)
    }

    /// Resolve the purchase price for `buy_date`.
    ///
    /// An exact match resolves to that close with no fallback flag. When the
    /// date is absent (weekend, holiday, data gap) the most recent prior
    /// observation is used; if the date precedes the series entirely, the
    /// first observation is used. Either substitution sets `used_fallback`.
    pub fn resolve_buy_price(&self, buy_date: NaiveDate) -> ResolvedBuy {
        let cut = self.points.partition_point(|p| p.date <= buy_date);
        if cut > 0 {
            let p = &self.points[cut - 1];
            if p.date == buy_date {
                return ResolvedBuy {
                    price: p.close,
                    date: p.date,
                    used_fallback: false,
                };
            }
            log::warn!(
                "buy date {} not in series; falling back to {}",
                buy_date,
                p.date
            );
            return ResolvedBuy {
                price: p.close,
                date: p.date,
                used_fallback: true,
            };
        }

        let first = &self.points[0];
        log::warn!(
            "buy date {} precedes series start; falling back to {}",
            buy_date,
            first.date
        );
        ResolvedBuy {
            price: first.close,
            date: first.date,
            used_fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn date(d: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(d)
    }

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::from_pairs(
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| (date(i as i64), c)),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_empty_series() {
        assert!(matches!(
            PriceSeries::from_points(vec![]),
            Err(MarketAnalysisError::SeriesError { .. })
        ));
    }

    #[test]
    fn test_rejects_unsorted_and_duplicate_dates() {
        let unsorted = vec![
            PricePoint { date: date(1), close: 10.0 },
            PricePoint { date: date(0), close: 11.0 },
        ];
        assert!(PriceSeries::from_points(unsorted).is_err());

        let duplicated = vec![
            PricePoint { date: date(0), close: 10.0 },
            PricePoint { date: date(0), close: 11.0 },
        ];
        assert!(PriceSeries::from_points(duplicated).is_err());
    }

    #[test]
    fn test_rejects_non_positive_close() {
        assert!(PriceSeries::from_pairs([(date(0), 10.0), (date(1), 0.0)]).is_err());
        assert!(PriceSeries::from_pairs([(date(0), -1.0)]).is_err());
        assert!(PriceSeries::from_pairs([(date(0), f64::NAN)]).is_err());
    }

    #[test]
    fn test_simple_returns() {
        let s = series(&[100.0, 110.0, 99.0]);
        let rets = s.simple_returns();
        assert_eq!(rets.len(), 2);
        assert_approx_eq!(rets[0], 0.1, 1e-12);
        assert_approx_eq!(rets[1], -0.1, 1e-12);
    }

    #[test]
    fn test_slice_and_count() {
        let s = series(&[1.0, 2.0, 3.0, 4.0]);
        let pre = s.slice_on_or_before(date(1)).unwrap();
        assert_eq!(pre.len(), 2);
        assert_eq!(s.count_after(date(1)), 2);
        assert!(s.slice_on_or_before(date(-1)).is_none());
        assert_eq!(s.count_after(date(10)), 0);
    }

    #[test]
    fn test_resolve_buy_price_exact_match_no_fallback() {
        let s = series(&[100.0, 101.0, 102.0]);
        let resolved = s.resolve_buy_price(date(1));
        assert_approx_eq!(resolved.price, 101.0, 1e-12);
        assert!(!resolved.used_fallback);
    }

    #[test]
    fn test_resolve_buy_price_gap_falls_back_to_prior() {
        let s = PriceSeries::from_pairs([
            (date(0), 100.0),
            (date(1), 101.0),
            (date(4), 104.0),
        ])
        .unwrap();
        let resolved = s.resolve_buy_price(date(3));
        assert_approx_eq!(resolved.price, 101.0, 1e-12);
        assert_eq!(resolved.date, date(1));
        assert!(resolved.used_fallback);
    }

    #[test]
    fn test_resolve_buy_price_before_series_start() {
        let s = series(&[100.0, 101.0]);
        let resolved = s.resolve_buy_price(date(-5));
        assert_approx_eq!(resolved.price, 100.0, 1e-12);
        assert!(resolved.used_fallback);
    }
}
