//! Market-cap band tracking.
//!
//! The band is a tolerance interval around the floor of the last reference
//! market cap. Leaving the band below ratchets it down; leaving it above is
//! the buy signal.

use serde::{Deserialize, Serialize};

/// Where a market-cap sample falls relative to the current band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandPosition {
    Below,
    Inside,
    Above,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketCapBand {
    /// floor() of the market cap the band was built from
    pub center: f64,
    pub lower: f64,
    pub higher: f64,
}

impl MarketCapBand {
    /// Build a band centered on `floor(current)`.
    ///
    /// The previous center is never consulted, so repeated recomputation does
    /// not accumulate drift.
    pub fn around(current: f64, lower_interval_pct: f64, higher_interval_pct: f64) -> Self {
        let center = current.floor();
        Self {
            center,
            lower: center * (1.0 - lower_interval_pct / 100.0),
            higher: center * (1.0 + higher_interval_pct / 100.0),
        }
    }

    pub fn classify(&self, current: f64) -> BandPosition {
        if current < self.lower {
            BandPosition::Below
        } else if current > self.higher {
            BandPosition::Above
        } else {
            BandPosition::Inside
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.classify(value) == BandPosition::Inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_band_centered_on_floor() {
        let band = MarketCapBand::around(112.7, 10.0, 10.0);
        assert_relative_eq!(band.center, 112.0);
        assert_relative_eq!(band.lower, 100.8, epsilon = 1e-9);
        assert_relative_eq!(band.higher, 123.2, epsilon = 1e-9);
    }

    #[test]
    fn test_asymmetric_intervals() {
        let band = MarketCapBand::around(200.0, 10.0, 20.0);
        assert_relative_eq!(band.lower, 180.0, epsilon = 1e-9);
        assert_relative_eq!(band.higher, 240.0, epsilon = 1e-9);
    }

    #[test]
    fn test_classify_edges_are_inside() {
        let band = MarketCapBand::around(100.0, 10.0, 10.0);
        assert_eq!(band.classify(90.0), BandPosition::Inside);
        assert_eq!(band.classify(110.0), BandPosition::Inside);
        assert_eq!(band.classify(89.99), BandPosition::Below);
        assert_eq!(band.classify(110.01), BandPosition::Above);
    }

    #[test]
    fn test_recomputed_band_contains_floor() {
        for current in [65.0, 65.9, 99.99, 1234.5, 987_654.321] {
            let band = MarketCapBand::around(current, 10.0, 20.0);
            assert!(band.lower <= current.floor());
            assert!(current.floor() <= band.higher);
            assert!(band.contains(current));
        }
    }

    #[test]
    fn test_no_drift_between_recomputations() {
        let first = MarketCapBand::around(150.4, 10.0, 10.0);
        let again = MarketCapBand::around(150.9, 10.0, 10.0);
        assert_eq!(first, again);
    }
}
