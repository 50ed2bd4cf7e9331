//! S-curve generation.
//!
//! An S-curve converts a parametric description of measure-adoption timing
//! into a per-age adoption rate over a building's life, plus its cumulative.
//! The rate is piecewise-constant in four segments: before the earliest age
//! nothing happens, adoption then proceeds at a low rate up to the rush
//! period around the average age, peaks during the rush and tails off until
//! the last age. A never-share of the stock is never treated at all.
use anyhow::{Result, bail, ensure};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use strum::EnumIter;

/// Tolerance below which an adoption share is considered zero
const SHARE_TOLERANCE: f64 = 1e-9;

/// A measure family whose adoption timing is described by an S-curve
#[derive(
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Debug,
    EnumIter,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum Measure {
    /// Small energy-efficiency measures (e.g. new windows)
    #[string = "small_measure"]
    SmallMeasure,
    /// Full renovation
    #[string = "renovation"]
    Renovation,
    /// Demolition
    #[string = "demolition"]
    Demolition,
}

/// Parametric description of measure-adoption timing for one building
/// category and measure.
#[derive(PartialEq, Clone, Debug)]
pub struct SCurveParameters {
    /// Age at which the first buildings undergo the measure
    pub earliest_age: f64,
    /// Average age at which the measure is undertaken
    pub average_age: f64,
    /// Width in years of the period of peak adoption, centred on the average age
    pub rush_period: f64,
    /// Age by which every building that will ever undergo the measure has done so
    pub last_age: f64,
    /// Fraction of the stock treated during the rush period
    pub rush_share: f64,
    /// Fraction of the stock that never undergoes the measure
    pub never_share: f64,
}

/// A per-age adoption rate curve and its cumulative.
///
/// Rates are indexed by building age, from age zero to the building lifetime
/// (extended to the last age of the parameters when that is greater). Ages
/// outside the envelope have rate zero; the cumulative is clamped to zero
/// before age zero and to its final value beyond the envelope.
#[derive(PartialEq, Clone, Debug)]
pub struct SCurve {
    rates: Vec<f64>,
    cumulative: Vec<f64>,
    never_share: f64,
}

impl SCurve {
    /// Build the rate and cumulative curves for the given parameters.
    ///
    /// # Arguments
    ///
    /// * `params` - The S-curve parameters
    /// * `lifetime` - The building lifetime in years
    pub fn new(params: &SCurveParameters, lifetime: u32) -> Result<Self> {
        validate_parameters(params)?;

        let pre_width = params.average_age - params.rush_period / 2.0 - params.earliest_age;
        let post_width = params.last_age - params.average_age - params.rush_period / 2.0;
        ensure!(
            pre_width >= 0.0,
            "Invalid s-curve parameters: rush period starts before earliest_age"
        );
        ensure!(
            post_width >= 0.0,
            "Invalid s-curve parameters: rush period ends after last_age"
        );

        // Half of the non-rush, non-never share is adopted on each side of the rush
        let half_share = (1.0 - params.rush_share - params.never_share) / 2.0;
        let pre_rate = segment_rate(half_share, pre_width, "before")?;
        let post_rate = segment_rate(half_share, post_width, "after")?;
        let rush_rate = segment_rate(params.rush_share, params.rush_period, "during")?;

        let max_age = (lifetime as f64).max(params.last_age).ceil() as usize;
        let mut rates = Vec::with_capacity(max_age + 1);
        let mut cumulative = Vec::with_capacity(max_age + 1);
        let mut total = 0.0;
        for age in 0..=max_age {
            let age = age as f64;
            let rate = if age < params.earliest_age || age >= params.last_age {
                0.0
            } else if age < params.average_age - params.rush_period / 2.0 {
                pre_rate
            } else if age < params.average_age + params.rush_period / 2.0 {
                rush_rate
            } else {
                post_rate
            };
            total += rate;
            rates.push(rate);
            cumulative.push(total);
        }

        Ok(Self {
            rates,
            cumulative,
            never_share: params.never_share,
        })
    }

    /// The adoption rate at the given building age (zero outside the envelope)
    pub fn rate(&self, age: i64) -> f64 {
        usize::try_from(age)
            .ok()
            .and_then(|age| self.rates.get(age).copied())
            .unwrap_or(0.0)
    }

    /// The cumulative adopted share at the given building age.
    ///
    /// Negative ages yield zero; ages beyond the envelope yield the final value.
    pub fn cumulative(&self, age: i64) -> f64 {
        if age < 0 {
            return 0.0;
        }
        let age = (age as usize).min(self.cumulative.len() - 1);
        self.cumulative[age]
    }

    /// The fraction of the stock that never undergoes the measure
    pub fn never_share(&self) -> f64 {
        self.never_share
    }
}

/// Check that all S-curve parameters are non-negative and shares consistent
fn validate_parameters(params: &SCurveParameters) -> Result<()> {
    let fields = [
        ("earliest_age", params.earliest_age),
        ("average_age", params.average_age),
        ("rush_period", params.rush_period),
        ("last_age", params.last_age),
        ("rush_share", params.rush_share),
        ("never_share", params.never_share),
    ];
    let negative: Vec<_> = fields
        .iter()
        .filter(|(_, value)| *value < 0.0)
        .map(|(name, _)| *name)
        .collect();
    ensure!(
        negative.is_empty(),
        "Invalid s-curve parameters: negative values for {}",
        negative.join(", ")
    );

    ensure!(
        params.rush_share + params.never_share <= 1.0 + SHARE_TOLERANCE,
        "Invalid s-curve parameters: rush_share + never_share exceeds 1"
    );

    Ok(())
}

/// The constant rate which distributes `share` over a segment of `width` years.
///
/// A zero-width segment is empty and contributes no rate, which is only
/// acceptable if there is no share to distribute over it.
fn segment_rate(share: f64, width: f64, position: &str) -> Result<f64> {
    if width > 0.0 {
        Ok(share / width)
    } else if share.abs() <= SHARE_TOLERANCE {
        Ok(0.0)
    } else {
        bail!(
            "Invalid s-curve parameters: no room to distribute the adoption share {position} the rush period"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn house_demolition_params() -> SCurveParameters {
        SCurveParameters {
            earliest_age: 60.0,
            average_age: 90.0,
            rush_period: 40.0,
            last_age: 150.0,
            rush_share: 0.7,
            never_share: 0.05,
        }
    }

    #[test]
    fn test_house_demolition_curve() {
        let curve = SCurve::new(&house_demolition_params(), 130).unwrap();
        assert_eq!(curve.rate(59), 0.0);
        assert_approx_eq!(f64, curve.rate(60), 0.0125, epsilon = 1e-12);
        assert_approx_eq!(f64, curve.rate(69), 0.0125, epsilon = 1e-12);
        assert_approx_eq!(f64, curve.rate(70), 0.0175, epsilon = 1e-12);
        assert_approx_eq!(f64, curve.rate(109), 0.0175, epsilon = 1e-12);
        assert_approx_eq!(f64, curve.rate(110), 0.003125, epsilon = 1e-12);
        assert_approx_eq!(f64, curve.rate(149), 0.003125, epsilon = 1e-12);
        assert_eq!(curve.rate(150), 0.0);
        assert_approx_eq!(f64, curve.cumulative(150), 0.95, epsilon = 1e-9);
    }

    #[test]
    fn test_apartment_block_small_measure_curve() {
        let params = SCurveParameters {
            earliest_age: 5.0,
            average_age: 20.0,
            rush_period: 20.0,
            last_age: 50.0,
            rush_share: 0.8,
            never_share: 0.1,
        };
        let curve = SCurve::new(&params, 130).unwrap();
        assert_eq!(curve.rate(4), 0.0);
        assert_approx_eq!(f64, curve.rate(5), 0.01, epsilon = 1e-12);
        assert_approx_eq!(f64, curve.rate(9), 0.01, epsilon = 1e-12);
        assert_approx_eq!(f64, curve.rate(10), 0.04, epsilon = 1e-12);
        assert_approx_eq!(f64, curve.rate(29), 0.04, epsilon = 1e-12);
        assert_approx_eq!(f64, curve.rate(30), 0.0025, epsilon = 1e-12);
        assert_approx_eq!(f64, curve.rate(49), 0.0025, epsilon = 1e-12);
        assert_eq!(curve.rate(50), 0.0);
        assert_approx_eq!(f64, curve.cumulative(50), 0.9, epsilon = 1e-9);
    }

    /// Summing rates over all ages gives 1 - never_share
    #[rstest]
    #[case(house_demolition_params())]
    #[case(SCurveParameters {
        earliest_age: 5.0,
        average_age: 20.0,
        rush_period: 20.0,
        last_age: 50.0,
        rush_share: 0.8,
        never_share: 0.1,
    })]
    fn test_rate_round_trip(#[case] params: SCurveParameters) {
        let curve = SCurve::new(&params, 130).unwrap();
        let total: f64 = (0..curve.rates.len()).map(|age| curve.rate(age as i64)).sum();
        assert_approx_eq!(f64, total, 1.0 - params.never_share, epsilon = 1e-9);
    }

    #[test]
    fn test_negative_parameters() {
        let params = SCurveParameters {
            earliest_age: -1.0,
            rush_share: -0.5,
            ..house_demolition_params()
        };
        assert_error!(
            SCurve::new(&params, 130),
            "Invalid s-curve parameters: negative values for earliest_age, rush_share"
        );
    }

    #[test]
    fn test_shares_exceed_one() {
        let params = SCurveParameters {
            rush_share: 0.9,
            never_share: 0.2,
            ..house_demolition_params()
        };
        assert_error!(
            SCurve::new(&params, 130),
            "Invalid s-curve parameters: rush_share + never_share exceeds 1"
        );
    }

    #[test]
    fn test_rush_overlapping_envelope() {
        let params = SCurveParameters {
            rush_period: 100.0,
            ..house_demolition_params()
        };
        assert_error!(
            SCurve::new(&params, 130),
            "Invalid s-curve parameters: rush period starts before earliest_age"
        );
    }

    /// A zero-width segment with adoption share left to distribute is invalid
    #[test]
    fn test_empty_segment_with_share() {
        let params = SCurveParameters {
            earliest_age: 70.0,
            ..house_demolition_params()
        };
        assert_error!(
            SCurve::new(&params, 130),
            "Invalid s-curve parameters: no room to distribute the adoption share before the rush period"
        );
    }

    /// A zero-width segment is skipped when the rush and never shares cover everything
    #[test]
    fn test_empty_segment_without_share() {
        let params = SCurveParameters {
            earliest_age: 70.0,
            last_age: 110.0,
            rush_share: 0.9,
            never_share: 0.1,
            ..house_demolition_params()
        };
        let curve = SCurve::new(&params, 130).unwrap();
        assert_approx_eq!(f64, curve.cumulative(130), 0.9, epsilon = 1e-9);
    }

    #[test]
    fn test_cumulative_is_clamped() {
        let curve = SCurve::new(&house_demolition_params(), 130).unwrap();
        assert_eq!(curve.cumulative(-10), 0.0);
        assert_approx_eq!(
            f64,
            curve.cumulative(1000),
            curve.cumulative(150),
            epsilon = 1e-12
        );
    }

    /// The curve envelope extends beyond the lifetime when last_age is greater
    #[test]
    fn test_envelope_extends_to_last_age() {
        let curve = SCurve::new(&house_demolition_params(), 130).unwrap();
        assert!(curve.rate(149) > 0.0);
    }
}
