//! Building conditions and the reconciliation of measure-adoption curves into
//! mutually exclusive condition shares.
//!
//! For each building category and cohort, the cumulative small-measure,
//! renovation and demolition curves are expanded over the projection years
//! (building age = calendar year minus the cohort's construction year) and
//! then reconciled under capacity caps so that the five condition shares
//! partition the stock exactly.
use crate::building::{BuildingCategoryID, BuildingCodeID};
use crate::model::Model;
use crate::scurve::Measure;
use anyhow::{Result, ensure};
use float_cmp::approx_eq;
use indexmap::IndexMap;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// Tolerance for the condition-share conservation check
const SHARE_SUM_TOLERANCE: f64 = 1e-9;

/// The mutually exclusive conditions a building can be in
#[derive(
    PartialEq,
    Eq,
    Hash,
    Clone,
    Copy,
    Debug,
    DeserializeLabeledStringEnum,
    SerializeLabeledStringEnum,
)]
pub enum Condition {
    /// As constructed
    #[string = "original"]
    Original,
    /// Small measures only
    #[string = "small_measure"]
    SmallMeasure,
    /// Renovated, without small measures
    #[string = "renovation"]
    Renovation,
    /// Both renovated and treated with small measures
    #[string = "renovation_and_small_measure"]
    RenovationAndSmallMeasure,
    /// Demolished (cumulative)
    #[string = "demolished"]
    Demolished,
}

impl Condition {
    /// The conditions with standing floor area
    pub const LIVE: [Condition; 4] = [
        Condition::Original,
        Condition::SmallMeasure,
        Condition::Renovation,
        Condition::RenovationAndSmallMeasure,
    ];

    /// All five conditions
    pub const ALL: [Condition; 5] = [
        Condition::Original,
        Condition::SmallMeasure,
        Condition::Renovation,
        Condition::RenovationAndSmallMeasure,
        Condition::Demolished,
    ];
}

/// The condition shares for one building category, cohort and calendar year
#[derive(PartialEq, Clone, Copy, Debug, Default)]
pub struct ConditionShares {
    /// Share still in original condition
    pub original: f64,
    /// Share with small measures only
    pub small_measure: f64,
    /// Share renovated without small measures
    pub renovation: f64,
    /// Share both renovated and treated with small measures
    pub renovation_and_small_measure: f64,
    /// Cumulative demolished share
    pub demolished: f64,
}

impl ConditionShares {
    /// The share for the given condition
    pub fn get(&self, condition: Condition) -> f64 {
        match condition {
            Condition::Original => self.original,
            Condition::SmallMeasure => self.small_measure,
            Condition::Renovation => self.renovation,
            Condition::RenovationAndSmallMeasure => self.renovation_and_small_measure,
            Condition::Demolished => self.demolished,
        }
    }

    /// The sum over all five conditions
    pub fn sum(&self) -> f64 {
        Condition::ALL
            .into_iter()
            .map(|condition| self.get(condition))
            .sum()
    }
}

/// Per-year condition shares and demolition rates for one (category, cohort).
///
/// Both vectors are indexed by offset from the projection start year.
#[derive(PartialEq, Clone, Debug)]
pub struct ConditionShareSeries {
    /// Reconciled condition shares for each projection year
    pub shares: Vec<ConditionShares>,
    /// The demolition rate applied in each projection year
    pub demolition_rate: Vec<f64>,
}

/// Condition share series grouped by building category and building code
pub type ConditionShareMap = IndexMap<(BuildingCategoryID, BuildingCodeID), ConditionShareSeries>;

/// Reconcile cumulative measure curves into mutually exclusive condition shares.
///
/// # Arguments
///
/// * `demolished` - Cumulative demolished share
/// * `small_measure_cum` - Cumulative small-measure curve (before capping)
/// * `renovation_cum` - Cumulative renovation curve (before capping)
/// * `small_never_share` - Fraction that will never undergo small measures
/// * `renovation_never_share` - Fraction that will never be renovated
///
/// # Returns
///
/// Condition shares summing to one: the demolished share is kept, the measure
/// curves are capped by the remaining capacity, their overlap is assigned to
/// the combined condition and the original condition absorbs the rest.
pub fn reconcile_shares(
    demolished: f64,
    small_measure_cum: f64,
    renovation_cum: f64,
    small_never_share: f64,
    renovation_never_share: f64,
) -> ConditionShares {
    let small_max = (1.0 - demolished - small_never_share).max(0.0);
    let renovation_max = (1.0 - demolished - renovation_never_share).max(0.0);
    let small_total = small_measure_cum.min(small_max).max(0.0);
    let renovation_total = renovation_cum.min(renovation_max).max(0.0);

    // While total measures have not yet saturated the renovation capacity, the
    // whole renovation curve counts as exclusive so that it has room to grow
    let total_measures = (small_total + renovation_total).max(0.0);
    let renovation = if total_measures < renovation_max {
        renovation_total
    } else {
        (renovation_max - small_total).max(0.0)
    };
    let renovation_and_small_measure = renovation_total - renovation;
    let small_measure = small_total - renovation_and_small_measure;
    let original =
        1.0 - demolished - renovation - renovation_and_small_measure - small_measure;

    ConditionShares {
        original,
        small_measure,
        renovation,
        renovation_and_small_measure,
        demolished,
    }
}

/// Expand the S-curves over the projection years and reconcile them into
/// condition shares for every building category and cohort.
///
/// Demolition is forced to zero at and before the projection start year so
/// the start-year inventory is preserved, then accumulated forward. Cohorts
/// constructed after a given calendar year have negative age there, which
/// contributes nothing to any measure curve. The new-build cohort is only
/// demolished within the horizon when the model configuration says so.
///
/// # Arguments
///
/// * `model` - The projection model
///
/// # Returns
///
/// A [`ConditionShareMap`] covering every (category, cohort) pair, or an
/// error if the reconciled shares fail to sum to one somewhere.
pub fn compute_condition_shares(model: &Model) -> Result<ConditionShareMap> {
    let new_build_id = model.new_build_code().id.clone();
    let mut map = ConditionShareMap::new();
    for category_id in model.categories.keys() {
        let demolition = model.scurve(category_id, Measure::Demolition);
        let small = model.scurve(category_id, Measure::SmallMeasure);
        let renovation = model.scurve(category_id, Measure::Renovation);

        for (code_id, code) in &model.codes {
            let skip_demolition =
                *code_id == new_build_id && !model.file.construction.demolish_new_build;

            let mut shares = Vec::new();
            let mut demolition_rate = Vec::new();
            let mut demolished_cum = 0.0;
            for year in model.years() {
                let age = i64::from(year) - i64::from(code.building_year);

                let rate = if year <= model.file.projection.start_year || skip_demolition {
                    0.0
                } else {
                    demolition.rate(age)
                };
                demolished_cum += rate;
                demolition_rate.push(rate);

                let reconciled = reconcile_shares(
                    demolished_cum,
                    small.cumulative(age),
                    renovation.cumulative(age),
                    small.never_share(),
                    renovation.never_share(),
                );
                ensure!(
                    approx_eq!(f64, reconciled.sum(), 1.0, epsilon = SHARE_SUM_TOLERANCE),
                    "Condition shares do not sum to 1 (category: {category_id}, building code: \
                    {code_id}, year: {year}, sum: {})",
                    reconciled.sum()
                );
                shares.push(reconciled);
            }

            map.insert(
                (category_id.clone(), code_id.clone()),
                ConditionShareSeries {
                    shares,
                    demolition_rate,
                },
            );
        }
    }

    Ok(map)
}
