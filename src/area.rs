//! Area lifecycle bookkeeping.
//!
//! Runs demolition and new construction forward year by year, keeping the
//! floor-area inventory partitioned by building category, construction-period
//! cohort, condition and year. Existing cohorts can only shrink through
//! demolition; the most recent cohort absorbs exogenous new construction.
use crate::building::{BuildingCategoryID, BuildingCodeID};
use crate::condition::{Condition, ConditionShareMap};
use crate::model::Model;
use crate::units::Area;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;

/// Floor area by condition for one building category, cohort and year
#[derive(PartialEq, Clone, Copy, Debug, Default)]
pub struct ConditionAreas {
    /// Area still in original condition
    pub original: Area,
    /// Area with small measures only
    pub small_measure: Area,
    /// Area renovated without small measures
    pub renovation: Area,
    /// Area both renovated and treated with small measures
    pub renovation_and_small_measure: Area,
    /// Cumulative demolished area
    pub demolished: Area,
}

impl ConditionAreas {
    /// The area in the given condition
    pub fn get(&self, condition: Condition) -> Area {
        match condition {
            Condition::Original => self.original,
            Condition::SmallMeasure => self.small_measure,
            Condition::Renovation => self.renovation,
            Condition::RenovationAndSmallMeasure => self.renovation_and_small_measure,
            Condition::Demolished => self.demolished,
        }
    }

    /// The standing (non-demolished) floor area
    pub fn standing(&self) -> Area {
        Condition::LIVE
            .into_iter()
            .map(|condition| self.get(condition))
            .sum()
    }
}

/// The yearly floor-area forecast for one building category and cohort.
///
/// Vectors are indexed by offset from the projection start year.
#[derive(PartialEq, Clone, Debug)]
pub struct AreaSeries {
    /// The cohort's area base: baseline plus accumulated new construction
    pub base: Vec<Area>,
    /// Floor area by condition, the base multiplied by the condition shares
    pub conditioned: Vec<ConditionAreas>,
}

/// Area series grouped by building category and building code
pub type AreaForecastMap = IndexMap<(BuildingCategoryID, BuildingCodeID), AreaSeries>;

/// Evolve the floor-area inventory over the projection years.
///
/// Every cohort starts from its baseline area. Existing cohorts lose area to
/// demolition as the cumulative demolition share grows; the new-build cohort
/// additionally absorbs the construction demand year by year, with
/// construction counted from the year after the projection start so that the
/// start-year inventory equals the baseline.
///
/// # Arguments
///
/// * `model` - The projection model
/// * `condition_shares` - Reconciled condition shares per (category, cohort)
///
/// # Returns
///
/// An [`AreaForecastMap`] covering every (category, cohort) pair.
pub fn evolve_area(
    model: &Model,
    condition_shares: &ConditionShareMap,
) -> Result<AreaForecastMap> {
    let new_build_id = model.new_build_code().id.clone();
    let mut map = AreaForecastMap::new();
    for category_id in model.categories.keys() {
        let construction = model.construction_demand.get(category_id);
        for code_id in model.codes.keys() {
            let key = (category_id.clone(), code_id.clone());
            let series = condition_shares
                .get(&key)
                .with_context(|| {
                    format!(
                        "No condition shares for category {category_id}, building code {code_id}"
                    )
                })?;
            let baseline = model.baseline_area(category_id, code_id);

            let mut base = Vec::new();
            let mut conditioned: Vec<ConditionAreas> = Vec::new();
            let mut cumulative_construction = Area::default();
            for (offset, year) in model.years().enumerate() {
                if *code_id == new_build_id && year > model.file.projection.start_year {
                    if let Some(construction) = construction {
                        cumulative_construction += construction[offset];
                    }
                }
                let area_base = baseline + cumulative_construction;

                let shares = &series.shares[offset];
                let areas = ConditionAreas {
                    original: area_base * shares.original,
                    small_measure: area_base * shares.small_measure,
                    renovation: area_base * shares.renovation,
                    renovation_and_small_measure: area_base
                        * shares.renovation_and_small_measure,
                    demolished: area_base * shares.demolished,
                };

                // Demolition can never exceed what was standing the year before
                let demolished_in_year = area_base * series.demolition_rate[offset];
                if let Some(previous) = conditioned.last() {
                    ensure!(
                        demolished_in_year.value() <= previous.standing().value() + 1e-6,
                        "Demolished area {} exceeds standing area {} (category: {category_id}, \
                        building code: {code_id}, year: {year})",
                        demolished_in_year.value(),
                        previous.standing().value()
                    );
                }

                base.push(area_base);
                conditioned.push(areas);
            }

            map.insert(key, AreaSeries { base, conditioned });
        }
    }

    Ok(map)
}
