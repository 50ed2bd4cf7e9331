//! Energy-need composition.
//!
//! Multiplies kWh/m² intensities by conditioned floor areas. Intensities
//! follow a per-purpose trajectory over the projection years and are fanned
//! out to building conditions through a reduction table.
use crate::area::AreaForecastMap;
use crate::building::{BuildingCategoryID, BuildingCodeID};
use crate::condition::Condition;
use crate::model::Model;
use crate::units::{Energy, EnergyPerArea};
use anyhow::Result;
use indexmap::IndexMap;
use log::warn;
use serde::Serialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use strum::{EnumIter, IntoEnumIterator};

/// A category of energy end-use
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
pub enum Purpose {
    /// Space heating
    #[string = "space_heating"]
    SpaceHeating,
    /// Domestic hot water
    #[string = "domestic_hot_water"]
    DomesticHotWater,
    /// Fans and pumps
    #[string = "fans_and_pumps"]
    FansAndPumps,
    /// Lighting
    #[string = "lighting"]
    Lighting,
    /// Electrical equipment
    #[string = "electrical_equipment"]
    ElectricalEquipment,
    /// Cooling
    #[string = "cooling"]
    Cooling,
}

/// Whether the yearly efficiency improvement keeps compounding inside a
/// policy window or only over the years outside it
#[derive(PartialEq, Eq, Clone, Copy, Debug, DeserializeLabeledStringEnum)]
pub enum PolicyEfficiency {
    /// Efficiency compounds every year, also inside policy windows
    #[string = "combined"]
    Combined,
    /// Efficiency only compounds over years outside policy windows
    #[string = "policy_only"]
    PolicyOnly,
}

/// How the kWh/m² intensity of a purpose develops over the projection years
#[derive(PartialEq, Clone, Debug)]
pub enum IntensityTrajectory {
    /// Intensity unchanged over the whole projection
    Constant,
    /// Compounding yearly efficiency improvement after the calibration year
    YearlyEfficiency {
        /// Fractional improvement per year
        yearly_rate: f64,
    },
    /// A policy reduction phased in linearly over a window, with the yearly
    /// efficiency improvement (when present) applying per the configured mode
    PolicyWindow {
        /// First year of the policy window
        start_year: u32,
        /// Last year of the policy window
        end_year: u32,
        /// Total fractional reduction reached at the end of the window
        reduction: f64,
        /// Yearly efficiency improvement, if one applies to the purpose
        yearly_rate: Option<f64>,
    },
    /// Linear path from the base intensity to a target over a window,
    /// constant before and after
    LinearTarget {
        /// First year of the window
        start_year: u32,
        /// Last year of the window
        end_year: u32,
        /// Intensity reached at the end of the window
        target: EnergyPerArea,
    },
}

impl IntensityTrajectory {
    /// Compute the yearly intensity series for the given projection years.
    ///
    /// # Arguments
    ///
    /// * `base` - The intensity in the original condition
    /// * `years` - The projection years
    /// * `calibration_year` - Efficiency improvements apply from the year after
    /// * `policy_efficiency` - How efficiency and policy windows combine
    pub fn series(
        &self,
        base: EnergyPerArea,
        years: impl Iterator<Item = u32>,
        calibration_year: u32,
        policy_efficiency: PolicyEfficiency,
    ) -> Vec<EnergyPerArea> {
        match self {
            Self::Constant => years.map(|_| base).collect(),
            Self::YearlyEfficiency { yearly_rate } => years
                .map(|year| base * efficiency_factor(*yearly_rate, calibration_year, year))
                .collect(),
            Self::LinearTarget {
                start_year,
                end_year,
                target,
            } => years
                .map(|year| {
                    if year <= *start_year {
                        base
                    } else if year >= *end_year {
                        *target
                    } else {
                        let progress =
                            f64::from(year - start_year) / f64::from(end_year - start_year);
                        base + (*target - base) * progress
                    }
                })
                .collect(),
            Self::PolicyWindow {
                start_year,
                end_year,
                reduction,
                yearly_rate,
            } => years
                .map(|year| {
                    let policy = if year < *start_year {
                        1.0
                    } else if year >= *end_year {
                        1.0 - reduction
                    } else {
                        1.0 - reduction * f64::from(year - start_year)
                            / f64::from(end_year - start_year)
                    };
                    let efficiency = match yearly_rate {
                        None => 1.0,
                        Some(rate) => match policy_efficiency {
                            PolicyEfficiency::Combined => {
                                efficiency_factor(*rate, calibration_year, year)
                            }
                            PolicyEfficiency::PolicyOnly => {
                                let exponent = (calibration_year + 1..=year)
                                    .filter(|y| y < start_year || y > end_year)
                                    .count();
                                (1.0 - rate).powi(exponent as i32)
                            }
                        },
                    };
                    base * (policy * efficiency)
                })
                .collect(),
        }
    }
}

/// The compounding efficiency factor for a year relative to the calibration year
fn efficiency_factor(yearly_rate: f64, calibration_year: u32, year: u32) -> f64 {
    (1.0 - yearly_rate).powi(year.saturating_sub(calibration_year) as i32)
}

/// One row of the energy-purpose output table
#[derive(PartialEq, Clone, Debug, Serialize)]
pub struct EnergyNeedRow {
    /// The building category
    pub building_category: BuildingCategoryID,
    /// The construction-period cohort
    pub building_code: BuildingCodeID,
    /// The energy end-use
    pub purpose: Purpose,
    /// The building condition
    pub condition: Condition,
    /// The calendar year
    pub year: u32,
    /// Energy need per square metre
    pub kwh_m2: EnergyPerArea,
    /// Energy need for the conditioned floor area
    pub kwh: Energy,
}

/// Total energy need per year (summed over conditions), grouped by building
/// category, building code and purpose
pub type DemandMap = IndexMap<(BuildingCategoryID, BuildingCodeID, Purpose), Vec<Energy>>;

/// The output of the energy-need composer
#[derive(PartialEq, Clone, Debug)]
pub struct EnergyNeedResults {
    /// Long rows for the energy-purpose output table
    pub rows: Vec<EnergyNeedRow>,
    /// Demand series for the heating-system allocator
    pub demand: DemandMap,
}

/// Compose kWh/m² and kWh figures for every category, cohort, purpose,
/// condition and year.
///
/// A purpose with no intensity entry for a (category, cohort) pair is taken
/// as not applicable there. A missing reduction entry means no reduction,
/// with a warning; the original condition is never reduced. Demolished floor
/// area needs no energy.
///
/// # Arguments
///
/// * `model` - The projection model
/// * `areas` - The conditioned floor-area forecast
pub fn compute_energy_need(model: &Model, areas: &AreaForecastMap) -> Result<EnergyNeedResults> {
    let calibration_year = model.file.projection.calibration_year;
    let policy_efficiency = model.file.trajectories.policy_efficiency;
    let n_years = model.years().count();

    let mut rows = Vec::new();
    let mut demand = DemandMap::new();
    for ((category_id, code_id), series) in areas {
        for purpose in Purpose::iter() {
            let key = (category_id.clone(), code_id.clone(), purpose);
            let Some(&base) = model.energy_needs.get(&key) else {
                continue;
            };
            let trajectory = model
                .trajectories
                .get(&purpose)
                .unwrap_or(&IntensityTrajectory::Constant);
            let intensities =
                trajectory.series(base, model.years(), calibration_year, policy_efficiency);

            let totals = demand
                .entry(key)
                .or_insert_with(|| vec![Energy::default(); n_years]);
            for condition in Condition::LIVE {
                let reduction = condition_reduction(model, category_id, code_id, purpose, condition);
                for (offset, year) in model.years().enumerate() {
                    let kwh_m2 = intensities[offset] * (1.0 - reduction);
                    let kwh = kwh_m2 * series.conditioned[offset].get(condition);
                    totals[offset] += kwh;
                    rows.push(EnergyNeedRow {
                        building_category: category_id.clone(),
                        building_code: code_id.clone(),
                        purpose,
                        condition,
                        year,
                        kwh_m2,
                        kwh,
                    });
                }
            }
        }
    }

    Ok(EnergyNeedResults { rows, demand })
}

/// The energy-need reduction for a condition, defaulting to zero with a
/// warning when no entry is provided
fn condition_reduction(
    model: &Model,
    category_id: &BuildingCategoryID,
    code_id: &BuildingCodeID,
    purpose: Purpose,
    condition: Condition,
) -> f64 {
    if condition == Condition::Original {
        return 0.0;
    }
    match model.reductions.get(&(
        category_id.clone(),
        code_id.clone(),
        purpose,
        condition,
    )) {
        Some(&reduction) => reduction,
        None => {
            warn!(
                "No energy-need reduction for category {category_id}, building code {code_id}, \
                purpose {purpose:?}, condition {condition:?}; assuming none"
            );
            0.0
        }
    }
}
