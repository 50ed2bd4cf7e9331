//! Code for reading energy-need intensities, per-condition reductions and
//! intensity trajectories from CSV files.
use super::*;
use crate::building::{BuildingCategoryMap, BuildingCodeMap};
use crate::condition::Condition;
use crate::energy_need::{IntensityTrajectory, Purpose};
use crate::id::MapIDCollection;
use crate::model::{EnergyNeedMap, ReductionMap};
use crate::units::EnergyPerArea;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const ENERGY_NEED_FILE_NAME: &str = "energy_need.csv";
const REDUCTIONS_FILE_NAME: &str = "energy_need_reductions.csv";
const EFFICIENCY_IMPROVEMENTS_FILE_NAME: &str = "efficiency_improvements.csv";
const POLICY_MEASURES_FILE_NAME: &str = "policy_measures.csv";
const INTENSITY_TARGETS_FILE_NAME: &str = "intensity_targets.csv";

/// Represents one row of the energy-need intensity file
#[derive(PartialEq, Clone, Debug, Deserialize)]
struct EnergyNeedRaw {
    /// The building category
    building_category_id: String,
    /// The construction-period cohort
    building_code_id: String,
    /// The energy end-use
    purpose: Purpose,
    /// Energy need per square metre in the original condition
    kwh_m2: f64,
}

/// Represents one row of the per-condition reduction file
#[derive(PartialEq, Clone, Debug, Deserialize)]
struct ReductionRaw {
    /// The building category
    building_category_id: String,
    /// The construction-period cohort
    building_code_id: String,
    /// The energy end-use
    purpose: Purpose,
    /// The building condition the reduction applies to
    condition: Condition,
    /// Fractional reduction of the original-condition intensity
    #[serde(deserialize_with = "deserialise_proportion")]
    reduction: f64,
}

/// Represents one row of the yearly efficiency-improvement file
#[derive(PartialEq, Clone, Debug, Deserialize)]
struct EfficiencyImprovementRaw {
    /// The energy end-use
    purpose: Purpose,
    /// Fractional intensity improvement per year after the calibration year
    #[serde(deserialize_with = "deserialise_proportion")]
    yearly_rate: f64,
}

/// Represents one row of the policy-measure file
#[derive(PartialEq, Clone, Debug, Deserialize)]
struct PolicyMeasureRaw {
    /// The energy end-use
    purpose: Purpose,
    /// First year of the policy window
    start_year: u32,
    /// Last year of the policy window
    end_year: u32,
    /// Total fractional reduction reached at the end of the window
    #[serde(deserialize_with = "deserialise_proportion")]
    reduction: f64,
}

/// Represents one row of the intensity-target file
#[derive(PartialEq, Clone, Debug, Deserialize)]
struct IntensityTargetRaw {
    /// The energy end-use
    purpose: Purpose,
    /// First year of the window
    start_year: u32,
    /// Last year of the window
    end_year: u32,
    /// Intensity reached at the end of the window
    target_kwh_m2: f64,
}

/// Read the original-condition energy-need intensities.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `categories` - All building categories
/// * `codes` - All building codes
pub fn read_energy_needs(
    model_dir: &Path,
    categories: &BuildingCategoryMap,
    codes: &BuildingCodeMap,
) -> Result<EnergyNeedMap> {
    let file_path = model_dir.join(ENERGY_NEED_FILE_NAME);
    let iter = read_csv(&file_path)?;
    read_energy_needs_from_iter(iter, categories, codes).with_context(|| input_err_msg(&file_path))
}

fn read_energy_needs_from_iter<I>(
    iter: I,
    categories: &BuildingCategoryMap,
    codes: &BuildingCodeMap,
) -> Result<EnergyNeedMap>
where
    I: Iterator<Item = EnergyNeedRaw>,
{
    let mut map = EnergyNeedMap::new();
    for raw in iter {
        let category_id = categories.get_key_by_str(&raw.building_category_id)?;
        let code_id = codes.get_key_by_str(&raw.building_code_id)?;
        ensure!(
            raw.kwh_m2.is_finite() && raw.kwh_m2 >= 0.0,
            "Energy need must be a non-negative number (category: {category_id}, building \
            code: {code_id}, purpose: {:?})",
            raw.purpose
        );
        ensure!(
            map.insert(
                (category_id.clone(), code_id.clone(), raw.purpose),
                EnergyPerArea::from(raw.kwh_m2)
            )
            .is_none(),
            "Duplicate energy-need entries (category: {category_id}, building code: {code_id}, \
            purpose: {:?})",
            raw.purpose
        );
    }

    Ok(map)
}

/// Read the per-condition energy-need reductions.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `categories` - All building categories
/// * `codes` - All building codes
pub fn read_reductions(
    model_dir: &Path,
    categories: &BuildingCategoryMap,
    codes: &BuildingCodeMap,
) -> Result<ReductionMap> {
    let file_path = model_dir.join(REDUCTIONS_FILE_NAME);
    let iter = read_csv(&file_path)?;
    read_reductions_from_iter(iter, categories, codes).with_context(|| input_err_msg(&file_path))
}

fn read_reductions_from_iter<I>(
    iter: I,
    categories: &BuildingCategoryMap,
    codes: &BuildingCodeMap,
) -> Result<ReductionMap>
where
    I: Iterator<Item = ReductionRaw>,
{
    let mut map = ReductionMap::new();
    for raw in iter {
        let category_id = categories.get_key_by_str(&raw.building_category_id)?;
        let code_id = codes.get_key_by_str(&raw.building_code_id)?;
        ensure!(
            !matches!(raw.condition, Condition::Original | Condition::Demolished),
            "Reductions cannot be supplied for condition {:?} (category: {category_id}, \
            building code: {code_id})",
            raw.condition
        );
        ensure!(
            map.insert(
                (
                    category_id.clone(),
                    code_id.clone(),
                    raw.purpose,
                    raw.condition
                ),
                raw.reduction
            )
            .is_none(),
            "Duplicate reduction entries (category: {category_id}, building code: {code_id}, \
            purpose: {:?}, condition: {:?})",
            raw.purpose,
            raw.condition
        );
    }

    Ok(map)
}

/// Read the three trajectory files and assemble one trajectory per purpose.
///
/// All three files are optional. An intensity target takes the lighting-style
/// linear form; a policy measure takes the policy-window form, carrying the
/// purpose's yearly efficiency rate when one is given; a yearly efficiency
/// rate alone takes the compounding form. Purposes appearing in none of the
/// files keep a constant intensity.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_trajectories(model_dir: &Path) -> Result<IndexMap<Purpose, IntensityTrajectory>> {
    let efficiency_path = model_dir.join(EFFICIENCY_IMPROVEMENTS_FILE_NAME);
    let efficiencies = read_efficiencies_from_iter(read_csv_optional(&efficiency_path)?)
        .with_context(|| input_err_msg(&efficiency_path))?;

    let policy_path = model_dir.join(POLICY_MEASURES_FILE_NAME);
    let policies = read_policies_from_iter(read_csv_optional(&policy_path)?)
        .with_context(|| input_err_msg(&policy_path))?;

    let targets_path = model_dir.join(INTENSITY_TARGETS_FILE_NAME);
    let targets = read_targets_from_iter(read_csv_optional(&targets_path)?)
        .with_context(|| input_err_msg(&targets_path))?;

    assemble_trajectories(&efficiencies, &policies, &targets)
}

fn read_efficiencies_from_iter<I>(iter: I) -> Result<HashMap<Purpose, f64>>
where
    I: Iterator<Item = EfficiencyImprovementRaw>,
{
    let mut map = HashMap::new();
    for raw in iter {
        ensure!(
            map.insert(raw.purpose, raw.yearly_rate).is_none(),
            "Duplicate efficiency-improvement entries (purpose: {:?})",
            raw.purpose
        );
    }

    Ok(map)
}

fn read_policies_from_iter<I>(iter: I) -> Result<IndexMap<Purpose, PolicyMeasureRaw>>
where
    I: Iterator<Item = PolicyMeasureRaw>,
{
    let mut map = IndexMap::new();
    for raw in iter {
        ensure!(
            raw.start_year < raw.end_year,
            "Policy window must end after it starts (purpose: {:?})",
            raw.purpose
        );
        ensure!(
            map.insert(raw.purpose, raw.clone()).is_none(),
            "Duplicate policy-measure entries (purpose: {:?})",
            raw.purpose
        );
    }

    Ok(map)
}

fn read_targets_from_iter<I>(iter: I) -> Result<IndexMap<Purpose, IntensityTargetRaw>>
where
    I: Iterator<Item = IntensityTargetRaw>,
{
    let mut map = IndexMap::new();
    for raw in iter {
        ensure!(
            raw.start_year < raw.end_year,
            "Target window must end after it starts (purpose: {:?})",
            raw.purpose
        );
        ensure!(
            raw.target_kwh_m2.is_finite() && raw.target_kwh_m2 >= 0.0,
            "Target intensity must be a non-negative number (purpose: {:?})",
            raw.purpose
        );
        ensure!(
            map.insert(raw.purpose, raw.clone()).is_none(),
            "Duplicate intensity-target entries (purpose: {:?})",
            raw.purpose
        );
    }

    Ok(map)
}

fn assemble_trajectories(
    efficiencies: &HashMap<Purpose, f64>,
    policies: &IndexMap<Purpose, PolicyMeasureRaw>,
    targets: &IndexMap<Purpose, IntensityTargetRaw>,
) -> Result<IndexMap<Purpose, IntensityTrajectory>> {
    let mut map = IndexMap::new();
    for (purpose, target) in targets {
        ensure!(
            !policies.contains_key(purpose) && !efficiencies.contains_key(purpose),
            "Purpose {purpose:?} has an intensity target and another trajectory"
        );
        map.insert(
            *purpose,
            IntensityTrajectory::LinearTarget {
                start_year: target.start_year,
                end_year: target.end_year,
                target: EnergyPerArea::from(target.target_kwh_m2),
            },
        );
    }
    for (purpose, policy) in policies {
        map.insert(
            *purpose,
            IntensityTrajectory::PolicyWindow {
                start_year: policy.start_year,
                end_year: policy.end_year,
                reduction: policy.reduction,
                yearly_rate: efficiencies.get(purpose).copied(),
            },
        );
    }
    for (purpose, yearly_rate) in efficiencies {
        if !map.contains_key(purpose) {
            map.insert(
                *purpose,
                IntensityTrajectory::YearlyEfficiency {
                    yearly_rate: *yearly_rate,
                },
            );
        }
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, categories, codes};
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[rstest]
    fn test_read_energy_needs_from_iter(categories: BuildingCategoryMap, codes: BuildingCodeMap) {
        let rows = [EnergyNeedRaw {
            building_category_id: "house".to_string(),
            building_code_id: "tek49".to_string(),
            purpose: Purpose::SpaceHeating,
            kwh_m2: 150.0,
        }];
        let map = read_energy_needs_from_iter(rows.into_iter(), &categories, &codes).unwrap();
        assert_eq!(
            map[&("house".into(), "tek49".into(), Purpose::SpaceHeating)],
            EnergyPerArea::from(150.0)
        );
    }

    #[rstest]
    fn test_read_energy_needs_from_iter_negative(
        categories: BuildingCategoryMap,
        codes: BuildingCodeMap,
    ) {
        let rows = [EnergyNeedRaw {
            building_category_id: "house".to_string(),
            building_code_id: "tek49".to_string(),
            purpose: Purpose::SpaceHeating,
            kwh_m2: -1.0,
        }];
        assert!(read_energy_needs_from_iter(rows.into_iter(), &categories, &codes).is_err());
    }

    #[rstest]
    fn test_read_reductions_from_iter_bad_condition(
        categories: BuildingCategoryMap,
        codes: BuildingCodeMap,
    ) {
        let rows = [ReductionRaw {
            building_category_id: "house".to_string(),
            building_code_id: "tek49".to_string(),
            purpose: Purpose::SpaceHeating,
            condition: Condition::Original,
            reduction: 0.1,
        }];
        assert_error!(
            read_reductions_from_iter(rows.into_iter(), &categories, &codes),
            "Reductions cannot be supplied for condition Original (category: house, \
            building code: tek49)"
        );
    }

    #[rstest]
    fn test_read_reductions_from_iter_duplicate(
        categories: BuildingCategoryMap,
        codes: BuildingCodeMap,
    ) {
        let row = ReductionRaw {
            building_category_id: "house".to_string(),
            building_code_id: "tek49".to_string(),
            purpose: Purpose::SpaceHeating,
            condition: Condition::Renovation,
            reduction: 0.25,
        };
        assert!(
            read_reductions_from_iter([row.clone(), row].into_iter(), &categories, &codes)
                .is_err()
        );
    }

    #[test]
    fn test_assemble_trajectories_precedence() {
        let efficiencies = HashMap::from_iter([(Purpose::SpaceHeating, 0.01)]);
        let policies = IndexMap::from_iter([(
            Purpose::SpaceHeating,
            PolicyMeasureRaw {
                purpose: Purpose::SpaceHeating,
                start_year: 2025,
                end_year: 2030,
                reduction: 0.2,
            },
        )]);
        let targets = IndexMap::new();

        let map = assemble_trajectories(&efficiencies, &policies, &targets).unwrap();
        assert_eq!(
            map[&Purpose::SpaceHeating],
            IntensityTrajectory::PolicyWindow {
                start_year: 2025,
                end_year: 2030,
                reduction: 0.2,
                yearly_rate: Some(0.01),
            }
        );
    }

    #[test]
    fn test_assemble_trajectories_target_conflict() {
        let efficiencies = HashMap::from_iter([(Purpose::Lighting, 0.01)]);
        let policies = IndexMap::new();
        let targets = IndexMap::from_iter([(
            Purpose::Lighting,
            IntensityTargetRaw {
                purpose: Purpose::Lighting,
                start_year: 2024,
                end_year: 2034,
                target_kwh_m2: 8.0,
            },
        )]);

        assert_error!(
            assemble_trajectories(&efficiencies, &policies, &targets),
            "Purpose Lighting has an intensity target and another trajectory"
        );
    }

    /// Trajectory files are optional; absent files mean constant intensities
    #[test]
    fn test_read_trajectories_no_files() {
        let dir = tempdir().unwrap();
        let map = read_trajectories(dir.path()).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_read_trajectories() {
        let dir = tempdir().unwrap();
        {
            let mut file =
                File::create(dir.path().join(EFFICIENCY_IMPROVEMENTS_FILE_NAME)).unwrap();
            writeln!(file, "purpose,yearly_rate\nspace_heating,0.01").unwrap();
        }
        {
            let mut file = File::create(dir.path().join(INTENSITY_TARGETS_FILE_NAME)).unwrap();
            writeln!(
                file,
                "purpose,start_year,end_year,target_kwh_m2\nlighting,2024,2034,8"
            )
            .unwrap();
        }

        let map = read_trajectories(dir.path()).unwrap();
        assert_eq!(
            map[&Purpose::SpaceHeating],
            IntensityTrajectory::YearlyEfficiency { yearly_rate: 0.01 }
        );
        assert_eq!(
            map[&Purpose::Lighting],
            IntensityTrajectory::LinearTarget {
                start_year: 2024,
                end_year: 2034,
                target: EnergyPerArea::from(8.0),
            }
        );
    }
}
