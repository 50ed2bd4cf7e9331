//! The projection model: configuration plus all input tables, read once and
//! shared immutably by every pipeline stage.
use crate::building::{
    BuildingCategoryID, BuildingCategoryMap, BuildingCode, BuildingCodeID, BuildingCodeMap,
    new_build_code,
};
use crate::condition::Condition;
use crate::energy_need::{IntensityTrajectory, PolicyEfficiency, Purpose};
use crate::heating::{HeatingShareMap, HeatingSystemMap};
use crate::input::{input_err_msg, read_toml};
use crate::scurve::{Measure, SCurve};
use crate::units::{Area, EnergyPerArea};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::path::Path;

/// The model configuration file name
pub const MODEL_FILE_NAME: &str = "model.toml";

/// The default building lifetime in years
const DEFAULT_BUILDING_LIFETIME: u32 = 130;

fn default_building_lifetime() -> u32 {
    DEFAULT_BUILDING_LIFETIME
}

/// The source of the yearly construction demand
#[derive(PartialEq, Eq, Clone, Copy, Debug, DeserializeLabeledStringEnum)]
pub enum ConstructionMode {
    /// An exogenous per-category demand table
    #[string = "exogenous"]
    Exogenous,
    /// Derived from population, household size and new-building parameters
    #[string = "derived"]
    Derived,
}

/// The "projection" section of the model file
#[derive(PartialEq, Clone, Debug, Deserialize)]
pub struct ProjectionSettings {
    /// First year of the projection period
    pub start_year: u32,
    /// Last year of the projection period (inclusive)
    pub end_year: u32,
    /// The year input intensities are calibrated to
    pub calibration_year: u32,
    /// Building lifetime in years
    #[serde(default = "default_building_lifetime")]
    pub building_lifetime: u32,
}

/// The "construction" section of the model file
#[derive(PartialEq, Clone, Debug, Deserialize)]
pub struct ConstructionSettings {
    /// Where the yearly construction demand comes from
    pub mode: ConstructionMode,
    /// Whether the demolition curve also depletes the new-build cohort
    #[serde(default)]
    pub demolish_new_build: bool,
}

/// The "trajectories" section of the model file
#[derive(PartialEq, Clone, Debug, Deserialize)]
pub struct TrajectorySettings {
    /// How yearly efficiency improvements combine with policy windows
    pub policy_efficiency: PolicyEfficiency,
}

/// Represents the contents of the entire model file.
#[derive(PartialEq, Clone, Debug, Deserialize)]
pub struct ModelFile {
    /// The projection period and calibration year
    pub projection: ProjectionSettings,
    /// Construction-demand configuration
    pub construction: ConstructionSettings,
    /// Intensity-trajectory configuration
    pub trajectories: TrajectorySettings,
}

impl ModelFile {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelFile> {
        let file_path = model_dir.as_ref().join(MODEL_FILE_NAME);
        let file: ModelFile = read_toml(&file_path)?;
        file.validate().with_context(|| input_err_msg(&file_path))?;

        Ok(file)
    }

    fn validate(&self) -> Result<()> {
        let projection = &self.projection;
        ensure!(
            projection.start_year < projection.end_year,
            "start_year must be before end_year"
        );
        ensure!(
            projection.building_lifetime > 0,
            "building_lifetime must be positive"
        );

        Ok(())
    }
}

/// S-curves grouped by building category and measure
pub type SCurveMap = HashMap<(BuildingCategoryID, Measure), SCurve>;
/// Baseline floor areas grouped by building category and building code
pub type BaselineAreaMap = HashMap<(BuildingCategoryID, BuildingCodeID), Area>;
/// Yearly construction demand per building category (indexed by year offset)
pub type ConstructionDemandMap = IndexMap<BuildingCategoryID, Vec<Area>>;
/// Energy-need intensities in the original condition
pub type EnergyNeedMap = HashMap<(BuildingCategoryID, BuildingCodeID, Purpose), EnergyPerArea>;
/// Energy-need reductions per condition
pub type ReductionMap = HashMap<(BuildingCategoryID, BuildingCodeID, Purpose, Condition), f64>;

/// Model definition
#[derive(PartialEq, Clone, Debug)]
pub struct Model {
    /// The model configuration
    pub file: ModelFile,
    /// Building categories
    pub categories: BuildingCategoryMap,
    /// Construction-period cohorts
    pub codes: BuildingCodeMap,
    /// Measure-adoption curves per category and measure
    pub scurves: SCurveMap,
    /// Start-year floor areas
    pub baseline_areas: BaselineAreaMap,
    /// Yearly new-construction demand
    pub construction_demand: ConstructionDemandMap,
    /// kWh/m² intensities in the original condition
    pub energy_needs: EnergyNeedMap,
    /// Per-condition intensity reductions
    pub reductions: ReductionMap,
    /// Intensity trajectories per purpose
    pub trajectories: IndexMap<Purpose, IntensityTrajectory>,
    /// Heating-system profiles
    pub heating_systems: HeatingSystemMap,
    /// Heating-system mix shares per group, cohort and year
    pub heating_shares: HeatingShareMap,
}

impl Model {
    /// The projection years
    pub fn years(&self) -> RangeInclusive<u32> {
        self.file.projection.start_year..=self.file.projection.end_year
    }

    /// The S-curve for the given category and measure.
    ///
    /// Completeness is checked when the model is loaded, so this cannot fail.
    pub fn scurve(&self, category_id: &BuildingCategoryID, measure: Measure) -> &SCurve {
        self.scurves
            .get(&(category_id.clone(), measure))
            .expect("S-curve completeness is validated on load")
    }

    /// The baseline area for a category and cohort (zero when not listed)
    pub fn baseline_area(
        &self,
        category_id: &BuildingCategoryID,
        code_id: &BuildingCodeID,
    ) -> Area {
        self.baseline_areas
            .get(&(category_id.clone(), code_id.clone()))
            .copied()
            .unwrap_or_default()
    }

    /// The cohort which absorbs new construction
    pub fn new_build_code(&self) -> &BuildingCode {
        new_build_code(&self.codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_model_file(contents: &str) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let mut file = File::create(dir.path().join(MODEL_FILE_NAME)).unwrap();
        writeln!(file, "{contents}").unwrap();
        dir
    }

    #[test]
    fn test_model_file_from_path() {
        let dir = write_model_file(
            "[projection]\n\
            start_year = 2020\n\
            end_year = 2050\n\
            calibration_year = 2023\n\
            [construction]\n\
            mode = \"exogenous\"\n\
            [trajectories]\n\
            policy_efficiency = \"combined\"",
        );

        let file = ModelFile::from_path(dir.path()).unwrap();
        assert_eq!(file.projection.start_year, 2020);
        assert_eq!(file.projection.end_year, 2050);
        assert_eq!(file.projection.building_lifetime, 130);
        assert_eq!(file.construction.mode, ConstructionMode::Exogenous);
        assert!(!file.construction.demolish_new_build);
    }

    #[test]
    fn test_model_file_from_path_bad_years() {
        let dir = write_model_file(
            "[projection]\n\
            start_year = 2050\n\
            end_year = 2020\n\
            calibration_year = 2023\n\
            [construction]\n\
            mode = \"exogenous\"\n\
            [trajectories]\n\
            policy_efficiency = \"combined\"",
        );

        assert!(ModelFile::from_path(dir.path()).is_err());
    }

    #[test]
    fn test_model_file_from_path_missing_mode() {
        let dir = write_model_file(
            "[projection]\n\
            start_year = 2020\n\
            end_year = 2050\n\
            calibration_year = 2023\n\
            [trajectories]\n\
            policy_efficiency = \"combined\"",
        );

        assert!(ModelFile::from_path(dir.path()).is_err());
    }
}
