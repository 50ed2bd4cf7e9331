//! The module responsible for writing output data to disk.
use crate::area::AreaForecastMap;
use crate::building::{BuildingCategoryID, BuildingCodeID};
use crate::condition::Condition;
use crate::energy_need::EnergyNeedResults;
use crate::heating::EnergyUseResults;
use crate::model::Model;
use crate::units::Area;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "buildstock_results";

/// The output file name for the floor-area forecast
const AREA_FORECAST_FILE_NAME: &str = "area_forecast.csv";

/// The output file name for energy needs per purpose and condition
const ENERGY_PURPOSE_FILE_NAME: &str = "energy_purpose.csv";

/// The output file name for delivered energy per carrier
const ENERGY_USE_FILE_NAME: &str = "energy_use.csv";

/// The output file name for heat delivered by heat pumps
const HEAT_PUMP_PRODUCTION_FILE_NAME: &str = "heat_pump_production.csv";

/// The output file name for electricity consumed by heat pumps
const HEAT_PUMP_ELECTRICITY_FILE_NAME: &str = "heat_pump_electricity.csv";

/// Get the model name from the specified directory path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model specified at `model_dir`.
///
/// An existing directory is only replaced when `overwrite` is set.
pub fn create_output_directory(output_dir: &Path, overwrite: bool) -> Result<()> {
    if output_dir.is_dir() {
        ensure!(
            overwrite,
            "Output directory {} already exists (enable overwrite to replace it)",
            output_dir.display()
        );
        fs::remove_dir_all(output_dir)
            .with_context(|| format!("Could not remove {}", output_dir.display()))?;
    }

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(())
}

/// Represents a row in the area forecast CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct AreaRow {
    building_category: BuildingCategoryID,
    building_code: BuildingCodeID,
    condition: Condition,
    year: u32,
    area_m2: Area,
}

/// Write all projection results to CSV files in the output directory.
///
/// # Arguments
///
/// * `output_dir` - The output directory
/// * `model` - The projection model
/// * `areas` - The floor-area forecast
/// * `needs` - The composed energy needs
/// * `energy_use` - The allocated energy use
pub fn write_results(
    output_dir: &Path,
    model: &Model,
    areas: &AreaForecastMap,
    needs: &EnergyNeedResults,
    energy_use: &EnergyUseResults,
) -> Result<()> {
    write_area_forecast_to_csv(output_dir, model, areas)?;
    write_rows_to_csv(&output_dir.join(ENERGY_PURPOSE_FILE_NAME), &needs.rows)?;
    write_rows_to_csv(&output_dir.join(ENERGY_USE_FILE_NAME), &energy_use.rows)?;
    write_rows_to_csv(
        &output_dir.join(HEAT_PUMP_PRODUCTION_FILE_NAME),
        &energy_use.heat_pump_production,
    )?;
    write_rows_to_csv(
        &output_dir.join(HEAT_PUMP_ELECTRICITY_FILE_NAME),
        &energy_use.heat_pump_electricity,
    )?;

    Ok(())
}

/// Write the floor-area forecast in long form, one row per condition and year
fn write_area_forecast_to_csv(
    output_dir: &Path,
    model: &Model,
    areas: &AreaForecastMap,
) -> Result<()> {
    let file_path = output_dir.join(AREA_FORECAST_FILE_NAME);
    let mut writer = csv::Writer::from_path(&file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for ((category_id, code_id), series) in areas {
        for condition in Condition::ALL {
            for (year, conditioned) in model.years().zip(&series.conditioned) {
                writer.serialize(AreaRow {
                    building_category: category_id.clone(),
                    building_code: code_id.clone(),
                    condition,
                    year,
                    area_m2: conditioned.get(condition),
                })?;
            }
        }
    }
    writer.flush()?;

    Ok(())
}

fn write_rows_to_csv<T: Serialize>(file_path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::evolve_area;
    use crate::condition::compute_condition_shares;
    use crate::fixture::model;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_get_output_dir() {
        let dir = tempdir().unwrap();
        let model_dir = dir.path().join("my_model");
        fs::create_dir(&model_dir).unwrap();
        let output_dir = get_output_dir(&model_dir).unwrap();
        assert_eq!(
            output_dir,
            PathBuf::from(OUTPUT_DIRECTORY_ROOT).join("my_model")
        );
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");
        create_output_directory(&output_dir, false).unwrap();
        assert!(output_dir.is_dir());

        // A second run without overwrite fails
        assert!(create_output_directory(&output_dir, false).is_err());
        create_output_directory(&output_dir, true).unwrap();
    }

    #[rstest]
    fn test_write_area_forecast_to_csv(model: crate::model::Model) {
        let shares = compute_condition_shares(&model).unwrap();
        let areas = evolve_area(&model, &shares).unwrap();

        let dir = tempdir().unwrap();
        write_area_forecast_to_csv(dir.path(), &model, &areas).unwrap();

        let contents = fs::read_to_string(dir.path().join(AREA_FORECAST_FILE_NAME)).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "building_category,building_code,condition,year,area_m2"
        );
        let n_rows = lines.count();
        let n_years = model.years().count();
        assert_eq!(n_rows, areas.len() * Condition::ALL.len() * n_years);
    }
}
