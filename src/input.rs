//! Common routines for handling input data.
use crate::building::building_group_ids;
use crate::id::{HasID, IDLike};
use crate::model::{Model, ModelFile};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod area;
pub mod building;
pub mod construction;
pub mod energy_need;
pub mod heating;
pub mod scurve;

/// Read a model from the specified directory.
///
/// All input tables are read, cross-validated against each other and
/// assembled into a [`Model`]. Any validation failure aborts the load.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let file = ModelFile::from_path(model_dir)?;
    let years = file.projection.start_year..=file.projection.end_year;

    let categories = building::read_building_categories(model_dir)?;
    let codes = building::read_building_codes(model_dir)?;
    let scurves = scurve::read_scurve_parameters(
        model_dir,
        &categories,
        file.projection.building_lifetime,
    )?;
    let baseline_areas = area::read_area_parameters(model_dir, &categories, &codes)?;
    let construction_demand = construction::read_construction_demand(
        model_dir,
        &categories,
        file.construction.mode,
        years.clone(),
    )?;
    let energy_needs = energy_need::read_energy_needs(model_dir, &categories, &codes)?;
    let reductions = energy_need::read_reductions(model_dir, &categories, &codes)?;
    let trajectories = energy_need::read_trajectories(model_dir)?;
    let heating_systems = heating::read_heating_systems(model_dir)?;
    let groups = building_group_ids(&categories);
    let heating_shares = heating::read_heating_system_shares(
        model_dir,
        &groups,
        &codes,
        &heating_systems,
        years,
    )?;

    Ok(Model {
        file,
        categories,
        codes,
        scurves,
        baseline_areas,
        construction_demand,
        energy_needs,
        reductions,
        trajectories,
        heating_systems,
        heating_shares,
    })
}

/// The error message for a problem reading a particular input file
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().to_string_lossy())
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path)
        .with_context(|| format!("Missing input file {}", file_path.to_string_lossy()))?;
    toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))
}

/// Read a series of type `T`s from a CSV file.
///
/// Returns an error if the file is missing, a row fails to deserialise or the
/// file contains no rows.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<impl Iterator<Item = T>> {
    let vec = read_csv_rows(file_path)?;
    ensure!(
        !vec.is_empty(),
        "Missing data in input file {}: CSV file cannot be empty",
        file_path.to_string_lossy()
    );

    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file which may be absent.
///
/// A missing file yields an empty iterator; a present file may also be empty.
pub fn read_csv_optional<T: DeserializeOwned>(
    file_path: &Path,
) -> Result<impl Iterator<Item = T>> {
    let vec = if file_path.is_file() {
        read_csv_rows(file_path)?
    } else {
        Vec::new()
    };

    Ok(vec.into_iter())
}

fn read_csv_rows<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(file_path)
        .with_context(|| format!("Missing input file {}", file_path.to_string_lossy()))?;

    let mut vec = Vec::new();
    for result in reader.deserialize() {
        let row: T = result.with_context(|| input_err_msg(file_path))?;
        vec.push(row);
    }

    Ok(vec)
}

/// Read a CSV file of items with IDs into a map, in file order.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_id_file<ID, T>(file_path: &Path) -> Result<IndexMap<ID, T>>
where
    ID: IDLike,
    T: HasID<ID> + DeserializeOwned,
{
    let mut map = IndexMap::new();
    for item in read_csv::<T>(file_path)? {
        let id = item.get_id().clone();
        ensure!(
            map.insert(id.clone(), item).is_none(),
            "{}: Duplicate ID {id}",
            input_err_msg(file_path),
        );
    }

    Ok(map)
}

/// Read an f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value is not between 0 and 1"))?;
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: String,
        value: u32,
    }

    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("data.csv");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id,value\na,1\nb,2").unwrap();
        }

        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(
            records,
            vec![
                Record {
                    id: "a".to_string(),
                    value: 1
                },
                Record {
                    id: "b".to_string(),
                    value: 2
                }
            ]
        );
    }

    #[test]
    fn test_read_csv_empty() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("data.csv");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id,value").unwrap();
        }

        assert_error!(
            read_csv::<Record>(&file_path).map(Iterator::collect::<Vec<_>>),
            format!(
                "Missing data in input file {}: CSV file cannot be empty",
                file_path.to_string_lossy()
            )
        );
    }

    #[test]
    fn test_read_csv_missing_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("nonexistent.csv");
        assert!(read_csv::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_read_csv_optional_missing_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("nonexistent.csv");
        let records: Vec<Record> = read_csv_optional(&file_path).unwrap().collect();
        assert!(records.is_empty());
    }

    #[test]
    fn test_deserialise_proportion() {
        let mut reader = csv::Reader::from_reader("value\n0.5\n".as_bytes());

        #[derive(Debug, PartialEq, Deserialize)]
        struct Proportion {
            #[serde(deserialize_with = "deserialise_proportion")]
            value: f64,
        }
        let record: Proportion = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(record, Proportion { value: 0.5 });

        // Out of range
        let mut reader = csv::Reader::from_reader("value\n1.5\n".as_bytes());
        let record: Result<Proportion, _> = reader.deserialize().next().unwrap();
        assert!(record.is_err());
    }
}
