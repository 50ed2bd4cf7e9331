//! Code for reading the yearly construction demand.
//!
//! The demand is either read directly from an exogenous per-category table or
//! derived from population, household size and new-building parameters,
//! depending on the configured construction mode.
use super::*;
use crate::building::BuildingCategoryMap;
use crate::id::MapIDCollection;
use crate::model::{ConstructionDemandMap, ConstructionMode};
use crate::units::Area;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use std::path::Path;

const CONSTRUCTION_DEMAND_FILE_NAME: &str = "construction_demand.csv";
const POPULATION_FILE_NAME: &str = "population.csv";
const NEW_BUILDING_PARAMETERS_FILE_NAME: &str = "new_building_parameters.csv";

/// Represents one row of the exogenous construction demand file
#[derive(PartialEq, Clone, Debug, Deserialize)]
struct ConstructionDemandRaw {
    /// The building category being constructed
    building_category_id: String,
    /// The calendar year
    year: u32,
    /// New floor area in m²
    area: f64,
}

/// Represents one row of the population file
#[derive(PartialEq, Clone, Debug, Deserialize)]
struct PopulationRaw {
    /// The calendar year
    year: u32,
    /// Projected population
    population: f64,
    /// Average persons per household
    household_size: f64,
}

/// Represents one row of the new-building parameters file
#[derive(PartialEq, Clone, Debug, Deserialize)]
struct NewBuildingParametersRaw {
    /// The building category
    building_category_id: String,
    /// The category's share of new households
    #[serde(deserialize_with = "deserialise_proportion")]
    category_share: f64,
    /// Average floor area per new dwelling in m²
    average_area: f64,
}

/// Read the yearly construction demand per building category.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `categories` - All building categories
/// * `mode` - The configured construction-demand source
/// * `years` - The projection years
///
/// # Returns
///
/// New-construction areas per category, indexed by year offset. Categories
/// with no construction are absent.
pub fn read_construction_demand(
    model_dir: &Path,
    categories: &BuildingCategoryMap,
    mode: ConstructionMode,
    years: RangeInclusive<u32>,
) -> Result<ConstructionDemandMap> {
    match mode {
        ConstructionMode::Exogenous => {
            let file_path = model_dir.join(CONSTRUCTION_DEMAND_FILE_NAME);
            let iter = read_csv(&file_path)?;
            read_exogenous_demand_from_iter(iter, categories, years)
                .with_context(|| input_err_msg(&file_path))
        }
        ConstructionMode::Derived => read_derived_demand(model_dir, categories, years),
    }
}

fn read_exogenous_demand_from_iter<I>(
    iter: I,
    categories: &BuildingCategoryMap,
    years: RangeInclusive<u32>,
) -> Result<ConstructionDemandMap>
where
    I: Iterator<Item = ConstructionDemandRaw>,
{
    let n_years = years.clone().count();
    let mut map = ConstructionDemandMap::new();
    let mut seen = HashSet::new();
    for raw in iter {
        let category_id = categories.get_key_by_str(&raw.building_category_id)?;
        ensure!(
            years.contains(&raw.year),
            "Year {} is outside the projection period",
            raw.year
        );
        ensure!(
            raw.area.is_finite() && raw.area >= 0.0,
            "Construction demand must be a non-negative number (category: {category_id}, \
            year: {})",
            raw.year
        );
        ensure!(
            seen.insert((category_id.clone(), raw.year)),
            "Duplicate construction demand entries (category: {category_id}, year: {})",
            raw.year
        );

        let offset = (raw.year - years.start()) as usize;
        let demand = map
            .entry(category_id)
            .or_insert_with(|| vec![Area::default(); n_years]);
        demand[offset] = Area::from(raw.area);
    }

    Ok(map)
}

/// Derive construction demand from population growth.
///
/// New households in a year are the increase in population divided by
/// household size (never negative); each category receives its share of them,
/// converted to floor area with the average dwelling area.
fn read_derived_demand(
    model_dir: &Path,
    categories: &BuildingCategoryMap,
    years: RangeInclusive<u32>,
) -> Result<ConstructionDemandMap> {
    let population_path = model_dir.join(POPULATION_FILE_NAME);
    let households = read_households_from_iter(read_csv(&population_path)?, years.clone())
        .with_context(|| input_err_msg(&population_path))?;

    let parameters_path = model_dir.join(NEW_BUILDING_PARAMETERS_FILE_NAME);
    let parameters = read_new_building_parameters_from_iter(read_csv(&parameters_path)?, categories)
        .with_context(|| input_err_msg(&parameters_path))?;

    let mut map = ConstructionDemandMap::new();
    for (category_id, raw) in parameters {
        let mut demand = vec![Area::default(); households.len()];
        for offset in 1..households.len() {
            let new_households = (households[offset] - households[offset - 1]).max(0.0);
            demand[offset] =
                Area::from(new_households * raw.category_share * raw.average_area);
        }
        map.insert(category_id, demand);
    }

    Ok(map)
}

fn read_households_from_iter<I>(iter: I, years: RangeInclusive<u32>) -> Result<Vec<f64>>
where
    I: Iterator<Item = PopulationRaw>,
{
    let mut by_year = HashMap::new();
    for raw in iter {
        ensure!(
            raw.population.is_finite() && raw.population >= 0.0,
            "Population must be a non-negative number (year: {})",
            raw.year
        );
        ensure!(
            raw.household_size.is_finite() && raw.household_size > 0.0,
            "Household size must be positive (year: {})",
            raw.year
        );
        ensure!(
            by_year
                .insert(raw.year, raw.population / raw.household_size)
                .is_none(),
            "Duplicate population entries (year: {})",
            raw.year
        );
    }

    years
        .map(|year| {
            by_year
                .get(&year)
                .copied()
                .with_context(|| format!("Missing population data for year {year}"))
        })
        .collect()
}

fn read_new_building_parameters_from_iter<I>(
    iter: I,
    categories: &BuildingCategoryMap,
) -> Result<IndexMap<crate::building::BuildingCategoryID, NewBuildingParametersRaw>>
where
    I: Iterator<Item = NewBuildingParametersRaw>,
{
    let mut map = IndexMap::new();
    for raw in iter {
        let category_id = categories.get_key_by_str(&raw.building_category_id)?;
        ensure!(
            raw.average_area.is_finite() && raw.average_area >= 0.0,
            "Average area must be a non-negative number (category: {category_id})"
        );
        ensure!(
            map.insert(category_id.clone(), raw).is_none(),
            "Duplicate new-building parameters (category: {category_id})"
        );
    }

    Ok(map)
}
