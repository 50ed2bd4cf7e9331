//! Code for reading heating-system profiles and mix shares from CSV files.
use super::*;
use crate::building::{BuildingCodeID, BuildingCodeMap, BuildingGroupID};
use crate::heating::{
    DomesticHotWater, EnergyProduct, HeatPumpKind, HeatingLoad, HeatingShareMap, HeatingSystem,
    HeatingSystemID, HeatingSystemMap,
};
use crate::id::{IDCollection, MapIDCollection};
use float_cmp::approx_eq;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;

const HEATING_SYSTEMS_FILE_NAME: &str = "heating_systems.csv";
const HEATING_SYSTEM_SHARES_FILE_NAME: &str = "heating_system_shares.csv";

/// Tolerance for the heating-system share closure check
const SHARE_SUM_TOLERANCE: f64 = 1e-9;

/// Read an optional enum column, treating an empty field as absent
fn deserialise_optional_enum<'de, D, T>(deserialiser: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value: String = Deserialize::deserialize(deserialiser)?;
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    T::deserialize(value.into_deserializer()).map(Some)
}

/// Represents one row of the heating-system profile file
#[derive(PartialEq, Clone, Debug, Deserialize)]
struct HeatingSystemRaw {
    /// Unique identifier for the heating system
    heating_system: String,
    /// Heat-pump flavour, when the base load is a heat pump
    #[serde(default, deserialize_with = "deserialise_optional_enum")]
    heat_pump_type: Option<HeatPumpKind>,
    /// Carrier serving the base load
    base_load_energy_product: EnergyProduct,
    /// Fraction of space heating covered by the base load
    base_load_coverage: f64,
    /// Base-load conversion efficiency
    base_load_efficiency: f64,
    /// Carrier serving the peak load, if any
    #[serde(default, deserialize_with = "deserialise_optional_enum")]
    peak_load_energy_product: Option<EnergyProduct>,
    /// Fraction of space heating covered by the peak load
    peak_load_coverage: Option<f64>,
    /// Peak-load conversion efficiency
    peak_load_efficiency: Option<f64>,
    /// Carrier serving the tertiary load, if any
    #[serde(default, deserialize_with = "deserialise_optional_enum")]
    tertiary_load_energy_product: Option<EnergyProduct>,
    /// Fraction of space heating covered by the tertiary load
    tertiary_load_coverage: Option<f64>,
    /// Tertiary-load conversion efficiency
    tertiary_load_efficiency: Option<f64>,
    /// Carrier heating domestic hot water
    domestic_hot_water_energy_product: EnergyProduct,
    /// Domestic hot water conversion efficiency
    domestic_hot_water_efficiency: f64,
    /// Cooling efficiency, when the system serves cooling
    cooling_efficiency: Option<f64>,
}

/// Build an optional load slice from its three columns
fn optional_load(
    id: &HeatingSystemID,
    label: &str,
    energy_product: Option<EnergyProduct>,
    coverage: Option<f64>,
    efficiency: Option<f64>,
) -> Result<Option<HeatingLoad>> {
    let coverage = coverage.unwrap_or(0.0);
    if coverage == 0.0 {
        return Ok(None);
    }
    let energy_product = energy_product.with_context(|| {
        format!("Invalid heating system {id}: {label} load has coverage but no energy product")
    })?;
    let efficiency = efficiency.with_context(|| {
        format!("Invalid heating system {id}: {label} load has coverage but no efficiency")
    })?;

    Ok(Some(HeatingLoad {
        energy_product,
        coverage,
        efficiency,
    }))
}

impl HeatingSystemRaw {
    fn into_system(self) -> Result<HeatingSystem> {
        let id = HeatingSystemID::new(&self.heating_system);
        let system = HeatingSystem {
            base_load: HeatingLoad {
                energy_product: self.base_load_energy_product,
                coverage: self.base_load_coverage,
                efficiency: self.base_load_efficiency,
            },
            peak_load: optional_load(
                &id,
                "peak",
                self.peak_load_energy_product,
                self.peak_load_coverage,
                self.peak_load_efficiency,
            )?,
            tertiary_load: optional_load(
                &id,
                "tertiary",
                self.tertiary_load_energy_product,
                self.tertiary_load_coverage,
                self.tertiary_load_efficiency,
            )?,
            domestic_hot_water: DomesticHotWater {
                energy_product: self.domestic_hot_water_energy_product,
                efficiency: self.domestic_hot_water_efficiency,
            },
            cooling_efficiency: self.cooling_efficiency,
            heat_pump: self.heat_pump_type,
            id,
        };
        system.validate()?;

        Ok(system)
    }
}

/// Read heating-system profiles.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// A map of validated heating systems in file order, or an error.
pub fn read_heating_systems(model_dir: &Path) -> Result<HeatingSystemMap> {
    let file_path = model_dir.join(HEATING_SYSTEMS_FILE_NAME);
    let iter = read_csv::<HeatingSystemRaw>(&file_path)?;

    let mut map = HeatingSystemMap::new();
    for raw in iter {
        let system = raw.into_system().with_context(|| input_err_msg(&file_path))?;
        let id = system.id.clone();
        ensure!(
            map.insert(id.clone(), system).is_none(),
            "{}: Duplicate heating system {id}",
            input_err_msg(&file_path)
        );
    }

    Ok(map)
}

/// Represents one row of the heating-system shares file
#[derive(PartialEq, Clone, Debug, Deserialize)]
struct HeatingSystemShareRaw {
    /// The building group the share applies to
    building_group: String,
    /// The construction-period cohort
    building_code_id: String,
    /// The calendar year the share applies from
    year: u32,
    /// The heating system
    heating_system: String,
    /// The system's share of the mix
    #[serde(deserialize_with = "deserialise_proportion")]
    share: f64,
}

/// Share points per (group, code), ordered by year
type SharePoints =
    IndexMap<(BuildingGroupID, BuildingCodeID), BTreeMap<u32, IndexMap<HeatingSystemID, f64>>>;

/// Read heating-system mix shares and resolve them to every projection year.
///
/// Shares are step-interpolated: the point with the greatest year at or
/// before a projection year applies to it.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `groups` - All building groups referenced by the category table
/// * `codes` - All building codes
/// * `systems` - All heating-system profiles
/// * `years` - The projection years
pub fn read_heating_system_shares(
    model_dir: &Path,
    groups: &IndexSet<BuildingGroupID>,
    codes: &BuildingCodeMap,
    systems: &HeatingSystemMap,
    years: RangeInclusive<u32>,
) -> Result<HeatingShareMap> {
    let file_path = model_dir.join(HEATING_SYSTEM_SHARES_FILE_NAME);
    let iter = read_csv(&file_path)?;
    let points = read_shares_from_iter(iter, groups, codes, systems)
        .with_context(|| input_err_msg(&file_path))?;
    resolve_shares(points, years).with_context(|| input_err_msg(&file_path))
}

fn read_shares_from_iter<I>(
    iter: I,
    groups: &IndexSet<BuildingGroupID>,
    codes: &BuildingCodeMap,
    systems: &HeatingSystemMap,
) -> Result<SharePoints>
where
    I: Iterator<Item = HeatingSystemShareRaw>,
{
    let mut points = SharePoints::new();
    for raw in iter {
        let group_id = groups.get_id_by_str(&raw.building_group)?;
        let code_id = codes.get_key_by_str(&raw.building_code_id)?;
        let system_id = systems.get_key_by_str(&raw.heating_system)?;

        let share_map = points
            .entry((group_id.clone(), code_id.clone()))
            .or_default()
            .entry(raw.year)
            .or_default();
        ensure!(
            share_map.insert(system_id.clone(), raw.share).is_none(),
            "Duplicate heating-system share entries (group: {group_id}, building code: \
            {code_id}, year: {}, system: {system_id})",
            raw.year
        );
    }

    Ok(points)
}

fn resolve_shares(points: SharePoints, years: RangeInclusive<u32>) -> Result<HeatingShareMap> {
    let mut map = HeatingShareMap::new();
    for ((group_id, code_id), year_points) in points {
        for (year, shares) in &year_points {
            let total: f64 = shares.values().sum();
            ensure!(
                approx_eq!(f64, total, 1.0, epsilon = SHARE_SUM_TOLERANCE),
                "Heating-system shares do not sum to 1 (group: {group_id}, building code: \
                {code_id}, year: {year}, sum: {total})"
            );
        }

        let resolved: Vec<_> = years
            .clone()
            .map(|year| {
                year_points
                    .range(..=year)
                    .next_back()
                    .map(|(_, shares)| shares.clone())
                    .with_context(|| {
                        format!(
                            "No heating-system shares at or before year {year} (group: \
                            {group_id}, building code: {code_id})"
                        )
                    })
            })
            .try_collect()?;
        map.insert((group_id, code_id), resolved);
    }

    Ok(map)
}
