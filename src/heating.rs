//! Heating-system portfolios and the allocation of energy needs to energy
//! carriers.
//!
//! A heating system decomposes space-heating demand into base, peak and
//! tertiary load slices, each served by an energy product at an efficiency,
//! plus a domestic hot water load and an optional cooling efficiency. The
//! allocator weighs systems by their projected mix shares and sums delivered
//! energy per carrier. Heat pumps are tracked separately so that heat
//! delivered by the pump and electricity consumed by it can be reported as
//! derived views of the same allocation.
use crate::building::{BuildingCategoryID, BuildingCodeID, BuildingGroupID};
use crate::energy_need::{DemandMap, Purpose};
use crate::id::define_id_type;
use crate::model::Model;
use crate::units::Energy;
use anyhow::{Context, Result, ensure};
use float_cmp::approx_eq;
use indexmap::IndexMap;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::iter;

/// Tolerance for the load-coverage closure check
const COVERAGE_TOLERANCE: f64 = 1e-6;

define_id_type! {HeatingSystemID}

/// An energy carrier delivered to buildings
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
pub enum EnergyProduct {
    /// Electricity
    #[string = "electricity"]
    Electricity,
    /// District heating
    #[string = "district_heating"]
    DistrictHeating,
    /// Wood and other bioenergy
    #[string = "bio"]
    Bio,
    /// Fuel oil
    #[string = "oil"]
    Oil,
    /// Fossil gas
    #[string = "gas"]
    Gas,
}

/// The heat-pump flavours which are reported separately
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
pub enum HeatPumpKind {
    /// Air-sourced heat pump
    #[string = "air_source"]
    AirSource,
    /// Heat pump assisted by district heating
    #[string = "district_heat_assisted"]
    DistrictHeatAssisted,
}

/// One load slice of a heating system
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct HeatingLoad {
    /// The energy carrier serving this slice
    pub energy_product: EnergyProduct,
    /// The fraction of space-heating demand covered by this slice
    pub coverage: f64,
    /// Delivered energy per unit of heat (e.g. a heat-pump COP)
    pub efficiency: f64,
}

/// The domestic hot water component of a heating system
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct DomesticHotWater {
    /// The energy carrier heating the water
    pub energy_product: EnergyProduct,
    /// Conversion efficiency
    pub efficiency: f64,
}

/// A heating system within the projection
#[derive(PartialEq, Clone, Debug)]
pub struct HeatingSystem {
    /// Unique identifier for the heating system (e.g. "electric_boiler")
    pub id: HeatingSystemID,
    /// Set when the base load of the system is a heat pump
    pub heat_pump: Option<HeatPumpKind>,
    /// The base load slice
    pub base_load: HeatingLoad,
    /// The peak load slice, if any
    pub peak_load: Option<HeatingLoad>,
    /// The tertiary load slice, if any
    pub tertiary_load: Option<HeatingLoad>,
    /// The domestic hot water component
    pub domestic_hot_water: DomesticHotWater,
    /// Cooling efficiency; systems without one serve cooling as direct electricity
    pub cooling_efficiency: Option<f64>,
}

impl HeatingSystem {
    /// Iterate over the space-heating load slices that are present
    pub fn heating_loads(&self) -> impl Iterator<Item = &HeatingLoad> {
        iter::once(&self.base_load)
            .chain(self.peak_load.as_ref())
            .chain(self.tertiary_load.as_ref())
    }

    /// Check coverage closure and efficiency signs for this system
    pub fn validate(&self) -> Result<()> {
        let coverage: f64 = self.heating_loads().map(|load| load.coverage).sum();
        ensure!(
            approx_eq!(f64, coverage, 1.0, epsilon = COVERAGE_TOLERANCE),
            "Invalid heating system {}: load coverage fractions sum to {coverage}, not 1",
            self.id
        );
        for load in self.heating_loads() {
            ensure!(
                (0.0..=1.0).contains(&load.coverage),
                "Invalid heating system {}: load coverage must be between 0 and 1",
                self.id
            );
            ensure!(
                load.efficiency > 0.0,
                "Invalid heating system {}: load efficiency must be positive",
                self.id
            );
        }
        ensure!(
            self.domestic_hot_water.efficiency > 0.0,
            "Invalid heating system {}: domestic hot water efficiency must be positive",
            self.id
        );
        if let Some(efficiency) = self.cooling_efficiency {
            ensure!(
                efficiency > 0.0,
                "Invalid heating system {}: cooling efficiency must be positive",
                self.id
            );
        }

        Ok(())
    }
}

/// A map of [`HeatingSystem`]s, keyed by heating system ID
pub type HeatingSystemMap = IndexMap<HeatingSystemID, HeatingSystem>;

/// Heating-system mix shares for each projection year (indexed by offset from
/// the projection start year), grouped by building group and building code
pub type HeatingShareMap =
    IndexMap<(BuildingGroupID, BuildingCodeID), Vec<IndexMap<HeatingSystemID, f64>>>;

/// Delivered energy by carrier for one system serving the full demand
#[derive(PartialEq, Clone, Debug, Default)]
pub struct SystemDispatch {
    /// Delivered energy per carrier
    pub by_product: IndexMap<EnergyProduct, Energy>,
    /// Heat delivered by the heat pump (zero for other systems)
    pub heat_pump_production: Energy,
    /// Electricity consumed by the heat pump (zero for other systems)
    pub heat_pump_electricity: Energy,
}

/// Decompose heating, hot water and cooling demand into delivered energy by
/// carrier for a single heating system.
///
/// Space heating is split over the load slices by coverage and divided by the
/// slice efficiencies; hot water is divided by the DHW efficiency; cooling is
/// attributed to electricity. For heat-pump systems the base load is the pump
/// load, and its heat and electricity are additionally reported separately.
///
/// # Arguments
///
/// * `system` - The heating system
/// * `heating` - Space-heating demand
/// * `domestic_hot_water` - Domestic hot water demand
/// * `cooling` - Cooling demand
pub fn dispatch_system(
    system: &HeatingSystem,
    heating: Energy,
    domestic_hot_water: Energy,
    cooling: Energy,
) -> SystemDispatch {
    let mut dispatch = SystemDispatch::default();
    for load in system.heating_loads() {
        let delivered = heating * load.coverage / load.efficiency;
        *dispatch
            .by_product
            .entry(load.energy_product)
            .or_default() += delivered;
    }
    if system.heat_pump.is_some() {
        let heat = heating * system.base_load.coverage;
        dispatch.heat_pump_production += heat;
        dispatch.heat_pump_electricity += heat / system.base_load.efficiency;
    }

    *dispatch
        .by_product
        .entry(system.domestic_hot_water.energy_product)
        .or_default() += domestic_hot_water / system.domestic_hot_water.efficiency;

    *dispatch
        .by_product
        .entry(EnergyProduct::Electricity)
        .or_default() += cooling / system.cooling_efficiency.unwrap_or(1.0);

    dispatch
}

/// One row of the energy-use output table
#[derive(PartialEq, Clone, Debug, serde::Serialize)]
pub struct EnergyUseRow {
    /// The building group
    pub building_group: BuildingGroupID,
    /// The building category
    pub building_category: BuildingCategoryID,
    /// The construction-period cohort
    pub building_code: BuildingCodeID,
    /// The calendar year
    pub year: u32,
    /// The energy carrier
    pub energy_product: EnergyProduct,
    /// Delivered energy
    pub kwh: Energy,
}

/// One row of the heat-pump output tables
#[derive(PartialEq, Clone, Debug, serde::Serialize)]
pub struct HeatPumpRow {
    /// The building group
    pub building_group: BuildingGroupID,
    /// The heat-pump flavour
    pub heat_pump_type: HeatPumpKind,
    /// The calendar year
    pub year: u32,
    /// Energy (heat produced, or electricity consumed)
    pub kwh: Energy,
}

/// The output of the heating-system allocator
#[derive(PartialEq, Clone, Debug)]
pub struct EnergyUseResults {
    /// Delivered energy per building group, category, cohort, year and carrier
    pub rows: Vec<EnergyUseRow>,
    /// Heat delivered by heat pumps per building group, flavour and year
    pub heat_pump_production: Vec<HeatPumpRow>,
    /// Electricity consumed by heat pumps per building group, flavour and year
    pub heat_pump_electricity: Vec<HeatPumpRow>,
}

/// Allocate composed energy needs to energy carriers using the projected
/// heating-system mix.
///
/// Space heating, hot water and cooling pass through the heating systems;
/// lighting, electrical equipment and fans/pumps are attributed to
/// electricity directly. Per-system dispatches are weighted by the system's
/// mix share and summed.
///
/// # Arguments
///
/// * `model` - The projection model
/// * `demand` - Energy needs per category, cohort and purpose
///
/// # Returns
///
/// [`EnergyUseResults`] or an error if a (group, cohort) pair with demand has
/// no heating-system shares.
pub fn allocate_energy_use(model: &Model, demand: &DemandMap) -> Result<EnergyUseResults> {
    let mut by_carrier: IndexMap<
        (
            BuildingGroupID,
            BuildingCategoryID,
            BuildingCodeID,
            u32,
            EnergyProduct,
        ),
        Energy,
    > = IndexMap::new();
    let mut production: IndexMap<(BuildingGroupID, HeatPumpKind, u32), Energy> = IndexMap::new();
    let mut electricity: IndexMap<(BuildingGroupID, HeatPumpKind, u32), Energy> = IndexMap::new();

    for (category_id, category) in &model.categories {
        let group_id = &category.building_group;
        for code_id in model.codes.keys() {
            let series = |purpose| {
                demand.get(&(category_id.clone(), code_id.clone(), purpose))
            };

            // Purposes that bypass the heating-system mix
            for purpose in [
                Purpose::Lighting,
                Purpose::ElectricalEquipment,
                Purpose::FansAndPumps,
            ] {
                if let Some(totals) = series(purpose) {
                    for (year, total) in model.years().zip(totals) {
                        *by_carrier
                            .entry((
                                group_id.clone(),
                                category_id.clone(),
                                code_id.clone(),
                                year,
                                EnergyProduct::Electricity,
                            ))
                            .or_default() += *total;
                    }
                }
            }

            let heating = series(Purpose::SpaceHeating);
            let hot_water = series(Purpose::DomesticHotWater);
            let cooling = series(Purpose::Cooling);
            if heating.is_none() && hot_water.is_none() && cooling.is_none() {
                continue;
            }

            let shares = model
                .heating_shares
                .get(&(group_id.clone(), code_id.clone()))
                .with_context(|| {
                    format!(
                        "No heating-system shares provided for building group {group_id}, \
                        building code {code_id}"
                    )
                })?;

            for (offset, year) in model.years().enumerate() {
                let at = |series: Option<&Vec<Energy>>| {
                    series.map(|totals| totals[offset]).unwrap_or_default()
                };
                let heating = at(heating);
                let hot_water = at(hot_water);
                let cooling = at(cooling);

                for (system_id, share) in &shares[offset] {
                    let system = &model.heating_systems[system_id];
                    let dispatch = dispatch_system(system, heating, hot_water, cooling);
                    for (product, energy) in &dispatch.by_product {
                        *by_carrier
                            .entry((
                                group_id.clone(),
                                category_id.clone(),
                                code_id.clone(),
                                year,
                                *product,
                            ))
                            .or_default() += *energy * *share;
                    }
                    if let Some(kind) = system.heat_pump {
                        *production
                            .entry((group_id.clone(), kind, year))
                            .or_default() += dispatch.heat_pump_production * *share;
                        *electricity
                            .entry((group_id.clone(), kind, year))
                            .or_default() += dispatch.heat_pump_electricity * *share;
                    }
                }
            }
        }
    }

    let rows = by_carrier
        .into_iter()
        .map(
            |((building_group, building_category, building_code, year, energy_product), kwh)| {
                EnergyUseRow {
                    building_group,
                    building_category,
                    building_code,
                    year,
                    energy_product,
                    kwh,
                }
            },
        )
        .collect();
    let heat_pump_rows = |map: IndexMap<(BuildingGroupID, HeatPumpKind, u32), Energy>| -> Vec<HeatPumpRow> {
        map.into_iter()
            .map(|((building_group, heat_pump_type, year), kwh)| HeatPumpRow {
                building_group,
                heat_pump_type,
                year,
                kwh,
            })
            .collect()
    };

    Ok(EnergyUseResults {
        rows,
        heat_pump_production: heat_pump_rows(production),
        heat_pump_electricity: heat_pump_rows(electricity),
    })
}
