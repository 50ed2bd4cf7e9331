//! Fixtures for tests

use crate::building::{BuildingCategory, BuildingCategoryMap, BuildingCode, BuildingCodeMap};
use crate::condition::Condition;
use crate::energy_need::{IntensityTrajectory, PolicyEfficiency, Purpose};
use crate::heating::{
    DomesticHotWater, EnergyProduct, HeatingLoad, HeatingShareMap, HeatingSystem, HeatingSystemMap,
};
use crate::model::{
    ConstructionMode, ConstructionSettings, Model, ModelFile, ProjectionSettings, SCurveMap,
    TrajectorySettings,
};
use crate::scurve::{Measure, SCurve, SCurveParameters};
use crate::units::{Area, EnergyPerArea};
use indexmap::indexmap;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn categories() -> BuildingCategoryMap {
    [
        BuildingCategory {
            id: "house".into(),
            description: "Small houses".into(),
            building_group: "residential".into(),
        },
        BuildingCategory {
            id: "office".into(),
            description: "Office buildings".into(),
            building_group: "non_residential".into(),
        },
    ]
    .into_iter()
    .map(|category| (category.id.clone(), category))
    .collect()
}

#[fixture]
pub fn codes() -> BuildingCodeMap {
    [
        BuildingCode {
            id: "tek49".into(),
            period_start_year: 1940,
            building_year: 1955,
            period_end_year: 1969,
        },
        BuildingCode {
            id: "tek17".into(),
            period_start_year: 2010,
            building_year: 2025,
            period_end_year: 2030,
        },
    ]
    .into_iter()
    .map(|code| (code.id.clone(), code))
    .collect()
}

#[fixture]
pub fn heating_system() -> HeatingSystem {
    HeatingSystem {
        id: "electric_bio_dh".into(),
        heat_pump: None,
        base_load: HeatingLoad {
            energy_product: EnergyProduct::Electricity,
            coverage: 0.6,
            efficiency: 0.98,
        },
        peak_load: Some(HeatingLoad {
            energy_product: EnergyProduct::Bio,
            coverage: 0.3,
            efficiency: 0.85,
        }),
        tertiary_load: Some(HeatingLoad {
            energy_product: EnergyProduct::DistrictHeating,
            coverage: 0.1,
            efficiency: 1.0,
        }),
        domestic_hot_water: DomesticHotWater {
            energy_product: EnergyProduct::Electricity,
            efficiency: 0.98,
        },
        cooling_efficiency: Some(2.5),
    }
}

fn scurves(categories: &BuildingCategoryMap) -> SCurveMap {
    let parameters = [
        (
            Measure::Demolition,
            SCurveParameters {
                earliest_age: 60.0,
                average_age: 90.0,
                rush_period: 40.0,
                last_age: 150.0,
                rush_share: 0.7,
                never_share: 0.05,
            },
        ),
        (
            Measure::SmallMeasure,
            SCurveParameters {
                earliest_age: 5.0,
                average_age: 20.0,
                rush_period: 20.0,
                last_age: 50.0,
                rush_share: 0.8,
                never_share: 0.1,
            },
        ),
        (
            Measure::Renovation,
            SCurveParameters {
                earliest_age: 20.0,
                average_age: 40.0,
                rush_period: 20.0,
                last_age: 80.0,
                rush_share: 0.6,
                never_share: 0.15,
            },
        ),
    ];

    let mut map = SCurveMap::new();
    for category_id in categories.keys() {
        for (measure, params) in &parameters {
            map.insert(
                (category_id.clone(), *measure),
                SCurve::new(params, 130).unwrap(),
            );
        }
    }

    map
}

#[fixture]
pub fn model(
    categories: BuildingCategoryMap,
    codes: BuildingCodeMap,
    heating_system: HeatingSystem,
) -> Model {
    let file = ModelFile {
        projection: ProjectionSettings {
            start_year: 2020,
            end_year: 2050,
            calibration_year: 2023,
            building_lifetime: 130,
        },
        construction: ConstructionSettings {
            mode: ConstructionMode::Exogenous,
            demolish_new_build: false,
        },
        trajectories: TrajectorySettings {
            policy_efficiency: PolicyEfficiency::Combined,
        },
    };
    let n_years = (file.projection.end_year - file.projection.start_year + 1) as usize;

    let scurves = scurves(&categories);

    let baseline_areas = [
        (("house".into(), "tek49".into()), Area::from(1_000_000.0)),
        (("house".into(), "tek17".into()), Area::from(50_000.0)),
        (("office".into(), "tek49".into()), Area::from(200_000.0)),
        (("office".into(), "tek17".into()), Area::from(10_000.0)),
    ]
    .into_iter()
    .collect();

    let construction_demand = indexmap! {
        "house".into() => vec![Area::from(2_000.0); n_years],
        "office".into() => vec![Area::from(500.0); n_years],
    };

    let energy_needs = [
        (("house", "tek49", Purpose::SpaceHeating), 150.0),
        (("house", "tek49", Purpose::DomesticHotWater), 30.0),
        (("house", "tek49", Purpose::Lighting), 15.0),
        (("house", "tek17", Purpose::SpaceHeating), 110.0),
        (("house", "tek17", Purpose::DomesticHotWater), 25.0),
        (("house", "tek17", Purpose::Lighting), 12.0),
        (("office", "tek49", Purpose::SpaceHeating), 130.0),
        (("office", "tek49", Purpose::Cooling), 20.0),
        (("office", "tek49", Purpose::ElectricalEquipment), 35.0),
        (("office", "tek17", Purpose::SpaceHeating), 90.0),
        (("office", "tek17", Purpose::Cooling), 15.0),
        (("office", "tek17", Purpose::ElectricalEquipment), 30.0),
    ]
    .into_iter()
    .map(|((category, code, purpose), kwh_m2)| {
        (
            (category.into(), code.into(), purpose),
            EnergyPerArea::from(kwh_m2),
        )
    })
    .collect();

    let mut reductions = crate::model::ReductionMap::new();
    for (category, small, renovation, both) in [
        ("house", 0.07, 0.25, 0.3),
        ("office", 0.05, 0.2, 0.22),
    ] {
        for code in ["tek49", "tek17"] {
            for (condition, reduction) in [
                (Condition::SmallMeasure, small),
                (Condition::Renovation, renovation),
                (Condition::RenovationAndSmallMeasure, both),
            ] {
                reductions.insert(
                    (
                        category.into(),
                        code.into(),
                        Purpose::SpaceHeating,
                        condition,
                    ),
                    reduction,
                );
            }
        }
    }

    let trajectories = indexmap! {
        Purpose::SpaceHeating => IntensityTrajectory::YearlyEfficiency { yearly_rate: 0.01 },
        Purpose::Lighting => IntensityTrajectory::LinearTarget {
            start_year: 2024,
            end_year: 2034,
            target: EnergyPerArea::from(8.0),
        },
    };

    let heat_pump = HeatingSystem {
        id: "hp_air".into(),
        heat_pump: Some(crate::heating::HeatPumpKind::AirSource),
        base_load: HeatingLoad {
            energy_product: EnergyProduct::Electricity,
            coverage: 0.8,
            efficiency: 3.0,
        },
        peak_load: Some(HeatingLoad {
            energy_product: EnergyProduct::Electricity,
            coverage: 0.2,
            efficiency: 1.0,
        }),
        tertiary_load: None,
        domestic_hot_water: DomesticHotWater {
            energy_product: EnergyProduct::Electricity,
            efficiency: 0.98,
        },
        cooling_efficiency: Some(2.5),
    };
    let heating_systems: HeatingSystemMap = [heating_system, heat_pump]
        .into_iter()
        .map(|system| (system.id.clone(), system))
        .collect();

    let mut heating_shares = HeatingShareMap::new();
    for group in ["residential", "non_residential"] {
        for code in ["tek49", "tek17"] {
            let year_shares = indexmap! {
                "electric_bio_dh".into() => 0.5,
                "hp_air".into() => 0.5,
            };
            heating_shares.insert(
                (group.into(), code.into()),
                vec![year_shares; n_years],
            );
        }
    }

    Model {
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
    }
}
