//! Integration tests for the `run` command.
use buildstock::commands::handle_run_command;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

/// Write a complete example model to the given directory
fn create_model(model_dir: &Path) {
    let write = |file_name: &str, contents: &str| {
        let mut file = File::create(model_dir.join(file_name)).unwrap();
        writeln!(file, "{contents}").unwrap();
    };

    write(
        "model.toml",
        "[projection]\n\
        start_year = 2020\n\
        end_year = 2030\n\
        calibration_year = 2023\n\
        \n\
        [construction]\n\
        mode = \"exogenous\"\n\
        \n\
        [trajectories]\n\
        policy_efficiency = \"combined\"",
    );

    write(
        "building_categories.csv",
        "id,description,building_group\n\
        house,Small houses,residential\n\
        office,Office buildings,non_residential",
    );

    write(
        "building_codes.csv",
        "id,period_start_year,building_year,period_end_year\n\
        tek49,1940,1955,1969\n\
        tek17,2010,2020,2030",
    );

    let mut scurves = String::from(
        "building_category_id,measure,earliest_age,average_age,rush_period,last_age,rush_share,never_share\n",
    );
    for category in ["house", "office"] {
        scurves.push_str(&format!(
            "{category},demolition,60,90,40,150,0.7,0.05\n\
            {category},small_measure,5,20,20,50,0.8,0.1\n\
            {category},renovation,20,40,20,80,0.6,0.15\n"
        ));
    }
    write("scurve_parameters.csv", scurves.trim_end());

    write(
        "area_parameters.csv",
        "building_category_id,building_code_id,area\n\
        house,tek49,1000000\n\
        house,tek17,50000\n\
        office,tek49,200000\n\
        office,tek17,10000",
    );

    write(
        "construction_demand.csv",
        "building_category_id,year,area\n\
        house,2021,2000\n\
        house,2022,2000\n\
        office,2021,500",
    );

    write(
        "energy_need.csv",
        "building_category_id,building_code_id,purpose,kwh_m2\n\
        house,tek49,space_heating,150\n\
        house,tek49,domestic_hot_water,30\n\
        house,tek49,lighting,15\n\
        house,tek17,space_heating,110\n\
        house,tek17,domestic_hot_water,25\n\
        office,tek49,space_heating,130\n\
        office,tek49,cooling,20\n\
        office,tek49,electrical_equipment,35\n\
        office,tek17,space_heating,90",
    );

    write(
        "energy_need_reductions.csv",
        "building_category_id,building_code_id,purpose,condition,reduction\n\
        house,tek49,space_heating,small_measure,0.07\n\
        house,tek49,space_heating,renovation,0.25\n\
        house,tek49,space_heating,renovation_and_small_measure,0.3\n\
        office,tek49,space_heating,small_measure,0.05\n\
        office,tek49,space_heating,renovation,0.2\n\
        office,tek49,space_heating,renovation_and_small_measure,0.22",
    );

    write(
        "efficiency_improvements.csv",
        "purpose,yearly_rate\nspace_heating,0.01",
    );

    write(
        "heating_systems.csv",
        "heating_system,heat_pump_type,\
        base_load_energy_product,base_load_coverage,base_load_efficiency,\
        peak_load_energy_product,peak_load_coverage,peak_load_efficiency,\
        tertiary_load_energy_product,tertiary_load_coverage,tertiary_load_efficiency,\
        domestic_hot_water_energy_product,domestic_hot_water_efficiency,cooling_efficiency\n\
        electric,,electricity,0.6,0.98,bio,0.3,0.85,district_heating,0.1,1.0,electricity,0.98,2.5\n\
        hp_air,air_source,electricity,0.8,3.0,electricity,0.2,1.0,,,,electricity,0.98,2.5",
    );

    let mut shares = String::from("building_group,building_code_id,year,heating_system,share\n");
    for group in ["residential", "non_residential"] {
        for code in ["tek49", "tek17"] {
            shares.push_str(&format!(
                "{group},{code},2020,electric,0.6\n{group},{code},2020,hp_air,0.4\n"
            ));
        }
    }
    write("heating_system_shares.csv", shares.trim_end());
}

/// Check that every data row of a CSV file has a non-negative number in its
/// last column
fn assert_last_column_non_negative(file_path: &Path) {
    let contents = fs::read_to_string(file_path).unwrap();
    let mut lines = contents.lines();
    lines.next().unwrap();
    let mut n_rows = 0;
    for line in lines {
        let value: f64 = line.rsplit(',').next().unwrap().parse().unwrap();
        assert!(value >= 0.0, "negative value in {}: {line}", file_path.display());
        n_rows += 1;
    }
    assert!(n_rows > 0, "no data rows in {}", file_path.display());
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe {
        std::env::set_var("BUILDSTOCK_LOG_LEVEL", "off");
    }

    let model_dir = tempdir().unwrap();
    create_model(model_dir.path());

    {
        // Save results to non-existent directory to check that directory creation works
        let output_tempdir = tempdir().unwrap();
        let output_dir = output_tempdir.path().join("results");
        handle_run_command(model_dir.path(), Some(output_dir.as_path()), false).unwrap();

        for file_name in [
            "area_forecast.csv",
            "energy_purpose.csv",
            "energy_use.csv",
            "heat_pump_production.csv",
            "heat_pump_electricity.csv",
        ] {
            assert_last_column_non_negative(&output_dir.join(file_name));
        }

        // The heat-pump production view only contains air-source rows here
        let contents = fs::read_to_string(output_dir.join("heat_pump_production.csv")).unwrap();
        assert!(contents.lines().skip(1).all(|line| line.contains("air_source")));
    }

    // Second time will fail because the logging is already initialised
    let second_output = tempdir().unwrap();
    let second_dir = second_output.path().join("results");
    assert_eq!(
        handle_run_command(model_dir.path(), Some(second_dir.as_path()), false)
            .unwrap_err()
            .chain()
            .next()
            .unwrap()
            .to_string(),
        "Failed to initialise logging."
    );
}
