//! Functionality for running the buildstock projection pipeline.
//!
//! The pipeline is a pure-functional chain: condition shares are reconciled
//! from the S-curves, the floor-area inventory is evolved under demolition
//! and new construction, energy needs are composed from intensities and
//! conditioned areas, and finally the heating-system mix allocates needs to
//! energy carriers. No stage mutates its inputs and no output is written
//! until every stage has finished.
use crate::area::evolve_area;
use crate::condition::compute_condition_shares;
use crate::energy_need::compute_energy_need;
use crate::heating::allocate_energy_use;
use crate::model::Model;
use crate::output::write_results;
use anyhow::Result;
use log::info;
use std::path::Path;

/// Run the projection.
///
/// # Arguments
///
/// * `model` - The model to run
/// * `output_path` - The folder to write results to
pub fn run(model: &Model, output_path: &Path) -> Result<()> {
    info!(
        "Projecting {} categories and {} cohorts over {}-{}",
        model.categories.len(),
        model.codes.len(),
        model.file.projection.start_year,
        model.file.projection.end_year
    );

    let condition_shares = compute_condition_shares(model)?;
    info!("Reconciled condition shares for {} series", condition_shares.len());

    let areas = evolve_area(model, &condition_shares)?;
    info!("Evolved floor areas for {} series", areas.len());

    let needs = compute_energy_need(model, &areas)?;
    info!("Composed {} energy-need rows", needs.rows.len());

    let energy_use = allocate_energy_use(model, &needs.demand)?;
    info!("Allocated {} energy-use rows", energy_use.rows.len());

    write_results(output_path, model, &areas, &needs, &energy_use)?;
    info!("Results written to {}", output_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    fn test_run(model: Model) {
        let dir = tempdir().unwrap();
        run(&model, dir.path()).unwrap();
        assert!(dir.path().join("area_forecast.csv").is_file());
        assert!(dir.path().join("energy_purpose.csv").is_file());
        assert!(dir.path().join("energy_use.csv").is_file());
        assert!(dir.path().join("heat_pump_production.csv").is_file());
        assert!(dir.path().join("heat_pump_electricity.csv").is_file());
    }
}
