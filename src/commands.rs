//! The command line interface for the projection.
use crate::input::load_model;
use crate::log;
use crate::output::{create_output_directory, get_output_dir};
use crate::settings::Settings;
use crate::simulation;
use ::log::info;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(version, about)]
/// The command line interface for the projection.
pub struct Cli {
    #[command(subcommand)]
    /// The available commands.
    pub command: Commands,
}

#[derive(Subcommand)]
/// The available commands.
pub enum Commands {
    /// Run a projection model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Directory for output files (defaults to a folder named after the model).
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Overwrite an existing output directory.
        #[arg(long)]
        overwrite: bool,
    },
    /// Print the default program settings file.
    Settings,
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_dir: &Path,
    output_dir: Option<&Path>,
    overwrite: bool,
) -> Result<()> {
    let settings = Settings::from_path(model_dir)?;
    let output_dir = match output_dir {
        Some(output_dir) => output_dir.to_path_buf(),
        None => get_output_dir(model_dir)?,
    };
    create_output_directory(&output_dir, overwrite || settings.overwrite)?;
    log::init(settings.log_level.as_deref(), Some(&output_dir))
        .context("Failed to initialise logging.")?;

    let model = load_model(model_dir).context("Failed to load model.")?;
    info!("Model loaded successfully.");

    simulation::run(&model, &output_dir)
}

/// Handle the `settings` command.
pub fn handle_settings_command() -> Result<()> {
    print!("{}", Settings::default_file_contents());

    Ok(())
}
