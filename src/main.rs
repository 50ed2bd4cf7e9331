//! Provides the main entry point to the program.
use anyhow::Result;
use buildstock::commands::{Cli, Commands, handle_run_command, handle_settings_command};
use clap::Parser;

fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            model_dir,
            output_dir,
            overwrite,
        } => handle_run_command(&model_dir, output_dir.as_deref(), overwrite),
        Commands::Settings => handle_settings_command(),
    }
}
