//! Logging initialisation.
//!
//! Terminal output is colourised per level when attached to a terminal.
//! Ordinary messages go to stdout and, when an output directory is given, to
//! a plain-text log file; warnings and errors go to stderr and a second log
//! file. The level is taken from the `BUILDSTOCK_LOG_LEVEL` environment
//! variable, falling back to the `settings.toml` value and finally to
//! [`DEFAULT_LOG_LEVEL`].
use anyhow::{Result, bail, ensure};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::Arguments;
use std::fs::File;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// Set once the logger has been initialised; fern loggers cannot be replaced
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The log level used when neither the environment nor the settings give one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// File receiving messages about the ordinary operation of buildstock
const LOG_INFO_FILE_NAME: &str = "buildstock_info.log";

/// File receiving warnings and error messages
const LOG_ERROR_FILE_NAME: &str = "buildstock_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Convert a log level name to a [`LevelFilter`]
fn parse_level(name: &str) -> Result<LevelFilter> {
    let level = match name.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    };

    Ok(level)
}

/// A fern format callback, with coloured levels when `colours` is given
fn formatter(
    colours: Option<ColoredLevelConfig>,
) -> impl Fn(FormatCallback, &Arguments, &Record) + Sync + Send + 'static {
    move |out, message, record| {
        let timestamp = Local::now().format("%H:%M:%S");
        match colours {
            Some(colours) => out.finish(format_args!(
                "[{timestamp} {} {}] {message}",
                colours.color(record.level()),
                record.target()
            )),
            None => out.finish(format_args!(
                "[{timestamp} {} {}] {message}",
                record.level(),
                record.target()
            )),
        }
    }
}

/// Initialise the program logger using the `fern` logging library.
///
/// The user can specify their preferred logging level via the `settings.toml`
/// file (defaulting to `info` if not present) or with the
/// `BUILDSTOCK_LOG_LEVEL` environment variable. If both are provided, the
/// environment variable takes precedence.
///
/// Possible log level options are:
///
/// * `error`
/// * `warn`
/// * `info`
/// * `debug`
/// * `trace`
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`
/// * `log_file_dir`: The location to save log files (if Some, log files will be created)
pub fn init(log_level_from_settings: Option<&str>, log_file_dir: Option<&Path>) -> Result<()> {
    ensure!(!is_logger_initialised(), "Logger already initialised");

    let level_name = env::var("BUILDSTOCK_LOG_LEVEL").unwrap_or_else(|_| {
        log_level_from_settings
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .to_string()
    });
    let level = parse_level(&level_name)?;

    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    // Colourise only when the stream is a terminal
    let stdout_colours = std::io::stdout().is_terminal().then_some(colours);
    let stderr_colours = std::io::stderr().is_terminal().then_some(colours);

    let mut dispatch = Dispatch::new()
        .chain(
            // Write non-error messages to stdout
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(formatter(stdout_colours))
                .level(level)
                .chain(std::io::stdout()),
        )
        .chain(
            // Write warnings and error messages to stderr
            Dispatch::new()
                .format(formatter(stderr_colours))
                .level(level.min(LevelFilter::Warn))
                .chain(std::io::stderr()),
        );

    if let Some(log_file_dir) = log_file_dir {
        dispatch = dispatch
            .chain(
                // Write non-error messages to the info log file
                Dispatch::new()
                    .filter(|metadata| metadata.level() > LevelFilter::Warn)
                    .format(formatter(None))
                    .level(level.max(LevelFilter::Info))
                    .chain(File::create(log_file_dir.join(LOG_INFO_FILE_NAME))?),
            )
            .chain(
                // Write warnings and error messages to a separate log file
                Dispatch::new()
                    .format(formatter(None))
                    .level(LevelFilter::Warn)
                    .chain(File::create(log_file_dir.join(LOG_ERROR_FILE_NAME))?),
            );
    }

    dispatch.apply().expect("Logger already initialised");
    LOGGER_INIT.set(()).unwrap();

    Ok(())
}
