//! Logger Module
//!
//! A logging system based on `tracing-subscriber` with support for:
//! - Console output on stderr with color control
//! - File output with multiple formats (Full, Compact, JSON)

pub mod config;
pub mod error;

pub use config::*;
pub use error::LoggerError;

use std::fs::{File, OpenOptions};
use std::sync::Mutex;

use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber described by `config`.
///
/// Fails if a global subscriber is already set.
pub fn init_logger(config: LoggerConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(config.filter_directive())?;

    tracing_subscriber::registry()
        .with(output_layers(&config)?)
        .with(filter)
        .try_init()
        .map_err(|e| LoggerError::subscriber(e.to_string()))?;

    Ok(())
}

/// The file layer comes first so console ANSI settings do not leak into the file.
fn output_layers(config: &LoggerConfig) -> Result<Vec<BoxedLayer>, LoggerError> {
    let mut layers = Vec::with_capacity(2);

    if let Some(file) = &config.file {
        layers.push(file_layer(file)?);
    }
    if let Some(console) = config.console {
        layers.push(console_layer(console));
    }

    if layers.is_empty() {
        return Err(LoggerError::config(
            "At least one output (console or file) must be enabled",
        ));
    }
    Ok(layers)
}

fn console_layer(output: ConsoleOutput) -> BoxedLayer {
    fmt::layer()
        .with_ansi(output.ansi)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .boxed()
}

fn file_layer(output: &FileOutput) -> Result<BoxedLayer, LoggerError> {
    let writer = open_log_file(output)?;
    let layer = fmt::layer().with_ansi(false).with_target(true);

    Ok(match output.format {
        LogFormat::Full => layer.with_writer(writer).boxed(),
        LogFormat::Compact => layer.compact().with_writer(writer).boxed(),
        LogFormat::Json => layer.json().with_writer(writer).boxed(),
    })
}

/// Open the log file, creating parent directories as needed.
pub fn open_log_file(output: &FileOutput) -> Result<Mutex<File>, LoggerError> {
    if let Some(parent) = output.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(output.append)
        .truncate(!output.append)
        .open(&output.path)?;

    Ok(Mutex::new(file))
}
