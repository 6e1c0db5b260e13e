//! Writers for assembled channel tables.
//!
//! Tables are written as tab-delimited text with a short `key=value` header
//! block terminated by `endheader`, followed by one column per sensor
//! component (`shank_x`, `shank_y`, ...) and one line per row:
//!
//! ```text
//! DataType=Vec3
//! nRows=2
//! nColumns=4
//! endheader
//! time    shank_x   shank_y   shank_z
//! 0       3.030769  5.254238  -7.714005
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use super::tables::{ChannelKind, ChannelTable, OutputBundle, TableValue};
use crate::config::OutputConfig;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Column names: `time` then `<label>_<component>` per sensor.
fn column_names<T: TableValue>(table: &ChannelTable<T>) -> Vec<String> {
    let mut names = Vec::with_capacity(1 + table.num_columns() * T::COMPONENTS.len());
    names.push("time".to_string());
    for label in table.labels() {
        for component in T::COMPONENTS {
            names.push(format!("{}_{}", label, component));
        }
    }
    names
}

/// Write one channel table to a tab-delimited file.
///
/// Parent directories are created if needed. A table with no rows still
/// gets its header block and column line.
///
/// # Errors
///
/// Returns an error if the file or its parent directories cannot be
/// created or written.
pub fn write_table<T: TableValue>(path: &Path, table: &ChannelTable<T>) -> Result<()> {
    ensure_parent_dirs(path)?;

    let path_str = path.display().to_string();
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path_str.clone(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);

    let names = column_names(table);
    let mut header = String::new();
    for (key, value) in table.metadata() {
        header.push_str(&format!("{}={}\n", key, value));
    }
    header.push_str(&format!("nRows={}\n", table.num_rows()));
    header.push_str(&format!("nColumns={}\n", names.len()));
    header.push_str("endheader\n");

    writer
        .write_all(header.as_bytes())
        .map_err(|e| WriteError::WriteFile {
            path: path_str.clone(),
            source: e,
        })?;

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);

    csv_writer
        .write_record(&names)
        .map_err(|e| WriteError::CsvError {
            path: path_str.clone(),
            source: e,
        })?;

    for (time, row) in table.rows() {
        let mut record = Vec::with_capacity(names.len());
        record.push(format!("{}", time));
        for value in &row {
            record.extend(value.components().iter().map(|c| format!("{:.6}", c)));
        }
        csv_writer
            .write_record(&record)
            .map_err(|e| WriteError::CsvError {
                path: path_str.clone(),
                source: e,
            })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}

/// Write all four tables of a bundle as `<dir>/<trial><suffix>.<ext>`.
///
/// Returns the written paths in bundle order.
pub fn write_bundle(
    dir: &Path,
    trial: &str,
    bundle: &OutputBundle,
    config: &OutputConfig,
) -> Result<Vec<(ChannelKind, PathBuf)>> {
    let mut written = Vec::with_capacity(ChannelKind::ALL.len());

    for kind in ChannelKind::ALL {
        let path = dir.join(config.file_name(trial, kind));
        match kind {
            ChannelKind::LinearAcceleration => write_table(&path, &bundle.linear_acceleration)?,
            ChannelKind::AngularVelocity => write_table(&path, &bundle.angular_velocity)?,
            ChannelKind::MagneticHeading => write_table(&path, &bundle.magnetic_heading)?,
            ChannelKind::Orientation => write_table(&path, &bundle.orientation)?,
        }
        info!("Wrote {} table to {}", kind, path.display());
        written.push((kind, path));
    }

    Ok(written)
}
