//! Import multi-sensor IMU exports into synchronized channel tables.
//!
//! This crate provides tools for:
//! - Building and persisting the sensor-label to export-file mapping (XML)
//! - Parsing per-sensor tab-delimited export files with varying column sets
//! - Assembling one trial into four channel tables (acceleration, angular
//!   velocity, magnetic heading, orientation)
//! - Writing the assembled tables as tab-delimited text
//!
//! # Example
//!
//! ```no_run
//! use imu_trial_import::{read_trial, SensorMapping};
//!
//! let mapping = SensorMapping::from_xml("map.xml").unwrap();
//! let bundle = read_trial("data", "MT_012005D6_031-", &mapping).unwrap();
//! for (kind, table) in bundle.iter() {
//!     println!("{}: {} rows", kind, table.num_rows());
//! }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use config::{ImportConfig, OutputConfig, ReaderConfig};
pub use crate::core::loaders::{LoaderError, RawSensorRecord, SensorFile};
pub use crate::core::mapping::{MapItem, MappingError, SensorMapping};
pub use crate::core::tables::{ChannelKind, ChannelTable, OutputBundle, Quaternion, TableRef, Vec3};
pub use processors::{read_trial, read_trial_with_config};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
