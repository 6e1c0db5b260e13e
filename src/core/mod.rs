//! Core data types and I/O operations.

pub mod loaders;
pub mod mapping;
pub mod tables;
pub mod transforms;
pub mod writers;

pub use loaders::{load_sensor_file, sensor_file_path, ChannelGroups, LoaderError, RawSensorRecord, SensorFile};
pub use mapping::{MapItem, MappingError, SensorMapping};
pub use tables::{ChannelKind, ChannelTable, OutputBundle, Quaternion, TableRef, TableValue, Vec3};
pub use writers::{write_bundle, write_table, WriteError};
