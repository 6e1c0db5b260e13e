//! Trial assembly: parse every mapped sensor and merge into channel tables.

use std::path::Path;

use log::{debug, info, warn};

use crate::config::ReaderConfig;
use crate::core::loaders::{load_sensor_file, sensor_file_path, RawSensorRecord, Result, SensorFile};
use crate::core::mapping::SensorMapping;
use crate::core::tables::{ChannelKind, ChannelTable, OutputBundle, TableValue};

/// Read one trial with the default reader configuration.
///
/// For each `(name, fileId)` in `mapping`, reads
/// `folder / (trial + fileId + ".txt")` and merges the results into four
/// channel tables. Missing files and missing channel groups produce empty
/// columns rather than errors.
///
/// # Errors
///
/// Returns an error if any existing export file cannot be read or contains
/// a malformed row. No partial bundle is returned.
///
/// # Example
///
/// ```no_run
/// use imu_trial_import::{read_trial, SensorMapping};
///
/// let mut mapping = SensorMapping::new();
/// mapping.add_item("shank", "000_00B421AF").unwrap();
/// let bundle = read_trial("", "MT_012005D6_031-", &mapping).unwrap();
/// println!("{} acceleration rows", bundle.linear_acceleration.num_rows());
/// ```
pub fn read_trial<P: AsRef<Path>>(folder: P, trial: &str, mapping: &SensorMapping) -> Result<OutputBundle> {
    read_trial_with_config(folder, trial, mapping, &ReaderConfig::default())
}

/// Read one trial using an explicit reader configuration.
pub fn read_trial_with_config<P: AsRef<Path>>(
    folder: P,
    trial: &str,
    mapping: &SensorMapping,
    config: &ReaderConfig,
) -> Result<OutputBundle> {
    let folder = folder.as_ref();

    // Files are read one at a time; each handle is closed before the next opens.
    let mut sensors: Vec<(&str, SensorFile)> = Vec::with_capacity(mapping.len());
    for (name, file_id) in mapping.iter() {
        let path = sensor_file_path(folder, trial, file_id, config);
        let sensor = load_sensor_file(&path, config)?;
        debug!("Sensor '{}' -> {} ({} rows)", name, path.display(), sensor.num_rows());
        sensors.push((name, sensor));
    }

    let mut bundle = OutputBundle {
        linear_acceleration: assemble(ChannelKind::LinearAcceleration, &sensors, |r| r.acceleration),
        angular_velocity: assemble(ChannelKind::AngularVelocity, &sensors, |r| r.angular_velocity),
        magnetic_heading: assemble(ChannelKind::MagneticHeading, &sensors, |r| r.magnetic_field),
        orientation: assemble(ChannelKind::Orientation, &sensors, |r| r.orientation),
    };

    bundle.linear_acceleration.set_metadata("trial", trial);
    bundle.angular_velocity.set_metadata("trial", trial);
    bundle.magnetic_heading.set_metadata("trial", trial);
    bundle.orientation.set_metadata("trial", trial);

    info!(
        "Read trial '{}': {} sensors, rows acc={} gyr={} mag={} ori={}",
        trial,
        mapping.len(),
        bundle.linear_acceleration.num_rows(),
        bundle.angular_velocity.num_rows(),
        bundle.magnetic_heading.num_rows(),
        bundle.orientation.num_rows()
    );

    Ok(bundle)
}

/// Build one channel table from every sensor that supplies `extract`.
///
/// Contributors keep mapping order. The table is cut to the shortest
/// contributor so all columns stay aligned by row index.
fn assemble<T, F>(kind: ChannelKind, sensors: &[(&str, SensorFile)], extract: F) -> ChannelTable<T>
where
    T: TableValue,
    F: Fn(&RawSensorRecord) -> Option<T>,
{
    let contributors: Vec<(&str, &SensorFile, Vec<T>)> = sensors
        .iter()
        // A file with the group present but no rows still contributes a column.
        .filter(|(_, sensor)| has_group(kind, sensor))
        .map(|(name, sensor)| {
            let values: Vec<T> = sensor.records.iter().filter_map(&extract).collect();
            (*name, sensor, values)
        })
        .collect();

    if contributors.is_empty() {
        return ChannelTable::empty();
    }

    let num_rows = contributors
        .iter()
        .map(|(_, _, values)| values.len())
        .min()
        .unwrap_or(0);

    if contributors.iter().any(|(_, _, values)| values.len() != num_rows) {
        let lengths: Vec<String> = contributors
            .iter()
            .map(|(name, _, values)| format!("{}={}", name, values.len()))
            .collect();
        warn!(
            "Unequal row counts for {} ({}), truncating to {}",
            kind,
            lengths.join(", "),
            num_rows
        );
    }

    let data_rate = contributors.iter().find_map(|(_, sensor, _)| sensor.data_rate);

    let time: Vec<f64> = (0..num_rows).map(|i| i as f64).collect();
    let columns = contributors
        .into_iter()
        .map(|(name, _, values)| (name.to_string(), values))
        .collect();

    let mut table = ChannelTable::from_columns(time, columns);
    if let Some(rate) = data_rate {
        table.set_metadata("DataRate", format!("{}", rate));
    }
    table
}

fn has_group(kind: ChannelKind, sensor: &SensorFile) -> bool {
    match kind {
        ChannelKind::LinearAcceleration => sensor.groups.acceleration,
        ChannelKind::AngularVelocity => sensor.groups.angular_velocity,
        ChannelKind::MagneticHeading => sensor.groups.magnetic_field,
        ChannelKind::Orientation => sensor.groups.orientation,
    }
}
