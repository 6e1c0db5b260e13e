//! Loader for per-sensor IMU export files.
//!
//! Each mapped sensor exports one tab-delimited ASCII file per trial:
//!
//! ```text
//! // Update Rate: 100.0Hz
//! PacketCounter  SampleTimeFine  ...  Acc_X  Acc_Y  Acc_Z  Gyr_X ...  Mat[1][1]  Mat[2][1] ...
//! 03583                          ...  3.03   5.25   -7.71  0.0059 ... 0.6096     0.7308    ...
//! ```
//!
//! Columns are grouped into channel groups (acceleration, angular velocity,
//! magnetic field, orientation). A group is present for the whole file only
//! when every one of its columns appears in the header. Fields backing a
//! present group must parse as numbers; every other field may be blank.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use log::{debug, warn};
use thiserror::Error;

use super::tables::{Quaternion, Vec3};
use super::transforms::{matrix_from_entries, matrix_to_quaternion, quaternion_from_components, vec3};
use crate::config::ReaderConfig;

const ACCELERATION_COLUMNS: [&str; 3] = ["Acc_X", "Acc_Y", "Acc_Z"];
const ANGULAR_VELOCITY_COLUMNS: [&str; 3] = ["Gyr_X", "Gyr_Y", "Gyr_Z"];
const MAGNETIC_FIELD_COLUMNS: [&str; 3] = ["Mag_X", "Mag_Y", "Mag_Z"];
/// Row-major: `Mat[r][c]` sits at `(r - 1) * 3 + (c - 1)`.
const MATRIX_COLUMNS: [&str; 9] = [
    "Mat[1][1]", "Mat[1][2]", "Mat[1][3]",
    "Mat[2][1]", "Mat[2][2]", "Mat[2][3]",
    "Mat[3][1]", "Mat[3][2]", "Mat[3][3]",
];
const QUATERNION_COLUMNS: [&str; 4] = ["Quat_q0", "Quat_q1", "Quat_q2", "Quat_q3"];

const UPDATE_RATE_KEY: &str = "Update Rate";

/// Errors that can occur while loading a sensor export file.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV parsing error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed row in '{path}' at line {line}: column '{column}' has invalid value '{value}'")]
    MalformedRow {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    #[error("invalid reader configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Which channel groups a file supplies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelGroups {
    pub acceleration: bool,
    pub angular_velocity: bool,
    pub magnetic_field: bool,
    pub orientation: bool,
}

impl ChannelGroups {
    /// True if no group is present.
    pub fn is_empty(&self) -> bool {
        !(self.acceleration || self.angular_velocity || self.magnetic_field || self.orientation)
    }
}

/// One parsed data row. A field is `Some` on every row of a file exactly
/// when its group is present in that file.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawSensorRecord {
    pub acceleration: Option<Vec3>,
    pub angular_velocity: Option<Vec3>,
    pub magnetic_field: Option<Vec3>,
    pub orientation: Option<Quaternion>,
}

/// Parsed contents of one sensor export file.
#[derive(Debug, Clone)]
pub struct SensorFile {
    /// Path the data was read from (or would have been).
    pub path: PathBuf,
    /// Channel groups found in the header.
    pub groups: ChannelGroups,
    /// One record per data row, in file order.
    pub records: Vec<RawSensorRecord>,
    /// `key: value` pairs from comment lines above the header.
    pub metadata: BTreeMap<String, String>,
    /// Sampling rate in Hz, if the export states one.
    pub data_rate: Option<f64>,
}

impl SensorFile {
    /// A file with no groups and no rows.
    pub fn empty(path: PathBuf) -> Self {
        Self {
            path,
            groups: ChannelGroups::default(),
            records: Vec::new(),
            metadata: BTreeMap::new(),
            data_rate: None,
        }
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.records.len()
    }
}

/// Header column indices of each present group.
#[derive(Debug, Clone, Default, PartialEq)]
struct ColumnLayout {
    acceleration: Option<[usize; 3]>,
    angular_velocity: Option<[usize; 3]>,
    magnetic_field: Option<[usize; 3]>,
    matrix: Option<[usize; 9]>,
    quaternion: Option<[usize; 4]>,
}

impl ColumnLayout {
    fn from_header(header: &[String]) -> Self {
        let index: HashMap<&str, usize> = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let matrix = locate(&index, &MATRIX_COLUMNS);
        // Matrix columns win when both orientation encodings are exported.
        let quaternion = if matrix.is_none() {
            locate(&index, &QUATERNION_COLUMNS)
        } else {
            None
        };

        Self {
            acceleration: locate(&index, &ACCELERATION_COLUMNS),
            angular_velocity: locate(&index, &ANGULAR_VELOCITY_COLUMNS),
            magnetic_field: locate(&index, &MAGNETIC_FIELD_COLUMNS),
            matrix,
            quaternion,
        }
    }

    fn groups(&self) -> ChannelGroups {
        ChannelGroups {
            acceleration: self.acceleration.is_some(),
            angular_velocity: self.angular_velocity.is_some(),
            magnetic_field: self.magnetic_field.is_some(),
            orientation: self.matrix.is_some() || self.quaternion.is_some(),
        }
    }
}

/// Indices of all `names`, or `None` unless every one is in the header.
fn locate<const N: usize>(index: &HashMap<&str, usize>, names: &[&str; N]) -> Option<[usize; N]> {
    let mut found = [0usize; N];
    let mut missing = 0;
    for (slot, name) in found.iter_mut().zip(names.iter()) {
        match index.get(name) {
            Some(&i) => *slot = i,
            None => missing += 1,
        }
    }

    match missing {
        0 => Some(found),
        m if m == N => None,
        _ => {
            debug!(
                "Ignoring partial column group starting at '{}' ({} of {} columns missing)",
                names[0], missing, N
            );
            None
        }
    }
}

/// Path of a sensor's export file: `folder / (trial + file_id + suffix)`.
pub fn sensor_file_path<P: AsRef<Path>>(
    folder: P,
    trial: &str,
    file_id: &str,
    config: &ReaderConfig,
) -> PathBuf {
    folder
        .as_ref()
        .join(format!("{}{}{}", trial, file_id, config.file_suffix))
}

/// Load and parse one sensor export file.
///
/// A file that does not exist is not an error: it yields an empty
/// [`SensorFile`] with no groups present.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read, or if a field
/// backing a present group is not a number.
pub fn load_sensor_file<P: AsRef<Path>>(path: P, config: &ReaderConfig) -> Result<SensorFile> {
    let path = path.as_ref();

    if !config.delimiter.is_ascii() {
        return Err(LoaderError::InvalidConfig(format!(
            "delimiter {:?} is not a single-byte character",
            config.delimiter
        )));
    }

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No export file at {}, sensor has no data", path.display());
            return Ok(SensorFile::empty(path.to_path_buf()));
        }
        Err(e) => {
            return Err(LoaderError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let mut reader = BufReader::new(file);
    let mut sensor = SensorFile::empty(path.to_path_buf());

    let (header, header_line) = match read_preamble(&mut reader, path, config, &mut sensor.metadata)? {
        Some(found) => found,
        None => {
            warn!("Export file {} has no header row", path.display());
            return Ok(sensor);
        }
    };

    sensor.data_rate = sensor.metadata.get(UPDATE_RATE_KEY).and_then(|v| parse_rate(v));

    let layout = ColumnLayout::from_header(&header);
    sensor.groups = layout.groups();
    debug!("{}: {:?}", path.display(), sensor.groups);

    let mut csv_reader = ReaderBuilder::new()
        .delimiter(config.delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    for result in csv_reader.records() {
        let record = result.map_err(|e| LoaderError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let line = header_line + record.position().map_or(0, |p| p.line());

        let row = RowParser {
            record: &record,
            header: &header,
            path,
            line,
        };
        sensor.records.push(row.parse(&layout)?);
    }

    debug!("{}: {} rows", path.display(), sensor.records.len());

    Ok(sensor)
}

/// Consume comment and blank lines up to and including the header.
///
/// Returns the header fields and its 1-based line number, or `None` if the
/// file ends first.
fn read_preamble<R: BufRead>(
    reader: &mut R,
    path: &Path,
    config: &ReaderConfig,
    metadata: &mut BTreeMap<String, String>,
) -> Result<Option<(Vec<String>, u64)>> {
    let mut line = String::new();
    let mut line_no = 0u64;

    loop {
        line.clear();
        let read = reader.read_line(&mut line).map_err(|e| LoaderError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if read == 0 {
            return Ok(None);
        }
        line_no += 1;

        let trimmed = line
            .trim_start_matches('\u{feff}')
            .trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() {
            continue;
        }

        let comment = if config.comment_prefix.is_empty() {
            None
        } else {
            trimmed.strip_prefix(config.comment_prefix.as_str())
        };
        if let Some(comment) = comment {
            if let Some((key, value)) = comment.split_once(':') {
                let key = key.trim();
                if !key.is_empty() {
                    metadata.insert(key.to_string(), value.trim().to_string());
                }
            }
            continue;
        }

        let header = trimmed
            .split(config.delimiter)
            .map(|h| h.trim().to_string())
            .collect();
        return Ok(Some((header, line_no)));
    }
}

/// Parse a rate like `100.0Hz` or `40 Hz`.
fn parse_rate(value: &str) -> Option<f64> {
    let number = value.trim().trim_end_matches("Hz").trim();
    number.parse::<f64>().ok().filter(|r| *r > 0.0)
}

struct RowParser<'a> {
    record: &'a StringRecord,
    header: &'a [String],
    path: &'a Path,
    line: u64,
}

impl RowParser<'_> {
    fn parse(&self, layout: &ColumnLayout) -> Result<RawSensorRecord> {
        let acceleration = layout.acceleration.map(|idx| self.vec3(idx)).transpose()?;
        let angular_velocity = layout.angular_velocity.map(|idx| self.vec3(idx)).transpose()?;
        let magnetic_field = layout.magnetic_field.map(|idx| self.vec3(idx)).transpose()?;

        let orientation = match (layout.matrix, layout.quaternion) {
            (Some(idx), _) => {
                let entries = self.values(idx)?;
                let q = matrix_to_quaternion(&matrix_from_entries(&entries));
                Some(self.unit(q, &idx)?)
            }
            (None, Some(idx)) => {
                let [w, x, y, z] = self.values(idx)?;
                Some(self.unit(quaternion_from_components(w, x, y, z), &idx)?)
            }
            (None, None) => None,
        };

        Ok(RawSensorRecord {
            acceleration,
            angular_velocity,
            magnetic_field,
            orientation,
        })
    }

    fn vec3(&self, idx: [usize; 3]) -> Result<Vec3> {
        let [x, y, z] = self.values(idx)?;
        Ok(vec3(x, y, z))
    }

    fn values<const N: usize>(&self, idx: [usize; N]) -> Result<[f64; N]> {
        let mut out = [0.0; N];
        for (slot, col) in out.iter_mut().zip(idx) {
            *slot = self.field(col)?;
        }
        Ok(out)
    }

    /// Orientation must have a usable norm; report the whole group otherwise.
    fn unit(&self, q: Option<Quaternion>, idx: &[usize]) -> Result<Quaternion> {
        q.ok_or_else(|| {
            let raw: Vec<&str> = idx.iter().map(|&col| self.raw(col)).collect();
            self.malformed(idx[0], raw.join(" "))
        })
    }

    fn field(&self, col: usize) -> Result<f64> {
        let raw = self.raw(col);
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| self.malformed(col, raw.to_string()))
    }

    // Short rows read as blank trailing fields.
    fn raw(&self, col: usize) -> &str {
        self.record.get(col).unwrap_or("").trim()
    }

    fn malformed(&self, col: usize, value: String) -> LoaderError {
        LoaderError::MalformedRow {
            path: self.path.to_path_buf(),
            line: self.line,
            column: self.header[col].clone(),
            value,
        }
    }
}
