//! Channel tables and the per-trial output bundle.

use std::collections::BTreeMap;
use std::fmt;

use nalgebra::{UnitQuaternion, Vector3};

/// Three-component measurement (acceleration, angular velocity, magnetic field).
pub type Vec3 = Vector3<f64>;

/// Unit quaternion orientation.
pub type Quaternion = UnitQuaternion<f64>;

/// The four channel kinds every trial produces a table for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelKind {
    LinearAcceleration,
    AngularVelocity,
    MagneticHeading,
    Orientation,
}

impl ChannelKind {
    /// All kinds, in bundle order.
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::LinearAcceleration,
        ChannelKind::AngularVelocity,
        ChannelKind::MagneticHeading,
        ChannelKind::Orientation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::LinearAcceleration => "linear_acceleration",
            ChannelKind::AngularVelocity => "angular_velocity",
            ChannelKind::MagneticHeading => "magnetic_heading",
            ChannelKind::Orientation => "orientation",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element type stored in a channel table column.
pub trait TableValue: Copy + fmt::Debug {
    /// Name reported in the table's `DataType` metadata.
    const DATA_TYPE: &'static str;
    /// Suffixes for the flattened component columns.
    const COMPONENTS: &'static [&'static str];

    /// Components in the order of [`Self::COMPONENTS`].
    fn components(&self) -> Vec<f64>;
}

impl TableValue for Vec3 {
    const DATA_TYPE: &'static str = "Vec3";
    const COMPONENTS: &'static [&'static str] = &["x", "y", "z"];

    fn components(&self) -> Vec<f64> {
        vec![self.x, self.y, self.z]
    }
}

impl TableValue for Quaternion {
    const DATA_TYPE: &'static str = "Quaternion";
    const COMPONENTS: &'static [&'static str] = &["w", "x", "y", "z"];

    fn components(&self) -> Vec<f64> {
        vec![self.w, self.i, self.j, self.k]
    }
}

/// Time series with one column per contributing sensor.
///
/// Columns are stored column-major; every column has exactly
/// `num_rows()` values.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTable<T> {
    time: Vec<f64>,
    labels: Vec<String>,
    columns: Vec<Vec<T>>,
    metadata: BTreeMap<String, String>,
}

impl<T: TableValue> ChannelTable<T> {
    /// Creates a table with no rows and no sensor columns.
    pub fn empty() -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("DataType".to_string(), T::DATA_TYPE.to_string());
        Self {
            time: Vec::new(),
            labels: Vec::new(),
            columns: Vec::new(),
            metadata,
        }
    }

    /// Creates a table from a time column and labelled sensor columns.
    ///
    /// The row count is the shortest of the time column and every sensor
    /// column; longer inputs are truncated to it.
    pub fn from_columns(mut time: Vec<f64>, columns: Vec<(String, Vec<T>)>) -> Self {
        let rows = columns
            .iter()
            .map(|(_, values)| values.len())
            .fold(time.len(), usize::min);
        time.truncate(rows);

        let mut table = Self::empty();
        table.time = time;
        for (label, mut values) in columns {
            values.truncate(rows);
            table.labels.push(label);
            table.columns.push(values);
        }
        table
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.time.len()
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// The independent (time) column.
    pub fn time_column(&self) -> &[f64] {
        &self.time
    }

    /// Sensor column labels, in mapping order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// All values of one sensor column.
    pub fn column(&self, label: &str) -> Option<&[T]> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|idx| self.columns[idx].as_slice())
    }

    /// Values of row `index`, one per sensor column in label order.
    pub fn row(&self, index: usize) -> Option<Vec<T>> {
        if index >= self.num_rows() {
            return None;
        }
        Some(self.columns.iter().map(|col| col[index]).collect())
    }

    /// Iterates `(time, row)` pairs.
    pub fn rows(&self) -> impl Iterator<Item = (f64, Vec<T>)> + '_ {
        self.time
            .iter()
            .enumerate()
            .map(move |(i, &t)| (t, self.columns.iter().map(|col| col[i]).collect()))
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }
}

impl<T: TableValue> Default for ChannelTable<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Borrowed view of one bundle table, tagged by element type.
#[derive(Debug, Clone, Copy)]
pub enum TableRef<'a> {
    Vec3(&'a ChannelTable<Vec3>),
    Quaternion(&'a ChannelTable<Quaternion>),
}

impl TableRef<'_> {
    pub fn num_rows(&self) -> usize {
        match self {
            TableRef::Vec3(t) => t.num_rows(),
            TableRef::Quaternion(t) => t.num_rows(),
        }
    }

    pub fn labels(&self) -> &[String] {
        match self {
            TableRef::Vec3(t) => t.labels(),
            TableRef::Quaternion(t) => t.labels(),
        }
    }

    pub fn time_column(&self) -> &[f64] {
        match self {
            TableRef::Vec3(t) => t.time_column(),
            TableRef::Quaternion(t) => t.time_column(),
        }
    }
}

/// The four channel tables assembled for one trial.
///
/// Every kind is always present, possibly as an empty table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputBundle {
    pub linear_acceleration: ChannelTable<Vec3>,
    pub angular_velocity: ChannelTable<Vec3>,
    pub magnetic_heading: ChannelTable<Vec3>,
    pub orientation: ChannelTable<Quaternion>,
}

impl OutputBundle {
    /// Typed access to one of the three vector tables.
    ///
    /// Returns `None` for [`ChannelKind::Orientation`]; use
    /// [`OutputBundle::orientation`] or [`OutputBundle::get`] instead.
    pub fn vec3_table(&self, kind: ChannelKind) -> Option<&ChannelTable<Vec3>> {
        match kind {
            ChannelKind::LinearAcceleration => Some(&self.linear_acceleration),
            ChannelKind::AngularVelocity => Some(&self.angular_velocity),
            ChannelKind::MagneticHeading => Some(&self.magnetic_heading),
            ChannelKind::Orientation => None,
        }
    }

    /// Tagged access to any table.
    pub fn get(&self, kind: ChannelKind) -> TableRef<'_> {
        match kind {
            ChannelKind::LinearAcceleration => TableRef::Vec3(&self.linear_acceleration),
            ChannelKind::AngularVelocity => TableRef::Vec3(&self.angular_velocity),
            ChannelKind::MagneticHeading => TableRef::Vec3(&self.magnetic_heading),
            ChannelKind::Orientation => TableRef::Quaternion(&self.orientation),
        }
    }

    /// Channel kinds present in the bundle; always all four.
    pub fn kinds(&self) -> [ChannelKind; 4] {
        ChannelKind::ALL
    }

    /// Iterates every table with its kind, in bundle order.
    pub fn iter(&self) -> impl Iterator<Item = (ChannelKind, TableRef<'_>)> + '_ {
        ChannelKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }
}
