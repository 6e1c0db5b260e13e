//! Sensor label to export file mapping.
//!
//! A [`SensorMapping`] associates each logical sensor label (e.g. `"shank"`)
//! with the identifier used in that sensor's export file name
//! (e.g. `"000_00B421AF"`). Entries keep insertion order, and that order is
//! the column order of every assembled channel table.
//!
//! Mappings persist as XML:
//!
//! ```text
//! <SensorMapping>
//!   <MapItem name="shank" value="000_00B421AF"/>
//!   <MapItem name="thigh" value="000_00B421ED"/>
//! </SensorMapping>
//! ```

use std::fs;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const ROOT_ELEMENT: &str = "SensorMapping";

/// Errors that can occur while building, loading or saving a mapping.
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("IO error on mapping file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed mapping XML: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("malformed mapping XML: {0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("mapping XML has no root element")]
    MissingRoot,

    #[error("mapping XML root element is <{0}>, expected <SensorMapping>")]
    UnexpectedRoot(String),

    #[error("failed to serialize mapping XML: {source}")]
    XmlWrite {
        #[source]
        source: quick_xml::DeError,
    },

    #[error("duplicate sensor name in mapping: '{0}'")]
    DuplicateName(String),

    #[error("sensor name not found in mapping: '{0}'")]
    NotFound(String),
}

/// Result type for mapping operations.
pub type Result<T> = std::result::Result<T, MappingError>;

/// One `(name, fileId)` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapItem {
    /// Logical sensor label.
    #[serde(rename = "@name")]
    pub name: String,
    /// Raw file identifier.
    #[serde(rename = "@value")]
    pub value: String,
}

impl MapItem {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "SensorMapping")]
struct MappingDocument {
    #[serde(rename = "MapItem", default)]
    items: Vec<MapItem>,
}

/// Ordered, name-unique association of sensor labels to file identifiers.
///
/// Inserting a name that already exists is rejected with
/// [`MappingError::DuplicateName`]; the existing entry is left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorMapping {
    items: Vec<MapItem>,
}

impl SensorMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends an entry, rejecting a name that is already mapped.
    pub fn add_item(&mut self, name: impl Into<String>, file_id: impl Into<String>) -> Result<()> {
        self.push(MapItem::new(name, file_id))
    }

    fn push(&mut self, item: MapItem) -> Result<()> {
        if self.contains(&item.name) {
            return Err(MappingError::DuplicateName(item.name));
        }
        self.items.push(item);
        Ok(())
    }

    /// Returns the file identifier mapped to `name`.
    pub fn lookup(&self, name: &str) -> Result<&str> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .map(|item| item.value.as_str())
            .ok_or_else(|| MappingError::NotFound(name.to_string()))
    }

    /// Returns true if `name` is mapped.
    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.name == name)
    }

    /// Iterates `(name, fileId)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.items
            .iter()
            .map(|item| (item.name.as_str(), item.value.as_str()))
    }

    /// Entries in insertion order.
    pub fn items(&self) -> &[MapItem] {
        &self.items
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Parses a mapping from an XML document.
    ///
    /// Fails on malformed XML, a missing root element, an entry lacking
    /// either attribute, or a repeated name.
    pub fn from_xml_str(xml: &str) -> Result<Self> {
        check_root(xml)?;
        let document: MappingDocument = quick_xml::de::from_str(xml)?;

        let mut mapping = Self::new();
        for item in document.items {
            mapping.push(item)?;
        }
        Ok(mapping)
    }

    /// Serializes the mapping, entries in order, to an XML string.
    pub fn to_xml_string(&self) -> Result<String> {
        let document = MappingDocument {
            items: self.items.clone(),
        };
        let body = quick_xml::se::to_string(&document)
            .map_err(|e| MappingError::XmlWrite { source: e })?;
        Ok(format!("{}\n{}\n", XML_DECLARATION, body))
    }

    /// Loads a mapping from an XML file.
    pub fn from_xml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| MappingError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_xml_str(&content)
    }

    /// Writes the mapping to an XML file.
    pub fn to_xml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_xml_string()?;
        fs::write(path, content).map_err(|e| MappingError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }
}

/// The deserializer ignores the root tag, so check it separately.
fn check_root(xml: &str) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                if name.as_ref() == ROOT_ELEMENT.as_bytes() {
                    return Ok(());
                }
                return Err(MappingError::UnexpectedRoot(
                    String::from_utf8_lossy(name.as_ref()).into_owned(),
                ));
            }
            Event::Eof => return Err(MappingError::MissingRoot),
            _ => {}
        }
    }
}

impl<'a> IntoIterator for &'a SensorMapping {
    type Item = &'a MapItem;
    type IntoIter = std::slice::Iter<'a, MapItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
