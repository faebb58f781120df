use crate::config::Number;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type RecordId = String;

/// Metadata keys written by the ingestion paths.
pub mod keys {
    pub const SOURCE: &str = "source";
    pub const LINE_NUMBER: &str = "line_number";
    pub const FILE_NAME: &str = "file_name";
    pub const ABSOLUTE_DIRECTORY_PATH: &str = "absolute_directory_path";
    pub const CHUNK_INDEX: &str = "chunk_index";
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub enum MetadataValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl MetadataValue {
    #[cfg(test)]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Str(s) => Some(s),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetadataValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MetadataValue::Str(s) => serde_json::Value::from(s.as_str()),
            MetadataValue::Int(i) => serde_json::Value::from(*i),
            MetadataValue::Float(f) => serde_json::Value::from(*f),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Str(s) => f.write_str(s),
            MetadataValue::Int(i) => write!(f, "{}", i),
            MetadataValue::Float(x) => write!(f, "{}", x),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Str(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Str(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        MetadataValue::Int(value as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct Metadata(BTreeMap<String, MetadataValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<MetadataValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<MetadataValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.0.iter()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

/// One stored embedding together with the text segment it was computed from.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: RecordId,
    pub embedding: Vec<Number>,
    pub text: String,
    pub metadata: Metadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder_and_lookup() {
        let metadata = Metadata::new()
            .with(keys::SOURCE, "/tmp/a.txt")
            .with(keys::LINE_NUMBER, 3usize);

        assert_eq!(metadata.get(keys::SOURCE).and_then(|v| v.as_str()), Some("/tmp/a.txt"));
        assert_eq!(metadata.get(keys::LINE_NUMBER).and_then(|v| v.as_int()), Some(3));
        assert!(metadata.get(keys::FILE_NAME).is_none());
    }

    #[test]
    fn test_metadata_to_json_keeps_scalar_types() {
        let metadata = Metadata::new()
            .with("name", "x")
            .with("count", 2i64)
            .with("ratio", 0.5f64);

        let json = metadata.to_json();
        assert_eq!(json["name"], "x");
        assert_eq!(json["count"], 2);
        assert_eq!(json["ratio"], 0.5);
    }
}
