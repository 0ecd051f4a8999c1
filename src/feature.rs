//! Feature records exchanged with the batch driver
//!
//! A feature is an identifier, an optional WKB geometry and an ordered bag
//! of attributes. On disk features travel as JSON Lines, one object per
//! line, with the WKB payload base64 encoded:
//!
//! ```text
//! {"id": 7, "geometry": "AQgAAAAD...", "properties": {"name": "kerb"}}
//! ```

use anyhow::Context;
use base64::{engine::general_purpose, Engine as _};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::io::{BufRead, Write};

/// One feature: identifier, geometry and attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: Value,
    /// Well-known binary geometry, `None` when the feature has none
    #[serde(
        default,
        serialize_with = "serialize_wkb_as_base64",
        deserialize_with = "deserialize_wkb_from_base64"
    )]
    pub geometry: Option<Vec<u8>>,
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
}

impl Feature {
    pub fn new(id: impl Into<Value>, geometry: Option<Vec<u8>>) -> Self {
        Feature {
            id: id.into(),
            geometry,
            properties: IndexMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Feature identifier for log messages: strings bare, anything else as JSON
pub fn id_label(id: &Value) -> String {
    match id {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Serialize optional WKB as a base64 string (or null)
pub fn serialize_wkb_as_base64<S>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match data {
        Some(bytes) => serializer.serialize_some(&general_purpose::STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

/// Deserialize optional WKB from a base64 string (or null)
pub fn deserialize_wkb_from_base64<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded: Option<String> = Option::deserialize(deserializer)?;
    encoded
        .map(|text| general_purpose::STANDARD.decode(text.trim()))
        .transpose()
        .map_err(serde::de::Error::custom)
}

/// Read JSON Lines features; blank lines are ignored
pub fn read_features<R: BufRead>(reader: R) -> anyhow::Result<Vec<Feature>> {
    let mut features = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", index + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let feature: Feature = serde_json::from_str(&line)
            .with_context(|| format!("invalid feature record on line {}", index + 1))?;
        features.push(feature);
    }
    Ok(features)
}

/// Write features as JSON Lines
pub fn write_features<W: Write>(mut writer: W, features: &[Feature]) -> anyhow::Result<()> {
    for feature in features {
        serde_json::to_writer(&mut writer, feature).context("failed to serialize feature")?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_json_shape() {
        let feature = Feature::new(7, Some(vec![1, 2, 3])).with_property("name", "kerb");
        let json = serde_json::to_string(&feature).unwrap();
        assert_eq!(json, r#"{"id":7,"geometry":"AQID","properties":{"name":"kerb"}}"#);
    }

    #[test]
    fn test_read_features_skips_blank_lines() {
        let input = "{\"id\": \"a\", \"geometry\": null}\n\n{\"id\": 2, \"geometry\": \"AQID\", \"properties\": {\"z\": 1, \"a\": 2}}\n";
        let features = read_features(input.as_bytes()).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].geometry, None);
        assert_eq!(features[1].geometry, Some(vec![1, 2, 3]));
        // Attribute order is kept as read
        let keys: Vec<_> = features[1].properties.keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn test_id_label_drops_json_quotes() {
        assert_eq!(id_label(&Value::from("parcel-7")), "parcel-7");
        assert_eq!(id_label(&Value::from(42)), "42");
        assert_eq!(id_label(&Value::Null), "null");
    }

    #[test]
    fn test_read_features_reports_line() {
        let err = read_features("{\"id\": 1}\nnot json\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_missing_geometry_field_defaults_to_none() {
        let features = read_features("{\"id\": 1}".as_bytes()).unwrap();
        assert_eq!(features[0].geometry, None);
        assert!(features[0].properties.is_empty());
    }
}
