//! JSON codecs using `serde_json`

use crate::traits::CacheCodec;
use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Lossless JSON codec
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl CacheCodec for JsonCodec {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn name(&self) -> &'static str {
        "serde_json"
    }
}

/// JSON codec that drops empty object fields before writing
///
/// Object fields whose value is `null`, `""`, `[]` or `{}` are removed
/// recursively. Array elements are kept in place (only their inner objects are
/// compacted) so positions never shift. Every field that survives is written
/// exactly as given.
///
/// Reading back therefore requires target types that tolerate missing fields
/// (`#[serde(default)]`), which is how the domain types in this crate are declared.
#[derive(Debug, Default, Clone)]
pub struct CompactJsonCodec;

impl CompactJsonCodec {
    fn is_empty(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }

    /// Strip empty fields from `value` in place
    pub fn compact(value: &mut Value) {
        match value {
            Value::Object(map) => {
                for field in map.values_mut() {
                    Self::compact(field);
                }
                map.retain(|_, field| !Self::is_empty(field));
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    Self::compact(item);
                }
            }
            _ => {}
        }
    }
}

impl CacheCodec for CompactJsonCodec {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let mut tree = serde_json::to_value(value)?;
        Self::compact(&mut tree);
        Ok(serde_json::to_vec(&tree)?)
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn name(&self) -> &'static str {
        "compact_json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compact_drops_empty_fields_recursively() {
        let codec = CompactJsonCodec;
        let value = json!({
            "id": "P1",
            "name": "",
            "lead": null,
            "tags": [],
            "meta": {"owner": null},
            "columns": [{"id": "c1", "tickets": []}, {"id": "c2", "wip": 0}],
            "archived": false
        });

        let bytes = codec.serialize(&value).unwrap();
        let back: Value = codec.deserialize(&bytes).unwrap();

        assert_eq!(
            back,
            json!({
                "id": "P1",
                "columns": [{"id": "c1"}, {"id": "c2", "wip": 0}],
                "archived": false
            })
        );
    }

    #[test]
    fn test_compact_keeps_array_positions() {
        let codec = CompactJsonCodec;
        let value = json!([null, "", {"a": 1}]);

        let bytes = codec.serialize(&value).unwrap();
        let back: Value = codec.deserialize(&bytes).unwrap();

        assert_eq!(back, json!([null, "", {"a": 1}]));
    }

    #[test]
    fn test_plain_json_is_lossless() {
        let codec = JsonCodec;
        let value = json!({"name": "", "lead": null});

        let bytes = codec.serialize(&value).unwrap();
        let back: Value = codec.deserialize(&bytes).unwrap();

        assert_eq!(back, value);
    }
}
