//! Flat, dot-keyed string settings used for model hyperparameters.
//!
//! Nested objects are flattened (`{"a": {"b": 1}}` becomes `a.b = "1"`) and
//! values are converted on read by the typed getters.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SarissaError};
use crate::transport::stream::{StreamInput, StreamOutput};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    map: BTreeMap<String, String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Flatten a JSON object into settings.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            SarissaError::invalid_argument("settings must be an object")
        })?;
        let mut map = BTreeMap::new();
        for (key, child) in object {
            flatten(key, child, &mut map);
        }
        Ok(Settings { map })
    }

    /// Parse and flatten a YAML mapping.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_json(&value)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn get_as_f64(&self, key: &str) -> Result<Option<f64>> {
        self.parse(key, "double")
    }

    pub fn get_as_i32(&self, key: &str) -> Result<Option<i32>> {
        self.parse(key, "int")
    }

    pub fn get_as_bool(&self, key: &str) -> Result<Option<bool>> {
        self.parse(key, "boolean")
    }

    fn parse<T: FromStr>(&self, key: &str, type_name: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|_| {
                    SarissaError::invalid_argument(format!(
                        "failed to parse setting [{key}] with value [{raw}] as a {type_name}"
                    ))
                })
            })
            .transpose()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn write_to(&self, out: &mut StreamOutput) {
        out.write_vint(self.map.len() as u32);
        for (key, value) in &self.map {
            out.write_string(key);
            out.write_string(value);
        }
    }

    pub fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        let len = input.read_vint()?;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let key = input.read_string()?;
            let value = input.read_string()?;
            map.insert(key, value);
        }
        Ok(Settings { map })
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.map.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}

fn flatten(path: &str, value: &Value, map: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(object) => {
            for (key, child) in object {
                flatten(&format!("{path}.{key}"), child, map);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(&format!("{path}.{i}"), item, map);
            }
        }
        Value::Null => {}
        Value::String(s) => {
            map.insert(path.to_string(), s.clone());
        }
        scalar => {
            map.insert(path.to_string(), scalar.to_string());
        }
    }
}

#[derive(Debug, Default)]
pub struct SettingsBuilder {
    map: BTreeMap<String, String>,
}

impl SettingsBuilder {
    pub fn put<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.map.insert(key.into(), value.to_string());
        self
    }

    pub fn build(self) -> Settings {
        Settings { map: self.map }
    }
}
