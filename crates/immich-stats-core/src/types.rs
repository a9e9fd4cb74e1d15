// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of immich-stats.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use crate::errors::{StatisticsError, StatisticsResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Integration domain, used as prefix for unique ids and entity ids
pub const DOMAIN: &str = "immich_statistics";

pub const ATTRIBUTION: &str = "Data provided by Immich";

/// Raw statistics object returned by the server.
///
/// Observed keys: `photos`, `videos`, `usage`, `usagePhotos`, `usageVideos`.
/// The payload is kept as-is so that a missing key stays distinguishable
/// from a zero value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatisticsPayload(Map<String, Value>);

impl StatisticsPayload {
    /// Accept a decoded JSON document, rejecting anything but an object
    pub fn from_value(value: Value) -> StatisticsResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StatisticsError::MalformedResponse(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Numeric value of a field, `None` if absent or not a number
    pub fn number(&self, field: &str) -> Option<f64> {
        self.0.get(field).and_then(Value::as_f64)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<Map<String, Value>> for StatisticsPayload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Device every statistics sensor is grouped under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: &'static str,
    pub manufacturer: &'static str,
    pub entry_type: &'static str,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            identifier: DOMAIN.to_owned(),
            name: "Immich Statistics",
            manufacturer: "Immich",
            entry_type: "service",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_accepts_object() {
        let payload =
            StatisticsPayload::from_value(json!({"photos": 120, "usage": 549755813888_u64}))
                .unwrap();

        assert_eq!(payload.len(), 2);
        assert!(payload.contains("photos"));
        assert!(!payload.contains("videos"));
        assert_eq!(payload.number("photos"), Some(120.0));
        assert_eq!(payload.number("usage"), Some(549_755_813_888.0));
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        for value in [json!([1, 2]), json!("stats"), json!(null), json!(42)] {
            let result = StatisticsPayload::from_value(value);
            assert!(matches!(
                result,
                Err(StatisticsError::MalformedResponse(_))
            ));
        }
    }

    #[test]
    fn test_number_ignores_non_numeric_fields() {
        let payload = StatisticsPayload::from_value(json!({"photos": "many", "videos": null}))
            .unwrap();

        assert!(payload.contains("photos"));
        assert_eq!(payload.number("photos"), None);
        assert_eq!(payload.number("videos"), None);
    }

    #[test]
    fn test_default_device_info() {
        let device = DeviceInfo::default();
        assert_eq!(device.identifier, "immich_statistics");
        assert_eq!(device.manufacturer, "Immich");
        assert_eq!(device.entry_type, "service");
    }
}
