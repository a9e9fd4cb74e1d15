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

use immich_stats_core::SensorState;
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Body of `POST /api/states/{entity_id}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HaStateUpdate {
    pub state: String,
    pub attributes: Map<String, Value>,
}

impl From<&SensorState> for HaStateUpdate {
    fn from(sensor: &SensorState) -> Self {
        let mut attributes = Map::new();
        attributes.insert("friendly_name".to_owned(), json!(sensor.name));
        attributes.insert("icon".to_owned(), json!(sensor.icon));
        attributes.insert("state_class".to_owned(), json!(sensor.state_class));
        attributes.insert("entity_category".to_owned(), json!(sensor.entity_category));
        attributes.insert("attribution".to_owned(), json!(sensor.attribution));
        attributes.insert("device".to_owned(), json!(sensor.device));
        if let Some(unit) = sensor.unit {
            attributes.insert("unit_of_measurement".to_owned(), json!(unit));
        }
        if let Some(device_class) = sensor.device_class {
            attributes.insert("device_class".to_owned(), json!(device_class));
        }

        Self {
            state: sensor.state.clone(),
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use immich_stats_core::sensor::descriptor;
    use immich_stats_core::StatisticsPayload;

    #[test]
    fn test_state_update_from_storage_sensor() {
        let data = StatisticsPayload::from_value(json!({"usage": 549755813888_u64})).unwrap();
        let sensor = SensorState::render(descriptor("storage_usage").unwrap(), Some(&data), true);

        let update = HaStateUpdate::from(&sensor);
        assert_eq!(update.state, "512.00");
        assert_eq!(update.attributes["unit_of_measurement"], "GB");
        assert_eq!(update.attributes["device_class"], "data_size");
        assert_eq!(update.attributes["friendly_name"], "Immich Storage Usage");
        assert_eq!(update.attributes["icon"], "mdi:database");
        assert_eq!(update.attributes["device"]["name"], "Immich Statistics");
        assert_eq!(update.attributes["device"]["manufacturer"], "Immich");
    }

    #[test]
    fn test_state_update_from_count_sensor_has_no_unit() {
        let data = StatisticsPayload::from_value(json!({"photos": 3})).unwrap();
        let sensor = SensorState::render(descriptor("photos_count").unwrap(), Some(&data), true);

        let update = HaStateUpdate::from(&sensor);
        assert_eq!(update.state, "3");
        assert!(!update.attributes.contains_key("unit_of_measurement"));
        assert!(!update.attributes.contains_key("device_class"));
    }
}
