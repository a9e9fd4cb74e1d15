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

use crate::coordinator::StatisticsCoordinator;
use crate::traits::{Entity, SensorEntity};
use crate::types::{ATTRIBUTION, DOMAIN, DeviceInfo, StatisticsPayload};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// State string reported for sensors that cannot be trusted
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// State string for an available sensor whose field holds no number
pub const STATE_UNKNOWN: &str = "unknown";

/// Statistics field a sensor is backed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatisticsMetric {
    Photos,
    Videos,
    Usage,
    UsagePhotos,
    UsageVideos,
}

impl StatisticsMetric {
    /// Key in the statistics payload
    pub fn source_field(self) -> &'static str {
        match self {
            Self::Photos => "photos",
            Self::Videos => "videos",
            Self::Usage => "usage",
            Self::UsagePhotos => "usagePhotos",
            Self::UsageVideos => "usageVideos",
        }
    }

    pub fn value(self, payload: &StatisticsPayload) -> Option<f64> {
        payload.number(self.source_field())
    }

    /// A metric is available exactly when its field is present
    pub fn is_available(self, payload: &StatisticsPayload) -> bool {
        payload.contains(self.source_field())
    }

    pub fn all() -> &'static [StatisticsMetric] {
        &[
            Self::Photos,
            Self::Videos,
            Self::Usage,
            Self::UsagePhotos,
            Self::UsageVideos,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Diagnostic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Measurement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    DataSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InformationUnit {
    Bytes,
    Gigabytes,
}

impl InformationUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Bytes => "B",
            Self::Gigabytes => "GB",
        }
    }

    fn bytes_per_unit(self) -> f64 {
        match self {
            Self::Bytes => 1.0,
            Self::Gigabytes => 1_073_741_824.0,
        }
    }

    pub fn convert(self, value: f64, to: InformationUnit) -> f64 {
        value * self.bytes_per_unit() / to.bytes_per_unit()
    }
}

impl fmt::Display for InformationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for InformationUnit {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

/// Static description of one exposed metric
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub metric: StatisticsMetric,
    pub entity_category: EntityCategory,
    pub state_class: StateClass,
    pub device_class: Option<DeviceClass>,
    pub native_unit: Option<InformationUnit>,
    /// Unit the value is displayed in, converted from `native_unit`
    pub suggested_unit: Option<InformationUnit>,
    pub display_precision: Option<usize>,
}

const fn count_metric(
    key: &'static str,
    name: &'static str,
    icon: &'static str,
    metric: StatisticsMetric,
) -> MetricDescriptor {
    MetricDescriptor {
        key,
        name,
        icon,
        metric,
        entity_category: EntityCategory::Diagnostic,
        state_class: StateClass::Measurement,
        device_class: None,
        native_unit: None,
        suggested_unit: None,
        display_precision: None,
    }
}

const fn storage_metric(
    key: &'static str,
    name: &'static str,
    metric: StatisticsMetric,
) -> MetricDescriptor {
    MetricDescriptor {
        key,
        name,
        icon: "mdi:database",
        metric,
        entity_category: EntityCategory::Diagnostic,
        state_class: StateClass::Measurement,
        device_class: Some(DeviceClass::DataSize),
        native_unit: Some(InformationUnit::Bytes),
        suggested_unit: Some(InformationUnit::Gigabytes),
        display_precision: Some(2),
    }
}

pub static METRIC_DESCRIPTORS: [MetricDescriptor; 5] = [
    count_metric(
        "photos_count",
        "Immich Photos",
        "mdi:image",
        StatisticsMetric::Photos,
    ),
    count_metric(
        "videos_count",
        "Immich Videos",
        "mdi:video-image",
        StatisticsMetric::Videos,
    ),
    storage_metric(
        "storage_usage",
        "Immich Storage Usage",
        StatisticsMetric::Usage,
    ),
    storage_metric(
        "storage_usage_photos",
        "Immich Photos Storage Usage",
        StatisticsMetric::UsagePhotos,
    ),
    storage_metric(
        "storage_usage_videos",
        "Immich Videos Storage Usage",
        StatisticsMetric::UsageVideos,
    ),
];

impl MetricDescriptor {
    pub fn value(&self, payload: &StatisticsPayload) -> Option<f64> {
        self.metric.value(payload)
    }

    pub fn is_available(&self, payload: &StatisticsPayload) -> bool {
        self.metric.is_available(payload)
    }

    pub fn unique_id(&self) -> String {
        format!("{DOMAIN}_{}", self.key)
    }

    pub fn entity_id(&self) -> String {
        format!("sensor.{}", self.unique_id())
    }

    /// Unit shown to users
    pub fn display_unit(&self) -> Option<InformationUnit> {
        self.suggested_unit.or(self.native_unit)
    }

    /// Convert a native value to its display string
    pub fn display_value(&self, native: f64) -> String {
        let value = match (self.native_unit, self.suggested_unit) {
            (Some(from), Some(to)) => from.convert(native, to),
            _ => native,
        };

        match self.display_precision {
            Some(precision) => format!("{value:.precision$}"),
            None => value.to_string(),
        }
    }
}

/// Look up a descriptor by its key
pub fn descriptor(key: &str) -> Option<&'static MetricDescriptor> {
    METRIC_DESCRIPTORS.iter().find(|d| d.key == key)
}

/// Rendered view of one sensor, as handed to sinks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorState {
    pub entity_id: String,
    pub unique_id: String,
    pub name: &'static str,
    pub icon: &'static str,
    pub available: bool,
    pub native_value: Option<f64>,
    /// Display string, `unknown` or `unavailable`
    pub state: String,
    pub unit: Option<InformationUnit>,
    pub device_class: Option<DeviceClass>,
    pub state_class: StateClass,
    pub entity_category: EntityCategory,
    pub attribution: &'static str,
    pub device: DeviceInfo,
}

impl SensorState {
    /// Render a descriptor against one snapshot.
    ///
    /// `healthy` is the coordinator's last-update status; a failed cycle
    /// marks every sensor unavailable even though the snapshot is kept.
    pub fn render(
        descriptor: &MetricDescriptor,
        snapshot: Option<&StatisticsPayload>,
        healthy: bool,
    ) -> Self {
        let available = healthy && snapshot.is_some_and(|data| descriptor.is_available(data));
        let native_value = snapshot.and_then(|data| descriptor.value(data));

        let state = match (available, native_value) {
            (true, Some(value)) => descriptor.display_value(value),
            (true, None) => STATE_UNKNOWN.to_owned(),
            (false, _) => STATE_UNAVAILABLE.to_owned(),
        };

        Self {
            entity_id: descriptor.entity_id(),
            unique_id: descriptor.unique_id(),
            name: descriptor.name,
            icon: descriptor.icon,
            available,
            native_value,
            state,
            unit: descriptor.display_unit(),
            device_class: descriptor.device_class,
            state_class: descriptor.state_class,
            entity_category: descriptor.entity_category,
            attribution: ATTRIBUTION,
            device: DeviceInfo::default(),
        }
    }
}

/// Sensor backed by the coordinator's snapshot. Never fetches on its own.
#[derive(Debug, Clone)]
pub struct StatisticsSensor {
    coordinator: Arc<StatisticsCoordinator>,
    descriptor: &'static MetricDescriptor,
}

impl StatisticsSensor {
    pub fn new(
        coordinator: Arc<StatisticsCoordinator>,
        descriptor: &'static MetricDescriptor,
    ) -> Self {
        Self {
            coordinator,
            descriptor,
        }
    }

    pub fn descriptor(&self) -> &'static MetricDescriptor {
        self.descriptor
    }

    pub fn entity_id(&self) -> String {
        self.descriptor.entity_id()
    }
}

impl Entity for StatisticsSensor {
    fn unique_id(&self) -> String {
        self.descriptor.unique_id()
    }

    fn name(&self) -> &str {
        self.descriptor.name
    }

    fn is_available(&self) -> bool {
        self.coordinator.last_update_success()
            && self
                .coordinator
                .data()
                .is_some_and(|data| self.descriptor.is_available(&data))
    }
}

impl SensorEntity for StatisticsSensor {
    fn native_value(&self) -> Option<f64> {
        self.coordinator
            .data()
            .and_then(|data| self.descriptor.value(&data))
    }

    fn state(&self) -> SensorState {
        SensorState::render(
            self.descriptor,
            self.coordinator.data().as_deref(),
            self.coordinator.last_update_success(),
        )
    }
}

/// One sensor per descriptor, all sharing the coordinator
pub fn build_sensors(coordinator: &Arc<StatisticsCoordinator>) -> Vec<StatisticsSensor> {
    METRIC_DESCRIPTORS
        .iter()
        .map(|descriptor| StatisticsSensor::new(Arc::clone(coordinator), descriptor))
        .collect()
}

/// Render every sensor from a single snapshot read
pub fn render_states(
    coordinator: &StatisticsCoordinator,
    sensors: &[StatisticsSensor],
) -> Vec<SensorState> {
    let snapshot = coordinator.data();
    let healthy = coordinator.last_update_success();

    sensors
        .iter()
        .map(|sensor| SensorState::render(sensor.descriptor, snapshot.as_deref(), healthy))
        .collect()
}
