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

pub mod coordinator;
pub mod errors;
pub mod sensor;
pub mod sink;
pub mod traits;
pub mod types;

pub use coordinator::{CoordinatorEvent, DEFAULT_UPDATE_INTERVAL, StatisticsCoordinator};
pub use errors::{CoordinatorError, StatisticsError, StatisticsResult};
pub use sensor::{
    METRIC_DESCRIPTORS, MetricDescriptor, STATE_UNAVAILABLE, STATE_UNKNOWN, SensorState,
    StatisticsMetric, StatisticsSensor, build_sensors, render_states,
};
pub use sink::{LogSink, publish_to_sinks};
pub use traits::{Entity, EntitySink, SensorEntity, StatisticsSource};
pub use types::{ATTRIBUTION, DOMAIN, DeviceInfo, StatisticsPayload};
