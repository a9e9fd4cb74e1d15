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

use crate::errors::StatisticsResult;
use crate::sensor::SensorState;
use crate::types::StatisticsPayload;
use anyhow::Result;
use async_trait::async_trait;

/// Remote source of server statistics.
/// The coordinator only knows this trait, never the HTTP details.
#[async_trait]
pub trait StatisticsSource: Send + Sync {
    /// Fetch one statistics snapshot. Implementations must not retry.
    async fn fetch(&self) -> StatisticsResult<StatisticsPayload>;

    /// Check if the source is reachable
    async fn health_check(&self) -> StatisticsResult<bool>;

    /// Get source name for logging
    fn name(&self) -> &str;
}

/// Anything that can report identity and availability to the host
pub trait Entity {
    fn unique_id(&self) -> String;

    fn name(&self) -> &str;

    fn is_available(&self) -> bool;
}

/// Read-only numeric entity
pub trait SensorEntity: Entity {
    fn native_value(&self) -> Option<f64>;

    /// Rendered view handed to sinks
    fn state(&self) -> SensorState;
}

/// Receiver of rendered sensor states after every refresh cycle
#[async_trait]
pub trait EntitySink: Send + Sync {
    async fn publish(&self, states: &[SensorState]) -> Result<()>;

    /// Get sink name for logging
    fn name(&self) -> &str;
}
