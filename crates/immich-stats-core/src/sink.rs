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

use crate::sensor::SensorState;
use crate::traits::EntitySink;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sink writing every rendered state to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl EntitySink for LogSink {
    async fn publish(&self, states: &[SensorState]) -> Result<()> {
        for state in states {
            info!(
                entity_id = %state.entity_id,
                device = state.device.name,
                available = state.available,
                unit = state.unit.map(|u| u.symbol()).unwrap_or_default(),
                "{}: {}",
                state.name,
                state.state
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Hand states to every sink. A failing sink is logged and skipped.
///
/// Returns the number of sinks that accepted the states.
pub async fn publish_to_sinks(sinks: &[Arc<dyn EntitySink>], states: &[SensorState]) -> usize {
    let mut published = 0;

    for sink in sinks {
        match sink.publish(states).await {
            Ok(()) => {
                debug!(sink = sink.name(), count = states.len(), "Published sensor states");
                published += 1;
            }
            Err(e) => {
                warn!(sink = sink.name(), error = %e, "Failed to publish sensor states");
            }
        }
    }

    published
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{METRIC_DESCRIPTORS, SensorState};

    struct FailingSink;

    #[async_trait]
    impl EntitySink for FailingSink {
        async fn publish(&self, _states: &[SensorState]) -> Result<()> {
            anyhow::bail!("sink is down")
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_stop_others() {
        let states: Vec<SensorState> = METRIC_DESCRIPTORS
            .iter()
            .map(|d| SensorState::render(d, None, false))
            .collect();
        let sinks: Vec<Arc<dyn EntitySink>> = vec![Arc::new(FailingSink), Arc::new(LogSink)];

        let published = publish_to_sinks(&sinks, &states).await;
        assert_eq!(published, 1);
    }
}
