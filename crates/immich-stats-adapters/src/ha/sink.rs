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

use crate::ha::client::HomeAssistantClient;
use crate::ha::types::HaStateUpdate;
use anyhow::Result;
use async_trait::async_trait;
use immich_stats_core::{EntitySink, SensorState};
use tracing::{info, warn};

/// Publishes sensor states into Home Assistant through its REST API
#[derive(Debug, Clone)]
pub struct HomeAssistantSink {
    client: HomeAssistantClient,
}

impl HomeAssistantSink {
    pub fn new(client: HomeAssistantClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EntitySink for HomeAssistantSink {
    async fn publish(&self, states: &[SensorState]) -> Result<()> {
        let mut failed = 0;

        for state in states {
            let update = HaStateUpdate::from(state);
            if let Err(e) = self.client.set_state(&state.entity_id, &update).await {
                // Continue with other entities instead of failing completely
                warn!("[HA SINK] Failed to publish {}: {}", state.entity_id, e);
                failed += 1;
            }
        }

        info!(
            "[HA SINK] Published {}/{} sensor states",
            states.len() - failed,
            states.len()
        );

        if failed > 0 {
            anyhow::bail!("{failed} of {} sensor states were not published", states.len());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "home_assistant"
    }
}
