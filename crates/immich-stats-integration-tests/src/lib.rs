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

//! Shared wiring for the end-to-end tests

use immich_stats_adapters::ImmichClient;
use immich_stats_core::{DEFAULT_UPDATE_INTERVAL, StatisticsCoordinator};
use std::sync::Arc;

pub const TEST_API_KEY: &str = "integration-test-key";

/// Coordinator polling an Immich server at `base_url` with the test key
pub fn coordinator_for(base_url: &str) -> Arc<StatisticsCoordinator> {
    let client =
        ImmichClient::new(base_url, TEST_API_KEY).expect("Failed to create Immich client");
    Arc::new(StatisticsCoordinator::new(Arc::new(client), DEFAULT_UPDATE_INTERVAL))
}
