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

use thiserror::Error;

/// Failures of a single statistics fetch.
///
/// Cloneable so that one outcome can be handed to every waiter of a
/// coalesced refresh and to every event subscriber.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatisticsError {
    #[error("Authentication failed")]
    Authentication,

    #[error("Could not reach statistics server: {0}")]
    Connectivity(String),

    #[error("Statistics API returned error status {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Malformed statistics response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StatisticsError {
    /// Short machine-friendly label, used in structured log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Connectivity(_) => "connectivity",
            Self::Server { .. } => "server",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Config(_) => "config",
        }
    }
}

pub type StatisticsResult<T> = Result<T, StatisticsError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("Initial statistics refresh failed: {0}")]
    SetupFailed(#[source] StatisticsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = StatisticsError::Server {
            status: 502,
            message: "Bad Gateway".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "Statistics API returned error status 502: Bad Gateway"
        );
        assert_eq!(err.kind(), "server");

        let setup = CoordinatorError::SetupFailed(StatisticsError::Authentication);
        assert_eq!(
            setup.to_string(),
            "Initial statistics refresh failed: Authentication failed"
        );
    }
}
