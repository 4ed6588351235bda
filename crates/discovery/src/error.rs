// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Error codes returned synchronously by the agent's public API.
///
/// Publish failures inside the worker and undecodable inbound messages are
/// never surfaced as values; they are logged and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    AlreadyRunning,
    NotRunning,
    InvalidOption,
    InvalidName,
    Entropy,
    Transport,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "ALREADY_RUNNING",
            Self::NotRunning => "NOT_RUNNING",
            Self::InvalidOption => "INVALID_OPTION",
            Self::InvalidName => "INVALID_NAME",
            Self::Entropy => "ENTROPY",
            Self::Transport => "TRANSPORT",
        }
    }

    /// Human-readable description for log lines and CLI output.
    pub fn message(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "discovery agent is already running",
            Self::NotRunning => "discovery agent is not running",
            Self::InvalidOption => "invalid agent option",
            Self::InvalidName => "service name must not be empty",
            Self::Entropy => "secure random source unavailable",
            Self::Transport => "bus subscription failed",
        }
    }

    /// Whether the error stems from caller misuse rather than the environment.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRunning | Self::NotRunning | Self::InvalidOption | Self::InvalidName
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.as_str(), self.message())
    }
}

impl std::error::Error for ErrorCode {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
