// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use crate::error::ErrorCode;

/// Default subject prefix shared by all agents that should see each other.
pub const DEFAULT_SUBJECT_PREFIX: &str = "github.com.hatobitoio.discovery";

/// Default period between broadcasts of provided services.
///
/// Peers forget a service when it is not re-announced within the interval
/// plus a 10% grace.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(1000);

/// Capacity of the worker's outbound queue.
pub const OUTBOX_CAPACITY: usize = 10;

/// Construction options for [`Agent`](crate::agent::Agent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOptions {
    pub subject_prefix: String,
    pub update_interval: Duration,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_owned(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }
}

impl AgentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agents on the same bus sharing a prefix share service knowledge.
    pub fn subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into();
        self
    }

    pub fn update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// How long a received announcement stays valid: interval × 1.1.
    pub fn expiry_grace(&self) -> Duration {
        self.update_interval + self.update_interval / 10
    }

    /// Reject options that would produce unusable subjects or a stalled timer.
    pub fn validate(&self) -> Result<(), ErrorCode> {
        if self.subject_prefix.is_empty() {
            tracing::warn!("empty subject prefix");
            return Err(ErrorCode::InvalidOption);
        }
        let bad_token =
            self.subject_prefix.split('.').any(|t| t.is_empty() || t == "*" || t == ">");
        if bad_token {
            tracing::warn!(prefix = %self.subject_prefix, "subject prefix has an empty or wildcard token");
            return Err(ErrorCode::InvalidOption);
        }
        if self.update_interval.is_zero() {
            tracing::warn!("update interval must be positive");
            return Err(ErrorCode::InvalidOption);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
