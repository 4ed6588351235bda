// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

use crate::bus::NatsConfig;
use crate::options::{AgentOptions, DEFAULT_SUBJECT_PREFIX};
use crate::registry::ServiceInfo;

/// Decentralized service discovery over NATS.
#[derive(Debug, Clone, Parser)]
#[command(name = "discovery-agent", version, about)]
pub struct Config {
    /// NATS server URL.
    #[arg(long, env = "DISCOVERY_NATS_URL", default_value = "nats://127.0.0.1:4222")]
    pub nats_url: String,

    /// Auth token for the NATS connection.
    #[arg(long, env = "DISCOVERY_NATS_TOKEN")]
    pub nats_token: Option<String>,

    /// Subject prefix shared by cooperating agents.
    #[arg(long, env = "DISCOVERY_PREFIX", default_value = DEFAULT_SUBJECT_PREFIX)]
    pub prefix: String,

    /// Broadcast interval in milliseconds.
    #[arg(long, env = "DISCOVERY_UPDATE_INTERVAL_MS", default_value_t = 1000)]
    pub update_interval_ms: u64,

    /// Service to provide, as `name=address` (repeatable).
    #[arg(long = "register", value_name = "NAME=ADDR", env = "DISCOVERY_REGISTER", value_delimiter = ',')]
    pub register: Vec<String>,

    /// Service name to watch (repeatable).
    #[arg(long = "watch", value_name = "NAME", env = "DISCOVERY_WATCH", value_delimiter = ',')]
    pub watch: Vec<String>,

    /// How often to log discovered services, in milliseconds.
    #[arg(long, env = "DISCOVERY_REPORT_INTERVAL_MS", default_value_t = 5000)]
    pub report_interval_ms: u64,

    /// Log format (json or text).
    #[arg(long, env = "DISCOVERY_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "DISCOVERY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.update_interval_ms == 0 {
            anyhow::bail!("--update-interval-ms must be positive");
        }
        if self.report_interval_ms == 0 {
            anyhow::bail!("--report-interval-ms must be positive");
        }
        if !matches!(self.log_format.as_str(), "json" | "text") {
            anyhow::bail!("invalid log format: {}", self.log_format);
        }
        self.services()?;
        if self.watch.iter().any(|name| name.is_empty()) {
            anyhow::bail!("--watch requires a service name");
        }
        if self.agent_options().validate().is_err() {
            anyhow::bail!("invalid subject prefix: {:?}", self.prefix);
        }
        Ok(())
    }

    pub fn agent_options(&self) -> AgentOptions {
        AgentOptions::new()
            .subject_prefix(self.prefix.clone())
            .update_interval(Duration::from_millis(self.update_interval_ms))
    }

    pub fn nats(&self) -> NatsConfig {
        NatsConfig { url: self.nats_url.clone(), token: self.nats_token.clone() }
    }

    /// Parse every `--register` spec.
    pub fn services(&self) -> anyhow::Result<Vec<ServiceInfo>> {
        self.register.iter().map(|spec| parse_service(spec)).collect()
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}

/// Parse `name=address`.
pub fn parse_service(spec: &str) -> anyhow::Result<ServiceInfo> {
    let Some((name, address)) = spec.split_once('=') else {
        anyhow::bail!("invalid service spec (expected NAME=ADDR): {spec}");
    };
    let (name, address) = (name.trim(), address.trim());
    if name.is_empty() || address.is_empty() {
        anyhow::bail!("invalid service spec (empty name or address): {spec}");
    }
    Ok(ServiceInfo::new(name, address))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
