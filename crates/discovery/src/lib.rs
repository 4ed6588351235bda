// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decentralized service discovery over a shared publish/subscribe bus.
//!
//! Every process embeds an [`Agent`]. Agents announce the services they
//! provide, ask peers for the services they watch, and keep a TTL-bounded
//! cache of what peers announced. There is no central registry.

pub mod agent;
pub mod bus;
pub mod config;
pub mod error;
mod handler;
pub mod options;
pub mod proto;
pub mod registry;
pub mod subject;
pub mod test_support;
mod worker;

pub use agent::Agent;
pub use error::ErrorCode;
pub use options::AgentOptions;
pub use registry::ServiceInfo;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bus::NatsBus;
use crate::config::Config;

/// JSON line logged for each discovered service.
#[derive(Debug, Serialize)]
pub struct ServiceSnapshot {
    pub name: String,
    pub address: String,
    pub origin_id: String,
    pub expires_in_ms: u64,
}

impl ServiceSnapshot {
    pub fn from_info(info: &ServiceInfo, now: Instant) -> Self {
        Self {
            name: info.name.clone(),
            address: info.address.clone(),
            origin_id: info.origin_id.clone(),
            expires_in_ms: u64::try_from(info.good_until.saturating_duration_since(now).as_millis())
                .unwrap_or(u64::MAX),
        }
    }
}

/// Run a standalone agent until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let services = config.services()?;
    let bus = NatsBus::connect(&config.nats()).await?;
    let agent = Agent::new(bus, config.agent_options())?;
    let shutdown = CancellationToken::new();

    for info in services {
        agent.register(info).await;
    }
    for name in &config.watch {
        agent.watch(name).await?;
    }
    agent.start().await?;
    let tracker = agent.track_connectivity(shutdown.clone());

    let mut report = tokio::time::interval(config.report_interval());
    report.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("failed to listen for ctrl-c: {e}");
                }
                break;
            }
            _ = report.tick() => report_watched(&agent, &config.watch).await,
        }
    }

    info!("shutting down");
    shutdown.cancel();
    if let Err(e) = tracker.await {
        warn!("connectivity tracker failed: {e}");
    }
    agent.stop().await?;
    Ok(())
}

async fn report_watched(agent: &Agent, watched: &[String]) {
    let now = Instant::now();
    for name in watched {
        let found: Vec<_> = agent
            .discover(name, false)
            .await
            .iter()
            .map(|info| ServiceSnapshot::from_info(info, now))
            .collect();
        match serde_json::to_string(&found) {
            Ok(json) => info!(service = %name, instances = found.len(), "discovered {json}"),
            Err(e) => warn!("failed to serialize snapshot for {name}: {e}"),
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
