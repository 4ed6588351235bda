// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a throwaway NATS server, in-memory agent
//! builders, and polling assertions.

use std::future::Future;
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use futures_util::StreamExt;

use crate::agent::Agent;
use crate::bus::{BusSubscription, MemoryBus, MemoryHub};
use crate::options::AgentOptions;
use crate::proto::Message;
use crate::subject::{Inbound, SubjectCodec};

/// A `nats-server` child process bound to a free loopback port.
///
/// Killed on drop.
pub struct NatsServer {
    child: Child,
    port: u16,
}

impl NatsServer {
    /// Start `nats-server`, or return `None` when it is not on `$PATH` or
    /// does not come up in time.
    pub fn start() -> Option<Self> {
        let port = TcpListener::bind("127.0.0.1:0").ok()?.local_addr().ok()?.port();
        let child = Command::new("nats-server")
            .args(["-a", "127.0.0.1", "-p", &port.to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .ok()?;
        let mut server = Self { child, port };

        for _ in 0..100 {
            if TcpStream::connect(("127.0.0.1", port)).is_ok() {
                return Some(server);
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        let _ = server.child.kill();
        None
    }

    pub fn url(&self) -> String {
        format!("nats://127.0.0.1:{}", self.port)
    }
}

impl Drop for NatsServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// An agent attached to an in-memory hub, with its bus handle for
/// connectivity toggling.
pub struct MemoryAgent {
    pub agent: Agent,
    pub bus: MemoryBus,
}

impl MemoryAgent {
    pub fn attach(hub: &MemoryHub, options: AgentOptions) -> anyhow::Result<Self> {
        let bus = hub.attach();
        let agent = Agent::new(bus.clone(), options)?;
        Ok(Self { agent, bus })
    }
}

/// Options for fast tests: short interval under a dedicated prefix.
pub fn fast_options(prefix: &str) -> AgentOptions {
    AgentOptions::new().subject_prefix(prefix).update_interval(Duration::from_millis(100))
}

/// Poll `check` until it returns true or `timeout` elapses.
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> anyhow::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("condition not met within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Receive and decode the next discovery message under `prefix`.
pub async fn next_message(
    sub: &mut BusSubscription,
    prefix: &str,
    timeout: Duration,
) -> anyhow::Result<(Inbound, Message)> {
    let codec = SubjectCodec::new(prefix, "observer");
    let msg = tokio::time::timeout(timeout, sub.next())
        .await?
        .ok_or_else(|| anyhow::anyhow!("subscription closed"))?;
    let inbound = codec
        .parse(&msg.subject)
        .ok_or_else(|| anyhow::anyhow!("unexpected subject: {}", msg.subject))?;
    let action = inbound.action.ok_or_else(|| anyhow::anyhow!("unknown action: {}", msg.subject))?;
    let message = Message::decode(action, &msg.payload)?;
    Ok((inbound, message))
}

/// Receive messages until one satisfies `pick`, discarding the rest.
pub async fn wait_for_message<T>(
    sub: &mut BusSubscription,
    prefix: &str,
    timeout: Duration,
    mut pick: impl FnMut(&Inbound, &Message) -> Option<T>,
) -> anyhow::Result<T> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let (inbound, message) = next_message(sub, prefix, remaining).await?;
        if let Some(found) = pick(&inbound, &message) {
            return Ok(found);
        }
    }
}
