// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publish/subscribe bus abstraction the agent gossips over.

pub mod memory;
pub mod nats;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use tokio::sync::watch;

pub use memory::{MemoryBus, MemoryHub};
pub use nats::{NatsBus, NatsConfig};

/// A message delivered by the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub subject: String,
    pub payload: Bytes,
}

/// Inbound message stream. Dropping it unsubscribes.
pub type BusSubscription = Pin<Box<dyn Stream<Item = BusMessage> + Send>>;

/// Subject-addressed publish/subscribe transport with connectivity
/// notifications.
///
/// Object-safe for use as `Arc<dyn Bus>`.
pub trait Bus: Send + Sync + 'static {
    fn publish(
        &self,
        subject: String,
        payload: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    fn subscribe(
        &self,
        pattern: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<BusSubscription>> + Send + '_>>;

    fn is_connected(&self) -> bool;

    /// Receiver that observes every connectivity transition.
    fn connectivity(&self) -> watch::Receiver<bool>;
}

/// Match a subject against a NATS-style pattern (`*` = one token,
/// `>` = one or more trailing tokens).
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut subject_tokens = subject.split('.');
    for token in pattern.split('.') {
        match token {
            ">" => return subject_tokens.next().is_some_and(|t| !t.is_empty()),
            "*" => match subject_tokens.next() {
                Some(t) if !t.is_empty() => {}
                _ => return false,
            },
            literal => {
                if subject_tokens.next() != Some(literal) {
                    return false;
                }
            }
        }
    }
    subject_tokens.next().is_none()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
