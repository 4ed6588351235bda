// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background worker: the only publisher on the bus.
//!
//! Drains the bounded outbound queue one message at a time and, on every
//! tick of the update interval (including one immediately at start),
//! broadcasts all provided services and sweeps expired known services.
//!
//! The worker stops when its [`WorkerHandle`] is shut down or dropped, not
//! when the queue closes: enqueuers may still hold queue senders. Anything
//! queued at that point is dropped; only the handle's final message goes out.

use std::sync::Weak;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::agent::Shared;
use crate::options::OUTBOX_CAPACITY;
use crate::proto::Message;

/// A message waiting to be published.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Outbound {
    pub(crate) subject: String,
    pub(crate) message: Message,
}

/// Owner's side of a running worker.
pub(crate) struct WorkerHandle {
    outbox: mpsc::Sender<Outbound>,
    shutdown: oneshot::Sender<Option<Outbound>>,
}

impl WorkerHandle {
    pub(crate) fn outbox(&self) -> mpsc::Sender<Outbound> {
        self.outbox.clone()
    }

    /// Stop the worker after it publishes `last`, if given. Returns without
    /// waiting for the worker to exit.
    pub(crate) fn shutdown(self, last: Option<Outbound>) {
        if self.shutdown.send(last).is_err() {
            debug!("discovery worker already gone");
        }
    }

    /// A handle with no task behind it; tests read the queue directly.
    #[cfg(test)]
    pub(crate) fn detached(outbox: mpsc::Sender<Outbound>) -> Self {
        let (shutdown, _) = oneshot::channel();
        Self { outbox, shutdown }
    }
}

/// Spawn a worker.
pub(crate) fn spawn(shared: Weak<Shared>, interval: Duration) -> WorkerHandle {
    let (outbox, rx) = mpsc::channel(OUTBOX_CAPACITY);
    let (shutdown, shutdown_rx) = oneshot::channel();
    tokio::spawn(run(shared, rx, shutdown_rx, interval));
    WorkerHandle { outbox, shutdown }
}

async fn run(
    shared: Weak<Shared>,
    mut rx: mpsc::Receiver<Outbound>,
    mut shutdown: oneshot::Receiver<Option<Outbound>>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!(?interval, "discovery worker started");

    loop {
        // Shutdown wins over everything. The tick precedes the queue so a
        // busy queue cannot starve the broadcast and sweep.
        tokio::select! {
            biased;
            last = &mut shutdown => {
                if let (Ok(Some(out)), Some(shared)) = (last, shared.upgrade()) {
                    shared.publish(out).await;
                }
                break;
            }
            _ = ticker.tick() => {
                let Some(shared) = shared.upgrade() else { break };
                shared.send_updates().await;
                shared.check_expiration().await;
            }
            out = rx.recv() => {
                let Some(out) = out else { break };
                let Some(shared) = shared.upgrade() else { break };
                shared.publish(out).await;
            }
        }
    }

    debug!("discovery worker exiting");
}

impl Shared {
    /// Encode and publish one message. Failures are logged and dropped; the
    /// next periodic broadcast repairs any lost announcement.
    pub(crate) async fn publish(&self, out: Outbound) {
        let payload = Bytes::from(out.message.encode());
        if let Err(e) = self.bus.publish(out.subject.clone(), payload).await {
            warn!(subject = %out.subject, "discovery: publish failed: {e:#}");
        }
    }

    /// Broadcast every provided service in one announcement. Nothing is sent
    /// when no service is provided.
    pub(crate) async fn send_updates(&self) {
        let out = {
            let state = self.state.lock().await;
            if state.provided.is_empty() {
                return;
            }
            let services = state.provided.iter().map(|info| self.to_proto(info)).collect();
            self.announcement(services)
        };
        self.publish(out).await;
    }

    /// Evict known services whose deadline passed, measured against a single
    /// timestamp taken at the start of the sweep. Returns the number evicted.
    pub(crate) async fn check_expiration(&self) -> usize {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let evicted = state.known.retain(|info| !info.is_expired(now));
        if evicted > 0 {
            debug!(evicted, remaining = state.known.len(), "discovery: expired known services");
        }
        evicted
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
