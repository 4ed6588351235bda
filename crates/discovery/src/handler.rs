// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound message dispatch.
//!
//! Subscribes to `{prefix}.>` and processes:
//! - `interest` → reply with matching provided services
//! - `servicelist` → upsert into the known registry with a fresh deadline
//! - `stop` → drop every known service last announced by the sender
//!
//! Self-originated messages and unknown actions are dropped. Undecodable
//! payloads are dropped too, except for `stop`.

use std::sync::Weak;

use futures_util::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::agent::{enqueue, Shared};
use crate::bus::BusSubscription;
use crate::proto::{Message, ServiceInterest, ServicesList};
use crate::registry::ServiceInfo;
use crate::subject::Action;

/// Spawn the task feeding bus deliveries into the agent until cancelled.
/// The subscription is dropped (unsubscribed) when the task ends.
pub(crate) fn spawn_inbound(
    shared: Weak<Shared>,
    mut sub: BusSubscription,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                msg = sub.next() => {
                    let Some(msg) = msg else { break };
                    let Some(shared) = shared.upgrade() else { break };
                    shared.handle_message(&msg.subject, &msg.payload).await;
                }
            }
        }
        debug!("discovery: inbound stream closed");
    });
}

impl Shared {
    pub(crate) async fn handle_message(&self, subject: &str, payload: &[u8]) {
        let Some(inbound) = self.codec.parse(subject) else {
            trace!(subject, "discovery: ignoring subject");
            return;
        };
        let Some(action) = inbound.action else {
            trace!(subject, "discovery: unknown action");
            return;
        };
        let message = match Message::decode(action, payload) {
            Ok(m) => Some(m),
            Err(e) => {
                debug!(subject, "discovery: invalid message: {e}");
                None
            }
        };
        if inbound.is_self {
            return;
        }

        // Stop keys on the subject's sender, so it applies even when the
        // payload is unreadable.
        match (action, message) {
            (_, Some(Message::Interest(msg))) => self.handle_interest(msg).await,
            (_, Some(Message::ServicesList(msg))) => {
                self.handle_service_list(msg, &inbound.sender).await
            }
            (Action::Stop, _) => self.handle_stop(&inbound.sender).await,
            _ => {}
        }
    }

    /// Announce every provided service a peer asked about.
    async fn handle_interest(&self, msg: ServiceInterest) {
        if msg.service_name.is_empty() {
            return;
        }
        let (outbox, services) = {
            let state = self.state.lock().await;
            let services: Vec<_> = state
                .provided
                .iter()
                .filter(|info| msg.service_name.contains(&info.name))
                .map(|info| self.to_proto(info))
                .collect();
            (state.live_outbox(), services)
        };
        if services.is_empty() {
            return;
        }
        enqueue(outbox, self.announcement(services)).await;
    }

    /// Cache or refresh announced services. Ownership moves to whichever
    /// agent announced last.
    async fn handle_service_list(&self, msg: ServicesList, sender: &str) {
        if msg.services.is_empty() {
            return;
        }
        let now = Instant::now();
        let deadline = now + self.options.expiry_grace();

        let mut state = self.state.lock().await;
        // A delivery racing `stop` must not repopulate the cleared cache.
        if !state.running {
            return;
        }
        for svc in msg.services {
            let mut record = ServiceInfo::new(svc.name, svc.address);
            record.origin_id = sender.to_owned();
            record.updated_at = now;
            record.good_until = deadline;
            if let Some(existing) = state.known.find_mut(&record.key()) {
                existing.origin_id = record.origin_id;
                existing.updated_at = now;
                existing.good_until = deadline;
            } else {
                trace!(name = %record.name, address = %record.address, sender, "discovery: learned service");
                state.known.upsert(record);
            }
        }
    }

    /// Forget everything the stopped agent announced last.
    async fn handle_stop(&self, sender: &str) {
        let mut state = self.state.lock().await;
        let removed = state.known.retain(|info| info.origin_id != sender);
        debug!(sender, removed, "discovery: peer stopped");
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
