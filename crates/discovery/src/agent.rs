// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery agent: registries, watch set, lifecycle, and public API.
//!
//! All state lives behind one coarse lock. The worker runs only while the
//! agent is both started and connected; two independent events drive it:
//! - `start`/`stop` from the embedder
//! - connectivity transitions via `conn_state_handler`/`track_connectivity`
//!
//! Outbound messages are built under the lock and enqueued after it is
//! released. The worker takes the same lock for its broadcast and sweep, so
//! an enqueuer blocked on a full queue must never hold it. A queue sender
//! cloned before a worker stops does not keep that worker alive; whatever it
//! enqueues afterwards is dropped.

use std::sync::Arc;

use indexmap::IndexSet;
use rand::rngs::OsRng;
use rand::TryRngCore;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bus::Bus;
use crate::error::ErrorCode;
use crate::options::AgentOptions;
use crate::proto::{AgentStopped, Message, ServiceInfoProto, ServiceInterest, ServicesList};
use crate::registry::{Registry, ServiceInfo};
use crate::subject::{Action, SubjectCodec};
use crate::worker::{self, Outbound, WorkerHandle};

/// State shared between the agent handle, the worker, and the inbound pump.
pub(crate) struct Shared {
    pub(crate) bus: Arc<dyn Bus>,
    pub(crate) codec: SubjectCodec,
    pub(crate) client_id: String,
    pub(crate) options: AgentOptions,
    pub(crate) state: Mutex<State>,
}

/// Everything guarded by the agent lock.
pub(crate) struct State {
    pub(crate) provided: Registry,
    pub(crate) known: Registry,
    pub(crate) watched: IndexSet<String>,
    pub(crate) running: bool,
    pub(crate) connected: bool,
    /// Present exactly while the worker runs (`running && connected`).
    pub(crate) worker: Option<WorkerHandle>,
    /// Cancels the inbound pump; present while running.
    pub(crate) inbound: Option<CancellationToken>,
}

impl State {
    fn new(connected: bool) -> Self {
        Self {
            provided: Registry::new(),
            known: Registry::new(),
            watched: IndexSet::new(),
            running: false,
            connected,
            worker: None,
            inbound: None,
        }
    }

    /// Sender for immediate messages, if the worker is live.
    pub(crate) fn live_outbox(&self) -> Option<mpsc::Sender<Outbound>> {
        if self.running && self.connected {
            self.worker.as_ref().map(WorkerHandle::outbox)
        } else {
            None
        }
    }

    fn start_worker(&mut self, shared: &Arc<Shared>) {
        if self.worker.is_some() {
            return;
        }
        let handle = worker::spawn(Arc::downgrade(shared), shared.options.update_interval);
        if !self.watched.is_empty() {
            let interest = shared.interest(self.watched.iter().cloned().collect());
            // Fresh queue: there is always room for the first message.
            if let Err(e) = handle.outbox().try_send(interest) {
                debug!("discovery: initial interest not queued: {e}");
            }
        }
        self.worker = Some(handle);
    }

    /// Shut the worker down, publishing `last` first if given.
    fn stop_worker(&mut self, last: Option<Outbound>) {
        if let Some(handle) = self.worker.take() {
            handle.shutdown(last);
        }
    }
}

impl Shared {
    pub(crate) fn announcement(&self, services: Vec<ServiceInfoProto>) -> Outbound {
        Outbound {
            subject: self.codec.outbound(Action::ServiceList),
            message: Message::ServicesList(ServicesList { services }),
        }
    }

    pub(crate) fn interest(&self, service_name: Vec<String>) -> Outbound {
        Outbound {
            subject: self.codec.outbound(Action::Interest),
            message: Message::Interest(ServiceInterest { service_name }),
        }
    }

    pub(crate) fn to_proto(&self, info: &ServiceInfo) -> ServiceInfoProto {
        ServiceInfoProto {
            name: info.name.clone(),
            address: info.address.clone(),
            client_id: self.client_id.clone(),
        }
    }
}

/// Queue a message for the worker, waiting for room when the queue is full.
pub(crate) async fn enqueue(outbox: Option<mpsc::Sender<Outbound>>, out: Outbound) {
    let Some(tx) = outbox else { return };
    let subject = out.subject.clone();
    if tx.send(out).await.is_err() {
        debug!(subject, "discovery: worker gone, message dropped");
    }
}

/// Generate the agent identifier: 128 random bits, hex encoded.
fn generate_client_id() -> Result<String, ErrorCode> {
    let mut bytes = [0u8; 16];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
        warn!("discovery: entropy source failed: {e}");
        ErrorCode::Entropy
    })?;
    Ok(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

/// A decentralized service-discovery participant.
///
/// Cheap to clone; all clones drive the same agent.
#[derive(Clone)]
pub struct Agent {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("client_id", &self.shared.client_id)
            .field("prefix", &self.shared.codec.prefix())
            .finish()
    }
}

impl Agent {
    /// Create an agent gossiping over `bus`. The agent is idle until
    /// [`start`](Self::start) is called.
    pub fn new(bus: impl Bus, options: AgentOptions) -> Result<Self, ErrorCode> {
        options.validate()?;
        let client_id = generate_client_id()?;
        let connected = bus.is_connected();
        let codec = SubjectCodec::new(options.subject_prefix.clone(), client_id.clone());
        Ok(Self {
            shared: Arc::new(Shared {
                bus: Arc::new(bus),
                codec,
                client_id,
                options,
                state: Mutex::new(State::new(connected)),
            }),
        })
    }

    /// This agent's identifier on the bus. Stable for the agent's lifetime.
    pub fn client_id(&self) -> &str {
        &self.shared.client_id
    }

    pub fn options(&self) -> &AgentOptions {
        &self.shared.options
    }

    pub async fn is_running(&self) -> bool {
        self.shared.state.lock().await.running
    }

    pub async fn is_connected(&self) -> bool {
        self.shared.state.lock().await.connected
    }

    /// Names currently watched, in the order they were first watched.
    pub async fn watched(&self) -> Vec<String> {
        self.shared.state.lock().await.watched.iter().cloned().collect()
    }

    /// Subscribe to the discovery subjects and, if connected, start the worker.
    pub async fn start(&self) -> Result<(), ErrorCode> {
        let mut state = self.shared.state.lock().await;
        if state.running {
            return Err(ErrorCode::AlreadyRunning);
        }
        let sub = match self.shared.bus.subscribe(self.shared.codec.subscription()).await {
            Ok(sub) => sub,
            Err(e) => {
                warn!("discovery: subscribe failed: {e:#}");
                return Err(ErrorCode::Transport);
            }
        };
        let cancel = CancellationToken::new();
        crate::handler::spawn_inbound(Arc::downgrade(&self.shared), sub, cancel.clone());
        state.inbound = Some(cancel);
        state.running = true;
        if state.connected {
            state.start_worker(&self.shared);
        }
        info!(
            client_id = %self.shared.client_id,
            prefix = %self.shared.codec.prefix(),
            connected = state.connected,
            "discovery agent started"
        );
        Ok(())
    }

    /// Unsubscribe, forget every remote service, and, if connected, tell
    /// peers this agent is gone. Locally provided services are kept.
    ///
    /// Returns before the worker has necessarily exited.
    pub async fn stop(&self) -> Result<(), ErrorCode> {
        let mut state = self.shared.state.lock().await;
        if !state.running {
            return Err(ErrorCode::NotRunning);
        }
        state.running = false;
        if let Some(cancel) = state.inbound.take() {
            cancel.cancel();
        }
        state.known.clear();
        // A worker exists only while connected, so the notice is published
        // exactly when peers can hear it.
        let notice = Outbound {
            subject: self.shared.codec.outbound(Action::Stop),
            message: Message::Stopped(AgentStopped { agent_id: self.shared.client_id.clone() }),
        };
        state.stop_worker(Some(notice));
        drop(state);

        info!(client_id = %self.shared.client_id, "discovery agent stopped");
        Ok(())
    }

    /// Re-read connectivity from the bus and react to a transition.
    ///
    /// Embedders must call this on every connect and disconnect (or use
    /// [`track_connectivity`](Self::track_connectivity)); otherwise peers
    /// keep this agent's services until their TTL runs out.
    pub async fn conn_state_handler(&self) {
        let connected = self.shared.bus.is_connected();
        self.apply_connectivity(connected).await;
    }

    async fn apply_connectivity(&self, connected: bool) {
        let mut state = self.shared.state.lock().await;
        if state.connected == connected {
            return;
        }
        state.connected = connected;
        info!(connected, "discovery: bus connectivity changed");
        if !state.running {
            return;
        }
        if connected {
            state.start_worker(&self.shared);
        } else {
            state.stop_worker(None);
        }
    }

    /// Follow the bus's connectivity notifications until `shutdown` fires.
    pub fn track_connectivity(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let agent = self.clone();
        let mut rx = self.shared.bus.connectivity();
        tokio::spawn(async move {
            loop {
                let up = *rx.borrow_and_update();
                agent.apply_connectivity(up).await;
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("discovery: connectivity tracking ended");
        })
    }

    /// Provide a service. Announces it immediately when the worker is live,
    /// without waiting for the next periodic broadcast.
    pub async fn register(&self, info: ServiceInfo) {
        let mut record = info;
        record.origin_id.clear();
        let (outbox, out) = {
            let mut state = self.shared.state.lock().await;
            let out = self.shared.announcement(vec![self.shared.to_proto(&record)]);
            debug!(name = %record.name, address = %record.address, "discovery: register");
            state.provided.upsert(record);
            (state.live_outbox(), out)
        };
        enqueue(outbox, out).await;
    }

    /// Stop providing a service. Peers notice only when their copy expires
    /// or this agent stops. Returns true if the service was provided.
    pub async fn unregister(&self, info: &ServiceInfo) -> bool {
        let mut state = self.shared.state.lock().await;
        state.provided.remove(&info.key()).is_some()
    }

    /// Express interest in a service. Idempotent; a newly watched name is
    /// broadcast immediately when the worker is live.
    pub async fn watch(&self, name: &str) -> Result<(), ErrorCode> {
        if name.is_empty() {
            return Err(ErrorCode::InvalidName);
        }
        let outbox = {
            let mut state = self.shared.state.lock().await;
            if !state.watched.insert(name.to_owned()) {
                return Ok(());
            }
            state.live_outbox()
        };
        enqueue(outbox, self.shared.interest(vec![name.to_owned()])).await;
        Ok(())
    }

    /// Drop interest in a service and forget every known instance of it.
    pub async fn unwatch(&self, name: &str) {
        let mut state = self.shared.state.lock().await;
        state.watched.shift_remove(name);
        let purged = state.known.retain(|info| info.name != name);
        if purged > 0 {
            debug!(name, purged, "discovery: unwatch purged known services");
        }
    }

    /// Last known instances of a service, as copies. Locally provided
    /// instances are appended when `include_local` is set.
    pub async fn discover(&self, name: &str, include_local: bool) -> Vec<ServiceInfo> {
        let state = self.shared.state.lock().await;
        let mut found = state.known.named(name);
        if include_local {
            found.extend(state.provided.named(name));
        }
        found
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
