// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process [`Bus`] for tests and single-process demos.
//!
//! A [`MemoryHub`] fans every published message out to the subscriptions of
//! all attached [`MemoryBus`] handles. Each handle carries its own
//! connectivity flag: a disconnected handle cannot publish, and messages
//! published while it is disconnected are never delivered to it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{subject_matches, Bus, BusMessage, BusSubscription};

struct Subscriber {
    pattern: String,
    connected: watch::Receiver<bool>,
    tx: mpsc::UnboundedSender<BusMessage>,
}

/// Shared delivery fabric for [`MemoryBus`] handles.
#[derive(Clone, Default)]
pub struct MemoryHub {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new, connected handle.
    pub fn attach(&self) -> MemoryBus {
        MemoryBus { hub: self.clone(), connected: Arc::new(watch::Sender::new(true)) }
    }

    fn deliver(&self, msg: BusMessage) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|sub| !sub.tx.is_closed());
        for sub in subscribers.iter() {
            if *sub.connected.borrow() && subject_matches(&sub.pattern, &msg.subject) {
                let _ = sub.tx.send(msg.clone());
            }
        }
    }

    /// Number of live subscriptions across all handles.
    pub fn subscription_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|sub| !sub.tx.is_closed());
        subscribers.len()
    }
}

/// One participant's view of a [`MemoryHub`].
#[derive(Clone)]
pub struct MemoryBus {
    hub: MemoryHub,
    connected: Arc<watch::Sender<bool>>,
}

impl MemoryBus {
    /// Flip connectivity, notifying [`Bus::connectivity`] observers when the
    /// value changes.
    pub fn set_connected(&self, up: bool) {
        self.connected.send_if_modified(|current| {
            let changed = *current != up;
            *current = up;
            changed
        });
    }
}

impl Bus for MemoryBus {
    fn publish(
        &self,
        subject: String,
        payload: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            if !*self.connected.borrow() {
                anyhow::bail!("memory bus disconnected");
            }
            self.hub.deliver(BusMessage { subject, payload });
            Ok(())
        })
    }

    fn subscribe(
        &self,
        pattern: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<BusSubscription>> + Send + '_>> {
        Box::pin(async move {
            let (tx, rx) = mpsc::unbounded_channel();
            self.hub.subscribers.lock().push(Subscriber {
                pattern,
                connected: self.connected.subscribe(),
                tx,
            });
            Ok(Box::pin(UnboundedReceiverStream::new(rx)) as BusSubscription)
        })
    }

    fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    fn connectivity(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
