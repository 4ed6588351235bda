// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NATS-backed [`Bus`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{Bus, BusMessage, BusSubscription};

/// Connection settings for [`NatsBus::connect`].
#[derive(Debug, Clone)]
pub struct NatsConfig {
    pub url: String,
    pub token: Option<String>,
}

/// Publish/subscribe over a shared `async_nats::Client`.
#[derive(Clone)]
pub struct NatsBus {
    client: async_nats::Client,
    connected: Arc<watch::Sender<bool>>,
}

impl NatsBus {
    /// Connect to the NATS server, keeping connectivity in sync with the
    /// client's connection events.
    pub async fn connect(config: &NatsConfig) -> anyhow::Result<Self> {
        let connected = Arc::new(watch::Sender::new(false));

        let mut opts = async_nats::ConnectOptions::new();
        if let Some(ref token) = config.token {
            opts = opts.token(token.clone());
        }
        let events = Arc::clone(&connected);
        opts = opts.retry_on_initial_connect().event_callback(move |event| {
            let events = Arc::clone(&events);
            async move {
                match event {
                    async_nats::Event::Connected => {
                        info!("nats: connected");
                        events.send_replace(true);
                    }
                    async_nats::Event::Disconnected => {
                        warn!("nats: disconnected");
                        events.send_replace(false);
                    }
                    async_nats::Event::Closed => {
                        warn!("nats: connection closed");
                        events.send_replace(false);
                    }
                    other => debug!("nats: {other}"),
                }
            }
        });

        info!(url = %config.url, "connecting NATS bus");
        // Returns before the first connection completes; the Connected event
        // flips the watch channel.
        let client = opts.connect(&config.url).await?;
        Ok(Self { client, connected })
    }
}

impl Bus for NatsBus {
    fn publish(
        &self,
        subject: String,
        payload: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.client.publish(subject, payload).await?;
            Ok(())
        })
    }

    fn subscribe(
        &self,
        pattern: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<BusSubscription>> + Send + '_>> {
        Box::pin(async move {
            let sub = self.client.subscribe(pattern).await?;
            let stream = sub.map(|msg| BusMessage {
                subject: msg.subject.to_string(),
                payload: msg.payload,
            });
            Ok(Box::pin(stream) as BusSubscription)
        })
    }

    fn is_connected(&self) -> bool {
        self.client.connection_state() == async_nats::connection::State::Connected
    }

    fn connectivity(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }
}
