//! `EventSource` over the bus event channel.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use pcloud_common::{BusEvent, keys};

use crate::application::ports::EventSource;

/// Subscription to `pcloud:events`.
pub struct BusEventSource {
    messages: BoxStream<'static, redis::Msg>,
}

impl BusEventSource {
    /// Subscribe to the event channel on the bus at `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus is unreachable.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("failed to create bus client")?;
        let mut pubsub = client
            .get_async_pubsub()
            .await
            .context("failed to connect to the message bus")?;
        pubsub
            .subscribe(keys::EVENTS)
            .await
            .context("failed to subscribe to events")?;
        Ok(Self {
            messages: pubsub.into_on_message().boxed(),
        })
    }
}

/// Decode an event payload, dropping anything malformed.
pub(crate) fn decode_event(payload: &str) -> Option<BusEvent> {
    match serde_json::from_str(payload) {
        Ok(ev) => Some(ev),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed event");
            None
        }
    }
}

impl EventSource for BusEventSource {
    async fn next_event(&mut self) -> Result<Option<BusEvent>> {
        while let Some(msg) = self.messages.next().await {
            let payload: String = match msg.get_payload() {
                Ok(p) => p,
                Err(e) => {
                    tracing::debug!(error = %e, "ignoring non-text event");
                    continue;
                }
            };
            if let Some(ev) = decode_event(&payload) {
                return Ok(Some(ev));
            }
        }
        Ok(None)
    }
}
