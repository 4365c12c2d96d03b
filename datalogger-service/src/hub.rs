//! Observer registry and fan-out.
//!
//! Owns every live connection. Frames are serialized once per broadcast and
//! pushed onto per-observer channels, so one slow or dead observer never
//! stalls the others or the ingest path.

use std::collections::HashMap;

use datalogger_client::domain::{Alert, Reading};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Wire frames delivered over the live channel.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame<'a> {
    /// Initial snapshot: recent readings oldest-first plus energy-to-date.
    History { kwh: f64, data: &'a [Reading] },
    /// One newly committed reading.
    Reading { data: &'a Reading },
    /// Transient condition event; not persisted, never in a snapshot.
    Alert {
        #[serde(flatten)]
        alert: &'a Alert,
    },
}

/// A single observer's send failure. Consumed inside the hub: the observer
/// is dropped, nothing propagates to the publisher or to other observers.
#[derive(Debug, thiserror::Error)]
#[error("delivery to observer {observer_id} failed")]
pub struct DeliveryError {
    pub observer_id: Uuid,
}

struct Observer {
    tx: mpsc::UnboundedSender<String>,
}

#[derive(Default)]
pub struct Hub {
    observers: RwLock<HashMap<Uuid, Observer>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer and hand back the receiving end of its frame
    /// channel. The caller forwards frames to the network.
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        self.observers.write().await.insert(id, Observer { tx });
        metrics::counter!("ws_clients_connected_total").increment(1);
        tracing::info!(observer_id = %id, "observer connected");

        (id, rx)
    }

    /// Remove an observer. Idempotent; unknown ids are a no-op.
    pub async fn unregister(&self, id: &Uuid) {
        if self.observers.write().await.remove(id).is_some() {
            metrics::counter!("ws_clients_disconnected_total").increment(1);
            tracing::info!(observer_id = %id, "observer disconnected");
        }
    }

    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Queue a frame for one observer.
    pub async fn send_to(&self, id: &Uuid, frame: &Frame<'_>) -> Result<(), DeliveryError> {
        let json = match serialize(frame) {
            Some(j) => j,
            None => return Ok(()),
        };

        let observers = self.observers.read().await;
        match observers.get(id) {
            Some(obs) if obs.tx.send(json).is_ok() => Ok(()),
            _ => Err(DeliveryError { observer_id: *id }),
        }
    }

    /// Deliver a frame to every observer. Failed sends are collected and the
    /// offending observers dropped after the fan-out loop.
    pub async fn broadcast(&self, frame: &Frame<'_>) {
        let json = match serialize(frame) {
            Some(j) => j,
            None => return,
        };

        let mut dead = Vec::new();
        {
            let observers = self.observers.read().await;
            for (id, obs) in observers.iter() {
                if obs.tx.send(json.clone()).is_err() {
                    dead.push(DeliveryError { observer_id: *id });
                }
            }
        }

        for err in dead {
            metrics::counter!("broadcast_send_failed_total").increment(1);
            tracing::warn!(observer_id = %err.observer_id, "dropping unreachable observer");
            self.unregister(&err.observer_id).await;
        }
    }
}

fn serialize(frame: &Frame<'_>) -> Option<String> {
    match serde_json::to_string(frame) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize broadcast frame");
            None
        }
    }
}
