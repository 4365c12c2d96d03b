//! Commit-and-broadcast coordination.
//!
//! One async lock gates every operation that must agree with commit order:
//! submitting a reading (commit, then fan out), taking a subscription
//! snapshot, and broadcasting an alert. Readings committed at or before a
//! subscription land in its snapshot; everything after arrives exactly once
//! on the live stream.

use std::sync::Arc;

use datalogger_client::domain::{Alert, NewReading, Reading};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::hub::{Frame, Hub};
use crate::store::{Store, StoreError};

/// Number of readings delivered in the initial snapshot frame.
pub const SNAPSHOT_DEPTH: i64 = 50;

pub struct Pipeline {
    store: Arc<Store>,
    hub: Arc<Hub>,
    gate: Mutex<()>,
}

impl Pipeline {
    pub fn new(store: Arc<Store>, hub: Arc<Hub>) -> Self {
        Self {
            store,
            hub,
            gate: Mutex::new(()),
        }
    }

    /// Commit a validated reading and fan it out to every observer. The
    /// returned record is the producer's acknowledgment. Broadcast failures
    /// stay inside the hub; only storage failures reach the caller.
    pub async fn submit(&self, rec: NewReading) -> Result<Reading, StoreError> {
        let _gate = self.gate.lock().await;

        let reading = self.store.commit(&rec).await?;
        self.hub.broadcast(&Frame::Reading { data: &reading }).await;
        metrics::counter!("readings_committed_total").increment(1);

        Ok(reading)
    }

    /// Register an observer and seed its channel with a history frame taken
    /// at the same commit boundary, so the live stream continues without a
    /// gap or a duplicate.
    pub async fn subscribe(
        &self,
    ) -> Result<(Uuid, mpsc::UnboundedReceiver<String>), StoreError> {
        let _gate = self.gate.lock().await;

        let data = self.store.recent(SNAPSHOT_DEPTH).await?;
        let kwh = self.store.energy_to_date().await;

        let (id, rx) = self.hub.register().await;
        // The receiver is still in our hands, so this send cannot fail.
        let _ = self.hub.send_to(&id, &Frame::History { kwh, data: &data }).await;

        Ok((id, rx))
    }

    pub async fn unsubscribe(&self, id: &Uuid) {
        self.hub.unregister(id).await;
    }

    /// Broadcast an alert. Takes the gate so an alert published after a
    /// reading is never delivered ahead of it.
    pub async fn alert(&self, alert: &Alert) {
        let _gate = self.gate.lock().await;

        self.hub.broadcast(&Frame::Alert { alert }).await;
        metrics::counter!("alerts_broadcast_total").increment(1);
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn observer_count(&self) -> usize {
        self.hub.observer_count().await
    }
}
