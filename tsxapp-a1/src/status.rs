//! Acknowledgement tracking for policy status notifications.
//!
//! Every status message sent on the status stream gets a watcher:
//!
//! ```text
//!   status sent ──► watch(request_id) ──► waiter task
//!                                          │  ack with same request id ──► deregister
//!   ack received ──► broadcast ───────────►│  other ack                 ──► keep waiting
//!                                          │  timeout                   ──► warn, deregister
//! ```
//!
//! Timeouts are not retried and never reach the lifecycle caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::messages::PolicyAckMessage;

/// Ack backlog per watcher before broadcasts are dropped for it.
const WATCHER_CAPACITY: usize = 16;

/// Shared table of pending status acknowledgements.
#[derive(Clone)]
pub struct AckWatchers {
    watchers: Arc<Mutex<HashMap<Uuid, mpsc::Sender<PolicyAckMessage>>>>,
    timeout: Duration,
}

impl AckWatchers {
    /// Creates an empty table whose watchers give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            watchers: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    /// Registers a watcher for `request_id` and starts its waiter.
    pub async fn watch(&self, request_id: String) -> Uuid {
        let watcher_id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::channel(WATCHER_CAPACITY);
        self.watchers.lock().await.insert(watcher_id, tx);

        let watchers = self.watchers.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            let deadline = tokio::time::sleep(timeout);
            tokio::pin!(deadline);

            loop {
                tokio::select! {
                    ack = rx.recv() => match ack {
                        Some(ack) if ack.request_id() == request_id => {
                            debug!(%watcher_id, request_id = %request_id, "Status acknowledged");
                            break;
                        }
                        Some(_) => continue,
                        None => break,
                    },
                    _ = &mut deadline => {
                        warn!(%watcher_id, request_id = %request_id, "No acknowledgement within {:?}", timeout);
                        break;
                    }
                }
            }

            watchers.lock().await.remove(&watcher_id);
        });

        watcher_id
    }

    /// Hands an acknowledgement to every active watcher.
    pub async fn broadcast(&self, ack: PolicyAckMessage) {
        let watchers = self.watchers.lock().await;
        for (watcher_id, tx) in watchers.iter() {
            if tx.try_send(ack.clone()).is_err() {
                debug!(%watcher_id, "Watcher not accepting acknowledgements");
            }
        }
    }

    /// Drops a watcher without waiting for its ack.
    pub async fn remove(&self, watcher_id: &Uuid) {
        self.watchers.lock().await.remove(watcher_id);
    }

    /// Number of watchers still waiting.
    pub async fn pending(&self) -> usize {
        self.watchers.lock().await.len()
    }
}
