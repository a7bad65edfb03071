//! Policy sync task: mirrors the A1 policy map into the policy store each
//! time the northbound side signals a change, then asks for a steering pass.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use tsxapp_a1::A1PolicyServer;

use super::manager::PolicyManager;
use crate::tasks::{PolicySyncMessage, SteeringMessage, Task, TaskHandle, TaskMessage};

/// Change-notifier consumer.
pub struct PolicySyncTask {
    server: Arc<A1PolicyServer>,
    manager: Arc<PolicyManager>,
    changes: mpsc::Receiver<()>,
    steering: TaskHandle<SteeringMessage>,
}

impl PolicySyncTask {
    /// Creates the task. `changes` is the receiving side of the notifier
    /// handed to the A1 server.
    pub fn new(
        server: Arc<A1PolicyServer>,
        manager: Arc<PolicyManager>,
        changes: mpsc::Receiver<()>,
        steering: TaskHandle<SteeringMessage>,
    ) -> Self {
        Self {
            server,
            manager,
            changes,
            steering,
        }
    }

    async fn sync(&self) {
        let snapshot = self.server.snapshot_by_arrival().await;
        match self.manager.sync_from_a1(&snapshot) {
            Ok(summary) => debug!(
                applied = summary.applied.len(),
                removed = summary.removed.len(),
                rejected = summary.rejected.len(),
                unchanged = summary.unchanged,
                "Policy store synchronized"
            ),
            Err(e) => error!("Policy store sync failed: {}", e),
        }

        if self.steering.try_send(SteeringMessage::PolicyChanged).is_err() {
            debug!("Steering task busy, policy change folded into pending pass");
        }
    }
}

#[async_trait::async_trait]
impl Task for PolicySyncTask {
    type Message = PolicySyncMessage;

    async fn run(&mut self, mut rx: mpsc::Receiver<TaskMessage<Self::Message>>) {
        info!("Policy sync task started");

        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    match msg {
                        TaskMessage::Message(PolicySyncMessage::Sync) => self.sync().await,
                        TaskMessage::Shutdown => {
                            info!("Policy sync task received shutdown signal");
                            break;
                        }
                    }
                }
                Some(()) = self.changes.recv() => {
                    debug!("Policy store changed");
                    self.sync().await;
                }
                else => {
                    info!("Policy sync task channels closed");
                    break;
                }
            }
        }

        info!(
            "Policy sync task stopped with {} policies",
            self.manager.store().len()
        );
    }
}
