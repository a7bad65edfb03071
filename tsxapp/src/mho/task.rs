//! MHO task: receives indications from every subscription and hands each one
//! to the controller on its own worker.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use super::controller::{report_failure, MhoController};
use crate::tasks::{MhoMessage, Task, TaskMessage};

/// Indication intake.
pub struct MhoTask {
    controller: Arc<MhoController>,
    processed: u64,
}

impl MhoTask {
    /// Creates the task around a shared controller.
    pub fn new(controller: Arc<MhoController>) -> Self {
        Self {
            controller,
            processed: 0,
        }
    }

    fn dispatch(&mut self, msg: MhoMessage) {
        match msg {
            MhoMessage::Indication(indication) => {
                self.processed += 1;
                let controller = self.controller.clone();
                tokio::spawn(async move {
                    if let Err(e) = controller.handle_indication(&indication).await {
                        report_failure(&indication, &e);
                    }
                });
            }
        }
    }
}

#[async_trait::async_trait]
impl Task for MhoTask {
    type Message = MhoMessage;

    async fn run(&mut self, mut rx: mpsc::Receiver<TaskMessage<Self::Message>>) {
        info!("MHO task started");

        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    match msg {
                        TaskMessage::Message(mho_msg) => self.dispatch(mho_msg),
                        TaskMessage::Shutdown => {
                            info!("MHO task received shutdown signal");
                            break;
                        }
                    }
                }
                else => {
                    info!("MHO task channel closed");
                    break;
                }
            }
        }

        info!(
            "MHO task stopped after {} indications, tracking {} UEs",
            self.processed,
            self.controller.ues().len()
        );
    }
}
