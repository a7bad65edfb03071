//! A1-P policy lifecycle handler.
//!
//! Holds the raw policy documents per policy id:
//!
//! ```text
//!   ABSENT ──setup──► INSTALLED ──update──► INSTALLED
//!      ▲                  │
//!      └─────delete───────┘
//! ```
//!
//! Protocol failures (wrong type, duplicate or unknown id) are reported in
//! the result message; the calls themselves always complete. Setup, update
//! and delete signal the change notifier so the steering side can resync.
//! Every setup or update stamps the document with an arrival sequence so
//! the resync can replay changes in the order they were made.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use tsxapp_common::{log_a1_message, A1Config, Direction};
use uuid::Uuid;

use crate::messages::{
    A1Result, Header, PayloadType, PolicyAckMessage, PolicyRequestMessage, PolicyResultMessage,
    PolicyStatusMessage, ResultMessage, StatusMessage, ENFORCED_STATUS, NOT_ENFORCED_STATUS,
    REASON_ALREADY_EXISTS, REASON_NOT_FOUND, REASON_TYPE_NOT_SUPPORTED,
};
use crate::status::AckWatchers;

/// Pending status messages waiting for a status stream.
const STATUS_CHANNEL_CAPACITY: usize = 64;

/// Errors surfaced by the status stream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum A1Error {
    /// Another status stream is attached
    #[error("a policy status stream is already attached")]
    StatusStreamBusy,
}

/// Installed document and the sequence of its last setup or update.
#[derive(Debug, Clone)]
struct Installed {
    seq: u64,
    document: Bytes,
}

/// Handler for the A1-P policy service.
pub struct A1PolicyServer {
    policy_type_id: String,
    not_enforced_policy_id: String,
    policies: Mutex<BTreeMap<String, Installed>>,
    next_seq: AtomicU64,
    notifier: mpsc::Sender<()>,
    status_tx: mpsc::Sender<PolicyStatusMessage>,
    status_rx: Mutex<Option<mpsc::Receiver<PolicyStatusMessage>>>,
    watchers: AckWatchers,
}

impl A1PolicyServer {
    /// Creates a handler signalling policy changes on `notifier`.
    ///
    /// The notifier is only ever `try_send`-ed: a full channel means a
    /// resync is already pending.
    pub fn new(config: &A1Config, notifier: mpsc::Sender<()>) -> Self {
        let (status_tx, status_rx) = mpsc::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            policy_type_id: config.policy_type_id(),
            not_enforced_policy_id: config.not_enforced_policy_id.clone(),
            policies: Mutex::new(BTreeMap::new()),
            next_seq: AtomicU64::new(0),
            notifier,
            status_tx,
            status_rx: Mutex::new(Some(status_rx)),
            watchers: AckWatchers::new(config.ack_timeout()),
        }
    }

    /// Supported policy type id.
    pub fn policy_type_id(&self) -> &str {
        &self.policy_type_id
    }

    /// Copy of every installed policy document, ordered by id.
    pub async fn snapshot(&self) -> BTreeMap<String, Bytes> {
        self.policies
            .lock()
            .await
            .iter()
            .map(|(id, installed)| (id.clone(), installed.document.clone()))
            .collect()
    }

    /// Copy of every installed policy document, oldest setup or update
    /// first.
    pub async fn snapshot_by_arrival(&self) -> Vec<(String, Bytes)> {
        let policies = self.policies.lock().await;
        let mut ordered: Vec<_> = policies.iter().collect();
        ordered.sort_by_key(|(_, installed)| installed.seq);
        ordered
            .into_iter()
            .map(|(id, installed)| (id.clone(), installed.document.clone()))
            .collect()
    }

    /// Status messages still waiting for an acknowledgement.
    pub async fn pending_acks(&self) -> usize {
        self.watchers.pending().await
    }

    /// Installs a new policy.
    pub async fn create_policy(&self, request: PolicyRequestMessage) -> PolicyResultMessage {
        log_a1_message(Direction::Rx, "PolicySetup", &request.message.payload);
        let mut policies = self.policies.lock().await;

        if let Some(rejected) = self.check_type(&request) {
            return rejected;
        }
        if policies.contains_key(&request.policy_id) {
            warn!(policy_id = %request.policy_id, "Setup of existing policy rejected");
            return reply_failed(&request, REASON_ALREADY_EXISTS);
        }

        let payload = request.message.payload.clone();
        policies.insert(
            request.policy_id.clone(),
            Installed {
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                document: payload.clone(),
            },
        );
        info!(policy_id = %request.policy_id, "Policy installed");

        self.emit_status(&request);
        self.notify_change();
        reply_ok(&request, payload).with_destination(&request)
    }

    /// Replaces the document of an installed policy.
    pub async fn update_policy(&self, request: PolicyRequestMessage) -> PolicyResultMessage {
        log_a1_message(Direction::Rx, "PolicyUpdate", &request.message.payload);
        let mut policies = self.policies.lock().await;

        if let Some(rejected) = self.check_type(&request) {
            return rejected;
        }
        let Some(slot) = policies.get_mut(&request.policy_id) else {
            warn!(policy_id = %request.policy_id, "Update of unknown policy rejected");
            return reply_failed(&request, REASON_NOT_FOUND);
        };

        *slot = Installed {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            document: request.message.payload.clone(),
        };
        info!(policy_id = %request.policy_id, "Policy updated");

        self.emit_status(&request);
        self.notify_change();
        reply_ok(&request, request.message.payload.clone()).with_destination(&request)
    }

    /// Removes an installed policy.
    pub async fn delete_policy(&self, request: PolicyRequestMessage) -> PolicyResultMessage {
        let mut policies = self.policies.lock().await;

        if let Some(rejected) = self.check_type(&request) {
            return rejected;
        }
        if policies.remove(&request.policy_id).is_none() {
            warn!(policy_id = %request.policy_id, "Delete of unknown policy rejected");
            return reply_failed(&request, REASON_NOT_FOUND);
        }
        info!(policy_id = %request.policy_id, "Policy deleted");

        self.notify_change();
        reply_ok(&request, Bytes::new())
    }

    /// Lists installed ids (empty policy id), or returns one policy's
    /// document or status depending on the requested payload type.
    pub async fn query_policy(&self, request: PolicyRequestMessage) -> PolicyResultMessage {
        let policies = self.policies.lock().await;

        if let Some(rejected) = self.check_type(&request) {
            return rejected;
        }

        if request.policy_id.is_empty() {
            let ids: Vec<&String> = policies.keys().collect();
            let listing = match serde_json::to_vec(&ids) {
                Ok(listing) => Bytes::from(listing),
                Err(e) => {
                    error!("Failed to encode policy id list: {}", e);
                    Bytes::new()
                }
            };
            return reply_ok(&request, listing);
        }

        let Some(installed) = policies.get(&request.policy_id) else {
            return reply_failed(&request, REASON_NOT_FOUND);
        };

        match request.message.header.payload_type {
            PayloadType::Policy => reply_ok(&request, installed.document.clone()),
            PayloadType::Status => reply_ok(&request, self.status_payload(&request.policy_id)),
        }
    }

    /// Runs the status/ack exchange until `outbound` closes.
    ///
    /// Every status message produced by setup/update is forwarded on
    /// `outbound` and tracked until an ack with the same request id arrives
    /// on `inbound`, or the ack timeout expires.
    pub async fn policy_status(
        &self,
        outbound: mpsc::Sender<PolicyStatusMessage>,
        mut inbound: mpsc::Receiver<PolicyAckMessage>,
    ) -> Result<(), A1Error> {
        let mut status_rx = self
            .status_rx
            .lock()
            .await
            .take()
            .ok_or(A1Error::StatusStreamBusy)?;
        info!("Policy status stream attached");

        let ack_watchers = self.watchers.clone();
        let ack_task = tokio::spawn(async move {
            while let Some(ack) = inbound.recv().await {
                debug!(request_id = %ack.request_id(), "Policy ack received");
                ack_watchers.broadcast(ack).await;
            }
        });

        loop {
            tokio::select! {
                _ = outbound.closed() => break,
                status = status_rx.recv() => {
                    let Some(status) = status else { break };
                    let request_id = status.message.header.request_id.clone();
                    let watcher_id = self.watchers.watch(request_id).await;
                    log_a1_message(Direction::Tx, "PolicyStatus", &status.message.payload);
                    if let Err(e) = outbound.send(status).await {
                        error!("Failed to send policy status: {}", e);
                        self.watchers.remove(&watcher_id).await;
                        break;
                    }
                }
            }
        }

        ack_task.abort();
        *self.status_rx.lock().await = Some(status_rx);
        info!("Policy status stream detached");
        Ok(())
    }

    fn check_type(&self, request: &PolicyRequestMessage) -> Option<PolicyResultMessage> {
        if request.policy_type.id == self.policy_type_id {
            return None;
        }
        warn!(policy_type = %request.policy_type.id, "Unsupported policy type");
        Some(reply_failed(request, REASON_TYPE_NOT_SUPPORTED))
    }

    fn status_payload(&self, policy_id: &str) -> Bytes {
        if policy_id == self.not_enforced_policy_id {
            Bytes::from_static(NOT_ENFORCED_STATUS.as_bytes())
        } else {
            Bytes::from_static(ENFORCED_STATUS.as_bytes())
        }
    }

    fn emit_status(&self, request: &PolicyRequestMessage) {
        if request.notification_destination.is_empty() {
            return;
        }
        let status = PolicyStatusMessage {
            policy_id: request.policy_id.clone(),
            policy_type: request.policy_type.clone(),
            message: StatusMessage {
                header: Header {
                    request_id: Uuid::new_v4().to_string(),
                    app_id: request.message.header.app_id.clone(),
                    encoding: request.message.header.encoding,
                    payload_type: PayloadType::Status,
                },
                payload: self.status_payload(&request.policy_id),
            },
            notification_destination: request.notification_destination.clone(),
        };

        match self.status_tx.try_send(status) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(status)) => {
                warn!(policy_id = %status.policy_id, "Policy status dropped, status queue full");
            }
            Err(mpsc::error::TrySendError::Closed(status)) => {
                warn!(policy_id = %status.policy_id, "Policy status dropped, status channel closed");
            }
        }
    }

    fn notify_change(&self) {
        match self.notifier.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
            Err(mpsc::error::TrySendError::Closed(())) => {
                warn!("Policy change notifier closed");
            }
        }
    }
}

fn reply(request: &PolicyRequestMessage, payload: Bytes, result: A1Result) -> PolicyResultMessage {
    let header = &request.message.header;
    PolicyResultMessage {
        policy_id: request.policy_id.clone(),
        policy_type: request.policy_type.clone(),
        message: ResultMessage {
            header: Header {
                request_id: header.request_id.clone(),
                app_id: header.app_id.clone(),
                encoding: header.encoding,
                payload_type: header.payload_type,
            },
            payload,
            result,
        },
        notification_destination: String::new(),
    }
}

fn reply_ok(request: &PolicyRequestMessage, payload: Bytes) -> PolicyResultMessage {
    reply(request, payload, A1Result::ok())
}

fn reply_failed(request: &PolicyRequestMessage, reason: &str) -> PolicyResultMessage {
    reply(request, request.message.payload.clone(), A1Result::failed(reason))
}

impl PolicyResultMessage {
    fn with_destination(mut self, request: &PolicyRequestMessage) -> Self {
        self.notification_destination = request.notification_destination.clone();
        self
    }
}
