//! Southbound E2 plumbing.
//!
//! For every E2 node advertising the MHO service model the manager opens
//! one subscription per trigger kind and forwards whatever arrives on it to
//! the MHO task, tagged with node id and trigger:
//!
//! ```text
//!   E2Transport::subscribe(node, PERIODIC)           ──┐
//!   E2Transport::subscribe(node, UPON_RCV_MEAS_REPORT)──┼──► forwarder ──► MHO task
//!   E2Transport::subscribe(node, UPON_CHANGE_RRC)     ──┘
//!
//!   steering ──► ControlDispatchTask ──► E2Transport::control
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use tsxapp_common::{log_e2_message, Direction, XappConfig};
use tsxapp_e2::codec;
use tsxapp_e2::{
    ControlRequest, E2Indication, EventTrigger, TriggerType, SERVICE_MODEL_OID,
};

use crate::rnib::{Rnib, RnibError};
use crate::tasks::{ControlMessage, MhoMessage, Task, TaskHandle, TaskMessage};

/// Indications buffered per subscription.
const SUBSCRIPTION_CAPACITY: usize = 64;

/// Southbound failures.
#[derive(Debug, Error)]
pub enum SouthboundError {
    /// Node does not advertise the service model
    #[error("E2 node {node_id} does not support {service_model}")]
    ServiceModelUnsupported {
        /// Node id
        node_id: String,
        /// Required service model
        service_model: String,
    },

    /// Topology lookup failed
    #[error(transparent)]
    Rnib(#[from] RnibError),

    /// Transport rejected the request
    #[error("E2 transport error: {0}")]
    Transport(String),
}

/// Subscription request handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSpec {
    /// Subscription name
    pub name: String,
    /// Trigger kind
    pub trigger: TriggerType,
    /// Encoded event trigger definition
    pub event_trigger: Bytes,
}

/// Indication as it comes off a subscription stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIndication {
    /// Encoded indication header
    pub header: Bytes,
    /// Encoded indication message
    pub payload: Bytes,
}

/// E2 termination client.
#[async_trait::async_trait]
pub trait E2Transport: Send + Sync {
    /// Opens a subscription and returns its indication stream.
    async fn subscribe(
        &self,
        node_id: &str,
        spec: SubscriptionSpec,
    ) -> Result<mpsc::Receiver<RawIndication>, SouthboundError>;

    /// Sends a control request to its node.
    async fn control(&self, request: ControlRequest) -> Result<(), SouthboundError>;
}

/// Subscribes E2 nodes and feeds their indications to the MHO task.
pub struct SouthboundManager {
    transport: Arc<dyn E2Transport>,
    rnib: Arc<dyn Rnib>,
    intake: TaskHandle<MhoMessage>,
    app_id: String,
    service_model: String,
    reporting_period_ms: u32,
}

impl SouthboundManager {
    /// Creates a manager.
    pub fn new(
        config: &XappConfig,
        transport: Arc<dyn E2Transport>,
        rnib: Arc<dyn Rnib>,
        intake: TaskHandle<MhoMessage>,
    ) -> Self {
        Self {
            transport,
            rnib,
            intake,
            app_id: config.app_id.clone(),
            service_model: config.service_model.name.clone(),
            reporting_period_ms: u32::try_from(config.reporting_period_ms).unwrap_or(u32::MAX),
        }
    }

    /// Event trigger definition for `trigger`. Only periodic reports carry
    /// a reporting period.
    pub fn event_trigger(&self, trigger: TriggerType) -> Bytes {
        let reporting_period_ms = match trigger {
            TriggerType::Periodic => self.reporting_period_ms,
            _ => 0,
        };
        codec::encode_event_trigger(&EventTrigger {
            trigger_type: trigger,
            reporting_period_ms,
        })
    }

    /// Subscription name for `trigger`.
    pub fn subscription_name(&self, trigger: TriggerType) -> String {
        format!("{}-subscription-{}", self.app_id, trigger)
    }

    /// Fails unless the node advertises the MHO service model.
    pub async fn check_service_model(&self, node_id: &str) -> Result<(), SouthboundError> {
        let aspects = self.rnib.get_node_aspects(node_id).await?;
        let supported = aspects
            .service_models
            .values()
            .any(|sm| sm.name.to_lowercase() == self.service_model && sm.oid == SERVICE_MODEL_OID);
        if supported {
            Ok(())
        } else {
            Err(SouthboundError::ServiceModelUnsupported {
                node_id: node_id.to_string(),
                service_model: self.service_model.clone(),
            })
        }
    }

    /// Opens the three subscriptions on one node. Returns how many opened.
    pub async fn subscribe_node(&self, node_id: &str) -> Result<usize, SouthboundError> {
        self.check_service_model(node_id).await?;

        let mut opened = 0;
        for trigger in TriggerType::ALL {
            let spec = SubscriptionSpec {
                name: self.subscription_name(trigger),
                trigger,
                event_trigger: self.event_trigger(trigger),
            };
            match self.transport.subscribe(node_id, spec).await {
                Ok(stream) => {
                    self.forward(node_id.to_string(), trigger, stream);
                    opened += 1;
                }
                Err(e) => warn!(node_id, %trigger, "Subscription failed: {}", e),
            }
        }
        info!(node_id, opened, "E2 node subscribed");
        Ok(opened)
    }

    /// Subscribes every node the topology knows. Returns the nodes that
    /// ended up with at least one subscription.
    pub async fn connect_all(&self) -> Result<Vec<String>, SouthboundError> {
        let mut connected = Vec::new();
        for node_id in self.rnib.e2_nodes().await? {
            match self.subscribe_node(&node_id).await {
                Ok(0) => {}
                Ok(_) => connected.push(node_id),
                Err(e) => warn!(node_id = %node_id, "Skipping E2 node: {}", e),
            }
        }
        Ok(connected)
    }

    fn forward(&self, node_id: String, trigger: TriggerType, mut stream: mpsc::Receiver<RawIndication>) {
        let intake = self.intake.clone();
        tokio::spawn(async move {
            while let Some(raw) = stream.recv().await {
                let indication = E2Indication {
                    node_id: node_id.clone(),
                    trigger,
                    header: raw.header,
                    payload: raw.payload,
                };
                if intake.send(MhoMessage::Indication(indication)).await.is_err() {
                    debug!(node_id = %node_id, %trigger, "MHO task gone, closing subscription stream");
                    return;
                }
            }
            debug!(node_id = %node_id, %trigger, "Subscription stream ended");
        });
    }
}

/// Delivers control requests produced by steering.
pub struct ControlDispatchTask {
    transport: Arc<dyn E2Transport>,
    sent: u64,
}

impl ControlDispatchTask {
    /// Creates the task.
    pub fn new(transport: Arc<dyn E2Transport>) -> Self {
        Self { transport, sent: 0 }
    }

    fn dispatch(&mut self, request: ControlRequest) {
        self.sent += 1;
        log_e2_message(Direction::Tx, "ControlRequest", &request.message);
        let transport = self.transport.clone();
        tokio::spawn(async move {
            let node_id = request.node_id.clone();
            if let Err(e) = transport.control(request).await {
                warn!(node_id = %node_id, "Control request failed: {}", e);
            }
        });
    }
}

#[async_trait::async_trait]
impl Task for ControlDispatchTask {
    type Message = ControlMessage;

    async fn run(&mut self, mut rx: mpsc::Receiver<TaskMessage<Self::Message>>) {
        info!("Control dispatch task started");

        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    match msg {
                        TaskMessage::Message(ControlMessage::Send(request)) => self.dispatch(request),
                        TaskMessage::Shutdown => {
                            info!("Control dispatch task received shutdown signal");
                            break;
                        }
                    }
                }
                else => {
                    info!("Control dispatch task channel closed");
                    break;
                }
            }
        }

        info!("Control dispatch task stopped after {} requests", self.sent);
    }
}

/// In-process transport: indications are injected by the caller and control
/// requests are queued for inspection.
pub struct LoopbackTransport {
    streams: Mutex<HashMap<(String, TriggerType), mpsc::Sender<RawIndication>>>,
    controls: mpsc::UnboundedSender<ControlRequest>,
}

impl LoopbackTransport {
    /// Creates the transport and the receiver of its control requests.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ControlRequest>) {
        let (controls, rx) = mpsc::unbounded_channel();
        (
            Self {
                streams: Mutex::new(HashMap::new()),
                controls,
            },
            rx,
        )
    }

    /// Pushes an indication into the matching subscription. False when the
    /// node has no open subscription for `trigger`.
    pub async fn inject(&self, node_id: &str, trigger: TriggerType, indication: RawIndication) -> bool {
        let tx = self
            .streams
            .lock()
            .await
            .get(&(node_id.to_string(), trigger))
            .cloned();
        match tx {
            Some(tx) => tx.send(indication).await.is_ok(),
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl E2Transport for LoopbackTransport {
    async fn subscribe(
        &self,
        node_id: &str,
        spec: SubscriptionSpec,
    ) -> Result<mpsc::Receiver<RawIndication>, SouthboundError> {
        codec::decode_event_trigger(&spec.event_trigger)
            .map_err(|e| SouthboundError::Transport(e.to_string()))?;
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        self.streams
            .lock()
            .await
            .insert((node_id.to_string(), spec.trigger), tx);
        debug!(node_id, name = %spec.name, "Loopback subscription opened");
        Ok(rx)
    }

    async fn control(&self, request: ControlRequest) -> Result<(), SouthboundError> {
        self.controls
            .send(request)
            .map_err(|_| SouthboundError::Transport("control receiver dropped".to_string()))
    }
}
