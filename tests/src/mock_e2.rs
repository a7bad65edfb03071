//! Mock E2 termination for integration testing
//!
//! Records subscriptions and control requests made by the xApp and lets a
//! test push indications into any open subscription.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use tsxapp::{E2Transport, RawIndication, SouthboundError, SubscriptionSpec};
use tsxapp_e2::codec;
use tsxapp_e2::{ControlRequest, EventTrigger, HandoverControl, TriggerType};

/// Subscription channel depth
const STREAM_CAPACITY: usize = 64;

/// Mock E2 errors
#[derive(Debug, Error)]
pub enum MockE2Error {
    #[error("No subscription for node {node_id} trigger {trigger}")]
    NotSubscribed { node_id: String, trigger: TriggerType },
    #[error("Subscription closed by the xApp")]
    StreamClosed,
}

/// Events emitted by the mock E2 termination
#[derive(Debug, Clone)]
pub enum MockE2Event {
    /// xApp opened a subscription
    Subscribed {
        node_id: String,
        name: String,
        trigger: EventTrigger,
    },
    /// xApp sent a handover control request
    Control {
        node_id: String,
        control: HandoverControl,
    },
}

/// Mock E2 termination
pub struct MockE2Transport {
    streams: Mutex<HashMap<(String, TriggerType), mpsc::Sender<RawIndication>>>,
    controls: Mutex<Vec<ControlRequest>>,
    events_tx: mpsc::UnboundedSender<MockE2Event>,
    events_rx: Mutex<mpsc::UnboundedReceiver<MockE2Event>>,
    reject_subscriptions: bool,
}

impl MockE2Transport {
    /// Creates a mock accepting every subscription.
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            streams: Mutex::new(HashMap::new()),
            controls: Mutex::new(Vec::new()),
            events_tx,
            events_rx: Mutex::new(events_rx),
            reject_subscriptions: false,
        }
    }

    /// Creates a mock refusing every subscription.
    pub fn rejecting() -> Self {
        Self {
            reject_subscriptions: true,
            ..Self::new()
        }
    }

    /// Pushes an indication into an open subscription.
    pub async fn send_indication(
        &self,
        node_id: &str,
        trigger: TriggerType,
        indication: RawIndication,
    ) -> Result<(), MockE2Error> {
        let tx = self
            .streams
            .lock()
            .await
            .get(&(node_id.to_string(), trigger))
            .cloned()
            .ok_or_else(|| MockE2Error::NotSubscribed {
                node_id: node_id.to_string(),
                trigger,
            })?;
        tx.send(indication)
            .await
            .map_err(|_| MockE2Error::StreamClosed)
    }

    /// Number of open subscriptions.
    pub async fn subscription_count(&self) -> usize {
        self.streams.lock().await.len()
    }

    /// Control requests received so far.
    pub async fn controls(&self) -> Vec<ControlRequest> {
        self.controls.lock().await.clone()
    }

    /// Decoded handover controls received so far.
    pub async fn handovers(&self) -> Vec<HandoverControl> {
        self.controls
            .lock()
            .await
            .iter()
            .filter_map(|request| codec::decode_control_message(&request.message).ok())
            .collect()
    }

    /// Next event, waiting if none is queued.
    pub async fn next_event(&self) -> Option<MockE2Event> {
        self.events_rx.lock().await.recv().await
    }
}

impl Default for MockE2Transport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl E2Transport for MockE2Transport {
    async fn subscribe(
        &self,
        node_id: &str,
        spec: SubscriptionSpec,
    ) -> Result<mpsc::Receiver<RawIndication>, SouthboundError> {
        if self.reject_subscriptions {
            return Err(SouthboundError::Transport(format!(
                "subscription {} refused",
                spec.name
            )));
        }
        let trigger = codec::decode_event_trigger(&spec.event_trigger)
            .map_err(|e| SouthboundError::Transport(e.to_string()))?;

        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        self.streams
            .lock()
            .await
            .insert((node_id.to_string(), spec.trigger), tx);
        let _ = self.events_tx.send(MockE2Event::Subscribed {
            node_id: node_id.to_string(),
            name: spec.name,
            trigger,
        });
        Ok(rx)
    }

    async fn control(&self, request: ControlRequest) -> Result<(), SouthboundError> {
        let control = codec::decode_control_message(&request.message)
            .map_err(|e| SouthboundError::Transport(e.to_string()))?;
        let _ = self.events_tx.send(MockE2Event::Control {
            node_id: request.node_id.clone(),
            control,
        });
        self.controls.lock().await.push(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{gnb_ue, nr_cell, MeasReportBuilder, TEST_NODE};

    #[tokio::test]
    async fn test_indication_without_subscription() {
        let mock = MockE2Transport::new();
        let raw = MeasReportBuilder::new(gnb_ue(1), nr_cell(39))
            .serving(-80, 9)
            .build();
        assert!(matches!(
            mock.send_indication(TEST_NODE, TriggerType::Periodic, raw).await,
            Err(MockE2Error::NotSubscribed { .. })
        ));
    }

    #[tokio::test]
    async fn test_subscription_is_recorded() {
        let mock = MockE2Transport::new();
        let spec = SubscriptionSpec {
            name: "ts-PERIODIC".to_string(),
            trigger: TriggerType::Periodic,
            event_trigger: codec::encode_event_trigger(&EventTrigger {
                trigger_type: TriggerType::Periodic,
                reporting_period_ms: 1000,
            }),
        };
        let mut rx = mock.subscribe(TEST_NODE, spec).await.unwrap();
        assert_eq!(mock.subscription_count().await, 1);

        match mock.next_event().await {
            Some(MockE2Event::Subscribed { trigger, .. }) => {
                assert_eq!(trigger.reporting_period_ms, 1000);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let raw = MeasReportBuilder::new(gnb_ue(1), nr_cell(39))
            .serving(-80, 9)
            .build();
        mock.send_indication(TEST_NODE, TriggerType::Periodic, raw.clone())
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap(), raw);
    }
}
