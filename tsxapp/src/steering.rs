//! Steering orchestrator.
//!
//! Each pass walks the UEs in key order, scores every measured cell against
//! the enforced policies and hands the UE over when the winner is not its
//! serving cell:
//!
//! ```text
//!   UE ──► scope ──► candidates ──► best cell ──► same as serving? ──► done
//!                                                     │ no
//!                                                     ▼
//!                                build control request (abort on failure)
//!                                counters, re-attach, send to E2 node
//! ```
//!
//! The store changes of a handover run under the indication processor's
//! lock, so an indication never interleaves with a re-attach.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use tsxapp_a1::{CId, CellId, PlmnId, Scope};
use tsxapp_e2::codec::{self, E2CodecError};
use tsxapp_e2::{
    CellIdentity, Cgi, ControlHeader, ControlRequest, HandoverControl, DEFAULT_CONTROL_PRIORITY,
};

use crate::mho::{MhoController, UeData};
use crate::policy::{matcher, PolicyManager};
use crate::store::StoreError;
use crate::tasks::{ControlMessage, SteeringMessage, Task, TaskHandle, TaskMessage};

/// Errors raised while handing a UE over.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Control header or message could not be encoded
    #[error("cannot encode control request: {0}")]
    Encode(#[from] E2CodecError),

    /// Store integrity fault
    #[error(transparent)]
    Store(#[from] StoreError),

    /// UE has no serving cell
    #[error("UE {0} has no serving cell")]
    NoServingCell(String),

    /// Target cell is not known
    #[error("unknown target cell {0}")]
    UnknownCell(String),

    /// UE has no E2 node to address
    #[error("UE {0} has no E2 node")]
    NoNode(String),

    /// UE changed serving cell while the decision was made
    #[error("UE {0} moved before the handover was applied")]
    Stale(String),
}

/// Outcome of one steering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SteeringReport {
    /// UEs scored
    pub evaluated: usize,
    /// UEs without candidates
    pub skipped: usize,
    /// Handovers issued
    pub handovers: usize,
    /// Handovers abandoned
    pub failed: usize,
}

/// Policy cell identity of a radio cell.
pub fn cell_id_of(cgi: &Cgi) -> CellId {
    let c_id = match cgi.cell {
        CellIdentity::Nr(nci) => CId {
            nci: i64::try_from(nci).ok(),
            eci: None,
        },
        CellIdentity::Eutra(eci) => CId {
            nci: None,
            eci: Some(i64::from(eci)),
        },
    };
    CellId {
        plmn_id: PlmnId::from(&cgi.plmn),
        c_id,
    }
}

/// Scope a UE is matched under.
pub fn ue_scope(ue: &UeData) -> Scope {
    Scope {
        slice_id: Some(ue.slice.clone()),
        ue_id: Some(ue.ue_id.clone()),
        qos_id: Some(matcher::ue_qos(ue.five_qi)),
        cell_id: ue.cgi.as_ref().map(cell_id_of),
    }
}

/// Runs steering passes and issues handovers.
pub struct SteeringManager {
    controller: Arc<MhoController>,
    policies: Arc<PolicyManager>,
    control: TaskHandle<ControlMessage>,
    lock: Mutex<()>,
}

impl SteeringManager {
    /// Creates a manager sending control requests to `control`.
    pub fn new(
        controller: Arc<MhoController>,
        policies: Arc<PolicyManager>,
        control: TaskHandle<ControlMessage>,
    ) -> Self {
        Self {
            controller,
            policies,
            control,
            lock: Mutex::new(()),
        }
    }

    /// One pass over every UE.
    pub async fn deploy_policies(&self) -> SteeringReport {
        let _guard = self.lock.lock().await;
        let policies = self.policies.policies();
        let mut report = SteeringReport::default();

        for entry in self.controller.ues().entries() {
            let ue = entry.value;
            if ue.cgi_table.is_empty() {
                report.skipped += 1;
                continue;
            }

            let scope = ue_scope(&ue);
            let (keys, candidates): (Vec<&String>, Vec<(CellId, i32)>) = ue
                .cgi_table
                .iter()
                .map(|(key, cgi)| {
                    let rsrp = ue.rsrp_table.get(key).copied().unwrap_or_default();
                    (key, (cell_id_of(cgi), rsrp))
                })
                .unzip();

            report.evaluated += 1;
            let Some(best) = matcher::get_ts_result_for_ue(&scope, &candidates, &policies) else {
                report.skipped += 1;
                continue;
            };

            let target = keys[best.index].clone();
            if target == ue.cgi_string {
                continue;
            }

            match self.switch_ue_between_cells(ue, &target).await {
                Ok(()) => report.handovers += 1,
                Err(e) => {
                    warn!("Handover abandoned: {}", e);
                    report.failed += 1;
                }
            }
        }

        debug!(
            evaluated = report.evaluated,
            skipped = report.skipped,
            handovers = report.handovers,
            failed = report.failed,
            "Steering pass complete"
        );
        report
    }

    /// Hands `ue` over to `target`. The control request is built first so a
    /// failure leaves the stores untouched.
    pub async fn switch_ue_between_cells(&self, ue: UeData, target: &str) -> Result<(), ControlError> {
        let serving_cgi = ue
            .cgi
            .ok_or_else(|| ControlError::NoServingCell(ue.ue_id.clone()))?;
        let target_cgi = match ue.cgi_table.get(target) {
            Some(cgi) => *cgi,
            None => self
                .controller
                .cells()
                .value(target)?
                .map(|cell| cell.cgi)
                .ok_or_else(|| ControlError::UnknownCell(target.to_string()))?,
        };
        if ue.e2_node_id.is_empty() {
            return Err(ControlError::NoNode(ue.ue_id.clone()));
        }

        let request = ControlRequest {
            node_id: ue.e2_node_id.clone(),
            header: codec::encode_control_header(&ControlHeader {
                serving_cgi,
                priority: DEFAULT_CONTROL_PRIORITY,
            })?,
            message: codec::encode_control_message(&HandoverControl {
                serving_cgi,
                ue_id: ue.identity,
                target_cgi,
            })?,
        };

        let source = ue.cgi_string.clone();
        let Some(moved) = self
            .controller
            .move_ue(&ue.ue_id, &source, target, target_cgi)
            .await?
        else {
            return Err(ControlError::Stale(ue.ue_id));
        };

        info!(
            "UE [ID:{}, 5QI:{}] switched between cells [{} -> {}]",
            moved.ue_id, moved.five_qi, source, target
        );

        let control = self.control.clone();
        tokio::spawn(async move {
            if control.send(ControlMessage::Send(request)).await.is_err() {
                warn!("Control dispatch task not running, handover request dropped");
            }
        });
        Ok(())
    }
}

/// Periodic and policy-driven steering.
pub struct SteeringTask {
    manager: Arc<SteeringManager>,
    policies: Arc<PolicyManager>,
    interval: Duration,
    start_delay: Duration,
    announce_default: bool,
}

impl SteeringTask {
    /// Creates the task. The first periodic pass runs after `start_delay`.
    pub fn new(
        manager: Arc<SteeringManager>,
        policies: Arc<PolicyManager>,
        interval: Duration,
        start_delay: Duration,
    ) -> Self {
        Self {
            manager,
            policies,
            interval,
            start_delay,
            announce_default: true,
        }
    }

    async fn evaluate(&mut self, announce: bool) {
        if announce && self.policies.store().is_empty() {
            info!("Default policy applied");
        }
        self.manager.deploy_policies().await;
    }
}

#[async_trait::async_trait]
impl Task for SteeringTask {
    type Message = SteeringMessage;

    async fn run(&mut self, mut rx: mpsc::Receiver<TaskMessage<Self::Message>>) {
        info!(
            "Steering task started, first pass in {:?}, then every {:?}",
            self.start_delay, self.interval
        );
        let mut ticker = interval_at(Instant::now() + self.start_delay, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let announce = std::mem::take(&mut self.announce_default);
                    self.evaluate(announce).await;
                }
                Some(msg) = rx.recv() => {
                    match msg {
                        TaskMessage::Message(SteeringMessage::Evaluate) => self.evaluate(false).await,
                        TaskMessage::Message(SteeringMessage::PolicyChanged) => self.evaluate(true).await,
                        TaskMessage::Shutdown => {
                            info!("Steering task received shutdown signal");
                            break;
                        }
                    }
                }
                else => {
                    info!("Steering task channel closed");
                    break;
                }
            }
        }

        info!("Steering task stopped");
    }
}
