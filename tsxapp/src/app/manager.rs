//! Component wiring and lifecycle.
//!
//! ```text
//!   E2Transport ──► SouthboundManager ──► MhoTask ──► MhoController (UE/cell stores)
//!                                                          │
//!   A1PolicyServer ──notifier──► PolicySyncTask ──► PolicyManager
//!                                      │                   │
//!                                      ▼                   ▼
//!                                SteeringTask ──► SteeringManager ──► ControlDispatchTask ──► E2Transport
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use tsxapp_a1::{A1PolicyServer, SchemaValidator, StructuralValidator};
use tsxapp_common::XappConfig;

use super::display::DisplayTask;
use crate::mho::{MhoController, MhoTask};
use crate::policy::{PolicyManager, PolicySyncTask};
use crate::rnib::Rnib;
use crate::southbound::{ControlDispatchTask, E2Transport, SouthboundError, SouthboundManager};
use crate::steering::{SteeringManager, SteeringTask};
use crate::tasks::{
    DisplayMessage, SteeringMessage, Task, TaskError, TaskId, TaskManager, TaskState,
    XappTaskBase, DEFAULT_CHANNEL_CAPACITY,
};

/// Capacity of the A1 change notifier. A pending signal already covers any
/// later change.
const NOTIFIER_CAPACITY: usize = 1;

/// Running xApp.
pub struct XappManager {
    task_manager: TaskManager,
    controller: Arc<MhoController>,
    policies: Arc<PolicyManager>,
    steering: Arc<SteeringManager>,
    a1: Arc<A1PolicyServer>,
    southbound: Arc<SouthboundManager>,
}

impl XappManager {
    /// Builds every component and spawns every task, validating policies
    /// structurally.
    pub fn start(config: XappConfig, transport: Arc<dyn E2Transport>, rnib: Arc<dyn Rnib>) -> Self {
        Self::start_with_validator(config, transport, rnib, Box::new(StructuralValidator))
    }

    /// Builds every component and spawns every task.
    pub fn start_with_validator(
        config: XappConfig,
        transport: Arc<dyn E2Transport>,
        rnib: Arc<dyn Rnib>,
        validator: Box<dyn SchemaValidator>,
    ) -> Self {
        let (mut task_manager, receivers) = TaskManager::new(config, DEFAULT_CHANNEL_CAPACITY);
        let base = task_manager.task_base();
        let config = base.config.clone();

        let controller = Arc::new(MhoController::new(
            config.plmn_encoding,
            config.topo_ids_enabled,
            &config.default_slice,
        ));
        let policies = Arc::new(PolicyManager::new(config.a1.schema_path.clone(), validator));
        let steering = Arc::new(SteeringManager::new(
            controller.clone(),
            policies.clone(),
            base.control_tx.clone(),
        ));
        let (notifier, changes) = mpsc::channel(NOTIFIER_CAPACITY);
        let a1 = Arc::new(A1PolicyServer::new(&config.a1, notifier));
        let southbound = Arc::new(SouthboundManager::new(
            &config,
            transport.clone(),
            rnib.clone(),
            base.mho_tx.clone(),
        ));

        let mut mho_task = MhoTask::new(controller.clone());
        let rx = receivers.mho_rx;
        let handle = tokio::spawn(async move {
            mho_task.run(rx).await;
            Ok::<(), TaskError>(())
        });
        task_manager.register_task_handle(TaskId::Mho, handle);
        info!("MHO task spawned");

        let mut steering_task = SteeringTask::new(
            steering.clone(),
            policies.clone(),
            config.steering_interval(),
            config.steering_start_delay(),
        );
        let rx = receivers.steering_rx;
        let handle = tokio::spawn(async move {
            steering_task.run(rx).await;
            Ok::<(), TaskError>(())
        });
        task_manager.register_task_handle(TaskId::Steering, handle);
        info!("Steering task spawned");

        let mut sync_task = PolicySyncTask::new(
            a1.clone(),
            policies.clone(),
            changes,
            base.steering_tx.clone(),
        );
        let rx = receivers.policy_sync_rx;
        let handle = tokio::spawn(async move {
            sync_task.run(rx).await;
            Ok::<(), TaskError>(())
        });
        task_manager.register_task_handle(TaskId::PolicySync, handle);
        info!("Policy sync task spawned");

        let mut display_task = DisplayTask::new(controller.clone(), rnib, config.display_interval());
        let rx = receivers.display_rx;
        let handle = tokio::spawn(async move {
            display_task.run(rx).await;
            Ok::<(), TaskError>(())
        });
        task_manager.register_task_handle(TaskId::Display, handle);
        info!("Display task spawned");

        let mut control_task = ControlDispatchTask::new(transport);
        let rx = receivers.control_rx;
        let handle = tokio::spawn(async move {
            control_task.run(rx).await;
            Ok::<(), TaskError>(())
        });
        task_manager.register_task_handle(TaskId::ControlDispatch, handle);
        info!("Control dispatch task spawned");

        Self {
            task_manager,
            controller,
            policies,
            steering,
            a1,
            southbound,
        }
    }

    /// Subscribes one E2 node.
    pub async fn connect_node(&self, node_id: &str) -> Result<usize, SouthboundError> {
        self.southbound.subscribe_node(node_id).await
    }

    /// Subscribes every E2 node the topology knows.
    pub async fn connect_nodes(&self) -> Result<Vec<String>, SouthboundError> {
        self.southbound.connect_all().await
    }

    /// Northbound A1 handler.
    pub fn a1(&self) -> &Arc<A1PolicyServer> {
        &self.a1
    }

    /// UE and cell state.
    pub fn controller(&self) -> &Arc<MhoController> {
        &self.controller
    }

    /// Installed policies.
    pub fn policies(&self) -> &Arc<PolicyManager> {
        &self.policies
    }

    /// Steering orchestrator.
    pub fn steering(&self) -> &Arc<SteeringManager> {
        &self.steering
    }

    /// Channels to every task.
    pub fn task_base(&self) -> XappTaskBase {
        self.task_manager.task_base()
    }

    /// Requests a steering pass now.
    pub async fn request_steering(&self) -> bool {
        self.task_base()
            .steering_tx
            .send(SteeringMessage::Evaluate)
            .await
            .is_ok()
    }

    /// Requests a state dump now.
    pub async fn request_display(&self) -> bool {
        self.task_base()
            .display_tx
            .send(DisplayMessage::Refresh)
            .await
            .is_ok()
    }

    /// Task states.
    pub fn status_summary(&self) -> Vec<(TaskId, TaskState)> {
        self.task_manager.status_summary()
    }

    /// Receiver flipped to true when shutdown starts.
    pub fn shutdown_receiver(&self) -> tokio::sync::watch::Receiver<bool> {
        self.task_manager.shutdown_receiver()
    }

    /// Stops every task.
    pub async fn shutdown(&mut self) -> Result<(), TaskError> {
        info!("Shutting down xApp tasks");
        self.task_manager.shutdown().await
    }
}
