//! xApp Task Framework
//!
//! Actor-style tasks exchanging typed messages over bounded channels.
//!
//! # Tasks
//!
//! - **MHO Task**: decodes E2SM-MHO indications and updates UE/cell state
//! - **Steering Task**: periodic and policy-driven handover evaluation
//! - **Policy Sync Task**: mirrors A1 policy changes into the policy store
//! - **Display Task**: periodic state dump
//! - **Control Dispatch Task**: delivers handover control requests southbound
//!
//! ```text
//!   E2 node ──indication──► MHO ──state──► stores ◄──read── Steering ──control──► Control Dispatch ──► E2 node
//!                                                              ▲
//!   A1 ──change signal──► Policy Sync ──────PolicyChanged──────┘
//! ```
//!
//! # Task Lifecycle
//!
//! 1. **Created**: instantiated, not yet running
//! 2. **Running**: processing messages
//! 3. **Stopping**: shutdown requested
//! 4. **Stopped**: terminated
//! 5. **Failed**: terminated with an error

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use tsxapp_common::XappConfig;
use tsxapp_e2::{ControlRequest, E2Indication};

// ============================================================================
// Task Message Envelope
// ============================================================================

/// Message envelope carrying either a payload or a shutdown signal.
#[derive(Debug)]
pub enum TaskMessage<T> {
    /// Regular message payload
    Message(T),
    /// Shutdown signal - task should terminate gracefully
    Shutdown,
}

impl<T> TaskMessage<T> {
    /// Wraps a payload.
    pub fn message(msg: T) -> Self {
        TaskMessage::Message(msg)
    }

    /// Creates a shutdown signal.
    pub fn shutdown() -> Self {
        TaskMessage::Shutdown
    }

    /// Returns true if this is a shutdown signal.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, TaskMessage::Shutdown)
    }

    /// Returns the payload, or None for shutdown.
    pub fn into_message(self) -> Option<T> {
        match self {
            TaskMessage::Message(msg) => Some(msg),
            TaskMessage::Shutdown => None,
        }
    }
}

// ============================================================================
// Task Lifecycle State
// ============================================================================

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    /// Created but not started
    #[default]
    Created,
    /// Running and processing messages
    Running,
    /// Stopping
    Stopping,
    /// Stopped gracefully
    Stopped,
    /// Terminated due to an error
    Failed,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Created => write!(f, "Created"),
            TaskState::Running => write!(f, "Running"),
            TaskState::Stopping => write!(f, "Stopping"),
            TaskState::Stopped => write!(f, "Stopped"),
            TaskState::Failed => write!(f, "Failed"),
        }
    }
}

/// Identifier of an xApp task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    /// Indication processing
    Mho,
    /// Handover evaluation
    Steering,
    /// A1 to policy store synchronization
    PolicySync,
    /// State dump
    Display,
    /// Southbound control delivery
    ControlDispatch,
}

impl TaskId {
    /// Every task, in start order.
    pub const ALL: [TaskId; 5] = [
        TaskId::ControlDispatch,
        TaskId::Mho,
        TaskId::PolicySync,
        TaskId::Steering,
        TaskId::Display,
    ];
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskId::Mho => write!(f, "MHO"),
            TaskId::Steering => write!(f, "Steering"),
            TaskId::PolicySync => write!(f, "PolicySync"),
            TaskId::Display => write!(f, "Display"),
            TaskId::ControlDispatch => write!(f, "ControlDispatch"),
        }
    }
}

/// Information about a task.
#[derive(Debug)]
pub struct TaskInfo {
    /// Task identifier
    pub id: TaskId,
    /// Current state
    pub state: TaskState,
    /// When the task was started
    pub started_at: Option<Instant>,
    /// When the task stopped
    pub stopped_at: Option<Instant>,
    /// Error message if the task failed
    pub error: Option<String>,
}

// ============================================================================
// Task Trait
// ============================================================================

/// Base trait for all xApp tasks.
#[async_trait::async_trait]
pub trait Task: Send + 'static {
    /// The message type this task processes.
    type Message: Send;

    /// Processes messages until shutdown or until the channel closes.
    async fn run(&mut self, rx: mpsc::Receiver<TaskMessage<Self::Message>>);
}

// ============================================================================
// Message Types
// ============================================================================

/// Messages for the MHO task.
#[derive(Debug)]
pub enum MhoMessage {
    /// Indication received from an E2 node
    Indication(E2Indication),
}

/// Messages for the steering task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteeringMessage {
    /// Run one evaluation pass now
    Evaluate,
    /// The policy store changed
    PolicyChanged,
}

/// Messages for the policy sync task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicySyncMessage {
    /// Resynchronize with the A1 policy map
    Sync,
}

/// Messages for the display task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMessage {
    /// Dump state now
    Refresh,
}

/// Messages for the control dispatch task.
#[derive(Debug)]
pub enum ControlMessage {
    /// Deliver a handover control request
    Send(ControlRequest),
}

// ============================================================================
// Task Handle
// ============================================================================

/// Handle for sending messages to a task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    tx: mpsc::Sender<TaskMessage<T>>,
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> TaskHandle<T> {
    /// Creates a new task handle from a sender.
    pub fn new(tx: mpsc::Sender<TaskMessage<T>>) -> Self {
        Self { tx }
    }

    /// Sends a message to the task.
    pub async fn send(&self, msg: T) -> Result<(), mpsc::error::SendError<TaskMessage<T>>> {
        self.tx.send(TaskMessage::Message(msg)).await
    }

    /// Sends a message without waiting for capacity.
    pub fn try_send(&self, msg: T) -> Result<(), mpsc::error::TrySendError<TaskMessage<T>>> {
        self.tx.try_send(TaskMessage::Message(msg))
    }

    /// Sends a shutdown signal to the task.
    pub async fn shutdown(&self) -> Result<(), mpsc::error::SendError<TaskMessage<T>>> {
        self.tx.send(TaskMessage::Shutdown).await
    }

    /// Returns true if the task channel is closed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// Task Base
// ============================================================================

/// Handles to every task, shared by the tasks themselves.
#[derive(Clone)]
pub struct XappTaskBase {
    /// xApp configuration
    pub config: Arc<XappConfig>,
    /// Handle to the MHO task
    pub mho_tx: TaskHandle<MhoMessage>,
    /// Handle to the steering task
    pub steering_tx: TaskHandle<SteeringMessage>,
    /// Handle to the policy sync task
    pub policy_sync_tx: TaskHandle<PolicySyncMessage>,
    /// Handle to the display task
    pub display_tx: TaskHandle<DisplayMessage>,
    /// Handle to the control dispatch task
    pub control_tx: TaskHandle<ControlMessage>,
}

/// Receiving ends matching an [`XappTaskBase`].
pub struct TaskReceivers {
    /// MHO task inbox
    pub mho_rx: mpsc::Receiver<TaskMessage<MhoMessage>>,
    /// Steering task inbox
    pub steering_rx: mpsc::Receiver<TaskMessage<SteeringMessage>>,
    /// Policy sync task inbox
    pub policy_sync_rx: mpsc::Receiver<TaskMessage<PolicySyncMessage>>,
    /// Display task inbox
    pub display_rx: mpsc::Receiver<TaskMessage<DisplayMessage>>,
    /// Control dispatch task inbox
    pub control_rx: mpsc::Receiver<TaskMessage<ControlMessage>>,
}

impl XappTaskBase {
    /// Creates all task channels.
    pub fn new(config: XappConfig, channel_capacity: usize) -> (Self, TaskReceivers) {
        let (mho_tx, mho_rx) = mpsc::channel(channel_capacity);
        let (steering_tx, steering_rx) = mpsc::channel(channel_capacity);
        let (policy_sync_tx, policy_sync_rx) = mpsc::channel(channel_capacity);
        let (display_tx, display_rx) = mpsc::channel(channel_capacity);
        let (control_tx, control_rx) = mpsc::channel(channel_capacity);

        let base = Self {
            config: Arc::new(config),
            mho_tx: TaskHandle::new(mho_tx),
            steering_tx: TaskHandle::new(steering_tx),
            policy_sync_tx: TaskHandle::new(policy_sync_tx),
            display_tx: TaskHandle::new(display_tx),
            control_tx: TaskHandle::new(control_tx),
        };
        let receivers = TaskReceivers {
            mho_rx,
            steering_rx,
            policy_sync_rx,
            display_rx,
            control_rx,
        };
        (base, receivers)
    }

    /// Sends shutdown signals to all tasks.
    pub async fn shutdown_all(&self) {
        // Tasks may already be gone
        let _ = self.mho_tx.shutdown().await;
        let _ = self.policy_sync_tx.shutdown().await;
        let _ = self.steering_tx.shutdown().await;
        let _ = self.display_tx.shutdown().await;
        let _ = self.control_tx.shutdown().await;
    }
}

// ============================================================================
// Constants
// ============================================================================

/// Default channel capacity for task message queues.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Default shutdown timeout in milliseconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5000;

// ============================================================================
// Task Manager
// ============================================================================

/// Error type for task operations.
#[derive(Debug, Clone)]
pub struct TaskError {
    /// Task that failed
    pub task_id: TaskId,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task {} error: {}", self.task_id, self.message)
    }
}

impl std::error::Error for TaskError {}

/// Tracks task state and coordinates shutdown.
pub struct TaskManager {
    task_base: XappTaskBase,
    task_states: HashMap<TaskId, TaskInfo>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    join_handles: HashMap<TaskId, JoinHandle<Result<(), TaskError>>>,
}

impl TaskManager {
    /// Creates a manager and the receivers for every task.
    pub fn new(config: XappConfig, channel_capacity: usize) -> (Self, TaskReceivers) {
        let (task_base, receivers) = XappTaskBase::new(config, channel_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task_states = TaskId::ALL
            .into_iter()
            .map(|id| {
                (
                    id,
                    TaskInfo {
                        id,
                        state: TaskState::Created,
                        started_at: None,
                        stopped_at: None,
                        error: None,
                    },
                )
            })
            .collect();

        let manager = Self {
            task_base,
            task_states,
            shutdown_tx,
            shutdown_rx,
            join_handles: HashMap::new(),
        };
        (manager, receivers)
    }

    /// Returns a clone of the task base.
    pub fn task_base(&self) -> XappTaskBase {
        self.task_base.clone()
    }

    /// Returns a receiver for the shutdown signal.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Gets the current state of a task.
    pub fn get_task_state(&self, task_id: TaskId) -> Option<TaskState> {
        self.task_states.get(&task_id).map(|info| info.state)
    }

    /// Gets information about a task.
    pub fn get_task_info(&self, task_id: TaskId) -> Option<&TaskInfo> {
        self.task_states.get(&task_id)
    }

    /// Returns true if all tasks are running.
    pub fn all_tasks_running(&self) -> bool {
        self.task_states
            .values()
            .all(|info| info.state == TaskState::Running)
    }

    /// Returns true if any task has failed.
    pub fn any_task_failed(&self) -> bool {
        self.task_states
            .values()
            .any(|info| info.state == TaskState::Failed)
    }

    /// Marks a task as started.
    pub fn mark_task_started(&mut self, task_id: TaskId) {
        if let Some(info) = self.task_states.get_mut(&task_id) {
            info.state = TaskState::Running;
            info.started_at = Some(Instant::now());
        }
    }

    /// Marks a task as stopped.
    pub fn mark_task_stopped(&mut self, task_id: TaskId) {
        if let Some(info) = self.task_states.get_mut(&task_id) {
            info.state = TaskState::Stopped;
            info.stopped_at = Some(Instant::now());
        }
    }

    /// Marks a task as failed.
    pub fn mark_task_failed(&mut self, task_id: TaskId, error: String) {
        if let Some(info) = self.task_states.get_mut(&task_id) {
            info.state = TaskState::Failed;
            info.stopped_at = Some(Instant::now());
            info.error = Some(error);
        }
    }

    /// Registers a spawned task and marks it running.
    pub fn register_task_handle(
        &mut self,
        task_id: TaskId,
        handle: JoinHandle<Result<(), TaskError>>,
    ) {
        self.join_handles.insert(task_id, handle);
        self.mark_task_started(task_id);
    }

    /// Signals shutdown to every task and waits for them to finish.
    pub async fn shutdown(&mut self) -> Result<(), TaskError> {
        let _ = self.shutdown_tx.send(true);

        for info in self.task_states.values_mut() {
            if info.state == TaskState::Running {
                info.state = TaskState::Stopping;
            }
        }

        self.task_base.shutdown_all().await;

        let timeout = tokio::time::Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS);
        let deadline = tokio::time::Instant::now() + timeout;

        let handles: Vec<_> = self.join_handles.drain().collect();
        let mut results: Vec<(TaskId, Result<(), String>)> = Vec::new();

        for (task_id, handle) in handles {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let result = match tokio::time::timeout(remaining, handle).await {
                Ok(Ok(Ok(()))) => Ok(()),
                Ok(Ok(Err(e))) => Err(e.message),
                Ok(Err(_join_error)) => Err("Task panicked".to_string()),
                Err(_timeout) => Err("Shutdown timeout".to_string()),
            };
            results.push((task_id, result));
        }

        for (task_id, result) in results {
            match result {
                Ok(()) => self.mark_task_stopped(task_id),
                Err(msg) => self.mark_task_failed(task_id, msg),
            }
        }

        let failed: Vec<_> = self
            .task_states
            .values()
            .filter(|info| info.state == TaskState::Failed)
            .collect();
        if let Some(first) = failed.first() {
            let summary: Vec<_> = failed
                .iter()
                .map(|info| {
                    format!(
                        "{}: {}",
                        info.id,
                        info.error.as_deref().unwrap_or("unknown error")
                    )
                })
                .collect();
            return Err(TaskError {
                task_id: first.id,
                message: format!("Tasks failed during shutdown: {}", summary.join(", ")),
            });
        }

        Ok(())
    }

    /// Returns a summary of all task states.
    pub fn status_summary(&self) -> Vec<(TaskId, TaskState)> {
        TaskId::ALL
            .into_iter()
            .filter_map(|id| self.get_task_state(id).map(|state| (id, state)))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_message_variants() {
        let msg: TaskMessage<i32> = TaskMessage::message(42);
        assert!(!msg.is_shutdown());
        assert_eq!(msg.into_message(), Some(42));

        let shutdown: TaskMessage<i32> = TaskMessage::shutdown();
        assert!(shutdown.is_shutdown());
        assert!(shutdown.into_message().is_none());
    }

    #[tokio::test]
    async fn test_task_handle_send_and_shutdown() {
        let (tx, mut rx) = mpsc::channel::<TaskMessage<SteeringMessage>>(4);
        let handle = TaskHandle::new(tx);

        handle.send(SteeringMessage::Evaluate).await.unwrap();
        handle.shutdown().await.unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(TaskMessage::Message(SteeringMessage::Evaluate))
        ));
        assert!(matches!(rx.recv().await, Some(TaskMessage::Shutdown)));
    }

    #[tokio::test]
    async fn test_task_base_handles_close_with_receivers() {
        let (base, receivers) = XappTaskBase::new(XappConfig::default(), 8);
        assert!(!base.mho_tx.is_closed());
        assert!(!base.control_tx.is_closed());

        drop(receivers);
        assert!(base.mho_tx.is_closed());
        assert!(base.steering_tx.is_closed());
        assert!(base.policy_sync_tx.is_closed());
        assert!(base.display_tx.is_closed());
        assert!(base.control_tx.is_closed());
    }

    #[tokio::test]
    async fn test_manager_tracks_lifecycle() {
        let (mut manager, receivers) = TaskManager::new(XappConfig::default(), 8);
        assert_eq!(
            manager.get_task_state(TaskId::Steering),
            Some(TaskState::Created)
        );

        let TaskReceivers { mut steering_rx, .. } = receivers;
        let handle = tokio::spawn(async move {
            while let Some(msg) = steering_rx.recv().await {
                if msg.is_shutdown() {
                    break;
                }
            }
            Ok(())
        });
        manager.register_task_handle(TaskId::Steering, handle);
        assert_eq!(
            manager.get_task_state(TaskId::Steering),
            Some(TaskState::Running)
        );
        assert!(!manager.all_tasks_running());

        manager.shutdown().await.unwrap();
        assert_eq!(
            manager.get_task_state(TaskId::Steering),
            Some(TaskState::Stopped)
        );
        assert!(*manager.shutdown_receiver().borrow());
    }

    #[tokio::test]
    async fn test_manager_reports_failed_task() {
        let (mut manager, _receivers) = TaskManager::new(XappConfig::default(), 8);
        let handle = tokio::spawn(async {
            Err(TaskError {
                task_id: TaskId::Display,
                message: "boom".to_string(),
            })
        });
        manager.register_task_handle(TaskId::Display, handle);

        let err = manager.shutdown().await.unwrap_err();
        assert_eq!(err.task_id, TaskId::Display);
        assert!(err.message.contains("Display: boom"));
        assert!(manager.any_task_failed());
    }
}
