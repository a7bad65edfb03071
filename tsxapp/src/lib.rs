//! tsxapp - Traffic Steering xApp Library
#![allow(missing_docs)]
//!
//! This crate provides a near-RT RIC xApp that steers UEs between cells
//! according to A1 traffic steering preference policies. It implements:
//!
//! - E2SM-MHO subscription and indication handling for UE/cell tracking
//! - A1 policy storage, overlap suppression and per-UE cell scoring
//! - Periodic steering evaluation issuing handover control requests
//! - Periodic state display
//!
//! # Architecture
//!
//! Every component runs as an independent async task communicating via
//! typed message channels.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           xApp                                │
//! │  ┌─────────┐  ┌──────────┐  ┌────────────┐  ┌─────────┐       │
//! │  │   MHO   │  │ Steering │  │ PolicySync │  │ Display │       │
//! │  │  Task   │  │   Task   │  │    Task    │  │  Task   │       │
//! │  └────┬────┘  └────┬─────┘  └─────┬──────┘  └─────────┘       │
//! │       │            │              │                           │
//! │       │      ┌─────┴──────┐       │                           │
//! │       │      │  Control   │       │                           │
//! │       │      │  Dispatch  │       │                           │
//! │       │      └─────┬──────┘       │                           │
//! └───────┼────────────┼──────────────┼───────────────────────────┘
//!         │            │              │
//!         ▼            ▼              ▼
//!      E2 nodes     E2 nodes      A1 (Non-RT RIC)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tsxapp::app::{load_and_validate_config, XappManager};
//! use tsxapp::rnib::InMemoryRnib;
//! use tsxapp::southbound::LoopbackTransport;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = load_and_validate_config("config/tsxapp.yaml").unwrap();
//!     let (transport, _controls) = LoopbackTransport::new();
//!     let mut xapp = XappManager::start(config, Arc::new(transport), Arc::new(InMemoryRnib::new()));
//!     xapp.connect_nodes().await.unwrap();
//!     // xapp.shutdown().await;
//! }
//! ```

pub mod app;
pub mod mho;
pub mod policy;
pub mod rnib;
pub mod southbound;
pub mod steering;
pub mod store;
pub mod tasks;

// Re-export MHO types
pub use mho::{CellData, MhoController, MhoError, MhoTask, RrcState, UeData};

// Re-export policy types
pub use policy::{PolicyData, PolicyManager, PolicyManagerError, PolicySyncTask, SyncSummary, TsResult};

// Re-export steering types
pub use steering::{ControlError, SteeringManager, SteeringReport, SteeringTask};

// Re-export southbound and topology types
pub use rnib::{CellInfo, InMemoryRnib, NodeAspects, Rnib, RnibError};
pub use southbound::{
    ControlDispatchTask, E2Transport, LoopbackTransport, RawIndication, SouthboundError,
    SouthboundManager, SubscriptionSpec,
};

// Re-export store types
pub use store::{Entity, EntityKind, Entry, Store, StoreError};

// Re-export app module types
pub use app::{
    load_and_validate_config, load_config, load_config_from_str, validate_config, ConfigError,
    ConfigValidationError, DisplayTask, StateSnapshot, XappManager,
};

// Re-export task types
pub use tasks::{
    ControlMessage, DisplayMessage, MhoMessage, PolicySyncMessage, SteeringMessage, Task,
    TaskHandle, TaskMessage, XappTaskBase, DEFAULT_CHANNEL_CAPACITY,
};

// Re-export lifecycle management types
pub use tasks::{
    TaskError, TaskId, TaskInfo, TaskManager, TaskState, DEFAULT_SHUTDOWN_TIMEOUT_MS,
};
