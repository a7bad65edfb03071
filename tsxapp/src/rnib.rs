//! Topology (R-NIB) access.
//!
//! The xApp reads cell types for the periodic display and checks node
//! aspects before subscribing. [`InMemoryRnib`] backs tests and standalone
//! runs.

use std::collections::BTreeMap;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

/// Topology lookup failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RnibError {
    /// No cell entity with this id
    #[error("cell {0} not found")]
    CellNotFound(String),

    /// No E2 node entity with this id
    #[error("E2 node {0} not found")]
    NodeNotFound(String),

    /// Topology service cannot be reached
    #[error("topology unavailable: {0}")]
    Unavailable(String),
}

/// Cell entity as seen by the topology service.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellInfo {
    /// Cell object id (CGI)
    pub cgi: String,
    /// Macro, small cell, ...
    pub cell_type: String,
}

/// Service model advertised by an E2 node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceModelInfo {
    /// Service model name
    pub name: String,
    /// Service model OID
    pub oid: String,
}

/// E2 node aspects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeAspects {
    /// Advertised service models keyed by OID
    pub service_models: BTreeMap<String, ServiceModelInfo>,
}

impl NodeAspects {
    /// Whether the node advertises the service model `name` under `oid`.
    pub fn supports(&self, name: &str, oid: &str) -> bool {
        self.service_models
            .get(oid)
            .is_some_and(|sm| sm.name == name)
    }
}

/// Topology collaborator.
#[async_trait::async_trait]
pub trait Rnib: Send + Sync {
    /// All cells, keyed by entity id.
    async fn get_cell_types(&self) -> Result<BTreeMap<String, CellInfo>, RnibError>;

    /// Changes the type of one cell.
    async fn set_cell_type(&self, cell_id: &str, cell_type: &str) -> Result<(), RnibError>;

    /// Aspects of one E2 node.
    async fn get_node_aspects(&self, node_id: &str) -> Result<NodeAspects, RnibError>;

    /// Ids of every known E2 node.
    async fn e2_nodes(&self) -> Result<Vec<String>, RnibError>;
}

/// Topology held in memory.
#[derive(Default)]
pub struct InMemoryRnib {
    cells: RwLock<BTreeMap<String, CellInfo>>,
    nodes: RwLock<BTreeMap<String, NodeAspects>>,
}

impl InMemoryRnib {
    /// Creates an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a cell.
    pub async fn add_cell(&self, cell_id: impl Into<String>, info: CellInfo) {
        self.cells.write().await.insert(cell_id.into(), info);
    }

    /// Adds or replaces an E2 node.
    pub async fn add_node(&self, node_id: impl Into<String>, aspects: NodeAspects) {
        self.nodes.write().await.insert(node_id.into(), aspects);
    }

    /// Adds a node advertising the MHO service model.
    pub async fn add_mho_node(&self, node_id: impl Into<String>) {
        let mut aspects = NodeAspects::default();
        aspects.service_models.insert(
            tsxapp_e2::SERVICE_MODEL_OID.to_string(),
            ServiceModelInfo {
                name: tsxapp_e2::SERVICE_MODEL_NAME.to_string(),
                oid: tsxapp_e2::SERVICE_MODEL_OID.to_string(),
            },
        );
        self.add_node(node_id, aspects).await;
    }
}

#[async_trait::async_trait]
impl Rnib for InMemoryRnib {
    async fn get_cell_types(&self) -> Result<BTreeMap<String, CellInfo>, RnibError> {
        Ok(self.cells.read().await.clone())
    }

    async fn set_cell_type(&self, cell_id: &str, cell_type: &str) -> Result<(), RnibError> {
        match self.cells.write().await.get_mut(cell_id) {
            Some(cell) => {
                cell.cell_type = cell_type.to_string();
                Ok(())
            }
            None => {
                warn!(cell_id, "Cannot set type of unknown cell");
                Err(RnibError::CellNotFound(cell_id.to_string()))
            }
        }
    }

    async fn get_node_aspects(&self, node_id: &str) -> Result<NodeAspects, RnibError> {
        self.nodes
            .read()
            .await
            .get(node_id)
            .cloned()
            .ok_or_else(|| RnibError::NodeNotFound(node_id.to_string()))
    }

    async fn e2_nodes(&self) -> Result<Vec<String>, RnibError> {
        Ok(self.nodes.read().await.keys().cloned().collect())
    }
}
