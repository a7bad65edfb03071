//! UE and cell records.

use std::collections::{BTreeMap, BTreeSet};

use tsxapp_a1::SliceId;
use tsxapp_common::format_ue_id;
use tsxapp_e2::{Cgi, RrcStatus, UeIdentity};

use crate::store::{Entity, EntityKind};

/// QoS class of a UE whose serving 5QI was not reported.
pub const UNKNOWN_FIVE_QI: i64 = -1;

/// Connection state derived from RRC status reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RrcState {
    /// Attached to its serving cell
    #[default]
    Connected,
    /// Detached from every cell
    Idle,
}

/// Live state of one UE.
#[derive(Debug, Clone, PartialEq)]
pub struct UeData {
    /// 16-digit zero-padded decimal identity
    pub ue_id: String,
    /// Identity as reported by the node
    pub identity: UeIdentity,
    /// Node that sent the latest indication
    pub e2_node_id: String,
    /// Serving cell key, empty until attached
    pub cgi_string: String,
    /// Serving cell identity
    pub cgi: Option<Cgi>,
    /// Connection state
    pub state: RrcState,
    /// Last reported RRC status
    pub rrc_status: RrcStatus,
    /// QoS class: 1, 2, or -1 when unknown
    pub five_qi: i64,
    /// Serving cell RSRP
    pub rsrp_serving: i32,
    /// Neighbor RSRP by cell key
    pub rsrp_neighbors: BTreeMap<String, i32>,
    /// Serving and neighbor RSRP by cell key
    pub rsrp_table: BTreeMap<String, i32>,
    /// Every measured cell by key
    pub cgi_table: BTreeMap<String, Cgi>,
    /// Slice the UE belongs to
    pub slice: SliceId,
}

impl UeData {
    /// Fresh, unattached, connected UE.
    pub fn new(identity: UeIdentity, slice: SliceId) -> Self {
        Self {
            ue_id: format_ue_id(identity.numeric_id()),
            identity,
            e2_node_id: String::new(),
            cgi_string: String::new(),
            cgi: None,
            state: RrcState::Connected,
            rrc_status: RrcStatus::Connected,
            five_qi: UNKNOWN_FIVE_QI,
            rsrp_serving: 0,
            rsrp_neighbors: BTreeMap::new(),
            rsrp_table: BTreeMap::new(),
            cgi_table: BTreeMap::new(),
            slice,
        }
    }

    /// Whether the UE is idle.
    pub fn is_idle(&self) -> bool {
        self.state == RrcState::Idle
    }
}

impl Entity for UeData {
    const KIND: EntityKind = EntityKind::Ue;

    fn entity_key(&self) -> &str {
        &self.ue_id
    }
}

/// Live state of one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellData {
    /// Cell key
    pub cgi_string: String,
    /// Cell identity used in control messages
    pub cgi: Cgi,
    /// Handovers into this cell
    pub handovers_in: u64,
    /// Handovers out of this cell
    pub handovers_out: u64,
    /// Attached UEs
    pub ues: BTreeSet<String>,
}

impl CellData {
    /// Cell with no UEs and zero counters.
    pub fn new(cgi_string: impl Into<String>, cgi: Cgi) -> Self {
        Self {
            cgi_string: cgi_string.into(),
            cgi,
            handovers_in: 0,
            handovers_out: 0,
            ues: BTreeSet::new(),
        }
    }
}

impl Entity for CellData {
    const KIND: EntityKind = EntityKind::Cell;

    fn entity_key(&self) -> &str {
        &self.cgi_string
    }
}
