//! E2SM-MHO message types
//!
//! Only the fields the steering core interprets are modelled: cell and UE
//! identities, RSRP, 5QI and RRC state, plus the handover control request.

use std::fmt;

use bytes::Bytes;
use tsxapp_common::{Plmn, PlmnEncoding, NCI_BITS};

/// Registered name of the mobility handover service model.
pub const SERVICE_MODEL_NAME: &str = "oran-e2sm-mho";

/// Object identifier of the mobility handover service model.
pub const SERVICE_MODEL_OID: &str = "1.3.6.1.4.1.53148.1.2.2.101";

/// Bits in an E-UTRA cell identity.
pub const ECI_BITS: usize = 28;

/// Priority stamped on every handover control header.
pub const DEFAULT_CONTROL_PRIORITY: u8 = 10;

/// Event that caused an indication to be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TriggerType {
    /// Reported every reporting period
    Periodic = 1,
    /// UE delivered a measurement report
    UponRcvMeasReport = 2,
    /// UE changed RRC state
    UponChangeRrcStatus = 3,
}

impl TriggerType {
    /// All trigger types, in subscription order.
    pub const ALL: [TriggerType; 3] = [
        TriggerType::Periodic,
        TriggerType::UponRcvMeasReport,
        TriggerType::UponChangeRrcStatus,
    ];

    /// Creates a TriggerType from a u8 value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Periodic),
            2 => Some(Self::UponRcvMeasReport),
            3 => Some(Self::UponChangeRrcStatus),
            _ => None,
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerType::Periodic => f.write_str("PERIODIC"),
            TriggerType::UponRcvMeasReport => f.write_str("UPON_RCV_MEAS_REPORT"),
            TriggerType::UponChangeRrcStatus => f.write_str("UPON_CHANGE_RRC_STATUS"),
        }
    }
}

/// RRC status carried by the RRC-state-change format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RrcStatus {
    /// RRC_CONNECTED
    Connected = 0,
    /// RRC_INACTIVE
    Inactive = 1,
    /// RRC_IDLE
    Idle = 2,
}

impl RrcStatus {
    /// Creates an RrcStatus from a u8 value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Connected),
            1 => Some(Self::Inactive),
            2 => Some(Self::Idle),
            _ => None,
        }
    }

    /// Status name as reported to operators.
    pub fn as_str(&self) -> &'static str {
        match self {
            RrcStatus::Connected => "RRCSTATUS_CONNECTED",
            RrcStatus::Inactive => "RRCSTATUS_INACTIVE",
            RrcStatus::Idle => "RRCSTATUS_IDLE",
        }
    }
}

impl fmt::Display for RrcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Radio-access-specific part of a cell global identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellIdentity {
    /// 36-bit NR cell identity
    Nr(u64),
    /// 28-bit E-UTRA cell identity
    Eutra(u32),
}

impl CellIdentity {
    /// Width of the identity on the wire.
    pub fn bit_len(&self) -> usize {
        match self {
            CellIdentity::Nr(_) => NCI_BITS,
            CellIdentity::Eutra(_) => ECI_BITS,
        }
    }

    /// Identity value, right-aligned.
    pub fn value(&self) -> u64 {
        match self {
            CellIdentity::Nr(nci) => *nci,
            CellIdentity::Eutra(eci) => u64::from(*eci),
        }
    }
}

/// Cell global identity: PLMN plus cell identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cgi {
    /// Serving network
    pub plmn: Plmn,
    /// Cell within the network
    pub cell: CellIdentity,
}

impl Cgi {
    /// NR cell global identity.
    pub fn nr(plmn: Plmn, nci: u64) -> Self {
        Self {
            plmn,
            cell: CellIdentity::Nr(nci),
        }
    }

    /// E-UTRA cell global identity.
    pub fn eutra(plmn: Plmn, eci: u32) -> Self {
        Self {
            plmn,
            cell: CellIdentity::Eutra(eci),
        }
    }

    /// NR cell identity, if this is an NR cell.
    pub fn nci(&self) -> Option<u64> {
        match self.cell {
            CellIdentity::Nr(nci) => Some(nci),
            CellIdentity::Eutra(_) => None,
        }
    }

    /// E-UTRA cell identity, if this is an LTE cell.
    pub fn eci(&self) -> Option<u32> {
        match self.cell {
            CellIdentity::Eutra(eci) => Some(eci),
            CellIdentity::Nr(_) => None,
        }
    }

    /// Store key of this cell under the given conventions.
    pub fn key(&self, encoding: PlmnEncoding, topo_ids_enabled: bool) -> String {
        tsxapp_common::cell_key(
            encoding.plmn_id(&self.plmn),
            self.cell.value(),
            topo_ids_enabled,
        )
    }
}

/// UE identity variants a node may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UeIdentity {
    /// gNB: AMF UE NGAP ID
    GnbUe {
        /// AMF UE NGAP ID
        amf_ue_ngap_id: u64,
    },
    /// eNB: MME UE S1AP ID
    EnbUe {
        /// MME UE S1AP ID
        mme_ue_s1ap_id: u32,
    },
    /// en-gNB: MeNB UE X2AP ID
    EnGnbUe {
        /// MeNB UE X2AP ID
        menb_ue_x2ap_id: u16,
    },
    /// ng-eNB: AMF UE NGAP ID
    NgEnbUe {
        /// AMF UE NGAP ID
        amf_ue_ngap_id: u64,
    },
}

impl UeIdentity {
    /// Numeric identity used as the UE key.
    pub fn numeric_id(&self) -> u64 {
        match self {
            UeIdentity::GnbUe { amf_ue_ngap_id } | UeIdentity::NgEnbUe { amf_ue_ngap_id } => {
                *amf_ue_ngap_id
            }
            UeIdentity::EnbUe { mme_ue_s1ap_id } => u64::from(*mme_ue_s1ap_id),
            UeIdentity::EnGnbUe { menb_ue_x2ap_id } => u64::from(*menb_ue_x2ap_id),
        }
    }

    /// Wire tag of the variant.
    pub fn tag(&self) -> u8 {
        match self {
            UeIdentity::GnbUe { .. } => 1,
            UeIdentity::EnbUe { .. } => 2,
            UeIdentity::EnGnbUe { .. } => 3,
            UeIdentity::NgEnbUe { .. } => 4,
        }
    }
}

/// Indication header (format 1): the reporting cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicationHeader {
    /// Cell that produced the report
    pub cgi: Cgi,
}

/// One measured cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasReportItem {
    /// Measured cell
    pub cgi: Cgi,
    /// RSRP in dBm
    pub rsrp: i32,
    /// Raw 5QI, when the node reported one
    pub five_qi: Option<u8>,
}

/// Indication message format 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementReport {
    /// Reporting UE
    pub ue_id: UeIdentity,
    /// Serving and neighbor measurements
    pub items: Vec<MeasReportItem>,
}

/// Indication message format 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RrcStatusReport {
    /// Reporting UE
    pub ue_id: UeIdentity,
    /// New RRC status
    pub rrc_status: RrcStatus,
}

/// Indication message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicationMessage {
    /// Format 1
    MeasurementReport(MeasurementReport),
    /// Format 2
    RrcStatus(RrcStatusReport),
}

impl IndicationMessage {
    /// Wire format number.
    pub fn format(&self) -> u8 {
        match self {
            IndicationMessage::MeasurementReport(_) => 1,
            IndicationMessage::RrcStatus(_) => 2,
        }
    }

    /// UE the message is about.
    pub fn ue_id(&self) -> UeIdentity {
        match self {
            IndicationMessage::MeasurementReport(m) => m.ue_id,
            IndicationMessage::RrcStatus(m) => m.ue_id,
        }
    }
}

/// Event trigger definition sent with a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTrigger {
    /// Trigger kind
    pub trigger_type: TriggerType,
    /// Reporting period, 0 for event triggers
    pub reporting_period_ms: u32,
}

/// Control header (format 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlHeader {
    /// Cell currently serving the UE
    pub serving_cgi: Cgi,
    /// Control message priority
    pub priority: u8,
}

/// Handover control message (format 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoverControl {
    /// Cell currently serving the UE
    pub serving_cgi: Cgi,
    /// UE to move
    pub ue_id: UeIdentity,
    /// Destination cell
    pub target_cgi: Cgi,
}

/// Indication as delivered by the E2 transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct E2Indication {
    /// Originating E2 node
    pub node_id: String,
    /// Subscription trigger that produced it
    pub trigger: TriggerType,
    /// Encoded indication header
    pub header: Bytes,
    /// Encoded indication message
    pub payload: Bytes,
}

/// Encoded control request addressed to an E2 node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRequest {
    /// Destination E2 node
    pub node_id: String,
    /// Encoded control header
    pub header: Bytes,
    /// Encoded control message
    pub message: Bytes,
}
