//! E2SM-MHO service model messages
//!
//! Indications from E2 nodes carry a header naming the reporting cell and a
//! message in one of two formats:
//!
//! - **Format 1**: measurement report (serving and neighbor RSRP, 5QI)
//! - **Format 2**: RRC status change
//!
//! The xApp answers with handover control requests.
//!
//! # Modules
//!
//! - [`protocol`]: message types and identities
//! - [`codec`]: byte encoding and decoding
//!
//! # Example
//!
//! ```rust
//! use tsxapp_common::Plmn;
//! use tsxapp_e2::codec;
//! use tsxapp_e2::protocol::{Cgi, IndicationHeader};
//!
//! let header = IndicationHeader { cgi: Cgi::nr(Plmn::new(138, 426, true), 39) };
//! let encoded = codec::encode_indication_header(&header).unwrap();
//! assert_eq!(codec::decode_indication_header(&encoded).unwrap(), header);
//! ```

pub mod codec;
pub mod protocol;

pub use codec::E2CodecError;
pub use protocol::{
    CellIdentity, Cgi, ControlHeader, ControlRequest, E2Indication, EventTrigger,
    HandoverControl, IndicationHeader, IndicationMessage, MeasReportItem, MeasurementReport,
    RrcStatus, RrcStatusReport, TriggerType, UeIdentity, DEFAULT_CONTROL_PRIORITY, ECI_BITS,
    SERVICE_MODEL_NAME, SERVICE_MODEL_OID,
};
