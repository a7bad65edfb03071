//! A1 policy interface for the traffic steering xApp
//!
//! - [`policy`]: the `ORAN_TrafficSteeringPreference` document model
//! - [`messages`]: A1-P request, result, status and ack messages
//! - [`server`]: the policy lifecycle handler and status stream
//! - [`status`]: acknowledgement tracking for status notifications

pub mod messages;
pub mod policy;
pub mod server;
pub mod status;

pub use messages::{
    A1Result, AckMessage, Encoding, Header, PayloadType, PolicyAckMessage, PolicyRequestMessage,
    PolicyResultMessage, PolicyStatusMessage, PolicyType, RequestMessage, ResultMessage,
    StatusMessage, ENFORCED_STATUS, NOT_ENFORCED_STATUS, REASON_ALREADY_EXISTS, REASON_NOT_FOUND,
    REASON_TYPE_NOT_SUPPORTED,
};
pub use policy::{
    CId, CellId, PlmnId, PolicyError, Preference, QosId, SchemaValidator, Scope, SliceId,
    StructuralValidator, TsPolicy, TspResource,
};
pub use server::{A1Error, A1PolicyServer};
pub use status::AckWatchers;
