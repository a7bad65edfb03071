//! A1-P policy service messages.

use bytes::Bytes;

/// Status payload reported for enforced policies.
pub const ENFORCED_STATUS: &str = r#"{"enforceStatus":"ENFORCED"}"#;

/// Status payload reported for the not-enforced policy id.
pub const NOT_ENFORCED_STATUS: &str =
    r#"{"enforceStatus":"NOT_ENFORCED","enforceReason":"SCOPE_NOT_APPLICABLE"}"#;

/// Failure reason: policy type id is not the supported one.
pub const REASON_TYPE_NOT_SUPPORTED: &str = "Policy type does not support";

/// Failure reason: setup of an already installed id.
pub const REASON_ALREADY_EXISTS: &str = "Policy ID already exists";

/// Failure reason: update, delete or query of an unknown id.
pub const REASON_NOT_FOUND: &str = "Policy ID does not exists";

/// What the payload of a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadType {
    /// Policy document
    #[default]
    Policy,
    /// Enforcement status
    Status,
}

/// Payload encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// JSON text
    #[default]
    Json,
    /// Protocol buffers
    Protobuf,
}

/// Policy type addressed by a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyType {
    /// `<name>_<version>`
    pub id: String,
}

impl PolicyType {
    /// Creates a policy type reference.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Common message header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    /// Correlates requests with results, statuses with acks
    pub request_id: String,
    /// Sending application
    pub app_id: String,
    /// Payload encoding
    pub encoding: Encoding,
    /// Payload kind
    pub payload_type: PayloadType,
}

/// Outcome of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct A1Result {
    /// Whether the operation took effect
    pub success: bool,
    /// Failure reason, empty on success
    pub reason: String,
}

impl A1Result {
    /// Successful outcome.
    pub fn ok() -> Self {
        Self {
            success: true,
            reason: String::new(),
        }
    }

    /// Failed outcome.
    pub fn failed(reason: &str) -> Self {
        Self {
            success: false,
            reason: reason.to_string(),
        }
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestMessage {
    /// Header
    pub header: Header,
    /// Policy document (setup/update)
    pub payload: Bytes,
}

/// Setup/update/delete/query request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyRequestMessage {
    /// Target policy, empty for list queries
    pub policy_id: String,
    /// Addressed policy type
    pub policy_type: PolicyType,
    /// Body
    pub message: RequestMessage,
    /// Where status updates should go, empty for none
    pub notification_destination: String,
}

/// Result body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultMessage {
    /// Header echoed from the request
    pub header: Header,
    /// Policy, status or id list
    pub payload: Bytes,
    /// Outcome
    pub result: A1Result,
}

/// Reply to a [`PolicyRequestMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyResultMessage {
    /// Target policy
    pub policy_id: String,
    /// Addressed policy type
    pub policy_type: PolicyType,
    /// Body
    pub message: ResultMessage,
    /// Echoed notification destination
    pub notification_destination: String,
}

impl PolicyResultMessage {
    /// Whether the operation took effect.
    pub fn is_success(&self) -> bool {
        self.message.result.success
    }

    /// Failure reason, empty on success.
    pub fn reason(&self) -> &str {
        &self.message.result.reason
    }
}

/// Status body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusMessage {
    /// Header, with a fresh request id
    pub header: Header,
    /// Enforcement status JSON
    pub payload: Bytes,
}

/// Asynchronous enforcement status notification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyStatusMessage {
    /// Policy the status is about
    pub policy_id: String,
    /// Its policy type
    pub policy_type: PolicyType,
    /// Body
    pub message: StatusMessage,
    /// Destination from the originating request
    pub notification_destination: String,
}

/// Acknowledgement body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AckMessage {
    /// Header carrying the acknowledged request id
    pub header: Header,
    /// Outcome at the receiver
    pub result: A1Result,
}

/// Acknowledgement of a [`PolicyStatusMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyAckMessage {
    /// Policy the status was about
    pub policy_id: String,
    /// Its policy type
    pub policy_type: PolicyType,
    /// Body
    pub message: AckMessage,
}

impl PolicyAckMessage {
    /// Builds the acknowledgement for a status message.
    pub fn for_status(status: &PolicyStatusMessage) -> Self {
        Self {
            policy_id: status.policy_id.clone(),
            policy_type: status.policy_type.clone(),
            message: AckMessage {
                header: status.message.header.clone(),
                result: A1Result::ok(),
            },
        }
    }

    /// Request id being acknowledged.
    pub fn request_id(&self) -> &str {
        &self.message.header.request_id
    }
}
