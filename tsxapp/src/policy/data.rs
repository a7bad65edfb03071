//! Installed policy record.

use bytes::Bytes;
use tsxapp_a1::TsPolicy;

use crate::store::{Entity, EntityKind};

/// One installed traffic steering policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyData {
    /// A1 policy id
    pub key: String,
    /// Document as received
    pub payload: Bytes,
    /// Parsed document
    pub policy: TsPolicy,
    /// Whether the policy takes part in scoring
    pub is_enforced: bool,
}

impl PolicyData {
    /// Creates a record, not yet enforced.
    pub fn new(key: impl Into<String>, payload: Bytes, policy: TsPolicy) -> Self {
        Self {
            key: key.into(),
            payload,
            policy,
            is_enforced: false,
        }
    }
}

impl Entity for PolicyData {
    const KIND: EntityKind = EntityKind::Policy;

    fn entity_key(&self) -> &str {
        &self.key
    }
}
