//! Policy store and lifecycle.
//!
//! Installed policies live in a [`Store`] keyed by A1 policy id. The A1 map
//! is the source of truth; [`PolicyManager::sync_from_a1`] reconciles the
//! store against it after every northbound change, applying changed
//! documents in A1 arrival order so overlap suppression sees them as if they
//! came one at a time.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use bytes::Bytes;
use thiserror::Error;
use tracing::{error, info, warn};

use tsxapp_a1::{CellId, PolicyError, Preference, SchemaValidator, Scope, StructuralValidator, TsPolicy};

use super::data::PolicyData;
use super::matcher::{self, TsResult};
use crate::store::{Store, StoreError};

/// Errors raised while installing a policy.
#[derive(Debug, Error)]
pub enum PolicyManagerError {
    /// Document did not parse or failed the schema check
    #[error(transparent)]
    Invalid(#[from] PolicyError),

    /// Store integrity fault
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Policies installed or replaced
    pub applied: Vec<String>,
    /// Policies removed because A1 no longer has them
    pub removed: Vec<String>,
    /// Policies whose payload was rejected
    pub rejected: Vec<String>,
    /// Policies left untouched
    pub unchanged: usize,
}

impl SyncSummary {
    /// Whether the pass changed the store.
    pub fn changed(&self) -> bool {
        !self.applied.is_empty() || !self.removed.is_empty()
    }
}

/// Owns the policy store and scores cells against it.
pub struct PolicyManager {
    store: Store<PolicyData>,
    validator: Box<dyn SchemaValidator>,
    schema_path: String,
}

impl PolicyManager {
    /// Creates a manager with an explicit schema validator.
    pub fn new(schema_path: impl Into<String>, validator: Box<dyn SchemaValidator>) -> Self {
        Self {
            store: Store::new(),
            validator,
            schema_path: schema_path.into(),
        }
    }

    /// Creates a manager using [`StructuralValidator`].
    pub fn with_structural_validator(schema_path: impl Into<String>) -> Self {
        Self::new(schema_path, Box::new(StructuralValidator))
    }

    /// Underlying store.
    pub fn store(&self) -> &Store<PolicyData> {
        &self.store
    }

    /// Parses and schema-checks a payload into a record, not yet enforced.
    pub fn load_policy(&self, key: &str, payload: Bytes) -> Result<PolicyData, PolicyError> {
        let policy = TsPolicy::load(&payload, &self.schema_path, self.validator.as_ref())?;
        Ok(PolicyData::new(key, payload, policy))
    }

    /// Installs a policy as enforced, suppressing any overlapping one.
    pub fn create_policy(&self, key: &str, payload: Bytes) -> Result<PolicyData, PolicyManagerError> {
        let mut data = self.load_policy(key, payload)?;
        self.is_similar_enforced(&data)?;
        data.is_enforced = true;
        self.store.put(key, data.clone())?;
        Ok(data)
    }

    /// Looks up a policy.
    pub fn get_policy(&self, key: &str) -> Result<Option<PolicyData>, StoreError> {
        self.store.value(key)
    }

    /// Removes a policy.
    pub fn delete_policy(&self, key: &str) -> Option<PolicyData> {
        self.store.delete(key)
    }

    /// Marks a policy enforced. False when it does not exist.
    pub fn enforce_policy(&self, key: &str) -> Result<bool, StoreError> {
        self.set_enforced(key, true)
    }

    /// Marks a policy not enforced. False when it does not exist.
    pub fn disable_policy(&self, key: &str) -> Result<bool, StoreError> {
        self.set_enforced(key, false)
    }

    fn set_enforced(&self, key: &str, enforced: bool) -> Result<bool, StoreError> {
        match self.store.value(key)? {
            Some(mut data) => {
                data.is_enforced = enforced;
                self.store.put(key, data)?;
                Ok(true)
            }
            None => {
                error!(policy_id = %key, "No such policy");
                Ok(false)
            }
        }
    }

    /// Disables the first enforced policy, other than `candidate` itself,
    /// whose scope equals the candidate's. Returns whether one was found.
    pub fn is_similar_enforced(&self, candidate: &PolicyData) -> Result<bool, StoreError> {
        for entry in self.store.entries() {
            let existing = entry.value;
            if existing.key == candidate.key || !existing.is_enforced {
                continue;
            }
            if matcher::same_scope(&existing.policy.scope, &candidate.policy.scope) {
                info!(
                    policy_id = %existing.key,
                    replaced_by = %candidate.key,
                    "Disabling overlapping policy"
                );
                self.disable_policy(&existing.key)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Snapshot of every policy in key order.
    pub fn policies(&self) -> Vec<PolicyData> {
        self.store.entries().map(|entry| entry.value).collect()
    }

    /// Preference of `cell` for the UE described by `scope`.
    pub fn get_preference(&self, scope: &Scope, cell: &CellId) -> Preference {
        matcher::get_preference(scope, cell, &self.policies())
    }

    /// Best candidate for the UE described by `scope`.
    pub fn get_ts_result_for_ue(&self, scope: &Scope, candidates: &[(CellId, i32)]) -> Option<TsResult> {
        matcher::get_ts_result_for_ue(scope, candidates, &self.policies())
    }

    /// Reconciles the store with the A1 policies, given oldest change first.
    pub fn sync_from_a1(&self, a1: &[(String, Bytes)]) -> Result<SyncSummary, StoreError> {
        let mut summary = SyncSummary::default();
        let installed: BTreeSet<&str> = a1.iter().map(|(key, _)| key.as_str()).collect();

        for key in self.store.keys() {
            if !installed.contains(key.as_str()) {
                self.store.delete(&key);
                info!(policy_id = %key, "Policy deleted");
                summary.removed.push(key);
            }
        }

        for (key, payload) in a1 {
            if let Some(existing) = self.store.value(key)? {
                if existing.payload == *payload {
                    summary.unchanged += 1;
                    continue;
                }
            }

            let mut data = match self.load_policy(key, payload.clone()) {
                Ok(data) => data,
                Err(e) => {
                    warn!(policy_id = %key, "Cannot apply policy: {}", e);
                    summary.rejected.push(key.clone());
                    continue;
                }
            };
            self.is_similar_enforced(&data)?;
            data.is_enforced = true;
            info!("{}", describe_policy(&data));
            self.store.put(key, data)?;
            summary.applied.push(key.clone());
        }

        Ok(summary)
    }
}

/// One-line summary of a policy: its scope followed by every preference and
/// the cells it names.
pub fn describe_policy(data: &PolicyData) -> String {
    let scope = &data.policy.scope;
    let mut parts = Vec::new();

    if let Some(slice) = &scope.slice_id {
        parts.push(format!(
            "Slice [SD:{}, SST:{}, PLMN:(MCC:{}, MNC:{})]",
            slice.sd.as_deref().unwrap_or("-"),
            slice.sst,
            slice.plmn_id.mcc,
            slice.plmn_id.mnc
        ));
    }
    if let Some(ue_id) = &scope.ue_id {
        parts.push(format!("UE [ID:{ue_id}]"));
    }
    if let Some(qos) = &scope.qos_id {
        match (qos.qci, qos.five_qi) {
            (Some(qci), _) => parts.push(format!("QoS [QCI:{qci}]")),
            (None, Some(five_qi)) => parts.push(format!("QoS [5QI:{five_qi}]")),
            (None, None) => {}
        }
    }
    if let Some(cell) = &scope.cell_id {
        parts.push(format!("CELL [{cell}]"));
    }

    let mut line = format!("Policy [ID:{}] applied -> {}", data.key, parts.join(", "));
    for resource in &data.policy.tsp_resources {
        let cells: Vec<String> = resource
            .cell_id_list
            .iter()
            .map(|cell| format!("CELL [{cell}]"))
            .collect();
        let _ = write!(line, " - ({}) - {}", resource.preference, cells.join(", "));
    }
    line
}
