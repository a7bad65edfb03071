//! Traffic steering preference policy documents (A1 policy type
//! `ORAN_TrafficSteeringPreference`).
//!
//! ```json
//! {
//!   "scope": { "sliceId": {...}, "ueId": "...", "qosId": {...}, "cellId": {...} },
//!   "tspResources": [
//!     { "cellIdList": [ { "plmnId": {"mcc": "...", "mnc": "..."}, "cId": {"ncI": 39} } ],
//!       "preference": "PREFER" }
//!   ]
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tsxapp_common::Plmn;

/// Errors raised while loading a policy document.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Payload is not a valid policy document
    #[error("malformed policy document: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload parsed but the schema check rejected it
    #[error("policy document rejected by schema {schema}")]
    SchemaRejected {
        /// Schema the document was checked against
        schema: String,
    },
}

/// Steering preference attached to a set of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Preference {
    /// Cell must be used
    Shall,
    /// Cell should be used
    Prefer,
    /// No preference
    #[default]
    Default,
    /// Cell should be avoided
    Avoid,
    /// Cell must not be used
    Forbid,
}

impl Preference {
    /// Offset added to the RSRP of a candidate cell.
    pub const fn weight(self) -> i32 {
        match self {
            Preference::Shall => 1000,
            Preference::Prefer => 16,
            Preference::Default => 0,
            Preference::Avoid => -16,
            Preference::Forbid => -1000,
        }
    }

    /// Name as written in policy documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Preference::Shall => "SHALL",
            Preference::Prefer => "PREFER",
            Preference::Default => "DEFAULT",
            Preference::Avoid => "AVOID",
            Preference::Forbid => "FORBID",
        }
    }
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PLMN as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlmnId {
    /// Mobile country code
    pub mcc: String,
    /// Mobile network code
    pub mnc: String,
}

impl PlmnId {
    /// Creates a PLMN id from strings.
    pub fn new(mcc: impl Into<String>, mnc: impl Into<String>) -> Self {
        Self {
            mcc: mcc.into(),
            mnc: mnc.into(),
        }
    }

    /// Both parts present.
    pub fn is_complete(&self) -> bool {
        !self.mcc.is_empty() && !self.mnc.is_empty()
    }
}

impl From<&Plmn> for PlmnId {
    fn from(plmn: &Plmn) -> Self {
        Self::new(plmn.mcc_string(), plmn.mnc_string())
    }
}

/// Network slice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SliceId {
    /// Slice differentiator
    #[serde(rename = "sD", default, skip_serializing_if = "Option::is_none")]
    pub sd: Option<String>,
    /// Slice/service type
    #[serde(rename = "sST")]
    pub sst: i32,
    /// Owning network
    #[serde(rename = "plmnId")]
    pub plmn_id: PlmnId,
}

impl SliceId {
    /// All parts present and meaningful.
    pub fn is_complete(&self) -> bool {
        self.sd.as_deref().is_some_and(|sd| !sd.is_empty())
            && self.sst > 0
            && self.plmn_id.is_complete()
    }
}

/// QoS identity: legacy QCI or 5QI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct QosId {
    /// LTE QoS class identifier
    #[serde(rename = "qcI", default, skip_serializing_if = "Option::is_none")]
    pub qci: Option<i64>,
    /// 5G QoS identifier
    #[serde(rename = "5qI", default, skip_serializing_if = "Option::is_none")]
    pub five_qi: Option<i64>,
}

/// Radio cell identity: NR or E-UTRA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CId {
    /// NR cell identity
    #[serde(rename = "ncI", default, skip_serializing_if = "Option::is_none")]
    pub nci: Option<i64>,
    /// E-UTRA cell identity
    #[serde(rename = "ecI", default, skip_serializing_if = "Option::is_none")]
    pub eci: Option<i64>,
}

/// Cell global identity as written in policy documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId {
    /// Owning network
    #[serde(rename = "plmnId")]
    pub plmn_id: PlmnId,
    /// Cell identity
    #[serde(rename = "cId")]
    pub c_id: CId,
}

impl CellId {
    /// NR cell.
    pub fn nr(plmn_id: PlmnId, nci: i64) -> Self {
        Self {
            plmn_id,
            c_id: CId {
                nci: Some(nci),
                eci: None,
            },
        }
    }

    /// E-UTRA cell.
    pub fn eutra(plmn_id: PlmnId, eci: i64) -> Self {
        Self {
            plmn_id,
            c_id: CId {
                nci: None,
                eci: Some(eci),
            },
        }
    }

    /// Same NCI or same ECI, and same PLMN.
    pub fn same_cell(&self, other: &CellId) -> bool {
        let nci_match = matches!((self.c_id.nci, other.c_id.nci), (Some(a), Some(b)) if a == b);
        let eci_match = matches!((self.c_id.eci, other.c_id.eci), (Some(a), Some(b)) if a == b);
        (nci_match || eci_match) && self.plmn_id == other.plmn_id
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.c_id.nci, self.c_id.eci) {
            (Some(nci), _) => write!(f, "{}{}/nci:{nci}", self.plmn_id.mcc, self.plmn_id.mnc),
            (None, Some(eci)) => write!(f, "{}{}/eci:{eci}", self.plmn_id.mcc, self.plmn_id.mnc),
            (None, None) => write!(f, "{}{}/-", self.plmn_id.mcc, self.plmn_id.mnc),
        }
    }
}

/// Audience of a policy. Absent dimensions are wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    /// Slice dimension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_id: Option<SliceId>,
    /// UE dimension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ue_id: Option<String>,
    /// QoS dimension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qos_id: Option<QosId>,
    /// Cell dimension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_id: Option<CellId>,
}

/// A set of cells sharing one preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TspResource {
    /// Cells the preference applies to
    pub cell_id_list: Vec<CellId>,
    /// Preference for those cells
    pub preference: Preference,
}

/// Traffic steering preference policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TsPolicy {
    /// Who the policy applies to
    pub scope: Scope,
    /// Ordered cell preferences
    pub tsp_resources: Vec<TspResource>,
}

impl TsPolicy {
    /// Parses a JSON policy document.
    pub fn from_json(payload: &[u8]) -> Result<Self, PolicyError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Parses a document after the schema check accepted it.
    pub fn load(
        payload: &[u8],
        schema_path: &str,
        validator: &dyn SchemaValidator,
    ) -> Result<Self, PolicyError> {
        let document: serde_json::Value = serde_json::from_slice(payload)?;
        if !validator.validate(schema_path, &document) {
            return Err(PolicyError::SchemaRejected {
                schema: schema_path.to_string(),
            });
        }
        Ok(serde_json::from_value(document)?)
    }
}

/// Checks a policy document against a JSON schema.
pub trait SchemaValidator: Send + Sync {
    /// Returns true when `document` conforms to the schema at `schema_path`.
    fn validate(&self, schema_path: &str, document: &serde_json::Value) -> bool;
}

/// Validator applying the structural rules of the traffic steering schema
/// without reading the schema file.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl SchemaValidator for StructuralValidator {
    fn validate(&self, _schema_path: &str, document: &serde_json::Value) -> bool {
        let Ok(policy) = serde_json::from_value::<TsPolicy>(document.clone()) else {
            return false;
        };
        let cell_ok = |cell: &CellId| {
            cell.plmn_id.is_complete() && (cell.c_id.nci.is_some() || cell.c_id.eci.is_some())
        };
        let scope = &policy.scope;
        let scope_present = scope.slice_id.is_some()
            || scope.ue_id.is_some()
            || scope.qos_id.is_some()
            || scope.cell_id.is_some();

        scope_present
            && !policy.tsp_resources.is_empty()
            && scope.cell_id.as_ref().map_or(true, cell_ok)
            && policy
                .tsp_resources
                .iter()
                .all(|r| !r.cell_id_list.is_empty() && r.cell_id_list.iter().all(cell_ok))
    }
}
