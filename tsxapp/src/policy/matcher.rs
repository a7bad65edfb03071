//! Policy matching and preference scoring.
//!
//! A policy applies to a UE when it is enforced and its scope matches either
//! as a slice policy or as a per-UE policy. Every candidate cell is scored as
//! `RSRP + weight(preference)` and the strictly greatest score wins, so the
//! first of several equal candidates is kept.

use tsxapp_a1::{CellId, Preference, QosId, Scope};

use super::data::PolicyData;

/// Best cell for one UE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsResult {
    /// Position of the winner in the candidate list
    pub index: usize,
    /// Winning cell
    pub cell_id: CellId,
    /// RSRP plus preference weight
    pub score: i32,
}

/// Slice policy: the policy names a complete slice equal to the UE's; every
/// other present dimension must match.
pub fn matches_slice_scope(ue: &Scope, policy: &Scope) -> bool {
    let Some(slice) = &policy.slice_id else {
        return false;
    };
    if !slice.is_complete() || ue.slice_id.as_ref() != Some(slice) {
        return false;
    }

    if let Some(ue_id) = &policy.ue_id {
        if !ue_id.is_empty() && ue.ue_id.as_ref() != Some(ue_id) {
            return false;
        }
    }

    qos_dimension_matches(ue, policy) && cell_dimension_matches(ue, policy)
}

/// Per-UE policy: the policy names the UE; every other present dimension
/// must match.
pub fn matches_ue_scope(ue: &Scope, policy: &Scope) -> bool {
    match &policy.ue_id {
        Some(ue_id) if !ue_id.is_empty() && ue.ue_id.as_ref() == Some(ue_id) => {}
        _ => return false,
    }

    if let Some(slice) = &policy.slice_id {
        if !slice.is_complete() || ue.slice_id.as_ref() != Some(slice) {
            return false;
        }
    }

    qos_dimension_matches(ue, policy) && cell_dimension_matches(ue, policy)
}

/// Enforced and matching as a slice or per-UE policy.
pub fn is_eligible(ue: &Scope, policy: &PolicyData) -> bool {
    policy.is_enforced
        && (matches_slice_scope(ue, &policy.policy.scope)
            || matches_ue_scope(ue, &policy.policy.scope))
}

/// Preference of `cell` for a UE. Among eligible policies the last resource
/// naming the cell wins; DEFAULT when none does.
pub fn get_preference<'a>(
    ue: &Scope,
    cell: &CellId,
    policies: impl IntoIterator<Item = &'a PolicyData>,
) -> Preference {
    let mut preference = Preference::Default;
    for policy in policies {
        if !is_eligible(ue, policy) {
            continue;
        }
        for resource in &policy.policy.tsp_resources {
            if resource.cell_id_list.iter().any(|c| c.same_cell(cell)) {
                preference = resource.preference;
            }
        }
    }
    preference
}

/// Scores every candidate and returns the best one, or `None` when there
/// are no candidates.
pub fn get_ts_result_for_ue(
    ue: &Scope,
    candidates: &[(CellId, i32)],
    policies: &[PolicyData],
) -> Option<TsResult> {
    let mut best: Option<TsResult> = None;
    for (index, (cell_id, rsrp)) in candidates.iter().enumerate() {
        let score = rsrp + get_preference(ue, cell_id, policies).weight();
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(TsResult {
                index,
                cell_id: cell_id.clone(),
                score,
            });
        }
    }
    best
}

/// Every scope dimension absent on both sides or equal on both.
pub fn same_scope(a: &Scope, b: &Scope) -> bool {
    a.slice_id == b.slice_id && a.ue_id == b.ue_id && a.qos_id == b.qos_id && a.cell_id == b.cell_id
}

fn qos_dimension_matches(ue: &Scope, policy: &Scope) -> bool {
    let Some(qos) = &policy.qos_id else {
        return true;
    };
    if qos.qci.is_none() && qos.five_qi.is_none() {
        return false;
    }
    let ue_qos = ue.qos_id.unwrap_or_default();
    field_matches(qos.qci, ue_qos.qci) && field_matches(qos.five_qi, ue_qos.five_qi)
}

fn cell_dimension_matches(ue: &Scope, policy: &Scope) -> bool {
    let Some(cell) = &policy.cell_id else {
        return true;
    };
    if cell.c_id.nci.is_none() && cell.c_id.eci.is_none() {
        return false;
    }
    if !cell.plmn_id.is_complete() {
        return false;
    }
    let Some(ue_cell) = &ue.cell_id else {
        return false;
    };
    field_matches(cell.c_id.nci, ue_cell.c_id.nci)
        && field_matches(cell.c_id.eci, ue_cell.c_id.eci)
        && cell.plmn_id == ue_cell.plmn_id
}

fn field_matches(policy: Option<i64>, ue: Option<i64>) -> bool {
    policy.map_or(true, |value| ue == Some(value))
}

/// QoS dimension of a UE scope.
pub fn ue_qos(five_qi: i64) -> QosId {
    QosId {
        qci: None,
        five_qi: Some(five_qi),
    }
}
