//! Traffic steering policies: store, matching and A1 synchronization.

pub mod data;
pub mod manager;
pub mod matcher;
pub mod sync;

pub use data::PolicyData;
pub use manager::{describe_policy, PolicyManager, PolicyManagerError, SyncSummary};
pub use matcher::{
    get_preference, get_ts_result_for_ue, is_eligible, matches_slice_scope, matches_ue_scope,
    same_scope, ue_qos, TsResult,
};
pub use sync::PolicySyncTask;
