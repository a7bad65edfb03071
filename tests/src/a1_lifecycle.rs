//! A1 Policy Lifecycle Tests
//!
//! Drives the northbound A1 handler of a running xApp and checks that the
//! policy store follows:
//! - setup, update and delete
//! - rejection of unsupported types and duplicate ids
//! - suppression of overlapping policies
//! - status notifications and their acknowledgements

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use integration_tests::{
    fast_config, init_test_logging, policy_request, ue_policy, wait_for_condition,
    MockE2Transport, DEFAULT_POLL_INTERVAL, DEFAULT_TEST_TIMEOUT, TEST_NODE,
};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tsxapp::{InMemoryRnib, PolicyManager, XappManager};
use tsxapp_a1::{
    PayloadType, PolicyAckMessage, PolicyType, ENFORCED_STATUS, NOT_ENFORCED_STATUS,
    REASON_ALREADY_EXISTS, REASON_NOT_FOUND, REASON_TYPE_NOT_SUPPORTED,
};

const UE_ID: &str = "0000000000000001";

async fn start_xapp() -> XappManager {
    let rnib = Arc::new(InMemoryRnib::new());
    rnib.add_mho_node(TEST_NODE).await;
    XappManager::start(fast_config(), Arc::new(MockE2Transport::new()), rnib)
}

/// Waits until `check` holds on the policy store.
async fn wait_for_policies<F>(policies: &Arc<PolicyManager>, what: &str, check: F)
where
    F: Fn(&PolicyManager) -> bool + Clone + Send + 'static,
{
    let policies = policies.clone();
    wait_for_condition(
        move || {
            let policies = policies.clone();
            let check = check.clone();
            async move { check(&policies) }
        },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .unwrap_or_else(|_| panic!("policy store never reached: {what}"));
}

fn enforced(policies: &PolicyManager, key: &str) -> Option<bool> {
    policies
        .get_policy(key)
        .ok()
        .flatten()
        .map(|data| data.is_enforced)
}

/// Setup, update and delete are mirrored into the policy store
#[tokio::test]
async fn test_policy_setup_update_delete() {
    init_test_logging();
    let config = fast_config();
    let mut xapp = start_xapp().await;
    let a1 = xapp.a1().clone();

    let result = a1
        .create_policy(policy_request(&config, "1", ue_policy(UE_ID, &[39], &[])))
        .await;
    assert!(result.is_success());
    wait_for_policies(xapp.policies(), "policy 1 enforced", |p| {
        enforced(p, "1") == Some(true)
    })
    .await;

    let mut query = policy_request(&config, "", Bytes::new());
    query.message.header.payload_type = PayloadType::Policy;
    let listing = a1.query_policy(query).await;
    assert!(listing.is_success());
    assert_eq!(listing.message.payload.as_ref(), br#"["1"]"#);

    let updated = ue_policy(UE_ID, &[40], &[39]);
    let result = a1
        .update_policy(policy_request(&config, "1", updated.clone()))
        .await;
    assert!(result.is_success());
    let expected = Bytes::from(updated);
    wait_for_policies(xapp.policies(), "policy 1 updated", move |p| {
        matches!(p.get_policy("1"), Ok(Some(data)) if data.payload == expected)
    })
    .await;

    let result = a1
        .delete_policy(policy_request(&config, "1", Bytes::new()))
        .await;
    assert!(result.is_success());
    wait_for_policies(xapp.policies(), "policy 1 removed", |p| {
        enforced(p, "1").is_none()
    })
    .await;

    xapp.shutdown().await.expect("Shutdown failed");
}

/// Unsupported types, duplicate setups and unknown ids are refused
#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    init_test_logging();
    let config = fast_config();
    let mut xapp = start_xapp().await;
    let a1 = xapp.a1().clone();

    let mut wrong_type = policy_request(&config, "1", ue_policy(UE_ID, &[39], &[]));
    wrong_type.policy_type = PolicyType::new("ORAN_QoSTarget_1.0.0");
    let result = a1.create_policy(wrong_type).await;
    assert!(!result.is_success());
    assert_eq!(result.reason(), REASON_TYPE_NOT_SUPPORTED);

    let document = ue_policy(UE_ID, &[39], &[]);
    assert!(a1
        .create_policy(policy_request(&config, "1", document.clone()))
        .await
        .is_success());
    let result = a1
        .create_policy(policy_request(&config, "1", document))
        .await;
    assert_eq!(result.reason(), REASON_ALREADY_EXISTS);

    let result = a1
        .update_policy(policy_request(&config, "9", ue_policy(UE_ID, &[39], &[])))
        .await;
    assert_eq!(result.reason(), REASON_NOT_FOUND);
    let result = a1
        .delete_policy(policy_request(&config, "9", Bytes::new()))
        .await;
    assert_eq!(result.reason(), REASON_NOT_FOUND);

    xapp.shutdown().await.expect("Shutdown failed");
}

/// A payload that is not a policy document is installed in A1 but never
/// reaches the policy store
#[tokio::test]
async fn test_malformed_policy_is_skipped() {
    init_test_logging();
    let config = fast_config();
    let mut xapp = start_xapp().await;
    let a1 = xapp.a1().clone();

    assert!(a1
        .create_policy(policy_request(&config, "1", "{\"scope\": 42}"))
        .await
        .is_success());
    assert!(a1
        .create_policy(policy_request(&config, "2", ue_policy(UE_ID, &[39], &[])))
        .await
        .is_success());

    wait_for_policies(xapp.policies(), "policy 2 enforced", |p| {
        enforced(p, "2") == Some(true)
    })
    .await;
    assert_eq!(enforced(xapp.policies(), "1"), None);

    xapp.shutdown().await.expect("Shutdown failed");
}

/// A newer policy with the same scope suppresses the enforced one
#[tokio::test]
async fn test_overlapping_policy_suppresses_older() {
    init_test_logging();
    let config = fast_config();
    let mut xapp = start_xapp().await;
    let a1 = xapp.a1().clone();

    assert!(a1
        .create_policy(policy_request(&config, "1", ue_policy(UE_ID, &[39], &[])))
        .await
        .is_success());
    wait_for_policies(xapp.policies(), "policy 1 enforced", |p| {
        enforced(p, "1") == Some(true)
    })
    .await;

    assert!(a1
        .create_policy(policy_request(&config, "3", ue_policy(UE_ID, &[40], &[])))
        .await
        .is_success());
    wait_for_policies(xapp.policies(), "policy 1 suppressed", |p| {
        enforced(p, "1") == Some(false) && enforced(p, "3") == Some(true)
    })
    .await;

    xapp.shutdown().await.expect("Shutdown failed");
}

/// Status notifications carry the enforcement state and are tracked until
/// acknowledged
#[tokio::test]
async fn test_status_notification_and_ack() {
    init_test_logging();
    let config = fast_config();
    let mut xapp = start_xapp().await;
    let a1 = xapp.a1().clone();

    let (status_tx, mut status_rx) = mpsc::channel(8);
    let (ack_tx, ack_rx) = mpsc::channel(8);
    let stream_a1 = a1.clone();
    let stream = tokio::spawn(async move { stream_a1.policy_status(status_tx, ack_rx).await });

    let mut request = policy_request(&config, "1", ue_policy(UE_ID, &[39], &[]));
    request.notification_destination = "nonrtric".to_string();
    assert!(a1.create_policy(request).await.is_success());

    let status = timeout(Duration::from_secs(1), status_rx.recv())
        .await
        .expect("Timeout waiting for status")
        .expect("Status stream closed");
    assert_eq!(status.policy_id, "1");
    assert_eq!(status.message.payload.as_ref(), ENFORCED_STATUS.as_bytes());

    let pending_a1 = a1.clone();
    wait_for_condition(
        move || {
            let a1 = pending_a1.clone();
            async move { a1.pending_acks().await == 1 }
        },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .expect("Status never tracked");

    ack_tx
        .send(PolicyAckMessage::for_status(&status))
        .await
        .expect("Ack stream closed");
    let pending_a1 = a1.clone();
    wait_for_condition(
        move || {
            let a1 = pending_a1.clone();
            async move { a1.pending_acks().await == 0 }
        },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .expect("Ack never matched");

    let not_enforced_id = config.a1.not_enforced_policy_id.clone();
    let mut request = policy_request(&config, &not_enforced_id, ue_policy(UE_ID, &[40], &[]));
    request.notification_destination = "nonrtric".to_string();
    assert!(a1.create_policy(request).await.is_success());

    let status = timeout(Duration::from_secs(1), status_rx.recv())
        .await
        .expect("Timeout waiting for status")
        .expect("Status stream closed");
    assert_eq!(status.message.payload.as_ref(), NOT_ENFORCED_STATUS.as_bytes());

    drop(status_rx);
    stream
        .await
        .expect("Status stream panicked")
        .expect("Status stream failed");

    xapp.shutdown().await.expect("Shutdown failed");
}
