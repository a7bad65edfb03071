//! End-to-End Steering Scenarios
//!
//! The xApp runs with every task spawned against a mock E2 termination:
//! - E2 node discovery and subscription
//! - UE and cell tracking from indications
//! - A1 policy installation driving handovers
//! - RRC idle and reconnect handling

use std::sync::Arc;

use integration_tests::{
    fast_config, gnb_ue, init_test_logging, nr_cell, policy_request, rrc_status_indication,
    ue_policy, wait_for_condition, MeasReportBuilder, MockE2Event, MockE2Transport,
    DEFAULT_POLL_INTERVAL, DEFAULT_TEST_TIMEOUT, TEST_NODE,
};
use tsxapp::{InMemoryRnib, RrcState, TaskState, XappManager};
use tsxapp_e2::{RrcStatus, TriggerType};

const UE_ID: &str = "0000000000000001";

async fn start_xapp(mock: Arc<MockE2Transport>) -> XappManager {
    let rnib = Arc::new(InMemoryRnib::new());
    rnib.add_mho_node(TEST_NODE).await;
    rnib.add_node("e2:legacy", Default::default()).await;

    let xapp = XappManager::start(fast_config(), mock, rnib);
    let nodes = xapp.connect_nodes().await.expect("Failed to connect E2 nodes");
    assert_eq!(nodes, vec![TEST_NODE.to_string()]);
    xapp
}

async fn wait_for_serving_cell(xapp: &XappManager, ue_id: &str, cgi_key: &str) {
    let controller = xapp.controller().clone();
    let (ue_id, cgi_key) = (ue_id.to_string(), cgi_key.to_string());
    wait_for_condition(
        move || {
            let controller = controller.clone();
            let (ue_id, cgi_key) = (ue_id.clone(), cgi_key.clone());
            async move {
                matches!(
                    controller.ues().value(&ue_id),
                    Ok(Some(ue)) if ue.cgi_string == cgi_key
                )
            }
        },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .expect("UE never reached the expected cell");
}

/// Scenario: policy forbids the serving cell
///
/// 1. xApp subscribes to the MHO node for all three triggers
/// 2. A1 installs a policy forbidding cell 81 and preferring cell 39
/// 3. UE served by 81 reports 39 as a weaker neighbor
/// 4. Steering hands the UE over to 39 and the node receives the control
#[tokio::test]
async fn test_policy_driven_handover() {
    init_test_logging();
    let mock = Arc::new(MockE2Transport::new());
    let mut xapp = start_xapp(mock.clone()).await;

    assert_eq!(mock.subscription_count().await, 3);
    for _ in 0..3 {
        match mock.next_event().await {
            Some(MockE2Event::Subscribed { node_id, name, .. }) => {
                assert_eq!(node_id, TEST_NODE);
                assert!(name.starts_with("rimedo-ts-subscription-"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    let config = fast_config();
    let result = xapp
        .a1()
        .create_policy(policy_request(&config, "1", ue_policy(UE_ID, &[39], &[81])))
        .await;
    assert!(result.is_success());

    let report = MeasReportBuilder::new(gnb_ue(1), nr_cell(81))
        .serving(-70, 9)
        .neighbor(nr_cell(39), -80)
        .build();
    mock.send_indication(TEST_NODE, TriggerType::UponRcvMeasReport, report)
        .await
        .expect("Failed to send indication");

    let key_39 = xapp.controller().cell_key(&nr_cell(39));
    let key_81 = xapp.controller().cell_key(&nr_cell(81));
    wait_for_serving_cell(&xapp, UE_ID, &key_39).await;

    let control_mock = mock.clone();
    wait_for_condition(
        move || {
            let mock = control_mock.clone();
            async move { !mock.controls().await.is_empty() }
        },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .expect("No handover control received");

    let controls = mock.controls().await;
    assert_eq!(controls[0].node_id, TEST_NODE);
    let handover = mock.handovers().await[0];
    assert_eq!(handover.ue_id, gnb_ue(1));
    assert_eq!(handover.serving_cgi, nr_cell(81));
    assert_eq!(handover.target_cgi, nr_cell(39));

    let cells = xapp.controller().cells();
    let target = cells.value(&key_39).unwrap().unwrap();
    let source = cells.value(&key_81).unwrap().unwrap();
    assert_eq!(target.handovers_in, 1);
    assert_eq!(source.handovers_out, 1);
    assert!(target.ues.contains(UE_ID));
    assert!(!source.ues.contains(UE_ID));

    xapp.shutdown().await.expect("Shutdown failed");
}

/// Scenario: no policy, UE stays on its best cell
#[tokio::test]
async fn test_no_handover_without_better_cell() {
    init_test_logging();
    let mock = Arc::new(MockE2Transport::new());
    let mut xapp = start_xapp(mock.clone()).await;

    let report = MeasReportBuilder::new(gnb_ue(1), nr_cell(39))
        .serving(-70, 9)
        .neighbor(nr_cell(40), -95)
        .build();
    mock.send_indication(TEST_NODE, TriggerType::Periodic, report)
        .await
        .expect("Failed to send indication");

    let key_39 = xapp.controller().cell_key(&nr_cell(39));
    wait_for_serving_cell(&xapp, UE_ID, &key_39).await;

    let report = xapp.steering().deploy_policies().await;
    assert_eq!(report.evaluated, 1);
    assert_eq!(report.handovers, 0);
    assert!(mock.controls().await.is_empty());

    xapp.shutdown().await.expect("Shutdown failed");
}

/// Scenario: UE goes idle then reconnects
///
/// 1. UE attaches to cell 39 through a measurement report
/// 2. RRC idle detaches it from every cell
/// 3. RRC connected attaches it to the reporting cell again
#[tokio::test]
async fn test_idle_and_reconnect() {
    init_test_logging();
    let mock = Arc::new(MockE2Transport::new());
    let mut xapp = start_xapp(mock.clone()).await;
    let key_39 = xapp.controller().cell_key(&nr_cell(39));

    let report = MeasReportBuilder::new(gnb_ue(1), nr_cell(39))
        .serving(-70, 9)
        .build();
    mock.send_indication(TEST_NODE, TriggerType::UponRcvMeasReport, report)
        .await
        .expect("Failed to send indication");
    wait_for_serving_cell(&xapp, UE_ID, &key_39).await;

    mock.send_indication(
        TEST_NODE,
        TriggerType::UponChangeRrcStatus,
        rrc_status_indication(gnb_ue(1), nr_cell(39), RrcStatus::Idle),
    )
    .await
    .expect("Failed to send indication");

    let controller = xapp.controller().clone();
    let idle_key = key_39.clone();
    wait_for_condition(
        move || {
            let controller = controller.clone();
            let key = idle_key.clone();
            async move {
                let idle = matches!(
                    controller.ues().value(UE_ID),
                    Ok(Some(ue)) if ue.state == RrcState::Idle
                );
                let detached = matches!(
                    controller.cells().value(&key),
                    Ok(Some(cell)) if cell.ues.is_empty()
                );
                idle && detached
            }
        },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .expect("UE never went idle");

    mock.send_indication(
        TEST_NODE,
        TriggerType::UponChangeRrcStatus,
        rrc_status_indication(gnb_ue(1), nr_cell(39), RrcStatus::Connected),
    )
    .await
    .expect("Failed to send indication");

    let controller = xapp.controller().clone();
    let attached_key = key_39.clone();
    wait_for_condition(
        move || {
            let controller = controller.clone();
            let key = attached_key.clone();
            async move {
                matches!(
                    controller.cells().value(&key),
                    Ok(Some(cell)) if cell.ues.contains(UE_ID)
                )
            }
        },
        DEFAULT_TEST_TIMEOUT,
        DEFAULT_POLL_INTERVAL,
    )
    .await
    .expect("UE never reconnected");

    xapp.shutdown().await.expect("Shutdown failed");
}

/// Scenario: the E2 termination refuses subscriptions
#[tokio::test]
async fn test_subscription_failure_is_reported() {
    init_test_logging();
    let rnib = Arc::new(InMemoryRnib::new());
    rnib.add_mho_node(TEST_NODE).await;

    let mut xapp = XappManager::start(
        fast_config(),
        Arc::new(MockE2Transport::rejecting()),
        rnib,
    );
    assert!(xapp.connect_nodes().await.unwrap().is_empty());
    assert_eq!(xapp.connect_node(TEST_NODE).await.unwrap(), 0);

    xapp.shutdown().await.expect("Shutdown failed");
    assert!(xapp
        .status_summary()
        .iter()
        .all(|(_, state)| *state == TaskState::Stopped));
}
