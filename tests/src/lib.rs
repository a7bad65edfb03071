//! Integration test framework for the traffic steering xApp
#![allow(missing_docs)]
//!
//! This crate provides test utilities and mock components for integration
//! testing of the xApp against a simulated E2 termination and A1 client.
//!
//! # Components
//!
//! - [`mock_e2`] - Mock E2 termination recording subscriptions and controls
//! - [`test_fixtures`] - Encoded indications, policy documents and configurations
//! - [`test_utils`] - Utility functions for test setup and polling
//!
//! # Test Categories
//!
//! 1. **Steering Scenario** - indications in, policy-driven handover out
//! 2. **A1 Lifecycle** - policy setup, update, delete and status exchange

pub mod mock_e2;
pub mod test_fixtures;
pub mod test_utils;

pub use mock_e2::{MockE2Error, MockE2Event, MockE2Transport};
pub use test_fixtures::{
    fast_config, gnb_ue, nr_cell, policy_request, rrc_status_indication, ue_policy,
    MeasReportBuilder, TEST_NODE, TEST_PLMN,
};
pub use test_utils::{
    init_test_logging, wait_for_condition, TestResult, DEFAULT_POLL_INTERVAL,
    DEFAULT_TEST_TIMEOUT,
};
