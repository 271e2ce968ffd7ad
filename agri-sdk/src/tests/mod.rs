//! Scenario tests for the Agri SDK
//!
//! Each module drives `AgriClient` end to end against WireMock servers
//! standing in for the backend deployments.

pub mod support;

pub mod orchestration_tests;
pub mod workflow_tests;
