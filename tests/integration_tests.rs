//! Entry point for the higher-level, filesystem-touching test suite (§1.D):
//! one binary per `cargo test`, modules split out by scenario group.

#[path = "common/mod.rs"]
mod common;

#[path = "integration_tests/scenarios.rs"]
mod scenarios;
