//! Optimistic Concurrency Integration Tests
//!
//! Connections racing on a shared repository under the different isolation
//! settings.

#[path = "../common/mod.rs"]
mod common;

mod disjoint_commits;
mod isolation_modes;
mod read_conflicts;
mod rollback;
mod write_conflicts;
