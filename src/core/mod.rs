//! Core business logic - framework-agnostic target, approval and rollup operations.

/// Pure rollups over product target snapshots
pub mod aggregate;
/// Approval status state machine
pub mod approval;
/// Categories and product lines
pub mod catalog;
/// Actors and reporting lines
pub mod hierarchy;
/// Fiscal months and quarters
pub mod period;
/// Approval queues and dashboards
pub mod report;
/// Roles and their capabilities
pub mod role;
/// Monthly target reads and edits
pub mod target;
/// Status transitions and history
pub mod workflow;
