//! Error types for tiersim
//!
//! Only structural faults live here. A task that cannot be placed, whose link
//! is saturated, or whose device roams away is a normal outcome recorded in
//! [`crate::TaskStatus`], never an error.

use thiserror::Error;

use crate::types::{TaskId, VmRef};

/// Result type for simulation operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Fatal errors that abort a simulation run
#[derive(Error, Debug)]
pub enum SimError {
    /// Orchestrator policy name not recognized
    #[error("Unknown orchestrator policy: {0}")]
    UnknownPolicy(String),

    /// Scenario variant name not recognized
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// Tier name not recognized
    #[error("Unknown tier: {0}")]
    UnknownTier(String),

    /// VM with a non-positive rated speed was handed to the capacity predictor
    #[error("VM {vm} has invalid speed {speed} MIPS")]
    InvalidVmSpeed { vm: VmRef, speed: f64 },

    /// VM reference does not exist in the resource model
    #[error("VM {0} not found")]
    UnknownVm(VmRef),

    /// Lifecycle event refers to a task the coordinator does not track
    #[error("Task {0} not found")]
    UnknownTask(TaskId),

    /// Placement was recorded twice for the same task
    #[error("Task {0} is already assigned to a VM")]
    AlreadyAssigned(TaskId),

    /// Task reached a stage that needs a VM before placement succeeded
    #[error("Task {0} has no VM assigned")]
    NotAssigned(TaskId),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
