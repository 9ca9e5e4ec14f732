//! tiersim Engine
//!
//! Offload decision and delivery protocol for a mobile/edge/cloud topology:
//! placement policies, the network delay model and the task lifecycle
//! coordinator, plus the reference collaborators needed to run a scenario
//! end to end.

pub mod capacity;
pub mod policies;
pub mod delay;
pub mod coordinator;

pub mod config;
pub mod scheduler;
pub mod resources;
pub mod mobility;
pub mod load;
pub mod logger;
pub mod simulator;

#[cfg(test)]
mod testing;
