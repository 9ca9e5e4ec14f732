//! tiersim Core - Shared types and traits
//!
//! This crate defines the abstractions shared by the offload engine and the
//! collaborators it drives:
//! - Task, Location, VmRef and the lifecycle event enumeration
//! - Scheduler, ResourceModel, MobilityModel and EventSink traits
//! - Error types

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
