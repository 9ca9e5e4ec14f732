//! Core types shared by the offload engine and its collaborators

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SimError};

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Compute location a task can be offloaded to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    /// The VM of the device that generated the task
    Mobile,
    /// Edge server reached over WLAN (MAN when relayed)
    Edge,
    /// Cloud datacenter reached over WAN
    Cloud,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Mobile, Tier::Edge, Tier::Cloud];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Mobile => write!(f, "mobile"),
            Tier::Edge => write!(f, "edge"),
            Tier::Cloud => write!(f, "cloud"),
        }
    }
}

impl FromStr for Tier {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mobile" => Ok(Tier::Mobile),
            "edge" => Ok(Tier::Edge),
            "cloud" => Ok(Tier::Cloud),
            _ => Err(SimError::UnknownTier(s.to_string())),
        }
    }
}

/// Network segment a transfer crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DelayType {
    /// Device to the access point of its cell
    Wlan,
    /// Edge to neighbor edge
    Man,
    /// Device to cloud
    Wan,
}

impl fmt::Display for DelayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelayType::Wlan => write!(f, "WLAN"),
            DelayType::Man => write!(f, "MAN"),
            DelayType::Wan => write!(f, "WAN"),
        }
    }
}

/// Transfer direction; selects input vs output size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Upload,
    Download,
}

/// Coverage cell a device was in at a given simulated time
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Location {
    pub cell_id: usize,
    pub time: f64,
}

impl Location {
    pub fn new(cell_id: usize, time: f64) -> Self {
        Self { cell_id, time }
    }

    /// Two samples are in range of each other iff they share a cell.
    pub fn same_cell(&self, other: &Location) -> bool {
        self.cell_id == other.cell_id
    }
}

/// Reference to a VM in the resource model
///
/// `host` is the edge/cloud host index, or the device id for the mobile tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VmRef {
    pub tier: Tier,
    pub host: usize,
    pub index: usize,
}

impl VmRef {
    pub fn new(tier: Tier, host: usize, index: usize) -> Self {
        Self { tier, host, index }
    }
}

impl fmt::Display for VmRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tier, self.host, self.index)
    }
}

/// Task descriptor produced by the load generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskProperty {
    pub device_id: usize,
    pub task_type: usize,
    pub arrival_time: f64,
    /// Workload in million instructions
    pub length: f64,
    pub input_bytes: f64,
    pub output_bytes: f64,
}

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Submitted,
    Uploading,
    ArrivedAtTarget,
    RelayingToNeighbor,
    Executing,
    Downloading,
    RelayingResult,
    Completed,
    RejectedBandwidth,
    RejectedCapacity,
    FailedMobility,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed
                | TaskStatus::RejectedBandwidth
                | TaskStatus::RejectedCapacity
                | TaskStatus::FailedMobility
        )
    }
}

/// A task travelling through the offload lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub device_id: usize,
    pub task_type: usize,
    pub length: f64,
    pub input_bytes: f64,
    pub output_bytes: f64,
    pub status: TaskStatus,
    pub submitted_location: Location,
    vm: Option<VmRef>,

    // Lifecycle timestamps (simulated seconds)
    pub submit_time: f64,
    pub exec_start: Option<f64>,
    pub exec_finish: Option<f64>,
    pub end_time: Option<f64>,

    // Accumulated network time across hops
    pub upload_delay: f64,
    pub download_delay: f64,
}

impl Task {
    pub fn new(id: TaskId, property: &TaskProperty, submitted_location: Location, now: f64) -> Self {
        Task {
            id,
            device_id: property.device_id,
            task_type: property.task_type,
            length: property.length,
            input_bytes: property.input_bytes,
            output_bytes: property.output_bytes,
            status: TaskStatus::Submitted,
            submitted_location,
            vm: None,
            submit_time: now,
            exec_start: None,
            exec_finish: None,
            end_time: None,
            upload_delay: 0.0,
            download_delay: 0.0,
        }
    }

    /// VM the task was placed on, if placement succeeded
    pub fn vm(&self) -> Option<VmRef> {
        self.vm
    }

    /// Record the placement. Placement is write-once.
    pub fn assign(&mut self, vm: VmRef) -> Result<()> {
        if self.vm.is_some() {
            return Err(SimError::AlreadyAssigned(self.id));
        }
        self.vm = Some(vm);
        Ok(())
    }

    /// Time from submission to the end of the lifecycle
    pub fn service_time(&self) -> Option<f64> {
        self.end_time.map(|end| end - self.submit_time)
    }

    /// Time spent on the VM
    pub fn processing_time(&self) -> Option<f64> {
        match (self.exec_start, self.exec_finish) {
            (Some(start), Some(finish)) => Some(finish - start),
            _ => None,
        }
    }
}

/// Scheduled transition of a task's lifecycle
///
/// Each variant names the hop boundary reached; the coordinator matches on
/// these exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// Request reached the host of the selected VM over `link`
    RequestReceived { task_id: TaskId, link: DelayType },
    /// Request reached the local edge and must cross MAN to a neighbor host
    RequestReceivedForRelay { task_id: TaskId },
    /// Resource model finished executing the task
    ExecutionFinished { task_id: TaskId },
    /// Result reached the local edge from a neighbor host and must be relayed over WLAN
    ResponseReceivedForRelay { task_id: TaskId },
    /// Result reached the device over `link`
    ResponseReceived { task_id: TaskId, link: DelayType },
}

impl LifecycleEvent {
    pub fn task_id(&self) -> TaskId {
        match *self {
            LifecycleEvent::RequestReceived { task_id, .. }
            | LifecycleEvent::RequestReceivedForRelay { task_id }
            | LifecycleEvent::ExecutionFinished { task_id }
            | LifecycleEvent::ResponseReceivedForRelay { task_id }
            | LifecycleEvent::ResponseReceived { task_id, .. } => task_id,
        }
    }
}
