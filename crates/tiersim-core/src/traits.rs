//! Collaborator traits for the offload core
//!
//! The coordinator and placement policies work through these interfaces ONLY.
//! The engine crate ships reference implementations; tests substitute stubs.

use crate::error::Result;
use crate::types::*;

/// Discrete-event scheduler
///
/// Suspension is modelled as scheduling a future event and returning.
pub trait Scheduler {
    /// Current simulated time in seconds
    fn now(&self) -> f64;

    /// Deliver `event` after `delay` seconds (`delay >= 0`)
    fn schedule(&mut self, delay: f64, event: LifecycleEvent);
}

/// VM/host resource model
///
/// Owns CPU utilization; the core only reads it and submits workloads.
pub trait ResourceModel {
    /// Number of hosts in a tier (number of devices for the mobile tier)
    fn host_count(&self, tier: Tier) -> usize;

    /// Number of VMs on a host
    fn vm_count(&self, tier: Tier, host: usize) -> usize;

    /// Rated speed of a VM in MIPS
    fn vm_speed(&self, vm: VmRef) -> Result<f64>;

    /// Coverage cell served by a host, if the host sits in one
    fn host_cell(&self, tier: Tier, host: usize) -> Option<usize>;

    /// Aggregate CPU utilization of a VM (0-100) at simulated time `at`
    fn current_utilization(&self, vm: VmRef, at: f64) -> Result<f64>;

    /// Hand a task to a VM; returns the execution duration in seconds
    fn submit_workload(&mut self, vm: VmRef, task: &Task, utilization: f64, at: f64) -> Result<f64>;

    /// Average utilization over all VMs of a host
    fn host_utilization(&self, tier: Tier, host: usize, at: f64) -> Result<f64> {
        let count = self.vm_count(tier, host);
        if count == 0 {
            return Ok(0.0);
        }

        let mut total = 0.0;
        for index in 0..count {
            total += self.current_utilization(VmRef::new(tier, host, index), at)?;
        }
        Ok(total / count as f64)
    }

    /// Host of `tier` serving `cell` (one host per cell)
    fn host_serving_cell(&self, tier: Tier, cell: usize) -> Option<usize> {
        (0..self.host_count(tier)).find(|&host| self.host_cell(tier, host) == Some(cell))
    }
}

/// Mobility model
pub trait MobilityModel {
    /// Coverage cell of `device` at simulated time `at`
    fn location_of(&self, device: usize, at: f64) -> Location;
}

/// Capability to predict the CPU share a task takes on a VM
pub trait UtilizationPredictor {
    /// Predicted utilization percentage of `task` on a VM rated `vm_speed` MIPS
    fn predict_utilization(&self, task: &Task, vm: VmRef, vm_speed: f64) -> Result<f64>;
}

/// Logging sink: one hook per lifecycle transition
///
/// This is the only observable output of a run besides aggregate statistics.
pub trait EventSink {
    fn task_submitted(&mut self, task: &Task);
    fn task_started(&mut self, task: &Task, time: f64);
    fn upload_delay(&mut self, task: &Task, delay: f64, link: DelayType);
    fn download_delay(&mut self, task: &Task, delay: f64, link: DelayType);
    fn task_assigned(&mut self, task: &Task, vm: VmRef, time: f64);
    fn task_executed(&mut self, task: &Task, time: f64);
    fn task_ended(&mut self, task: &Task, time: f64);
    fn rejected_due_to_bandwidth(&mut self, task: &Task, time: f64, tier: Tier, link: DelayType);
    fn rejected_due_to_vm_capacity(&mut self, task: &Task, time: f64, tier: Tier);
    fn failed_due_to_mobility(&mut self, task: &Task, time: f64);
}

/// Everything a lifecycle transition may touch, passed down explicitly
pub struct SimContext<'a> {
    pub scheduler: &'a mut dyn Scheduler,
    pub resources: &'a mut dyn ResourceModel,
    pub mobility: &'a dyn MobilityModel,
    pub sink: &'a mut dyn EventSink,
}

impl SimContext<'_> {
    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }
}
