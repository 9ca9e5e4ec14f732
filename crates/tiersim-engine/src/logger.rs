//! Statistics sink
//!
//! Receives every lifecycle hook, emits it as a `tracing` event, and folds it
//! into run totals. Tasks submitted during the warm-up period are logged but
//! left out of the totals.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use tiersim_core::{DelayType, EventSink, Task, Tier, VmRef};

/// Count per tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub mobile: usize,
    pub edge: usize,
    pub cloud: usize,
}

impl TierCounts {
    fn bump(&mut self, tier: Tier) {
        match tier {
            Tier::Mobile => self.mobile += 1,
            Tier::Edge => self.edge += 1,
            Tier::Cloud => self.cloud += 1,
        }
    }

    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::Mobile => self.mobile,
            Tier::Edge => self.edge,
            Tier::Cloud => self.cloud,
        }
    }

    pub fn total(&self) -> usize {
        self.mobile + self.edge + self.cloud
    }
}

/// Bandwidth rejections per link type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCounts {
    pub wlan: usize,
    pub man: usize,
    pub wan: usize,
}

impl LinkCounts {
    fn bump(&mut self, link: DelayType) {
        match link {
            DelayType::Wlan => self.wlan += 1,
            DelayType::Man => self.man += 1,
            DelayType::Wan => self.wan += 1,
        }
    }
}

/// Outcomes of one application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTypeCounts {
    pub name: String,
    /// Devices running this application
    pub devices: usize,
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Result of one (scenario, iteration, devices, policy) run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub scenario: String,
    /// Repetition number, starting at 1
    pub iteration: usize,
    pub policy_name: String,
    pub num_devices: usize,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub rejected_bandwidth: usize,
    pub rejected_capacity: usize,
    pub failed_mobility: usize,
    /// Submitted but not finished when the simulation stopped
    pub unfinished_tasks: usize,
    pub completed_per_tier: TierCounts,
    pub failed_per_tier: TierCounts,
    pub bandwidth_rejections_per_link: LinkCounts,
    pub per_task_type: Vec<TaskTypeCounts>,
    pub average_service_time: f64,
    pub average_network_delay: f64,
    pub average_processing_time: f64,
}

impl SimulationReport {
    pub fn failed_tasks(&self) -> usize {
        self.rejected_bandwidth + self.rejected_capacity + self.failed_mobility
    }

    /// Share of finished tasks that failed, in percent
    pub fn failure_percentage(&self) -> f64 {
        let finished = self.completed_tasks + self.failed_tasks();
        if finished == 0 {
            0.0
        } else {
            100.0 * self.failed_tasks() as f64 / finished as f64
        }
    }
}

/// `EventSink` that aggregates run statistics
#[derive(Debug, Default)]
pub struct SimLogger {
    warm_up_period: f64,
    submitted: usize,
    completed: usize,
    rejected_bandwidth: usize,
    rejected_capacity: usize,
    failed_mobility: usize,
    completed_per_tier: TierCounts,
    failed_per_tier: TierCounts,
    bandwidth_per_link: LinkCounts,
    per_task_type: Vec<TaskTypeCounts>,
    total_service_time: f64,
    total_network_delay: f64,
    total_processing_time: f64,
}

impl SimLogger {
    pub fn new(warm_up_period: f64) -> Self {
        SimLogger {
            warm_up_period,
            ..Default::default()
        }
    }

    /// Break outcomes down by application, given as `(name, devices)` pairs
    /// in task-type index order
    pub fn with_task_types(mut self, task_types: impl IntoIterator<Item = (String, usize)>) -> Self {
        self.per_task_type = task_types
            .into_iter()
            .map(|(name, devices)| TaskTypeCounts {
                name,
                devices,
                ..Default::default()
            })
            .collect();
        self
    }

    fn counted(&self, task: &Task) -> bool {
        task.submit_time >= self.warm_up_period
    }

    fn task_type_mut(&mut self, task: &Task) -> Option<&mut TaskTypeCounts> {
        self.per_task_type.get_mut(task.task_type)
    }

    fn record_failure(&mut self, task: &Task) {
        if let Some(counts) = self.task_type_mut(task) {
            counts.failed += 1;
        }
    }

    pub fn report(&self, scenario: &str, policy_name: &str, num_devices: usize) -> SimulationReport {
        let average = |total: f64| {
            if self.completed == 0 {
                0.0
            } else {
                total / self.completed as f64
            }
        };
        let finished = self.completed + self.rejected_bandwidth + self.rejected_capacity + self.failed_mobility;

        SimulationReport {
            scenario: scenario.to_string(),
            iteration: 1,
            policy_name: policy_name.to_string(),
            num_devices,
            total_tasks: self.submitted,
            completed_tasks: self.completed,
            rejected_bandwidth: self.rejected_bandwidth,
            rejected_capacity: self.rejected_capacity,
            failed_mobility: self.failed_mobility,
            unfinished_tasks: self.submitted.saturating_sub(finished),
            completed_per_tier: self.completed_per_tier,
            failed_per_tier: self.failed_per_tier,
            bandwidth_rejections_per_link: self.bandwidth_per_link,
            per_task_type: self.per_task_type.clone(),
            average_service_time: average(self.total_service_time),
            average_network_delay: average(self.total_network_delay),
            average_processing_time: average(self.total_processing_time),
        }
    }
}

impl EventSink for SimLogger {
    fn task_submitted(&mut self, task: &Task) {
        trace!(task = %task.id, device = task.device_id, cell = task.submitted_location.cell_id, "submitted");
        if self.counted(task) {
            self.submitted += 1;
            if let Some(counts) = self.task_type_mut(task) {
                counts.submitted += 1;
            }
        }
    }

    fn task_started(&mut self, task: &Task, time: f64) {
        trace!(task = %task.id, time, "started");
    }

    fn upload_delay(&mut self, task: &Task, delay: f64, link: DelayType) {
        trace!(task = %task.id, %link, delay, "upload");
    }

    fn download_delay(&mut self, task: &Task, delay: f64, link: DelayType) {
        trace!(task = %task.id, %link, delay, "download");
    }

    fn task_assigned(&mut self, task: &Task, vm: VmRef, time: f64) {
        trace!(task = %task.id, %vm, time, "assigned");
    }

    fn task_executed(&mut self, task: &Task, time: f64) {
        trace!(task = %task.id, time, "executed");
    }

    fn task_ended(&mut self, task: &Task, time: f64) {
        trace!(task = %task.id, time, "ended");
        if !self.counted(task) {
            return;
        }

        self.completed += 1;
        if let Some(counts) = self.task_type_mut(task) {
            counts.completed += 1;
        }
        if let Some(vm) = task.vm() {
            self.completed_per_tier.bump(vm.tier);
        }
        self.total_service_time += time - task.submit_time;
        self.total_network_delay += task.upload_delay + task.download_delay;
        self.total_processing_time += task.processing_time().unwrap_or(0.0);
    }

    fn rejected_due_to_bandwidth(&mut self, task: &Task, time: f64, tier: Tier, link: DelayType) {
        debug!(task = %task.id, time, %tier, %link, "rejected: link saturated");
        if !self.counted(task) {
            return;
        }
        self.rejected_bandwidth += 1;
        self.record_failure(task);
        self.bandwidth_per_link.bump(link);
        self.failed_per_tier.bump(tier);
    }

    fn rejected_due_to_vm_capacity(&mut self, task: &Task, time: f64, tier: Tier) {
        debug!(task = %task.id, time, %tier, "rejected: no VM capacity");
        if !self.counted(task) {
            return;
        }
        self.rejected_capacity += 1;
        self.record_failure(task);
        self.failed_per_tier.bump(tier);
    }

    fn failed_due_to_mobility(&mut self, task: &Task, time: f64) {
        debug!(task = %task.id, time, "failed: device moved");
        if !self.counted(task) {
            return;
        }
        self.failed_mobility += 1;
        self.record_failure(task);
        if let Some(vm) = task.vm() {
            self.failed_per_tier.bump(vm.tier);
        }
    }
}
