//! Stub collaborators shared by unit tests

use std::collections::HashMap;

use tiersim_core::*;

pub(crate) struct StubVm {
    pub speed: f64,
    pub utilization: f64,
}

pub(crate) struct StubHost {
    pub cell: Option<usize>,
    pub vms: Vec<StubVm>,
}

/// Host in `cell` with `(speed, utilization)` VMs
pub(crate) fn host(cell: usize, vms: &[(f64, f64)]) -> StubHost {
    StubHost {
        cell: Some(cell),
        vms: vms
            .iter()
            .map(|&(speed, utilization)| StubVm { speed, utilization })
            .collect(),
    }
}

/// Task of device 0 submitted from `cell`
pub(crate) fn task_at(id: u64, cell: usize, length: f64) -> Task {
    let property = TaskProperty {
        device_id: 0,
        task_type: 0,
        arrival_time: 0.0,
        length,
        input_bytes: 1000.0,
        output_bytes: 1000.0,
    };
    Task::new(TaskId(id), &property, Location::new(cell, 0.0), 0.0)
}

/// Resource model with fixed utilizations and a fixed execution time
#[derive(Default)]
pub(crate) struct StubResources {
    pub edge: Vec<StubHost>,
    pub cloud: Vec<StubHost>,
    pub mobile: Vec<StubHost>,
    pub exec_time: f64,
    pub submitted: Vec<(TaskId, VmRef)>,
}

impl StubResources {
    pub fn with_edge(edge: Vec<StubHost>) -> Self {
        StubResources {
            edge,
            exec_time: 1.0,
            ..Default::default()
        }
    }

    fn hosts(&self, tier: Tier) -> &[StubHost] {
        match tier {
            Tier::Mobile => &self.mobile,
            Tier::Edge => &self.edge,
            Tier::Cloud => &self.cloud,
        }
    }

    fn stub_vm(&self, vm: VmRef) -> Result<&StubVm> {
        self.hosts(vm.tier)
            .get(vm.host)
            .and_then(|host| host.vms.get(vm.index))
            .ok_or(SimError::UnknownVm(vm))
    }
}

impl ResourceModel for StubResources {
    fn host_count(&self, tier: Tier) -> usize {
        self.hosts(tier).len()
    }

    fn vm_count(&self, tier: Tier, host: usize) -> usize {
        self.hosts(tier).get(host).map_or(0, |h| h.vms.len())
    }

    fn vm_speed(&self, vm: VmRef) -> Result<f64> {
        Ok(self.stub_vm(vm)?.speed)
    }

    fn host_cell(&self, tier: Tier, host: usize) -> Option<usize> {
        self.hosts(tier).get(host).and_then(|h| h.cell)
    }

    fn current_utilization(&self, vm: VmRef, _at: f64) -> Result<f64> {
        Ok(self.stub_vm(vm)?.utilization)
    }

    fn submit_workload(&mut self, vm: VmRef, task: &Task, _utilization: f64, _at: f64) -> Result<f64> {
        self.stub_vm(vm)?;
        self.submitted.push((task.id, vm));
        Ok(self.exec_time)
    }
}

/// Mobility model following a per-device script of `(from_time, cell)` moves
#[derive(Default)]
pub(crate) struct ScriptedMobility {
    pub moves: HashMap<usize, Vec<(f64, usize)>>,
}

impl ScriptedMobility {
    pub fn stationary(device: usize, cell: usize) -> Self {
        let mut mobility = ScriptedMobility::default();
        mobility.moves.insert(device, vec![(0.0, cell)]);
        mobility
    }

    pub fn then_move(mut self, device: usize, at: f64, cell: usize) -> Self {
        self.moves.entry(device).or_default().push((at, cell));
        self
    }
}

impl MobilityModel for ScriptedMobility {
    fn location_of(&self, device: usize, at: f64) -> Location {
        let cell = self
            .moves
            .get(&device)
            .and_then(|moves| moves.iter().rev().find(|(from, _)| *from <= at))
            .map_or(0, |&(_, cell)| cell);
        Location::new(cell, at)
    }
}

/// Scheduler that keeps pending events in a list and releases them in time order
#[derive(Default)]
pub(crate) struct ManualScheduler {
    pub now: f64,
    pub pending: Vec<(f64, LifecycleEvent)>,
}

impl ManualScheduler {
    /// Pop the earliest event (first scheduled wins ties) and advance the clock
    pub fn pop_next(&mut self) -> Option<LifecycleEvent> {
        let mut earliest: Option<usize> = None;
        for (i, (time, _)) in self.pending.iter().enumerate() {
            if earliest.is_none_or(|e| *time < self.pending[e].0) {
                earliest = Some(i);
            }
        }
        let (time, event) = self.pending.remove(earliest?);
        self.now = time;
        Some(event)
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> f64 {
        self.now
    }

    fn schedule(&mut self, delay: f64, event: LifecycleEvent) {
        assert!(delay >= 0.0, "negative delay scheduled");
        self.pending.push((self.now + delay, event));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SinkRecord {
    Submitted(TaskId),
    Started(TaskId),
    Upload(TaskId, DelayType),
    Download(TaskId, DelayType),
    Assigned(TaskId, VmRef),
    Executed(TaskId),
    Ended(TaskId),
    RejectedBandwidth(TaskId, Tier, DelayType),
    RejectedCapacity(TaskId, Tier),
    FailedMobility(TaskId),
}

/// Sink that records every hook call in order
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub records: Vec<SinkRecord>,
    pub delays: Vec<f64>,
}

impl EventSink for RecordingSink {
    fn task_submitted(&mut self, task: &Task) {
        self.records.push(SinkRecord::Submitted(task.id));
    }

    fn task_started(&mut self, task: &Task, _time: f64) {
        self.records.push(SinkRecord::Started(task.id));
    }

    fn upload_delay(&mut self, task: &Task, delay: f64, link: DelayType) {
        self.delays.push(delay);
        self.records.push(SinkRecord::Upload(task.id, link));
    }

    fn download_delay(&mut self, task: &Task, delay: f64, link: DelayType) {
        self.delays.push(delay);
        self.records.push(SinkRecord::Download(task.id, link));
    }

    fn task_assigned(&mut self, task: &Task, vm: VmRef, _time: f64) {
        self.records.push(SinkRecord::Assigned(task.id, vm));
    }

    fn task_executed(&mut self, task: &Task, _time: f64) {
        self.records.push(SinkRecord::Executed(task.id));
    }

    fn task_ended(&mut self, task: &Task, _time: f64) {
        self.records.push(SinkRecord::Ended(task.id));
    }

    fn rejected_due_to_bandwidth(&mut self, task: &Task, _time: f64, tier: Tier, link: DelayType) {
        self.records.push(SinkRecord::RejectedBandwidth(task.id, tier, link));
    }

    fn rejected_due_to_vm_capacity(&mut self, task: &Task, _time: f64, tier: Tier) {
        self.records.push(SinkRecord::RejectedCapacity(task.id, tier));
    }

    fn failed_due_to_mobility(&mut self, task: &Task, _time: f64) {
        self.records.push(SinkRecord::FailedMobility(task.id));
    }
}
