//! Task lifecycle coordination
//!
//! Drives every task through upload, optional relay, execution, download and
//! optional result relay:
//!
//! ```text
//! Submitted -> Uploading -> ArrivedAtTarget -> (RelayingToNeighbor) -> Executing
//!           -> Downloading -> (RelayingResult) -> Completed
//! ```
//!
//! Any transfer may instead end in `RejectedBandwidth` (saturated link), and
//! any download hop in `FailedMobility` (device left the submission cell).
//! Placement failure ends in `RejectedCapacity`. All three are terminal.
//!
//! Routing:
//! - mobile tier: executes on the device, no network hops
//! - edge tier: WLAN; a VM whose host serves another cell adds a MAN hop
//!   in each direction
//! - cloud tier: WAN both ways
//!
//! Mobility is only checked when a download hop is about to be scheduled, by
//! sampling the device's cell at the hop's arrival time.

use std::collections::HashMap;
use tracing::debug;

use tiersim_core::{
    DelayType, LifecycleEvent, ResourceModel, Result, SimContext, SimError, Task, TaskId, TaskProperty, TaskStatus,
    Tier, VmRef,
};

use crate::delay::DelayModel;
use crate::policies::OffloadPolicy;

/// Event-driven offload state machine
pub struct TaskLifecycleCoordinator {
    policy: Box<dyn OffloadPolicy>,
    delay: DelayModel,
    tasks: HashMap<TaskId, Task>,
    next_task_id: u64,
}

impl TaskLifecycleCoordinator {
    pub fn new(policy: Box<dyn OffloadPolicy>, delay: DelayModel) -> Self {
        TaskLifecycleCoordinator {
            policy,
            delay,
            tasks: HashMap::new(),
            next_task_id: 0,
        }
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// Tasks that have not reached a terminal state
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    /// Place a freshly generated task and start its upload
    pub fn submit(&mut self, ctx: &mut SimContext<'_>, property: &TaskProperty) -> Result<TaskId> {
        let now = ctx.now();
        self.next_task_id += 1;
        let id = TaskId(self.next_task_id);

        let location = ctx.mobility.location_of(property.device_id, now);
        let mut task = Task::new(id, property, location, now);
        ctx.sink.task_submitted(&task);

        let tier = self.policy.select_tier(&task, &*ctx.resources, now)?;
        let Some(vm) = self.policy.select_vm(&task, tier, &*ctx.resources, now)? else {
            self.reject_capacity(ctx, task, tier);
            return Ok(id);
        };

        if tier == Tier::Mobile {
            task.assign(vm)?;
            ctx.sink.task_started(&task, now);
            self.start_execution(ctx, task)?;
            return Ok(id);
        }

        let link = if tier == Tier::Cloud { DelayType::Wan } else { DelayType::Wlan };
        let Some(delay) = self.delay.upload_delay(link) else {
            self.reject_bandwidth(ctx, task, tier, link);
            return Ok(id);
        };

        task.assign(vm)?;
        task.status = TaskStatus::Uploading;
        task.upload_delay += delay;
        ctx.sink.task_started(&task, now);
        ctx.sink.upload_delay(&task, delay, link);

        let event = if is_neighbor(&*ctx.resources, &task, vm) {
            LifecycleEvent::RequestReceivedForRelay { task_id: id }
        } else {
            LifecycleEvent::RequestReceived { task_id: id, link }
        };
        debug!(task = %id, %vm, %link, delay, "upload scheduled");
        ctx.scheduler.schedule(delay, event);
        self.tasks.insert(id, task);

        Ok(id)
    }

    /// Apply one scheduled transition
    pub fn handle(&mut self, ctx: &mut SimContext<'_>, event: LifecycleEvent) -> Result<()> {
        let id = event.task_id();
        let mut task = self.tasks.remove(&id).ok_or(SimError::UnknownTask(id))?;
        let vm = task.vm().ok_or(SimError::NotAssigned(id))?;

        match event {
            LifecycleEvent::RequestReceived { .. } => {
                task.status = TaskStatus::ArrivedAtTarget;
                self.start_execution(ctx, task)
            }
            LifecycleEvent::RequestReceivedForRelay { .. } => {
                task.status = TaskStatus::RelayingToNeighbor;
                let Some(delay) = self.delay.upload_delay(DelayType::Man) else {
                    self.reject_bandwidth(ctx, task, vm.tier, DelayType::Man);
                    return Ok(());
                };

                task.upload_delay += delay;
                ctx.sink.upload_delay(&task, delay, DelayType::Man);
                ctx.scheduler.schedule(
                    delay,
                    LifecycleEvent::RequestReceived {
                        task_id: id,
                        link: DelayType::Man,
                    },
                );
                self.tasks.insert(id, task);
                Ok(())
            }
            LifecycleEvent::ExecutionFinished { .. } => {
                let now = ctx.now();
                task.exec_finish = Some(now);
                ctx.sink.task_executed(&task, now);

                match vm.tier {
                    Tier::Mobile => {
                        self.complete(ctx, task);
                        Ok(())
                    }
                    Tier::Cloud => {
                        task.status = TaskStatus::Downloading;
                        let next = LifecycleEvent::ResponseReceived {
                            task_id: id,
                            link: DelayType::Wan,
                        };
                        self.start_download_hop(ctx, task, DelayType::Wan, next);
                        Ok(())
                    }
                    Tier::Edge => {
                        task.status = TaskStatus::Downloading;
                        if is_neighbor(&*ctx.resources, &task, vm) {
                            let next = LifecycleEvent::ResponseReceivedForRelay { task_id: id };
                            self.start_download_hop(ctx, task, DelayType::Man, next);
                        } else {
                            let next = LifecycleEvent::ResponseReceived {
                                task_id: id,
                                link: DelayType::Wlan,
                            };
                            self.start_download_hop(ctx, task, DelayType::Wlan, next);
                        }
                        Ok(())
                    }
                }
            }
            LifecycleEvent::ResponseReceivedForRelay { .. } => {
                task.status = TaskStatus::RelayingResult;
                let next = LifecycleEvent::ResponseReceived {
                    task_id: id,
                    link: DelayType::Wlan,
                };
                self.start_download_hop(ctx, task, DelayType::Wlan, next);
                Ok(())
            }
            LifecycleEvent::ResponseReceived { .. } => {
                self.complete(ctx, task);
                Ok(())
            }
        }
    }

    /// Hand the task to the resource model and wait for its completion event
    fn start_execution(&mut self, ctx: &mut SimContext<'_>, mut task: Task) -> Result<()> {
        let now = ctx.now();
        let vm = task.vm().ok_or(SimError::NotAssigned(task.id))?;

        let speed = ctx.resources.vm_speed(vm)?;
        let utilization = self.policy.predictor().predict_utilization(&task, vm, speed)?;
        let duration = ctx.resources.submit_workload(vm, &task, utilization, now)?;

        task.status = TaskStatus::Executing;
        task.exec_start = Some(now);
        ctx.sink.task_assigned(&task, vm, now);

        debug!(task = %task.id, %vm, utilization, duration, "execution started");
        ctx.scheduler.schedule(duration, LifecycleEvent::ExecutionFinished { task_id: task.id });
        self.tasks.insert(task.id, task);
        Ok(())
    }

    /// Schedule one result hop, checking saturation and whether the device
    /// is still in its submission cell when the hop lands
    fn start_download_hop(&mut self, ctx: &mut SimContext<'_>, mut task: Task, link: DelayType, next: LifecycleEvent) {
        let tier = task.vm().map_or(Tier::Edge, |vm| vm.tier);
        let Some(delay) = self.delay.download_delay(link) else {
            self.reject_bandwidth(ctx, task, tier, link);
            return;
        };

        let arrival = ctx.now() + delay;
        let location = ctx.mobility.location_of(task.device_id, arrival);
        if !location.same_cell(&task.submitted_location) {
            debug!(
                task = %task.id,
                from = task.submitted_location.cell_id,
                to = location.cell_id,
                "device left coverage before delivery"
            );
            self.fail_mobility(ctx, task);
            return;
        }

        task.download_delay += delay;
        ctx.sink.download_delay(&task, delay, link);
        ctx.scheduler.schedule(delay, next);
        self.tasks.insert(task.id, task);
    }

    fn complete(&mut self, ctx: &mut SimContext<'_>, mut task: Task) {
        let now = ctx.now();
        task.status = TaskStatus::Completed;
        task.end_time = Some(now);
        debug!(task = %task.id, service_time = now - task.submit_time, "task completed");
        ctx.sink.task_ended(&task, now);
    }

    fn reject_capacity(&mut self, ctx: &mut SimContext<'_>, mut task: Task, tier: Tier) {
        let now = ctx.now();
        task.status = TaskStatus::RejectedCapacity;
        task.end_time = Some(now);
        debug!(task = %task.id, %tier, "no VM with enough capacity");
        ctx.sink.rejected_due_to_vm_capacity(&task, now, tier);
    }

    fn reject_bandwidth(&mut self, ctx: &mut SimContext<'_>, mut task: Task, tier: Tier, link: DelayType) {
        let now = ctx.now();
        task.status = TaskStatus::RejectedBandwidth;
        task.end_time = Some(now);
        debug!(task = %task.id, %tier, %link, "link saturated");
        ctx.sink.rejected_due_to_bandwidth(&task, now, tier, link);
    }

    fn fail_mobility(&mut self, ctx: &mut SimContext<'_>, mut task: Task) {
        let now = ctx.now();
        task.status = TaskStatus::FailedMobility;
        task.end_time = Some(now);
        ctx.sink.failed_due_to_mobility(&task, now);
    }
}

/// Edge VM on a host that does not serve the submission cell
fn is_neighbor(resources: &dyn ResourceModel, task: &Task, vm: VmRef) -> bool {
    vm.tier == Tier::Edge && resources.host_cell(vm.tier, vm.host) != Some(task.submitted_location.cell_id)
}
