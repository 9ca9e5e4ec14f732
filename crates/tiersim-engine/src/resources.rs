//! In-memory host and VM pool
//!
//! Every VM runs its workloads side by side; each workload occupies a fixed
//! CPU share for `length / speed` seconds. Utilization at time `t` is the sum
//! of the shares active at `t`.

use tiersim_core::{ResourceModel, Result, SimError, Task, Tier, VmRef};
use tracing::trace;

use crate::config::{HostConfig, ScenarioConfig};

#[derive(Debug, Clone, Copy)]
struct Workload {
    start: f64,
    end: f64,
    utilization: f64,
}

#[derive(Debug, Clone)]
struct Vm {
    speed: f64,
    workloads: Vec<Workload>,
}

impl Vm {
    fn new(speed: f64) -> Self {
        Vm {
            speed,
            workloads: Vec::new(),
        }
    }

    fn utilization(&self, at: f64) -> f64 {
        self.workloads
            .iter()
            .filter(|w| w.start <= at && at < w.end)
            .map(|w| w.utilization)
            .sum()
    }
}

#[derive(Debug, Clone)]
struct Host {
    cell: Option<usize>,
    vms: Vec<Vm>,
}

impl From<&HostConfig> for Host {
    fn from(config: &HostConfig) -> Self {
        Host {
            cell: config.cell,
            vms: config.vm_mips.iter().copied().map(Vm::new).collect(),
        }
    }
}

/// Edge and cloud hosts plus one single-VM host per mobile device
#[derive(Debug, Clone)]
pub struct ResourcePool {
    edge: Vec<Host>,
    cloud: Vec<Host>,
    mobile: Vec<Host>,
}

impl ResourcePool {
    pub fn new(edge: &[HostConfig], cloud: &[HostConfig], mobile_vm_mips: f64, devices: usize) -> Self {
        ResourcePool {
            edge: edge.iter().map(Host::from).collect(),
            cloud: cloud.iter().map(Host::from).collect(),
            mobile: (0..devices)
                .map(|_| Host {
                    cell: None,
                    vms: vec![Vm::new(mobile_vm_mips)],
                })
                .collect(),
        }
    }

    pub fn from_config(config: &ScenarioConfig, devices: usize) -> Self {
        Self::new(&config.edge_hosts, &config.cloud_hosts, config.mobile_vm_mips, devices)
    }

    /// Workloads still running on a VM at `at`
    pub fn active_workloads(&self, vm: VmRef, at: f64) -> Result<usize> {
        Ok(self
            .vm(vm)?
            .workloads
            .iter()
            .filter(|w| w.start <= at && at < w.end)
            .count())
    }

    fn hosts(&self, tier: Tier) -> &[Host] {
        match tier {
            Tier::Mobile => &self.mobile,
            Tier::Edge => &self.edge,
            Tier::Cloud => &self.cloud,
        }
    }

    fn vm(&self, vm: VmRef) -> Result<&Vm> {
        self.hosts(vm.tier)
            .get(vm.host)
            .and_then(|host| host.vms.get(vm.index))
            .ok_or(SimError::UnknownVm(vm))
    }

    fn vm_mut(&mut self, vm: VmRef) -> Result<&mut Vm> {
        let hosts = match vm.tier {
            Tier::Mobile => &mut self.mobile,
            Tier::Edge => &mut self.edge,
            Tier::Cloud => &mut self.cloud,
        };
        hosts
            .get_mut(vm.host)
            .and_then(|host| host.vms.get_mut(vm.index))
            .ok_or(SimError::UnknownVm(vm))
    }
}

impl ResourceModel for ResourcePool {
    fn host_count(&self, tier: Tier) -> usize {
        self.hosts(tier).len()
    }

    fn vm_count(&self, tier: Tier, host: usize) -> usize {
        self.hosts(tier).get(host).map_or(0, |h| h.vms.len())
    }

    fn vm_speed(&self, vm: VmRef) -> Result<f64> {
        Ok(self.vm(vm)?.speed)
    }

    fn host_cell(&self, tier: Tier, host: usize) -> Option<usize> {
        self.hosts(tier).get(host).and_then(|h| h.cell)
    }

    fn current_utilization(&self, vm: VmRef, at: f64) -> Result<f64> {
        Ok(self.vm(vm)?.utilization(at))
    }

    fn submit_workload(&mut self, vm: VmRef, task: &Task, utilization: f64, at: f64) -> Result<f64> {
        let target = self.vm_mut(vm)?;
        if target.speed.is_nan() || target.speed <= 0.0 {
            return Err(SimError::InvalidVmSpeed { vm, speed: target.speed });
        }

        // Finished workloads never count again; the clock only moves forward
        target.workloads.retain(|w| w.end > at);

        let duration = task.length / target.speed;
        target.workloads.push(Workload {
            start: at,
            end: at + duration,
            utilization,
        });
        trace!(task = %task.id, %vm, utilization, duration, "workload submitted");
        Ok(duration)
    }
}
