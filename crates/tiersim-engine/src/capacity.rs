//! CPU capacity prediction
//!
//! A task's CPU share on a VM is `100 * length / mips`: a 4000 MI task on a
//! 20000 MIPS VM takes 20% of it.

use tiersim_core::{Result, SimError, Task, UtilizationPredictor, VmRef};

/// Linear utilization model
#[derive(Debug, Clone, Copy, Default)]
pub struct CapacityPredictor;

impl CapacityPredictor {
    pub fn new() -> Self {
        CapacityPredictor
    }

    /// Utilization percentage for a workload of `length` MI on a VM rated `vm_speed` MIPS
    pub fn utilization_for(length: f64, vm_speed: f64) -> f64 {
        100.0 * (length / vm_speed)
    }

    /// Whether a task needing `required` percent fits in a VM currently at `current` percent
    pub fn is_feasible(required: f64, current: f64) -> bool {
        required <= 100.0 - current
    }
}

impl UtilizationPredictor for CapacityPredictor {
    fn predict_utilization(&self, task: &Task, vm: VmRef, vm_speed: f64) -> Result<f64> {
        if vm_speed.is_nan() || vm_speed <= 0.0 {
            return Err(SimError::InvalidVmSpeed { vm, speed: vm_speed });
        }
        Ok(Self::utilization_for(task.length, vm_speed))
    }
}
