//! Synthetic task arrivals
//!
//! Each device runs one application drawn by usage percentage. It alternates
//! between active and idle periods and, while active, submits tasks with
//! exponential inter-arrival times. Sizes and lengths are exponential around
//! the application's means.

use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

use tiersim_core::{Result, SimError, TaskProperty};

use crate::config::{ScenarioConfig, TaskTypeProfile};

fn exp_with_mean(mean: f64, what: &str) -> Result<Exp<f64>> {
    Exp::new(1.0 / mean).map_err(|e| SimError::config(format!("invalid mean {what} {mean}: {e}")))
}

/// Sampling distributions of one application
struct TaskTypeSampler {
    interarrival: Exp<f64>,
    input_kb: Exp<f64>,
    output_kb: Exp<f64>,
    length: Exp<f64>,
}

impl TaskTypeSampler {
    fn new(profile: &TaskTypeProfile) -> Result<Self> {
        if !(profile.active_period.is_finite() && profile.active_period > 0.0) {
            return Err(SimError::config(format!(
                "{} active period must be positive, got {}",
                profile.name, profile.active_period
            )));
        }
        if !(profile.idle_period.is_finite() && profile.idle_period >= 0.0) {
            return Err(SimError::config(format!(
                "{} idle period must be non-negative, got {}",
                profile.name, profile.idle_period
            )));
        }
        Ok(TaskTypeSampler {
            interarrival: exp_with_mean(profile.poisson_interarrival, "interarrival")?,
            input_kb: exp_with_mean(profile.input_kb, "input size")?,
            output_kb: exp_with_mean(profile.output_kb, "output size")?,
            length: exp_with_mean(profile.length_mi, "length")?,
        })
    }
}

/// Arrival stream for a whole run, sorted by arrival time
#[derive(Debug, Clone)]
pub struct LoadGenerator {
    tasks: Vec<TaskProperty>,
    device_task_types: Vec<usize>,
}

impl LoadGenerator {
    pub fn new(task_types: &[TaskTypeProfile], devices: usize, horizon: f64, seed: u64) -> Result<Self> {
        let chooser = WeightedIndex::new(task_types.iter().map(|t| t.usage_percentage.max(0.0)))
            .map_err(|e| SimError::config(format!("cannot draw task types: {e}")))?;
        let samplers = task_types
            .iter()
            .map(|profile| {
                if profile.usage_percentage > 0.0 {
                    TaskTypeSampler::new(profile).map(Some)
                } else {
                    Ok(None)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut tasks = Vec::new();
        let mut device_task_types = Vec::with_capacity(devices);

        for device_id in 0..devices {
            let task_type = chooser.sample(&mut rng);
            device_task_types.push(task_type);

            let profile = &task_types[task_type];
            let Some(sampler) = &samplers[task_type] else {
                continue;
            };

            let period = profile.active_period + profile.idle_period;
            let mut active_start = rng.gen_range(0.0..profile.active_period);
            let mut time = active_start;

            while time < horizon {
                time += sampler.interarrival.sample(&mut rng);
                if time > active_start + profile.active_period {
                    active_start += period;
                    time = active_start;
                    continue;
                }
                if time >= horizon {
                    break;
                }

                tasks.push(TaskProperty {
                    device_id,
                    task_type,
                    arrival_time: time,
                    length: sampler.length.sample(&mut rng),
                    input_bytes: sampler.input_kb.sample(&mut rng) * 1000.0,
                    output_bytes: sampler.output_kb.sample(&mut rng) * 1000.0,
                });
            }
        }

        tasks.sort_by(|a, b| a.arrival_time.total_cmp(&b.arrival_time));
        Ok(LoadGenerator {
            tasks,
            device_task_types,
        })
    }

    pub fn from_config(config: &ScenarioConfig, devices: usize, seed: u64) -> Result<Self> {
        Self::new(&config.task_types, devices, config.simulation_time, seed)
    }

    pub fn into_tasks(self) -> Vec<TaskProperty> {
        self.tasks
    }

    /// Application assigned to a device
    pub fn task_type_of(&self, device: usize) -> Option<usize> {
        self.device_task_types.get(device).copied()
    }
}
