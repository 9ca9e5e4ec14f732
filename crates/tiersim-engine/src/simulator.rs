//! Discrete-event simulator for task offloading
//!
//! Wires the reference collaborators around the lifecycle coordinator and
//! runs one (scenario, device count, policy) combination to completion.

use tracing::{info, warn};

use tiersim_core::{Result, SimContext, SimError};

use crate::config::ScenarioConfig;
use crate::coordinator::TaskLifecycleCoordinator;
use crate::delay::{DelayModel, TrafficProfile};
use crate::load::LoadGenerator;
use crate::logger::{SimLogger, SimulationReport};
use crate::mobility::NomadicMobility;
use crate::policies::{PlacementPolicy, PolicyKind};
use crate::resources::ResourcePool;
use crate::scheduler::{EventQueue, SimEvent};

/// Seed of the `iteration`-th repetition; the first one uses the scenario seed
fn iteration_seed(seed: u64, iteration: usize) -> u64 {
    seed.wrapping_add((iteration as u64).wrapping_sub(1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// One simulation run
pub struct Simulator {
    scenario: String,
    iteration: usize,
    num_devices: usize,
    simulation_time: f64,
    queue: EventQueue,
    resources: ResourcePool,
    mobility: NomadicMobility,
    logger: SimLogger,
    coordinator: TaskLifecycleCoordinator,
}

impl Simulator {
    /// First repetition of a scenario
    pub fn new(config: &ScenarioConfig, policy: PolicyKind, num_devices: usize) -> Result<Self> {
        Self::with_iteration(config, policy, num_devices, 1)
    }

    /// Build every collaborator from the scenario and queue the arrival stream
    ///
    /// Mobility, load and policy draws use seeds derived from the scenario
    /// seed and the 1-based `iteration`, so two runs of the same combination
    /// are identical and repetitions differ.
    pub fn with_iteration(
        config: &ScenarioConfig,
        policy: PolicyKind,
        num_devices: usize,
        iteration: usize,
    ) -> Result<Self> {
        config.validate()?;
        if num_devices == 0 {
            return Err(SimError::config("a run needs at least one device"));
        }
        if iteration == 0 {
            return Err(SimError::config("iterations are numbered from 1"));
        }
        let seed = iteration_seed(config.seed, iteration);

        let resources = ResourcePool::from_config(config, num_devices);
        let mobility = NomadicMobility::from_config(config, num_devices, seed)?;
        let load = LoadGenerator::from_config(config, num_devices, seed.wrapping_add(1))?;

        let traffic = TrafficProfile::from_task_types(&config.task_types)?;
        let delay = DelayModel::new(config.links, traffic, num_devices);
        let policy = PlacementPolicy::new(policy, &config.policy_tuning, &resources, seed.wrapping_add(2));

        let mut devices_per_type = vec![0; config.task_types.len()];
        for device in 0..num_devices {
            if let Some(count) = load.task_type_of(device).and_then(|t| devices_per_type.get_mut(t)) {
                *count += 1;
            }
        }
        let logger = SimLogger::new(config.warm_up_period).with_task_types(
            config
                .task_types
                .iter()
                .map(|profile| profile.name.clone())
                .zip(devices_per_type),
        );

        let mut queue = EventQueue::new();
        for property in load.into_tasks() {
            queue.push_at(property.arrival_time, SimEvent::Arrival(property));
        }

        Ok(Simulator {
            scenario: config.name.clone(),
            iteration,
            num_devices,
            simulation_time: config.simulation_time,
            queue,
            resources,
            mobility,
            logger,
            coordinator: TaskLifecycleCoordinator::new(Box::new(policy), delay),
        })
    }

    /// Process events until the queue drains or the simulated time runs out
    pub fn run(mut self) -> Result<SimulationReport> {
        info!(
            scenario = %self.scenario,
            iteration = self.iteration,
            policy = self.coordinator.policy_name(),
            devices = self.num_devices,
            arrivals = self.queue.len(),
            "simulation started"
        );

        while let Some(time) = self.queue.peek_time() {
            if time > self.simulation_time {
                break;
            }
            let Some((_, event)) = self.queue.pop() else {
                break;
            };

            let mut ctx = SimContext {
                scheduler: &mut self.queue,
                resources: &mut self.resources,
                mobility: &self.mobility,
                sink: &mut self.logger,
            };
            match event {
                SimEvent::Arrival(property) => {
                    self.coordinator.submit(&mut ctx, &property)?;
                }
                SimEvent::Lifecycle(event) => self.coordinator.handle(&mut ctx, event)?,
            }
        }

        let report = SimulationReport {
            iteration: self.iteration,
            ..self
                .logger
                .report(&self.scenario, self.coordinator.policy_name(), self.num_devices)
        };

        info!(
            policy = %report.policy_name,
            devices = report.num_devices,
            tasks = report.total_tasks,
            completed = report.completed_tasks,
            avg_service_time = report.average_service_time,
            "simulation finished"
        );
        if report.failed_tasks() > 0 {
            warn!(
                policy = %report.policy_name,
                devices = report.num_devices,
                bandwidth = report.rejected_bandwidth,
                capacity = report.rejected_capacity,
                mobility = report.failed_mobility,
                "{:.2}% of tasks failed",
                report.failure_percentage()
            );
        }

        Ok(report)
    }
}
