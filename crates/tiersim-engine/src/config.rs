//! Scenario configuration
//!
//! A scenario is a JSON document; every field has a default so a file only
//! needs to name what it changes:
//!
//! ```json
//! {
//!   "num_devices": 200,
//!   "policies": ["NEXT_FIT", "WORST_FIT"],
//!   "links": {
//!     "wlan": { "bandwidth_kbps": 8000, "queue": "MM2", "contention": "HALF" },
//!     "man":  { "bandwidth_kbps": 1000000, "propagation_delay": 0.005, "queue": "MM1", "contention": "FULL" },
//!     "wan":  { "bandwidth_kbps": 20000, "propagation_delay": 0.1, "queue": "MM1", "contention": "FULL" }
//!   }
//! }
//! ```
//!
//! A file may also list named link variants. The sweep then runs every
//! variant in place of the top-level `name` and `links`:
//!
//! ```json
//! {
//!   "scenarios": [
//!     { "name": "SCENARIO1", "links": { "wlan": { "bandwidth_kbps": 8000, "queue": "MM2", "contention": "FULL" } } },
//!     { "name": "SCENARIO3", "links": { "wlan": { "bandwidth_kbps": 8000, "queue": "MM1", "contention": "HALF" } } }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tiersim_core::{Result, SimError};

use crate::delay::LinkTable;
use crate::policies::{PolicyKind, PolicyTuning};

/// One row of the task-type lookup table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskTypeProfile {
    pub name: String,
    /// Share of devices running this application (percent)
    pub usage_percentage: f64,
    /// Mean time between two tasks while active (seconds)
    pub poisson_interarrival: f64,
    /// Mean length of an active period (seconds)
    pub active_period: f64,
    /// Mean length of an idle period (seconds)
    pub idle_period: f64,
    pub input_kb: f64,
    pub output_kb: f64,
    /// Mean workload (MI)
    pub length_mi: f64,
}

impl Default for TaskTypeProfile {
    fn default() -> Self {
        TaskTypeProfile {
            name: "generic".to_string(),
            usage_percentage: 100.0,
            poisson_interarrival: 5.0,
            active_period: 45.0,
            idle_period: 15.0,
            input_kb: 100.0,
            output_kb: 100.0,
            length_mi: 2000.0,
        }
    }
}

impl TaskTypeProfile {
    #[allow(clippy::too_many_arguments)]
    fn named(
        name: &str,
        usage_percentage: f64,
        poisson_interarrival: f64,
        active_period: f64,
        idle_period: f64,
        input_kb: f64,
        output_kb: f64,
        length_mi: f64,
    ) -> Self {
        TaskTypeProfile {
            name: name.to_string(),
            usage_percentage,
            poisson_interarrival,
            active_period,
            idle_period,
            input_kb,
            output_kb,
            length_mi,
        }
    }
}

/// A host and the speeds of its VMs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Coverage cell the host serves (edge hosts only)
    #[serde(default)]
    pub cell: Option<usize>,
    pub vm_mips: Vec<f64>,
}

/// Device movement between cells
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobilityConfig {
    /// Mean time a device stays in one cell (seconds)
    pub mean_dwell_time: f64,
}

impl Default for MobilityConfig {
    fn default() -> Self {
        MobilityConfig { mean_dwell_time: 300.0 }
    }
}

/// Named link setup swept as its own scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioVariant {
    pub name: String,
    #[serde(default)]
    pub links: LinkTable,
}

/// Full description of one simulated scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub name: String,
    /// Simulated duration (seconds)
    pub simulation_time: f64,
    /// Tasks submitted before this time are excluded from statistics
    pub warm_up_period: f64,
    pub num_devices: usize,
    pub seed: u64,
    pub links: LinkTable,
    pub edge_hosts: Vec<HostConfig>,
    pub cloud_hosts: Vec<HostConfig>,
    /// Speed of the single VM on every mobile device
    pub mobile_vm_mips: f64,
    pub task_types: Vec<TaskTypeProfile>,
    pub mobility: MobilityConfig,
    pub policy_tuning: PolicyTuning,
    pub policies: Vec<String>,
    /// Link variants to sweep; empty runs `name` with `links` only
    pub scenarios: Vec<ScenarioVariant>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let edge_hosts = (0..8)
            .map(|cell| HostConfig {
                cell: Some(cell),
                vm_mips: vec![20_000.0; 4],
            })
            .collect();

        ScenarioConfig {
            name: "DEFAULT_SCENARIO".to_string(),
            simulation_time: 1800.0,
            warm_up_period: 180.0,
            num_devices: 100,
            seed: 42,
            links: LinkTable::default(),
            edge_hosts,
            cloud_hosts: vec![HostConfig {
                cell: None,
                vm_mips: vec![100_000.0; 4],
            }],
            mobile_vm_mips: 4_000.0,
            task_types: vec![
                TaskTypeProfile::named("AUGMENTED_REALITY", 30.0, 2.0, 40.0, 20.0, 1500.0, 25.0, 3000.0),
                TaskTypeProfile::named("HEALTH_APP", 20.0, 3.0, 45.0, 90.0, 20.0, 1250.0, 1000.0),
                TaskTypeProfile::named("HEAVY_COMP_APP", 20.0, 20.0, 60.0, 120.0, 2500.0, 200.0, 15000.0),
                TaskTypeProfile::named("INFOTAINMENT_APP", 30.0, 7.0, 30.0, 45.0, 25.0, 1000.0, 1500.0),
            ],
            mobility: MobilityConfig::default(),
            policy_tuning: PolicyTuning::default(),
            policies: vec![
                "RANDOM_FIT".to_string(),
                "FIRST_FIT".to_string(),
                "NEXT_FIT".to_string(),
                "BEST_FIT".to_string(),
                "WORST_FIT".to_string(),
            ],
            scenarios: Vec::new(),
        }
    }
}

fn check_positive(value: f64, what: &str) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::config(format!("{what} must be positive, got {value}")))
    }
}

fn check_links(links: &LinkTable, scenario: &str) -> Result<()> {
    for (name, link) in [("wlan", &links.wlan), ("man", &links.man), ("wan", &links.wan)] {
        check_positive(link.bandwidth_kbps, &format!("{scenario} {name} bandwidth"))?;
        if link.propagation_delay < 0.0 {
            return Err(SimError::config(format!("{scenario} {name} propagation delay is negative")));
        }
    }
    Ok(())
}

fn check_hosts(hosts: &[HostConfig], tier: &str) -> Result<()> {
    for (index, host) in hosts.iter().enumerate() {
        if host.vm_mips.is_empty() {
            return Err(SimError::config(format!("{tier} host {index} has no VMs")));
        }
        for mips in &host.vm_mips {
            check_positive(*mips, &format!("{tier} host {index} VM speed"))?;
        }
    }
    Ok(())
}

impl ScenarioConfig {
    /// Load and validate a scenario file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: ScenarioConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Cells served by edge hosts
    pub fn cells(&self) -> Vec<usize> {
        self.edge_hosts.iter().filter_map(|host| host.cell).collect()
    }

    /// Parsed policy list; unknown names are fatal
    pub fn policy_kinds(&self) -> Result<Vec<PolicyKind>> {
        self.policies.iter().map(|name| name.parse()).collect()
    }

    /// Every scenario of the sweep as a standalone config
    pub fn variants(&self) -> Vec<ScenarioConfig> {
        if self.scenarios.is_empty() {
            return vec![self.clone()];
        }
        self.scenarios.iter().map(|variant| self.with_variant(variant)).collect()
    }

    /// Look a scenario up by name (case-insensitive); unknown names are fatal
    pub fn variant(&self, name: &str) -> Result<ScenarioConfig> {
        let name = name.trim();
        if self.scenarios.is_empty() {
            return if self.name.eq_ignore_ascii_case(name) {
                Ok(self.clone())
            } else {
                Err(SimError::UnknownScenario(name.to_string()))
            };
        }
        self.scenarios
            .iter()
            .find(|variant| variant.name.eq_ignore_ascii_case(name))
            .map(|variant| self.with_variant(variant))
            .ok_or_else(|| SimError::UnknownScenario(name.to_string()))
    }

    fn with_variant(&self, variant: &ScenarioVariant) -> ScenarioConfig {
        ScenarioConfig {
            name: variant.name.clone(),
            links: variant.links,
            scenarios: Vec::new(),
            ..self.clone()
        }
    }

    /// Reject configurations that cannot describe a run
    pub fn validate(&self) -> Result<()> {
        check_positive(self.simulation_time, "simulation_time")?;
        if self.warm_up_period < 0.0 || self.warm_up_period >= self.simulation_time {
            return Err(SimError::config(format!(
                "warm_up_period {} must be within [0, simulation_time)",
                self.warm_up_period
            )));
        }
        if self.num_devices == 0 {
            return Err(SimError::config("num_devices must be at least 1"));
        }

        check_links(&self.links, &self.name)?;
        let mut names = HashSet::new();
        for variant in &self.scenarios {
            if variant.name.trim().is_empty() {
                return Err(SimError::config("scenario variant without a name"));
            }
            if !names.insert(variant.name.to_ascii_uppercase()) {
                return Err(SimError::config(format!("scenario {} is listed twice", variant.name)));
            }
            check_links(&variant.links, &variant.name)?;
        }

        if self.edge_hosts.is_empty() {
            return Err(SimError::config("at least one edge host is required"));
        }
        check_hosts(&self.edge_hosts, "edge")?;
        check_hosts(&self.cloud_hosts, "cloud")?;
        check_positive(self.mobile_vm_mips, "mobile_vm_mips")?;

        let mut seen = HashSet::new();
        for (index, host) in self.edge_hosts.iter().enumerate() {
            match host.cell {
                Some(cell) if !seen.insert(cell) => {
                    return Err(SimError::config(format!("cell {cell} is served by more than one edge host")));
                }
                Some(_) => {}
                None => return Err(SimError::config(format!("edge host {index} has no cell"))),
            }
        }

        if !self.task_types.iter().any(|t| t.usage_percentage > 0.0) {
            return Err(SimError::config("task types have no positive usage percentage"));
        }
        for task_type in self.task_types.iter().filter(|t| t.usage_percentage > 0.0) {
            check_positive(task_type.poisson_interarrival, &format!("{} interarrival", task_type.name))?;
            check_positive(task_type.active_period, &format!("{} active period", task_type.name))?;
            check_positive(task_type.input_kb, &format!("{} input size", task_type.name))?;
            check_positive(task_type.output_kb, &format!("{} output size", task_type.name))?;
            check_positive(task_type.length_mi, &format!("{} length", task_type.name))?;
            if task_type.idle_period < 0.0 {
                return Err(SimError::config(format!("{} idle period is negative", task_type.name)));
            }
        }

        check_positive(self.mobility.mean_dwell_time, "mobility.mean_dwell_time")?;

        let tuning = &self.policy_tuning;
        if !(0.0..=1.0).contains(&tuning.mobile_probability) {
            return Err(SimError::config("policy_tuning.mobile_probability must be within [0, 1]"));
        }

        self.policy_kinds()?;
        Ok(())
    }
}
