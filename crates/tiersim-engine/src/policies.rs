//! Offloading policies for task placement
//!
//! A policy answers two questions for every submitted task:
//! - which tier (mobile / edge / cloud) should run it
//! - which VM of that tier, if any has room for it
//!
//! VM admission is uniform across strategies: a VM is *feasible* when the
//! predicted utilization of the task fits in `100 - current utilization`.
//!
//! ## Strategies
//!
//! - **RandomFit**: one random host, one random VM on it, single try
//! - **FirstFit**: first feasible VM in host/VM order
//! - **NextFit**: round-robin from persistent host and per-host VM cursors
//! - **BestFit**: feasible VM with the least residual capacity
//! - **WorstFit**: feasible VM with the most residual capacity

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use tiersim_core::{ResourceModel, Result, SimError, Task, Tier, UtilizationPredictor, VmRef};

use crate::capacity::CapacityPredictor;

/// VM selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStrategy {
    RandomFit,
    FirstFit,
    NextFit,
    BestFit,
    WorstFit,
}

/// Which hosts of a tier are scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostScope {
    /// Every host of the tier
    Cluster,
    /// Only the host serving the device's current cell
    CoLocated,
}

/// Tier selection rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TierSelection {
    /// Always the same tier
    Fixed(Tier),
    /// Mobile with probability `mobile_probability`, edge otherwise
    CoinFlip { mobile_probability: f64 },
    /// Mobile while the device's own host is below `threshold` percent, edge otherwise
    MobileThreshold { threshold: f64 },
    /// Edge while the co-located edge host is below `threshold` percent, mobile otherwise
    EdgeThreshold { threshold: f64 },
}

/// Tunable constants of the heuristic policies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyTuning {
    pub mobile_probability: f64,
    pub mobile_util_threshold: f64,
    pub edge_util_threshold: f64,
}

impl Default for PolicyTuning {
    fn default() -> Self {
        PolicyTuning {
            mobile_probability: 0.5,
            mobile_util_threshold: 75.0,
            edge_util_threshold: 90.0,
        }
    }
}

/// Named orchestrator policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyKind {
    RandomFit,
    FirstFit,
    NextFit,
    BestFit,
    WorstFit,
    Random,
    MobileUtilHeuristic,
    EdgeUtilHeuristic,
    CoLocatedRandomFit,
    OnlyMobile,
    OnlyEdge,
    OnlyCloud,
}

const POLICY_NAMES: [(&str, PolicyKind); 12] = [
    ("RANDOM_FIT", PolicyKind::RandomFit),
    ("FIRST_FIT", PolicyKind::FirstFit),
    ("NEXT_FIT", PolicyKind::NextFit),
    ("BEST_FIT", PolicyKind::BestFit),
    ("WORST_FIT", PolicyKind::WorstFit),
    ("RANDOM", PolicyKind::Random),
    ("MOBILE_UTIL_HEURISTIC", PolicyKind::MobileUtilHeuristic),
    ("EDGE_UTIL_HEURISTIC", PolicyKind::EdgeUtilHeuristic),
    ("CO_LOCATED_RANDOM_FIT", PolicyKind::CoLocatedRandomFit),
    ("ONLY_MOBILE", PolicyKind::OnlyMobile),
    ("ONLY_EDGE", PolicyKind::OnlyEdge),
    ("ONLY_CLOUD", PolicyKind::OnlyCloud),
];

impl PolicyKind {
    /// Every named policy, in table order
    pub fn all() -> impl Iterator<Item = PolicyKind> {
        POLICY_NAMES.iter().map(|(_, kind)| *kind)
    }

    pub fn name(&self) -> &'static str {
        POLICY_NAMES
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(name, _)| *name)
            .unwrap_or("UNKNOWN")
    }

    pub fn tier_selection(&self, tuning: &PolicyTuning) -> TierSelection {
        match self {
            PolicyKind::RandomFit
            | PolicyKind::FirstFit
            | PolicyKind::NextFit
            | PolicyKind::BestFit
            | PolicyKind::WorstFit
            | PolicyKind::CoLocatedRandomFit
            | PolicyKind::OnlyEdge => TierSelection::Fixed(Tier::Edge),
            PolicyKind::OnlyMobile => TierSelection::Fixed(Tier::Mobile),
            PolicyKind::OnlyCloud => TierSelection::Fixed(Tier::Cloud),
            PolicyKind::Random => TierSelection::CoinFlip {
                mobile_probability: tuning.mobile_probability,
            },
            PolicyKind::MobileUtilHeuristic => TierSelection::MobileThreshold {
                threshold: tuning.mobile_util_threshold,
            },
            PolicyKind::EdgeUtilHeuristic => TierSelection::EdgeThreshold {
                threshold: tuning.edge_util_threshold,
            },
        }
    }

    pub fn vm_selection(&self) -> (FitStrategy, HostScope) {
        match self {
            PolicyKind::RandomFit => (FitStrategy::RandomFit, HostScope::Cluster),
            PolicyKind::FirstFit => (FitStrategy::FirstFit, HostScope::Cluster),
            PolicyKind::NextFit => (FitStrategy::NextFit, HostScope::Cluster),
            PolicyKind::BestFit => (FitStrategy::BestFit, HostScope::Cluster),
            PolicyKind::WorstFit => (FitStrategy::WorstFit, HostScope::Cluster),
            PolicyKind::Random | PolicyKind::MobileUtilHeuristic | PolicyKind::EdgeUtilHeuristic => {
                (FitStrategy::WorstFit, HostScope::CoLocated)
            }
            PolicyKind::CoLocatedRandomFit => (FitStrategy::RandomFit, HostScope::CoLocated),
            PolicyKind::OnlyMobile | PolicyKind::OnlyEdge | PolicyKind::OnlyCloud => {
                (FitStrategy::FirstFit, HostScope::Cluster)
            }
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        POLICY_NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, kind)| *kind)
            .ok_or_else(|| SimError::UnknownPolicy(s.to_string()))
    }
}

/// Round-robin position for NEXT_FIT
///
/// One host cursor plus one VM cursor per host. `None` means nothing has been
/// tried yet, so the first advance lands on index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextFitCursor {
    last_host: Option<usize>,
    last_vm: Vec<Option<usize>>,
}

impl NextFitCursor {
    pub fn new(host_count: usize) -> Self {
        NextFitCursor {
            last_host: None,
            last_vm: vec![None; host_count],
        }
    }

    pub fn last_host(&self) -> Option<usize> {
        self.last_host
    }

    pub fn last_vm(&self, host: usize) -> Option<usize> {
        self.last_vm.get(host).copied().flatten()
    }

    /// Move to the next host position in `0..host_count`
    fn advance_host(&mut self, host_count: usize) -> usize {
        let next = self.last_host.map_or(0, |last| (last + 1) % host_count);
        self.last_host = Some(next);
        next
    }

    /// Move to the next VM index of `host` in `0..vm_count`
    fn advance_vm(&mut self, host: usize, vm_count: usize) -> usize {
        if host >= self.last_vm.len() {
            self.last_vm.resize(host + 1, None);
        }
        let slot = &mut self.last_vm[host];
        let next = slot.map_or(0, |last| (last + 1) % vm_count);
        *slot = Some(next);
        next
    }
}

/// Placement decision interface consumed by the lifecycle coordinator
pub trait OffloadPolicy {
    /// Decide which tier should run the task
    fn select_tier(&mut self, task: &Task, resources: &dyn ResourceModel, now: f64) -> Result<Tier>;

    /// Pick a feasible VM of `tier`, or `None` when nothing has room
    fn select_vm(
        &mut self,
        task: &Task,
        tier: Tier,
        resources: &dyn ResourceModel,
        now: f64,
    ) -> Result<Option<VmRef>>;

    /// Utilization model used for admission
    fn predictor(&self) -> &dyn UtilizationPredictor;

    /// Get policy name
    fn name(&self) -> &str;
}

/// Residual capacity of `vm` if the task fits on it
fn feasible_residual(
    predictor: &dyn UtilizationPredictor,
    task: &Task,
    vm: VmRef,
    resources: &dyn ResourceModel,
    now: f64,
) -> Result<Option<f64>> {
    let speed = resources.vm_speed(vm)?;
    let required = predictor.predict_utilization(task, vm, speed)?;
    let current = resources.current_utilization(vm, now)?;

    if CapacityPredictor::is_feasible(required, current) {
        Ok(Some(100.0 - current))
    } else {
        Ok(None)
    }
}

/// Policy built from a [`PolicyKind`]
pub struct PlacementPolicy {
    kind: PolicyKind,
    tier_selection: TierSelection,
    fit: FitStrategy,
    scope: HostScope,
    predictor: Box<dyn UtilizationPredictor>,
    cursors: HashMap<Tier, NextFitCursor>,
    rng: StdRng,
}

impl PlacementPolicy {
    /// Create a policy; NEXT_FIT cursors are sized from the current topology
    pub fn new(kind: PolicyKind, tuning: &PolicyTuning, resources: &dyn ResourceModel, seed: u64) -> Self {
        Self::with_predictor(kind, tuning, resources, seed, Box::new(CapacityPredictor::new()))
    }

    pub fn with_predictor(
        kind: PolicyKind,
        tuning: &PolicyTuning,
        resources: &dyn ResourceModel,
        seed: u64,
        predictor: Box<dyn UtilizationPredictor>,
    ) -> Self {
        let (fit, scope) = kind.vm_selection();
        let cursors = [Tier::Edge, Tier::Cloud]
            .into_iter()
            .map(|tier| (tier, NextFitCursor::new(resources.host_count(tier))))
            .collect();

        PlacementPolicy {
            kind,
            tier_selection: kind.tier_selection(tuning),
            fit,
            scope,
            predictor,
            cursors,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Parse a policy name and build it; unknown names are a configuration error
    pub fn from_name(name: &str, tuning: &PolicyTuning, resources: &dyn ResourceModel, seed: u64) -> Result<Self> {
        let kind = name.parse::<PolicyKind>()?;
        Ok(Self::new(kind, tuning, resources, seed))
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    pub fn cursor(&self, tier: Tier) -> Option<&NextFitCursor> {
        self.cursors.get(&tier)
    }

    /// Hosts of `tier` the task may be placed on
    fn candidate_hosts(&self, task: &Task, tier: Tier, resources: &dyn ResourceModel) -> Vec<usize> {
        match (tier, self.scope) {
            (Tier::Mobile, _) => vec![task.device_id],
            (Tier::Edge, HostScope::CoLocated) => resources
                .host_serving_cell(Tier::Edge, task.submitted_location.cell_id)
                .into_iter()
                .collect(),
            _ => (0..resources.host_count(tier)).collect(),
        }
    }

    fn random_fit(
        &mut self,
        task: &Task,
        tier: Tier,
        hosts: &[usize],
        resources: &dyn ResourceModel,
        now: f64,
    ) -> Result<Option<VmRef>> {
        if hosts.is_empty() {
            return Ok(None);
        }
        let host = hosts[self.rng.gen_range(0..hosts.len())];
        let vm_count = resources.vm_count(tier, host);
        if vm_count == 0 {
            return Ok(None);
        }
        let vm = VmRef::new(tier, host, self.rng.gen_range(0..vm_count));

        let fits = feasible_residual(self.predictor.as_ref(), task, vm, resources, now)?;
        Ok(fits.map(|_| vm))
    }

    fn first_fit(
        &self,
        task: &Task,
        tier: Tier,
        hosts: &[usize],
        resources: &dyn ResourceModel,
        now: f64,
    ) -> Result<Option<VmRef>> {
        for &host in hosts {
            for index in 0..resources.vm_count(tier, host) {
                let vm = VmRef::new(tier, host, index);
                if feasible_residual(self.predictor.as_ref(), task, vm, resources, now)?.is_some() {
                    return Ok(Some(vm));
                }
            }
        }
        Ok(None)
    }

    /// Best fit when `tightest` is set, worst fit otherwise
    fn extremal_fit(
        &self,
        task: &Task,
        tier: Tier,
        hosts: &[usize],
        resources: &dyn ResourceModel,
        now: f64,
        tightest: bool,
    ) -> Result<Option<VmRef>> {
        let mut selected: Option<(VmRef, f64)> = None;

        for &host in hosts {
            for index in 0..resources.vm_count(tier, host) {
                let vm = VmRef::new(tier, host, index);
                let Some(residual) = feasible_residual(self.predictor.as_ref(), task, vm, resources, now)? else {
                    continue;
                };

                let better = match selected {
                    None => true,
                    Some((_, best)) if tightest => residual < best,
                    Some((_, best)) => residual > best,
                };
                if better {
                    selected = Some((vm, residual));
                }
            }
        }

        Ok(selected.map(|(vm, _)| vm))
    }

    fn next_fit(
        &mut self,
        task: &Task,
        tier: Tier,
        hosts: &[usize],
        resources: &dyn ResourceModel,
        now: f64,
    ) -> Result<Option<VmRef>> {
        if hosts.is_empty() {
            return Ok(None);
        }

        let predictor = self.predictor.as_ref();
        let cursor = self
            .cursors
            .entry(tier)
            .or_insert_with(|| NextFitCursor::new(resources.host_count(tier)));

        // At most one pass over the hosts; every host visited moves the cursors.
        for _ in 0..hosts.len() {
            let host = hosts[cursor.advance_host(hosts.len())];
            let vm_count = resources.vm_count(tier, host);

            for _ in 0..vm_count {
                let vm = VmRef::new(tier, host, cursor.advance_vm(host, vm_count));
                if feasible_residual(predictor, task, vm, resources, now)?.is_some() {
                    return Ok(Some(vm));
                }
            }
        }

        Ok(None)
    }
}

impl OffloadPolicy for PlacementPolicy {
    fn select_tier(&mut self, task: &Task, resources: &dyn ResourceModel, now: f64) -> Result<Tier> {
        let tier = match self.tier_selection {
            TierSelection::Fixed(tier) => tier,
            TierSelection::CoinFlip { mobile_probability } => {
                if self.rng.r#gen::<f64>() < mobile_probability {
                    Tier::Mobile
                } else {
                    Tier::Edge
                }
            }
            TierSelection::MobileThreshold { threshold } => {
                let utilization = resources.host_utilization(Tier::Mobile, task.device_id, now)?;
                if utilization < threshold { Tier::Mobile } else { Tier::Edge }
            }
            TierSelection::EdgeThreshold { threshold } => {
                // One edge host per cell: the serving cell identifies the host.
                match resources.host_serving_cell(Tier::Edge, task.submitted_location.cell_id) {
                    Some(host) if resources.host_utilization(Tier::Edge, host, now)? < threshold => Tier::Edge,
                    _ => Tier::Mobile,
                }
            }
        };

        Ok(tier)
    }

    fn select_vm(
        &mut self,
        task: &Task,
        tier: Tier,
        resources: &dyn ResourceModel,
        now: f64,
    ) -> Result<Option<VmRef>> {
        let hosts = self.candidate_hosts(task, tier, resources);

        // Mobile tier: the device's own VMs, first with room
        let fit = if tier == Tier::Mobile { FitStrategy::FirstFit } else { self.fit };

        let selected = match fit {
            FitStrategy::RandomFit => self.random_fit(task, tier, &hosts, resources, now)?,
            FitStrategy::FirstFit => self.first_fit(task, tier, &hosts, resources, now)?,
            FitStrategy::NextFit => self.next_fit(task, tier, &hosts, resources, now)?,
            FitStrategy::BestFit => self.extremal_fit(task, tier, &hosts, resources, now, true)?,
            FitStrategy::WorstFit => self.extremal_fit(task, tier, &hosts, resources, now, false)?,
        };

        debug!(task = %task.id, %tier, ?fit, vm = ?selected, "VM selection");
        Ok(selected)
    }

    fn predictor(&self) -> &dyn UtilizationPredictor {
        self.predictor.as_ref()
    }

    fn name(&self) -> &str {
        self.kind.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{host, task_at, StubResources};

    fn policy(kind: PolicyKind, resources: &StubResources) -> PlacementPolicy {
        PlacementPolicy::new(kind, &PolicyTuning::default(), resources, 7)
    }

    #[test]
    fn test_policy_names_parse_case_insensitively() {
        assert_eq!("best_fit".parse::<PolicyKind>().unwrap(), PolicyKind::BestFit);
        assert_eq!("EDGE_UTIL_HEURISTIC".parse::<PolicyKind>().unwrap(), PolicyKind::EdgeUtilHeuristic);
        assert_eq!(PolicyKind::NextFit.to_string(), "NEXT_FIT");
    }

    #[test]
    fn test_unknown_policy_is_config_error() {
        let resources = StubResources::with_edge(vec![host(0, &[(1000.0, 0.0)])]);
        let result = PlacementPolicy::from_name("CHEAPEST_FIT", &PolicyTuning::default(), &resources, 1);
        assert!(matches!(result, Err(SimError::UnknownPolicy(name)) if name == "CHEAPEST_FIT"));
    }

    #[test]
    fn test_first_fit_skips_full_host() {
        // H0: three VMs at 100%, H1: one idle VM
        let resources = StubResources::with_edge(vec![
            host(0, &[(1000.0, 100.0), (1000.0, 100.0), (1000.0, 100.0)]),
            host(1, &[(1000.0, 0.0)]),
        ]);
        let mut policy = policy(PolicyKind::FirstFit, &resources);
        let task = task_at(1, 0, 100.0);

        let vm = policy.select_vm(&task, Tier::Edge, &resources, 0.0).unwrap();
        assert_eq!(vm, Some(VmRef::new(Tier::Edge, 1, 0)));
    }

    #[test]
    fn test_best_fit_picks_tightest_feasible() {
        // Task needs 10% on a 1000 MIPS VM
        let resources = StubResources::with_edge(vec![
            host(0, &[(1000.0, 20.0), (1000.0, 95.0)]),
            host(1, &[(1000.0, 85.0), (1000.0, 50.0)]),
        ]);
        let mut policy = policy(PolicyKind::BestFit, &resources);
        let task = task_at(1, 0, 100.0);

        let vm = policy.select_vm(&task, Tier::Edge, &resources, 0.0).unwrap();
        // 95% is infeasible; 85% leaves the least room
        assert_eq!(vm, Some(VmRef::new(Tier::Edge, 1, 0)));
    }

    #[test]
    fn test_worst_fit_picks_most_headroom() {
        let resources = StubResources::with_edge(vec![
            host(0, &[(1000.0, 20.0), (1000.0, 95.0)]),
            host(1, &[(1000.0, 5.0), (1000.0, 50.0)]),
        ]);
        let mut policy = policy(PolicyKind::WorstFit, &resources);
        let task = task_at(1, 0, 100.0);

        let vm = policy.select_vm(&task, Tier::Edge, &resources, 0.0).unwrap();
        assert_eq!(vm, Some(VmRef::new(Tier::Edge, 1, 0)));
    }

    #[test]
    fn test_extremal_fits_respect_residual_ordering() {
        let utils = [12.0, 47.0, 3.0, 88.0, 91.0, 60.0];
        let resources = StubResources::with_edge(vec![
            host(0, &[(1000.0, utils[0]), (1000.0, utils[1]), (1000.0, utils[2])]),
            host(1, &[(1000.0, utils[3]), (1000.0, utils[4]), (1000.0, utils[5])]),
        ]);
        let task = task_at(1, 0, 100.0); // needs 10%
        let residual = |vm: VmRef| 100.0 - utils[vm.host * 3 + vm.index];
        let feasible: Vec<f64> = utils.iter().map(|u| 100.0 - u).filter(|r| *r >= 10.0).collect();

        let best = policy(PolicyKind::BestFit, &resources)
            .select_vm(&task, Tier::Edge, &resources, 0.0)
            .unwrap()
            .unwrap();
        let worst = policy(PolicyKind::WorstFit, &resources)
            .select_vm(&task, Tier::Edge, &resources, 0.0)
            .unwrap()
            .unwrap();

        assert!(feasible.iter().all(|r| residual(best) <= *r));
        assert!(feasible.iter().all(|r| residual(worst) >= *r));
    }

    #[test]
    fn test_next_fit_round_robin() {
        let resources = StubResources::with_edge(vec![
            host(0, &[(1000.0, 0.0), (1000.0, 0.0)]),
            host(1, &[(1000.0, 0.0), (1000.0, 0.0)]),
        ]);
        let mut policy = policy(PolicyKind::NextFit, &resources);
        let task = task_at(1, 0, 100.0);

        let picks: Vec<VmRef> = (0..4)
            .map(|_| policy.select_vm(&task, Tier::Edge, &resources, 0.0).unwrap().unwrap())
            .collect();

        assert_eq!(
            picks,
            vec![
                VmRef::new(Tier::Edge, 0, 0),
                VmRef::new(Tier::Edge, 1, 0),
                VmRef::new(Tier::Edge, 0, 1),
                VmRef::new(Tier::Edge, 1, 1),
            ]
        );
    }

    #[test]
    fn test_next_fit_cursor_advances_on_failure() {
        let resources = StubResources::with_edge(vec![
            host(0, &[(1000.0, 100.0), (1000.0, 100.0)]),
            host(1, &[(1000.0, 100.0)]),
            host(2, &[(1000.0, 100.0), (1000.0, 100.0), (1000.0, 100.0)]),
        ]);
        let mut policy = policy(PolicyKind::NextFit, &resources);
        let task = task_at(1, 0, 100.0);

        // A full sweep with nothing feasible gives up
        assert_eq!(policy.select_vm(&task, Tier::Edge, &resources, 0.0).unwrap(), None);

        let cursor = policy.cursor(Tier::Edge).unwrap();
        // Three host visits from the initial position end on host 2
        assert_eq!(cursor.last_host(), Some(2));
        // Every VM of every host was checked once, wrapping back to the last index
        assert_eq!(cursor.last_vm(0), Some(1));
        assert_eq!(cursor.last_vm(1), Some(0));
        assert_eq!(cursor.last_vm(2), Some(2));

        // The next failed call keeps moving: it sweeps again starting at host 0
        assert_eq!(policy.select_vm(&task, Tier::Edge, &resources, 0.0).unwrap(), None);
        let cursor = policy.cursor(Tier::Edge).unwrap();
        assert_eq!(cursor.last_host(), Some(2));
        assert_eq!(cursor.last_vm(0), Some(1));
    }

    #[test]
    fn test_next_fit_resumes_after_success() {
        let resources = StubResources::with_edge(vec![
            host(0, &[(1000.0, 100.0)]),
            host(1, &[(1000.0, 0.0)]),
            host(2, &[(1000.0, 0.0)]),
        ]);
        let mut policy = policy(PolicyKind::NextFit, &resources);
        let task = task_at(1, 0, 100.0);

        assert_eq!(
            policy.select_vm(&task, Tier::Edge, &resources, 0.0).unwrap(),
            Some(VmRef::new(Tier::Edge, 1, 0))
        );
        assert_eq!(policy.cursor(Tier::Edge).unwrap().last_host(), Some(1));

        assert_eq!(
            policy.select_vm(&task, Tier::Edge, &resources, 0.0).unwrap(),
            Some(VmRef::new(Tier::Edge, 2, 0))
        );
        assert_eq!(policy.cursor(Tier::Edge).unwrap().last_host(), Some(2));
    }

    #[test]
    fn test_random_fit_single_try() {
        // Every VM is infeasible, so whatever pair is drawn the answer is none
        let resources = StubResources::with_edge(vec![
            host(0, &[(1000.0, 95.0), (1000.0, 99.0)]),
            host(1, &[(1000.0, 92.0)]),
        ]);
        let mut policy = policy(PolicyKind::RandomFit, &resources);
        let task = task_at(1, 0, 100.0);

        for _ in 0..20 {
            assert_eq!(policy.select_vm(&task, Tier::Edge, &resources, 0.0).unwrap(), None);
        }
    }

    #[test]
    fn test_random_fit_accepts_feasible_draw() {
        let resources = StubResources::with_edge(vec![host(0, &[(1000.0, 0.0)])]);
        let mut policy = policy(PolicyKind::RandomFit, &resources);
        let task = task_at(1, 0, 100.0);

        assert_eq!(
            policy.select_vm(&task, Tier::Edge, &resources, 0.0).unwrap(),
            Some(VmRef::new(Tier::Edge, 0, 0))
        );
    }

    #[test]
    fn test_co_located_scope_ignores_other_hosts() {
        // Device sits in cell 1; host 0 (cell 0) is idle, host 1 (cell 1) is full
        let resources = StubResources::with_edge(vec![
            host(0, &[(1000.0, 0.0)]),
            host(1, &[(1000.0, 100.0)]),
        ]);
        let mut policy = policy(PolicyKind::EdgeUtilHeuristic, &resources);
        let task = task_at(1, 1, 100.0);

        assert_eq!(policy.select_vm(&task, Tier::Edge, &resources, 0.0).unwrap(), None);

        let task = task_at(2, 0, 100.0);
        assert_eq!(
            policy.select_vm(&task, Tier::Edge, &resources, 0.0).unwrap(),
            Some(VmRef::new(Tier::Edge, 0, 0))
        );
    }

    #[test]
    fn test_mobile_tier_uses_device_vm() {
        let mut resources = StubResources::with_edge(vec![host(0, &[(1000.0, 0.0)])]);
        resources.mobile = vec![host(0, &[(500.0, 90.0)]), host(0, &[(500.0, 0.0)])];
        let mut policy = policy(PolicyKind::OnlyMobile, &resources);

        // Device 0's VM is at 90%, a 100 MI task needs 20% of 500 MIPS
        let mut task = task_at(1, 0, 100.0);
        assert_eq!(policy.select_vm(&task, Tier::Mobile, &resources, 0.0).unwrap(), None);

        task.device_id = 1;
        assert_eq!(
            policy.select_vm(&task, Tier::Mobile, &resources, 0.0).unwrap(),
            Some(VmRef::new(Tier::Mobile, 1, 0))
        );
    }

    #[test]
    fn test_fixed_tier_selection() {
        let resources = StubResources::with_edge(vec![host(0, &[(1000.0, 0.0)])]);
        let task = task_at(1, 0, 100.0);

        assert_eq!(policy(PolicyKind::FirstFit, &resources).select_tier(&task, &resources, 0.0).unwrap(), Tier::Edge);
        assert_eq!(policy(PolicyKind::OnlyCloud, &resources).select_tier(&task, &resources, 0.0).unwrap(), Tier::Cloud);
        assert_eq!(policy(PolicyKind::OnlyMobile, &resources).select_tier(&task, &resources, 0.0).unwrap(), Tier::Mobile);
    }

    #[test]
    fn test_coin_flip_extremes() {
        let resources = StubResources::with_edge(vec![host(0, &[(1000.0, 0.0)])]);
        let task = task_at(1, 0, 100.0);

        let always_mobile = PolicyTuning { mobile_probability: 1.0, ..PolicyTuning::default() };
        let mut policy = PlacementPolicy::new(PolicyKind::Random, &always_mobile, &resources, 3);
        for _ in 0..10 {
            assert_eq!(policy.select_tier(&task, &resources, 0.0).unwrap(), Tier::Mobile);
        }

        let never_mobile = PolicyTuning { mobile_probability: 0.0, ..PolicyTuning::default() };
        let mut policy = PlacementPolicy::new(PolicyKind::Random, &never_mobile, &resources, 3);
        for _ in 0..10 {
            assert_eq!(policy.select_tier(&task, &resources, 0.0).unwrap(), Tier::Edge);
        }
    }

    #[test]
    fn test_mobile_util_threshold() {
        let mut resources = StubResources::with_edge(vec![host(0, &[(1000.0, 0.0)])]);
        resources.mobile = vec![host(0, &[(500.0, 40.0)]), host(0, &[(500.0, 80.0)])];
        let mut policy = policy(PolicyKind::MobileUtilHeuristic, &resources);

        let mut task = task_at(1, 0, 100.0);
        assert_eq!(policy.select_tier(&task, &resources, 0.0).unwrap(), Tier::Mobile);

        task.device_id = 1;
        assert_eq!(policy.select_tier(&task, &resources, 0.0).unwrap(), Tier::Edge);
    }

    #[test]
    fn test_edge_util_threshold() {
        let resources = StubResources::with_edge(vec![
            host(0, &[(1000.0, 50.0), (1000.0, 70.0)]),
            host(1, &[(1000.0, 95.0), (1000.0, 92.0)]),
        ]);
        let mut policy = policy(PolicyKind::EdgeUtilHeuristic, &resources);

        assert_eq!(policy.select_tier(&task_at(1, 0, 100.0), &resources, 0.0).unwrap(), Tier::Edge);
        assert_eq!(policy.select_tier(&task_at(2, 1, 100.0), &resources, 0.0).unwrap(), Tier::Mobile);
        // No edge host in cell 9
        assert_eq!(policy.select_tier(&task_at(3, 9, 100.0), &resources, 0.0).unwrap(), Tier::Mobile);
    }
}
