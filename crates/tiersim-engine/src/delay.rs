//! Network delay model
//!
//! Every access link is treated as a queue fed by all contending devices:
//! - service rate `μ = bandwidth (bytes/s) / mean task size (bytes)`
//! - arrival rate `λ = devices / mean inter-arrival time`
//!
//! M/M/1 gives `1 / (μ - λ)`, M/M/2 gives `4μ / ((2μ - λ)(2μ + λ))`, plus the
//! link's propagation delay. When the queue is unstable the link is saturated
//! and no delay exists; callers get `None` and must reject the transfer.

use serde::{Deserialize, Serialize};

use tiersim_core::{DelayType, Direction, Result, SimError};

use crate::config::TaskTypeProfile;

/// Queueing approximation used for a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueModel {
    #[serde(rename = "MM1")]
    Mm1,
    #[serde(rename = "MM2")]
    Mm2,
}

/// How many devices compete for a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Contention {
    /// Every device shares the link
    Full,
    /// Segmented topology: half of the devices funnel through the hop
    Half,
}

impl Contention {
    pub fn devices(&self, population: usize) -> usize {
        match self {
            Contention::Full => population,
            Contention::Half => population / 2,
        }
    }
}

/// Per-link parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkProfile {
    pub bandwidth_kbps: f64,
    #[serde(default)]
    pub propagation_delay: f64,
    pub queue: QueueModel,
    pub contention: Contention,
}

impl LinkProfile {
    pub fn new(bandwidth_kbps: f64, propagation_delay: f64, queue: QueueModel, contention: Contention) -> Self {
        LinkProfile {
            bandwidth_kbps,
            propagation_delay,
            queue,
            contention,
        }
    }
}

/// Link parameters for each delay type; links left out keep their defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkTable {
    pub wlan: LinkProfile,
    pub man: LinkProfile,
    pub wan: LinkProfile,
}

impl Default for LinkTable {
    fn default() -> Self {
        LinkTable {
            wlan: LinkProfile::new(100_000.0, 0.0, QueueModel::Mm1, Contention::Full),
            man: LinkProfile::new(1_000_000.0, 0.005, QueueModel::Mm1, Contention::Full),
            wan: LinkProfile::new(20_000.0, 0.1, QueueModel::Mm1, Contention::Full),
        }
    }
}

impl LinkTable {
    pub fn get(&self, link: DelayType) -> &LinkProfile {
        match link {
            DelayType::Wlan => &self.wlan,
            DelayType::Man => &self.man,
            DelayType::Wan => &self.wan,
        }
    }
}

/// Workload averages the queues are fed with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficProfile {
    /// Mean time between two tasks of one device (seconds)
    pub mean_interarrival: f64,
    pub avg_input_bytes: f64,
    pub avg_output_bytes: f64,
}

impl TrafficProfile {
    /// Usage-weighted averages over the task-type table
    pub fn from_task_types(task_types: &[TaskTypeProfile]) -> Result<Self> {
        let mut weight_sum = 0.0;
        let mut interarrival = 0.0;
        let mut input = 0.0;
        let mut output = 0.0;

        for profile in task_types {
            let weight = profile.usage_percentage / 100.0;
            if weight <= 0.0 {
                continue;
            }
            weight_sum += weight;
            interarrival += profile.poisson_interarrival * weight;
            input += profile.input_kb * 1000.0 * weight;
            output += profile.output_kb * 1000.0 * weight;
        }

        if weight_sum <= 0.0 {
            return Err(SimError::config("task types have no positive usage percentage"));
        }

        Ok(TrafficProfile {
            mean_interarrival: interarrival / weight_sum,
            avg_input_bytes: input / weight_sum,
            avg_output_bytes: output / weight_sum,
        })
    }

    pub fn avg_bytes(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Upload => self.avg_input_bytes,
            Direction::Download => self.avg_output_bytes,
        }
    }
}

/// `(μ, λ)` in tasks per second
fn rates(bandwidth_kbps: f64, mean_interarrival: f64, avg_size_bytes: f64, devices: usize) -> (f64, f64) {
    let bytes_per_sec = bandwidth_kbps * 1000.0 / 8.0;
    let mu = bytes_per_sec / avg_size_bytes;
    let lambda = devices as f64 / mean_interarrival;
    (mu, lambda)
}

/// Keep only delays that can be scheduled
fn usable(delay: f64) -> Option<f64> {
    (delay.is_finite() && delay > 0.0).then_some(delay)
}

/// M/M/1 delay; `None` when `λ >= μ`
pub fn mm1_delay(
    propagation_delay: f64,
    bandwidth_kbps: f64,
    mean_interarrival: f64,
    avg_size_bytes: f64,
    devices: usize,
) -> Option<f64> {
    let (mu, lambda) = rates(bandwidth_kbps, mean_interarrival, avg_size_bytes, devices);
    if lambda >= mu {
        return None;
    }
    usable(propagation_delay + 1.0 / (mu - lambda))
}

/// M/M/2 delay; `None` when `2μ <= λ`
pub fn mm2_delay(
    propagation_delay: f64,
    bandwidth_kbps: f64,
    mean_interarrival: f64,
    avg_size_bytes: f64,
    devices: usize,
) -> Option<f64> {
    let (mu, lambda) = rates(bandwidth_kbps, mean_interarrival, avg_size_bytes, devices);
    if 2.0 * mu <= lambda {
        return None;
    }
    usable(propagation_delay + (4.0 * mu) / ((2.0 * mu - lambda) * (2.0 * mu + lambda)))
}

/// Converts a hop into a transfer duration
#[derive(Debug, Clone)]
pub struct DelayModel {
    links: LinkTable,
    traffic: TrafficProfile,
    population: usize,
}

impl DelayModel {
    pub fn new(links: LinkTable, traffic: TrafficProfile, population: usize) -> Self {
        DelayModel {
            links,
            traffic,
            population,
        }
    }

    pub fn traffic(&self) -> &TrafficProfile {
        &self.traffic
    }

    /// Duration of one transfer over `link`, or `None` if the link is saturated
    pub fn transfer_delay(&self, link: DelayType, direction: Direction) -> Option<f64> {
        let profile = self.links.get(link);
        let devices = profile.contention.devices(self.population);
        let avg_size = self.traffic.avg_bytes(direction);

        match profile.queue {
            QueueModel::Mm1 => mm1_delay(
                profile.propagation_delay,
                profile.bandwidth_kbps,
                self.traffic.mean_interarrival,
                avg_size,
                devices,
            ),
            QueueModel::Mm2 => mm2_delay(
                profile.propagation_delay,
                profile.bandwidth_kbps,
                self.traffic.mean_interarrival,
                avg_size,
                devices,
            ),
        }
    }

    pub fn upload_delay(&self, link: DelayType) -> Option<f64> {
        self.transfer_delay(link, Direction::Upload)
    }

    pub fn download_delay(&self, link: DelayType) -> Option<f64> {
        self.transfer_delay(link, Direction::Download)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traffic(bytes: f64, interarrival: f64) -> TrafficProfile {
        TrafficProfile {
            mean_interarrival: interarrival,
            avg_input_bytes: bytes,
            avg_output_bytes: bytes,
        }
    }

    #[test]
    fn test_mm1_reference_point() {
        // 8000 Kbps, 1000 B tasks, one task per 5 s per device, 10 devices
        // μ = 1000/s, λ = 2/s, delay = 1/998 s
        let delay = mm1_delay(0.0, 8000.0, 5.0, 1000.0, 10).unwrap();
        assert!((delay - 1.0 / 998.0).abs() < 1e-12);
        assert!((delay - 0.001002).abs() < 1e-6);
    }

    #[test]
    fn test_mm1_saturation() {
        // μ = 1000/s; 5000 devices at 5 s gives λ = 1000/s
        assert_eq!(mm1_delay(0.0, 8000.0, 5.0, 1000.0, 5000), None);
        assert_eq!(mm1_delay(0.0, 8000.0, 5.0, 1000.0, 9000), None);
        assert!(mm1_delay(0.0, 8000.0, 5.0, 1000.0, 4999).is_some());
    }

    #[test]
    fn test_mm2_reference_point() {
        // μ = 1000/s, λ = 2/s, delay = 4μ / ((2μ - λ)(2μ + λ))
        let delay = mm2_delay(0.0, 8000.0, 5.0, 1000.0, 10).unwrap();
        let expected = 4000.0 / (1998.0 * 2002.0);
        assert!((delay - expected).abs() < 1e-15);
        assert!((delay - 0.001000001).abs() < 1e-9);
        assert!(delay < mm1_delay(0.0, 8000.0, 5.0, 1000.0, 10).unwrap());
    }

    #[test]
    fn test_mm2_saturation() {
        // 2μ = 2000/s
        assert_eq!(mm2_delay(0.0, 8000.0, 5.0, 1000.0, 10_000), None);
        assert!(mm2_delay(0.0, 8000.0, 5.0, 1000.0, 9_999).is_some());
    }

    #[test]
    fn test_propagation_is_added() {
        let base = mm1_delay(0.0, 8000.0, 5.0, 1000.0, 10).unwrap();
        let with_prop = mm1_delay(0.1, 8000.0, 5.0, 1000.0, 10).unwrap();
        assert!((with_prop - base - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_delay_monotonic_in_devices() {
        for queue in [QueueModel::Mm1, QueueModel::Mm2] {
            let mut previous = 0.0;
            for devices in (0..6000).step_by(250) {
                let links = LinkTable {
                    wlan: LinkProfile::new(8000.0, 0.0, queue, Contention::Full),
                    ..LinkTable::default()
                };
                let model = DelayModel::new(links, traffic(1000.0, 5.0), devices);
                match model.upload_delay(DelayType::Wlan) {
                    Some(delay) => {
                        assert!(delay >= previous, "{queue:?} delay dropped at {devices} devices");
                        previous = delay;
                    }
                    // Once saturated, more devices stay saturated
                    None => previous = f64::INFINITY,
                }
            }
        }
    }

    #[test]
    fn test_half_contention() {
        let full = LinkTable {
            wlan: LinkProfile::new(8000.0, 0.0, QueueModel::Mm1, Contention::Full),
            ..LinkTable::default()
        };
        let half = LinkTable {
            wlan: LinkProfile::new(8000.0, 0.0, QueueModel::Mm1, Contention::Half),
            ..LinkTable::default()
        };

        // 20 devices with half contention behave like 10 with full
        let a = DelayModel::new(half, traffic(1000.0, 5.0), 20).upload_delay(DelayType::Wlan);
        let b = DelayModel::new(full, traffic(1000.0, 5.0), 10).upload_delay(DelayType::Wlan);
        assert_eq!(a, b);
    }

    #[test]
    fn test_direction_selects_size() {
        let profile = TrafficProfile {
            mean_interarrival: 5.0,
            avg_input_bytes: 2000.0,
            avg_output_bytes: 1000.0,
        };
        let model = DelayModel::new(LinkTable::default(), profile, 10);

        let up = model.upload_delay(DelayType::Wan).unwrap();
        let down = model.download_delay(DelayType::Wan).unwrap();
        assert!(up > down);
    }

    #[test]
    fn test_traffic_profile_weighting() {
        let types = vec![
            TaskTypeProfile {
                usage_percentage: 75.0,
                poisson_interarrival: 4.0,
                input_kb: 2.0,
                output_kb: 1.0,
                ..TaskTypeProfile::default()
            },
            TaskTypeProfile {
                usage_percentage: 25.0,
                poisson_interarrival: 8.0,
                input_kb: 6.0,
                output_kb: 5.0,
                ..TaskTypeProfile::default()
            },
            TaskTypeProfile {
                usage_percentage: 0.0,
                poisson_interarrival: 1000.0,
                input_kb: 1000.0,
                output_kb: 1000.0,
                ..TaskTypeProfile::default()
            },
        ];

        let profile = TrafficProfile::from_task_types(&types).unwrap();
        assert!((profile.mean_interarrival - 5.0).abs() < 1e-9);
        assert!((profile.avg_input_bytes - 3000.0).abs() < 1e-9);
        assert!((profile.avg_output_bytes - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_traffic_profile_requires_usage() {
        let types = vec![TaskTypeProfile {
            usage_percentage: 0.0,
            ..TaskTypeProfile::default()
        }];
        assert!(matches!(TrafficProfile::from_task_types(&types), Err(SimError::Config(_))));
    }
}
