//! Nomadic mobility
//!
//! Each device starts in a random cell, stays there for an exponentially
//! distributed dwell time, then jumps to a different random cell. Whole
//! timelines are drawn up front so `location_of` is a pure lookup.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};

use tiersim_core::{Location, MobilityModel, Result, SimError};

use crate::config::ScenarioConfig;

/// Precomputed `(from_time, cell)` moves per device
#[derive(Debug, Clone)]
pub struct NomadicMobility {
    timelines: Vec<Vec<(f64, usize)>>,
    default_cell: usize,
}

impl NomadicMobility {
    pub fn new(devices: usize, cells: &[usize], mean_dwell_time: f64, horizon: f64, seed: u64) -> Result<Self> {
        let Some(&default_cell) = cells.first() else {
            return Err(SimError::config("mobility needs at least one cell"));
        };
        let dwell = Exp::new(1.0 / mean_dwell_time)
            .map_err(|e| SimError::config(format!("invalid mean dwell time {mean_dwell_time}: {e}")))?;
        let mut rng = StdRng::seed_from_u64(seed);

        let timelines = (0..devices)
            .map(|_| {
                let mut cell = cells[rng.gen_range(0..cells.len())];
                let mut time = 0.0;
                let mut timeline = vec![(time, cell)];

                while cells.len() > 1 {
                    time += dwell.sample(&mut rng);
                    if time >= horizon {
                        break;
                    }
                    // Pick among the other cells only
                    let mut next = rng.gen_range(0..cells.len() - 1);
                    if cells[next] == cell {
                        next = cells.len() - 1;
                    }
                    cell = cells[next];
                    timeline.push((time, cell));
                }
                timeline
            })
            .collect();

        Ok(NomadicMobility {
            timelines,
            default_cell,
        })
    }

    pub fn from_config(config: &ScenarioConfig, devices: usize, seed: u64) -> Result<Self> {
        Self::new(
            devices,
            &config.cells(),
            config.mobility.mean_dwell_time,
            config.simulation_time,
            seed,
        )
    }

    /// Moves of one device, earliest first
    pub fn timeline(&self, device: usize) -> &[(f64, usize)] {
        self.timelines.get(device).map_or(&[], Vec::as_slice)
    }
}

impl MobilityModel for NomadicMobility {
    fn location_of(&self, device: usize, at: f64) -> Location {
        let timeline = self.timeline(device);
        let moved = timeline.partition_point(|&(from, _)| from <= at);
        let cell = match moved {
            0 => timeline.first().map_or(self.default_cell, |&(_, cell)| cell),
            n => timeline[n - 1].1,
        };
        Location::new(cell, at)
    }
}
