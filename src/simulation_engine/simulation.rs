// simulation.rs
use log::{debug, trace};
use rand::Rng;

use crate::config::SimConfig;
use crate::global_variables::NUM_LANES;
use crate::simulation_engine::intersections::IntersectionGeometry;
use crate::simulation_engine::lanes::{create_lanes, ArrivalRejection, Lane};
use crate::simulation_engine::vehicles::{Kinematics, Vehicle};

/// What happened during one physics tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicsReport {
    /// Ids of vehicles released this tick (at most one).
    pub released: Vec<u64>,
    /// Released vehicles that left the simulated region this tick.
    pub exited: usize,
}

/// Vehicle physics for the four approaches of one intersection.
///
/// Owns the lanes and the simulated clock; knows nothing about phases or rewards.
#[derive(Debug, Clone)]
pub struct TrafficSimulation {
    geometry: IntersectionGeometry,
    kinematics: Kinematics,
    lanes: Vec<Lane>,
    tick: u64,
    tick_seconds: f64,
    min_release_interval_secs: f64,
    last_release_tick: Option<u64>,
    next_vehicle_id: u64,
}

impl TrafficSimulation {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            geometry: config.geometry.clone(),
            kinematics: config.kinematics,
            lanes: create_lanes(&config.geometry, config.max_queue_length),
            tick: 0,
            tick_seconds: config.tick_seconds,
            min_release_interval_secs: config.min_release_interval_secs,
            last_release_tick: None,
            next_vehicle_id: 1,
        }
    }

    pub fn geometry(&self) -> &IntersectionGeometry {
        &self.geometry
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn lane(&self, index: usize) -> Option<&Lane> {
        self.lanes.get(index)
    }

    /// Physics ticks since the last reset.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds since the last reset.
    pub fn elapsed_secs(&self) -> f64 {
        self.tick as f64 * self.tick_seconds
    }

    pub fn queue_lengths(&self) -> [usize; NUM_LANES] {
        let mut lengths = [0; NUM_LANES];
        for (slot, lane) in lengths.iter_mut().zip(&self.lanes) {
            *slot = lane.len();
        }
        lengths
    }

    /// Accumulated wait ticks of every queued vehicle.
    pub fn total_wait_ticks(&self) -> u64 {
        self.lanes.iter().map(Lane::total_wait_ticks).sum()
    }

    /// Every vehicle still simulated: queued first, then those crossing.
    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.lanes
            .iter()
            .flat_map(|lane| lane.queued())
            .chain(self.lanes.iter().flat_map(|lane| lane.released().iter()))
    }

    /// Removes every vehicle and rewinds the clock.
    pub fn reset(&mut self) {
        for lane in self.lanes.iter_mut() {
            lane.clear();
        }
        self.tick = 0;
        self.last_release_tick = None;
    }

    /// Places up to `count` waiting vehicles on `lane`; returns how many fit.
    pub fn seed_lane(&mut self, lane: usize, count: usize) -> usize {
        let gap = self.geometry.gap_size;
        let mut placed = 0;
        for _ in 0..count {
            let id = self.next_vehicle_id;
            let Some(target) = self.lanes.get_mut(lane) else {
                break;
            };
            if !target.seed_waiting(id, self.kinematics, gap) {
                break;
            }
            self.next_vehicle_id += 1;
            placed += 1;
        }
        placed
    }

    /// Spawns an approaching vehicle at the far end of `lane`.
    pub fn spawn_vehicle(&mut self, lane: usize) -> Result<u64, ArrivalRejection> {
        let id = self.next_vehicle_id;
        let safe_gap = self.geometry.safe_spawn_gap;
        let kinematics = self.kinematics;
        let target = self
            .lanes
            .get_mut(lane)
            .ok_or(ArrivalRejection::UnknownLane(lane))?;
        target.arrive(id, kinematics, safe_gap)?;
        self.next_vehicle_id += 1;
        trace!("Vehicle {} arrived on lane {}", id, lane);
        Ok(id)
    }

    /// Applies one Bernoulli arrival trial per lane; returns the lanes that gained a vehicle.
    pub fn random_arrivals<R: Rng>(&mut self, rng: &mut R, probability: f64) -> Vec<usize> {
        let mut arrived = Vec::new();
        for lane in 0..self.lanes.len() {
            if rng.random::<f64>() < probability && self.spawn_vehicle(lane).is_ok() {
                arrived.push(lane);
            }
        }
        arrived
    }

    /// True when no released vehicle from any lane is inside the clearance zone.
    pub fn is_intersection_clear(&self) -> bool {
        let zone = self.geometry.clearance_zone();
        !self.lanes.iter().any(|lane| lane.has_released_in(&zone))
    }

    /// Whether the global minimum interval since the last release has passed.
    pub fn release_interval_elapsed(&self) -> bool {
        match self.last_release_tick {
            None => true,
            Some(last) => {
                (self.tick - last) as f64 * self.tick_seconds > self.min_release_interval_secs
            }
        }
    }

    /// Advances every vehicle by one tick, releasing the head of `green_lane` when allowed.
    ///
    /// `None` means all red: queues still settle but nothing is released.
    pub fn update_physics(&mut self, green_lane: Option<usize>) -> PhysicsReport {
        let gap = self.geometry.gap_size;
        let mut report = PhysicsReport::default();

        for index in 0..self.lanes.len() {
            self.lanes[index].advance_queue(gap);

            if green_lane != Some(index) || self.lanes[index].is_empty() {
                continue;
            }
            if !self.is_intersection_clear() {
                continue;
            }
            if self.release_interval_elapsed() && self.lanes[index].head_ready() {
                if let Some(id) = self.lanes[index].release_head() {
                    debug!(
                        "Released vehicle {} from lane {} at t={:.2}s",
                        id,
                        index,
                        self.elapsed_secs()
                    );
                    self.last_release_tick = Some(self.tick);
                    report.released.push(id);
                }
            }
        }

        let bounds = self.geometry.exit_bounds();
        for lane in self.lanes.iter_mut() {
            report.exited += lane.advance_released(gap, &bounds);
        }

        self.tick += 1;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn world() -> TrafficSimulation {
        TrafficSimulation::new(&SimConfig::default())
    }

    #[test]
    fn red_lane_never_releases() {
        let mut sim = world();
        sim.seed_lane(1, 3);
        for _ in 0..200 {
            let report = sim.update_physics(Some(0));
            assert!(report.released.is_empty());
        }
        assert_eq!(sim.queue_lengths(), [0, 3, 0, 0]);
    }

    #[test]
    fn all_red_never_releases() {
        let mut sim = world();
        for lane in 0..NUM_LANES {
            sim.seed_lane(lane, 2);
        }
        for _ in 0..100 {
            assert!(sim.update_physics(None).released.is_empty());
        }
        assert_eq!(sim.queue_lengths(), [2, 2, 2, 2]);
    }

    #[test]
    fn green_lane_releases_heads_in_order() {
        let mut sim = world();
        sim.seed_lane(0, 3);
        let expected: Vec<u64> = sim.lane(0).map(|l| l.queued().map(|v| v.id).collect()).unwrap();

        let mut released = Vec::new();
        for _ in 0..1000 {
            released.extend(sim.update_physics(Some(0)).released);
        }
        assert_eq!(released, expected);
        assert_eq!(sim.queue_lengths(), [0, 0, 0, 0]);
    }

    #[test]
    fn releases_respect_minimum_interval() {
        let config = SimConfig::default();
        let min_ticks = (config.min_release_interval_secs / config.tick_seconds).floor() as u64;
        let mut sim = TrafficSimulation::new(&config);
        sim.seed_lane(0, 4);

        let mut release_ticks = Vec::new();
        for _ in 0..2000 {
            let tick = sim.tick();
            if !sim.update_physics(Some(0)).released.is_empty() {
                release_ticks.push(tick);
            }
        }
        assert_eq!(release_ticks.len(), 4);
        for pair in release_ticks.windows(2) {
            assert!(pair[1] - pair[0] >= min_ticks);
        }
    }

    #[test]
    fn no_release_while_clearance_zone_occupied() {
        let mut sim = world();
        sim.seed_lane(0, 1);
        sim.seed_lane(2, 1);
        while sim.update_physics(Some(0)).released.is_empty() {}

        // Drive the released vehicle into the box, then hand green to lane 2.
        while sim.is_intersection_clear() {
            sim.update_physics(None);
        }
        while !sim.is_intersection_clear() {
            let report = sim.update_physics(Some(2));
            assert!(report.released.is_empty());
        }
    }

    #[test]
    fn vehicles_exit_and_are_dropped() {
        let mut sim = world();
        sim.seed_lane(3, 1);
        let mut exited = 0;
        for _ in 0..600 {
            exited += sim.update_physics(Some(3)).exited;
        }
        assert_eq!(exited, 1);
        assert_eq!(sim.vehicles().count(), 0);
    }

    #[test]
    fn random_arrivals_respect_probability_extremes() {
        let mut sim = world();
        let mut rng = SmallRng::seed_from_u64(7);
        assert!(sim.random_arrivals(&mut rng, 0.0).is_empty());
        assert_eq!(sim.random_arrivals(&mut rng, 1.0), vec![0, 1, 2, 3]);
        // Tails are still on the spawn points.
        assert!(sim.random_arrivals(&mut rng, 1.0).is_empty());
    }

    #[test]
    fn spawn_on_unknown_lane_is_not_a_full_queue() {
        let mut sim = world();
        assert_eq!(sim.spawn_vehicle(4), Err(ArrivalRejection::UnknownLane(4)));
        assert!(sim.spawn_vehicle(2).is_ok());
        assert_eq!(sim.queue_lengths(), [0, 0, 1, 0]);
    }

    #[test]
    fn reset_clears_vehicles_and_clock() {
        let mut sim = world();
        sim.seed_lane(0, 2);
        sim.update_physics(Some(0));
        sim.reset();
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.vehicles().count(), 0);
        assert!(sim.release_interval_elapsed());
    }
}
