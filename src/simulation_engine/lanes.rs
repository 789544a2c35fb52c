use std::collections::VecDeque;

use crate::global_variables::NUM_LANES;
use crate::simulation_engine::intersections::{IntersectionGeometry, Position, Zone};
use crate::simulation_engine::vehicles::{Direction, Kinematics, Vehicle};

/// Why an arrival did not produce a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalRejection {
    /// The queue is already at its cap.
    QueueFull,
    /// The tail vehicle is still too close to the spawn point.
    TooClose,
    /// No approach has this index.
    UnknownLane(usize),
}

/// Represents one approach: a FIFO queue of vehicles waiting for green,
/// plus the vehicles it has released that are still crossing.
#[derive(Debug, Clone)]
pub struct Lane {
    pub id: usize,
    pub direction: Direction,
    stop_line: f64,
    spawn_point: Position,
    capacity: usize,
    queue: VecDeque<Vehicle>,
    released: Vec<Vehicle>,
}

impl Lane {
    /// Creates an empty approach laid out on `geometry`.
    pub fn new(
        id: usize,
        direction: Direction,
        geometry: &IntersectionGeometry,
        capacity: usize,
    ) -> Self {
        Self {
            id,
            direction,
            stop_line: geometry.stop_line(direction),
            spawn_point: geometry.spawn_point(direction),
            capacity,
            queue: VecDeque::new(),
            released: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.queue.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stop_line(&self) -> f64 {
        self.stop_line
    }

    pub fn spawn_point(&self) -> Position {
        self.spawn_point
    }

    pub fn head(&self) -> Option<&Vehicle> {
        self.queue.front()
    }

    /// Queued vehicles, head first.
    pub fn queued(&self) -> impl Iterator<Item = &Vehicle> {
        self.queue.iter()
    }

    /// Released vehicles still inside the simulated region.
    pub fn released(&self) -> &[Vehicle] {
        &self.released
    }

    /// Checks if a new vehicle can enter at the spawn point.
    pub fn can_add_vehicle(&self, safe_gap: f64) -> Result<(), ArrivalRejection> {
        if self.is_full() {
            return Err(ArrivalRejection::QueueFull);
        }
        if let Some(tail) = self.queue.back() {
            let axis = self.direction.axis();
            let clearance =
                self.direction.sign() * (tail.position.along(axis) - self.spawn_point.along(axis));
            if clearance < safe_gap {
                return Err(ArrivalRejection::TooClose);
            }
        }
        Ok(())
    }

    /// Appends an approaching vehicle at the spawn point if there is room.
    pub fn arrive(
        &mut self,
        id: u64,
        kinematics: Kinematics,
        safe_gap: f64,
    ) -> Result<(), ArrivalRejection> {
        self.can_add_vehicle(safe_gap)?;
        self.queue.push_back(self.make_vehicle(id, kinematics));
        Ok(())
    }

    /// Appends a vehicle already parked and waiting at the next free queue slot.
    ///
    /// Returns `false` when the queue is at its cap.
    pub fn seed_waiting(&mut self, id: u64, kinematics: Kinematics, gap: f64) -> bool {
        if self.is_full() {
            return false;
        }
        let mut vehicle = self.make_vehicle(id, kinematics);
        vehicle.park_at_rank(self.queue.len(), gap);
        self.queue.push_back(vehicle);
        true
    }

    /// Moves every queued vehicle one tick towards its slot.
    pub fn advance_queue(&mut self, gap: f64) {
        for (rank, vehicle) in self.queue.iter_mut().enumerate() {
            vehicle.update(rank, gap);
        }
    }

    /// Whether the head vehicle has reached the stop line region.
    pub fn head_ready(&self) -> bool {
        self.queue.front().is_some_and(Vehicle::is_ready_for_release)
    }

    /// Pops the head of the queue and starts it through the intersection.
    ///
    /// Only the head can ever be released. Returns its id.
    pub fn release_head(&mut self) -> Option<u64> {
        let mut vehicle = self.queue.pop_front()?;
        vehicle.release();
        let id = vehicle.id;
        self.released.push(vehicle);
        Some(id)
    }

    /// Moves released vehicles and drops those that left `bounds`.
    ///
    /// Returns how many were dropped.
    pub fn advance_released(&mut self, gap: f64, bounds: &Zone) -> usize {
        for vehicle in self.released.iter_mut() {
            vehicle.update(0, gap);
        }
        let before = self.released.len();
        self.released.retain(|v| bounds.contains(v.position));
        before - self.released.len()
    }

    /// Whether any released vehicle of this lane is inside `zone`.
    pub fn has_released_in(&self, zone: &Zone) -> bool {
        self.released.iter().any(|v| zone.contains(v.position))
    }

    /// Accumulated wait ticks of the vehicles still queued.
    pub fn total_wait_ticks(&self) -> u64 {
        self.queue.iter().map(|v| v.wait_ticks).sum()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.released.clear();
    }

    fn make_vehicle(&self, id: u64, kinematics: Kinematics) -> Vehicle {
        Vehicle::new(
            id,
            self.id,
            self.direction,
            self.spawn_point,
            self.stop_line,
            kinematics,
        )
    }
}

/// Builds the four approaches in lane order: from north, south, east, west.
pub fn create_lanes(geometry: &IntersectionGeometry, capacity: usize) -> Vec<Lane> {
    (0..NUM_LANES)
        .zip(Direction::BY_LANE)
        .map(|(id, direction)| Lane::new(id, direction, geometry, capacity))
        .collect()
}
