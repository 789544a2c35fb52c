use serde::{Deserialize, Serialize};

use crate::global_variables::{
    ACCELERATION, ARRIVAL_TOLERANCE, BRAKING_DISTANCE, BRAKING_GAIN, DECELERATION, MAX_SPEED,
    RELEASE_ACCELERATION, RELEASE_MAX_SPEED, STOPPED_SPEED,
};
use crate::simulation_engine::intersections::Position;

/// Screen axis a vehicle travels along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Travel direction of an approach, in screen coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Southbound, arriving from the top edge.
    Down,
    /// Northbound, arriving from the bottom edge.
    Up,
    /// Westbound, arriving from the right edge.
    Left,
    /// Eastbound, arriving from the left edge.
    Right,
}

impl Direction {
    /// Approach directions indexed by lane number.
    pub const BY_LANE: [Direction; 4] = [
        Direction::Down,
        Direction::Up,
        Direction::Left,
        Direction::Right,
    ];

    pub fn for_lane(lane: usize) -> Option<Direction> {
        Self::BY_LANE.get(lane).copied()
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::Down | Direction::Up => Axis::Y,
            Direction::Left | Direction::Right => Axis::X,
        }
    }

    /// +1.0 when travel increases the coordinate along `axis()`, -1.0 otherwise.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Down | Direction::Right => 1.0,
            Direction::Up | Direction::Left => -1.0,
        }
    }

    /// Which side of the road centre line the lane sits on, along the cross axis.
    pub fn cross_side(self) -> f64 {
        match self {
            Direction::Down | Direction::Left => -1.0,
            Direction::Up | Direction::Right => 1.0,
        }
    }
}

/// Kinematic state of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleState {
    /// Driving towards its queue slot.
    Approaching,
    /// Stopped at its queue slot.
    Waiting,
    /// Released by the signal and driving through the intersection.
    Leaving,
}

/// Per-vehicle motion constants, in pixels per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Kinematics {
    pub max_speed: f64,
    pub acceleration: f64,
    pub deceleration: f64,
    /// Speed cap once released.
    pub release_max_speed: f64,
    pub release_acceleration: f64,
    /// Distance below which a vehicle starts braking towards its slot.
    pub braking_distance: f64,
    /// Distance below which a vehicle counts as arrived.
    pub arrival_tolerance: f64,
    /// Braking speed per pixel of remaining distance.
    pub braking_gain: f64,
    /// Speeds below this count as stopped for wait accounting.
    pub stopped_speed: f64,
}

impl Default for Kinematics {
    fn default() -> Self {
        Self {
            max_speed: MAX_SPEED,
            acceleration: ACCELERATION,
            deceleration: DECELERATION,
            release_max_speed: RELEASE_MAX_SPEED,
            release_acceleration: RELEASE_ACCELERATION,
            braking_distance: BRAKING_DISTANCE,
            arrival_tolerance: ARRIVAL_TOLERANCE,
            braking_gain: BRAKING_GAIN,
            stopped_speed: STOPPED_SPEED,
        }
    }
}

/// Represents a vehicle on one approach of the intersection.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: u64,
    /// Index of the lane that spawned the vehicle.
    pub lane: usize,
    pub position: Position,
    pub direction: Direction,
    pub speed: f64,
    pub kinematics: Kinematics,
    pub state: VehicleState,
    pub is_braking: bool,
    /// Ticks spent stopped while waiting.
    pub wait_ticks: u64,
    /// Coordinate of the head-of-queue slot along the travel axis.
    stop_line: f64,
}

impl Vehicle {
    /// Creates an approaching vehicle at rest at `position`.
    pub fn new(
        id: u64,
        lane: usize,
        direction: Direction,
        position: Position,
        stop_line: f64,
        kinematics: Kinematics,
    ) -> Self {
        Self {
            id,
            lane,
            position,
            direction,
            speed: 0.0,
            kinematics,
            state: VehicleState::Approaching,
            is_braking: false,
            wait_ticks: 0,
            stop_line,
        }
    }

    pub fn stop_line(&self) -> f64 {
        self.stop_line
    }

    /// Queue slot coordinate for a vehicle ranked `rank` (0 = head).
    pub fn target_for_rank(&self, rank: usize, gap: f64) -> f64 {
        self.stop_line - self.direction.sign() * rank as f64 * gap
    }

    /// Signed distance still to travel before reaching the slot for `rank`.
    pub fn distance_to_target(&self, rank: usize, gap: f64) -> f64 {
        let axis = self.direction.axis();
        self.direction.sign() * (self.target_for_rank(rank, gap) - self.position.along(axis))
    }

    /// Places the vehicle directly on its slot, stopped and waiting.
    pub fn park_at_rank(&mut self, rank: usize, gap: f64) {
        let target = self.target_for_rank(rank, gap);
        self.position.set_along(self.direction.axis(), target);
        self.speed = 0.0;
        self.state = VehicleState::Waiting;
    }

    /// Advances the vehicle by one tick given its rank in the queue.
    ///
    /// Released vehicles ignore `rank` and accelerate away.
    pub fn update(&mut self, rank: usize, gap: f64) {
        if self.state == VehicleState::Waiting && self.speed < self.kinematics.stopped_speed {
            self.wait_ticks += 1;
        }

        if self.state == VehicleState::Leaving {
            self.speed = (self.speed + self.kinematics.release_acceleration)
                .min(self.kinematics.release_max_speed);
            self.is_braking = false;
            self.move_by_speed();
            return;
        }

        let dist = self.distance_to_target(rank, gap);
        if dist > self.kinematics.braking_distance {
            self.speed = (self.speed + self.kinematics.acceleration).min(self.kinematics.max_speed);
            self.is_braking = false;
            self.state = VehicleState::Approaching;
        } else if dist > self.kinematics.arrival_tolerance {
            self.speed = (dist * self.kinematics.braking_gain).max(0.0);
            self.is_braking = true;
        } else {
            self.speed = 0.0;
            self.is_braking = true;
            self.state = VehicleState::Waiting;
        }

        if self.speed > 0.0 {
            self.move_by_speed();
        }
    }

    /// Hands the vehicle over to the intersection; it no longer holds a queue slot.
    pub fn release(&mut self) {
        self.state = VehicleState::Leaving;
    }

    /// Whether the vehicle has reached the stop line region and may be released.
    pub fn is_ready_for_release(&self) -> bool {
        self.state == VehicleState::Waiting || self.is_braking
    }

    pub fn is_leaving(&self) -> bool {
        self.state == VehicleState::Leaving
    }

    fn move_by_speed(&mut self) {
        let axis = self.direction.axis();
        let along = self.position.along(axis) + self.direction.sign() * self.speed;
        self.position.set_along(axis, along);
    }
}
