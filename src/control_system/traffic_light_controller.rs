use log::{debug, trace};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::SimConfig;
use crate::control_system::reward::{compute_reward, RewardComponents, RewardInputs};
use crate::error::SimError;
use crate::global_variables::NUM_LANES;
use crate::render::{Frame, HeadlessRenderer, Renderer};
use crate::simulation_engine::simulation::TrafficSimulation;
use crate::state::TrafficState;

/// Why the requested action was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOverride {
    /// The current phase has not reached its minimum green time.
    MinGreen,
    /// The current phase ran past its maximum; the longest queue gets green.
    MaxGreen,
}

/// Applies the dwell-time rules to a requested green lane.
///
/// Below `min_green` ticks the current green is kept. Beyond `max_green` ticks the lane
/// with the largest queue wins (first one on ties).
pub fn resolve_phase_action(
    requested: usize,
    current_green: usize,
    elapsed_in_phase: u32,
    queue_lengths: &[usize; NUM_LANES],
    min_green: u32,
    max_green: u32,
) -> (usize, Option<PhaseOverride>) {
    let mut action = requested;
    let mut applied = None;

    if elapsed_in_phase < min_green {
        action = current_green;
        applied = Some(PhaseOverride::MinGreen);
    }
    if elapsed_in_phase > max_green {
        action = longest_queue(queue_lengths);
        applied = Some(PhaseOverride::MaxGreen);
    }

    if action == requested {
        (action, None)
    } else {
        (action, applied)
    }
}

fn longest_queue(queue_lengths: &[usize; NUM_LANES]) -> usize {
    let mut best = 0;
    for (lane, &len) in queue_lengths.iter().enumerate() {
        if len > queue_lengths[best] {
            best = lane;
        }
    }
    best
}

/// One completed control step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: TrafficState,
    pub reward: f64,
    pub components: RewardComponents,
    /// Lane holding green after the step.
    pub green: usize,
    /// Whether green moved to a new lane during this step.
    pub switched: bool,
    pub phase_override: Option<PhaseOverride>,
    /// Vehicles released during the tick.
    pub released: usize,
}

/// Result of `step`.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Transition(Transition),
    /// The renderer asked to stop; the tick was not completed.
    Terminated,
}

impl StepOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepOutcome::Terminated)
    }

    pub fn transition(&self) -> Option<&Transition> {
        match self {
            StepOutcome::Transition(t) => Some(t),
            StepOutcome::Terminated => None,
        }
    }
}

/// Result of one micro-step of `advance`.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// An all-red tick ran; the switch is still waiting for the box to clear.
    Clearing,
    /// The control step completed.
    Stepped(Transition),
    Terminated,
}

/// Signal controller for a four-approach intersection.
///
/// Owns the vehicle simulation, enforces minimum/maximum green and the all-red clearance
/// interlock, and scores every step.
pub struct IntersectionController {
    config: SimConfig,
    simulation: TrafficSimulation,
    renderer: Box<dyn Renderer + Send>,
    rng: SmallRng,
    current_green: usize,
    elapsed_in_phase: u32,
    /// Lane waiting for the clearance zone to empty before taking green.
    pending_green: Option<(usize, Option<PhaseOverride>)>,
    previous_wait: u64,
}

impl IntersectionController {
    /// Creates a headless controller seeded from `config.seed`.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            simulation: TrafficSimulation::new(&config),
            renderer: Box::new(HeadlessRenderer),
            rng: SmallRng::seed_from_u64(config.seed),
            config,
            current_green: 0,
            elapsed_in_phase: 0,
            pending_green: None,
            previous_wait: 0,
        })
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + Send + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_rng(mut self, rng: SmallRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn simulation(&self) -> &TrafficSimulation {
        &self.simulation
    }

    pub fn current_green(&self) -> usize {
        self.current_green
    }

    pub fn elapsed_in_phase(&self) -> u32 {
        self.elapsed_in_phase
    }

    /// Whether a switch is waiting on the clearance interlock.
    pub fn is_clearing(&self) -> bool {
        self.pending_green.is_some()
    }

    pub fn queue_lengths(&self) -> [usize; NUM_LANES] {
        self.simulation.queue_lengths()
    }

    /// Current discretized state.
    pub fn state(&self) -> TrafficState {
        TrafficState::from_queue_lengths(self.queue_lengths(), self.config.state_ceiling)
    }

    /// Adds waiting vehicles to a lane (up to its cap); returns how many were placed.
    pub fn seed_lane(&mut self, lane: usize, count: usize) -> usize {
        self.simulation.seed_lane(lane, count)
    }

    /// Starts a new episode with a few vehicles already waiting on every approach.
    pub fn reset(&mut self) -> TrafficState {
        self.simulation.reset();
        for lane in 0..NUM_LANES {
            let count = self
                .rng
                .random_range(self.config.initial_queue_min..=self.config.initial_queue_max);
            self.simulation.seed_lane(lane, count);
        }
        self.current_green = 0;
        self.elapsed_in_phase = 0;
        self.pending_green = None;
        self.previous_wait = 0;

        let state = self.state();
        debug!("Intersection reset with queues {:?}", state.queue_lengths());
        state
    }

    /// Advances one control step, running all-red clearing ticks as needed.
    pub fn step(&mut self, action: usize) -> Result<StepOutcome, SimError> {
        loop {
            match self.advance(action)? {
                Advance::Clearing => continue,
                Advance::Stepped(transition) => return Ok(StepOutcome::Transition(transition)),
                Advance::Terminated => return Ok(StepOutcome::Terminated),
            }
        }
    }

    /// Runs at most one physics tick.
    ///
    /// While a switch is pending the requested action is ignored and each call runs one
    /// all-red tick, returning `Advance::Clearing` until the box is empty.
    pub fn advance(&mut self, action: usize) -> Result<Advance, SimError> {
        if action >= NUM_LANES {
            return Err(SimError::InvalidAction {
                action,
                lanes: NUM_LANES,
            });
        }

        let (target, phase_override) = match self.pending_green {
            Some(pending) => pending,
            None => {
                let (resolved, phase_override) = resolve_phase_action(
                    action,
                    self.current_green,
                    self.elapsed_in_phase,
                    &self.queue_lengths(),
                    self.config.min_green_ticks,
                    self.config.max_green_ticks,
                );
                if phase_override == Some(PhaseOverride::MaxGreen) {
                    debug!(
                        "Lane {} held green for {} ticks; forcing lane {}",
                        self.current_green, self.elapsed_in_phase, resolved
                    );
                }
                if resolved == self.current_green {
                    self.elapsed_in_phase += 1;
                    return Ok(self.finish_tick(false, phase_override));
                }
                self.pending_green = Some((resolved, phase_override));
                (resolved, phase_override)
            }
        };

        if self.simulation.is_intersection_clear() {
            debug!(
                "Phase switch lane {} -> lane {} after {} ticks",
                self.current_green, target, self.elapsed_in_phase
            );
            self.current_green = target;
            self.elapsed_in_phase = 0;
            self.pending_green = None;
            return Ok(self.finish_tick(true, phase_override));
        }

        self.simulation.update_physics(None);
        if !self.render(None) {
            return Ok(Advance::Terminated);
        }
        trace!("Clearing for lane {}", target);
        Ok(Advance::Clearing)
    }

    /// Shows the current vehicles to the renderer with `green` lit.
    pub fn render(&mut self, green: Option<usize>) -> bool {
        let frame = Frame {
            green,
            lanes: self.simulation.lanes(),
            tick: self.simulation.tick(),
        };
        self.renderer.draw(&frame)
    }

    fn finish_tick(&mut self, switched: bool, phase_override: Option<PhaseOverride>) -> Advance {
        let report = self.simulation.update_physics(Some(self.current_green));
        if !self.render(Some(self.current_green)) {
            return Advance::Terminated;
        }

        self.simulation
            .random_arrivals(&mut self.rng, self.config.arrival_probability);

        let queues = self.queue_lengths();
        let current_wait = self.simulation.total_wait_ticks();
        let components = compute_reward(
            &self.config.reward,
            &RewardInputs {
                total_queue: queues.iter().sum(),
                previous_wait: self.previous_wait,
                current_wait,
                green_queue: queues[self.current_green],
                switched,
            },
        );
        self.previous_wait = current_wait;

        Advance::Stepped(Transition {
            state: self.state(),
            reward: components.total,
            components,
            green: self.current_green,
            switched,
            phase_override,
            released: report.released.len(),
        })
    }
}
