// Approaches at the intersection (0 = from north, 1 = from south, 2 = from east, 3 = from west)
pub const NUM_LANES: usize = 4;

// Canvas / intersection geometry (pixels)
pub const CANVAS_WIDTH: f64 = 800.0;
pub const CANVAS_HEIGHT: f64 = 600.0;
pub const ROAD_WIDTH: f64 = 140.0;
pub const STOP_LINE_OFFSET: f64 = ROAD_WIDTH / 2.0 + 15.0;
/// Extra setback of the stop position for vehicles anchored on their far edge.
pub const NEAR_SIDE_SETBACK: f64 = 80.0;
pub const FAR_SIDE_SETBACK: f64 = 20.0;
pub const LANE_CENTER_SHIFT: f64 = 12.0;
pub const CLEARANCE_MARGIN: f64 = 40.0;
pub const SPAWN_DISTANCE: f64 = 100.0;
pub const EXIT_MARGIN: f64 = 300.0;

// Queueing
pub const GAP_SIZE: f64 = 110.0;
pub const SAFE_SPAWN_GAP: f64 = 110.0;
pub const MAX_QUEUE_LENGTH: usize = 20;
pub const STATE_CEILING: usize = 20;

// Kinematics (pixels per tick)
pub const MAX_SPEED: f64 = 4.0;
pub const ACCELERATION: f64 = 0.2;
pub const DECELERATION: f64 = 0.2;
pub const RELEASE_MAX_SPEED: f64 = 6.0;
pub const RELEASE_ACCELERATION: f64 = 0.2;
pub const BRAKING_DISTANCE: f64 = 30.0;
pub const ARRIVAL_TOLERANCE: f64 = 1.0;
pub const BRAKING_GAIN: f64 = 0.15;
pub const STOPPED_SPEED: f64 = 0.1;

// Timing
pub const TICK_SECONDS: f64 = 1.0 / 60.0;
pub const MIN_GREEN_TICKS: u32 = 40;
pub const MAX_GREEN_TICKS: u32 = 60;
pub const MIN_RELEASE_INTERVAL_SECS: f64 = 0.8;

// Arrivals
pub const ARRIVAL_PROBABILITY: f64 = 0.20;
pub const INITIAL_QUEUE_MIN: usize = 1;
pub const INITIAL_QUEUE_MAX: usize = 3;

// Reward shaping
pub const QUEUE_PENALTY_SCALE: f64 = 20.0;
pub const WAIT_DELTA_SCALE: f64 = 50.0;
pub const FLOW_BONUS: f64 = 0.2;
pub const SWITCH_PENALTY: f64 = 0.2;
pub const REWARD_CLIP: f64 = 1.0;

// Learner
pub const LEARNING_RATE: f64 = 0.01;
pub const DISCOUNT_FACTOR: f64 = 0.9;
pub const EXPLORATION_RATE: f64 = 1.0;
pub const INCUMBENT_BIAS: f64 = 0.05;
pub const EXPLORATION_DECAY: f64 = 0.99;
pub const EXPLORATION_FLOOR: f64 = 0.05;

// Training driver
pub const EPISODES: usize = 200;
pub const STEPS_PER_EPISODE: usize = 150;
pub const BASELINE_EPISODES: usize = 5;
pub const BASELINE_GREEN_DURATION: usize = 60;
pub const MOVING_AVERAGE_WINDOW: usize = 20;
pub const PROGRESS_LOG_INTERVAL: usize = 10;
pub const DEFAULT_SEED: u64 = 42;

// Files
pub const MODEL_FILE: &str = "traffic_brain.json";
pub const EPISODE_LOG_FILE: &str = "episode_rewards.csv";
