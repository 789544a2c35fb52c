//! Episode driver: trains or presents the learner, then compares it with a fixed-time
//! signal plan.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::agent::q_learner::QLearner;
use crate::config::AppConfig;
use crate::control_system::traffic_light_controller::{IntersectionController, StepOutcome};
use crate::error::{SimError, TrainingError};
use crate::global_variables::{
    BASELINE_EPISODES, BASELINE_GREEN_DURATION, EPISODES, EPISODE_LOG_FILE, EXPLORATION_DECAY,
    EXPLORATION_FLOOR, MODEL_FILE, MOVING_AVERAGE_WINDOW, NUM_LANES, PROGRESS_LOG_INTERVAL,
    STEPS_PER_EPISODE,
};
use crate::monitoring::training_monitor::{
    moving_average, trailing_mean, EpisodeLogger, EpisodeRecord,
};
use crate::render::Renderer;

/// Settings of the episode driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: usize,
    pub steps_per_episode: usize,
    /// Epsilon multiplier applied after every episode.
    pub exploration_decay: f64,
    /// Epsilon stops decaying once at or below this.
    pub exploration_floor: f64,
    pub baseline_episodes: usize,
    /// Steps each lane keeps green under the fixed-time plan.
    pub baseline_green_duration: usize,
    pub moving_average_window: usize,
    pub progress_log_interval: usize,
    pub model_path: PathBuf,
    /// CSV file receiving one row per episode; `None` disables it.
    pub episode_log_path: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: EPISODES,
            steps_per_episode: STEPS_PER_EPISODE,
            exploration_decay: EXPLORATION_DECAY,
            exploration_floor: EXPLORATION_FLOOR,
            baseline_episodes: BASELINE_EPISODES,
            baseline_green_duration: BASELINE_GREEN_DURATION,
            moving_average_window: MOVING_AVERAGE_WINDOW,
            progress_log_interval: PROGRESS_LOG_INTERVAL,
            model_path: PathBuf::from(MODEL_FILE),
            episode_log_path: Some(PathBuf::from(EPISODE_LOG_FILE)),
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        let invalid = |reason: &str| {
            Err(SimError::InvalidConfig {
                reason: reason.to_string(),
            })
        };
        if self.baseline_green_duration == 0 {
            return invalid("baseline_green_duration must be at least 1");
        }
        if !(self.exploration_decay > 0.0 && self.exploration_decay <= 1.0) {
            return invalid("exploration_decay must be within (0, 1]");
        }
        if self.exploration_floor < 0.0 {
            return invalid("exploration_floor must not be negative");
        }
        Ok(())
    }
}

/// Result of running one episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeRun {
    pub total_reward: f64,
    pub steps: usize,
    /// The renderer asked to stop before the episode finished.
    pub stopped: bool,
}

/// Fixed-time plan against the learner's final episodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaselineComparison {
    pub baseline_avg: f64,
    pub agent_avg: f64,
    pub improvement: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// Total reward of every episode run, in order. When stopped by the user the last
    /// entry is the reward accumulated before the stop.
    pub rewards: Vec<f64>,
    pub stopped_by_user: bool,
    /// A saved model was loaded and run without exploration or updates.
    pub presenting: bool,
    pub final_epsilon: f64,
    pub comparison: Option<BaselineComparison>,
}

impl TrainingSummary {
    /// Episodes that ran to their full length.
    pub fn episodes_completed(&self) -> usize {
        self.rewards.len() - usize::from(self.stopped_by_user && !self.rewards.is_empty())
    }

    /// Episodes started, including one cut short by a stop.
    pub fn episodes_run(&self) -> usize {
        self.rewards.len()
    }
}

/// Runs one episode of the fixed-time plan: each lane in turn holds green for
/// `green_duration` steps.
pub fn run_fixed_time(
    controller: &mut IntersectionController,
    steps: usize,
    green_duration: usize,
) -> Result<EpisodeRun, SimError> {
    let mut run = EpisodeRun {
        total_reward: 0.0,
        steps: 0,
        stopped: false,
    };
    controller.reset();

    for step in 0..steps {
        let action = (step / green_duration.max(1)) % NUM_LANES;
        match controller.step(action)? {
            StepOutcome::Transition(t) => {
                run.total_reward += t.reward;
                run.steps += 1;
            }
            StepOutcome::Terminated => {
                run.stopped = true;
                break;
            }
        }
    }
    Ok(run)
}

/// Removes a saved model so training starts from scratch.
pub fn discard_model(path: impl AsRef<Path>) -> Result<bool, TrainingError> {
    let path = path.as_ref();
    match fs::remove_file(path) {
        Ok(()) => {
            info!("Removed existing model {:?}", path);
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Drives the controller and learner through the configured episodes.
pub struct Trainer {
    controller: IntersectionController,
    learner: QLearner,
    config: TrainingConfig,
    logger: Option<EpisodeLogger>,
    presenting: bool,
    rewards: Vec<f64>,
}

impl Trainer {
    pub fn new(
        controller: IntersectionController,
        learner: QLearner,
        config: TrainingConfig,
    ) -> Self {
        let logger = config.episode_log_path.clone().map(EpisodeLogger::new);
        Self {
            controller,
            learner,
            config,
            logger,
            presenting: false,
            rewards: Vec::new(),
        }
    }

    pub fn learner(&self) -> &QLearner {
        &self.learner
    }

    pub fn controller(&self) -> &IntersectionController {
        &self.controller
    }

    pub fn is_presenting(&self) -> bool {
        self.presenting
    }

    /// Loads a saved model if one exists. A loaded model is presented, not trained.
    pub fn load_model(&mut self) -> Result<bool, TrainingError> {
        let loaded = self.learner.load(&self.config.model_path)?;
        if loaded {
            self.learner.set_epsilon(0.0);
            self.presenting = true;
            info!("Resuming with saved model {:?}", self.config.model_path);
        } else {
            info!("Starting training from scratch");
        }
        Ok(loaded)
    }

    /// Runs one episode, updating the learner while it still explores.
    pub fn run_episode(&mut self) -> Result<EpisodeRun, TrainingError> {
        let mut state = self.controller.reset();
        let mut run = EpisodeRun {
            total_reward: 0.0,
            steps: 0,
            stopped: false,
        };

        for _ in 0..self.config.steps_per_episode {
            let action = self
                .learner
                .choose_action(state, self.controller.current_green());
            let transition = match self.controller.step(action)? {
                StepOutcome::Transition(t) => t,
                StepOutcome::Terminated => {
                    run.stopped = true;
                    break;
                }
            };

            if self.learner.is_learning() {
                self.learner
                    .update(state, action, transition.reward, transition.state);
            }
            state = transition.state;
            run.total_reward += transition.reward;
            run.steps += 1;
        }
        Ok(run)
    }

    /// Runs every episode, saves the model and compares with the fixed-time plan.
    pub fn run(&mut self) -> Result<TrainingSummary, TrainingError> {
        let episodes = self.config.episodes;
        let mut stopped_by_user = false;

        for episode in 1..=episodes {
            if self.presenting {
                info!("--- Presentation episode {} ---", episode);
            }

            let run = self.run_episode()?;
            if run.stopped {
                info!(
                    "Simulation stopped by user during episode {} after {} steps",
                    episode, run.steps
                );
                self.rewards.push(run.total_reward);
                self.log_episode(episode, run.total_reward, true)?;
                stopped_by_user = true;
                break;
            }

            self.learner.decay_exploration(
                self.config.exploration_decay,
                self.config.exploration_floor,
            );
            self.rewards.push(run.total_reward);
            self.log_episode(episode, run.total_reward, false)?;

            let interval = self.config.progress_log_interval;
            if interval > 0 && episode % interval == 0 {
                info!(
                    "Episode {}/{}: Reward = {:.2} | Epsilon = {:.2}",
                    episode,
                    episodes,
                    run.total_reward,
                    self.learner.epsilon()
                );
            }
        }

        self.learner.save(&self.config.model_path)?;

        let comparison = if stopped_by_user {
            None
        } else {
            self.compare_with_baseline()?
        };

        Ok(TrainingSummary {
            rewards: self.rewards.clone(),
            stopped_by_user,
            presenting: self.presenting,
            final_epsilon: self.learner.epsilon(),
            comparison,
        })
    }

    /// Runs the fixed-time plan and compares it with the learner's last episodes.
    pub fn compare_with_baseline(&mut self) -> Result<Option<BaselineComparison>, TrainingError> {
        let count = self.config.baseline_episodes;
        let Some(agent_avg) = trailing_mean(&self.rewards, count) else {
            return Ok(None);
        };

        let mut baseline = Vec::with_capacity(count);
        for _ in 0..count {
            let run = run_fixed_time(
                &mut self.controller,
                self.config.steps_per_episode,
                self.config.baseline_green_duration,
            )?;
            if run.stopped {
                warn!("Baseline run stopped early; skipping comparison");
                return Ok(None);
            }
            baseline.push(run.total_reward);
        }
        let Some(baseline_avg) = trailing_mean(&baseline, count) else {
            return Ok(None);
        };

        let comparison = BaselineComparison {
            baseline_avg,
            agent_avg,
            improvement: agent_avg - baseline_avg,
        };
        info!("===== Baseline Comparison =====");
        info!("Fixed-time controller avg reward: {:.2}", baseline_avg);
        info!("Q-learning agent avg reward: {:.2}", agent_avg);
        info!("Improvement: {:.2}", comparison.improvement);
        Ok(Some(comparison))
    }

    fn log_episode(
        &self,
        episode: usize,
        total_reward: f64,
        stopped: bool,
    ) -> Result<(), TrainingError> {
        let Some(logger) = &self.logger else {
            return Ok(());
        };
        logger.log(&EpisodeRecord {
            episode,
            total_reward,
            epsilon: self.learner.epsilon(),
            moving_average: moving_average(&self.rewards, self.config.moving_average_window),
            presenting: self.presenting,
            stopped,
        })?;
        Ok(())
    }
}

/// Builds the controller and learner from `config` and runs the full driver.
///
/// With `fresh` any saved model is deleted first.
pub fn run_training(
    config: &AppConfig,
    renderer: impl Renderer + Send + 'static,
    fresh: bool,
) -> Result<TrainingSummary, TrainingError> {
    config.validate()?;
    if fresh {
        discard_model(&config.training.model_path)?;
    }

    let controller = IntersectionController::new(config.simulation.clone())?.with_renderer(renderer);
    let learner = QLearner::new(&config.learner);
    let mut trainer = Trainer::new(controller, learner, config.training.clone());
    trainer.load_model()?;
    trainer.run()
}
