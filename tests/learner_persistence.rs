use std::fs;

use rts_signal_rl::agent::q_learner::{LearnerConfig, QLearner};
use rts_signal_rl::config::SimConfig;
use rts_signal_rl::control_system::traffic_light_controller::{IntersectionController, StepOutcome};
use rts_signal_rl::error::ModelError;
use rts_signal_rl::state::TrafficState;

#[test]
fn repeated_update_converges_to_discounted_reward() {
    let config = LearnerConfig {
        learning_rate: 0.2,
        exploration_rate: 0.0,
        ..LearnerConfig::default()
    };
    let mut learner = QLearner::new(&config);
    let state = TrafficState([4, 0, 2, 1]);
    for _ in 0..5000 {
        learner.update(state, 2, 0.5, state);
    }
    let expected = 0.5 / (1.0 - config.discount_factor);
    assert!((learner.value(state, 2) - expected).abs() < 1e-6);
}

#[test]
fn loading_missing_model_reports_no_prior_model() {
    let dir = tempfile::tempdir().unwrap();
    let mut learner = QLearner::new(&LearnerConfig::default());
    assert!(!learner.load(dir.path().join("missing.json")).unwrap());
    assert!(learner.is_empty());
}

#[test]
fn learned_table_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("traffic_brain.json");

    let mut controller = IntersectionController::new(SimConfig::default()).unwrap();
    let mut learner = QLearner::new(&LearnerConfig::default());
    let mut visited = Vec::new();
    let mut state = controller.reset();
    for _ in 0..200 {
        let action = learner.choose_action(state, controller.current_green());
        let StepOutcome::Transition(t) = controller.step(action).unwrap() else {
            unreachable!("headless controller never stops");
        };
        learner.update(state, action, t.reward, t.state);
        visited.push((state, action));
        state = t.state;
    }
    learner.save(&path).unwrap();

    let mut restored = QLearner::new(&LearnerConfig::default());
    assert!(restored.load(&path).unwrap());
    assert_eq!(restored.len(), learner.len());
    for (state, action) in visited {
        assert_eq!(restored.value(state, action), learner.value(state, action));
    }
}

#[test]
fn truncated_model_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("traffic_brain.json");
    fs::write(&path, r#"[{"state":[1,2,3,4],"action":0,"#).unwrap();

    let mut learner = QLearner::new(&LearnerConfig::default());
    let err = learner.load(&path).unwrap_err();
    assert!(matches!(err, ModelError::Corrupt { .. }));
    assert!(learner.is_empty());
}
