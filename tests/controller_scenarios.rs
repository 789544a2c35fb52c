use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use rts_signal_rl::config::SimConfig;
use rts_signal_rl::control_system::traffic_light_controller::{
    Advance, IntersectionController, PhaseOverride, StepOutcome,
};
use rts_signal_rl::error::SimError;

fn quiet_config() -> SimConfig {
    SimConfig {
        arrival_probability: 0.0,
        initial_queue_min: 0,
        initial_queue_max: 0,
        ..SimConfig::default()
    }
}

#[test]
fn seeded_reset_is_deterministic() {
    let config = SimConfig {
        seed: 1234,
        ..SimConfig::default()
    };
    let mut a = IntersectionController::new(config.clone()).unwrap();
    let mut b = IntersectionController::new(config).unwrap();

    for _ in 0..5 {
        let sa = a.reset();
        let sb = b.reset();
        assert_eq!(sa, sb);
        assert!(sa.queue_lengths().iter().all(|&q| (1..=3).contains(&q)));
        assert_eq!(a.current_green(), 0);
        assert_eq!(a.elapsed_in_phase(), 0);
    }

    // An injected generator replaces the config seed.
    let mut c = IntersectionController::new(SimConfig::default())
        .unwrap()
        .with_rng(SmallRng::seed_from_u64(1234));
    let mut d = IntersectionController::new(SimConfig {
        seed: 1234,
        ..SimConfig::default()
    })
    .unwrap();
    assert_eq!(c.reset(), d.reset());
}

#[test]
fn empty_intersection_scores_nothing() {
    let mut controller = IntersectionController::new(quiet_config()).unwrap();
    controller.reset();
    for _ in 0..10 {
        let outcome = controller.step(0).unwrap();
        let t = outcome.transition().unwrap();
        assert_eq!(t.components.queue_penalty, 0.0);
        assert_eq!(t.components.flow_bonus, 0.0);
        assert!(t.reward.abs() < 1e-12);
        assert_eq!(t.state.total(), 0);
    }
}

#[test]
fn early_switch_request_is_ignored() {
    let mut controller = IntersectionController::new(quiet_config()).unwrap();
    controller.reset();
    for tick in 1..40 {
        let outcome = controller.step(2).unwrap();
        let t = outcome.transition().unwrap();
        assert_eq!(t.green, 0);
        assert!(!t.switched);
        assert_eq!(t.phase_override, Some(PhaseOverride::MinGreen));
        assert_eq!(controller.elapsed_in_phase(), tick);
    }
}

#[test]
fn overlong_phase_goes_to_longest_queue() {
    let mut controller = IntersectionController::new(quiet_config()).unwrap();
    controller.reset();
    while controller.elapsed_in_phase() < 40 {
        controller.step(0).unwrap();
    }
    let outcome = controller.step(1).unwrap();
    assert!(outcome.transition().unwrap().switched);
    assert_eq!(controller.current_green(), 1);

    assert_eq!(controller.seed_lane(0, 5), 5);
    assert_eq!(controller.seed_lane(3, 9), 9);
    while controller.elapsed_in_phase() <= 60 {
        controller.step(1).unwrap();
    }
    assert_eq!(controller.queue_lengths(), [5, 0, 0, 9]);

    let outcome = controller.step(1).unwrap();
    let t = outcome.transition().unwrap();
    assert_eq!(t.green, 3);
    assert!(t.switched);
    assert_eq!(t.phase_override, Some(PhaseOverride::MaxGreen));
    assert_eq!(controller.elapsed_in_phase(), 0);
}

#[test]
fn out_of_range_action_is_an_error() {
    let mut controller = IntersectionController::new(SimConfig::default()).unwrap();
    controller.reset();
    assert!(matches!(
        controller.advance(9),
        Err(SimError::InvalidAction { action: 9, .. })
    ));
}

#[test]
fn phase_rules_hold_under_random_control() {
    let config = SimConfig {
        arrival_probability: 0.5,
        seed: 99,
        ..SimConfig::default()
    };
    let cap = config.max_queue_length;
    let min_green = config.min_green_ticks;

    let mut controller = IntersectionController::new(config)
        .unwrap()
        .with_renderer(move |frame: &rts_signal_rl::render::Frame<'_>| {
            frame.queue_lengths().all(|q| q <= cap)
        });
    controller.reset();

    let mut rng = SmallRng::seed_from_u64(5);
    let mut switches = 0;
    for _ in 0..3000 {
        let action = rng.random_range(0..4);
        let green_before = controller.current_green();
        let elapsed_before = controller.elapsed_in_phase();
        let clear_before = controller.simulation().is_intersection_clear();

        match controller.advance(action).unwrap() {
            Advance::Clearing => {
                assert_eq!(controller.current_green(), green_before);
                assert!(controller.is_clearing());
            }
            Advance::Stepped(t) => {
                assert!((-1.0..=1.0).contains(&t.reward));
                if t.switched {
                    switches += 1;
                    assert!(clear_before);
                    assert_ne!(t.green, green_before);
                    assert!(elapsed_before >= min_green);
                    assert_eq!(controller.elapsed_in_phase(), 0);
                } else {
                    assert_eq!(t.green, green_before);
                    assert_eq!(controller.elapsed_in_phase(), elapsed_before + 1);
                }
            }
            Advance::Terminated => panic!("a queue grew past its cap"),
        }
    }
    assert!(switches > 0);
}

#[test]
fn renderer_sees_all_red_while_clearing() {
    let mut controller = IntersectionController::new(quiet_config())
        .unwrap()
        .with_renderer(|frame: &rts_signal_rl::render::Frame<'_>| {
            // Every all-red frame is drawn while a vehicle is still crossing.
            frame.green.is_some() || frame.vehicles().any(|v| v.is_leaving())
        });
    controller.reset();
    controller.seed_lane(0, 1);
    while controller.elapsed_in_phase() < 40 {
        controller.step(0).unwrap();
    }
    let outcome = controller.step(3).unwrap();
    assert!(matches!(outcome, StepOutcome::Transition(ref t) if t.switched && t.green == 3));
}

#[test]
fn stop_during_clearance_keeps_switch_pending() {
    let mut controller = IntersectionController::new(quiet_config())
        .unwrap()
        .with_renderer(|frame: &rts_signal_rl::render::Frame<'_>| frame.green.is_some());
    controller.reset();
    controller.seed_lane(0, 1);
    while controller.elapsed_in_phase() < 40 {
        let outcome = controller.step(0).unwrap();
        assert!(!outcome.is_terminal());
    }
    assert!(!controller.simulation().is_intersection_clear());

    let outcome = controller.step(3).unwrap();
    assert_eq!(outcome, StepOutcome::Terminated);
    assert_eq!(controller.current_green(), 0);
    assert_eq!(controller.elapsed_in_phase(), 40);
    assert!(controller.is_clearing());

    // A reset drops the pending switch.
    controller.reset();
    assert!(!controller.is_clearing());
    assert_eq!(controller.current_green(), 0);
}
