use std::sync::Arc;
use std::time::Duration;

use ecosync::geo::haversine_whole_km;
use ecosync::steps::{default_rewards, Reward};
use ecosync::{RedeemError, StepEngine, StepEngineConfig};

fn engine_with_rewards(rewards: Vec<Reward>) -> StepEngine {
    StepEngine::new(StepEngineConfig {
        seed: Some(99),
        rewards,
        ..StepEngineConfig::default()
    })
    .unwrap()
}

#[test]
fn redemption_debit_is_not_reset_by_later_steps() {
    let mut rewards = default_rewards();
    rewards.push(Reward::new("sticker", "EcoSync sticker", 5, "EcoSync"));
    let engine = engine_with_rewards(rewards);

    assert_eq!(engine.snapshot().points, 0);
    assert_eq!(engine.add_steps(1000).points, 10);

    let redemption = engine.redeem("sticker").unwrap();
    assert_eq!(redemption.points_remaining, 5);

    let s = engine.snapshot();
    let reward = s.reward("sticker").unwrap();
    assert!(reward.redeemed_at.is_some());
    assert!(reward.code.is_some());

    assert_eq!(engine.add_steps(0).points, 5);
}

#[test]
fn can_redeem_predicts_redeem_outcome() {
    let rewards = vec![
        Reward::new("r9", "Nine", 9, "Test"),
        Reward::new("r10", "Ten", 10, "Test"),
    ];
    let engine = engine_with_rewards(rewards);
    engine.add_steps(1000);

    assert!(!engine.can_redeem(11));
    assert!(engine.can_redeem(10));
    assert!(engine.redeem("r10").is_ok());

    assert!(!engine.can_redeem(9));
    assert!(matches!(
        engine.redeem("r9"),
        Err(RedeemError::InsufficientPoints { required: 9, available: 0, .. })
    ));
}

#[test]
fn derived_values_track_steps_across_goals() {
    let engine = engine_with_rewards(default_rewards());
    engine.add_or_select_goal_by_name("Mars");
    engine.add_or_select_goal_by_name("Japan (Tokyo)");

    for n in [0, 1, 99, 12_345, 7] {
        let s = engine.add_steps(n);
        assert!((s.km - s.steps_today as f64 * 0.00078).abs() < 1e-9);
        assert!((s.co2_kg - s.km * 0.192).abs() < 1e-9);
        assert_eq!(s.points, s.steps_today / 100);
        assert!(s.goals.iter().all(|g| g.progress_km == s.km));
    }
}

#[test]
fn paris_target_follows_new_origin() {
    let engine = engine_with_rewards(default_rewards());
    engine.set_origin(40.7128, -74.0060);
    let s = engine.add_or_select_goal_by_name("France (Paris)");
    let expected = haversine_whole_km(40.7128, -74.0060, 48.8566, 2.3522);
    assert_eq!(s.goals[0].target_km, expected);
    assert!((5830..5845).contains(&expected), "got {expected}");

    let s = engine.add_or_select_goal_by_name("France (Paris)");
    assert_eq!(s.goals.len(), 1);
}

#[test]
fn subscribers_see_every_command_in_order() {
    let engine = engine_with_rewards(default_rewards());
    let stream = engine.subscribe();
    assert_eq!(stream.recv().unwrap().revision, 0);

    engine.add_steps(10);
    engine.set_daily_goal(500);
    engine.add_bonus_points(2);

    let revisions: Vec<u64> = (0..3).map(|_| stream.recv().unwrap().revision).collect();
    assert_eq!(revisions, [1, 2, 3]);
    assert!(stream.latest().unwrap_err().is_retryable());
}

#[test]
fn auto_stepping_advances_and_stops_cleanly() {
    let engine = StepEngine::new(StepEngineConfig {
        tick_interval: Duration::from_millis(10),
        seed: Some(4),
        ..StepEngineConfig::default()
    })
    .unwrap();
    let stream = engine.subscribe();
    stream.recv().unwrap();

    engine.toggle_auto().unwrap();
    // The toggle itself, then the immediate first tick.
    assert!(stream.recv_timeout(Duration::from_secs(2)).unwrap().is_auto);
    let ticked = stream.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!((2..=7).contains(&ticked.steps_today));

    let off = engine.toggle_auto().unwrap();
    std::thread::sleep(Duration::from_millis(50));
    assert!(Arc::ptr_eq(&off, &engine.snapshot()));
}

#[test]
fn concurrent_commands_are_serialized() {
    let engine = engine_with_rewards(default_rewards());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                for _ in 0..250 {
                    engine.add_steps(1);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let s = engine.snapshot();
    assert_eq!(s.steps_today, 2000);
    assert_eq!(s.revision, 2000);
    assert_eq!(s.points, 20);
}

#[test]
fn invalid_catalog_is_rejected_at_construction() {
    let mut rewards = default_rewards();
    rewards.push(Reward::new("gift", "Free gift", 0, "EcoSync"));
    let err = StepEngine::new(StepEngineConfig {
        rewards,
        ..StepEngineConfig::default()
    })
    .unwrap_err();
    assert!(err.is_config());

    let mut rewards = default_rewards();
    rewards.push(default_rewards()[0].clone());
    let err = StepEngine::new(StepEngineConfig {
        rewards,
        ..StepEngineConfig::default()
    })
    .unwrap_err();
    assert!(err.is_config());
}

#[test]
fn huge_reward_price_does_not_overflow() {
    let engine = engine_with_rewards(default_rewards());
    assert_eq!(engine.steps_needed_for_reward(u64::MAX / 10), u64::MAX);
    engine.add_steps(100);
    assert_eq!(engine.add_bonus_points(u64::MAX).points, u64::MAX);
}
