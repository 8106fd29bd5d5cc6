//! Round flow, scoring and the loss line through the public game API

use fruit_drop::Tuning;
use fruit_drop::consts::SIM_DT;
use fruit_drop::gate::{NoAds, SimulatedAds};
use fruit_drop::persistence::{JsonFileStore, KeyValueStore, MemoryStore};
use fruit_drop::sim::{
    CircleWorld, FlowState, Game, GameEvent, LossState, Physics, RankChain, RankId, TickInput,
    tick,
};
use glam::Vec2;

/// No countdown, no tutorial, no gravity: fruits stay where they are put
fn still_tuning() -> Tuning {
    let mut tuning = Tuning::default();
    tuning.countdown_seconds = 0;
    tuning.show_tutorial_on_start = false;
    tuning.arena.gravity = Vec2::ZERO;
    tuning
}

fn started(tuning: Tuning, store: Box<dyn KeyValueStore>) -> Game<CircleWorld> {
    let world = CircleWorld::new(tuning.arena.clone());
    let mut game =
        Game::new(world, RankChain::classic(), tuning, store, Box::new(NoAds), 9).unwrap();
    game.request_start();
    game.update_ui(0.5);
    assert_eq!(game.flow_state(), FlowState::Running);
    game
}

fn idle(game: &mut Game<CircleWorld>, frames: usize) {
    let input = TickInput::default();
    for _ in 0..frames {
        tick(game, &input, SIM_DT);
    }
}

#[test]
fn test_score_is_sum_of_merge_awards_and_resets_on_replay() {
    let mut game = started(still_tuning(), Box::new(MemoryStore::new()));
    // Three separate pairs at different heights below the loss line
    for (rank, y) in [(0u8, 1.0f32), (1, 3.0), (2, 5.0)] {
        game.spawn_fruit(RankId(rank), Vec2::new(-1.0, y)).unwrap();
        game.spawn_fruit(RankId(rank), Vec2::new(-0.8, y)).unwrap();
    }

    let mut awarded = 0u64;
    let mut last_score = 0u64;
    for _ in 0..30 {
        tick(&mut game, &TickInput::default(), SIM_DT);
        for event in game.drain_events() {
            match event {
                GameEvent::Merged { score, .. } => awarded += u64::from(score),
                GameEvent::ScoreChanged(score) => {
                    assert!(score >= last_score);
                    last_score = score;
                }
                _ => {}
            }
        }
    }
    // strawberry 3 + grape 6 + dekopon 10
    assert_eq!(awarded, 19);
    assert_eq!(game.session.score(), 19);

    game.request_replay();
    assert_eq!(game.session.score(), 0);
    assert!(
        game.drain_events()
            .any(|e| e == GameEvent::ScoreChanged(0))
    );
    // Field cleared for the new round
    assert_eq!(game.fruits().filter(|f| !f.hanging).count(), 0);
}

#[test]
fn test_settled_fruit_on_line_ends_run_once() {
    let tuning = still_tuning();
    let line_y = tuning.loss_line_y;
    let mut game = started(tuning, Box::new(MemoryStore::new()));
    game.spawn_fruit(RankId(2), Vec2::new(1.0, line_y)).unwrap();

    // 0.8 s still time needs 48 steps at 60 Hz
    idle(&mut game, 30);
    assert!(game.is_running());
    assert_eq!(game.session.loss_state(), LossState::Touching);

    idle(&mut game, 60);
    assert!(!game.is_running());
    assert_eq!(game.flow_state(), FlowState::GameOver);

    let overs = game
        .drain_events()
        .filter(|e| matches!(e, GameEvent::GameOver { .. }))
        .count();
    assert_eq!(overs, 1);

    // Stepping on after the end reports nothing more
    for _ in 0..30 {
        game.step(SIM_DT);
    }
    assert_eq!(
        game.drain_events()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count(),
        0
    );
}

#[test]
fn test_moving_fruit_on_line_never_ends_run() {
    let tuning = still_tuning();
    let line_y = tuning.loss_line_y;
    let mut game = started(tuning, Box::new(MemoryStore::new()));
    let key = game.spawn_fruit(RankId(2), Vec2::new(1.0, line_y)).unwrap();
    let body = game.lifecycle.get(key).unwrap().body;

    for _ in 0..180 {
        let physics = game.bridge.physics_mut();
        physics.set_position(body, Vec2::new(1.0, line_y));
        physics.set_velocity(body, Vec2::new(0.5, 0.0));
        tick(&mut game, &TickInput::default(), SIM_DT);
    }
    assert!(game.is_running());
}

#[test]
fn test_best_score_persists_between_games() {
    let path = std::env::temp_dir().join(format!("fruit-drop-best-{}.json", std::process::id()));
    let _ = std::fs::remove_file(&path);

    {
        let mut game = started(still_tuning(), Box::new(JsonFileStore::open(&path)));
        game.spawn_fruit(RankId(0), Vec2::new(0.0, 1.0)).unwrap();
        game.spawn_fruit(RankId(0), Vec2::new(0.2, 1.0)).unwrap();
        idle(&mut game, 20);
        assert_eq!(game.session.score(), 3);
        assert!(
            game.drain_events()
                .any(|e| e == GameEvent::NewBest(3))
        );
    }

    let reopened = started(still_tuning(), Box::new(JsonFileStore::open(&path)));
    assert_eq!(reopened.session.best(), 3);
    assert_eq!(
        JsonFileStore::open(&path).get_int(&Tuning::default().best_key, 0),
        3
    );
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_gate_then_countdown_then_play() {
    let mut tuning = Tuning::default();
    tuning.show_tutorial_on_start = true;
    let world = CircleWorld::new(tuning.arena.clone());
    let mut game = Game::new(
        world,
        RankChain::classic(),
        tuning,
        Box::new(MemoryStore::new()),
        Box::new(SimulatedAds::default()),
        2,
    )
    .unwrap();

    tick(
        &mut game,
        &TickInput {
            start: true,
            ..TickInput::default()
        },
        SIM_DT,
    );
    assert!(matches!(game.flow_state(), FlowState::AwaitingGate(_)));
    assert!(game.crane.is_ui_blocked());

    // 2 s ad, then 3-2-1-GO
    idle(&mut game, 125);
    assert!(matches!(game.flow_state(), FlowState::Countdown(_)));
    let labels: Vec<_> = game
        .drain_events()
        .filter_map(|e| match e {
            GameEvent::Countdown(label) => Some(label.to_string()),
            _ => None,
        })
        .collect();
    assert!(labels.contains(&"3".to_string()));

    idle(&mut game, 150);
    assert_eq!(game.flow_state(), FlowState::Running);
    assert!(game.tutorial.is_visible());
    assert!(game.crane.carried().is_some());
    assert!(!game.crane.is_ui_blocked());
}

#[test]
fn test_cancel_during_gate_returns_to_menu() {
    let tuning = Tuning::default();
    let world = CircleWorld::new(tuning.arena.clone());
    let mut game = Game::new(
        world,
        RankChain::classic(),
        tuning,
        Box::new(MemoryStore::new()),
        Box::new(SimulatedAds::default()),
        2,
    )
    .unwrap();

    game.request_start();
    idle(&mut game, 10);
    game.cancel();
    assert_eq!(game.flow_state(), FlowState::Menu);
    assert!(!game.crane.is_ui_blocked());
    assert!(
        game.drain_events()
            .any(|e| e == GameEvent::RoundCancelled)
    );

    // Nothing advances after the cancel
    idle(&mut game, 200);
    assert_eq!(game.flow_state(), FlowState::Menu);
    assert_eq!(game.sim_ticks(), 0);
}

#[test]
fn test_quit_clears_everything() {
    let mut game = started(still_tuning(), Box::new(MemoryStore::new()));
    game.spawn_fruit(RankId(0), Vec2::new(0.0, 1.0)).unwrap();
    game.spawn_fruit(RankId(0), Vec2::new(0.2, 1.0)).unwrap();
    idle(&mut game, 20);
    assert_eq!(game.session.score(), 3);
    game.spawn_fruit(RankId(1), Vec2::new(-2.0, 2.0)).unwrap();
    assert!(game.fruits().count() >= 2);
    game.drain_events().for_each(drop);

    tick(
        &mut game,
        &TickInput {
            quit: true,
            ..TickInput::default()
        },
        SIM_DT,
    );
    assert_eq!(game.flow_state(), FlowState::Menu);
    assert_eq!(game.fruits().count(), 0);
    assert!(!game.is_running());
    assert_eq!(game.session.score(), 0);
    assert!(
        game.drain_events()
            .any(|e| e == GameEvent::ScoreChanged(0))
    );
}

#[test]
fn test_tutorial_shows_on_first_start_only() {
    let mut tuning = still_tuning();
    tuning.show_tutorial_on_start = true;
    let mut game = started(tuning, Box::new(MemoryStore::new()));
    assert!(game.tutorial.is_visible());

    game.quit();
    game.request_start();
    game.update_ui(0.5);
    assert_eq!(game.flow_state(), FlowState::Running);
    assert!(!game.tutorial.is_visible());
}
