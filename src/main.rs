//! Fruit Drop headless runner
//!
//! Plays one round with a simple bot on the reference circle world and
//! prints the result. Useful for soak-testing the core and for tuning.
//!
//! Environment:
//! - `FRUIT_DROP_TUNING`: tuning JSON (default `tuning.json`, optional)
//! - `FRUIT_DROP_SAVE`: best-score file (default `fruit-drop-save.json`)
//! - `FRUIT_DROP_SEED`: run seed (default 1)

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use fruit_drop::Tuning;
    use fruit_drop::consts::*;
    use fruit_drop::gate::NoAds;
    use fruit_drop::persistence::JsonFileStore;
    use fruit_drop::sim::{CircleWorld, Game, GameEvent, RankChain, TickInput, tick};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    env_logger::init();

    let tuning_path =
        std::env::var("FRUIT_DROP_TUNING").unwrap_or_else(|_| "tuning.json".to_string());
    let save_path =
        std::env::var("FRUIT_DROP_SAVE").unwrap_or_else(|_| "fruit-drop-save.json".to_string());
    let seed = std::env::var("FRUIT_DROP_SEED")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(1);

    let tuning = Tuning::load(&tuning_path);
    let world = CircleWorld::new(tuning.arena.clone());
    let store = JsonFileStore::open(&save_path);
    let mut game = match Game::new(
        world,
        RankChain::classic(),
        tuning,
        Box::new(store),
        Box::new(NoAds),
        seed,
    ) {
        Ok(game) => game,
        Err(e) => {
            log::error!("Could not start: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("Fruit Drop (headless) starting, seed {}", seed);

    // Bot: wander to a random column, press, release once the fruit is there
    let mut bot = Pcg32::seed_from_u64(seed ^ 0x5eed);
    let mut input = TickInput {
        start: true,
        ..TickInput::default()
    };
    let mut target_x = 0.0_f32;
    let mut hold_frames = 0u32;
    let mut merges = 0u32;
    let frame_dt = SIM_DT;
    let mut accumulator = 0.0_f32;
    let max_sim_seconds = 60.0 * 30.0;

    'run: loop {
        accumulator += frame_dt.min(MAX_FRAME_DT);
        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            if game.is_running() && game.crane.carried().is_some() {
                if hold_frames == 0 {
                    target_x = bot.random_range(-3.2..3.2);
                }
                hold_frames += 1;
                input.crane_x = Some(target_x);
                input.pressed = hold_frames < 20;
                if !input.pressed {
                    hold_frames = 0;
                }
            } else {
                input.pressed = false;
            }

            tick(&mut game, &input, SIM_DT);
            input.clear_one_shots();
            accumulator -= SIM_DT;
            substeps += 1;

            let events: Vec<GameEvent> = game.drain_events().collect();
            for event in events {
                match event {
                    GameEvent::Merged { .. } => merges += 1,
                    GameEvent::NewBest(score) => log::debug!("new best {}", score),
                    GameEvent::GameOver { final_score, best } => {
                        println!(
                            "Game over after {:.1}s: score {} (best {}), {} merges",
                            game.sim_time(),
                            final_score,
                            best,
                            merges
                        );
                        break 'run;
                    }
                    _ => {}
                }
            }
        }

        if game.sim_time() > max_sim_seconds {
            println!(
                "Stopped after {:.0}s: score {}, {} merges, {} fruits",
                game.sim_time(),
                game.session.score(),
                merges,
                game.fruits().count()
            );
            break;
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
