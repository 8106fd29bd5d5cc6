//! Fixed timestep game tick
//!
//! One call = one slice of real time. UI timers always advance; the
//! simulation advances only while a round is running and not paused.

use super::physics::Physics;
use super::state::Game;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pointer x in world units (crane follows it)
    pub crane_x: Option<f32>,
    /// Pointer/touch held down; the drop happens on release
    pub pressed: bool,
    /// Menu: start button
    pub start: bool,
    /// Game over: replay button
    pub replay: bool,
    /// Back out of a pending gate or countdown
    pub cancel: bool,
    pub pause: bool,
    pub quit: bool,
}

impl TickInput {
    /// Clear one-shot commands after they have been consumed
    pub fn clear_one_shots(&mut self) {
        self.start = false;
        self.replay = false;
        self.cancel = false;
        self.pause = false;
        self.quit = false;
    }
}

/// Advance the game by `dt` seconds of real time
pub fn tick<P: Physics>(game: &mut Game<P>, input: &TickInput, dt: f32) {
    if input.quit {
        game.quit();
        return;
    }
    if input.cancel {
        game.cancel();
    }
    if input.start {
        game.request_start();
    }
    if input.replay {
        game.request_replay();
    }
    if input.pause {
        game.toggle_pause();
    }

    game.update_ui(dt);

    if let Some(x) = input.crane_x {
        game.crane.set_target_x(x);
    }
    if game.crane.update_press(input.pressed) {
        game.drop_carried();
    }

    let scale = game.flow.time_scale();
    if scale > 0.0 {
        game.step(dt * scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::sequence::FlowState;
    use crate::sim::state::GameEvent;
    use crate::tuning::Tuning;

    fn run(game: &mut Game<crate::sim::arena::CircleWorld>, input: &TickInput, steps: usize) {
        for _ in 0..steps {
            tick(game, input, SIM_DT);
        }
    }

    #[test]
    fn test_sim_frozen_until_round_runs() {
        let mut game = Game::headless(Tuning::default(), 1).unwrap();
        run(&mut game, &TickInput::default(), 30);
        assert_eq!(game.sim_ticks(), 0);
        assert_eq!(game.flow_state(), FlowState::Menu);

        let start = TickInput {
            start: true,
            ..TickInput::default()
        };
        tick(&mut game, &start, SIM_DT);
        assert!(matches!(game.flow_state(), FlowState::Countdown(_)));
        run(&mut game, &TickInput::default(), 180);
        assert_eq!(game.flow_state(), FlowState::Running);
        assert!(game.sim_ticks() > 0);
        assert!(game.crane.carried().is_some());
    }

    #[test]
    fn test_pause_freezes_sim_time() {
        let mut game = Game::headless(Tuning::default(), 1).unwrap();
        game.request_start();
        run(&mut game, &TickInput::default(), 180);
        let before = game.sim_time();

        let pause = TickInput {
            pause: true,
            ..TickInput::default()
        };
        tick(&mut game, &pause, SIM_DT);
        run(&mut game, &TickInput::default(), 60);
        assert_eq!(game.sim_time(), before);

        tick(&mut game, &pause, SIM_DT);
        assert!(game.sim_time() > before);
    }

    #[test]
    fn test_release_drops_carried_fruit() {
        let mut game = Game::headless(Tuning::default(), 3).unwrap();
        game.request_start();
        run(&mut game, &TickInput::default(), 180);
        game.drain_events().for_each(drop);

        let held = TickInput {
            pressed: true,
            crane_x: Some(1.0),
            ..TickInput::default()
        };
        tick(&mut game, &held, SIM_DT);
        tick(&mut game, &TickInput::default(), SIM_DT);

        assert!(game.crane.carried().is_none());
        assert!(
            game.drain_events()
                .any(|e| matches!(e, GameEvent::Dropped(_)))
        );
    }
}
