//! Playing / paused / game-over state machine.
//!
//! Leaving [`GameState::Playing`] freezes the game clock; coming back to it
//! unfreezes the clock. Once the game is over it can only go back to
//! playing, never to paused.

use onslaught_core::actor::GameState;
use onslaught_core::timer::TimerQueue;

/// Owns the current [`GameState`] and keeps the timer queue in step with it.
#[derive(Debug, Default)]
pub struct GameStateManager {
    state: GameState,
}

impl GameStateManager {
    /// Starts in [`GameState::Playing`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    /// Switch to `state`. Returns whether anything changed.
    pub fn change_state(&mut self, state: GameState, timers: &mut TimerQueue) -> bool {
        if self.state == state {
            return false;
        }
        match state {
            GameState::Paused if self.state == GameState::GameOver => {
                tracing::debug!("ignoring pause request after game over");
                return false;
            }
            GameState::Paused | GameState::GameOver => timers.pause(),
            GameState::Playing => timers.resume(),
        }
        tracing::debug!(from = ?self.state, to = ?state, "game state changed");
        self.state = state;
        true
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use onslaught_core::timer::Timers;

    use super::*;

    #[test]
    fn pause_and_resume_drive_the_clock() {
        let mut timers = TimerQueue::new();
        let mut manager = GameStateManager::new();
        assert!(!manager.change_state(GameState::Playing, &mut timers));

        assert!(manager.change_state(GameState::Paused, &mut timers));
        timers.advance(Duration::from_millis(100));
        assert_eq!(timers.now(), Duration::ZERO);

        assert!(manager.change_state(GameState::Playing, &mut timers));
        timers.advance(Duration::from_millis(100));
        assert_eq!(timers.now(), Duration::from_millis(100));
    }

    #[test]
    fn game_over_refuses_pause() {
        let mut timers = TimerQueue::new();
        let mut manager = GameStateManager::new();
        manager.change_state(GameState::GameOver, &mut timers);
        assert!(timers.is_paused());
        assert!(!manager.change_state(GameState::Paused, &mut timers));
        assert_eq!(manager.state(), GameState::GameOver);

        assert!(manager.change_state(GameState::Playing, &mut timers));
        assert!(!timers.is_paused());
    }
}
