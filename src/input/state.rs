//! Operator input state and its reducer
//!
//! Every channel value is a function of the previous state and one event.
//! The operating mode is never stored; it is projected from the auto flag and
//! aux2 each time it is read.

use serde::Serialize;

use super::events::{InputEvent, Key};
use crate::protocol::Channels;
use crate::utils::consts::*;

/// Operating mode derived from the input flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Manual,
    SemiAuto,
    Auto,
}

/// Latest operator intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputState {
    pub throttle: u16,
    pub roll: u16,
    pub aux1: u16,
    pub aux2: u16,
    speed_limit: u16,
    auto: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            throttle: CHANNEL_NEUTRAL,
            roll: CHANNEL_NEUTRAL,
            aux1: CHANNEL_LOW,
            aux2: CHANNEL_LOW,
            speed_limit: 0,
            auto: false,
        }
    }
}

impl InputState {
    pub fn with_speed_limit(speed_limit: u16) -> Self {
        Self::default().apply(InputEvent::SpeedLimit(speed_limit))
    }

    pub fn mode(&self) -> Mode {
        if self.auto {
            Mode::Auto
        } else if self.aux2 == CHANNEL_HIGH {
            Mode::SemiAuto
        } else {
            Mode::Manual
        }
    }

    pub fn speed_limit(&self) -> u16 {
        self.speed_limit
    }

    pub fn channels(&self) -> Channels {
        Channels {
            throttle: self.throttle,
            roll: self.roll,
            aux1: self.aux1,
            aux2: self.aux2,
        }
    }

    fn forward(&self) -> u16 {
        CHANNEL_NEUTRAL - self.speed_limit
    }

    fn reverse(&self) -> u16 {
        CHANNEL_NEUTRAL + self.speed_limit
    }

    /// Next state after `event`.
    pub fn apply(self, event: InputEvent) -> Self {
        let mut next = self;
        match event {
            InputEvent::Pressed(Key::AutoToggle) => {
                next.auto = !self.auto;
                if next.auto {
                    next.throttle = next.forward();
                    next.aux2 = CHANNEL_HIGH;
                } else {
                    next.throttle = CHANNEL_NEUTRAL;
                    next.aux2 = CHANNEL_LOW;
                }
            }
            // AUTO pins throttle
            InputEvent::Pressed(Key::ThrottleUp | Key::ThrottleDown)
            | InputEvent::Released(Key::ThrottleUp | Key::ThrottleDown)
                if self.auto => {}
            InputEvent::Pressed(Key::ThrottleUp) => next.throttle = self.forward(),
            InputEvent::Pressed(Key::ThrottleDown) => next.throttle = self.reverse(),
            InputEvent::Released(Key::ThrottleUp | Key::ThrottleDown) => {
                next.throttle = CHANNEL_NEUTRAL
            }
            InputEvent::Pressed(Key::RollLeft) => next.roll = self.reverse(),
            InputEvent::Pressed(Key::RollRight) => next.roll = self.forward(),
            InputEvent::Released(Key::RollLeft | Key::RollRight) => next.roll = CHANNEL_NEUTRAL,
            InputEvent::Pressed(Key::Action) => next.aux1 = CHANNEL_HIGH,
            InputEvent::Released(Key::Action) => next.aux1 = CHANNEL_LOW,
            // AUTO owns aux2 while active
            InputEvent::Pressed(Key::Aux2Toggle) if self.auto => {}
            InputEvent::Pressed(Key::Aux2Toggle) => {
                next.aux2 = if self.aux2 == CHANNEL_HIGH {
                    CHANNEL_LOW
                } else {
                    CHANNEL_HIGH
                };
            }
            InputEvent::Released(Key::Aux2Toggle | Key::AutoToggle) => {}
            InputEvent::SpeedLimit(limit) => {
                next.speed_limit = limit.min(SPEED_LIMIT_MAX);
                if next.auto {
                    next.throttle = next.forward();
                }
            }
        }
        next
    }
}

/// `(state, event) -> state`
pub fn reduce(state: InputState, event: InputEvent) -> InputState {
    state.apply(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputEvent::*;

    fn run(state: InputState, events: &[InputEvent]) -> InputState {
        events.iter().fold(state, |s, &e| reduce(s, e))
    }

    #[test]
    fn test_defaults_are_neutral_manual() {
        let state = InputState::default();
        assert_eq!(state.channels(), Channels::default());
        assert_eq!(state.mode(), Mode::Manual);
    }

    #[test]
    fn test_auto_toggle_pins_throttle_immediately() {
        let state = InputState::with_speed_limit(200);

        let auto = reduce(state, Pressed(Key::AutoToggle));
        assert_eq!(auto.mode(), Mode::Auto);
        assert_eq!(auto.throttle, 1300);
        assert_eq!(auto.aux2, CHANNEL_HIGH);

        let released = reduce(auto, Released(Key::AutoToggle));
        assert_eq!(released, auto);

        let manual = reduce(released, Pressed(Key::AutoToggle));
        assert_eq!(manual.mode(), Mode::Manual);
        assert_eq!(manual.throttle, CHANNEL_NEUTRAL);
        assert_eq!(manual.aux2, CHANNEL_LOW);
    }

    #[test]
    fn test_throttle_and_roll_deflect_by_speed_limit() {
        let state = InputState::with_speed_limit(300);

        let s = reduce(state, Pressed(Key::ThrottleUp));
        assert_eq!(s.throttle, 1200);
        let s = reduce(s, Released(Key::ThrottleUp));
        assert_eq!(s.throttle, 1500);
        let s = reduce(s, Pressed(Key::ThrottleDown));
        assert_eq!(s.throttle, 1800);
        let s = reduce(s, Released(Key::ThrottleDown));
        assert_eq!(s.throttle, 1500);

        let s = reduce(s, Pressed(Key::RollLeft));
        assert_eq!(s.roll, 1800);
        let s = reduce(s, Pressed(Key::RollRight));
        assert_eq!(s.roll, 1200);
        let s = reduce(s, Released(Key::RollRight));
        assert_eq!(s.roll, 1500);
        assert_eq!(s.mode(), Mode::Manual);
    }

    #[test]
    fn test_action_is_momentary() {
        let s = reduce(InputState::default(), Pressed(Key::Action));
        assert_eq!(s.aux1, CHANNEL_HIGH);
        let s = reduce(s, Released(Key::Action));
        assert_eq!(s.aux1, CHANNEL_LOW);
    }

    #[test]
    fn test_aux2_toggle_latches_into_semi_auto() {
        let s = run(
            InputState::default(),
            &[Pressed(Key::Aux2Toggle), Released(Key::Aux2Toggle)],
        );
        assert_eq!(s.aux2, CHANNEL_HIGH);
        assert_eq!(s.mode(), Mode::SemiAuto);

        let s = reduce(s, Pressed(Key::Aux2Toggle));
        assert_eq!(s.aux2, CHANNEL_LOW);
        assert_eq!(s.mode(), Mode::Manual);
    }

    #[test]
    fn test_auto_overrides_throttle_keys_and_aux2_toggle() {
        let auto = run(
            InputState::with_speed_limit(100),
            &[Pressed(Key::AutoToggle)],
        );
        let s = run(
            auto,
            &[
                Pressed(Key::ThrottleDown),
                Released(Key::ThrottleDown),
                Pressed(Key::Aux2Toggle),
            ],
        );
        assert_eq!(s.throttle, 1400);
        assert_eq!(s.aux2, CHANNEL_HIGH);
        assert_eq!(s.mode(), Mode::Auto);

        // steering stays with the operator
        let s = reduce(s, Pressed(Key::RollLeft));
        assert_eq!(s.roll, 1600);
    }

    #[test]
    fn test_speed_change_reapplies_in_auto_only() {
        let manual = run(
            InputState::with_speed_limit(100),
            &[Pressed(Key::ThrottleUp), SpeedLimit(400)],
        );
        assert_eq!(manual.throttle, 1400);
        assert_eq!(manual.speed_limit(), 400);

        let auto = run(
            InputState::with_speed_limit(100),
            &[Pressed(Key::AutoToggle), SpeedLimit(400)],
        );
        assert_eq!(auto.throttle, 1100);
    }

    #[test]
    fn test_speed_limit_is_clamped() {
        let s = reduce(InputState::default(), SpeedLimit(900));
        assert_eq!(s.speed_limit(), SPEED_LIMIT_MAX);
        let s = run(s, &[Pressed(Key::ThrottleDown)]);
        assert_eq!(s.throttle, CHANNEL_HIGH);
    }

    #[test]
    fn test_leaving_auto_from_semi_auto_resets_aux2() {
        let s = run(
            InputState::default(),
            &[
                Pressed(Key::Aux2Toggle),
                Pressed(Key::AutoToggle),
                Pressed(Key::AutoToggle),
            ],
        );
        assert_eq!(s.aux2, CHANNEL_LOW);
        assert_eq!(s.mode(), Mode::Manual);
    }
}
