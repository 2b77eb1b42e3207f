//! Discrete operator events consumed by the input reducer

use serde::{Deserialize, Serialize};

/// Operator keys, independent of the physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    /// Forward (throttle below neutral)
    ThrottleUp,
    /// Reverse (throttle above neutral)
    ThrottleDown,
    RollLeft,
    RollRight,
    /// Momentary aux1
    Action,
    /// Latching aux2
    Aux2Toggle,
    /// Flips AUTO on press
    AutoToggle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Pressed(Key),
    Released(Key),
    /// New speed limiter setting; clamped to the allowed range
    SpeedLimit(u16),
}
