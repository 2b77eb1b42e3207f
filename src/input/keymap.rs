use serde::{Deserialize, Serialize};

use super::events::Key;

/// Device key names bound to operator keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub throttle_up: String,
    pub throttle_down: String,
    pub roll_left: String,
    pub roll_right: String,
    pub action: String,
    pub aux2_toggle: String,
    pub auto_toggle: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            throttle_up: "ArrowUp".into(),
            throttle_down: "ArrowDown".into(),
            roll_left: "ArrowLeft".into(),
            roll_right: "ArrowRight".into(),
            action: " ".into(),
            aux2_toggle: "f".into(),
            auto_toggle: "a".into(),
        }
    }
}

impl KeyBindings {
    /// Operator key bound to `name`. `space` is accepted for a bound " ".
    pub fn resolve(&self, name: &str) -> Option<Key> {
        let name = if name.eq_ignore_ascii_case("space") {
            " "
        } else {
            name
        };
        [
            (&self.throttle_up, Key::ThrottleUp),
            (&self.throttle_down, Key::ThrottleDown),
            (&self.roll_left, Key::RollLeft),
            (&self.roll_right, Key::RollRight),
            (&self.action, Key::Action),
            (&self.aux2_toggle, Key::Aux2Toggle),
            (&self.auto_toggle, Key::AutoToggle),
        ]
        .into_iter()
        .find(|(bound, _)| bound.as_str() == name)
        .map(|(_, key)| key)
    }
}
