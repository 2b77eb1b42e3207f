/// Operator input: discrete key events reduced into the latest channel state
pub mod events;
pub mod keymap;
pub mod state;

pub use events::*;
pub use keymap::KeyBindings;
pub use state::*;
