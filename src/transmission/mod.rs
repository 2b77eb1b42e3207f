/// Transmission layer: latest-value hand-off, fixed-rate RC scheduling and
/// the session event loop
pub mod clock;
pub mod latest;
pub mod scheduler;
pub mod session;

pub use clock::{Clock, ManualClock, WallClock};
pub use latest::Latest;
pub use scheduler::{TickOutcome, TxScheduler, TxStats};
pub use session::{Command, Session, SessionHandle, SessionReport};
