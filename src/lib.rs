pub mod config;
pub mod console;
pub mod error;
pub mod input;
pub mod protocol;
pub mod telemetry;
pub mod transmission;
pub mod transport;
pub mod utils;
