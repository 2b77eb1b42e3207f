use thiserror::Error;

use crate::protocol::FrameError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LinkError>;
