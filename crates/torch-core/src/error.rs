use thiserror::Error;

use crate::audio::TriggerError;

#[derive(Debug, Error)]
pub enum TorchError {
    #[error("audio trigger setup failed: {0}")]
    Trigger(#[from] TriggerError),
    #[error("modulation needs at least one bin")]
    NoBins,
}

pub type Result<T, E = TorchError> = std::result::Result<T, E>;
