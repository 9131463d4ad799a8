use thiserror::Error;

/// Engine-level failures. Gate BLOCK/HOLD are decision outcomes, not errors,
/// and never appear here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("insufficient data: {got} samples, need at least {min}")]
    InsufficientData { got: usize, min: usize },

    #[error("invalid observation: {0}")]
    Observation(String),

    #[error("simulation error: {0}")]
    Simulation(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("incomplete run: {0}")]
    IncompleteRun(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
