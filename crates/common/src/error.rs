use thiserror::Error;

pub type Result<T> = std::result::Result<T, WatchError>;

/// Error taxonomy shared by every crate in the workspace.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Startup configuration missing or malformed. Fatal.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to fetch the version marker or the item list. Aborts the cycle.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A single notification could not be delivered.
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// The persisted record could not be read or parsed.
    #[error("State corruption: {0}")]
    StateCorruption(String),

    /// The persisted record could not be written.
    #[error("State error: {0}")]
    State(String),
}

impl WatchError {
    /// Whether the next cycle may succeed without operator intervention.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            WatchError::Fetch(_) | WatchError::Delivery(_) | WatchError::StateCorruption(_)
        )
    }
}
