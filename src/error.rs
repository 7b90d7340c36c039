use std::fmt;

/// Result type for sandpilot operations
pub type Result<T> = std::result::Result<T, PilotError>;

/// Main error type for the sandpilot library
#[derive(Debug, Clone)]
pub enum PilotError {
    /// Replay buffer holds fewer transitions than a sample requires
    InsufficientData {
        available: usize,
        requested: usize,
    },

    /// Invalid parameter value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// IO errors (file operations)
    IoError(String),

    /// Serialization/deserialization errors
    SerializationError(String),

    /// Numerical computation errors
    NumericalError(String),

    /// Action id outside the configured action range
    InvalidAction {
        action: usize,
        max_actions: usize,
    },
}

impl fmt::Display for PilotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PilotError::InsufficientData { available, requested } => {
                write!(f, "Insufficient data: {} transitions stored, {} requested", available, requested)
            }
            PilotError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            PilotError::IoError(msg) => write!(f, "IO error: {}", msg),
            PilotError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            PilotError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            PilotError::InvalidAction { action, max_actions } => {
                write!(f, "Invalid action {}: must be less than {}", action, max_actions)
            }
        }
    }
}

impl std::error::Error for PilotError {}

// Conversion from std::io::Error
impl From<std::io::Error> for PilotError {
    fn from(err: std::io::Error) -> Self {
        PilotError::IoError(err.to_string())
    }
}

// Conversion from bincode::Error
impl From<bincode::Error> for PilotError {
    fn from(err: bincode::Error) -> Self {
        PilotError::SerializationError(err.to_string())
    }
}

impl PilotError {
    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        PilotError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
