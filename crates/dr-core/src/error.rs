use crate::types::Step;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DrError {
    #[error("Unknown action: {0}")]
    InvalidAction(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    DependencyUnhealthy(String),

    /// An ordered procedure stopped partway. The procedure has already sent
    /// its own ERROR notification when this is returned.
    #[error("{procedure} failed at step {}: {source}", .steps_completed.len())]
    StepFailure {
        procedure: &'static str,
        steps_completed: Vec<Step>,
        #[source]
        source: Box<DrError>,
    },

    #[error("Database {identifier} did not reach {target} status within {waited_secs} seconds")]
    TimeoutExceeded {
        identifier: String,
        target: String,
        waited_secs: u64,
    },

    #[error("notification failed: {0}")]
    NotificationFailure(String),

    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    #[error("{operation} returned status {status}: {message}")]
    Gateway {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl DrError {
    /// Whether an ERROR notification for this failure was already sent.
    pub fn is_notified(&self) -> bool {
        matches!(self, DrError::StepFailure { .. })
    }

    /// Progress reached before the failure, if the failure came from an
    /// ordered procedure.
    pub fn steps_completed(&self) -> Option<&[Step]> {
        match self {
            DrError::StepFailure {
                steps_completed, ..
            } => Some(steps_completed),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DrError>;
