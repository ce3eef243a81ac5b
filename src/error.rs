//! Error types
//!
//! Library modules return the typed errors below; only `main` uses `anyhow`.
//! Every error that reaches the app is shown to the user as a timed message.

/// Failure talking to the playback server
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Transport failure; the connection is unusable afterwards
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// The server sent something that does not parse
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server rejected a command (`ACK [code@index] {command} message`)
    #[error("{message}")]
    Ack { code: u32, command: String, message: String },

    #[error("not connected")]
    NotConnected,
}

impl ServiceError {
    /// Whether the connection has to be considered lost
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ServiceError::Connection(_) | ServiceError::Protocol(_) | ServiceError::NotConnected
        )
    }
}

/// Failure while mirroring server state
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("connection lost: {0}")]
    Connection(#[source] ServiceError),

    /// A fetch during reconciliation failed; previous state was kept
    #[error("failed to fetch status: {0}")]
    StatusFetch(#[source] ServiceError),

    /// The server refused a command
    #[error("{0}")]
    Execution(#[source] ServiceError),

    #[error("not connected")]
    NotConnected,
}

/// Failure parsing or running a command line
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownVerb(String),

    #[error("{verb}: missing argument")]
    MissingArgument { verb: String },

    #[error("invalid argument '{arg}': {description}")]
    InvalidArgument { arg: String, description: String },

    #[error("{0}")]
    Execution(String),

    #[error("Not connected. Retrying in the background.")]
    NotConnected,
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_displays_server_message() {
        let err = ServiceError::Ack {
            code: 50,
            command: "play".into(),
            message: "No such song".into(),
        };
        assert_eq!(err.to_string(), "No such song");
        assert!(!err.is_fatal());
    }

    #[test]
    fn io_errors_are_fatal() {
        let err: ServiceError = std::io::Error::from(std::io::ErrorKind::BrokenPipe).into();
        assert!(err.is_fatal());
    }
}
