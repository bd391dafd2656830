use thiserror::Error;

pub type Result<T> = std::result::Result<T, MachineError>;

/// Error type for machine operations.
///
/// Transport failures (connection, authentication, session setup), command
/// exit failures, and transfer sub-step failures are distinct variants so
/// callers can branch on the category without parsing the message.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Host key rejected: {0}")]
    HostKey(String),

    /// Session or pipe setup failed before the command could run.
    #[error("Session error: {0}")]
    Session(String),

    /// The command ran and exited with a failure status.
    #[error("Command exited with status {status}: {detail}")]
    CommandFailed { status: i32, detail: String },

    /// The command ran but its exit status could not be determined.
    #[error("Command exit status could not be determined: {0}")]
    ExitStatusUnknown(String),

    #[error("Failed to create directory {path}: {detail}")]
    CreateDir { path: String, detail: String },

    #[error("Failed to transfer {path}: {detail}")]
    Transfer { path: String, detail: String },

    #[error("Tunnel error: {0}")]
    Tunnel(String),

    #[error("Runtime client error: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
