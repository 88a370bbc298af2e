//! Error types shared by the decoding, tree and source layers.
//!
//! Every failure is terminal for one invocation: the binary reports it and exits.
//! Runtime failures are split in two so the message can tell a user who lacks
//! access to the runtime socket apart from one whose runtime is simply unreachable.

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, VizError>;

#[derive(Debug, thiserror::Error)]
pub enum VizError {
    /// Input was not a JSON array of the expected record shape.
    #[error("Error reading JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// The runtime socket exists but the current user may not open it.
    #[error(
        "Unable to access the container runtime at {endpoint}: {detail}\n\
         Check that your user may access the runtime socket (e.g. membership in the 'docker' group) or rerun with sudo."
    )]
    SocketAccess { endpoint: String, detail: String },

    /// Any other failure talking to the runtime.
    #[error("Unable to connect to the container runtime at {endpoint}: {detail}")]
    Transport { endpoint: String, detail: String },

    #[error("Unable to find image {token} = {repo_tag}.")]
    NotFound { token: String, repo_tag: String },

    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    Config(String),

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}
