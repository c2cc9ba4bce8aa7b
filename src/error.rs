/// Error taxonomy for okectl operations
use thiserror::Error;

/// Exit code for a required identifier that is neither flagged nor on disk
pub const EXIT_MISSING_INPUT: i32 = 3;
/// Exit code for a wait that ran past its deadline
pub const EXIT_WAIT_EXCEEDED: i32 = 4;
/// Exit code for an operator interrupt
pub const EXIT_CANCELLED: i32 = 130;

#[derive(Debug, Error)]
pub enum OkeError {
    #[error("Transport error")]
    Transport(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Response for {0} did not carry an opc-work-request-id header")]
    MissingWorkRequestId(String),

    #[error("{0}")]
    MissingInput(String),

    #[error("Unable to obtain resource ID: no {action} {entity} in work request {work_request_id}")]
    ResourceNotFound {
        work_request_id: String,
        action: String,
        entity: String,
    },

    #[error("Timeout after {secs} seconds: {description}")]
    WaitExceeded { description: String, secs: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Interrupted by operator")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type OkeResult<T> = std::result::Result<T, OkeError>;

impl OkeError {
    /// Whether repeating the same call could reasonably succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            OkeError::Transport(e) => e.is_timeout() || e.is_connect(),
            OkeError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Process exit code for this error kind
    pub fn exit_code(&self) -> i32 {
        match self {
            OkeError::MissingInput(_) => EXIT_MISSING_INPUT,
            OkeError::WaitExceeded { .. } => EXIT_WAIT_EXCEEDED,
            OkeError::Cancelled => EXIT_CANCELLED,
            _ => 1,
        }
    }
}

/// Find the exit code for an error chain, defaulting to 1
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<OkeError>())
        .map(OkeError::exit_code)
        .unwrap_or(1)
}
