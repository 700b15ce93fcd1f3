use reqwest::StatusCode;

/// Errors produced by the notification gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("No credential stored; request not sent")]
    MissingCredential,

    #[error("Authentication rejected by server; session ended")]
    Unauthorized,

    #[error("Server declined the request: {message}")]
    Rejected { message: String },

    #[error("Server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GatewayError {
    /// Whether the error means authorized polling must stop for this session.
    pub fn is_session_ending(&self) -> bool {
        matches!(self, GatewayError::Unauthorized)
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            GatewayError::Status { status, .. } => Some(*status),
            GatewayError::Transport(e) => e.status(),
            _ => None,
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
