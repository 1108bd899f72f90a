use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("gateway is not responding (HTTP {status})")]
    HttpStatus { status: u16, body: String },
    #[error("gateway returned error {code}: {message}")]
    Application { code: String, message: String },
    #[error("malformed gateway response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("gateway response is missing `{0}`")]
    MissingField(&'static str),
    #[error("{0} not found")]
    NotFound(String),
    #[error("order subsystem error: {0}")]
    Collaborator(String),
    #[error("currency conversion failed: {0}")]
    Conversion(String),
    #[error("template error: {0}")]
    Template(String),
}

impl GatewayError {
    /// Whether the gateway client already recorded this failure with the event logger.
    pub fn reported_by_client(&self) -> bool {
        matches!(
            self,
            GatewayError::Transport(_)
                | GatewayError::HttpStatus { .. }
                | GatewayError::Application { .. }
                | GatewayError::Decode(_)
                | GatewayError::MissingField(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
