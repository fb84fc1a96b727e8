use thiserror::Error;

/// Errors from calls to the membership backend.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("not signed in or session expired")]
    Auth,

    #[error("request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("unexpected response format: {0}")]
    Format(String),

    #[error("{0}")]
    Validation(String),

    #[error("could not reach the server: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth)
    }
}
