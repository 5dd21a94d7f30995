use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserlessError>;

#[derive(Debug, Error)]
pub enum BrowserlessError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Browserless request timed out: {0}")]
    Timeout(String),

    /// Browserless itself refused the call. Target-page statuses are reported
    /// on the page, not here.
    #[error("Browserless returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BrowserlessError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BrowserlessError::Timeout(err.to_string())
        } else if err.is_decode() {
            BrowserlessError::Decode(err.to_string())
        } else {
            BrowserlessError::Network(err.to_string())
        }
    }
}
