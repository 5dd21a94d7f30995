use thiserror::Error;

#[derive(Error, Debug)]
pub enum PressroomError {
    #[error("Malformed target domain: {0:?}")]
    MalformedTarget(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
