use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Landmark index {index} out of range for frame with {len} landmarks")]
    LandmarkOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
