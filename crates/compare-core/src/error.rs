use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unreadable page: {0}")]
    UnreadablePage(String),

    #[error("Unsupported channel layout: {0} channel(s)")]
    UnsupportedChannelLayout(u8),

    #[error("Region extraction error: {0}")]
    RegionExtraction(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Missing counterpart: {0}")]
    MissingCounterpart(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CompareError>;
