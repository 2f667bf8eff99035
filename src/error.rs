use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("metasprite {name:?} references sprite block {index}, but only {available} blocks were decoded")]
    MissingSpriteBlock {
        name: String,
        index: i64,
        available: usize,
    },
}

pub type Result<T> = std::result::Result<T, ParseError>;
