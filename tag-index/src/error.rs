use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagIndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Ignore error: {0}")]
    Ignore(String),

    #[error("Scan task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<ignore::Error> for TagIndexError {
    fn from(err: ignore::Error) -> Self {
        TagIndexError::Ignore(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TagIndexError>;
