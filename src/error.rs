use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{kind} not found at {} (certificate for {recipient})", path.display())]
    AssetMissing {
        kind: &'static str,
        path: PathBuf,
        recipient: String,
    },

    #[error("render failed: {0}")]
    Render(String),

    #[error("mail transport failed: {0}")]
    Transport(String),

    #[error("participant roster error: {0}")]
    Roster(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
