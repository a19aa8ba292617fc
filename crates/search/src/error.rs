use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    /// Carries the whole context chain in its message.
    #[error("Invalid scoring profile: {0:#}")]
    InvalidProfile(anyhow::Error),
}

impl From<anyhow::Error> for SearchError {
    fn from(err: anyhow::Error) -> Self {
        Self::InvalidProfile(err)
    }
}
