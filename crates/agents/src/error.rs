use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("key pool needs at least one credential")]
    EmptyKeyPool,
}

pub type Result<T> = std::result::Result<T, Error>;
