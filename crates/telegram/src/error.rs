use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("invalid chat id {chat_id:?}")]
    InvalidChatId { chat_id: String },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

impl From<Error> for umbra_channels::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidChatId { chat_id } => Self::invalid_input(format!("chat id {chat_id:?}")),
            other => Self::external("telegram", other),
        }
    }
}

impl From<Error> for umbra_sessions::Error {
    fn from(err: Error) -> Self {
        Self::channel("telegram", err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
