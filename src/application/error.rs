use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError};

use super::session::SessionClosed;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    /// The service rejected the document; carries the extracted diagnostic.
    #[error("render failed: {0}")]
    Render(String),
    #[error("shareable link would be {length} characters, over the limit of {limit}")]
    LinkTooLong { length: usize, limit: usize },
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

impl From<SessionClosed> for AppError {
    fn from(err: SessionClosed) -> Self {
        Self::unexpected(err.to_string())
    }
}
