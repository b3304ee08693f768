use thiserror::Error;

use crate::{
    application::{
        clipboard::ClipboardError, readiness::FailureReason, render::RenderError,
    },
    domain::error::DomainError,
    infra::error::InfraError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error("article not found")]
    NotFound,
    #[error("article could not be loaded: {0}")]
    Failed(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

impl From<FailureReason> for AppError {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::NotFound => AppError::NotFound,
            FailureReason::Transport(message) => AppError::Failed(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reasons_map_to_terminal_errors() {
        assert!(matches!(
            AppError::from(FailureReason::NotFound),
            AppError::NotFound
        ));
        let error = AppError::from(FailureReason::Transport("connection refused".into()));
        assert_eq!(
            error.to_string(),
            "article could not be loaded: connection refused"
        );
    }

    #[test]
    fn clipboard_errors_are_reported_verbatim() {
        let error = AppError::from(ClipboardError::Unavailable("no terminal".into()));

        assert!(matches!(error, AppError::Clipboard(_)));
        assert_eq!(
            error.to_string(),
            ClipboardError::Unavailable("no terminal".into()).to_string()
        );
    }
}
