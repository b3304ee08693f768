//! Clipboard port used by the code block copy affordance.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("clipboard write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

/// Best-effort text clipboard. Implementations may fail; callers absorb it.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}
