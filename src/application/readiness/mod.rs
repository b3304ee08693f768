//! Article readiness: detect when a generated article body becomes final.
//!
//! [`ReadinessMachine`] is a pure controller that turns fetch results and timer
//! firings into effects. [`ArticleWatcher`] executes those effects on the tokio
//! event loop with single-slot cancellable timers, so switching articles or
//! dropping the watcher never leaves a poll running.

mod machine;
mod status;
mod watcher;

pub use machine::{
    ArticleSnapshot, DEFAULT_POLL_INTERVAL, Effect, FailureReason, FetchTicket, PollingConfig,
    ReadinessMachine, ReadinessState, TimerKind, TimerToken,
};
pub use status::{status_message, status_message_count};
pub use watcher::ArticleWatcher;
