//! # fanout
//!
//! Broadcast one message to several web chat surfaces at once. Each target
//! is driven either by script injected into its page or by synthetic OS
//! pointer and keyboard input at the editor's screen position.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fanout::{browser, Config, Engine, Message};
//!
//! # #[tokio::main]
//! # async fn main() -> fanout::Result<()> {
//! let config = Config::load("configs/default.yaml")?;
//! let session = browser::launch(&config.browser, &config.targets).await?;
//! let engine = Engine::builder(config)
//!     .surfaces(session.surfaces())
//!     .screen(session.host())
//!     .host(session.host())
//!     .build()?;
//! let report = engine.dispatch(&Message::new("Hello")).await;
//! println!("Success: {}", report.success);
//! # Ok(())
//! # }
//! ```

pub mod browser;
mod commit;
mod config;
pub mod dom;
pub mod geometry;
mod keepalive;
mod modal;
mod retry;
mod runner;
pub mod surface;

#[cfg(test)]
mod testing;

pub use commit::{commit_message, CommitOutcome, CommitState};
pub use config::{
    Bias, BrowserConfig, Channel, Config, DismissConfig, DispatchConfig, InputKind,
    KeepaliveConfig, PreFocus, RetryConfig, Selectors, TargetConfig, Viewport,
};
pub use fanout_input::{InputBackend, Key, KeySequence, KeyStroke, Modifiers, Point};
pub use keepalive::{ImeKeepalive, KeepaliveState};
pub use modal::dismiss_modal;
pub use retry::{with_retry, RetryPolicy};
pub use runner::{
    sequence, Action, DispatchControl, DispatchPlan, DispatchReport, Engine, EngineBuilder,
    InputExecutor, Message, TargetPlan, TargetReport, TargetRun,
};

use serde::Serialize;
use std::fmt;

/// Result type for fanout operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during config loading or dispatch.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("input error: {0}")]
    Input(#[from] fanout_input::Error),

    #[error("script error: {0}")]
    Script(String),
}

/// Why a target did not take a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// No editor selector matched within the retry budget.
    ElementNotFound,
    /// The message was committed but no submit control matched.
    SubmitNotFound,
    /// The message was committed but the submit control stayed disabled.
    SubmitDisabled,
    /// The editor could not be placed on screen.
    GeometryUnavailable,
    /// OS input was requested but no input backend is present.
    ExecutorUnavailable,
    /// Dispatch was cancelled before this target ran.
    Aborted,
    /// A page or input operation failed.
    Execution(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ElementNotFound => f.write_str("element not found"),
            Self::SubmitNotFound => f.write_str("submit not found"),
            Self::SubmitDisabled => f.write_str("submit disabled"),
            Self::GeometryUnavailable => f.write_str("geometry unavailable"),
            Self::ExecutorUnavailable => f.write_str("input executor unavailable"),
            Self::Aborted => f.write_str("aborted"),
            Self::Execution(msg) => write!(f, "execution failed: {}", msg),
        }
    }
}
