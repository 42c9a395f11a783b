//! # fanout-input
//!
//! The synthetic OS input capability used by `fanout`: move the pointer,
//! click, type text, send key sequences and write the clipboard.
//!
//! Implementations take `&self` and are driven from async code. Callers are
//! responsible for serializing access; a backend represents physical devices
//! and must never see two actions interleaved.

mod keys;
#[cfg(feature = "native")]
mod native;

pub use keys::{Key, KeySequence, KeyStroke, Modifiers};
#[cfg(feature = "native")]
pub use native::NativeInput;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for input operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by input backends.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("input backend unavailable: {0}")]
    Unavailable(String),

    #[error("input failed: {0}")]
    Input(String),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("invalid key sequence '{input}': {reason}")]
    KeySequence { input: String, reason: String },
}

/// Absolute position on the OS screen, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Pointer and keyboard automation.
#[async_trait]
pub trait InputBackend: Send + Sync {
    /// Move the pointer to an absolute screen position.
    async fn move_pointer(&self, to: Point) -> Result<()>;

    /// Left click at the current pointer position.
    async fn click(&self) -> Result<()>;

    /// Type literal text.
    async fn type_text(&self, text: &str) -> Result<()>;

    /// Send a parsed key sequence.
    async fn send_keys(&self, keys: &KeySequence) -> Result<()>;

    /// Current pointer position.
    async fn pointer_position(&self) -> Result<Point>;
}

/// System clipboard.
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<()>;
}
