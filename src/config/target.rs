use super::schema::Channel;
use crate::{Error, Result};
use fanout_input::KeySequence;
use serde::Deserialize;
use std::time::Duration;

/// One surface that receives broadcast messages.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Identifier used in logs and reports.
    pub id: String,

    /// Page loaded into the target's surface.
    pub url: String,

    /// Expected widget type. The element found at dispatch time decides the
    /// commit variant; this is only the fallback for elements of unknown kind.
    #[serde(default)]
    pub input_kind: InputKind,

    pub selectors: Selectors,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default = "default_focus_delay_ms")]
    pub focus_delay_ms: u64,

    #[serde(default = "default_submit_delay_ms")]
    pub submit_delay_ms: u64,

    /// Signal sent right after focusing the editor.
    pub pre_focus: Option<PreFocus>,

    /// Click-point correction for this target.
    #[serde(default)]
    pub bias: Bias,

    /// Keys sent after pasting on the OS input channel.
    #[serde(default = "default_submit_keys")]
    pub submit_keys: KeySequence,

    /// Per-target override of the deployment channel.
    pub channel: Option<Channel>,

    /// Modal that must be closed once after the page loads.
    pub dismiss: Option<DismissConfig>,
}

fn default_focus_delay_ms() -> u64 {
    200
}
fn default_submit_delay_ms() -> u64 {
    300
}
fn default_submit_keys() -> KeySequence {
    KeySequence::parse("{Enter}").unwrap_or_default()
}

impl TargetConfig {
    pub fn focus_delay(&self) -> Duration {
        Duration::from_millis(self.focus_delay_ms)
    }

    pub fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.submit_delay_ms)
    }

    /// Keys sent between the click and the paste on the OS input channel.
    pub fn pre_focus_keys(&self) -> KeySequence {
        self.pre_focus.map(PreFocus::keys).unwrap_or_default()
    }

    /// Selector chain used to locate the click point.
    pub fn click_selectors(&self) -> &[String] {
        self.selectors
            .click
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(self.selectors.editor.as_slice())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::Config("target id is required".into()));
        }
        let ctx = |msg: &str| Error::Config(format!("target '{}': {}", self.id, msg));
        if self.url.is_empty() {
            return Err(ctx("url is required"));
        }
        if self.selectors.editor.is_empty() {
            return Err(ctx("selectors.editor must not be empty"));
        }
        if self.selectors.editor.iter().any(|s| s.trim().is_empty()) {
            return Err(ctx("selectors.editor contains an empty selector"));
        }
        if self.retry.attempts == 0 {
            return Err(ctx("retry.attempts must be at least 1"));
        }
        if !(self.bias.x > 0.0 && self.bias.y > 0.0) {
            return Err(ctx("bias factors must be positive"));
        }
        if let Some(ref dismiss) = self.dismiss {
            if dismiss.selectors.is_empty() {
                return Err(ctx("dismiss.selectors must not be empty"));
            }
            if dismiss.attempts == 0 {
                return Err(ctx("dismiss.attempts must be at least 1"));
            }
        }
        Ok(())
    }
}

/// Widget type a target is expected to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// `<textarea>` or `<input>`.
    PlainField,
    /// `contenteditable` region driven by an editor framework.
    RichEditable,
    /// Either, depending on the page's state.
    #[default]
    Hybrid,
}

/// Ordered selector chains per element role.
#[derive(Debug, Clone, Deserialize)]
pub struct Selectors {
    pub editor: Vec<String>,

    #[serde(default)]
    pub submit: Vec<String>,

    /// Overrides `editor` when locating the OS click point.
    pub click: Option<Vec<String>>,
}

fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1000
}

/// Retry configuration for editor discovery.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts, including the first.
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,

    /// Delay between attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Signal required before the editor accepts input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreFocus {
    /// Escape keydown on the document, closing popovers.
    Escape,
}

impl PreFocus {
    /// Key sequence with the same effect on the OS input channel.
    pub fn keys(self) -> KeySequence {
        match self {
            PreFocus::Escape => KeySequence::parse("{Esc}").unwrap_or_default(),
        }
    }
}

fn default_bias() -> f64 {
    1.0
}

/// Multiplicative click-point corrections, tuned per target and display.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Bias {
    #[serde(default = "default_bias")]
    pub x: f64,
    #[serde(default = "default_bias")]
    pub y: f64,
}

impl Default for Bias {
    fn default() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

fn default_dismiss_interval_ms() -> u64 {
    1000
}
fn default_dismiss_attempts() -> u32 {
    30
}

/// Polling for a modal close button.
#[derive(Debug, Clone, Deserialize)]
pub struct DismissConfig {
    pub selectors: Vec<String>,

    #[serde(default = "default_dismiss_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_dismiss_attempts")]
    pub attempts: u32,
}

impl DismissConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
