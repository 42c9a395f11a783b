//! Content-context access: the DOM operations the commit strategies need,
//! and the selector chain resolver built on them.

mod script;
mod selector;

pub use script::{ScriptContext, ScriptDocument};
pub use selector::resolve;

use crate::geometry::Rect;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime widget type of a discovered element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// `<textarea>` or `<input>`; holds a `value`.
    PlainField,
    /// `contenteditable` region; holds markup.
    RichEditable,
    /// Anything else (buttons, plain containers).
    Other,
}

/// Reference to an element found in one content context.
///
/// Produced fresh on every dispatch; target pages re-render freely so a
/// handle is never reused across messages.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementHandle {
    pub id: u64,
    pub kind: ElementKind,
    /// Rectangle relative to the surface, if the element has layout.
    pub rect: Option<Rect>,
}

/// Synthetic DOM events emitted after a programmatic commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomEvent {
    Focus,
    Blur,
    Input,
    Change,
    KeyUp,
    KeyDown,
}

impl DomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::Input => "input",
            Self::Change => "change",
            Self::KeyUp => "keyup",
            Self::KeyDown => "keydown",
        }
    }
}

impl fmt::Display for DomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Events for `<textarea>`/`<input>` commits.
pub const PLAIN_FIELD_EVENTS: &[DomEvent] = &[
    DomEvent::Focus,
    DomEvent::Input,
    DomEvent::Change,
    DomEvent::KeyUp,
    DomEvent::KeyDown,
];

/// Events for `contenteditable` commits.
pub const RICH_EDITABLE_EVENTS: &[DomEvent] = &[
    DomEvent::Input,
    DomEvent::KeyUp,
    DomEvent::Change,
    DomEvent::Blur,
    DomEvent::Focus,
];

/// One target's content context.
#[async_trait]
pub trait Document: Send + Sync {
    /// First element matching a single selector.
    async fn query(&self, selector: &str) -> Result<Option<ElementHandle>>;

    async fn focus(&self, el: &ElementHandle) -> Result<()>;

    /// Escape keydown dispatched on the document.
    async fn send_escape(&self) -> Result<()>;

    /// Plain assignment of `value`, used to clear the field.
    async fn clear_value(&self, el: &ElementHandle) -> Result<()>;

    /// Write `value` through the element prototype's own setter, bypassing
    /// framework wrappers. Returns the value read back afterwards.
    async fn set_value_native(&self, el: &ElementHandle, value: &str) -> Result<String>;

    async fn value(&self, el: &ElementHandle) -> Result<String>;

    async fn dispatch_events(&self, el: &ElementHandle, events: &[DomEvent]) -> Result<()>;

    /// Call the change handler of the framework instance attached to the
    /// element. `Ok(false)` when no handler was found.
    async fn bridge_framework_change(&self, el: &ElementHandle, value: &str) -> Result<bool>;

    /// Replace content with one empty paragraph and put the caret in it.
    async fn reset_rich_content(&self, el: &ElementHandle) -> Result<()>;

    /// Native insert-text editing command at the caret. Returns what the
    /// command reported.
    async fn insert_text_command(&self, el: &ElementHandle, text: &str) -> Result<bool>;

    /// Overwrite markup with a single paragraph holding `text` literally.
    async fn replace_markup(&self, el: &ElementHandle, text: &str) -> Result<()>;

    async fn text_content(&self, el: &ElementHandle) -> Result<String>;

    async fn is_disabled(&self, el: &ElementHandle) -> Result<bool>;

    /// Activate (click) the element.
    async fn activate(&self, el: &ElementHandle) -> Result<()>;
}
