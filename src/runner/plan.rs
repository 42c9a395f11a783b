use fanout_input::{KeySequence, Point};
use std::time::Duration;

/// A primitive step for the serialized input executor.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Move the pointer without clicking.
    Move(Point),
    /// Move the pointer and left click.
    Click(Point),
    /// Put text on the clipboard and paste it over the focused field.
    PasteText(String),
    SendKeys(KeySequence),
    Wait(Duration),
}

impl Action {
    /// Get action name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Move(_) => "move",
            Action::Click(_) => "click",
            Action::PasteText(_) => "paste_text",
            Action::SendKeys(_) => "send_keys",
            Action::Wait(_) => "wait",
        }
    }
}

/// Ordered actions for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetPlan {
    pub target: String,
    pub actions: Vec<Action>,
}

/// Per-target action lists, run in order by the executor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchPlan {
    targets: Vec<TargetPlan>,
}

impl DispatchPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, target: impl Into<String>, actions: Vec<Action>) {
        self.targets.push(TargetPlan {
            target: target.into(),
            actions,
        });
    }

    pub fn targets(&self) -> &[TargetPlan] {
        &self.targets
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }
}

/// Actions that deliver `message` to an editor at `point`: click it, send
/// any pre-input keys, paste over its content, then send the target's submit
/// keys.
pub fn sequence(
    point: Point,
    message: &str,
    pre_keys: &KeySequence,
    submit_keys: &KeySequence,
) -> Vec<Action> {
    let mut actions = vec![Action::Click(point)];
    if !pre_keys.is_empty() {
        actions.push(Action::SendKeys(pre_keys.clone()));
    }
    actions.push(Action::PasteText(message.to_string()));
    if !submit_keys.is_empty() {
        actions.push(Action::SendKeys(submit_keys.clone()));
    }
    actions
}
