//! In-page commit of a message into one target's editor.
//!
//! Each attempt walks `Discovering → Focusing → Committing → AwaitingSubmit
//! → Done`, or ends in `Failed`. The commit variant follows the element found
//! at runtime, not the configured input kind: the same page can show a
//! `<textarea>` on one visit and a `contenteditable` region on the next.

mod plain;
mod rich;
mod submit;

use crate::config::{InputKind, PreFocus, TargetConfig};
use crate::dom::{resolve, Document, ElementKind};
use crate::retry::RetryPolicy;
use crate::FailureReason;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use submit::SubmitResult;
use tracing::{debug, info, warn};

/// States of one commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState {
    Discovering,
    Focusing,
    Committing,
    AwaitingSubmit,
    Done,
    Failed,
}

/// What a commit attempt produced.
///
/// `success` only reflects whether the text was committed. Submission is
/// best-effort: a missing or disabled submit button is reported in `reason`
/// while `success` stays true.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    pub final_text: String,
    /// Editor discovery attempts used.
    pub attempts: u32,
    /// Runtime kind of the editor, when one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ElementKind>,
}

impl CommitOutcome {
    fn failed(reason: FailureReason, attempts: u32, kind: Option<ElementKind>) -> Self {
        Self {
            success: false,
            reason: Some(reason),
            final_text: String::new(),
            attempts,
            kind,
        }
    }
}

struct Attempt<'a> {
    target: &'a TargetConfig,
    state: CommitState,
}

impl Attempt<'_> {
    fn enter(&mut self, next: CommitState) {
        debug!("{}: {:?} -> {:?}", self.target.id, self.state, next);
        self.state = next;
    }
}

/// Commit `message` into the target's editor and try to submit it.
pub async fn commit_message(
    doc: &dyn Document,
    target: &TargetConfig,
    message: &str,
) -> CommitOutcome {
    let mut attempt = Attempt {
        target,
        state: CommitState::Discovering,
    };

    let editors = target.selectors.editor.as_slice();
    let attempts = AtomicU32::new(0);
    let found = RetryPolicy::from(&target.retry)
        .run(|| {
            attempts.fetch_add(1, Ordering::Relaxed);
            resolve(editors, doc)
        })
        .await;
    let attempts = attempts.into_inner();

    let Some(editor) = found else {
        attempt.enter(CommitState::Failed);
        warn!("{}: editor not found after {} attempts", target.id, attempts);
        return CommitOutcome::failed(FailureReason::ElementNotFound, attempts, None);
    };

    attempt.enter(CommitState::Focusing);
    let focused = async {
        doc.focus(&editor).await?;
        if target.pre_focus == Some(PreFocus::Escape) {
            doc.send_escape().await?;
        }
        crate::Result::Ok(())
    }
    .await;
    if let Err(e) = focused {
        attempt.enter(CommitState::Failed);
        warn!("{}: focusing editor failed: {}", target.id, e);
        return CommitOutcome::failed(FailureReason::Execution(e.to_string()), attempts, Some(editor.kind));
    }
    // Committing before the page finishes its own focus handling drops input.
    tokio::time::sleep(target.focus_delay()).await;

    attempt.enter(CommitState::Committing);
    let variant = commit_variant(editor.kind, target.input_kind);
    if target.input_kind != InputKind::Hybrid && !matches_configured(variant, target.input_kind) {
        debug!(
            "{}: configured {:?} but found {:?}",
            target.id, target.input_kind, editor.kind
        );
    }
    let committed = match variant {
        ElementKind::RichEditable => rich::commit(doc, &editor, message).await,
        _ => plain::commit(doc, &editor, message).await,
    };
    let final_text = match committed {
        Ok(text) => text,
        Err(e) => {
            attempt.enter(CommitState::Failed);
            warn!("{}: commit failed: {}", target.id, e);
            return CommitOutcome::failed(FailureReason::Execution(e.to_string()), attempts, Some(editor.kind));
        }
    };
    info!("{}: committed {} chars ({:?})", target.id, message.chars().count(), variant);

    let mut reason = None;
    if !target.selectors.submit.is_empty() {
        attempt.enter(CommitState::AwaitingSubmit);
        reason = match submit::submit(doc, &target.selectors.submit, target.submit_delay()).await {
            SubmitResult::Clicked => None,
            SubmitResult::NotFound => Some(FailureReason::SubmitNotFound),
            SubmitResult::Disabled => Some(FailureReason::SubmitDisabled),
            SubmitResult::Failed(msg) => Some(FailureReason::Execution(msg)),
        };
        if let Some(ref r) = reason {
            info!("{}: message committed but not submitted ({})", target.id, r);
        }
    }

    attempt.enter(CommitState::Done);
    CommitOutcome {
        success: true,
        reason,
        final_text,
        attempts,
        kind: Some(editor.kind),
    }
}

/// Variant for an element of unknown kind falls back to the configured kind.
fn commit_variant(found: ElementKind, configured: InputKind) -> ElementKind {
    match (found, configured) {
        (ElementKind::Other, InputKind::RichEditable) => ElementKind::RichEditable,
        (ElementKind::Other, _) => ElementKind::PlainField,
        (kind, _) => kind,
    }
}

fn matches_configured(variant: ElementKind, configured: InputKind) -> bool {
    matches!(
        (variant, configured),
        (ElementKind::PlainField, InputKind::PlainField)
            | (ElementKind::RichEditable, InputKind::RichEditable)
    )
}
