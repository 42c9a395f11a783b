use crate::dom::{resolve, Document};
use std::time::Duration;
use tracing::{debug, warn};

/// Wait before re-checking a disabled submit button.
pub const BUTTON_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum SubmitResult {
    Clicked,
    NotFound,
    Disabled,
    Failed(String),
}

/// Locate the submit button once and activate it if enabled.
///
/// A disabled button gets one more look after [`BUTTON_RETRY_DELAY`]; pages
/// usually enable it once they have processed the committed text.
pub(super) async fn submit(doc: &dyn Document, selectors: &[String], delay: Duration) -> SubmitResult {
    tokio::time::sleep(delay).await;

    let Some(button) = resolve(selectors, doc).await else {
        return SubmitResult::NotFound;
    };

    if disabled(doc, &button).await {
        debug!("submit disabled, checking again in {:?}", BUTTON_RETRY_DELAY);
        tokio::time::sleep(BUTTON_RETRY_DELAY).await;
        if disabled(doc, &button).await {
            return SubmitResult::Disabled;
        }
    }

    match doc.activate(&button).await {
        Ok(()) => SubmitResult::Clicked,
        Err(e) => {
            warn!("activating submit failed: {}", e);
            SubmitResult::Failed(e.to_string())
        }
    }
}

async fn disabled(doc: &dyn Document, button: &crate::dom::ElementHandle) -> bool {
    match doc.is_disabled(button).await {
        Ok(d) => d,
        Err(e) => {
            warn!("checking submit state failed: {}", e);
            true
        }
    }
}
