//! Commit into a `contenteditable` region.

use crate::dom::{Document, ElementHandle, RICH_EDITABLE_EVENTS};
use crate::Result;
use tracing::{debug, warn};

/// Reset to one empty paragraph, insert at the caret through the editing
/// command, and overwrite the markup directly if the text did not land.
pub(super) async fn commit(doc: &dyn Document, el: &ElementHandle, message: &str) -> Result<String> {
    doc.reset_rich_content(el).await?;

    let reported = match doc.insert_text_command(el, message).await {
        Ok(r) => r,
        Err(e) => {
            warn!("insert-text command failed: {}", e);
            false
        }
    };

    let text = doc.text_content(el).await?;
    if text.contains(message) {
        return Ok(text);
    }

    debug!(
        "insert-text command reported {} but content is {:?}; replacing markup",
        reported, text
    );
    doc.replace_markup(el, message).await?;
    doc.dispatch_events(el, RICH_EDITABLE_EVENTS).await?;
    doc.text_content(el).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDocument, FakeElement, Op};

    async fn found(doc: &FakeDocument) -> ElementHandle {
        doc.query("[contenteditable]").await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_insert_command_lands() {
        let doc = FakeDocument::new().with(FakeElement::rich(7).matching(&["[contenteditable]"]));
        let el = found(&doc).await;

        let text = commit(&doc, &el, "hi there").await.unwrap();

        assert_eq!(text, "hi there");
        assert_eq!(
            doc.ops(),
            vec![Op::ResetRich(7), Op::Insert(7, "hi there".into())]
        );
    }

    #[tokio::test]
    async fn test_silent_insert_failure_falls_back_to_markup() {
        let doc = FakeDocument::new().with(
            FakeElement::rich(7)
                .matching(&["[contenteditable]"])
                .broken_insert_command(),
        );
        let el = found(&doc).await;

        let text = commit(&doc, &el, "<b>not markup</b>").await.unwrap();

        assert_eq!(text, "<b>not markup</b>");
        let ops = doc.ops();
        assert!(ops.contains(&Op::Replace(7, "<b>not markup</b>".into())));
        assert_eq!(
            ops.last(),
            Some(&Op::Events(7, RICH_EDITABLE_EVENTS.to_vec()))
        );
    }
}
