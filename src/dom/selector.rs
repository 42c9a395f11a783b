use super::{Document, ElementHandle};
use tracing::{debug, warn};

/// Resolve an ordered selector chain against a document.
///
/// Selectors are tried in order and the first match wins, even when later
/// selectors would also match. A selector that fails to evaluate counts as
/// no match.
pub async fn resolve(selectors: &[String], doc: &dyn Document) -> Option<ElementHandle> {
    for (i, selector) in selectors.iter().enumerate() {
        match doc.query(selector).await {
            Ok(Some(el)) => {
                debug!("selector #{} '{}' matched ({:?})", i + 1, selector, el.kind);
                return Some(el);
            }
            Ok(None) => {}
            Err(e) => warn!("selector '{}' failed: {}", selector, e),
        }
    }
    None
}
