//! Commit into a `<textarea>`/`<input>` owned by a UI framework.
//!
//! Frameworks keep their own copy of the field's value and ignore plain
//! assignments. Two mechanisms are used together and neither short-circuits
//! the other: the prototype's native setter followed by synthetic events,
//! then a direct call into the framework instance's change handler.

use crate::dom::{Document, ElementHandle, PLAIN_FIELD_EVENTS};
use crate::Result;
use tracing::{debug, warn};

pub(super) async fn commit(doc: &dyn Document, el: &ElementHandle, message: &str) -> Result<String> {
    doc.clear_value(el).await?;

    let stored = doc.set_value_native(el, message).await?;
    if stored != message {
        debug!("native setter left {:?}", stored);
    }
    if let Err(e) = doc.dispatch_events(el, PLAIN_FIELD_EVENTS).await {
        warn!("dispatching field events failed: {}", e);
    }

    match doc.bridge_framework_change(el, message).await {
        Ok(true) => debug!("framework change handler invoked"),
        Ok(false) => debug!("no framework change handler attached"),
        Err(e) => warn!("framework bridge failed: {}", e),
    }

    doc.value(el).await
}
