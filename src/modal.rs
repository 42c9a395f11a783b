//! Closing a modal that some targets show once after loading.

use crate::config::DismissConfig;
use crate::dom::{resolve, Document};
use crate::retry::RetryPolicy;
use tracing::{debug, warn};

/// Poll the dismiss selector chain and activate the first match.
///
/// Gives up after `config.attempts` polls. Returns whether a close control
/// was activated.
pub async fn dismiss_modal(doc: &dyn Document, config: &DismissConfig) -> bool {
    let selectors = config.selectors.as_slice();
    RetryPolicy::new(config.attempts, config.interval())
        .run(move || async move {
            let el = resolve(selectors, doc).await?;
            debug!("close control found ({})", el.id);
            match doc.activate(&el).await {
                Ok(()) => Some(()),
                Err(e) => {
                    warn!("activating close control failed: {}", e);
                    None
                }
            }
        })
        .await
        .is_some()
}
