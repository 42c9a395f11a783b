//! Periodic composition reset for the primary input.
//!
//! Some input methods keep stale composition state after text has been
//! injected around them. While the primary input has focus, a reset key
//! sequence is sent once the user has been idle for the configured window,
//! then again every window until focus is lost.

use crate::config::KeepaliveConfig;
use crate::runner::InputExecutor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Observable timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveState {
    /// Never scheduled.
    Idle,
    /// A reset is pending.
    Scheduled,
    /// Stopped by blur or shutdown; only focus or a keystroke restarts it.
    Cancelled,
}

struct Shared {
    focused: AtomicBool,
    resets: AtomicUsize,
}

/// The IME keepalive timer. At most one timer task is live at a time.
///
/// Methods that schedule must be called from within a tokio runtime.
pub struct ImeKeepalive {
    executor: InputExecutor,
    config: KeepaliveConfig,
    shared: Arc<Shared>,
    timer: Mutex<(KeepaliveState, Option<JoinHandle<()>>)>,
}

impl ImeKeepalive {
    pub fn new(executor: InputExecutor, config: KeepaliveConfig) -> Self {
        Self {
            executor,
            config,
            shared: Arc::new(Shared {
                focused: AtomicBool::new(false),
                resets: AtomicUsize::new(0),
            }),
            timer: Mutex::new((KeepaliveState::Idle, None)),
        }
    }

    /// A keystroke in the primary input: push the next reset a full idle
    /// window away.
    pub fn on_keystroke(&self) {
        self.shared.focused.store(true, Ordering::SeqCst);
        self.schedule(self.config.idle());
    }

    /// The primary input gained focus.
    pub fn on_focus(&self) {
        self.shared.focused.store(true, Ordering::SeqCst);
        self.schedule(self.config.focus_reset());
    }

    /// The window lost focus.
    pub fn on_blur(&self) {
        self.shared.focused.store(false, Ordering::SeqCst);
        self.cancel();
    }

    /// Stop for good, e.g. when the window is destroyed.
    pub fn shutdown(&self) {
        self.on_blur();
    }

    pub fn state(&self) -> KeepaliveState {
        self.lock().0
    }

    /// Resets sent so far.
    pub fn resets(&self) -> usize {
        self.shared.resets.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, (KeepaliveState, Option<JoinHandle<()>>)> {
        self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cancel(&self) {
        let mut timer = self.lock();
        if let Some(handle) = timer.1.take() {
            handle.abort();
            debug!("keepalive cancelled");
        }
        if timer.0 != KeepaliveState::Idle {
            timer.0 = KeepaliveState::Cancelled;
        }
    }

    fn schedule(&self, first: Duration) {
        if !self.config.enabled {
            return;
        }
        let mut timer = self.lock();
        if let Some(handle) = timer.1.take() {
            handle.abort();
        }

        let executor = self.executor.clone();
        let keys = self.config.reset_keys.clone();
        let idle = self.config.idle();
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            let mut wait = first;
            loop {
                tokio::time::sleep(wait).await;
                if !shared.focused.load(Ordering::SeqCst) {
                    break;
                }
                // Detached so that a cancel never cuts a reset in half.
                let exec = executor.clone();
                let seq = keys.clone();
                match tokio::spawn(async move { exec.send_keys(&seq).await }).await {
                    Ok(Ok(())) => {
                        let n = shared.resets.fetch_add(1, Ordering::SeqCst) + 1;
                        debug!("composition reset #{}", n);
                    }
                    Ok(Err(e)) => warn!("composition reset failed: {}", e),
                    Err(e) => warn!("composition reset task failed: {}", e),
                }
                wait = idle;
            }
        });
        *timer = (KeepaliveState::Scheduled, Some(handle));
    }
}

impl Drop for ImeKeepalive {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = timer.1.take() {
            handle.abort();
        }
    }
}
