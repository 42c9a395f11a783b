//! Orchestration boundary: one message in, one report per target out.

mod executor;
mod plan;

pub use executor::{InputExecutor, TargetRun};
pub use plan::{sequence, Action, DispatchPlan, TargetPlan};

use crate::commit::commit_message;
use crate::config::{Channel, Config, TargetConfig};
use crate::dom::resolve;
use crate::geometry::{to_screen_point, ScreenPoint};
use crate::modal::dismiss_modal;
use crate::retry::RetryPolicy;
use crate::surface::{HostWindow, Screen, Surface};
use crate::{Error, FailureReason, Result};
use fanout_input::Point;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A message to broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    pub text: String,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Cancellation handle for a dispatch in progress.
///
/// Aborting stops targets that have not started; a target already handed to
/// the executor runs to completion.
#[derive(Debug, Clone, Default)]
pub struct DispatchControl {
    aborted: Arc<AtomicBool>,
}

impl DispatchControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

/// Outcome for one target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetReport {
    pub target: String,
    pub channel: Channel,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    /// Editor content read back after a script commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_text: Option<String>,
    /// Screen point clicked on the OS input channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<Point>,
}

impl TargetReport {
    fn failed(target: &TargetConfig, channel: Channel, reason: FailureReason) -> Self {
        Self {
            target: target.id.clone(),
            channel,
            success: false,
            reason: Some(reason),
            final_text: None,
            point: None,
        }
    }
}

/// Acknowledgment for one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    /// Every target took the message.
    pub success: bool,
    /// In configuration order.
    pub targets: Vec<TargetReport>,
}

impl DispatchReport {
    fn new(targets: Vec<TargetReport>) -> Self {
        Self {
            success: !targets.is_empty() && targets.iter().all(|t| t.success),
            targets,
        }
    }

    /// Report for a given target id.
    pub fn target(&self, id: &str) -> Option<&TargetReport> {
        self.targets.iter().find(|t| t.target == id)
    }
}

/// Builds an [`Engine`] from a config and its collaborators.
pub struct EngineBuilder {
    config: Config,
    surfaces: HashMap<String, Arc<dyn Surface>>,
    executor: Option<InputExecutor>,
    screen: Option<Arc<dyn Screen>>,
    host: Option<Arc<dyn HostWindow>>,
}

impl EngineBuilder {
    /// Surface for the target with the given id.
    pub fn surface(mut self, id: impl Into<String>, surface: Arc<dyn Surface>) -> Self {
        self.surfaces.insert(id.into(), surface);
        self
    }

    pub fn surfaces(mut self, surfaces: impl IntoIterator<Item = (String, Arc<dyn Surface>)>) -> Self {
        self.surfaces.extend(surfaces);
        self
    }

    pub fn executor(mut self, executor: InputExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn screen(mut self, screen: Arc<dyn Screen>) -> Self {
        self.screen = Some(screen);
        self
    }

    pub fn host(mut self, host: Arc<dyn HostWindow>) -> Self {
        self.host = Some(host);
        self
    }

    /// Every target needs a surface, and OS input targets need a screen.
    pub fn build(mut self) -> Result<Engine> {
        let mut targets = Vec::with_capacity(self.config.targets.len());
        for t in &self.config.targets {
            let surface = self
                .surfaces
                .remove(&t.id)
                .ok_or_else(|| Error::Config(format!("no surface for target '{}'", t.id)))?;
            targets.push(surface);
        }
        if !self.surfaces.is_empty() {
            let mut extra: Vec<_> = self.surfaces.keys().cloned().collect();
            extra.sort();
            return Err(Error::Config(format!(
                "surfaces given for unknown targets: {}",
                extra.join(", ")
            )));
        }
        let needs_screen = self
            .config
            .targets
            .iter()
            .any(|t| self.config.channel_for(t) == Channel::OsInput);
        if needs_screen && self.screen.is_none() {
            return Err(Error::Config(
                "os_input targets require a screen provider".into(),
            ));
        }
        Ok(Engine {
            config: self.config,
            surfaces: targets,
            executor: self.executor,
            screen: self.screen,
            host: self.host,
            watchers: Mutex::new(Vec::new()),
        })
    }
}

/// Delivers messages to every configured target.
///
/// Script targets commit concurrently, each inside its own page. OS input
/// targets resolve their click points concurrently, then run one after
/// another through the shared [`InputExecutor`]. A failure stays scoped to
/// its target.
pub struct Engine {
    config: Config,
    /// Parallel to `config.targets`.
    surfaces: Vec<Arc<dyn Surface>>,
    executor: Option<InputExecutor>,
    screen: Option<Arc<dyn Screen>>,
    host: Option<Arc<dyn HostWindow>>,
    watchers: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    pub fn builder(config: Config) -> EngineBuilder {
        EngineBuilder {
            config,
            surfaces: HashMap::new(),
            executor: None,
            screen: None,
            host: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn executor(&self) -> Option<&InputExecutor> {
        self.executor.as_ref()
    }

    /// Whether a dispatch drives the OS pointer and keyboard, moving focus
    /// into target pages.
    pub fn uses_os_input(&self) -> bool {
        self.config
            .targets
            .iter()
            .any(|t| self.config.channel_for(t) == Channel::OsInput)
    }

    /// Dispatch a message to all targets.
    pub async fn dispatch(&self, message: &Message) -> DispatchReport {
        self.dispatch_with(message, &DispatchControl::new()).await
    }

    /// Dispatch a message, honouring `control` between targets.
    pub async fn dispatch_with(&self, message: &Message, control: &DispatchControl) -> DispatchReport {
        let text = message.text.trim();
        if text.is_empty() {
            debug!("ignoring empty message");
            return DispatchReport::new(Vec::new());
        }
        info!(
            "Dispatching {} chars to {} targets",
            text.chars().count(),
            self.config.targets.len()
        );

        let (os, script): (Vec<usize>, Vec<usize>) = (0..self.config.targets.len())
            .partition(|&i| self.config.channel_for(&self.config.targets[i]) == Channel::OsInput);

        let script_run = join_all(script.iter().map(|&i| self.commit_target(i, text, control)));
        let (script_reports, os_reports) = tokio::join!(script_run, self.dispatch_os(&os, text, control));

        let mut slots: Vec<Option<TargetReport>> = vec![None; self.config.targets.len()];
        for (i, report) in script.into_iter().zip(script_reports) {
            slots[i] = Some(report);
        }
        for (i, report) in os_reports {
            slots[i] = Some(report);
        }
        let report = DispatchReport::new(slots.into_iter().flatten().collect());
        for t in report.targets.iter().filter(|t| !t.success) {
            if let Some(ref reason) = t.reason {
                warn!("{}: {}", t.target, reason);
            }
        }
        report
    }

    async fn commit_target(&self, i: usize, text: &str, control: &DispatchControl) -> TargetReport {
        let target = &self.config.targets[i];
        if control.is_aborted() {
            return TargetReport::failed(target, Channel::Script, FailureReason::Aborted);
        }
        let out = commit_message(self.surfaces[i].document(), target, text).await;
        TargetReport {
            target: target.id.clone(),
            channel: Channel::Script,
            success: out.success,
            reason: out.reason,
            final_text: out.success.then_some(out.final_text),
            point: None,
        }
    }

    async fn dispatch_os(
        &self,
        indices: &[usize],
        text: &str,
        control: &DispatchControl,
    ) -> Vec<(usize, TargetReport)> {
        if indices.is_empty() {
            return Vec::new();
        }
        let fail_all = |reason: FailureReason| -> Vec<(usize, TargetReport)> {
            indices
                .iter()
                .map(|&i| {
                    let t = &self.config.targets[i];
                    (i, TargetReport::failed(t, Channel::OsInput, reason.clone()))
                })
                .collect()
        };
        let Some(executor) = self.executor.as_ref() else {
            return fail_all(FailureReason::ExecutorUnavailable);
        };
        let Some(screen) = self.screen.as_deref() else {
            return fail_all(FailureReason::GeometryUnavailable);
        };

        if let Some(ref host) = self.host {
            prepare_host(host.as_ref()).await;
        }

        let points = join_all(indices.iter().map(|&i| self.locate(i, screen))).await;

        let mut reports = Vec::with_capacity(indices.len());
        let mut plan = DispatchPlan::new();
        let mut planned = HashMap::new();
        for (&i, point) in indices.iter().zip(points) {
            let target = &self.config.targets[i];
            match point {
                Ok(p) => {
                    let point = p.to_point();
                    debug!("{}: click point {} (scale {})", target.id, point, p.scale);
                    plan.push(
                        &target.id,
                        sequence(point, text, &target.pre_focus_keys(), &target.submit_keys),
                    );
                    planned.insert(target.id.as_str(), (i, point));
                }
                Err(reason) => reports.push((i, TargetReport::failed(target, Channel::OsInput, reason))),
            }
        }
        if plan.is_empty() {
            return reports;
        }

        for run in executor.run_plan(plan, control).await {
            let Some(&(i, point)) = planned.get(run.target.as_str()) else {
                continue;
            };
            reports.push((
                i,
                TargetReport {
                    target: run.target,
                    channel: Channel::OsInput,
                    success: run.failure.is_none(),
                    reason: run.failure,
                    final_text: None,
                    point: Some(point),
                },
            ));
        }
        reports
    }

    /// Screen point of a target's editor.
    ///
    /// An exhausted selector chain is [`FailureReason::ElementNotFound`]; any
    /// other missing piece of geometry is [`FailureReason::GeometryUnavailable`].
    async fn locate(&self, i: usize, screen: &dyn Screen) -> std::result::Result<ScreenPoint, FailureReason> {
        let target = &self.config.targets[i];
        let surface = &self.surfaces[i];

        let doc = surface.document();
        let selectors = target.click_selectors();
        let Some(element) = RetryPolicy::from(&target.retry)
            .run(move || resolve(selectors, doc))
            .await
        else {
            warn!("{}: editor not found after {} attempts", target.id, target.retry.attempts);
            return Err(FailureReason::ElementNotFound);
        };

        let geometry = async {
            let bounds = surface.bounds().await?;
            let scale = screen.scale_factor_nearest(bounds.left, bounds.top).await?;
            let chrome = screen.chrome_height().await?;
            Result::Ok((bounds, scale, chrome))
        }
        .await;
        let (bounds, scale, chrome) = geometry.map_err(|e| {
            warn!("{}: geometry unavailable: {}", target.id, e);
            FailureReason::GeometryUnavailable
        })?;

        to_screen_point(bounds, element.rect, scale, chrome, target.bias).ok_or_else(|| {
            warn!("{}: editor has no usable rectangle", target.id);
            FailureReason::GeometryUnavailable
        })
    }

    /// Start one bounded modal watcher per target with a `dismiss` block.
    pub fn start_modal_watchers(&self) {
        let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        for (target, surface) in self.config.targets.iter().zip(&self.surfaces) {
            let Some(dismiss) = target.dismiss.clone() else {
                continue;
            };
            let surface = surface.clone();
            let id = target.id.clone();
            watchers.push(tokio::spawn(async move {
                if dismiss_modal(surface.document(), &dismiss).await {
                    info!("{}: modal dismissed", id);
                } else {
                    debug!("{}: no modal appeared", id);
                }
            }));
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let watchers = self.watchers.get_mut().unwrap_or_else(|e| e.into_inner());
        for handle in watchers.drain(..) {
            handle.abort();
        }
    }
}

async fn prepare_host(host: &dyn HostWindow) {
    match host.is_minimized().await {
        Ok(true) => {
            if let Err(e) = host.restore().await {
                warn!("Failed to restore host window: {}", e);
            }
        }
        Ok(false) => {}
        Err(e) => warn!("Could not query host window: {}", e),
    }
    if let Err(e) = host.focus().await {
        warn!("Failed to focus host window: {}", e);
    }
}
