use super::plan::{Action, DispatchPlan, TargetPlan};
use super::DispatchControl;
use crate::config::DispatchConfig;
use crate::FailureReason;
use fanout_input::{Clipboard, InputBackend, KeySequence};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct Devices {
    input: Arc<dyn InputBackend>,
    clipboard: Arc<dyn Clipboard>,
}

/// The one shared OS input device set.
///
/// Clones share the same lock: a plan holds it from its first action until
/// the pointer is restored, so primitives from different plans or from the
/// keepalive timer never interleave.
#[derive(Clone)]
pub struct InputExecutor {
    devices: Arc<Mutex<Devices>>,
    config: DispatchConfig,
}

/// How far one target's actions got.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRun {
    pub target: String,
    pub actions_run: usize,
    pub failure: Option<FailureReason>,
}

impl InputExecutor {
    pub fn new(
        input: Arc<dyn InputBackend>,
        clipboard: Arc<dyn Clipboard>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            devices: Arc::new(Mutex::new(Devices { input, clipboard })),
            config,
        }
    }

    /// Executor over the native pointer, keyboard and clipboard.
    #[cfg(feature = "os-input")]
    pub fn native(config: DispatchConfig) -> crate::Result<Self> {
        let native = Arc::new(fanout_input::NativeInput::spawn()?);
        Ok(Self::new(native.clone(), native, config))
    }

    /// Run every target's actions in plan order, consuming the plan.
    ///
    /// A failed action ends its own target only. Targets not yet started when
    /// `control` is aborted are reported as [`FailureReason::Aborted`].
    pub async fn run_plan(&self, plan: DispatchPlan, control: &DispatchControl) -> Vec<TargetRun> {
        let devices = self.devices.lock().await;

        let origin = if self.config.restore_pointer {
            match devices.input.pointer_position().await {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("Could not read pointer position: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let mut runs = Vec::with_capacity(plan.len());
        let mut touched = false;
        for tp in plan.targets() {
            if control.is_aborted() {
                info!("{}: dispatch aborted before start", tp.target);
                runs.push(TargetRun {
                    target: tp.target.clone(),
                    actions_run: 0,
                    failure: Some(FailureReason::Aborted),
                });
                continue;
            }
            touched = true;
            runs.push(self.run_target(&devices, tp).await);
        }

        if let (Some(p), true) = (origin, touched) {
            debug!("restoring pointer to {}", p);
            if let Err(e) = self.execute(&devices, &Action::Move(p)).await {
                warn!("Failed to restore pointer: {}", e);
            }
        }
        runs
    }

    /// Send keys outside of a plan, e.g. a composition reset.
    pub async fn send_keys(&self, keys: &KeySequence) -> fanout_input::Result<()> {
        let devices = self.devices.lock().await;
        devices.input.send_keys(keys).await?;
        tokio::time::sleep(self.config.action_delay()).await;
        Ok(())
    }

    async fn run_target(&self, devices: &Devices, tp: &TargetPlan) -> TargetRun {
        let mut run = TargetRun {
            target: tp.target.clone(),
            actions_run: 0,
            failure: None,
        };
        for (i, action) in tp.actions.iter().enumerate() {
            debug!("{}: action {}: {}", tp.target, i + 1, action.name());
            if let Err(e) = self.execute(devices, action).await {
                warn!("{}: {} failed: {}", tp.target, action.name(), e);
                run.failure = Some(FailureReason::Execution(e.to_string()));
                return run;
            }
            run.actions_run += 1;
        }
        info!("{}: {} actions sent", tp.target, run.actions_run);
        run
    }

    async fn execute(&self, devices: &Devices, action: &Action) -> fanout_input::Result<()> {
        match action {
            Action::Move(p) => devices.input.move_pointer(*p).await?,
            Action::Click(p) => {
                devices.input.move_pointer(*p).await?;
                devices.input.click().await?;
            }
            Action::PasteText(text) => {
                devices.clipboard.write_text(text).await?;
                tokio::time::sleep(self.config.paste_settle()).await;
                devices.input.send_keys(&self.config.paste_keys).await?;
            }
            Action::SendKeys(keys) => devices.input.send_keys(keys).await?,
            Action::Wait(d) => tokio::time::sleep(*d).await,
        }
        tokio::time::sleep(self.config.action_delay()).await;
        Ok(())
    }
}
