//! Browser-backed surfaces: one CDP page per target.

use crate::config::{BrowserConfig, TargetConfig};
use crate::dom::{Document, ScriptContext, ScriptDocument};
use crate::geometry::Rect;
use crate::surface::{HostWindow, Screen, Surface};
use crate::{Error, Result};
use async_trait::async_trait;
use eoka::{Browser, Page};
use std::sync::Arc;
use tracing::{debug, info};

/// Surface bounds in screen coordinates plus viewport size.
const BOUNDS_JS: &str = r#"JSON.stringify({
    left: window.screenX,
    top: window.screenY,
    width: window.innerWidth,
    height: window.innerHeight
})"#;

/// Script evaluation on a CDP page.
#[derive(Clone)]
pub struct PageContext {
    page: Arc<Page>,
}

impl PageContext {
    pub fn new(page: Arc<Page>) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }
}

#[async_trait]
impl ScriptContext for PageContext {
    async fn eval_string(&self, script: &str) -> Result<String> {
        Ok(self.page.evaluate::<String>(script).await?)
    }
}

/// One target's page.
pub struct BrowserSurface {
    id: String,
    doc: ScriptDocument<PageContext>,
}

impl BrowserSurface {
    pub fn new(id: impl Into<String>, page: Arc<Page>) -> Self {
        Self {
            id: id.into(),
            doc: ScriptDocument::new(PageContext::new(page)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn page(&self) -> &Page {
        self.doc.context().page()
    }
}

#[async_trait]
impl Surface for BrowserSurface {
    async fn bounds(&self) -> Result<Rect> {
        let raw = self.doc.context().eval_string(BOUNDS_JS).await?;
        let rect: Rect = serde_json::from_str(&raw)?;
        debug!("{}: bounds {:?}", self.id, rect);
        Ok(rect)
    }

    fn document(&self) -> &dyn Document {
        &self.doc
    }
}

/// Host window and display queries answered by one of the pages.
pub struct BrowserHost {
    page: Arc<Page>,
}

impl BrowserHost {
    pub fn new(page: Arc<Page>) -> Self {
        Self { page }
    }
}

#[async_trait]
impl Screen for BrowserHost {
    async fn scale_factor_nearest(&self, _x: f64, _y: f64) -> Result<f64> {
        let ratio: f64 = self.page.evaluate("window.devicePixelRatio || 1").await?;
        Ok(ratio)
    }

    async fn chrome_height(&self) -> Result<f64> {
        let h: f64 = self
            .page
            .evaluate("Math.max(0, window.outerHeight - window.innerHeight)")
            .await?;
        Ok(h)
    }
}

#[async_trait]
impl HostWindow for BrowserHost {
    async fn is_minimized(&self) -> Result<bool> {
        let hidden: bool = self
            .page
            .evaluate("document.visibilityState === 'hidden'")
            .await?;
        Ok(hidden)
    }

    async fn restore(&self) -> Result<()> {
        self.focus().await
    }

    async fn focus(&self) -> Result<()> {
        self.page.execute("window.focus()").await?;
        Ok(())
    }
}

/// A launched browser with one page per target.
pub struct BrowserSession {
    browser: Browser,
    surfaces: Vec<Arc<BrowserSurface>>,
    host: Arc<BrowserHost>,
}

impl BrowserSession {
    /// Surfaces keyed by target id, for [`crate::EngineBuilder::surfaces`].
    pub fn surfaces(&self) -> Vec<(String, Arc<dyn Surface>)> {
        self.surfaces
            .iter()
            .map(|s| (s.id().to_string(), s.clone() as Arc<dyn Surface>))
            .collect()
    }

    pub fn host(&self) -> Arc<BrowserHost> {
        self.host.clone()
    }

    /// Close the browser.
    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}

/// Launch a browser and open every target's page.
pub async fn launch(config: &BrowserConfig, targets: &[TargetConfig]) -> Result<BrowserSession> {
    if targets.is_empty() {
        return Err(Error::Config("no targets to open".into()));
    }

    let stealth = eoka::StealthConfig {
        headless: config.headless,
        proxy: config.proxy.clone(),
        user_agent: config.user_agent.clone(),
        viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
        viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(720),
        ..Default::default()
    };

    debug!(
        "Launching browser (headless: {}, proxy: {:?})",
        config.headless, config.proxy
    );
    let browser = Browser::launch_with_config(stealth).await?;

    let mut surfaces = Vec::with_capacity(targets.len());
    for target in targets {
        info!("{}: opening {}", target.id, target.url);
        let page = Arc::new(browser.new_page(&target.url).await?);
        surfaces.push(Arc::new(BrowserSurface::new(&target.id, page)));
    }

    let host = Arc::new(BrowserHost::new(surfaces[0].doc.context().page.clone()));
    Ok(BrowserSession {
        browser,
        surfaces,
        host,
    })
}
