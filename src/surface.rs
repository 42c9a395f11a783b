//! Collaborators owned by the host application: target surfaces, the host
//! window and the display it sits on.

use crate::dom::Document;
use crate::geometry::Rect;
use crate::Result;
use async_trait::async_trait;

/// A renderable container hosting one target's page.
#[async_trait]
pub trait Surface: Send + Sync {
    /// Bounding rectangle of the surface.
    async fn bounds(&self) -> Result<Rect>;

    /// The surface's content context.
    fn document(&self) -> &dyn Document;
}

/// The application window the surfaces live in.
#[async_trait]
pub trait HostWindow: Send + Sync {
    async fn is_minimized(&self) -> Result<bool>;
    async fn restore(&self) -> Result<()>;
    async fn focus(&self) -> Result<()>;
}

/// Display geometry around the host window.
#[async_trait]
pub trait Screen: Send + Sync {
    /// Scale factor of the display nearest to a point.
    async fn scale_factor_nearest(&self, x: f64, y: f64) -> Result<f64>;

    /// Height of the window decorations above the content area.
    async fn chrome_height(&self) -> Result<f64>;
}
