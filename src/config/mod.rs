mod schema;
mod target;

pub use schema::{
    BrowserConfig, Channel, Config, DispatchConfig, KeepaliveConfig, Viewport,
};
pub use target::{Bias, DismissConfig, InputKind, PreFocus, RetryConfig, Selectors, TargetConfig};
