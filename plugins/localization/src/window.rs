//! Contract between the plugin and the analysis window it hosts
//!
//! The window itself (spot detection, Gaussian fitting, result tables) is
//! provided by the embedding application. The plugin only needs to create it,
//! present it and tear it down.

use spotfit_core::Result;
use std::sync::Arc;

/// The window hosting the spot-fitting tool
///
/// Implementations must tolerate calls on an already disposed instance:
/// `dispose` in particular may be called more than once.
pub trait AnalysisWindow: Send + Sync {
    fn set_visible(&self, visible: bool) -> Result<()>;

    /// Tells the window it has just been opened so it can refresh its state
    fn window_opened(&self) -> Result<()>;

    /// Raise the window above all others
    fn to_front(&self) -> Result<()>;

    /// Release all resources held by the window
    fn dispose(&self);

    /// True once the window has been disposed, including by the user closing it
    fn is_disposed(&self) -> bool;
}

/// Builds a new analysis window; takes no arguments
pub type WindowFactory = Arc<dyn Fn() -> Result<Arc<dyn AnalysisWindow>> + Send + Sync>;

/// Window state as seen by one plugin instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    NoWindow,
    WindowOpen,
}

impl std::fmt::Display for WindowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowState::NoWindow => write!(f, "no window"),
            WindowState::WindowOpen => write!(f, "window open"),
        }
    }
}
