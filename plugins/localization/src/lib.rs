//! Localization microscopy plugin for spotfit
//!
//! Presents the Gaussian spot-fitting tool as a menu command and manages the
//! single analysis window hosting it.

pub mod controller;
pub mod headless;
pub mod metadata;
pub mod slot;
pub mod window;



#[cfg(test)]
mod test_support;

pub use controller::LocalizationPlugin;
pub use headless::HeadlessWindow;
pub use slot::{Acquired, OwnerClaim, OwnerId, WindowSlot};
pub use window::{AnalysisWindow, WindowFactory, WindowState};
