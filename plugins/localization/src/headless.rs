//! Analysis window stand-in for hosts without a display

use spotfit_core::{Result, SpotfitError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::window::{AnalysisWindow, WindowFactory};

/// Window that only tracks its state and logs transitions
#[derive(Debug)]
pub struct HeadlessWindow {
    id: Uuid,
    visible: AtomicBool,
    disposed: AtomicBool,
    times_opened: AtomicU64,
}

impl HeadlessWindow {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            visible: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            times_opened: AtomicU64::new(0),
        }
    }

    /// Factory building a fresh headless window per call
    pub fn factory() -> WindowFactory {
        Arc::new(|| Ok(Arc::new(HeadlessWindow::new()) as Arc<dyn AnalysisWindow>))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn times_opened(&self) -> u64 {
        self.times_opened.load(Ordering::SeqCst)
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(SpotfitError::window(format!(
                "headless window {} has been disposed",
                self.id
            )));
        }
        Ok(())
    }
}

impl Default for HeadlessWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisWindow for HeadlessWindow {
    fn set_visible(&self, visible: bool) -> Result<()> {
        self.ensure_alive()?;
        if self.visible.swap(visible, Ordering::SeqCst) != visible {
            tracing::info!("Headless window {} visible: {}", self.id, visible);
        }
        Ok(())
    }

    fn window_opened(&self) -> Result<()> {
        self.ensure_alive()?;
        let count = self.times_opened.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!("Headless window {} opened ({} times)", self.id, count);
        Ok(())
    }

    fn to_front(&self) -> Result<()> {
        self.ensure_alive()?;
        tracing::debug!("Headless window {} raised", self.id);
        Ok(())
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.visible.store(false, Ordering::SeqCst);
            tracing::info!("Headless window {} disposed", self.id);
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}
