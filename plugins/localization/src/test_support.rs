//! Recording window doubles shared by the unit tests

use spotfit_core::{Result, SpotfitError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::window::{AnalysisWindow, WindowFactory};

#[derive(Default)]
pub struct RecordingWindow {
    visible: AtomicBool,
    disposed: AtomicBool,
    opened: AtomicUsize,
    raised: AtomicUsize,
    dispose_calls: AtomicUsize,
    fail_show: bool,
}

impl RecordingWindow {
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn raised(&self) -> usize {
        self.raised.load(Ordering::SeqCst)
    }

    pub fn dispose_calls(&self) -> usize {
        self.dispose_calls.load(Ordering::SeqCst)
    }

    /// Simulates the user closing the window from its title bar
    pub fn close_by_user(&self) {
        self.dispose();
    }

    fn alive(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(SpotfitError::window("window already disposed"));
        }
        Ok(())
    }
}

impl AnalysisWindow for RecordingWindow {
    fn set_visible(&self, visible: bool) -> Result<()> {
        self.alive()?;
        if self.fail_show {
            return Err(SpotfitError::window("no display"));
        }
        self.visible.store(visible, Ordering::SeqCst);
        Ok(())
    }

    fn window_opened(&self) -> Result<()> {
        self.alive()?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn to_front(&self) -> Result<()> {
        self.alive()?;
        self.raised.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn dispose(&self) {
        self.dispose_calls.fetch_add(1, Ordering::SeqCst);
        self.disposed.store(true, Ordering::SeqCst);
        self.visible.store(false, Ordering::SeqCst);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// Builds recording windows and keeps every one it built
#[derive(Default)]
pub struct Recorder {
    windows: Mutex<Vec<Arc<RecordingWindow>>>,
    fail_show: bool,
    fail_build: bool,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_show() -> Arc<Self> {
        Arc::new(Self {
            fail_show: true,
            ..Self::default()
        })
    }

    pub fn failing_build() -> Arc<Self> {
        Arc::new(Self {
            fail_build: true,
            ..Self::default()
        })
    }

    pub fn factory(self: &Arc<Self>) -> WindowFactory {
        let recorder = self.clone();
        Arc::new(move || {
            if recorder.fail_build {
                return Err(SpotfitError::window("display unavailable"));
            }
            let window = Arc::new(RecordingWindow {
                fail_show: recorder.fail_show,
                ..RecordingWindow::default()
            });
            recorder.windows.lock().unwrap().push(window.clone());
            Ok(window as Arc<dyn AnalysisWindow>)
        })
    }

    pub fn built(&self) -> usize {
        self.windows.lock().unwrap().len()
    }

    pub fn window(&self, index: usize) -> Arc<RecordingWindow> {
        self.windows.lock().unwrap()[index].clone()
    }

    pub fn live(&self) -> Vec<Arc<RecordingWindow>> {
        self.windows
            .lock()
            .unwrap()
            .iter()
            .filter(|w| !w.is_disposed())
            .cloned()
            .collect()
    }
}

pub fn same_window(a: &Arc<dyn AnalysisWindow>, b: &Arc<RecordingWindow>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
