//! Process-wide slot holding the one analysis window
//!
//! The slot is the single source of truth for "is a window open". Every
//! transition (construct, present, release) happens while holding its lock,
//! so a shutdown arriving on another thread can never observe a window that
//! is half constructed or tear down a window a concurrent `present` is still
//! showing.

use spotfit_core::{Result, SpotfitError};
use std::sync::{Arc, OnceLock, Weak};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::window::{AnalysisWindow, WindowFactory};

/// Identity of a plugin instance claiming the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(pub Uuid);

impl OwnerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

/// A plugin instance's standing claim on the slot
///
/// The slot only keeps claims weakly. Once every strong reference to the
/// claim is gone, the window it owned is adopted by the next instance that
/// acquires it.
#[derive(Debug)]
pub struct OwnerClaim {
    id: OwnerId,
}

impl OwnerClaim {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { id: OwnerId::new() })
    }

    pub fn id(&self) -> OwnerId {
        self.id
    }
}

/// Result of acquiring the slot
pub struct Acquired {
    pub window: Arc<dyn AnalysisWindow>,
    /// False when an existing window was reused
    pub created: bool,
}

struct SlotEntry {
    window: Arc<dyn AnalysisWindow>,
    owner: Weak<OwnerClaim>,
}

impl SlotEntry {
    fn owner_id(&self) -> Option<OwnerId> {
        self.owner.upgrade().map(|claim| claim.id)
    }
}

/// Guarded optional window shared by every plugin instance
pub struct WindowSlot {
    entry: Mutex<Option<SlotEntry>>,
}

impl WindowSlot {
    pub fn new() -> Self {
        Self {
            entry: Mutex::new(None),
        }
    }

    /// The slot shared by the whole process
    pub fn global() -> Arc<WindowSlot> {
        static GLOBAL: OnceLock<Arc<WindowSlot>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(WindowSlot::new())).clone()
    }

    /// Reuse the live window, or build one and record `owner` as its owner
    ///
    /// A live window whose owner has been dropped is adopted by `owner`.
    pub async fn try_acquire_or_reuse(
        &self,
        owner: &Arc<OwnerClaim>,
        factory: &WindowFactory,
    ) -> Result<Acquired> {
        let mut entry = self.entry.lock().await;
        acquire_locked(&mut entry, owner, factory)
    }

    /// Acquire the window and bring it up: visible, notified, in front
    ///
    /// If presenting a freshly built window fails, that window is disposed
    /// and the slot is left empty before the error is returned.
    pub async fn present(
        &self,
        owner: &Arc<OwnerClaim>,
        factory: &WindowFactory,
    ) -> Result<Acquired> {
        let mut entry = self.entry.lock().await;
        let acquired = acquire_locked(&mut entry, owner, factory)?;

        let shown = acquired
            .window
            .set_visible(true)
            .and_then(|_| acquired.window.window_opened())
            .and_then(|_| acquired.window.to_front());

        if let Err(e) = shown {
            if acquired.created {
                tracing::warn!("Presenting new analysis window failed, disposing it: {}", e);
                acquired.window.dispose();
                *entry = None;
            }
            return Err(e);
        }

        Ok(acquired)
    }

    /// Dispose and clear the window if `owner` holds it
    ///
    /// Returns whether a window was released. Releasing an empty slot, or a
    /// slot held by someone else, does nothing.
    pub async fn release(&self, owner: OwnerId) -> bool {
        let mut entry = self.entry.lock().await;
        discard_stale(&mut entry);
        match entry.as_ref() {
            Some(current) if current.owner_id() == Some(owner) => {}
            _ => return false,
        }

        if let Some(released) = entry.take() {
            released.window.dispose();
            tracing::info!("Analysis window released by {:?}", owner);
        }
        true
    }

    /// True while a live window is held
    pub async fn is_open(&self) -> bool {
        let mut entry = self.entry.lock().await;
        discard_stale(&mut entry);
        entry.is_some()
    }

    /// Owner of the live window; `None` when empty or the owner was dropped
    pub async fn owner(&self) -> Option<OwnerId> {
        let mut entry = self.entry.lock().await;
        discard_stale(&mut entry);
        entry.as_ref().and_then(SlotEntry::owner_id)
    }

    pub async fn current(&self) -> Option<Arc<dyn AnalysisWindow>> {
        let mut entry = self.entry.lock().await;
        discard_stale(&mut entry);
        entry.as_ref().map(|current| current.window.clone())
    }
}

impl Default for WindowSlot {
    fn default() -> Self {
        Self::new()
    }
}

fn acquire_locked(
    entry: &mut Option<SlotEntry>,
    owner: &Arc<OwnerClaim>,
    factory: &WindowFactory,
) -> Result<Acquired> {
    discard_stale(entry);

    if let Some(current) = entry.as_mut() {
        if current.owner.strong_count() == 0 {
            tracing::info!(
                "Analysis window adopted by {:?} after its owner was dropped",
                owner.id
            );
            current.owner = Arc::downgrade(owner);
        }
        return Ok(Acquired {
            window: current.window.clone(),
            created: false,
        });
    }

    let window = factory()?;
    if window.is_disposed() {
        return Err(SpotfitError::window(
            "window factory returned a disposed window",
        ));
    }

    tracing::info!("Constructed analysis window for {:?}", owner.id);
    *entry = Some(SlotEntry {
        window: window.clone(),
        owner: Arc::downgrade(owner),
    });

    Ok(Acquired {
        window,
        created: true,
    })
}

// A window the user closed directly is disposed without going through the
// slot; forget it so the next acquire builds a fresh one.
fn discard_stale(entry: &mut Option<SlotEntry>) {
    let stale = entry
        .as_ref()
        .map(|current| current.window.is_disposed())
        .unwrap_or(false);
    if stale {
        tracing::debug!("Discarding analysis window that was closed outside the plugin");
        *entry = None;
    }
}
