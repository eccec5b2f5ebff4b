//! Lifecycle controller of the localization microscopy menu plugin
//!
//! The controller decides when the analysis window is created, reused, shown
//! and torn down. Any number of controllers may exist; they share a
//! [`WindowSlot`] so that at most one window is alive at a time. Each
//! controller subscribes to the host's shutdown notification when it receives
//! its context and unsubscribes again when disposed.

use async_trait::async_trait;
use spotfit_core::{
    EventBus, EventSubscriber, HostEvent, HostEventHandler, HostEventKind, KindFilter,
    MenuRegistrable, PluginContext, Result, Runnable, ShutdownCommencing, SubscriptionId,
};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;

use crate::headless::HeadlessWindow;
use crate::metadata;
use crate::slot::{OwnerClaim, OwnerId, WindowSlot};
use crate::window::{WindowFactory, WindowState};

/// Menu plugin that owns the spot-fitting analysis window
#[derive(Clone)]
pub struct LocalizationPlugin {
    inner: Arc<ControllerState>,
}

struct ControllerState {
    claim: Arc<OwnerClaim>,
    slot: Arc<WindowSlot>,
    factory: WindowFactory,
    subscription: Mutex<Option<Registration>>,
}

/// Where the shutdown handler is registered; the bus is only weakly held
struct Registration {
    bus: Weak<dyn EventBus>,
    id: SubscriptionId,
}

impl LocalizationPlugin {
    /// Create a controller sharing the process-wide window slot
    pub fn new(factory: WindowFactory) -> Self {
        Self::with_slot(factory, WindowSlot::global())
    }

    /// Create a controller on an explicit slot
    pub fn with_slot(factory: WindowFactory, slot: Arc<WindowSlot>) -> Self {
        Self {
            inner: Arc::new(ControllerState {
                claim: OwnerClaim::new(),
                slot,
                factory,
                subscription: Mutex::new(None),
            }),
        }
    }

    /// Controller presenting a [`HeadlessWindow`]
    pub fn headless() -> Self {
        Self::new(HeadlessWindow::factory())
    }

    pub fn id(&self) -> OwnerId {
        self.inner.claim.id()
    }

    /// Whether this controller currently owns the open window
    pub async fn window_state(&self) -> WindowState {
        self.inner.window_state().await
    }

    /// Whether a shutdown handler is currently registered
    pub async fn is_subscribed(&self) -> bool {
        self.inner.subscription.lock().await.is_some()
    }

    /// Shutdown notification handler; same effect as [`EventSubscriber::dispose`]
    pub async fn close_requested(&self, event: &ShutdownCommencing) -> Result<()> {
        self.inner.close_requested(event).await
    }
}

impl ControllerState {
    async fn present(&self, argument: &str) -> Result<()> {
        tracing::debug!("Presenting analysis window (argument: {:?})", argument);

        let acquired = self.slot.present(&self.claim, &self.factory).await?;
        if acquired.created {
            tracing::info!("{} window opened", metadata::MENU_NAME);
        } else {
            tracing::debug!("{} window re-presented", metadata::MENU_NAME);
        }
        Ok(())
    }

    async fn window_state(&self) -> WindowState {
        if self.slot.owner().await == Some(self.claim.id()) {
            WindowState::WindowOpen
        } else {
            WindowState::NoWindow
        }
    }

    async fn subscribe(self: &Arc<Self>, context: &PluginContext) -> Result<()> {
        let mut subscription = self.subscription.lock().await;

        if let Some(previous) = subscription.take() {
            tracing::warn!("Context set again, replacing previous shutdown subscription");
            unregister(previous).await;
        }

        let listener = Arc::new(ShutdownListener {
            controller: Arc::downgrade(self),
        });
        let id = context
            .event_bus
            .subscribe(
                listener,
                Some(Box::new(KindFilter(HostEventKind::ShutdownCommencing))),
            )
            .await?;

        tracing::debug!("Subscribed to shutdown notifications: {:?}", id);
        *subscription = Some(Registration {
            bus: Arc::downgrade(&context.event_bus),
            id,
        });
        Ok(())
    }

    async fn dispose(&self) {
        if self.slot.release(self.claim.id()).await {
            tracing::info!("{} window disposed", metadata::MENU_NAME);
        } else {
            tracing::debug!("No owned window to dispose");
        }

        let registration = self.subscription.lock().await.take();
        if let Some(registration) = registration {
            unregister(registration).await;
        }
    }

    async fn close_requested(&self, event: &ShutdownCommencing) -> Result<()> {
        tracing::info!("Host shutdown commencing ({}), disposing", event.reason);
        self.dispose().await;
        Ok(())
    }
}

async fn unregister(registration: Registration) {
    match registration.bus.upgrade() {
        Some(bus) => {
            if let Err(e) = bus.unsubscribe(registration.id).await {
                tracing::warn!("Failed to unsubscribe shutdown handler: {}", e);
            }
        }
        None => tracing::debug!("Event bus already dropped, nothing to unsubscribe"),
    }
}

/// Bus-side handle forwarding shutdown notifications to its controller
struct ShutdownListener {
    controller: Weak<ControllerState>,
}

#[async_trait]
impl HostEventHandler for ShutdownListener {
    async fn handle_host_event(&self, event: &HostEvent) -> Result<()> {
        let HostEvent::ShutdownCommencing(shutdown) = event else {
            return Ok(());
        };

        match self.controller.upgrade() {
            Some(controller) => controller.close_requested(shutdown).await,
            None => Ok(()),
        }
    }

    fn handler_name(&self) -> &str {
        "localization-shutdown-listener"
    }
}

#[async_trait]
impl Runnable for LocalizationPlugin {
    async fn run(&self, argument: &str) -> Result<()> {
        self.inner.present(argument).await
    }
}

#[async_trait]
impl MenuRegistrable for LocalizationPlugin {
    fn name(&self) -> &str {
        metadata::MENU_NAME
    }

    fn sub_menu(&self) -> &str {
        metadata::SUB_MENU
    }

    fn help_text(&self) -> &str {
        metadata::HELP_TEXT
    }

    fn version(&self) -> &str {
        metadata::VERSION
    }

    fn copyright(&self) -> &str {
        metadata::COPYRIGHT
    }

    fn tooltip(&self) -> Option<&str> {
        Some(metadata::TOOLTIP_DESCRIPTION)
    }

    async fn on_plugin_selected(&self) -> Result<()> {
        self.run("").await
    }
}

#[async_trait]
impl EventSubscriber for LocalizationPlugin {
    async fn set_context(&self, context: &PluginContext) -> Result<()> {
        self.inner.subscribe(context).await
    }

    async fn dispose(&self) -> Result<()> {
        self.inner.dispose().await;
        Ok(())
    }
}
