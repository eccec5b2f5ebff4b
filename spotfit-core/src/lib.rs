//! Spotfit Core - host contract for localization microscopy menu plugins
//!
//! This crate provides the capability traits a menu plugin implements, the
//! host event channel plugins subscribe to, and a small host engine that
//! registers plugins, forwards menu selections and sequences shutdown.

pub mod config;
pub mod error;
pub mod event;
pub mod plugin;


#[cfg(test)]
mod plugin_test;

// Re-export commonly used types
pub use config::{Config, PluginConfig};
pub use error::{ErrorSeverity, Result, SpotfitError};
pub use event::{
    Event, EventBus, EventFilter, HostEvent, HostEventHandler, HostEventKind, InMemoryEventBus,
    KindFilter, ShutdownCommencing, SubscriptionId,
};
pub use plugin::{
    EventSubscriber, MenuEntry, MenuPlugin, MenuRegistrable, PluginContext, PluginInfo,
    PluginRegistry, PluginStatus, Runnable,
};

use std::sync::{Arc, Mutex};
use tokio::signal;
use tokio::sync::oneshot;

/// Cloneable handle that asks a running [`Host`] to shut down
#[derive(Clone)]
pub struct ShutdownHandle {
    sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl ShutdownHandle {
    /// Request shutdown; a request made before the host starts waiting is kept
    pub fn request(&self) {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(sender) => {
                let _ = sender.send(());
            }
            None => tracing::debug!("Shutdown already requested"),
        }
    }
}

/// Host engine that owns the event channel and the plugin registry
pub struct Host {
    event_bus: Arc<dyn EventBus>,
    plugin_registry: PluginRegistry,
    config: Arc<Config>,
    shutdown_signal: Arc<Mutex<Option<oneshot::Sender<()>>>>,
    shutdown_rx: Option<oneshot::Receiver<()>>,
}

impl Host {
    /// Create a new host with an in-memory event channel
    pub fn new(config: Config) -> Result<Self> {
        Self::with_event_bus(config, Arc::new(InMemoryEventBus::new()))
    }

    /// Create a new host on top of an existing event channel
    pub fn with_event_bus(config: Config, event_bus: Arc<dyn EventBus>) -> Result<Self> {
        config.validate()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        Ok(Self {
            event_bus,
            plugin_registry: PluginRegistry::new(),
            config: Arc::new(config),
            shutdown_signal: Arc::new(Mutex::new(Some(shutdown_tx))),
            shutdown_rx: Some(shutdown_rx),
        })
    }

    /// Get the plugin context handed to plugins at registration
    pub fn create_plugin_context(&self) -> PluginContext {
        PluginContext::new(self.event_bus.clone(), self.config.clone())
    }

    /// Register a plugin unless the configuration disables it
    ///
    /// Returns `false` when the plugin was skipped.
    pub async fn register_plugin(&mut self, plugin: Arc<dyn MenuPlugin>) -> Result<bool> {
        if !self.config.is_plugin_enabled(plugin.name()) {
            tracing::info!("Plugin {} is disabled in configuration", plugin.name());
            return Ok(false);
        }

        let context = self.create_plugin_context();
        self.plugin_registry.register_plugin(plugin, &context).await?;
        Ok(true)
    }

    /// Forward a menu selection to a plugin
    pub async fn select_menu_item(&mut self, name: &str) -> Result<()> {
        tracing::debug!("Menu item selected: {}", name);
        self.plugin_registry.select(name).await
    }

    /// Run a plugin directly with an argument
    pub async fn run_command(&mut self, name: &str, argument: &str) -> Result<()> {
        tracing::debug!("Running {} with argument {:?}", name, argument);
        self.plugin_registry.run(name, argument).await
    }

    /// Unload a single plugin while the host keeps running
    pub async fn unload_plugin(&mut self, name: &str) -> Result<()> {
        self.plugin_registry.unregister_plugin(name).await
    }

    /// Menu entries of all registered plugins
    pub fn menu_entries(&self) -> Vec<MenuEntry> {
        self.plugin_registry.menu_entries()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            sender: self.shutdown_signal.clone(),
        }
    }

    /// Wait for Ctrl+C, SIGTERM or a [`ShutdownHandle`] request, then shut down
    pub async fn run_until_shutdown(&mut self) -> Result<()> {
        tracing::info!("Host running, waiting for shutdown");

        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let shutdown_rx = self.shutdown_rx.take();
        let requested = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C signal");
            }
            _ = terminate => {
                tracing::info!("Received terminate signal");
            }
            _ = requested => {
                tracing::info!("Shutdown requested programmatically");
            }
        }

        self.shutdown("host terminating").await
    }

    /// Broadcast the shutdown notification, then dispose every plugin
    pub async fn shutdown(&mut self, reason: &str) -> Result<()> {
        tracing::info!("Shutting down host: {}", reason);

        if let Err(e) = self
            .event_bus
            .publish(HostEvent::shutdown_commencing(reason))
            .await
        {
            tracing::error!("Failed to broadcast shutdown notification: {}", e);
        }

        let shutdown_timeout = self.config.shutdown_timeout();
        match tokio::time::timeout(shutdown_timeout, self.plugin_registry.shutdown()).await {
            Ok(result) => {
                if let Err(e) = result {
                    tracing::error!("Plugin registry shutdown failed: {}", e);
                }
            }
            Err(_) => {
                tracing::error!(
                    "Plugin registry shutdown timed out after {:?}",
                    shutdown_timeout
                );
                return Err(SpotfitError::plugin(format!(
                    "plugin shutdown timed out after {:?}",
                    shutdown_timeout
                )));
            }
        }

        tracing::info!("Host shutdown complete");
        Ok(())
    }

    /// Get a reference to the event channel
    pub fn event_bus(&self) -> Arc<dyn EventBus> {
        self.event_bus.clone()
    }

    /// Get a reference to the plugin registry
    pub fn plugin_registry(&self) -> &PluginRegistry {
        &self.plugin_registry
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> Arc<Config> {
        self.config.clone()
    }
}
