//! Host event channel used by plugins to follow the host's lifecycle

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;

/// Event serialization utilities for persistence and debugging
pub mod serialization {
    use super::*;

    /// Serialize an event to JSON string
    pub fn serialize_event(event: &HostEvent) -> Result<String> {
        serde_json::to_string(event).map_err(crate::error::SpotfitError::Json)
    }

    /// Deserialize an event from JSON string
    pub fn deserialize_event(json: &str) -> Result<HostEvent> {
        serde_json::from_str(json).map_err(crate::error::SpotfitError::Json)
    }

    /// Format event for logging with timestamp
    pub fn format_event_for_log(event: &HostEvent) -> String {
        let timestamp = event
            .timestamp()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        format!(
            "[{}] {}: {}",
            timestamp,
            event.event_type().to_uppercase(),
            event.description()
        )
    }
}

/// Core trait for all events in the system
pub trait Event: Send + Sync + Clone + std::fmt::Debug + 'static {
    /// Get the event type identifier
    fn event_type(&self) -> &str;

    /// Get the event timestamp
    fn timestamp(&self) -> SystemTime;

    /// Get event metadata
    fn metadata(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

/// Discriminant of [`HostEvent`], used to subscribe to one kind of notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostEventKind {
    ShutdownCommencing,
    PluginLoaded,
    PluginUnloaded,
    MenuItemInvoked,
}

/// Broadcast by the host before it terminates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownCommencing {
    pub reason: String,
    pub timestamp: SystemTime,
}

impl ShutdownCommencing {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self {
            reason: reason.into(),
            timestamp: SystemTime::now(),
        }
    }
}

/// Notifications the host broadcasts to its plugins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HostEvent {
    /// The host is about to terminate
    ShutdownCommencing(ShutdownCommencing),
    /// A plugin was registered and received its context
    PluginLoaded {
        plugin_name: String,
        version: String,
        timestamp: SystemTime,
    },
    /// A plugin was unloaded and disposed
    PluginUnloaded {
        plugin_name: String,
        timestamp: SystemTime,
    },
    /// The user picked a plugin's menu entry
    MenuItemInvoked {
        plugin_name: String,
        sub_menu: String,
        timestamp: SystemTime,
    },
}

impl Event for HostEvent {
    fn event_type(&self) -> &str {
        match self {
            HostEvent::ShutdownCommencing(_) => "shutdown_commencing",
            HostEvent::PluginLoaded { .. } => "plugin_loaded",
            HostEvent::PluginUnloaded { .. } => "plugin_unloaded",
            HostEvent::MenuItemInvoked { .. } => "menu_item_invoked",
        }
    }

    fn timestamp(&self) -> SystemTime {
        match self {
            HostEvent::ShutdownCommencing(event) => event.timestamp,
            HostEvent::PluginLoaded { timestamp, .. } => *timestamp,
            HostEvent::PluginUnloaded { timestamp, .. } => *timestamp,
            HostEvent::MenuItemInvoked { timestamp, .. } => *timestamp,
        }
    }

    fn metadata(&self) -> HashMap<String, String> {
        let mut metadata = HashMap::new();

        match self {
            HostEvent::ShutdownCommencing(event) => {
                metadata.insert("reason".to_string(), event.reason.clone());
            }
            HostEvent::PluginLoaded {
                plugin_name,
                version,
                ..
            } => {
                metadata.insert("plugin_name".to_string(), plugin_name.clone());
                metadata.insert("version".to_string(), version.clone());
            }
            HostEvent::PluginUnloaded { plugin_name, .. } => {
                metadata.insert("plugin_name".to_string(), plugin_name.clone());
            }
            HostEvent::MenuItemInvoked {
                plugin_name,
                sub_menu,
                ..
            } => {
                metadata.insert("plugin_name".to_string(), plugin_name.clone());
                metadata.insert("sub_menu".to_string(), sub_menu.clone());
            }
        }

        metadata
    }
}

impl HostEvent {
    /// Create a shutdown notification with current timestamp
    pub fn shutdown_commencing<S: Into<String>>(reason: S) -> Self {
        Self::ShutdownCommencing(ShutdownCommencing::new(reason))
    }

    /// Create a new plugin loaded event with current timestamp
    pub fn plugin_loaded(plugin_name: String, version: String) -> Self {
        Self::PluginLoaded {
            plugin_name,
            version,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a new plugin unloaded event with current timestamp
    pub fn plugin_unloaded(plugin_name: String) -> Self {
        Self::PluginUnloaded {
            plugin_name,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a new menu item invoked event with current timestamp
    pub fn menu_item_invoked(plugin_name: String, sub_menu: String) -> Self {
        Self::MenuItemInvoked {
            plugin_name,
            sub_menu,
            timestamp: SystemTime::now(),
        }
    }

    pub fn kind(&self) -> HostEventKind {
        match self {
            HostEvent::ShutdownCommencing(_) => HostEventKind::ShutdownCommencing,
            HostEvent::PluginLoaded { .. } => HostEventKind::PluginLoaded,
            HostEvent::PluginUnloaded { .. } => HostEventKind::PluginUnloaded,
            HostEvent::MenuItemInvoked { .. } => HostEventKind::MenuItemInvoked,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            HostEvent::ShutdownCommencing(event) => {
                format!("Host shutdown commencing ({})", event.reason)
            }
            HostEvent::PluginLoaded {
                plugin_name,
                version,
                ..
            } => format!("Plugin {} v{} loaded", plugin_name, version),
            HostEvent::PluginUnloaded { plugin_name, .. } => {
                format!("Plugin {} unloaded", plugin_name)
            }
            HostEvent::MenuItemInvoked {
                plugin_name,
                sub_menu,
                ..
            } => format!("Menu item {} > {} invoked", sub_menu, plugin_name),
        }
    }

    /// Check if this is the shutdown notification
    pub fn is_shutdown(&self) -> bool {
        matches!(self, HostEvent::ShutdownCommencing(_))
    }
}

/// Handler for host events
#[async_trait]
pub trait HostEventHandler: Send + Sync {
    /// Handle a host event
    async fn handle_host_event(&self, event: &HostEvent) -> Result<()>;

    /// Get handler name for debugging
    fn handler_name(&self) -> &str {
        "UnnamedHostEventHandler"
    }
}

/// Filter for events to determine if they should be delivered to a handler
pub trait EventFilter: Send + Sync {
    /// Check if the event should be delivered to the handler
    fn should_handle(&self, event: &HostEvent) -> bool;

    /// Get filter name for debugging
    fn filter_name(&self) -> &str {
        "UnnamedFilter"
    }
}

/// Passes only events of one kind
#[derive(Debug, Clone, Copy)]
pub struct KindFilter(pub HostEventKind);

impl EventFilter for KindFilter {
    fn should_handle(&self, event: &HostEvent) -> bool {
        event.kind() == self.0
    }

    fn filter_name(&self) -> &str {
        "KindFilter"
    }
}

/// Unique identifier for event subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub Uuid);

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Publish/subscribe channel exposed by the host
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event to all matching subscribers
    async fn publish(&self, event: HostEvent) -> Result<()>;

    /// Subscribe to host events, optionally filtered
    async fn subscribe(
        &self,
        handler: Arc<dyn HostEventHandler>,
        filter: Option<Box<dyn EventFilter>>,
    ) -> Result<SubscriptionId>;

    /// Unsubscribe from events
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()>;

    /// Get the number of active subscriptions
    async fn subscription_count(&self) -> usize;
}

struct Subscription {
    id: SubscriptionId,
    handler: Arc<dyn HostEventHandler>,
    filter: Option<Arc<dyn EventFilter>>,
}

/// In-memory implementation of the event bus
///
/// Matching handlers are collected before any of them runs, so a handler may
/// unsubscribe itself (or others) while an event is being delivered. Such a
/// removal takes effect from the next publish.
pub struct InMemoryEventBus {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl InMemoryEventBus {
    /// Create a new in-memory event bus
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
        }
    }

    async fn matching_handlers(&self, event: &HostEvent) -> Vec<Arc<dyn HostEventHandler>> {
        let subscriptions = self.subscriptions.read().await;
        subscriptions
            .iter()
            .filter(|sub| {
                sub.filter
                    .as_ref()
                    .map(|filter| filter.should_handle(event))
                    .unwrap_or(true)
            })
            .map(|sub| sub.handler.clone())
            .collect()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: HostEvent) -> Result<()> {
        tracing::debug!("Publishing {}", serialization::format_event_for_log(&event));

        let handlers = self.matching_handlers(&event).await;
        if handlers.is_empty() {
            tracing::trace!("No subscribers for event type: {}", event.event_type());
            return Ok(());
        }

        let mut handlers_called = 0;
        for handler in handlers {
            if let Err(e) = handler.handle_host_event(&event).await {
                tracing::error!(
                    "Handler {} failed to process event {}: {}",
                    handler.handler_name(),
                    event.event_type(),
                    e
                );
            } else {
                handlers_called += 1;
            }
        }

        tracing::debug!(
            "Routed event {} to {} handlers",
            event.event_type(),
            handlers_called
        );

        Ok(())
    }

    async fn subscribe(
        &self,
        handler: Arc<dyn HostEventHandler>,
        filter: Option<Box<dyn EventFilter>>,
    ) -> Result<SubscriptionId> {
        let id = SubscriptionId::new();

        tracing::debug!(
            "Created subscription {:?} for handler {} (filter: {})",
            id,
            handler.handler_name(),
            filter
                .as_ref()
                .map(|f| f.filter_name().to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        self.subscriptions.write().await.push(Subscription {
            id,
            handler,
            filter: filter.map(Arc::from),
        });

        Ok(id)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        let mut subscriptions = self.subscriptions.write().await;
        let before = subscriptions.len();
        subscriptions.retain(|sub| sub.id != id);

        if subscriptions.len() < before {
            tracing::debug!("Removed subscription: {:?}", id);
        } else {
            tracing::warn!("Attempted to remove non-existent subscription: {:?}", id);
        }

        Ok(())
    }

    async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}
