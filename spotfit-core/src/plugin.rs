//! Plugin capabilities and the registry the host keeps them in
//!
//! A host menu plugin is one concrete type implementing three narrow
//! capabilities: [`Runnable`] (a command that can be run with an argument),
//! [`MenuRegistrable`] (fixed menu metadata plus the selection callback) and
//! [`EventSubscriber`] (context hand-off and teardown). [`MenuPlugin`] is the
//! union the registry stores.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::Config;
use crate::error::{Result, SpotfitError};
use crate::event::{EventBus, HostEvent};

/// A command the host can run with a free-form argument
#[async_trait]
pub trait Runnable: Send + Sync {
    async fn run(&self, argument: &str) -> Result<()>;
}

/// Menu metadata and the selection entry point
#[async_trait]
pub trait MenuRegistrable: Send + Sync {
    /// Display name of the menu entry
    fn name(&self) -> &str;

    /// Submenu the entry is placed under
    fn sub_menu(&self) -> &str;

    fn help_text(&self) -> &str;

    fn version(&self) -> &str;

    fn copyright(&self) -> &str;

    /// Short description shown when hovering the menu entry
    fn tooltip(&self) -> Option<&str> {
        None
    }

    /// Called when the user picks the menu entry
    async fn on_plugin_selected(&self) -> Result<()>;
}

/// Context hand-off and teardown
///
/// `set_context` is where a plugin registers with the host event channel;
/// `dispose` must undo that registration and release everything the plugin
/// holds. `dispose` may be called more than once.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    async fn set_context(&self, context: &PluginContext) -> Result<()>;

    async fn dispose(&self) -> Result<()>;
}

/// Everything the host registry needs from a plugin
pub trait MenuPlugin: Runnable + MenuRegistrable + EventSubscriber {}

impl<T> MenuPlugin for T where T: Runnable + MenuRegistrable + EventSubscriber {}

/// Context provided to plugins when they are registered
///
/// Plugins must not keep strong references to anything in here beyond the
/// `set_context` call; the host owns these services.
#[derive(Clone)]
pub struct PluginContext {
    pub event_bus: Arc<dyn EventBus>,
    pub config: Arc<Config>,
}

impl PluginContext {
    /// Create a new plugin context
    pub fn new(event_bus: Arc<dyn EventBus>, config: Arc<Config>) -> Self {
        Self { event_bus, config }
    }
}

/// A menu entry as the host presents it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub sub_menu: String,
    pub name: String,
    pub tooltip: Option<String>,
}

/// Information about a loaded plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub sub_menu: String,
    pub version: String,
    pub copyright: String,
    pub help_text: String,
    pub status: PluginStatus,
    pub load_time: SystemTime,
    pub invocations: u64,
}

/// Plugin status enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginStatus {
    Active,
    Error(String),
}

/// Plugin registry for managing loaded plugins
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn MenuPlugin>>,
    plugin_info: HashMap<String, PluginInfo>,
    load_order: Vec<String>,
    context: Option<PluginContext>,
}

impl PluginRegistry {
    /// Create a new plugin registry
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
            plugin_info: HashMap::new(),
            load_order: Vec::new(),
            context: None,
        }
    }

    /// Register a plugin and hand it the host context
    pub async fn register_plugin(
        &mut self,
        plugin: Arc<dyn MenuPlugin>,
        context: &PluginContext,
    ) -> Result<()> {
        let name = plugin.name().to_string();
        let version = plugin.version().to_string();

        if self.plugins.contains_key(&name) {
            return Err(SpotfitError::plugin(format!(
                "Plugin {} is already registered",
                name
            )));
        }

        tracing::info!("Registering plugin: {} v{}", name, version);

        plugin.set_context(context).await?;

        let info = PluginInfo {
            name: name.clone(),
            sub_menu: plugin.sub_menu().to_string(),
            version: version.clone(),
            copyright: plugin.copyright().to_string(),
            help_text: plugin.help_text().to_string(),
            status: PluginStatus::Active,
            load_time: SystemTime::now(),
            invocations: 0,
        };

        self.plugin_info.insert(name.clone(), info);
        self.plugins.insert(name.clone(), plugin);
        self.load_order.push(name.clone());
        self.context = Some(context.clone());

        if let Err(e) = context
            .event_bus
            .publish(HostEvent::plugin_loaded(name, version))
            .await
        {
            tracing::warn!("Failed to announce plugin load: {}", e);
        }

        Ok(())
    }

    /// Dispose a plugin and remove it from the registry
    pub async fn unregister_plugin(&mut self, name: &str) -> Result<()> {
        let plugin = self
            .plugins
            .remove(name)
            .ok_or_else(|| SpotfitError::plugin(format!("Plugin {} not found", name)))?;

        tracing::info!("Unregistering plugin: {}", name);

        let result = plugin.dispose().await;
        self.plugin_info.remove(name);
        self.load_order.retain(|n| n != name);

        if let Some(context) = &self.context {
            if let Err(e) = context
                .event_bus
                .publish(HostEvent::plugin_unloaded(name.to_string()))
                .await
            {
                tracing::warn!("Failed to announce plugin unload: {}", e);
            }
        }

        result
    }

    /// Forward a menu selection to the named plugin
    pub async fn select(&mut self, name: &str) -> Result<()> {
        let plugin = self.active_plugin(name)?;

        if let Some(context) = &self.context {
            let event =
                HostEvent::menu_item_invoked(name.to_string(), plugin.sub_menu().to_string());
            if let Err(e) = context.event_bus.publish(event).await {
                tracing::warn!("Failed to announce menu selection: {}", e);
            }
        }

        let result = plugin.on_plugin_selected().await;
        self.record_invocation(name, &result);
        result
    }

    /// Run the named plugin directly with an argument
    pub async fn run(&mut self, name: &str, argument: &str) -> Result<()> {
        let plugin = self.active_plugin(name)?;
        let result = plugin.run(argument).await;
        self.record_invocation(name, &result);
        result
    }

    fn active_plugin(&self, name: &str) -> Result<Arc<dyn MenuPlugin>> {
        self.plugins
            .get(name)
            .cloned()
            .ok_or_else(|| SpotfitError::plugin(format!("Plugin {} not found", name)))
    }

    fn record_invocation(&mut self, name: &str, result: &Result<()>) {
        if let Some(info) = self.plugin_info.get_mut(name) {
            info.invocations += 1;
            info.status = match result {
                Ok(()) => PluginStatus::Active,
                Err(e) => PluginStatus::Error(e.to_string()),
            };
        }
    }

    /// Menu entries sorted by submenu, then name
    pub fn menu_entries(&self) -> Vec<MenuEntry> {
        let mut entries: Vec<MenuEntry> = self
            .plugins
            .values()
            .map(|plugin| MenuEntry {
                sub_menu: plugin.sub_menu().to_string(),
                name: plugin.name().to_string(),
                tooltip: plugin.tooltip().map(str::to_string),
            })
            .collect();
        entries.sort_by(|a, b| (&a.sub_menu, &a.name).cmp(&(&b.sub_menu, &b.name)));
        entries
    }

    /// Get plugin information
    pub fn get_plugin_info(&self, name: &str) -> Option<&PluginInfo> {
        self.plugin_info.get(name)
    }

    /// List all loaded plugins in load order
    pub fn list_plugins(&self) -> Vec<&PluginInfo> {
        self.load_order
            .iter()
            .filter_map(|name| self.plugin_info.get(name))
            .collect()
    }

    /// Check if a plugin is loaded
    pub fn is_plugin_loaded(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Dispose all plugins in reverse load order
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("Disposing {} plugins", self.load_order.len());

        for plugin_name in self.load_order.iter().rev() {
            if let Some(plugin) = self.plugins.get(plugin_name) {
                if let Err(e) = plugin.dispose().await {
                    tracing::error!("Failed to dispose plugin {}: {}", plugin_name, e);
                }
            }
        }

        self.plugins.clear();
        self.plugin_info.clear();
        self.load_order.clear();
        self.context = None;

        Ok(())
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
