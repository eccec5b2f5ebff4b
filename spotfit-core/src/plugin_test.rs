//! Tests for the plugin registry and host engine

#[cfg(test)]
mod tests {
    use crate::config::{Config, PluginConfig};
    use crate::error::{Result, SpotfitError};
    use crate::event::{
        Event, EventBus, HostEvent, HostEventHandler, HostEventKind, InMemoryEventBus, KindFilter,
    };
    use crate::plugin::*;
    use crate::Host;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Mock plugin that records every call into a shared journal
    struct MockPlugin {
        name: String,
        sub_menu: String,
        journal: Journal,
        fail_runs: bool,
        dispose_delay: Option<Duration>,
    }

    impl MockPlugin {
        fn new(name: &str, sub_menu: &str, journal: &Journal) -> Self {
            Self {
                name: name.to_string(),
                sub_menu: sub_menu.to_string(),
                journal: journal.clone(),
                fail_runs: false,
                dispose_delay: None,
            }
        }

        fn failing(mut self) -> Self {
            self.fail_runs = true;
            self
        }

        fn slow_to_dispose(mut self, delay: Duration) -> Self {
            self.dispose_delay = Some(delay);
            self
        }

        fn record(&self, what: &str) {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, what));
        }
    }

    #[async_trait]
    impl Runnable for MockPlugin {
        async fn run(&self, argument: &str) -> Result<()> {
            self.record(&format!("run({})", argument));
            if self.fail_runs {
                return Err(SpotfitError::window("cannot open"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl MenuRegistrable for MockPlugin {
        fn name(&self) -> &str {
            &self.name
        }

        fn sub_menu(&self) -> &str {
            &self.sub_menu
        }

        fn help_text(&self) -> &str {
            "help"
        }

        fn version(&self) -> &str {
            "1.0.0"
        }

        fn copyright(&self) -> &str {
            "nobody"
        }

        async fn on_plugin_selected(&self) -> Result<()> {
            self.record("selected");
            self.run("").await
        }
    }

    #[async_trait]
    impl EventSubscriber for MockPlugin {
        async fn set_context(&self, _context: &PluginContext) -> Result<()> {
            self.record("set_context");
            Ok(())
        }

        async fn dispose(&self) -> Result<()> {
            if let Some(delay) = self.dispose_delay {
                tokio::time::sleep(delay).await;
            }
            self.record("dispose");
            Ok(())
        }
    }

    /// Writes shutdown notifications into the journal
    struct ShutdownRecorder {
        journal: Journal,
    }

    #[async_trait]
    impl HostEventHandler for ShutdownRecorder {
        async fn handle_host_event(&self, event: &HostEvent) -> Result<()> {
            self.journal
                .lock()
                .unwrap()
                .push(format!("event:{}", event.event_type()));
            Ok(())
        }
    }

    fn create_test_context() -> PluginContext {
        let event_bus = Arc::new(InMemoryEventBus::new());
        let config = Arc::new(Config::new());
        PluginContext::new(event_bus, config)
    }

    fn journal() -> Journal {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_plugin_registration() {
        let mut registry = PluginRegistry::new();
        let context = create_test_context();
        let log = journal();

        let plugin = Arc::new(MockPlugin::new("spots", "Acquisition Tools", &log));
        registry.register_plugin(plugin, &context).await.unwrap();

        assert!(registry.is_plugin_loaded("spots"));
        assert_eq!(entries(&log), vec!["spots:set_context"]);

        let info = registry.get_plugin_info("spots").unwrap();
        assert_eq!(info.sub_menu, "Acquisition Tools");
        assert_eq!(info.version, "1.0.0");
        assert_eq!(info.status, PluginStatus::Active);
        assert_eq!(info.invocations, 0);
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let mut registry = PluginRegistry::new();
        let context = create_test_context();
        let log = journal();

        registry
            .register_plugin(Arc::new(MockPlugin::new("spots", "A", &log)), &context)
            .await
            .unwrap();
        let result = registry
            .register_plugin(Arc::new(MockPlugin::new("spots", "B", &log)), &context)
            .await;

        assert!(matches!(result, Err(SpotfitError::Plugin(_))));
        assert_eq!(registry.list_plugins().len(), 1);
        // The rejected plugin never received the context
        assert_eq!(entries(&log), vec!["spots:set_context"]);
    }

    #[tokio::test]
    async fn test_select_and_run_forward_to_plugin() {
        let mut registry = PluginRegistry::new();
        let context = create_test_context();
        let log = journal();

        registry
            .register_plugin(Arc::new(MockPlugin::new("spots", "A", &log)), &context)
            .await
            .unwrap();

        registry.select("spots").await.unwrap();
        registry.run("spots", "movie.tif").await.unwrap();

        assert_eq!(
            entries(&log),
            vec![
                "spots:set_context",
                "spots:selected",
                "spots:run()",
                "spots:run(movie.tif)"
            ]
        );
        assert_eq!(registry.get_plugin_info("spots").unwrap().invocations, 2);
        assert!(registry.select("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_failed_run_marks_plugin_status() {
        let mut registry = PluginRegistry::new();
        let context = create_test_context();
        let log = journal();

        registry
            .register_plugin(
                Arc::new(MockPlugin::new("spots", "A", &log).failing()),
                &context,
            )
            .await
            .unwrap();

        let result = registry.run("spots", "").await;
        assert!(matches!(result, Err(SpotfitError::Window(_))));
        assert!(matches!(
            registry.get_plugin_info("spots").unwrap().status,
            PluginStatus::Error(_)
        ));
    }

    #[tokio::test]
    async fn test_plugin_unregistration_disposes() {
        let mut registry = PluginRegistry::new();
        let context = create_test_context();
        let log = journal();

        registry
            .register_plugin(Arc::new(MockPlugin::new("spots", "A", &log)), &context)
            .await
            .unwrap();
        registry.unregister_plugin("spots").await.unwrap();

        assert!(!registry.is_plugin_loaded("spots"));
        assert_eq!(entries(&log), vec!["spots:set_context", "spots:dispose"]);
        assert!(registry.unregister_plugin("spots").await.is_err());
    }

    #[tokio::test]
    async fn test_registry_shutdown_disposes_in_reverse_order() {
        let mut registry = PluginRegistry::new();
        let context = create_test_context();
        let log = journal();

        for name in ["first", "second", "third"] {
            registry
                .register_plugin(Arc::new(MockPlugin::new(name, "A", &log)), &context)
                .await
                .unwrap();
        }
        log.lock().unwrap().clear();

        registry.shutdown().await.unwrap();

        assert_eq!(
            entries(&log),
            vec!["third:dispose", "second:dispose", "first:dispose"]
        );
        assert!(registry.list_plugins().is_empty());
    }

    #[tokio::test]
    async fn test_menu_entries_are_sorted() {
        let mut registry = PluginRegistry::new();
        let context = create_test_context();
        let log = journal();

        registry
            .register_plugin(Arc::new(MockPlugin::new("Zeta", "Analysis", &log)), &context)
            .await
            .unwrap();
        registry
            .register_plugin(
                Arc::new(MockPlugin::new("Alpha", "Acquisition Tools", &log)),
                &context,
            )
            .await
            .unwrap();
        registry
            .register_plugin(Arc::new(MockPlugin::new("Beta", "Analysis", &log)), &context)
            .await
            .unwrap();

        let names: Vec<(String, String)> = registry
            .menu_entries()
            .into_iter()
            .map(|e| (e.sub_menu, e.name))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Acquisition Tools".to_string(), "Alpha".to_string()),
                ("Analysis".to_string(), "Beta".to_string()),
                ("Analysis".to_string(), "Zeta".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_host_skips_disabled_plugins() {
        let mut config = Config::new();
        let mut disabled = PluginConfig::new("spots".to_string());
        disabled.enabled = false;
        config.set_plugin_config(disabled);

        let mut host = Host::new(config).unwrap();
        let log = journal();

        let registered = host
            .register_plugin(Arc::new(MockPlugin::new("spots", "A", &log)))
            .await
            .unwrap();

        assert!(!registered);
        assert!(host.menu_entries().is_empty());
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn test_host_rejects_invalid_config() {
        let mut config = Config::new();
        config.shutdown_timeout_secs = 0;
        assert!(Host::new(config).is_err());
    }

    #[tokio::test]
    async fn test_host_shutdown_broadcasts_before_disposing() {
        let mut host = Host::new(Config::new()).unwrap();
        let log = journal();

        host.event_bus()
            .subscribe(
                Arc::new(ShutdownRecorder {
                    journal: log.clone(),
                }),
                Some(Box::new(KindFilter(HostEventKind::ShutdownCommencing))),
            )
            .await
            .unwrap();
        host.register_plugin(Arc::new(MockPlugin::new("spots", "A", &log)))
            .await
            .unwrap();

        host.shutdown("test over").await.unwrap();

        assert_eq!(
            entries(&log),
            vec![
                "spots:set_context",
                "event:shutdown_commencing",
                "spots:dispose"
            ]
        );
        assert!(host.plugin_registry().list_plugins().is_empty());
    }

    #[tokio::test]
    async fn test_host_shutdown_reports_timeout() {
        let mut config = Config::new();
        config.shutdown_timeout_secs = 1;
        let mut host = Host::new(config).unwrap();
        let log = journal();

        host.register_plugin(Arc::new(
            MockPlugin::new("spots", "A", &log).slow_to_dispose(Duration::from_secs(10)),
        ))
        .await
        .unwrap();

        let result = host.shutdown("stuck plugin").await;

        assert!(matches!(result, Err(SpotfitError::Plugin(_))));
        assert!(!entries(&log).contains(&"spots:dispose".to_string()));
    }

    #[tokio::test]
    async fn test_shutdown_handle_stops_run_loop() {
        let mut host = Host::new(Config::new()).unwrap();
        let log = journal();
        host.register_plugin(Arc::new(MockPlugin::new("spots", "A", &log)))
            .await
            .unwrap();

        // Requested before the loop starts waiting; the permit is kept
        host.shutdown_handle().request();
        host.run_until_shutdown().await.unwrap();

        assert!(entries(&log).contains(&"spots:dispose".to_string()));
    }
}
