//! # HookBus: in-order, isolated broadcast of hooks to plugins.
//!
//! [`HookBus`] calls every registered [`Plugin`] for each dispatched [`Hook`],
//! sequentially and in registration order, on the dispatching task.
//!
//! ## What it guarantees
//! - Per-dispatch ordering: plugin N sees the hook before plugin N+1.
//! - Isolation: a plugin error or panic is logged and dispatch continues.
//! - Reentrancy: plugins may call [`HookBus::add_plugin`] from inside `on_hook`.
//!
//! ## What it does **not** guarantee
//! - No ordering across hooks dispatched concurrently from different subsystems.
//!
//! ## Diagram
//! ```text
//!    dispatch(&Hook)
//!        │  i = 0
//!        ├──► plugins[0].on_hook() ── Err/panic ─► tracing::error!, continue
//!        ├──► plugins[1].on_hook() ── add_plugin(P) ─► plugins.push(P)
//!        ├──► ...
//!        └──► plugins[len-1] (len re-read every step, so P is reached too)
//! ```
//!
//! The plugin list is only locked while reading one slot or appending, never
//! while a plugin runs, so nested `add_plugin` cannot deadlock.

use std::sync::Arc;

use futures::FutureExt;
use parking_lot::RwLock;

use super::{hook::Hook, plugin::Plugin};
use crate::{
    clock::{Clock, ClockRef, SystemClock},
    error::panic_message,
};

/// Ordered registry of plugins with synchronous, failure-isolated dispatch.
pub struct HookBus {
    plugins: RwLock<Vec<Arc<dyn Plugin>>>,
    clock: ClockRef,
}

impl HookBus {
    /// Creates an empty bus that stamps its own hooks with `clock`.
    pub fn new(clock: ClockRef) -> Self {
        Self {
            plugins: RwLock::new(Vec::new()),
            clock,
        }
    }

    /// Appends `plugin` and dispatches [`HookKind::PluginAdded`](super::HookKind::PluginAdded).
    ///
    /// The new plugin receives its own `PluginAdded` hook, as do all earlier ones.
    pub async fn add_plugin(&self, plugin: Arc<dyn Plugin>) {
        let hook = Hook::plugin_added(plugin.name(), self.clock.now());
        self.plugins.write().push(plugin);
        self.dispatch(&hook).await;
    }

    /// Calls every plugin's `on_hook` in registration order.
    ///
    /// Plugins appended during this call are reached before it returns.
    pub async fn dispatch(&self, hook: &Hook) {
        let mut i = 0;
        while let Some(plugin) = self.plugin_at(i) {
            let fut = plugin.on_hook(self, hook);
            match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::error!(
                        plugin = plugin.name(),
                        hook = hook.kind.as_str(),
                        error = %format!("{err:#}"),
                        "plugin hook execution failed"
                    );
                }
                Err(panic_err) => {
                    tracing::error!(
                        plugin = plugin.name(),
                        hook = hook.kind.as_str(),
                        panic = %panic_message(panic_err.as_ref()),
                        "plugin panicked during hook execution"
                    );
                }
            }
            i += 1;
        }
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    /// True if no plugin is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }

    /// Registered plugin names, in order.
    pub fn names(&self) -> Vec<String> {
        self.plugins
            .read()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    fn plugin_at(&self, i: usize) -> Option<Arc<dyn Plugin>> {
        self.plugins.read().get(i).cloned()
    }
}

impl Default for HookBus {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookKind;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::SystemTime;

    /// Appends `"<name>:<hook>"` to a shared log.
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Plugin for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        async fn on_hook(&self, _bus: &HookBus, hook: &Hook) -> anyhow::Result<()> {
            self.log
                .lock()
                .push(format!("{}:{}", self.name, hook.kind.as_str()));
            Ok(())
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Recorder> {
        Arc::new(Recorder {
            name,
            log: log.clone(),
        })
    }

    struct Failing;

    #[async_trait]
    impl Plugin for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn on_hook(&self, _bus: &HookBus, _hook: &Hook) -> anyhow::Result<()> {
            anyhow::bail!("broken plugin")
        }
    }

    struct Panicking;

    #[async_trait]
    impl Plugin for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn on_hook(&self, _bus: &HookBus, _hook: &Hook) -> anyhow::Result<()> {
            panic!("plugin blew up")
        }
    }

    /// Registers `child` the first time it sees a run hook.
    struct Spawner {
        child: Mutex<Option<Arc<dyn Plugin>>>,
    }

    #[async_trait]
    impl Plugin for Spawner {
        fn name(&self) -> &str {
            "spawner"
        }

        async fn on_hook(&self, bus: &HookBus, hook: &Hook) -> anyhow::Result<()> {
            if hook.kind == HookKind::RunStarted {
                let child = self.child.lock().take();
                if let Some(child) = child {
                    bus.add_plugin(child).await;
                }
            }
            Ok(())
        }
    }

    fn run_started() -> Hook {
        Hook::new(HookKind::RunStarted, SystemTime::UNIX_EPOCH).with_subject("svc")
    }

    #[tokio::test]
    async fn test_dispatch_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = HookBus::default();
        bus.add_plugin(recorder("a", &log)).await;
        bus.add_plugin(recorder("b", &log)).await;
        log.lock().clear();

        bus.dispatch(&run_started()).await;
        assert_eq!(
            *log.lock(),
            vec!["a:subsystem.run.started", "b:subsystem.run.started"]
        );
    }

    #[tokio::test]
    async fn test_add_plugin_announces_to_all_including_itself() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = HookBus::default();
        bus.add_plugin(recorder("a", &log)).await;
        bus.add_plugin(recorder("b", &log)).await;

        assert_eq!(
            *log.lock(),
            vec!["a:plugin.added", "a:plugin.added", "b:plugin.added"]
        );
        assert_eq!(bus.names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_failing_and_panicking_plugins_do_not_stop_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = HookBus::default();
        bus.add_plugin(Arc::new(Failing)).await;
        bus.add_plugin(Arc::new(Panicking)).await;
        bus.add_plugin(recorder("last", &log)).await;
        log.lock().clear();

        bus.dispatch(&run_started()).await;
        assert_eq!(*log.lock(), vec!["last:subsystem.run.started"]);
    }

    #[tokio::test]
    async fn test_plugin_added_during_dispatch_is_reached() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = HookBus::default();
        let child: Arc<dyn Plugin> = recorder("child", &log);
        bus.add_plugin(Arc::new(Spawner {
            child: Mutex::new(Some(child)),
        }))
        .await;
        assert_eq!(bus.len(), 1);

        bus.dispatch(&run_started()).await;

        assert_eq!(bus.len(), 2);
        // The child sees its own registration, then the rest of the outer dispatch.
        assert_eq!(
            *log.lock(),
            vec!["child:plugin.added", "child:subsystem.run.started"]
        );
    }
}
