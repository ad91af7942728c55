//! Test helpers shared by the inline test modules.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::hooks::{Hook, HookBus, HookKind, Plugin};

/// Plugin that keeps every hook it sees.
#[derive(Default)]
pub(crate) struct HookLog {
    hooks: Mutex<Vec<Hook>>,
}

impl HookLog {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn hooks(&self) -> Vec<Hook> {
        self.hooks.lock().clone()
    }

    pub(crate) fn kinds(&self) -> Vec<HookKind> {
        self.hooks.lock().iter().map(|h| h.kind).collect()
    }

    pub(crate) fn count(&self, kind: HookKind) -> usize {
        self.hooks.lock().iter().filter(|h| h.kind == kind).count()
    }

    pub(crate) fn last(&self, kind: HookKind) -> Option<Hook> {
        self.hooks
            .lock()
            .iter()
            .rev()
            .find(|h| h.kind == kind)
            .cloned()
    }
}

#[async_trait]
impl Plugin for HookLog {
    fn name(&self) -> &str {
        "hook-log"
    }

    async fn on_hook(&self, _bus: &HookBus, hook: &Hook) -> anyhow::Result<()> {
        self.hooks.lock().push(hook.clone());
        Ok(())
    }
}

/// Bus with a [`HookLog`] already registered (its `PluginAdded` hook is dropped).
pub(crate) async fn recording_bus() -> (Arc<HookBus>, Arc<HookLog>) {
    let bus = Arc::new(HookBus::default());
    let log = HookLog::new();
    bus.add_plugin(log.clone()).await;
    log.hooks.lock().clear();
    (bus, log)
}
