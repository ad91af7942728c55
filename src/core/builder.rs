//! # Two-phase construction of a [`Supervisor`].
//!
//! The builder only collects configuration; [`SupervisorBuilder::build`]
//! materializes the bus, registers plugins and hands back a supervisor whose
//! dependencies are all resolved.
//!
//! ```text
//! SupervisorBuilder::new(cfg)
//!   .with_clock(clock)                      default: SystemClock
//!   .with_plugin(p) / .with_plugins(ps)     registration order = dispatch order
//!   .with_subsystem(sub)                    default RestartOptions
//!   .with_supervised(sub, options)
//!   .build().await ─► Arc<Supervisor>
//! ```
//!
//! Registering a second subsystem under an existing name replaces the first one
//! in place, keeping its position.

use std::sync::Arc;

use crate::{
    clock::{ClockRef, SystemClock},
    core::{
        config::SupervisorConfig,
        supervisor::{Registration, Supervisor},
    },
    hooks::{HookBus, Plugin},
    policies::RestartOptions,
    subsystems::SubsystemRef,
};

/// Builder for a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    clock: Option<ClockRef>,
    plugins: Vec<Arc<dyn Plugin>>,
    registrations: Vec<Registration>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            clock: None,
            plugins: Vec::new(),
            registrations: Vec::new(),
        }
    }

    /// Sets the clock used for hook timestamps and restart bookkeeping.
    pub fn with_clock(mut self, clock: ClockRef) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Adds one plugin.
    pub fn with_plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Adds several plugins, in order.
    pub fn with_plugins(mut self, plugins: impl IntoIterator<Item = Arc<dyn Plugin>>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    /// Registers a subsystem with the default [`RestartOptions`].
    pub fn with_subsystem(self, sub: SubsystemRef) -> Self {
        self.with_supervised(sub, RestartOptions::default())
    }

    /// Registers a subsystem with explicit restart options.
    pub fn with_supervised(mut self, sub: SubsystemRef, options: RestartOptions) -> Self {
        let registration = Registration { sub, options };
        match self
            .registrations
            .iter_mut()
            .find(|r| r.sub.name() == registration.sub.name())
        {
            Some(existing) => {
                tracing::warn!(
                    subsystem = registration.sub.name(),
                    "subsystem registered twice, replacing the earlier one"
                );
                *existing = registration;
            }
            None => self.registrations.push(registration),
        }
        self
    }

    /// Builds the supervisor.
    ///
    /// Plugins are registered on the new bus in order; each registration
    /// dispatches a `PluginAdded` hook.
    pub async fn build(self) -> Arc<Supervisor> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let bus = Arc::new(HookBus::new(clock.clone()));
        for plugin in self.plugins {
            bus.add_plugin(plugin).await;
        }

        Arc::new(Supervisor::new_internal(
            self.cfg,
            bus,
            clock,
            self.registrations,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::SubsystemError,
        hooks::HookKind,
        subsystems::SubsystemFn,
        testing::HookLog,
    };
    use tokio_util::sync::CancellationToken;

    fn idle(name: &'static str) -> SubsystemRef {
        SubsystemFn::arc(name, |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err::<(), _>(SubsystemError::Canceled)
        })
    }

    #[tokio::test]
    async fn test_duplicate_name_replaces_in_place() {
        let sup = SupervisorBuilder::new(SupervisorConfig::default())
            .with_subsystem(idle("a"))
            .with_subsystem(idle("b"))
            .with_supervised(idle("a"), RestartOptions::default().with_max_retries(1))
            .build()
            .await;

        assert_eq!(sup.names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_plugins_are_announced_in_order() {
        let first = HookLog::new();
        let second = HookLog::new();
        let sup = SupervisorBuilder::new(SupervisorConfig::default())
            .with_plugins([first.clone() as Arc<dyn Plugin>, second.clone()])
            .build()
            .await;

        assert_eq!(sup.bus().len(), 2);
        assert_eq!(first.kinds(), vec![HookKind::PluginAdded, HookKind::PluginAdded]);
        assert_eq!(second.kinds(), vec![HookKind::PluginAdded]);
    }
}
