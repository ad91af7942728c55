//! # Supervisor: owns the supervised subsystems and drives their lifecycle.
//!
//! The [`Supervisor`] owns the [`HookBus`], the clock and the registered
//! subsystems. It initializes them in order, runs one restart loop per
//! subsystem, terminates them on shutdown and tears them down within a bound.
//!
//! ## High-level architecture
//! ```text
//! SupervisorBuilder::with_supervised(sub, RestartOptions) ... build()
//!
//! initialize(ctx):
//!   for each registered subsystem, in registration order:
//!     SupervisedSubsystem::new(sub, options, bus, clock)
//!     └─► initialize(child token)      first error aborts the rest
//!
//! run(ctx):
//!   SupervisedSubsystem[0]  [1]  ...  [ready-1]       (initialized successfully)
//!       └──► set.spawn(restart_loop(ctx.child_token()))      (one task each)
//!   ctx.cancelled()
//!       └─► hook ShutdownRequested
//!       └─► terminate() every subsystem
//!       └─► wait for all loops within cfg.grace:
//!              ├─ all exited        → hook AllTerminated, Err(Canceled)
//!              └─ grace exceeded    → hook GraceExceeded,  Err(GraceExceeded { stuck })
//!
//! teardown(ctx):
//!   every subsystem that reached initialize → set.spawn(teardown(child token))
//!   race all against cfg.teardown_timeout:
//!       ├─ all done        → Ok(()) or the first Teardown { name, source }
//!       └─ timeout         → hook TeardownTimedOut, Err(TeardownTimeout { stuck })
//! ```
//!
//! ## Rules
//! - A subsystem's terminal failure is logged and kept in its status; siblings keep running.
//! - A panic inside a subsystem call counts as a failure of that call.
//! - Control calls (`stop`, `start`, `terminate`) need `initialize` to have run.
//! - `TeardownTimeout` is fatal: some teardown may still hold resources.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use subvisor::{
//!     RestartMode, RestartOptions, SubsystemError, SubsystemFn, SupervisorBuilder,
//!     SupervisorConfig, SupervisorError,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), SupervisorError> {
//!     let ticker = SubsystemFn::arc("ticker", |ctx: CancellationToken| async move {
//!         while !ctx.is_cancelled() {
//!             tokio::time::sleep(Duration::from_millis(50)).await;
//!         }
//!         Err::<(), _>(SubsystemError::Canceled)
//!     });
//!
//!     let sup = SupervisorBuilder::new(SupervisorConfig::default())
//!         .with_supervised(ticker, RestartOptions::new(RestartMode::Always))
//!         .build()
//!         .await;
//!
//!     let token = CancellationToken::new();
//!     sup.initialize(token.clone()).await?;
//!
//!     let stopper = token.clone();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(Duration::from_millis(200)).await;
//!         stopper.cancel();
//!     });
//!
//!     match sup.run(token).await {
//!         Err(SupervisorError::Canceled) => {}
//!         other => other?,
//!     }
//!     sup.teardown(CancellationToken::new()).await
//! }
//! ```

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, OnceLock,
    },
    time::SystemTime,
};

use tokio::task::{AbortHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::ClockRef,
    core::{
        config::SupervisorConfig,
        shutdown,
        supervised::{SubsystemStatus, SupervisedSubsystem},
    },
    error::{SubsystemError, SupervisorError},
    hooks::{Hook, HookBus, HookKind, Plugin},
    policies::RestartOptions,
    subsystems::{Subsystem, SubsystemRef},
};

/// A registered subsystem with its restart options.
pub(crate) struct Registration {
    pub sub: SubsystemRef,
    pub options: RestartOptions,
}

/// Coordinates supervised subsystems, hook delivery and bounded shutdown.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Arc<HookBus>,
    clock: ClockRef,
    registrations: Vec<Registration>,
    supervised: OnceLock<Vec<Arc<SupervisedSubsystem>>>,
    /// How many subsystems reached `initialize` (a prefix of `supervised`).
    initialized: AtomicUsize,
    /// How many subsystems initialized successfully; only these are run.
    ready: AtomicUsize,
}

impl Supervisor {
    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Arc<HookBus>,
        clock: ClockRef,
        registrations: Vec<Registration>,
    ) -> Self {
        Self {
            cfg,
            bus,
            clock,
            registrations,
            supervised: OnceLock::new(),
            initialized: AtomicUsize::new(0),
            ready: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// The bus every hook of this supervisor goes through.
    pub fn bus(&self) -> &Arc<HookBus> {
        &self.bus
    }

    /// Registered subsystem names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.registrations
            .iter()
            .map(|r| r.sub.name().to_string())
            .collect()
    }

    /// Registers a plugin at runtime; it receives its own `PluginAdded` hook.
    pub async fn add_plugin(&self, plugin: Arc<dyn Plugin>) {
        self.bus.add_plugin(plugin).await;
    }

    /// Wraps every registered subsystem and initializes them one by one.
    ///
    /// The first error aborts the remaining initializations and is returned;
    /// subsystems initialized so far stay initialized.
    pub async fn initialize(&self, ctx: CancellationToken) -> Result<(), SupervisorError> {
        let subs = self.supervised.get_or_init(|| {
            self.registrations
                .iter()
                .map(|r| {
                    Arc::new(SupervisedSubsystem::new(
                        r.sub.clone(),
                        r.options,
                        self.bus.clone(),
                        self.clock.clone(),
                    ))
                })
                .collect()
        });

        for (i, sub) in subs.iter().enumerate() {
            self.initialized.fetch_max(i + 1, Ordering::AcqRel);
            tracing::debug!(subsystem = sub.name(), "initializing subsystem");

            if let Err(source) = sub.initialize(ctx.child_token()).await {
                tracing::error!(
                    subsystem = sub.name(),
                    error = %source,
                    "subsystem initialization failed"
                );
                return Err(SupervisorError::Initialization {
                    name: sub.name().to_string(),
                    source,
                });
            }
            self.ready.fetch_max(i + 1, Ordering::AcqRel);
        }

        tracing::info!(subsystems = subs.len(), "supervisor initialized");
        Ok(())
    }

    /// Runs every restart loop until `ctx` is cancelled, then terminates them all.
    ///
    /// Only subsystems whose `initialize` succeeded are run. After a failed
    /// [`Supervisor::initialize`] that is the prefix before the failing one.
    ///
    /// Returns [`SupervisorError::Canceled`] once every loop exited within
    /// [`SupervisorConfig::grace`], or [`SupervisorError::GraceExceeded`] with the
    /// names of the loops still alive (those are aborted).
    pub async fn run(&self, ctx: CancellationToken) -> Result<(), SupervisorError> {
        let subs = self.supervised()?;
        let ready = self.ready.load(Ordering::Acquire).min(subs.len());
        if ready < subs.len() {
            tracing::warn!(
                skipped = ?subs[ready..].iter().map(|s| s.name()).collect::<Vec<_>>(),
                "skipping subsystems that did not initialize"
            );
        }
        let subs = &subs[..ready];

        let mut set = JoinSet::new();
        let handles: Vec<(String, AbortHandle)> = subs
            .iter()
            .map(|sub| {
                let handle = set.spawn(Self::supervise(sub.clone(), ctx.child_token()));
                (sub.name().to_string(), handle)
            })
            .collect();
        tracing::info!(subsystems = handles.len(), "supervisor running");

        ctx.cancelled().await;

        let started = self.clock.now();
        tracing::info!("shutdown requested, terminating subsystems");
        self.bus
            .dispatch(&Hook::new(HookKind::ShutdownRequested, started))
            .await;
        for sub in subs {
            sub.terminate();
        }

        self.wait_all_with_grace(&mut set, &handles, started).await
    }

    /// Tears down every subsystem that reached `initialize`, concurrently and
    /// within [`SupervisorConfig::teardown_timeout`].
    ///
    /// Returns the first teardown error (by completion), or
    /// [`SupervisorError::TeardownTimeout`] if some teardown never finished.
    pub async fn teardown(&self, ctx: CancellationToken) -> Result<(), SupervisorError> {
        let subs = self.supervised()?;
        let count = self.initialized.load(Ordering::Acquire).min(subs.len());
        let timeout = self.cfg.teardown_timeout;
        let started = self.clock.now();
        let token = ctx.child_token();

        let mut set = JoinSet::new();
        let handles: Vec<(String, AbortHandle)> = subs[..count]
            .iter()
            .map(|sub| {
                let sub = sub.clone();
                let child = token.child_token();
                let name = sub.name().to_string();
                let handle = set.spawn(async move {
                    let res = sub.teardown(child).await;
                    (sub.name().to_string(), res)
                });
                (name, handle)
            })
            .collect();

        let mut first_err: Option<SupervisorError> = None;
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = set.join_next() => match joined {
                    None => break,
                    Some(Ok((_, Ok(())))) => {}
                    Some(Ok((name, Err(source)))) => {
                        tracing::error!(
                            subsystem = %name,
                            error = %source,
                            "subsystem teardown failed"
                        );
                        first_err.get_or_insert(SupervisorError::Teardown { name, source });
                    }
                    Some(Err(join_err)) => {
                        tracing::error!(error = %join_err, "teardown task ended abnormally");
                    }
                },
                _ = &mut deadline => {
                    token.cancel();
                    let stuck = unfinished(&handles);
                    tracing::error!(
                        timeout = ?timeout,
                        stuck = ?stuck,
                        "teardown timed out, resources may have leaked"
                    );
                    let hook = Hook::new(HookKind::TeardownTimedOut, started)
                        .with_ended_at(self.clock.now())
                        .with_reason(format!("stuck: {}", stuck.join(", ")));
                    self.bus.dispatch(&hook).await;
                    return Err(SupervisorError::TeardownTimeout { timeout, stuck });
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => {
                tracing::info!(subsystems = count, "supervisor torn down");
                Ok(())
            }
        }
    }

    /// Initializes, runs until an OS shutdown signal, then tears down.
    ///
    /// Teardown runs on a fresh token even when initialization failed. A fatal
    /// teardown error wins over every other error; otherwise the first error
    /// (initialization, then run, then teardown) is returned.
    pub async fn serve(&self) -> Result<(), SupervisorError> {
        let token = CancellationToken::new();

        let outcome = match self.initialize(token.clone()).await {
            Ok(()) => self.run_until_signal(token).await,
            Err(err) => Err(err),
        };

        let teardown = self.teardown(CancellationToken::new()).await;

        match (outcome, teardown) {
            (_, Err(fatal)) if fatal.is_fatal() => Err(fatal),
            (Err(err), Err(other)) => {
                tracing::error!(error = %other, "teardown failed after an earlier error");
                Err(err)
            }
            (Err(err), Ok(())) => Err(err),
            (Ok(()), res) => res,
        }
    }

    /// Stops the named subsystem (see [`SupervisedSubsystem::stop`]).
    pub fn stop(&self, name: &str) -> Result<(), SupervisorError> {
        self.find(name)?.stop();
        Ok(())
    }

    /// Resumes the named subsystem (see [`SupervisedSubsystem::start`]).
    pub fn start(&self, name: &str) -> Result<(), SupervisorError> {
        self.find(name)?.start();
        Ok(())
    }

    /// Terminates the named subsystem's restart loop; siblings are unaffected.
    pub fn terminate(&self, name: &str) -> Result<(), SupervisorError> {
        self.find(name)?.terminate();
        Ok(())
    }

    /// Status of every subsystem in registration order; empty before `initialize`.
    pub fn status(&self) -> Vec<SubsystemStatus> {
        self.supervised
            .get()
            .map(|subs| subs.iter().map(|s| s.status()).collect())
            .unwrap_or_default()
    }

    fn supervised(&self) -> Result<&[Arc<SupervisedSubsystem>], SupervisorError> {
        self.supervised
            .get()
            .map(Vec::as_slice)
            .ok_or(SupervisorError::NotInitialized)
    }

    fn find(&self, name: &str) -> Result<&Arc<SupervisedSubsystem>, SupervisorError> {
        self.supervised()?
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| SupervisorError::UnknownSubsystem {
                name: name.to_string(),
            })
    }

    async fn supervise(sub: Arc<SupervisedSubsystem>, token: CancellationToken) {
        match sub.run(token).await {
            Ok(()) => tracing::debug!(subsystem = sub.name(), "subsystem terminated"),
            Err(SubsystemError::Canceled) => {
                tracing::debug!(subsystem = sub.name(), "subsystem cancelled")
            }
            Err(err) => tracing::error!(
                subsystem = sub.name(),
                error = %err,
                label = err.as_label(),
                "subsystem failed permanently"
            ),
        }
    }

    async fn run_until_signal(&self, token: CancellationToken) -> Result<(), SupervisorError> {
        let run = self.run(token.clone());
        tokio::pin!(run);

        let finished = tokio::select! {
            res = &mut run => Some(res),
            signal = shutdown::wait_for_shutdown_signal() => {
                match signal {
                    Ok(name) => tracing::info!(signal = name, "shutdown signal received"),
                    Err(err) => {
                        tracing::error!(error = %err, "failed to listen for shutdown signals")
                    }
                }
                None
            }
        };
        let res = match finished {
            Some(res) => res,
            None => {
                token.cancel();
                run.await
            }
        };

        match res {
            Err(SupervisorError::Canceled) => Ok(()),
            other => other,
        }
    }

    async fn wait_all_with_grace(
        &self,
        set: &mut JoinSet<()>,
        handles: &[(String, AbortHandle)],
        started: SystemTime,
    ) -> Result<(), SupervisorError> {
        let grace = self.cfg.grace;
        let done = async {
            while let Some(joined) = set.join_next().await {
                if let Err(err) = joined {
                    if err.is_panic() {
                        tracing::error!(error = %err, "restart loop panicked");
                    }
                }
            }
        };
        let timed = tokio::time::timeout(grace, done).await;

        match timed {
            Ok(()) => {
                let hook = Hook::new(HookKind::AllTerminated, started)
                    .with_ended_at(self.clock.now());
                self.bus.dispatch(&hook).await;
                tracing::info!("all subsystems terminated");
                Err(SupervisorError::Canceled)
            }
            Err(_elapsed) => {
                let stuck = unfinished(handles);
                tracing::warn!(grace = ?grace, stuck = ?stuck, "shutdown grace exceeded");
                let hook = Hook::new(HookKind::GraceExceeded, started)
                    .with_ended_at(self.clock.now())
                    .with_reason(format!("stuck: {}", stuck.join(", ")));
                self.bus.dispatch(&hook).await;
                set.abort_all();
                Err(SupervisorError::GraceExceeded { grace, stuck })
            }
        }
    }
}

fn unfinished(handles: &[(String, AbortHandle)]) -> Vec<String> {
    handles
        .iter()
        .filter(|(_, h)| !h.is_finished())
        .map(|(name, _)| name.clone())
        .collect()
}
