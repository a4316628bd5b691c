//! Plugin scheduler and manager.
//!
//! The manager owns the registered plugins, runs one independent tokio task
//! per plugin, and keeps the last successfully collected record of each
//! plugin in a snapshot cache.
//!
//! Each scheduling loop goes through `Registered → Starting → Running →
//! Stopping → Stopped` (or `Failed` when `start` fails). A loop collects once
//! immediately after a successful start, then on every interval tick until the
//! shared shutdown signal fires.

use ahash::AHashMap as HashMap;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::metrics::{AgentMetrics, ReporterObserver};
use crate::plugin::Plugin;
use crate::plugins::builtin_plugins;
use crate::record::Record;
use crate::reporter::{build_reporter, MultiReporter};

/// Lifecycle state of one plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginState {
    Registered,
    Starting,
    Running,
    Stopping,
    Stopped,
    /// `start` failed; the plugin stays inert until the process restarts.
    Failed,
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PluginState::Registered => "registered",
            PluginState::Starting => "starting",
            PluginState::Running => "running",
            PluginState::Stopping => "stopping",
            PluginState::Stopped => "stopped",
            PluginState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of one registered plugin.
#[derive(Debug, Clone, Serialize)]
pub struct PluginStatus {
    pub name: String,
    pub state: PluginState,
    pub interval_secs: u64,
    pub has_snapshot: bool,
}

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("plugin '{0}' is already registered")]
    DuplicatePlugin(String),
}

type SnapshotCache = Arc<Mutex<HashMap<String, Record>>>;
type StateTable = Arc<Mutex<HashMap<String, PluginState>>>;

/// Shared handles cloned into every scheduling task.
#[derive(Clone)]
struct LoopContext {
    config: Arc<Config>,
    reporter: Arc<MultiReporter>,
    metrics: AgentMetrics,
    cache: SnapshotCache,
    states: StateTable,
    collect_timeout: Duration,
}

impl LoopContext {
    fn set_state(&self, plugin: &str, state: PluginState) {
        if let Ok(mut states) = self.states.lock() {
            states.insert(plugin.to_string(), state);
        }
    }
}

/// Owns the plugin set, the scheduling loops and the snapshot cache.
pub struct PluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
    ctx: LoopContext,
    query_from_memory: bool,
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl PluginManager {
    /// Creates a manager whose reporter is built from the `[[write]]` entries
    /// and observed by the reporter counters.
    pub fn new(config: Arc<Config>, metrics: AgentMetrics) -> Self {
        let reporter = build_reporter(&config.write, config.report_timeout())
            .with_observer(Arc::new(ReporterObserver::new(metrics.clone())));
        Self::with_reporter(config, reporter, metrics)
    }

    /// Creates a manager around an already constructed reporter.
    pub fn with_reporter(config: Arc<Config>, reporter: MultiReporter, metrics: AgentMetrics) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let query_from_memory = config.query_from_memory;
        let collect_timeout = config.collect_timeout();

        Self {
            plugins: Vec::new(),
            ctx: LoopContext {
                config,
                reporter: Arc::new(reporter),
                metrics,
                cache: Arc::new(Mutex::new(HashMap::new())),
                states: Arc::new(Mutex::new(HashMap::new())),
                collect_timeout,
            },
            query_from_memory,
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Registers the built-in plugins, skipping those disabled in config.
    pub fn register_plugins(&mut self) -> Result<(), ManagerError> {
        for plugin in builtin_plugins() {
            if !self.ctx.config.plugin_enabled(plugin.name()) {
                info!(plugin = %plugin.name(), "Plugin disabled in configuration, skipping");
                continue;
            }
            self.register_plugin(plugin)?;
        }
        Ok(())
    }

    /// Registers one plugin. Names must be unique.
    pub fn register_plugin(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), ManagerError> {
        let name = plugin.name().to_string();
        if self.plugins.iter().any(|p| p.name() == name) {
            return Err(ManagerError::DuplicatePlugin(name));
        }
        self.ctx.set_state(&name, PluginState::Registered);
        debug!(plugin = %name, "Plugin registered");
        self.plugins.push(plugin);
        Ok(())
    }

    /// Launches one scheduling loop per registered plugin and returns at once.
    ///
    /// Only the first call has an effect; plugins cannot be restarted.
    pub fn start_plugins(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Plugins already started, ignoring repeated start");
            return;
        }
        // Held across the spawns so a concurrent stop_plugins sees every handle
        let Ok(mut handles) = self.handles.lock() else {
            error!("Plugin handle table poisoned, not starting plugins");
            return;
        };
        if *self.shutdown_tx.borrow() {
            warn!("Manager already stopped, not starting plugins");
            return;
        }

        for plugin in &self.plugins {
            let ctx = self.ctx.clone();
            let plugin = Arc::clone(plugin);
            let shutdown = self.shutdown_tx.subscribe();
            handles.push(tokio::spawn(run_plugin(ctx, plugin, shutdown)));
        }

        info!("Started {} plugin loops", handles.len());
    }

    /// Returns the current per-plugin data.
    ///
    /// In memory mode this is the snapshot cache, in registration order,
    /// without triggering any collection. Otherwise every plugin is collected
    /// concurrently; failures are logged and dropped. The live path neither
    /// reports nor updates the cache.
    #[instrument(skip(self))]
    pub async fn get_plugins_data(&self) -> Vec<Record> {
        if self.query_from_memory {
            return self.cached_data();
        }

        let deadline = self.ctx.collect_timeout;
        let handles: Vec<_> = self
            .plugins
            .iter()
            .map(|plugin| {
                let plugin = Arc::clone(plugin);
                tokio::spawn(async move {
                    let result = tokio::time::timeout(deadline, plugin.collect()).await;
                    (plugin, result)
                })
            })
            .collect();

        let mut data = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok((_, Ok(Ok(record)))) => data.push(record),
                Ok((plugin, Ok(Err(e)))) => {
                    warn!(plugin = %plugin.name(), error = %e, "Failed to collect data from plugin");
                }
                Ok((plugin, Err(_))) => {
                    warn!(plugin = %plugin.name(), timeout = ?deadline, "Plugin collection timed out");
                }
                Err(e) => error!(error = %e, "Live collection task failed"),
            }
        }
        data
    }

    /// Snapshot cache contents in registration order.
    pub fn cached_data(&self) -> Vec<Record> {
        let Ok(cache) = self.ctx.cache.lock() else {
            return Vec::new();
        };
        self.plugins
            .iter()
            .filter_map(|p| cache.get(p.name()).cloned())
            .collect()
    }

    /// Signals every scheduling loop to stop and waits until all of them have
    /// called their plugin's `stop` and exited.
    ///
    /// Safe to call more than once; later calls return immediately.
    pub async fn stop_plugins(&self) {
        self.shutdown_tx.send_replace(true);

        let handles: Vec<JoinHandle<()>> = self
            .handles
            .lock()
            .map(|mut handles| std::mem::take(&mut *handles))
            .unwrap_or_default();

        if handles.is_empty() {
            debug!("No plugin loops to stop");
            return;
        }

        info!("Stopping {} plugin loops", handles.len());
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Plugin loop terminated abnormally");
            }
        }
        info!("All plugin loops stopped");
    }

    /// Lifecycle state of every registered plugin, in registration order.
    pub fn plugin_states(&self) -> Vec<PluginStatus> {
        let states = self
            .ctx
            .states
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default();
        let cached: Vec<String> = self
            .ctx
            .cache
            .lock()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();

        self.plugins
            .iter()
            .map(|p| {
                let name = p.name().to_string();
                PluginStatus {
                    state: states
                        .get(&name)
                        .copied()
                        .unwrap_or(PluginState::Registered),
                    interval_secs: self.ctx.config.report_interval(&name).as_secs(),
                    has_snapshot: cached.contains(&name),
                    name,
                }
            })
            .collect()
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn report_interval(&self, plugin_name: &str) -> Duration {
        self.ctx.config.report_interval(plugin_name)
    }

    pub fn query_from_memory(&self) -> bool {
        self.query_from_memory
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn reporter(&self) -> &MultiReporter {
        &self.ctx.reporter
    }
}

/// Scheduling loop of one plugin.
async fn run_plugin(ctx: LoopContext, plugin: Arc<dyn Plugin>, mut shutdown: watch::Receiver<bool>) {
    let name = plugin.name().to_string();

    ctx.set_state(&name, PluginState::Starting);
    if let Err(e) = plugin.start().await {
        error!(plugin = %name, error = %e, "Failed to start plugin");
        ctx.set_state(&name, PluginState::Failed);
        return;
    }
    ctx.set_state(&name, PluginState::Running);

    // First cycle runs immediately, not after one interval
    collect_and_report(&ctx, &plugin).await;

    let interval = ctx.config.report_interval(&name);
    info!(plugin = %name, interval_secs = interval.as_secs(), "Plugin running");

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => break,
            _ = ticker.tick() => collect_and_report(&ctx, &plugin).await,
        }
    }

    ctx.set_state(&name, PluginState::Stopping);
    if let Err(e) = plugin.stop().await {
        error!(plugin = %name, error = %e, "Failed to stop plugin");
    }
    ctx.set_state(&name, PluginState::Stopped);
    info!(plugin = %name, "Plugin stopped");
}

/// One collect → report → cache cycle. Collection failures skip the cycle;
/// report failures are logged and do not block the cache update.
///
/// `collect` runs in its own task so a panicking plugin only fails the cycle.
async fn collect_and_report(ctx: &LoopContext, plugin: &Arc<dyn Plugin>) {
    let name = plugin.name();

    let mut task = {
        let plugin = Arc::clone(plugin);
        tokio::spawn(async move { plugin.collect().await })
    };

    let record = match tokio::time::timeout(ctx.collect_timeout, &mut task).await {
        Ok(Ok(Ok(record))) => record,
        Ok(Ok(Err(e))) => {
            warn!(plugin = %name, error = %e, "Failed to collect data from plugin");
            ctx.metrics.increment_collect_failures(name);
            return;
        }
        Ok(Err(e)) => {
            error!(plugin = %name, error = %e, "Plugin collection panicked");
            ctx.metrics.increment_collect_failures(name);
            return;
        }
        Err(_) => {
            task.abort();
            warn!(plugin = %name, timeout = ?ctx.collect_timeout, "Plugin collection timed out");
            ctx.metrics.increment_collect_failures(name);
            return;
        }
    };
    debug!(plugin = %name, fields = record.len(), "Collected data");

    if let Err(e) = ctx.reporter.report(&record).await {
        warn!(plugin = %name, error = %e, "Failed to report data");
    }
    ctx.metrics.increment_plugin_runs(name);

    if let Ok(mut cache) = ctx.cache.lock() {
        cache.insert(name.to_string(), record);
    }
}

/// Resolves once the shutdown flag is set or the sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let stopped = *shutdown.borrow_and_update();
        if stopped {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
