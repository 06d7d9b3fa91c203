// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::sync::{Mutex, MutexGuard, OnceLock};

use log::info;

use crate::cache::Cache;
use crate::{Config, Error, RoadNetwork};

/// Owning context of a [RoadNetwork], constructed once at startup and shared
/// by reference with everything that answers queries.
///
/// The network is built or loaded at most once. Initialization, [Engine::rebuild]
/// and [Engine::purge] are serialized with a lock, which keeps cache saves and purges
/// from running concurrently; queries against an initialized network take no locks.
///
/// The lock is held by the engine, so a process should own a single engine
/// per cache directory and not touch that directory through [Cache] directly.
#[derive(Debug)]
pub struct Engine {
    config: Config,
    network: OnceLock<RoadNetwork>,
    init_lock: Mutex<()>,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            network: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Loads or builds the road network, unless that has already succeeded,
    /// and returns it. Repeated calls return the same instance.
    ///
    /// On failure the engine stays uninitialized, and the call may be retried.
    pub fn initialize(&self) -> Result<&RoadNetwork, Error> {
        if let Some(network) = self.network.get() {
            return Ok(network);
        }

        let _guard = self.lock();
        if let Some(network) = self.network.get() {
            return Ok(network);
        }

        self.publish(RoadNetwork::open(&self.config)?)
    }

    /// Initializes the engine with a network built from source, discarding the cache first.
    /// Fails with [Error::AlreadyInitialized] if the engine already holds a network.
    pub fn rebuild(&self) -> Result<&RoadNetwork, Error> {
        let _guard = self.lock();
        if self.network.get().is_some() {
            return Err(Error::AlreadyInitialized);
        }

        self.publish(RoadNetwork::rebuild(&self.config)?)
    }

    /// Deletes the cache files, under the same lock as initialization.
    /// An already initialized network stays in memory and remains usable.
    pub fn purge(&self) -> Result<(), Error> {
        let _guard = self.lock();
        Cache::new(&self.config.cache_dir)
            .with_retry(self.config.retry)
            .purge()?;
        Ok(())
    }

    // A panic while holding the lock leaves nothing half-initialized,
    // as a network is only published after it is fully constructed.
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.init_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, network: RoadNetwork) -> Result<&RoadNetwork, Error> {
        info!(
            "road network ready: {} nodes, {} edges ({:?})",
            network.graph().len(),
            network.graph().segment_count(),
            network.origin()
        );
        Ok(self.network.get_or_init(|| network))
    }

    /// Returns the initialized road network, or [Error::IndexUnavailable]
    /// if [Engine::initialize] has not succeeded yet.
    pub fn network(&self) -> Result<&RoadNetwork, Error> {
        self.network.get().ok_or(Error::IndexUnavailable)
    }

    pub fn is_initialized(&self) -> bool {
        self.network.get().is_some()
    }
}
