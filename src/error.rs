// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::cache::CacheError;
use crate::osm::BuildError;
use crate::RouteError;

/// Error conditions which may occur when constructing or querying a road network.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("build: {0}")]
    Build(#[from] BuildError),

    #[error("cache: {0}")]
    Cache(#[from] CacheError),

    #[error("route: {0}")]
    Route(#[from] RouteError),

    /// A query was made against a network which was never successfully constructed,
    /// or which has no nodes to search.
    #[error("road network index is unavailable")]
    IndexUnavailable,

    /// A rebuild was requested from an engine which already holds a network.
    #[error("road network is already initialized")]
    AlreadyInitialized,
}
