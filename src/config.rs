// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use crate::cache::RetryPolicy;
use crate::osm::Profile;

/// Default cap on the number of edges returned by a single region query.
pub const DEFAULT_REGION_EDGE_LIMIT: usize = 100;

/// Everything needed to construct a [RoadNetwork](crate::RoadNetwork).
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the OSM XML file (`.osm`, `.osm.gz` or `.osm.bz2`).
    pub source: PathBuf,

    /// Directory holding the persisted graph blob and region index.
    pub cache_dir: PathBuf,

    /// Tag vocabulary used to recognize roads and one-way streets.
    pub profile: Profile,

    /// Retry policy for deleting damaged cache files.
    pub retry: RetryPolicy,

    /// Maximum number of edges returned by [edges_in_region](crate::RoadNetwork::edges_in_region).
    pub region_edge_limit: usize,
}

impl Config {
    pub fn new<S: Into<PathBuf>, C: Into<PathBuf>>(source: S, cache_dir: C) -> Self {
        Self {
            source: source.into(),
            cache_dir: cache_dir.into(),
            profile: Profile::default(),
            retry: RetryPolicy::default(),
            region_edge_limit: DEFAULT_REGION_EDGE_LIMIT,
        }
    }
}
