// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Road network model over [OpenStreetMap](https://www.openstreetmap.org/) data.
//!
//! It converts OSM XML data into a weighted directed graph, indexes nodes for
//! nearest-node lookups and edges for bounding-box queries, persists the result
//! in a cache directory so that later startups skip parsing, and runs Dijkstra's
//! algorithm to find shortest paths between nodes. Damaged caches are detected,
//! purged and rebuilt from the source file.
//!
//! # Example
//!
//! ```no_run
//! let config = roadnet::Config::new("path/to/cambodia.osm", "path/to/cache");
//! let engine = roadnet::Engine::new(config);
//! let network = engine.initialize().expect("failed to load the road network");
//!
//! let route = network
//!     .route_distance(11.5564, 104.9282, 11.5625, 104.9160)
//!     .expect("failed to find route");
//! println!("{} m: {:?}", route.distance, route.path);
//!
//! let bbox = roadnet::BoundingBox::new(11.57, 11.55, 104.93, 104.91);
//! for segment in network.edges_in_region(&bbox).segments {
//!     println!("{} -> {}", segment.from.id, segment.to.id);
//! }
//! ```

pub mod cache;
mod config;
mod distance;
mod engine;
mod error;
mod graph;
mod kd;
mod network;
pub mod osm;
mod region;
mod route;

use serde::{Deserialize, Serialize};

pub use config::Config;
pub use distance::{earth_distance, EARTH_RADIUS};
pub use engine::Engine;
pub use error::Error;
pub use graph::Graph;
pub use kd::KDTree;
pub use network::{Origin, RegionEdges, RoadNetwork, RoadSegment, RouteSummary, TRAVEL_SPEEDS};
pub use region::{BoundingBox, RegionIndex};
pub use route::{shortest_path, Route, RouteError};

/// Identifier of a directed [Segment], assigned in insertion order starting at zero.
pub type EdgeId = u64;

/// Represents a point of the road network, as read from the source data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
}

/// Represents an outgoing (one-way) connection from a specific [Node].
///
/// `cost` is the great-circle distance between the two nodes, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub to: i64,
    pub cost: f64,
}

/// Entry of the edge table: a directed traversal between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub from: i64,
    pub to: i64,
    pub cost: f64,
}
