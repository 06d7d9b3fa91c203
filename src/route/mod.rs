// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

mod dijkstra;
mod error;

pub use dijkstra::shortest_path;
pub use error::RouteError;

/// Result of a shortest path search.
///
/// A search between disconnected nodes is not an error: it produces an empty
/// `nodes` sequence with an infinite `distance`.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Node ids from the start to the end, inclusive.
    pub nodes: Vec<i64>,

    /// Sum of edge costs along `nodes`, in meters.
    pub distance: f64,
}

impl Route {
    pub fn not_found() -> Self {
        Self {
            nodes: Vec::default(),
            distance: f64::INFINITY,
        }
    }

    /// Returns true if a route exists.
    pub fn is_found(&self) -> bool {
        !self.nodes.is_empty() && self.distance.is_finite()
    }
}
