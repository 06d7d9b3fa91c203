// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Error conditions which may occur during [shortest_path](crate::shortest_path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteError {
    /// The start or end nodes don't exist in a graph.
    InvalidReference(i64),
}

impl std::fmt::Display for RouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidReference(node_id) => write!(f, "invalid node: {}", node_id),
        }
    }
}

impl std::error::Error for RouteError {}
