// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::Node;
use std::collections::HashMap;

/// Represents an [OSM way](https://wiki.openstreetmap.org/wiki/Way).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Way {
    pub id: i64,
    pub nodes: Vec<i64>,
    pub tags: HashMap<String, String>,
}

/// [OSM features/elements](https://wiki.openstreetmap.org/wiki/Elements) relevant
/// for building a road network. Relations are skipped by the readers.
#[derive(Debug, Clone)]
pub enum Feature {
    Node(Node),
    Way(Way),
}
