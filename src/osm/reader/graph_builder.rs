// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use log::{debug, info};

use crate::osm::Profile;
use crate::{earth_distance, Graph, Node, RegionIndex};

use super::model;

/// Helper object used for storing state related to converting [OSM features](super::model::Feature)
/// into a [Graph] and the matching [RegionIndex].
pub(super) struct NetworkBuilder<'a> {
    g: Graph,
    regions: RegionIndex,
    profile: &'a Profile,
    roads: usize,
    dangling: usize,
}

impl<'a> NetworkBuilder<'a> {
    /// Create a new, empty network builder.
    pub(super) fn new(profile: &'a Profile) -> Self {
        Self {
            g: Graph::default(),
            regions: RegionIndex::new(),
            profile,
            roads: 0,
            dangling: 0,
        }
    }

    /// Add all features from the provided stream and return the finished network.
    /// The first read error aborts the build; no partial network is returned.
    pub(super) fn add_features<I, E>(mut self, features: I) -> Result<(Graph, RegionIndex), E>
    where
        I: IntoIterator<Item = Result<model::Feature, E>>,
    {
        for f in features {
            self.add_feature(f?);
        }

        info!(
            "built road network: {} nodes, {} roads, {} directed edges",
            self.g.len(),
            self.roads,
            self.g.segment_count()
        );
        if self.dangling > 0 {
            info!(
                "skipped {} road segments referencing unknown nodes",
                self.dangling
            );
        }

        debug_assert_eq!(self.g.segment_count(), self.regions.len());
        Ok((self.g, self.regions))
    }

    fn add_feature(&mut self, f: model::Feature) {
        match f {
            model::Feature::Node(n) => self.g.insert_node(n),
            model::Feature::Way(w) => self.add_way(w),
        }
    }

    fn add_way(&mut self, w: model::Way) {
        if !self.profile.is_road(&w.tags) {
            return;
        }
        self.roads += 1;

        let (forward, backward) = self.profile.way_direction(&w.tags);

        for pair in w.nodes.windows(2) {
            let (left, right) = match (self.g.get_node(pair[0]), self.g.get_node(pair[1])) {
                (Some(left), Some(right)) => (left, right),
                _ => {
                    debug!(
                        "way {}: skipping segment {} -> {} with an unknown node",
                        w.id, pair[0], pair[1]
                    );
                    self.dangling += 1;
                    continue;
                }
            };

            let cost = earth_distance(left.lat, left.lon, right.lat, right.lon);

            if forward {
                self.add_segment(&left, &right, cost);
            }
            if backward {
                self.add_segment(&right, &left, cost);
            }
        }
    }

    /// Appends a directed segment to the graph and indexes it under the same id.
    fn add_segment(&mut self, from: &Node, to: &Node, cost: f64) {
        if let Some(id) = self.g.add_segment(from.id, to.id, cost) {
            self.regions.insert(id, from, to);
        }
    }
}
