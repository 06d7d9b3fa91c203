// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::{EdgeId, Node};

/// Axis-aligned rectangle in lat-lon space. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Creates a bounding box from its four edges, in the order used by map viewports.
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Creates the smallest bounding box containing both positions.
    pub fn from_corners(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Self {
        Self {
            south: lat1.min(lat2),
            west: lon1.min(lon2),
            north: lat1.max(lat2),
            east: lon1.max(lon2),
        }
    }

    /// Creates the smallest bounding box containing both nodes.
    pub fn around(a: &Node, b: &Node) -> Self {
        Self::from_corners(a.lat, a.lon, b.lat, b.lon)
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.south <= other.north
            && other.south <= self.north
            && self.west <= other.east
            && other.west <= self.east
    }

    fn to_aabb(self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.south, self.west], [self.north, self.east])
    }
}

/// Entry of the [RegionIndex]: an edge id and the bounding box of its two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct EdgeBox {
    pub id: EdgeId,
    pub bbox: BoundingBox,
}

impl RTreeObject for EdgeBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.bbox.to_aabb()
    }
}

/// R-tree over the bounding boxes of all edges, answering "which edges may cross
/// this rectangle" queries.
///
/// Results are candidates: an edge whose box overlaps the query is returned even
/// if the segment itself passes beside the rectangle. No intersecting edge is ever
/// missed.
#[derive(Debug, Clone, Default)]
pub struct RegionIndex {
    tree: RTree<EdgeBox>,
}

impl RegionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes an edge between two nodes under the box spanned by its endpoints.
    pub fn insert(&mut self, id: EdgeId, from: &Node, to: &Node) {
        self.tree.insert(EdgeBox {
            id,
            bbox: BoundingBox::around(from, to),
        });
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Returns ids of all edges whose box intersects (or touches) `bbox`,
    /// in ascending order. The full candidate set is returned.
    pub fn intersecting(&self, bbox: &BoundingBox) -> Vec<EdgeId> {
        let mut ids: Vec<EdgeId> = self
            .tree
            .locate_in_envelope_intersecting(&bbox.to_aabb())
            .map(|e| e.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Returns all entries ordered by edge id.
    pub(crate) fn entries(&self) -> Vec<EdgeBox> {
        let mut entries: Vec<EdgeBox> = self.tree.iter().copied().collect();
        entries.sort_unstable_by_key(|e| e.id);
        entries
    }

    /// Rebuilds an index from stored entries with a bulk load.
    pub(crate) fn from_entries(entries: Vec<EdgeBox>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, lat: f64, lon: f64) -> Node {
        Node { id, lat, lon }
    }

    fn sample() -> RegionIndex {
        let a = node(1, 0.0, 0.0);
        let b = node(2, 0.0, 1.0);
        let c = node(3, 1.0, 1.0);
        let d = node(4, 5.0, 5.0);
        let e = node(5, 6.0, 6.0);

        let mut idx = RegionIndex::new();
        idx.insert(0, &a, &b);
        idx.insert(1, &b, &a);
        idx.insert(2, &b, &c);
        idx.insert(3, &d, &e);
        idx
    }

    #[test]
    fn query_single_edge() {
        let idx = sample();
        assert_eq!(idx.len(), 4);
        assert_eq!(
            idx.intersecting(&BoundingBox::from_corners(4.5, 4.5, 6.5, 6.5)),
            vec![3]
        );
    }

    #[test]
    fn query_returns_box_overlaps() {
        let idx = sample();
        // Crosses the box of the diagonal 3-4 edge, even though it does not touch the line itself
        assert_eq!(
            idx.intersecting(&BoundingBox::from_corners(5.8, 5.0, 5.9, 5.1)),
            vec![3]
        );
        assert_eq!(
            idx.intersecting(&BoundingBox::from_corners(-0.5, 0.5, 0.5, 1.5)),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn query_touching_boundary() {
        let idx = sample();
        assert_eq!(
            idx.intersecting(&BoundingBox::from_corners(1.0, 1.0, 2.0, 2.0)),
            vec![2]
        );
    }

    #[test]
    fn query_empty() {
        let idx = sample();
        assert!(idx
            .intersecting(&BoundingBox::from_corners(10.0, 10.0, 11.0, 11.0))
            .is_empty());
        assert!(RegionIndex::new()
            .intersecting(&BoundingBox::from_corners(0.0, 0.0, 1.0, 1.0))
            .is_empty());
    }

    #[test]
    fn entries_round_trip_through_bulk_load() {
        let idx = sample();
        let entries = idx.entries();
        assert_eq!(
            entries.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );

        let reloaded = RegionIndex::from_entries(entries.clone());
        assert_eq!(reloaded.entries(), entries);
        let probe = BoundingBox::from_corners(-0.5, 0.5, 0.5, 1.5);
        assert_eq!(reloaded.intersecting(&probe), idx.intersecting(&probe));
    }

    #[test]
    fn bounding_box() {
        let bbox = BoundingBox::new(2.0, 1.0, 4.0, 3.0);
        assert_eq!(bbox, BoundingBox::from_corners(2.0, 4.0, 1.0, 3.0));
        assert!(bbox.contains(1.5, 3.5));
        assert!(bbox.contains(2.0, 4.0));
        assert!(!bbox.contains(2.1, 3.5));
        assert!(bbox.intersects(&BoundingBox::from_corners(0.0, 0.0, 1.0, 3.0)));
        assert!(!bbox.intersects(&BoundingBox::from_corners(0.0, 0.0, 0.9, 3.0)));
    }
}
