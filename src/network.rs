// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use log::{error, info, warn};

use crate::cache::Cache;
use crate::osm::build_network;
use crate::{
    shortest_path, BoundingBox, Config, EdgeId, Error, Graph, KDTree, Node, RegionIndex, Route,
};

/// Default vehicle speeds, in km/h, for use with [RouteSummary::travel_minutes].
pub const TRAVEL_SPEEDS: [(&str, f64); 4] = [
    ("car", 60.0),
    ("motorcycle", 50.0),
    ("bicycle", 15.0),
    ("walking", 5.0),
];

/// Where the [RoadNetwork] was obtained from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Loaded from a valid cache.
    Cache,

    /// Built from the OSM source file.
    Source,
}

/// A directed edge together with the coordinates of its endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadSegment {
    pub id: EdgeId,
    pub from: Node,
    pub to: Node,

    /// Length of the edge in meters.
    pub cost: f64,
}

/// Result of a region query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionEdges {
    /// Candidate edges ordered by id.
    pub segments: Vec<RoadSegment>,

    /// Set if more candidates exist than were returned.
    pub truncated: bool,
}

/// Result of [RoadNetwork::route_distance].
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    /// Node closest to the requested start position.
    pub start: Node,

    /// Node closest to the requested end position.
    pub end: Node,

    /// Nodes of the route, empty if the end is unreachable.
    pub path: Vec<Node>,

    /// Length of the route in meters, infinite if the end is unreachable.
    pub distance: f64,
}

impl RouteSummary {
    pub fn is_found(&self) -> bool {
        !self.path.is_empty() && self.distance.is_finite()
    }

    pub fn distance_km(&self) -> f64 {
        self.distance / 1000.0
    }

    /// Estimated travel time at a constant speed.
    pub fn travel_minutes(&self, speed_kmh: f64) -> f64 {
        self.distance_km() / speed_kmh * 60.0
    }
}

/// Immutable, queryable road network: the graph, the region index over its
/// edges and the point index over its nodes.
///
/// All queries take `&self`, so a single instance can be shared between threads.
#[derive(Debug, Clone)]
pub struct RoadNetwork {
    graph: Graph,
    regions: RegionIndex,
    points: Option<KDTree>,
    origin: Origin,
    region_edge_limit: usize,
}

impl RoadNetwork {
    /// Loads the network from the cache directory, or builds it from the source file
    /// if the cache is missing or unusable. A freshly built network is saved to the cache;
    /// failing to do so is logged, but doesn't prevent the network from being used.
    ///
    /// If an unusable cache can't be deleted, fails with
    /// [CacheError::PurgeFailed](crate::cache::CacheError::PurgeFailed) without building.
    pub fn open(config: &Config) -> Result<Self, Error> {
        let cache = Cache::new(&config.cache_dir).with_retry(config.retry);

        let (graph, regions, origin) = match cache.load() {
            Ok((g, regions)) => (g, regions, Origin::Cache),
            Err(e) if e.requires_rebuild() => {
                info!("cache unavailable ({}), building from source", e);
                let (g, regions) = build_network(&config.profile, &config.source)?;
                if let Err(e) = cache.save(&g, &regions) {
                    error!("failed to save road network to cache: {}", e);
                }
                (g, regions, Origin::Source)
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self::from_parts(graph, regions, origin, config.region_edge_limit))
    }

    /// Unconditionally purges the cache, builds the network from the source file
    /// and saves it back to the cache.
    ///
    /// Like [RoadNetwork::open], this writes to the cache without locking;
    /// use [Engine::rebuild](crate::Engine::rebuild) to serialize it with other writers.
    pub fn rebuild(config: &Config) -> Result<Self, Error> {
        let cache = Cache::new(&config.cache_dir).with_retry(config.retry);
        cache.purge()?;
        let (g, regions) = build_network(&config.profile, &config.source)?;
        cache.save(&g, &regions)?;
        Ok(Self::from_parts(g, regions, Origin::Source, config.region_edge_limit))
    }

    /// Wraps an already built graph and region index. The point index is always
    /// built fresh from the nodes of the graph.
    pub fn from_parts(
        graph: Graph,
        regions: RegionIndex,
        origin: Origin,
        region_edge_limit: usize,
    ) -> Self {
        let points = KDTree::from_nodes(graph.iter().copied());
        Self {
            graph,
            regions,
            points,
            origin,
            region_edge_limit,
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn regions(&self) -> &RegionIndex {
        &self.regions
    }

    /// Finds the node closest to the given position.
    /// Fails with [Error::IndexUnavailable] if the network has no nodes.
    pub fn nearest_node(&self, lat: f64, lon: f64) -> Result<Node, Error> {
        self.points
            .as_ref()
            .map(|tree| tree.find_nearest_node(lat, lon))
            .ok_or(Error::IndexUnavailable)
    }

    /// Returns edges whose endpoint box intersects `bbox`, capped at the configured limit.
    ///
    /// These are candidates only: clipping them to the exact query shape is up to the caller.
    pub fn edges_in_region(&self, bbox: &BoundingBox) -> RegionEdges {
        let ids = self.regions.intersecting(bbox);
        let truncated = ids.len() > self.region_edge_limit;
        if truncated {
            warn!(
                "region query matched {} edges, returning the first {}",
                ids.len(),
                self.region_edge_limit
            );
        }

        RegionEdges {
            segments: self.segments(ids.into_iter().take(self.region_edge_limit)),
            truncated,
        }
    }

    /// Returns up to `limit` candidate edges intersecting `bbox`, skipping the first `offset`.
    /// Unlike [RoadNetwork::edges_in_region], the configured limit does not apply.
    pub fn edges_in_region_page(
        &self,
        bbox: &BoundingBox,
        offset: usize,
        limit: usize,
    ) -> Vec<RoadSegment> {
        self.segments(self.regions.intersecting(bbox).into_iter().skip(offset).take(limit))
    }

    fn segments<I: IntoIterator<Item = EdgeId>>(&self, ids: I) -> Vec<RoadSegment> {
        ids.into_iter()
            .filter_map(|id| {
                let s = self.graph.segment(id)?;
                Some(RoadSegment {
                    id,
                    from: self.graph.get_node(s.from)?,
                    to: self.graph.get_node(s.to)?,
                    cost: s.cost,
                })
            })
            .collect()
    }

    /// Finds the shortest route between two nodes.
    pub fn shortest_path(&self, start: i64, end: i64) -> Result<Route, Error> {
        Ok(shortest_path(&self.graph, start, end)?)
    }

    /// Snaps both positions to their nearest nodes and finds the shortest route between them.
    pub fn route_distance(
        &self,
        start_lat: f64,
        start_lon: f64,
        end_lat: f64,
        end_lon: f64,
    ) -> Result<RouteSummary, Error> {
        let start = self.nearest_node(start_lat, start_lon)?;
        let end = self.nearest_node(end_lat, end_lon)?;
        let route = self.shortest_path(start.id, end.id)?;

        Ok(RouteSummary {
            start,
            end,
            path: route
                .nodes
                .iter()
                .filter_map(|&id| self.graph.get_node(id))
                .collect(),
            distance: route.distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    use super::*;
    use crate::cache::{CacheError, RetryPolicy};
    use crate::osm::BuildError;
    use crate::RouteError;

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr) => {
            assert!(
                (($a - $b).abs() < 1e-6),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    const SIMPLE_XML: &[u8] = include_bytes!("osm/reader/test_fixtures/simple.osm");

    fn config(dir: &Path) -> Config {
        let source = dir.join("simple.osm");
        fs::write(&source, SIMPLE_XML).unwrap();
        let mut config = Config::new(source, dir.join("cache"));
        config.retry = RetryPolicy {
            attempts: 2,
            backoff: Duration::ZERO,
        };
        config
    }

    fn ids(segments: &[RoadSegment]) -> Vec<EdgeId> {
        segments.iter().map(|s| s.id).collect()
    }

    #[test]
    fn builds_then_loads_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let built = RoadNetwork::open(&config).unwrap();
        assert_eq!(built.origin(), Origin::Source);
        assert!(config.cache_dir.join("road_graph.bin").is_file());

        let loaded = RoadNetwork::open(&config).unwrap();
        assert_eq!(loaded.origin(), Origin::Cache);
        assert_eq!(loaded.graph(), built.graph());

        for &(lat, lon) in &[(11.5501, 104.9201), (11.5525, 104.923), (11.549, 104.919)] {
            assert_eq!(
                loaded.nearest_node(lat, lon).unwrap(),
                built.nearest_node(lat, lon).unwrap()
            );
        }
        let bbox = BoundingBox::new(11.5531, 11.5519, 104.9235, 104.9225);
        assert_eq!(loaded.edges_in_region(&bbox), built.edges_in_region(&bbox));
    }

    #[test]
    fn cache_survives_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        RoadNetwork::open(&config).unwrap();

        fs::remove_file(&config.source).unwrap();
        assert_eq!(RoadNetwork::open(&config).unwrap().origin(), Origin::Cache);
    }

    #[test]
    fn rebuilds_after_index_file_loss() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let built = RoadNetwork::open(&config).unwrap();

        let index_dir = config.cache_dir.join("region_index");
        fs::remove_file(index_dir.join("index.idx")).unwrap();

        let rebuilt = RoadNetwork::open(&config).unwrap();
        assert_eq!(rebuilt.origin(), Origin::Source);
        assert_eq!(rebuilt.graph(), built.graph());
        assert!(index_dir.join("index.dat").is_file());
        assert!(index_dir.join("index.idx").is_file());

        assert_eq!(RoadNetwork::open(&config).unwrap().origin(), Origin::Cache);
    }

    #[test]
    fn rebuilds_after_graph_damage() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        RoadNetwork::open(&config).unwrap();

        let graph_path = config.cache_dir.join("road_graph.bin");
        let mut data = fs::read(&graph_path).unwrap();
        data.truncate(data.len() / 2);
        fs::write(&graph_path, data).unwrap();

        assert_eq!(RoadNetwork::open(&config).unwrap().origin(), Origin::Source);
    }

    #[test]
    fn failed_purge_stops_construction() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        RoadNetwork::open(&config).unwrap();

        let graph_path = config.cache_dir.join("road_graph.bin");
        fs::remove_file(&graph_path).unwrap();
        fs::create_dir(&graph_path).unwrap();
        fs::write(graph_path.join("stray"), b"x").unwrap();

        // Building from a missing source would fail differently, so a PurgeFailed
        // result shows that no build was attempted
        fs::remove_file(&config.source).unwrap();
        config.retry.attempts = 3;

        match RoadNetwork::open(&config) {
            Err(Error::Cache(CacheError::PurgeFailed { attempts, .. })) => assert_eq!(attempts, 3),
            other => panic!("expected failed purge, got {:?}", other.map(|_| ())),
        }

        // The index files were never reached, so nothing was written over them either
        let index_dir = config.cache_dir.join("region_index");
        assert!(index_dir.join("index.dat").is_file());
        assert!(index_dir.join("index.idx").is_file());
    }

    #[test]
    fn missing_source_without_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.source = dir.path().join("missing.osm");

        assert!(matches!(
            RoadNetwork::open(&config),
            Err(Error::Build(BuildError::SourceNotFound(_)))
        ));
    }

    #[test]
    fn unsupported_source_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.source = dir.path().join("simple.osm.pbf");
        fs::write(&config.source, SIMPLE_XML).unwrap();

        assert!(matches!(
            RoadNetwork::open(&config),
            Err(Error::Build(BuildError::UnsupportedFormat(_)))
        ));
    }

    #[test]
    fn rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let built = RoadNetwork::open(&config).unwrap();

        let rebuilt = RoadNetwork::rebuild(&config).unwrap();
        assert_eq!(rebuilt.origin(), Origin::Source);
        assert_eq!(rebuilt.graph(), built.graph());
        assert_eq!(RoadNetwork::open(&config).unwrap().origin(), Origin::Cache);
    }

    #[test]
    fn nearest_node() {
        let dir = tempfile::tempdir().unwrap();
        let n = RoadNetwork::open(&config(dir.path())).unwrap();

        assert_eq!(n.nearest_node(11.5501, 104.9201).unwrap().id, 1);
        assert_eq!(n.nearest_node(11.5514, 104.9209).unwrap().id, 3);
        assert_eq!(n.nearest_node(11.5489, 104.9189).unwrap().id, 7);
    }

    #[test]
    fn empty_network_has_no_index() {
        let n = RoadNetwork::from_parts(Graph::default(), RegionIndex::new(), Origin::Source, 100);
        assert!(matches!(
            n.nearest_node(0.0, 0.0),
            Err(Error::IndexUnavailable)
        ));
        assert!(matches!(
            n.route_distance(0.0, 0.0, 1.0, 1.0),
            Err(Error::IndexUnavailable)
        ));
    }

    #[test]
    fn edges_in_region() {
        let dir = tempfile::tempdir().unwrap();
        let n = RoadNetwork::open(&config(dir.path())).unwrap();

        let result = n.edges_in_region(&BoundingBox::new(11.5514, 11.5511, 104.9209, 104.9201));
        assert!(!result.truncated);
        assert_eq!(ids(&result.segments), vec![4]);
        assert_eq!(result.segments[0].from.id, 3);
        assert_eq!(result.segments[0].to.id, 4);
        assert_almost_eq!(result.segments[0].cost, n.graph().get_edge(3, 4));

        let empty = n.edges_in_region(&BoundingBox::new(10.0, 9.0, 101.0, 100.0));
        assert!(empty.segments.is_empty());
        assert!(!empty.truncated);
    }

    #[test]
    fn edges_in_region_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.region_edge_limit = 1;
        let n = RoadNetwork::open(&config).unwrap();
        let bbox = BoundingBox::new(11.5531, 11.5519, 104.9235, 104.9225);

        let result = n.edges_in_region(&bbox);
        assert!(result.truncated);
        assert_eq!(ids(&result.segments), vec![7]);

        assert_eq!(ids(&n.edges_in_region_page(&bbox, 0, 10)), vec![7, 8]);
        assert_eq!(ids(&n.edges_in_region_page(&bbox, 1, 10)), vec![8]);
        assert!(n.edges_in_region_page(&bbox, 2, 10).is_empty());
    }

    #[test]
    fn route_distance() {
        let dir = tempfile::tempdir().unwrap();
        let n = RoadNetwork::open(&config(dir.path())).unwrap();
        let g = n.graph();

        // 3 -> 4 -> 1 is shorter than 3 -> 2 -> 1
        let summary = n.route_distance(11.5514, 104.9209, 11.5501, 104.9201).unwrap();
        assert_eq!(summary.start.id, 3);
        assert_eq!(summary.end.id, 1);
        assert_eq!(
            summary.path.iter().map(|n| n.id).collect::<Vec<_>>(),
            vec![3, 4, 1]
        );
        assert_almost_eq!(summary.distance, g.get_edge(3, 4) + g.get_edge(4, 1));
        assert!(summary.is_found());

        // One-way 3 -> 4 can't be used backwards
        let back = n.route_distance(11.5501, 104.9201, 11.5514, 104.9209).unwrap();
        assert_eq!(
            back.path.iter().map(|n| n.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn route_between_components() {
        let dir = tempfile::tempdir().unwrap();
        let n = RoadNetwork::open(&config(dir.path())).unwrap();

        let summary = n.route_distance(11.5501, 104.9201, 11.553, 104.923).unwrap();
        assert_eq!(summary.end.id, 6);
        assert!(summary.path.is_empty());
        assert!(summary.distance.is_infinite());
        assert!(!summary.is_found());
    }

    #[test]
    fn shortest_path_invalid_reference() {
        let dir = tempfile::tempdir().unwrap();
        let n = RoadNetwork::open(&config(dir.path())).unwrap();

        assert!(matches!(
            n.shortest_path(1, 12345),
            Err(Error::Route(RouteError::InvalidReference(12345)))
        ));
        // Network stays usable
        assert_eq!(n.shortest_path(1, 1).unwrap().nodes, vec![1]);
    }

    #[test]
    fn travel_time() {
        let summary = RouteSummary {
            start: Node {
                id: 1,
                lat: 0.0,
                lon: 0.0,
            },
            end: Node {
                id: 2,
                lat: 0.0,
                lon: 0.1,
            },
            path: Vec::default(),
            distance: 15_000.0,
        };
        assert_almost_eq!(summary.distance_km(), 15.0);
        assert_almost_eq!(summary.travel_minutes(60.0), 15.0);

        let (_, bicycle) = TRAVEL_SPEEDS[2];
        assert_almost_eq!(summary.travel_minutes(bicycle), 60.0);
    }
}
