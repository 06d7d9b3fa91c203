// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BinaryHeap, HashMap};

use crate::{Edge, Graph};

use super::{Route, RouteError};

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    at: i64,
    cost: f64,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // NOTE: We revert the order of comparison,
        // as lower costs are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.at.cmp(&self.at))
    }
}

fn reconstruct_path(came_from: &HashMap<i64, i64>, mut last: i64) -> Vec<i64> {
    let mut path = vec![last];

    while let Some(&nd) = came_from.get(&last) {
        path.push(nd);
        last = nd;
    }

    path.reverse();
    path
}

/// Uses [Dijkstra's algorithm](https://en.wikipedia.org/wiki/Dijkstra%27s_algorithm)
/// to find the shortest route between two nodes in the provided graph.
///
/// The search stops as soon as `to_id` is popped from the queue. If `to_id`
/// is unreachable, returns [Route::not_found]. Fails only if either node
/// does not exist in the graph.
pub fn shortest_path(g: &Graph, from_id: i64, to_id: i64) -> Result<Route, RouteError> {
    g.get_node(from_id)
        .ok_or(RouteError::InvalidReference(from_id))?;
    g.get_node(to_id)
        .ok_or(RouteError::InvalidReference(to_id))?;

    let mut queue: BinaryHeap<QueueItem> = BinaryHeap::default();
    let mut came_from: HashMap<i64, i64> = HashMap::default();
    let mut known_costs: HashMap<i64, f64> = HashMap::default();

    queue.push(QueueItem {
        at: from_id,
        cost: 0.0,
    });
    known_costs.insert(from_id, 0.0);

    while let Some(item) = queue.pop() {
        if item.at == to_id {
            return Ok(Route {
                nodes: reconstruct_path(&came_from, to_id),
                distance: item.cost,
            });
        }

        // Multiple items may be kept in the queue for the same node; skip outdated ones.
        if item.cost > known_costs.get(&item.at).cloned().unwrap_or(f64::INFINITY) {
            continue;
        }

        for &Edge {
            to: neighbor_id,
            cost: edge_cost,
        } in g.get_edges(item.at)
        {
            let neighbor_cost = item.cost + edge_cost;
            if neighbor_cost
                >= known_costs
                    .get(&neighbor_id)
                    .cloned()
                    .unwrap_or(f64::INFINITY)
            {
                continue;
            }

            came_from.insert(neighbor_id, item.at);
            known_costs.insert(neighbor_id, neighbor_cost);
            queue.push(QueueItem {
                at: neighbor_id,
                cost: neighbor_cost,
            });
        }
    }

    Ok(Route::not_found())
}
