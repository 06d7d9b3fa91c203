// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

/// Describes which OSM ways are roads, and how their direction is tagged.
///
/// Tagging conventions differ between datasets, so the whole vocabulary is
/// configurable. [Profile::default] follows the common OSM convention:
/// any way with a `highway` tag is a road, and `oneway=yes|true|1`
/// makes it traversable forward only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Key of the road-classification tag (e.g. "highway").
    /// Ways without this tag are not roads and are discarded.
    pub road_key: String,

    /// Values of [Profile::road_key] accepted as roads, e.g. "primary" or "residential".
    /// If empty, any value is accepted.
    pub road_values: Vec<String>,

    /// Key of the one-way tag (e.g. "oneway").
    pub oneway_key: String,

    /// Values of [Profile::oneway_key] which make a way traversable forward only.
    pub oneway_values: Vec<String>,

    /// Values of [Profile::oneway_key] which make a way traversable backward only,
    /// e.g. "-1". Empty by default.
    pub reverse_values: Vec<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            road_key: "highway".to_string(),
            road_values: Vec::default(),
            oneway_key: "oneway".to_string(),
            oneway_values: vec!["yes".to_string(), "true".to_string(), "1".to_string()],
            reverse_values: Vec::default(),
        }
    }
}

impl Profile {
    /// Checks if a way with given tags carries an accepted road-classification tag.
    pub fn is_road(&self, tags: &HashMap<String, String>) -> bool {
        match tags.get(&self.road_key) {
            Some(value) => self.road_values.is_empty() || self.road_values.contains(value),
            None => false,
        }
    }

    /// Checks if a way is traversable forward (first return value) and
    /// backwards (second return value) by investigating its one-way tag.
    ///
    /// Values matching neither [Profile::oneway_values] nor [Profile::reverse_values]
    /// (including a missing tag) leave the way traversable in both directions.
    pub fn way_direction(&self, tags: &HashMap<String, String>) -> (bool, bool) {
        match tags.get(&self.oneway_key) {
            Some(v) if self.oneway_values.contains(v) => (true, false),
            Some(v) if self.reverse_values.contains(v) => (false, true),
            _ => (true, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! tags {
        {} => { HashMap::default() };
        {$( $k:literal : $v:literal ),+} => {
            HashMap::from_iter([ $( ($k.to_string(), $v.to_string()) ),+ ])
        };
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn is_road() {
        let p = Profile::default();
        assert!(p.is_road(&tags! {"highway": "residential"}));
        assert!(p.is_road(&tags! {"highway": "footway", "oneway": "yes"}));
        assert!(!p.is_road(&tags! {"building": "yes"}));
        assert!(!p.is_road(&tags! {}));
    }

    #[test]
    fn is_road_with_restricted_values() {
        let p = Profile {
            road_values: strings(&["primary", "secondary"]),
            ..Profile::default()
        };
        assert!(p.is_road(&tags! {"highway": "primary"}));
        assert!(!p.is_road(&tags! {"highway": "footway"}));
    }

    #[test]
    fn way_direction() {
        let p = Profile::default();
        assert_eq!(p.way_direction(&tags! {"highway": "path"}), (true, true));
        assert_eq!(
            p.way_direction(&tags! {"highway": "path", "oneway": "yes"}),
            (true, false),
        );
        assert_eq!(
            p.way_direction(&tags! {"highway": "path", "oneway": "true"}),
            (true, false),
        );
        assert_eq!(
            p.way_direction(&tags! {"highway": "path", "oneway": "1"}),
            (true, false),
        );
        assert_eq!(
            p.way_direction(&tags! {"highway": "path", "oneway": "no"}),
            (true, true),
        );
        assert_eq!(
            p.way_direction(&tags! {"highway": "path", "oneway": "-1"}),
            (true, true),
        );
    }

    #[test]
    fn way_direction_custom_vocabulary() {
        let p = Profile {
            oneway_key: "direction".to_string(),
            oneway_values: strings(&["forward"]),
            reverse_values: strings(&["-1", "reverse"]),
            ..Profile::default()
        };
        assert_eq!(
            p.way_direction(&tags! {"highway": "path", "direction": "forward"}),
            (true, false),
        );
        assert_eq!(
            p.way_direction(&tags! {"highway": "path", "direction": "-1"}),
            (false, true),
        );
        assert_eq!(
            p.way_direction(&tags! {"highway": "path", "oneway": "yes"}),
            (true, true),
        );
    }
}
