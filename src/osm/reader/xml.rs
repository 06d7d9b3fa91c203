// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::io;
use std::str::from_utf8;

use log::debug;
use quick_xml::events::{BytesStart, Event};

use super::model;
use crate::Node;

/// Streams OSM features from a buffered reader.
pub(super) fn features_from_io<R: io::BufRead>(
    reader: R,
) -> impl Iterator<Item = Result<model::Feature, quick_xml::Error>> {
    Reader::from_io(reader)
}

/// Streams OSM features from an in-memory buffer.
pub(super) fn features_from_buffer(
    b: &[u8],
) -> impl Iterator<Item = Result<model::Feature, quick_xml::Error>> + '_ {
    Reader::from_buffer(b)
}

/// Parser is a trait for objects which can parse XML.
///
/// This trait only exists to fix the mismatch of
/// [quick_xml::Reader::read_event] when working on buffered data
/// and [quick_xml::Reader::read_event_into] when working on IO.
trait Parser {
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>>;
    fn position(&self) -> u64;
}

/// IoParser implements [Parser] over an [std::io::BufRead].
struct IoParser<R: io::BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: io::BufRead> IoParser<R> {
    #[inline]
    fn new(reader: R) -> Self {
        Self(quick_xml::Reader::from_reader(reader), Vec::default())
    }
}

impl<R: io::BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<Event<'a>> {
        self.1.clear();
        self.0.read_event_into(&mut self.1)
    }

    #[inline]
    fn position(&self) -> u64 {
        self.0.buffer_position() as u64
    }
}

/// BufParser implements [Parser] over a slice of bytes (`&[u8]`).
struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl<'a> BufParser<'a> {
    #[inline]
    fn new(data: &'a [u8]) -> Self {
        Self(quick_xml::Reader::from_reader(data))
    }
}

impl<'a> Parser for BufParser<'a> {
    #[inline]
    fn read_event<'b>(&'b mut self) -> quick_xml::Result<Event<'b>> {
        self.0.read_event()
    }

    #[inline]
    fn position(&self) -> u64 {
        self.0.buffer_position() as u64
    }
}

/// Reader streams OSM [nodes and ways](model::Feature) from an XML file.
/// Relations and their members are skipped.
struct Reader<P: Parser> {
    parser: P,
    eof: bool,
}

impl<P: Parser> Reader<P> {
    #[inline]
    fn new(parser: P) -> Self {
        Self { parser, eof: false }
    }
}

impl<P: Parser> Iterator for Reader<P> {
    type Item = Result<model::Feature, quick_xml::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut f: Option<model::Feature> = None;

        while !self.eof {
            let position = self.parser.position();
            let event = match self.parser.read_event() {
                Ok(e) => e,
                Err(e) => {
                    self.eof = true;
                    return Some(Err(e));
                }
            };

            match event {
                Event::Empty(start) => match start.local_name().as_ref() {
                    b"node" => match parse_node(&start) {
                        Some(n) => return Some(Ok(model::Feature::Node(n))),
                        None => debug!("skipping malformed <node> at byte {}", position),
                    },
                    // "way" can't be self-closing
                    b"tag" => {
                        if let Some(tags) = feature_tags(&mut f) {
                            if let Some((k, v)) = parse_tag(&start) {
                                tags.insert(k, v);
                            }
                        }
                    }
                    b"nd" => {
                        if let Some(nodes) = feature_nodes(&mut f) {
                            match parse_nd(&start) {
                                Some(ref_) => nodes.push(ref_),
                                None => debug!("skipping malformed <nd> at byte {}", position),
                            }
                        }
                    }
                    _ => {}
                },

                Event::Start(start) => match start.local_name().as_ref() {
                    b"node" => {
                        f = parse_node(&start).map(model::Feature::Node);
                        if f.is_none() {
                            debug!("skipping malformed <node> at byte {}", position);
                        }
                    }
                    b"way" => {
                        f = parse_way(&start).map(model::Feature::Way);
                        if f.is_none() {
                            debug!("skipping malformed <way> at byte {}", position);
                        }
                    }
                    // "tag" and "nd" must be self-closing
                    _ => {}
                },

                Event::End(end) => match end.local_name().as_ref() {
                    b"node" | b"way" => {
                        if let Some(f) = f.take() {
                            return Some(Ok(f));
                        }
                    }
                    _ => {}
                },

                Event::Eof => {
                    self.eof = true;
                }

                _ => {}
            }
        }

        f.map(Ok)
    }
}

impl<'a> Reader<BufParser<'a>> {
    #[inline]
    fn from_buffer(data: &'a [u8]) -> Self {
        Self::new(BufParser::new(data))
    }
}

impl<R: io::BufRead> Reader<IoParser<R>> {
    #[inline]
    fn from_io(reader: R) -> Self {
        Self::new(IoParser::new(reader))
    }
}

fn parse_node(start: &BytesStart<'_>) -> Option<Node> {
    let mut id: i64 = 0;
    let mut lat = f64::NAN;
    let mut lon = f64::NAN;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"id" => id = from_utf8(&attr.value).ok()?.parse().ok()?,
            b"lat" => lat = from_utf8(&attr.value).ok()?.parse().ok()?,
            b"lon" => lon = from_utf8(&attr.value).ok()?.parse().ok()?,
            _ => {}
        }
    }

    if id != 0 && lat.is_finite() && lon.is_finite() {
        Some(Node { id, lat, lon })
    } else {
        None
    }
}

fn parse_way(start: &BytesStart<'_>) -> Option<model::Way> {
    let mut id: i64 = 0;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        if attr.key.as_ref() == b"id" {
            id = from_utf8(&attr.value).ok()?.parse().ok()?;
        }
    }

    if id != 0 {
        Some(model::Way {
            id,
            nodes: Vec::default(),
            tags: HashMap::default(),
        })
    } else {
        None
    }
}

fn parse_tag(start: &BytesStart<'_>) -> Option<(String, String)> {
    let mut k = None;
    let mut v = None;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"k" => k = Some(attr.unescape_value().ok()?.into_owned()),
            b"v" => v = Some(attr.unescape_value().ok()?.into_owned()),
            _ => {}
        }
    }

    k.map(|k| (k, v.unwrap_or_default()))
}

fn parse_nd(start: &BytesStart<'_>) -> Option<i64> {
    let mut ref_: i64 = 0;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        if attr.key.as_ref() == b"ref" {
            ref_ = from_utf8(&attr.value).ok()?.parse().ok()?;
        }
    }

    if ref_ != 0 {
        Some(ref_)
    } else {
        None
    }
}

fn feature_tags(f: &mut Option<model::Feature>) -> Option<&mut HashMap<String, String>> {
    match f {
        Some(model::Feature::Way(ref mut w)) => Some(&mut w.tags),
        _ => None,
    }
}

fn feature_nodes(f: &mut Option<model::Feature>) -> Option<&mut Vec<i64>> {
    match f {
        Some(model::Feature::Way(ref mut w)) => Some(&mut w.nodes),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::model::{Feature, Way};
    use super::*;

    macro_rules! tags {
        {} => { HashMap::default() };
        {$( $k:literal : $v:literal ),+} => {
            HashMap::from_iter([ $( ($k.to_string(), $v.to_string()) ),+ ])
        };
    }

    const SIMPLE_XML: &[u8] = include_bytes!("test_fixtures/simple.osm");

    fn get_expected_nodes() -> Vec<Node> {
        [
            (1, 11.55, 104.92),
            (2, 11.55, 104.921),
            (3, 11.5515, 104.921),
            (4, 11.551, 104.92),
            (5, 11.552, 104.923),
            (6, 11.553, 104.923),
            (7, 11.549, 104.919),
        ]
        .into_iter()
        .map(|(id, lat, lon)| Node { id, lat, lon })
        .collect()
    }

    fn get_expected_ways() -> Vec<Way> {
        vec![
            Way {
                id: 100,
                nodes: vec![1, 2, 3],
                tags: tags! {"highway": "residential", "name": "Street 51"},
            },
            Way {
                id: 101,
                nodes: vec![3, 4],
                tags: tags! {"highway": "primary", "oneway": "yes"},
            },
            Way {
                id: 102,
                nodes: vec![4, 1, 99],
                tags: tags! {"highway": "service"},
            },
            Way {
                id: 103,
                nodes: vec![7, 1, 4, 7],
                tags: tags! {"building": "yes"},
            },
            Way {
                id: 104,
                nodes: vec![5, 6],
                tags: tags! {"highway": "tertiary", "oneway": "-1"},
            },
        ]
    }

    fn collect_all<I>(features: I) -> Result<(Vec<Node>, Vec<Way>), quick_xml::Error>
    where
        I: Iterator<Item = Result<Feature, quick_xml::Error>>,
    {
        let mut nodes = Vec::default();
        let mut ways = Vec::default();

        for f in features {
            match f? {
                Feature::Node(n) => nodes.push(n),
                Feature::Way(w) => ways.push(w),
            }
        }

        Ok((nodes, ways))
    }

    fn check_against_expected<I>(features: I) -> Result<(), quick_xml::Error>
    where
        I: Iterator<Item = Result<Feature, quick_xml::Error>>,
    {
        let (nodes, ways) = collect_all(features)?;
        assert_eq!(nodes, get_expected_nodes());
        assert_eq!(ways, get_expected_ways());
        Ok(())
    }

    #[test]
    fn parse_from_buf() -> Result<(), quick_xml::Error> {
        check_against_expected(Reader::from_buffer(SIMPLE_XML))
    }

    #[test]
    fn parse_from_io() -> Result<(), quick_xml::Error> {
        check_against_expected(Reader::from_io(io::Cursor::new(SIMPLE_XML)))
    }

    #[test]
    fn skips_malformed_elements() -> Result<(), quick_xml::Error> {
        const DATA: &[u8] = br#"<?xml version="1.0"?>
<osm version="0.6">
  <node id="1" lat="1.0" lon="2.0"/>
  <node id="2" lat="north" lon="2.0"/>
  <node id="0" lat="1.0" lon="2.0"/>
  <node id="3" lon="2.0"/>
  <way id="10">
    <nd ref="1"/>
    <nd ref="x"/>
    <nd ref="1"/>
    <tag k="highway" v="a &amp; b"/>
  </way>
</osm>"#;
        let (nodes, ways) = collect_all(Reader::from_buffer(DATA))?;
        assert_eq!(
            nodes,
            vec![Node {
                id: 1,
                lat: 1.0,
                lon: 2.0
            }]
        );
        assert_eq!(
            ways,
            vec![Way {
                id: 10,
                nodes: vec![1, 1],
                tags: tags! {"highway": "a & b"},
            }]
        );
        Ok(())
    }
}
