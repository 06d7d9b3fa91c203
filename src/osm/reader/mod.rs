// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use log::info;

use graph_builder::NetworkBuilder;

use crate::osm::Profile;
use crate::{Graph, RegionIndex};

mod graph_builder;
mod model;
mod xml;

/// Encoding of the input OSM file.
///
/// The only supported encoding is [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML),
/// optionally wrapped in gzip or bzip2 compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Uncompressed OSM XML (`.osm`)
    Xml,

    /// OSM XML with [gzip](https://en.wikipedia.org/wiki/Gzip) compression (`.osm.gz`)
    XmlGz,

    /// OSM XML with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression (`.osm.bz2`)
    XmlBz2,
}

impl FileFormat {
    /// Guesses the format from the file name. Returns `None` for anything
    /// which is not OSM XML, including `.osm.pbf` files.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let name = path.as_ref().file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".osm") {
            Some(Self::Xml)
        } else if name.ends_with(".osm.gz") {
            Some(Self::XmlGz)
        } else if name.ends_with(".osm.bz2") {
            Some(Self::XmlBz2)
        } else {
            None
        }
    }
}

/// Error conditions which may occur when building a road network from OSM data.
/// No partial network is ever produced.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("OSM file not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("unsupported file format, only OSM XML (.osm, .osm.gz, .osm.bz2) is supported: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Parse OSM features from a reader into a [Graph] and a [RegionIndex] over its edges.
///
/// The provided stream will be automatically wrapped in a buffered reader
/// (and a decompressor, if needed).
pub fn build_network_from_io<R: io::Read>(
    profile: &Profile,
    format: FileFormat,
    reader: R,
) -> Result<(Graph, RegionIndex), BuildError> {
    let b = NetworkBuilder::new(profile);
    let network = match format {
        FileFormat::Xml => b.add_features(xml::features_from_io(io::BufReader::new(reader)))?,

        FileFormat::XmlGz => {
            let d = flate2::read::MultiGzDecoder::new(reader);
            b.add_features(xml::features_from_io(io::BufReader::new(d)))?
        }

        FileFormat::XmlBz2 => {
            let d = bzip2::read::MultiBzDecoder::new(reader);
            b.add_features(xml::features_from_io(io::BufReader::new(d)))?
        }
    };
    Ok(network)
}

/// Parse OSM features from a file at the provided path.
///
/// Fails with [BuildError::SourceNotFound] if the file does not exist, and with
/// [BuildError::UnsupportedFormat] if its name does not denote OSM XML.
pub fn build_network<P: AsRef<Path>>(
    profile: &Profile,
    path: P,
) -> Result<(Graph, RegionIndex), BuildError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(BuildError::SourceNotFound(path.to_path_buf()));
    }
    let format =
        FileFormat::from_path(path).ok_or_else(|| BuildError::UnsupportedFormat(path.to_path_buf()))?;

    info!("building road network from {}", path.display());
    let f = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => BuildError::SourceNotFound(path.to_path_buf()),
        _ => BuildError::Io(e),
    })?;
    build_network_from_io(profile, format, f)
}

/// Parse OSM features from an in-memory buffer.
pub fn build_network_from_buffer(
    profile: &Profile,
    format: FileFormat,
    data: &[u8],
) -> Result<(Graph, RegionIndex), BuildError> {
    if format == FileFormat::Xml {
        // Fast path is available for in-memory XML data
        Ok(NetworkBuilder::new(profile).add_features(xml::features_from_buffer(data))?)
    } else {
        build_network_from_io(profile, format, io::Cursor::new(data))
    }
}
