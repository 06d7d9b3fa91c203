// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use roadnet::osm::Profile;
use roadnet::{BoundingBox, Config, Engine, Node};

#[derive(Parser)]
struct Cli {
    /// The path to the OSM XML file (.osm, .osm.gz or .osm.bz2)
    osm_file: PathBuf,

    /// Directory for the persisted road network
    #[arg(long, env = "ROADNET_CACHE_DIR", default_value = "cache")]
    cache_dir: PathBuf,

    /// Tag key which marks ways as roads
    #[arg(long, default_value = "highway")]
    road_key: String,

    /// Accepted values of the road tag (comma-separated); any value if not given
    #[arg(long, value_delimiter = ',')]
    road_values: Vec<String>,

    /// Tag key which marks one-way roads
    #[arg(long, default_value = "oneway")]
    oneway_key: String,

    /// Values of the one-way tag for roads traversable forward only
    #[arg(long, value_delimiter = ',', default_value = "yes,true,1")]
    oneway_values: Vec<String>,

    /// Values of the one-way tag for roads traversable backward only
    #[arg(long, value_delimiter = ',')]
    reverse_values: Vec<String>,

    /// Log more (may be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the node closest to a position
    Nearest { lat: f64, lon: f64 },

    /// Print the shortest route between two positions as GeoJSON
    Route {
        start_lat: f64,
        start_lon: f64,
        end_lat: f64,
        end_lon: f64,
    },

    /// Print edges intersecting a bounding box as GeoJSON
    Region {
        north: f64,
        south: f64,
        east: f64,
        west: f64,

        /// Maximum number of returned edges
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },

    /// Discard the cache and build the road network from the OSM file
    Rebuild,

    /// Discard the cache
    Purge,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn config(&self) -> Config {
        let mut config = Config::new(&self.osm_file, &self.cache_dir);
        config.profile = Profile {
            road_key: self.road_key.clone(),
            road_values: self.road_values.clone(),
            oneway_key: self.oneway_key.clone(),
            oneway_values: self.oneway_values.clone(),
            reverse_values: self.reverse_values.clone(),
        };
        if let Command::Region { limit, .. } = self.command {
            config.region_edge_limit = limit;
        }
        config
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    colog::default_builder().filter_level(cli.log_level()).init();

    let config = cli.config();

    match cli.command {
        Command::Purge => {
            Engine::new(config).purge()?;
        }

        Command::Rebuild => {
            let engine = Engine::new(config);
            let network = engine.rebuild()?;
            println!(
                "{} nodes, {} edges",
                network.graph().len(),
                network.graph().segment_count()
            );
        }

        Command::Nearest { lat, lon } => {
            let engine = Engine::new(config);
            let node = engine.initialize()?.nearest_node(lat, lon)?;
            println!("{} {} {}", node.id, node.lat, node.lon);
        }

        Command::Route {
            start_lat,
            start_lon,
            end_lat,
            end_lon,
        } => {
            let engine = Engine::new(config);
            let summary = engine
                .initialize()?
                .route_distance(start_lat, start_lon, end_lat, end_lon)?;
            if !summary.is_found() {
                return Err(format!(
                    "no route between nodes {} and {}",
                    summary.start.id, summary.end.id
                )
                .into());
            }

            println!("{{");
            println!("  \"type\": \"FeatureCollection\",");
            println!("  \"features\": [");
            print_line_string(
                "    ",
                &format!("\"distance\": {}", summary.distance),
                &summary.path,
                "",
            );
            println!("  ]");
            println!("}}");
        }

        Command::Region {
            north,
            south,
            east,
            west,
            ..
        } => {
            let engine = Engine::new(config);
            let bbox = BoundingBox::new(north, south, east, west);
            let result = engine.initialize()?.edges_in_region(&bbox);

            println!("{{");
            println!("  \"type\": \"FeatureCollection\",");
            println!("  \"truncated\": {},", result.truncated);
            println!("  \"features\": [");
            let mut segments = result.segments.iter().peekable();
            while let Some(s) = segments.next() {
                let suffix = if segments.peek().is_some() { "," } else { "" };
                print_line_string(
                    "    ",
                    &format!("\"id\": {}, \"distance\": {}", s.id, s.cost),
                    &[s.from, s.to],
                    suffix,
                );
            }
            println!("  ]");
            println!("}}");
        }
    }

    Ok(())
}

fn print_line_string(indent: &str, properties: &str, nodes: &[Node], suffix: &str) {
    println!("{}{{", indent);
    println!("{}  \"type\": \"Feature\",", indent);
    println!("{}  \"properties\": {{{}}},", indent, properties);
    println!("{}  \"geometry\": {{", indent);
    println!("{}    \"type\": \"LineString\",", indent);
    println!("{}    \"coordinates\": [", indent);

    let mut nodes = nodes.iter().peekable();
    while let Some(node) = nodes.next() {
        let comma = if nodes.peek().is_some() { "," } else { "" };
        println!("{}      [{}, {}]{}", indent, node.lon, node.lat, comma);
    }

    println!("{}    ]", indent);
    println!("{}  }}", indent);
    println!("{}}}{}", indent, suffix);
}
