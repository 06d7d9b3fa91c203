// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

mod profile;
mod reader;

pub use profile::Profile;
pub use reader::{
    build_network, build_network_from_buffer, build_network_from_io, BuildError, FileFormat,
};
