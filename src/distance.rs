// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Radius of Earth used for edge weights, in meters.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Calculates the great-circle distance between two lat-lon positions
/// on Earth using the `haversine formula <https://en.wikipedia.org/wiki/Haversine_formula>`_.
/// Returns the result in meters.
pub fn earth_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();

    let sin_dlat_half = ((lat2 - lat1).to_radians() * 0.5).sin();
    let sin_dlon_half = ((lon2 - lon1).to_radians() * 0.5).sin();

    let h = sin_dlat_half * sin_dlat_half + phi1.cos() * phi2.cos() * sin_dlon_half * sin_dlon_half;

    2.0 * EARTH_RADIUS * h.sqrt().atan2((1.0 - h).sqrt())
}
