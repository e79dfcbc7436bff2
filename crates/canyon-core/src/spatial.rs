//! Geodesic and tile-projection math for walking routes.

use crate::models::Coordinate;
use serde::{Deserialize, Serialize};

/// Distance in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Latitude bound of the square Web-Mercator world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Pixel edge length of a terrain tile (`@2x` raster tiles).
pub const TERRAIN_TILE_SIZE: u32 = 512;

/// Deepest zoom level `project_to_tile` addresses.
pub const MAX_TILE_ZOOM: u8 = 24;

/// Flat walking pace.
const WALKING_SPEED_KMH: f64 = 5.0;
/// Meters of ascent that add one hour.
const ASCENT_M_PER_HOUR: f64 = 600.0;
/// Meters of descent that add one hour.
const DESCENT_M_PER_HOUR: f64 = 1000.0;

/// Great-circle distance between two coordinates in meters (Haversine formula).
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Estimated walking time in seconds for a straight segment.
///
/// `elevation_delta_m` is end minus start. Ascent and descent are penalized
/// separately so a climb costs more than the matching drop.
pub fn walking_duration_s(distance_m: f64, elevation_delta_m: f64) -> f64 {
    let distance_km = if distance_m.is_finite() { distance_m / 1000.0 } else { 0.0 };
    let delta = if elevation_delta_m.is_finite() { elevation_delta_m } else { 0.0 };
    let gain = delta.max(0.0);
    let drop = (-delta).max(0.0);

    let hours = distance_km / WALKING_SPEED_KMH + gain / ASCENT_M_PER_HOUR + drop / DESCENT_M_PER_HOUR;
    (hours * 3600.0).max(0.0)
}

/// Tile address plus the pixel offset of a coordinate inside that tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileAddress {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
    pub pixel_x: f64,
    pub pixel_y: f64,
}

impl TileAddress {
    /// Key identifying the tile, independent of the pixel offset.
    pub fn tile_key(&self) -> (u8, u32, u32) {
        (self.zoom, self.x, self.y)
    }
}

/// Project a coordinate into Web-Mercator tile space.
///
/// Latitude is clamped to the Mercator bound so polar inputs stay finite.
/// Tile indices are clamped into the zoom level's grid, and `zoom` to
/// `MAX_TILE_ZOOM`.
pub fn project_to_tile(coordinate: Coordinate, zoom: u8, tile_size: u32) -> TileAddress {
    let zoom = zoom.min(MAX_TILE_ZOOM);
    let n = 2f64.powi(i32::from(zoom));
    let lat = coordinate.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();

    let world_x = (coordinate.lon + 180.0) / 360.0 * n;
    let world_y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / std::f64::consts::PI) / 2.0 * n;

    let max_index = n - 1.0;
    let tile_x = world_x.floor().clamp(0.0, max_index);
    let tile_y = world_y.floor().clamp(0.0, max_index);

    let size = f64::from(tile_size);
    let max_pixel = (size - 1.0).max(0.0);
    let pixel_x = ((world_x - tile_x) * size).clamp(0.0, max_pixel);
    let pixel_y = ((world_y - tile_y) * size).clamp(0.0, max_pixel);

    TileAddress {
        zoom,
        x: tile_x as u32,
        y: tile_y as u32,
        pixel_x,
        pixel_y,
    }
}
