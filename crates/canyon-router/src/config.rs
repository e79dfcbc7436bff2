//! Engine configuration from environment.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub access_token: Option<String>,
    pub directions_base_url: String,
    /// Template with `{z}`, `{x}` and `{y}` placeholders.
    pub terrain_tile_url: String,
    pub terrain_zoom: u8,
    pub route_cache_max_entries: usize,
    pub request_timeout_s: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token: None,
            directions_base_url: "https://api.mapbox.com/directions/v5/mapbox".to_string(),
            terrain_tile_url:
                "https://api.mapbox.com/v4/mapbox.terrain-rgb/{z}/{x}/{y}@2x.pngraw".to_string(),
            terrain_zoom: 14,
            route_cache_max_entries: 500,
            request_timeout_s: 15,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            access_token: env::var("CANYON_ACCESS_TOKEN")
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            directions_base_url: env::var("CANYON_DIRECTIONS_URL")
                .unwrap_or(defaults.directions_base_url),
            terrain_tile_url: env::var("CANYON_TERRAIN_TILE_URL")
                .unwrap_or(defaults.terrain_tile_url),
            terrain_zoom: env::var("CANYON_TERRAIN_ZOOM")
                .ok()
                .and_then(|s| s.parse::<u8>().ok())
                .unwrap_or(defaults.terrain_zoom)
                .min(15),
            route_cache_max_entries: env::var("CANYON_ROUTE_CACHE_MAX")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(defaults.route_cache_max_entries)
                .max(1),
            request_timeout_s: env::var("CANYON_REQUEST_TIMEOUT_S")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(defaults.request_timeout_s)
                .max(1),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_s.max(1))
    }
}
