//! Terrain sampling backed by terrain-RGB raster tiles.

use async_trait::async_trait;
use canyon_core::{project_to_tile, Coordinate, Raster, TileAddress, TERRAIN_TILE_SIZE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::cache::InflightMap;
use crate::config::Config;
use crate::error::TerrainError;

type TileKey = (u8, u32, u32);
type TileMap = InflightMap<TileKey, Arc<Raster>, TerrainError>;

/// Source of encoded terrain tiles.
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Raw image payload of one tile.
    async fn fetch_tile(
        &self,
        zoom: u8,
        x: u32,
        y: u32,
        access_token: &str,
    ) -> Result<Vec<u8>, TerrainError>;
}

/// HTTP tile source using a `{z}/{x}/{y}` URL template.
#[derive(Debug, Clone)]
pub struct TerrainTileClient {
    client: Client,
    url_template: String,
    timeout: Duration,
}

impl TerrainTileClient {
    pub fn new(client: Client, url_template: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url_template: url_template.into(),
            timeout,
        }
    }

    pub fn from_config(client: Client, config: &Config) -> Self {
        Self::new(client, &config.terrain_tile_url, config.request_timeout())
    }

    fn tile_url(&self, zoom: u8, x: u32, y: u32) -> String {
        self.url_template
            .replace("{z}", &zoom.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

#[async_trait]
impl TileSource for TerrainTileClient {
    async fn fetch_tile(
        &self,
        zoom: u8,
        x: u32,
        y: u32,
        access_token: &str,
    ) -> Result<Vec<u8>, TerrainError> {
        let url = self.tile_url(zoom, x, y);
        let response = self
            .client
            .get(&url)
            .query(&[("access_token", access_token)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| TerrainError::Fetch(err.to_string()))?;

        if !response.status().is_success() {
            return Err(TerrainError::Fetch(format!(
                "terrain provider HTTP {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| TerrainError::Fetch(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Decode an image payload into an RGBA raster.
pub fn decode_tile(bytes: &[u8]) -> Result<Raster, TerrainError> {
    let image =
        image::load_from_memory(bytes).map_err(|err| TerrainError::Decode(err.to_string()))?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Raster::new(width, height, rgba.into_raw())
        .ok_or_else(|| TerrainError::Decode(format!("unusable {}x{} raster", width, height)))
}

async fn fetch_raster(
    source: Arc<dyn TileSource>,
    access_token: Arc<str>,
    address: TileAddress,
) -> Result<Arc<Raster>, TerrainError> {
    tracing::debug!(
        "Fetching terrain tile {}/{}/{}",
        address.zoom,
        address.x,
        address.y
    );
    let bytes = source
        .fetch_tile(address.zoom, address.x, address.y, &access_token)
        .await?;
    decode_tile(&bytes).map(Arc::new)
}

#[derive(Clone)]
struct TileSampler {
    source: Arc<dyn TileSource>,
    access_token: Arc<str>,
    zoom: u8,
    tile_size: u32,
    tiles: Arc<TileMap>,
}

impl TileSampler {
    async fn sample(self, coordinate: Coordinate) -> Result<f64, TerrainError> {
        let address = project_to_tile(coordinate, self.zoom, self.tile_size);
        let source = Arc::clone(&self.source);
        let access_token = Arc::clone(&self.access_token);
        let raster = self
            .tiles
            .get_or_insert_with(address.tile_key(), move || {
                fetch_raster(source, access_token, address)
            })
            .await?;
        Ok(raster.elevation_at(address.pixel_x, address.pixel_y))
    }
}

/// Per-run elevation resolver.
///
/// Tiles and point elevations are memoized for the life of the resolver;
/// concurrent lookups of the same tile or coordinate share one fetch.
pub struct TerrainResolver {
    sampler: TileSampler,
    elevations: InflightMap<String, f64, TerrainError>,
}

impl TerrainResolver {
    pub fn new(source: Arc<dyn TileSource>, access_token: &str, zoom: u8) -> Self {
        Self {
            sampler: TileSampler {
                source,
                access_token: Arc::from(access_token),
                zoom,
                tile_size: TERRAIN_TILE_SIZE,
                tiles: Arc::new(InflightMap::new()),
            },
            elevations: InflightMap::new(),
        }
    }

    /// Elevation in meters at `coordinate`. Aborts as soon as `cancel` fires.
    pub async fn resolve_elevation(
        &self,
        coordinate: Coordinate,
        cancel: &CancellationToken,
    ) -> Result<f64, TerrainError> {
        if cancel.is_cancelled() {
            return Err(TerrainError::Cancelled);
        }
        let sampler = self.sampler.clone();
        let lookup = self
            .elevations
            .get_or_insert_with(coordinate.key(), move || sampler.sample(coordinate));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TerrainError::Cancelled),
            result = lookup => result,
        }
    }

    pub fn cached_tiles(&self) -> usize {
        self.sampler.tiles.len()
    }

    pub fn cached_elevations(&self) -> usize {
        self.elevations.len()
    }
}
