//! Long-lived route engine: credentials, the shared route cache and single generation runs.

use canyon_core::{compose_polyline, fallback_warnings, ResolvedSegment, RouteResult, WaypointList};
use chrono::Utc;
use futures::future::join_all;
use reqwest::Client;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::cache::RouteSegmentCache;
use crate::config::Config;
use crate::directions::{DirectionsClient, RoutingService};
use crate::error::RunError;
use crate::segment::{RoutedLegMap, SegmentResolver};
use crate::terrain::{TerrainResolver, TerrainTileClient, TileSource};

/// A composed route plus warnings for segments that fell back to straight lines.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    pub route: RouteResult,
    pub warnings: Vec<String>,
}

#[derive(Debug)]
struct Credential {
    access_token: Option<String>,
    route_cache: Arc<RouteSegmentCache>,
}

pub struct RouteEngine {
    config: Config,
    routing: Arc<dyn RoutingService>,
    tiles: Arc<dyn TileSource>,
    credential: RwLock<Credential>,
}

impl RouteEngine {
    pub fn new(config: Config, routing: Arc<dyn RoutingService>, tiles: Arc<dyn TileSource>) -> Self {
        let credential = Credential {
            access_token: normalize_token(config.access_token.clone()),
            route_cache: Arc::new(RouteSegmentCache::new(config.route_cache_max_entries)),
        };
        Self {
            config,
            routing,
            tiles,
            credential: RwLock::new(credential),
        }
    }

    /// Engine wired to the HTTP directions and terrain tile services.
    pub fn from_config(config: Config) -> Self {
        let client = Client::new();
        let routing = Arc::new(DirectionsClient::from_config(client.clone(), &config));
        let tiles = Arc::new(TerrainTileClient::from_config(client, &config));
        Self::new(config, routing, tiles)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn access_token(&self) -> Option<String> {
        self.credential
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .access_token
            .clone()
    }

    /// Rotate the access token. A different token starts a fresh route cache.
    ///
    /// Returns whether the token changed.
    pub fn set_access_token(&self, token: Option<String>) -> bool {
        let token = normalize_token(token);
        let mut credential = self
            .credential
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if credential.access_token == token {
            return false;
        }
        tracing::info!("Access token changed, dropping {} cached route(s)", credential.route_cache.len());
        credential.access_token = token;
        credential.route_cache = Arc::new(RouteSegmentCache::new(self.config.route_cache_max_entries));
        true
    }

    /// Route cache bound to the current access token.
    pub fn route_cache(&self) -> Arc<RouteSegmentCache> {
        Arc::clone(
            &self
                .credential
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .route_cache,
        )
    }

    /// Run one generation: resolve every segment, then compose them in waypoint order.
    pub async fn generate(
        &self,
        waypoints: &WaypointList,
        cancel: &CancellationToken,
    ) -> Result<RouteOutcome, RunError> {
        let (access_token, route_cache) = {
            let credential = self
                .credential
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let token = credential
                .access_token
                .clone()
                .ok_or(RunError::MissingCredential)?;
            (token, Arc::clone(&credential.route_cache))
        };
        if !waypoints.is_routable() {
            return Err(RunError::NotRoutable);
        }
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        tracing::info!("Generating route through {} waypoints", waypoints.len());

        let terrain = TerrainResolver::new(Arc::clone(&self.tiles), &access_token, self.config.terrain_zoom);
        let legs = RoutedLegMap::new();
        let access_token: Arc<str> = Arc::from(access_token);
        let resolver = SegmentResolver {
            routing: &self.routing,
            route_cache: &route_cache,
            legs: &legs,
            terrain: &terrain,
            access_token: &access_token,
        };

        let pending = waypoints.segments().map(|segment| {
            resolver.resolve(
                segment.index,
                segment.from.coordinate,
                segment.to.coordinate,
                segment.mode,
                cancel,
            )
        });
        let segments: Vec<ResolvedSegment> = join_all(pending)
            .await
            .into_iter()
            .collect::<Result<_, _>>()
            .map_err(|_| RunError::Cancelled)?;
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        let route = RouteResult::compose(waypoints, &segments, Utc::now()).ok_or_else(|| {
            RunError::CompositionFailure {
                points: compose_polyline(&segments).len(),
            }
        })?;
        let warnings = fallback_warnings(&segments);

        tracing::info!(
            "Route generated: {:.0} m, {:.0} s, {} point(s), {} fallback segment(s)",
            route.distance_m,
            route.duration_s,
            route.coordinates.len(),
            warnings.len()
        );
        tracing::debug!(
            "Terrain cache: {} tile(s), {} elevation(s)",
            terrain.cached_tiles(),
            terrain.cached_elevations()
        );

        Ok(RouteOutcome { route, warnings })
    }
}

fn normalize_token(token: Option<String>) -> Option<String> {
    token
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
