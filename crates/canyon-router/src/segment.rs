//! Resolution of one waypoint pair into geometry, distance and duration.

use canyon_core::{haversine_distance, walking_duration_s, Coordinate, ResolvedSegment, SegmentMode};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cache::{route_cache_key, InflightMap, RouteSegmentCache};
use crate::directions::{RoutedLeg, RoutingService};
use crate::error::RoutingError;
use crate::terrain::TerrainResolver;

/// Marker for a segment abandoned because its run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Routing requests in flight during one run, keyed by `route_cache_key`.
pub type RoutedLegMap = InflightMap<String, RoutedLeg, RoutingError>;

/// Borrowed collaborators for one generation run.
pub struct SegmentResolver<'a> {
    pub routing: &'a Arc<dyn RoutingService>,
    pub route_cache: &'a RouteSegmentCache,
    pub legs: &'a RoutedLegMap,
    pub terrain: &'a TerrainResolver,
    pub access_token: &'a Arc<str>,
}

impl SegmentResolver<'_> {
    /// Resolve segment `index` from `from` to `to`.
    ///
    /// Routed failures fall back to the straight-line estimate and are flagged
    /// on the segment. Only cancellation aborts.
    pub async fn resolve(
        &self,
        index: usize,
        from: Coordinate,
        to: Coordinate,
        mode: SegmentMode,
        cancel: &CancellationToken,
    ) -> Result<ResolvedSegment, Cancelled> {
        if mode == SegmentMode::Straight {
            return self.straight(index, from, to, cancel).await;
        }

        match self.routed(from, to, cancel).await {
            Ok(leg) => Ok(ResolvedSegment {
                index,
                mode,
                distance_m: leg.distance_m,
                duration_s: leg.duration_s,
                coordinates: anchor_to_endpoints(leg.coordinates, from, to),
                failed: false,
                error: None,
            }),
            Err(err) if err.is_cancelled() || cancel.is_cancelled() => Err(Cancelled),
            Err(err) => {
                tracing::warn!(
                    "Segment {} routing failed, falling back to straight line: {}",
                    index,
                    err
                );
                let mut segment = self.straight(index, from, to, cancel).await?;
                segment.mode = mode;
                segment.failed = true;
                segment.error = Some(err.to_string());
                Ok(segment)
            }
        }
    }

    async fn routed(
        &self,
        from: Coordinate,
        to: Coordinate,
        cancel: &CancellationToken,
    ) -> Result<RoutedLeg, RoutingError> {
        if let Some(leg) = self.route_cache.get(from, to) {
            tracing::debug!("Route cache hit {} -> {}", from.key(), to.key());
            return Ok(leg);
        }

        let routing = Arc::clone(self.routing);
        let access_token = Arc::clone(self.access_token);
        let lookup = self
            .legs
            .get_or_insert_with(route_cache_key(from, to), move || async move {
                routing.route(from, to, &access_token).await
            });

        let leg = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RoutingError::Cancelled),
            result = lookup => result?,
        };
        self.route_cache.insert(from, to, leg.clone());
        Ok(leg)
    }

    async fn straight(
        &self,
        index: usize,
        from: Coordinate,
        to: Coordinate,
        cancel: &CancellationToken,
    ) -> Result<ResolvedSegment, Cancelled> {
        let distance_m = haversine_distance(from, to);
        let (start, end) = tokio::join!(
            self.terrain.resolve_elevation(from, cancel),
            self.terrain.resolve_elevation(to, cancel),
        );

        let elevation_delta_m = match (start, end) {
            (Ok(start), Ok(end)) => end - start,
            (Err(err), _) | (_, Err(err)) => {
                if err.is_cancelled() || cancel.is_cancelled() {
                    return Err(Cancelled);
                }
                tracing::warn!(
                    "Segment {} elevation lookup failed, assuming flat terrain: {}",
                    index,
                    err
                );
                0.0
            }
        };

        Ok(ResolvedSegment {
            index,
            mode: SegmentMode::Straight,
            distance_m,
            duration_s: walking_duration_s(distance_m, elevation_delta_m),
            coordinates: vec![from, to],
            failed: false,
            error: None,
        })
    }
}

/// Make routed geometry begin and end exactly on its waypoints.
fn anchor_to_endpoints(mut coordinates: Vec<Coordinate>, from: Coordinate, to: Coordinate) -> Vec<Coordinate> {
    if coordinates.first() != Some(&from) {
        coordinates.insert(0, from);
    }
    if coordinates.last() != Some(&to) {
        coordinates.push(to);
    }
    coordinates
}
