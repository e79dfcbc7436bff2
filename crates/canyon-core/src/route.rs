//! Route composition and the exported route artifact.

use crate::models::{Coordinate, SegmentMode, WaypointList};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const WALKING_PROFILE: &str = "walking";

/// Geometry and timing for one adjacent waypoint pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSegment {
    /// 1-based; segment `i` connects waypoint `i - 1` and waypoint `i`.
    pub index: usize,
    pub mode: SegmentMode,
    pub distance_m: f64,
    pub duration_s: f64,
    pub coordinates: Vec<Coordinate>,
    /// Routed lookup failed and straight-line values were substituted.
    #[serde(default)]
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-segment entry of the exported route properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub index: usize,
    pub mode: SegmentMode,
    pub distance_m: f64,
    pub duration_s: f64,
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ResolvedSegment> for SegmentSummary {
    fn from(segment: &ResolvedSegment) -> Self {
        Self {
            index: segment.index,
            mode: segment.mode,
            distance_m: segment.distance_m,
            duration_s: segment.duration_s,
            failed: segment.failed,
            error: segment.error.clone(),
        }
    }
}

/// A composed walking route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub coordinates: Vec<Coordinate>,
    pub distance_m: f64,
    pub duration_s: f64,
    pub start: Coordinate,
    pub end: Coordinate,
    /// Interior waypoints only.
    pub waypoints: Vec<Coordinate>,
    pub segments: Vec<SegmentSummary>,
    pub generated_at: DateTime<Utc>,
}

/// Concatenate segment geometry in order, dropping a point that repeats its predecessor.
pub fn compose_polyline(segments: &[ResolvedSegment]) -> Vec<Coordinate> {
    let capacity = segments.iter().map(|seg| seg.coordinates.len()).sum();
    let mut line: Vec<Coordinate> = Vec::with_capacity(capacity);
    for segment in segments {
        for point in &segment.coordinates {
            if line.last() == Some(point) {
                continue;
            }
            line.push(*point);
        }
    }
    line
}

impl RouteResult {
    /// Build the route from resolved segments. `None` when fewer than two points result.
    pub fn compose(
        waypoints: &WaypointList,
        segments: &[ResolvedSegment],
        generated_at: DateTime<Utc>,
    ) -> Option<Self> {
        let coordinates = compose_polyline(segments);
        if coordinates.len() < 2 {
            return None;
        }
        let start = waypoints.first()?.coordinate;
        let end = waypoints.last()?.coordinate;
        let interior = waypoints.as_slice();
        let interior = if interior.len() > 2 {
            interior[1..interior.len() - 1]
                .iter()
                .map(|wp| wp.coordinate)
                .collect()
        } else {
            Vec::new()
        };

        Some(Self {
            coordinates,
            distance_m: segments.iter().map(|seg| seg.distance_m).sum(),
            duration_s: segments.iter().map(|seg| seg.duration_s).sum(),
            start,
            end,
            waypoints: interior,
            segments: segments.iter().map(SegmentSummary::from).collect(),
            generated_at,
        })
    }

    /// GeoJSON `Feature` with a `LineString` geometry.
    pub fn to_feature(&self) -> Value {
        json!({
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": self.coordinates,
            },
            "properties": {
                "distance_m": self.distance_m,
                "duration_s": self.duration_s,
                "profile": WALKING_PROFILE,
                "start": self.start,
                "end": self.end,
                "waypoints": self.waypoints,
                "segments": self.segments,
                "generated_at": self.generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            }
        })
    }
}

/// Human-readable warnings for segments that fell back to a straight line.
pub fn fallback_warnings(segments: &[ResolvedSegment]) -> Vec<String> {
    segments
        .iter()
        .filter(|seg| seg.failed)
        .map(|seg| {
            format!(
                "Segment {}: routing failed ({}); using straight line",
                seg.index,
                seg.error.as_deref().unwrap_or("unknown error")
            )
        })
        .collect()
}
