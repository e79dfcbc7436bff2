//! Core data models for canyon walking routes.

use serde::{Deserialize, Serialize};

/// A WGS84 position in degrees.
///
/// Serialized as a `[lon, lat]` array to match GeoJSON position order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }

    /// Cache key at 6-decimal precision (~0.1 m).
    pub fn key(&self) -> String {
        format!("{:.6},{:.6}", self.lon, self.lat)
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(value: Coordinate) -> Self {
        [value.lon, value.lat]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointRole {
    Start,
    Waypoint,
    End,
}

/// How the segment ending at a waypoint is resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentMode {
    /// Ask the routing service for a walking path.
    #[default]
    Routed,
    /// Draw a direct line and estimate time from terrain.
    Straight,
}

/// A user-placed point on the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: String,
    pub role: WaypointRole,
    pub coordinate: Coordinate,
    /// Governs the segment ending here; ignored on the first waypoint.
    #[serde(default)]
    pub segment_mode: SegmentMode,
}

impl Waypoint {
    /// Create a waypoint with a fresh id. The role is repaired once it joins a list.
    pub fn new(coordinate: Coordinate, segment_mode: SegmentMode) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: WaypointRole::Waypoint,
            coordinate,
            segment_mode,
        }
    }

    pub fn with_id(id: impl Into<String>, coordinate: Coordinate, segment_mode: SegmentMode) -> Self {
        Self {
            id: id.into(),
            ..Self::new(coordinate, segment_mode)
        }
    }
}

/// Repair roles in place: first is start, last is end, everything else is interior.
///
/// A lone waypoint keeps `end` only if it already was one.
pub fn normalize_waypoints(waypoints: &mut [Waypoint]) {
    let len = waypoints.len();
    if len == 1 {
        let only = &mut waypoints[0];
        if only.role != WaypointRole::End {
            only.role = WaypointRole::Start;
        }
        return;
    }
    for (idx, waypoint) in waypoints.iter_mut().enumerate() {
        waypoint.role = if idx == 0 {
            WaypointRole::Start
        } else if idx + 1 == len {
            WaypointRole::End
        } else {
            WaypointRole::Waypoint
        };
    }
}

/// One adjacent waypoint pair, borrowed from a list.
#[derive(Debug, Clone, Copy)]
pub struct SegmentRef<'a> {
    /// 1-based: segment `i` ends at waypoint `i`.
    pub index: usize,
    pub from: &'a Waypoint,
    pub to: &'a Waypoint,
    pub mode: SegmentMode,
}

/// Ordered waypoint list whose roles are repaired after every mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Waypoint>", into = "Vec<Waypoint>")]
pub struct WaypointList {
    waypoints: Vec<Waypoint>,
}

impl From<Vec<Waypoint>> for WaypointList {
    fn from(waypoints: Vec<Waypoint>) -> Self {
        Self::from_waypoints(waypoints)
    }
}

impl From<WaypointList> for Vec<Waypoint> {
    fn from(list: WaypointList) -> Self {
        list.waypoints
    }
}

impl WaypointList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_waypoints(waypoints: Vec<Waypoint>) -> Self {
        let mut list = Self { waypoints };
        list.normalize();
        list
    }

    pub fn as_slice(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Waypoint> {
        self.waypoints.iter().find(|wp| wp.id == id)
    }

    pub fn first(&self) -> Option<&Waypoint> {
        self.waypoints.first()
    }

    pub fn last(&self) -> Option<&Waypoint> {
        self.waypoints.last()
    }

    /// Append a waypoint at the end of the route.
    pub fn push(&mut self, waypoint: Waypoint) -> bool {
        self.waypoints.push(waypoint);
        self.normalize();
        true
    }

    /// Insert at `index`, clamped to the list length.
    pub fn insert(&mut self, index: usize, waypoint: Waypoint) -> bool {
        let index = index.min(self.waypoints.len());
        self.waypoints.insert(index, waypoint);
        self.normalize();
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<Waypoint> {
        let idx = self.position(id)?;
        let removed = self.waypoints.remove(idx);
        self.normalize();
        Some(removed)
    }

    /// Move the waypoint at `from` so it ends up at `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let len = self.waypoints.len();
        if from >= len || from == to {
            return false;
        }
        let waypoint = self.waypoints.remove(from);
        self.waypoints.insert(to.min(len - 1), waypoint);
        self.normalize();
        true
    }

    pub fn move_to(&mut self, id: &str, coordinate: Coordinate) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        if self.waypoints[idx].coordinate == coordinate {
            return false;
        }
        self.waypoints[idx].coordinate = coordinate;
        self.normalize();
        true
    }

    pub fn set_segment_mode(&mut self, id: &str, mode: SegmentMode) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        if self.waypoints[idx].segment_mode == mode {
            return false;
        }
        self.waypoints[idx].segment_mode = mode;
        self.normalize();
        true
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.waypoints.is_empty();
        self.waypoints.clear();
        changed
    }

    /// At least two finite points with a start first and an end last.
    pub fn is_routable(&self) -> bool {
        let (Some(first), Some(last)) = (self.waypoints.first(), self.waypoints.last()) else {
            return false;
        };
        self.waypoints.len() >= 2
            && first.role == WaypointRole::Start
            && last.role == WaypointRole::End
            && self.waypoints.iter().all(|wp| wp.coordinate.is_finite())
    }

    /// Adjacent pairs in route order.
    pub fn segments(&self) -> impl Iterator<Item = SegmentRef<'_>> {
        self.waypoints
            .windows(2)
            .enumerate()
            .map(|(idx, pair)| SegmentRef {
                index: idx + 1,
                from: &pair[0],
                to: &pair[1],
                mode: pair[1].segment_mode,
            })
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.waypoints.iter().position(|wp| wp.id == id)
    }

    fn normalize(&mut self) {
        normalize_waypoints(&mut self.waypoints);
    }
}
