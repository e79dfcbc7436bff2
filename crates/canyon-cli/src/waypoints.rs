//! Waypoint file loading.

use anyhow::{Context, Result};
use canyon_core::{Coordinate, SegmentMode, Waypoint, WaypointList};
use serde::Deserialize;
use std::path::Path;

/// One entry of a waypoint file. Roles are derived from position.
#[derive(Debug, Clone, Deserialize)]
pub struct WaypointInput {
    #[serde(default)]
    pub id: Option<String>,
    /// `[lon, lat]`
    pub coordinate: Coordinate,
    #[serde(default)]
    pub segment_mode: SegmentMode,
}

impl From<WaypointInput> for Waypoint {
    fn from(input: WaypointInput) -> Self {
        match input.id {
            Some(id) if !id.trim().is_empty() => {
                Waypoint::with_id(id, input.coordinate, input.segment_mode)
            }
            _ => Waypoint::new(input.coordinate, input.segment_mode),
        }
    }
}

pub fn parse_waypoints(json: &str) -> Result<WaypointList> {
    let inputs: Vec<WaypointInput> =
        serde_json::from_str(json).context("waypoint file must be a JSON array of waypoints")?;
    Ok(WaypointList::from_waypoints(
        inputs.into_iter().map(Waypoint::from).collect(),
    ))
}

pub fn load_waypoints(path: &Path) -> Result<WaypointList> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_waypoints(&json).with_context(|| format!("invalid waypoint file {}", path.display()))
}
