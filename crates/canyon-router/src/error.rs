//! Error types for terrain lookups, routing calls and generation runs.

use thiserror::Error;

/// Elevation tile failures. `Clone` so one shared fetch can hand its result to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TerrainError {
    #[error("terrain tile fetch failed: {0}")]
    Fetch(String),
    #[error("terrain tile decode failed: {0}")]
    Decode(String),
    #[error("terrain lookup cancelled")]
    Cancelled,
}

impl TerrainError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TerrainError::Cancelled)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("no route found")]
    NoRouteFound,
    #[error("routing service error: {0}")]
    Service(String),
    #[error("routing request cancelled")]
    Cancelled,
}

impl RoutingError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RoutingError::Cancelled)
    }
}

/// Run-level failures. Only these discard a whole route.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("an access token is required before routes can be generated")]
    MissingCredential,
    #[error("need at least 2 waypoints with a start and an end")]
    NotRoutable,
    #[error("route composition produced {points} point(s); at least 2 are required")]
    CompositionFailure { points: usize },
    #[error("generation run cancelled")]
    Cancelled,
}

impl RunError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunError::Cancelled)
    }
}
