//! Canyon Router - terrain-aware walking route composition
//!
//! Resolves each waypoint pair either through a walking directions service or
//! as a straight line timed from terrain-RGB elevation, then stitches the
//! segments into a single route.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod directions;
pub mod engine;
pub mod error;
pub mod segment;
pub mod terrain;

pub use cache::{route_cache_key, InflightMap, RouteSegmentCache};
pub use config::Config;
pub use coordinator::{RouteCoordinator, RunSnapshot, RunState};
pub use directions::{DirectionsClient, RoutedLeg, RoutingService};
pub use engine::{RouteEngine, RouteOutcome};
pub use error::{RoutingError, RunError, TerrainError};
pub use segment::{Cancelled, RoutedLegMap, SegmentResolver};
pub use terrain::{decode_tile, TerrainResolver, TerrainTileClient, TileSource};
