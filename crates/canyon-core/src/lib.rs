pub mod models;
pub mod route;
pub mod spatial;
pub mod terrain_rgb;

pub use models::{
    normalize_waypoints, Coordinate, SegmentMode, SegmentRef, Waypoint, WaypointList, WaypointRole,
};
pub use route::{
    compose_polyline, fallback_warnings, ResolvedSegment, RouteResult, SegmentSummary,
    WALKING_PROFILE,
};
pub use spatial::{
    haversine_distance, project_to_tile, walking_duration_s, TileAddress, EARTH_RADIUS_M,
    MAX_MERCATOR_LAT, MAX_TILE_ZOOM, TERRAIN_TILE_SIZE,
};
pub use terrain_rgb::{decode_terrain_rgb, encode_terrain_rgb, Raster};
