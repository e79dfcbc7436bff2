//! Generation-run coordination tests.

use async_trait::async_trait;
use canyon_core::{encode_terrain_rgb, Coordinate, SegmentMode, Waypoint, WaypointList};
use canyon_router::{
    Config, RouteCoordinator, RouteEngine, RoutedLeg, RoutingError, RoutingService, RunError,
    RunState, TerrainError, TileSource,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::timeout;

/// Routing stub that parks every request until the gate opens.
struct GatedRouting {
    gate: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl RoutingService for GatedRouting {
    async fn route(
        &self,
        from: Coordinate,
        to: Coordinate,
        _access_token: &str,
    ) -> Result<RoutedLeg, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Ok(RoutedLeg {
            distance_m: 4_242.0,
            duration_s: 4_242.0,
            coordinates: vec![from, to],
        })
    }
}

struct FlatTiles;

#[async_trait]
impl TileSource for FlatTiles {
    async fn fetch_tile(
        &self,
        _zoom: u8,
        _x: u32,
        _y: u32,
        _access_token: &str,
    ) -> Result<Vec<u8>, TerrainError> {
        let [r, g, b] = encode_terrain_rgb(250.0);
        let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([r, g, b, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|err| TerrainError::Decode(err.to_string()))?;
        Ok(bytes)
    }
}

fn setup(access_token: Option<&str>) -> (RouteCoordinator, Arc<GatedRouting>) {
    let routing = Arc::new(GatedRouting {
        gate: Notify::new(),
        calls: AtomicUsize::new(0),
    });
    let config = Config {
        access_token: access_token.map(str::to_string),
        ..Config::default()
    };
    let engine = RouteEngine::new(config, routing.clone(), Arc::new(FlatTiles));
    (RouteCoordinator::new(Arc::new(engine)), routing)
}

fn list(points: &[(f64, f64, SegmentMode)]) -> WaypointList {
    WaypointList::from_waypoints(
        points
            .iter()
            .enumerate()
            .map(|(idx, (lon, lat, mode))| {
                Waypoint::with_id(format!("wp-{}", idx), Coordinate::new(*lon, *lat), *mode)
            })
            .collect(),
    )
}

#[tokio::test]
async fn straight_run_completes_and_publishes() {
    let (coordinator, _routing) = setup(Some("pk.test"));
    let mut waypoints = list(&[(9.0, 48.0, SegmentMode::Routed), (9.01, 48.01, SegmentMode::Straight)]);

    let generation = coordinator.on_waypoints_changed(&waypoints);
    let snapshot = timeout(Duration::from_secs(5), coordinator.settled(generation))
        .await
        .expect("settles")
        .expect("not superseded");
    assert_eq!(snapshot.state, RunState::Completed);
    let outcome = snapshot.outcome.expect("route published");
    assert_eq!(outcome.route.coordinates.len(), 2);
    assert!(!outcome.route.segments[0].failed);

    // Dropping below two points goes idle and clears the route.
    waypoints.remove("wp-1");
    let generation = coordinator.on_waypoints_changed(&waypoints);
    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.generation, generation);
    assert_eq!(snapshot.state, RunState::Idle);
    assert!(snapshot.outcome.is_none());
}

#[tokio::test]
async fn only_the_latest_run_publishes() {
    let (coordinator, routing) = setup(Some("pk.test"));
    let slow = list(&[(9.0, 48.0, SegmentMode::Routed), (9.01, 48.01, SegmentMode::Routed)]);
    let fast = list(&[(9.0, 48.0, SegmentMode::Routed), (9.02, 48.02, SegmentMode::Straight)]);

    let first = coordinator.on_waypoints_changed(&slow);
    // Let the first run reach the routing service.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(coordinator.snapshot().state, RunState::Running);

    let second = coordinator.on_waypoints_changed(&fast);
    assert!(second > first);
    assert!(coordinator.settled(first).await.is_none());

    let snapshot = timeout(Duration::from_secs(5), coordinator.settled(second))
        .await
        .expect("settles")
        .expect("latest run");
    assert_eq!(snapshot.state, RunState::Completed);
    let published = snapshot.outcome.expect("route");
    assert_eq!(published.route.end, Coordinate::new(9.02, 48.02));

    // Releasing the superseded request must not change what was published.
    routing.gate.notify_waiters();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    let after = coordinator.snapshot();
    assert_eq!(after.generation, second);
    assert_eq!(after.state, RunState::Completed);
    assert_eq!(after.outcome.expect("route").route, published.route);
    assert!(routing.calls.load(Ordering::SeqCst) <= 1);
}

#[tokio::test]
async fn missing_credential_is_reported_as_failure() {
    let (coordinator, routing) = setup(None);
    let waypoints = list(&[(9.0, 48.0, SegmentMode::Routed), (9.01, 48.01, SegmentMode::Routed)]);

    let generation = coordinator.on_waypoints_changed(&waypoints);
    let snapshot = timeout(Duration::from_secs(5), coordinator.settled(generation))
        .await
        .expect("settles")
        .expect("not superseded");
    assert_eq!(snapshot.state, RunState::Failed);
    assert_eq!(snapshot.error, Some(RunError::MissingCredential));
    assert!(snapshot.outcome.is_none());
    assert_eq!(routing.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reset_cancels_in_flight_run() {
    let (coordinator, routing) = setup(Some("pk.test"));
    let waypoints = list(&[(9.0, 48.0, SegmentMode::Routed), (9.01, 48.01, SegmentMode::Routed)]);

    let generation = coordinator.on_waypoints_changed(&waypoints);
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    let reset = coordinator.reset();
    assert!(reset > generation);
    assert!(coordinator.settled(generation).await.is_none());

    routing.gate.notify_waiters();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.generation, reset);
    assert_eq!(snapshot.state, RunState::Idle);
    assert!(snapshot.outcome.is_none());
}
