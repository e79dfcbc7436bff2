//! Canyon CLI - command line tools for canyon walking routes.
//!
//! - plan_route: resolve a waypoint file into a GeoJSON route feature

pub mod waypoints;

pub use waypoints::{load_waypoints, parse_waypoints, WaypointInput};

use canyon_router::RouteEngine;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Replace the engine's token with a `--token` value. Blank values keep the
/// configured token. Returns whether the token changed.
pub fn apply_token_override(engine: &RouteEngine, token: Option<String>) -> bool {
    match token.filter(|token| !token.trim().is_empty()) {
        Some(token) => engine.set_access_token(Some(token)),
        None => false,
    }
}

/// Install the stderr log subscriber used by the binaries.
pub fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("canyon_router=info".parse()?)
                .add_directive("plan_route=info".parse()?),
        )
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canyon_router::Config;

    fn engine_with_env_token() -> RouteEngine {
        RouteEngine::from_config(Config {
            access_token: Some("pk.from-env".to_string()),
            ..Config::default()
        })
    }

    #[test]
    fn blank_token_flag_keeps_configured_token() {
        let engine = engine_with_env_token();
        assert!(!apply_token_override(&engine, Some("   ".to_string())));
        assert!(!apply_token_override(&engine, Some(String::new())));
        assert!(!apply_token_override(&engine, None));
        assert_eq!(engine.access_token().as_deref(), Some("pk.from-env"));
    }

    #[test]
    fn token_flag_replaces_configured_token() {
        let engine = engine_with_env_token();
        assert!(apply_token_override(&engine, Some("pk.from-flag".to_string())));
        assert_eq!(engine.access_token().as_deref(), Some("pk.from-flag"));
    }
}
