//! Walking directions client for routed segments.

use async_trait::async_trait;
use canyon_core::{Coordinate, WALKING_PROFILE};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::error::RoutingError;

/// Distance, duration and geometry of one routed leg.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedLeg {
    pub distance_m: f64,
    pub duration_s: f64,
    pub coordinates: Vec<Coordinate>,
}

/// External service answering walking routes between two points.
#[async_trait]
pub trait RoutingService: Send + Sync {
    async fn route(
        &self,
        from: Coordinate,
        to: Coordinate,
        access_token: &str,
    ) -> Result<RoutedLeg, RoutingError>;
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    distance: f64,
    duration: f64,
    #[serde(default)]
    geometry: Option<LineGeometry>,
}

#[derive(Debug, Deserialize)]
struct LineGeometry {
    #[serde(default)]
    coordinates: Vec<[f64; 2]>,
}

/// HTTP client for a Mapbox-compatible directions API.
#[derive(Debug, Clone)]
pub struct DirectionsClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl DirectionsClient {
    pub fn new(client: Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn from_config(client: Client, config: &Config) -> Self {
        Self::new(client, &config.directions_base_url, config.request_timeout())
    }

    fn leg_url(&self, from: Coordinate, to: Coordinate) -> String {
        format!(
            "{}/{}/{:.6},{:.6};{:.6},{:.6}",
            self.base_url, WALKING_PROFILE, from.lon, from.lat, to.lon, to.lat
        )
    }
}

#[async_trait]
impl RoutingService for DirectionsClient {
    async fn route(
        &self,
        from: Coordinate,
        to: Coordinate,
        access_token: &str,
    ) -> Result<RoutedLeg, RoutingError> {
        let url = self.leg_url(from, to);
        tracing::debug!("Requesting walking route {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("geometries", "geojson"),
                ("overview", "full"),
                ("access_token", access_token),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| RoutingError::Service(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<DirectionsResponse>(&body)
                .ok()
                .and_then(|payload| payload.message)
                .filter(|message| !message.trim().is_empty());
            return Err(RoutingError::Service(match message {
                Some(message) => format!("HTTP {}: {}", status.as_u16(), message),
                None => format!("HTTP {}", status.as_u16()),
            }));
        }

        let payload: DirectionsResponse = response
            .json()
            .await
            .map_err(|err| RoutingError::Service(format!("invalid response: {}", err)))?;
        first_leg(payload)
    }
}

fn first_leg(payload: DirectionsResponse) -> Result<RoutedLeg, RoutingError> {
    let route = payload
        .routes
        .into_iter()
        .next()
        .ok_or(RoutingError::NoRouteFound)?;
    let coordinates: Vec<Coordinate> = route
        .geometry
        .map(|geometry| geometry.coordinates)
        .unwrap_or_default()
        .into_iter()
        .map(Coordinate::from)
        .filter(Coordinate::is_finite)
        .collect();
    if coordinates.is_empty() {
        return Err(RoutingError::NoRouteFound);
    }
    Ok(RoutedLeg {
        distance_m: route.distance.max(0.0),
        duration_s: route.duration.max(0.0),
        coordinates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<RoutedLeg, RoutingError> {
        first_leg(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn takes_first_candidate_route() {
        let leg = parse(json!({
            "code": "Ok",
            "routes": [
                {
                    "distance": 1520.4,
                    "duration": 1190.0,
                    "geometry": {"type": "LineString", "coordinates": [[9.0, 48.0], [9.004, 48.006], [9.01, 48.01]]}
                },
                {
                    "distance": 9999.0,
                    "duration": 9999.0,
                    "geometry": {"type": "LineString", "coordinates": [[9.0, 48.0], [9.01, 48.01]]}
                }
            ]
        }))
        .unwrap();
        assert_eq!(leg.distance_m, 1520.4);
        assert_eq!(leg.duration_s, 1190.0);
        assert_eq!(leg.coordinates.len(), 3);
        assert_eq!(leg.coordinates[1], Coordinate::new(9.004, 48.006));
    }

    #[test]
    fn empty_candidates_are_no_route() {
        assert_eq!(
            parse(json!({"code": "NoRoute", "routes": []})),
            Err(RoutingError::NoRouteFound)
        );
        assert_eq!(parse(json!({"code": "NoRoute"})), Err(RoutingError::NoRouteFound));
    }

    #[test]
    fn empty_geometry_is_no_route() {
        assert_eq!(
            parse(json!({"routes": [{"distance": 10.0, "duration": 8.0, "geometry": {"coordinates": []}}]})),
            Err(RoutingError::NoRouteFound)
        );
        assert_eq!(
            parse(json!({"routes": [{"distance": 10.0, "duration": 8.0}]})),
            Err(RoutingError::NoRouteFound)
        );
    }

    #[test]
    fn leg_url_uses_walking_profile() {
        let client = DirectionsClient::new(
            Client::new(),
            "https://example.test/directions/v5/mapbox/",
            Duration::from_secs(5),
        );
        assert_eq!(
            client.leg_url(Coordinate::new(9.0, 48.0), Coordinate::new(9.01, 48.01)),
            "https://example.test/directions/v5/mapbox/walking/9.000000,48.000000;9.010000,48.010000"
        );
    }
}
