use serde::Deserialize;
use thiserror::Error;

use crate::config;

/// Mean Earth radius in miles, matching the radius-search distance unit.
pub const EARTH_RADIUS_MILES: f64 = 3963.2;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Geocoding provider request failed: {0}")]
    Provider(String),

    #[error("No geocoding result for address: {0}")]
    NoResult(String),
}

/// Great-circle distance in miles between two points.
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * a.sqrt().asin()
}

/// Forward geocoder resolving bootcamp addresses to a point. The provider
/// endpoint comes from config with `{query}` substituted.
pub struct Geocoder {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ProviderHit {
    lat: String,
    lon: String,
}

impl Geocoder {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("bootcamp-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    pub async fn forward(&self, address: &str) -> Result<(f64, f64), GeocodeError> {
        let geocoder = &config::config().geocoder;
        let mut url = geocoder
            .provider_url
            .replace("{query}", &urlencode(address));
        if let Some(key) = &geocoder.api_key {
            url.push_str("&key=");
            url.push_str(key);
        }

        let hits: Vec<ProviderHit> = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GeocodeError::Provider(e.to_string()))?
            .error_for_status()
            .map_err(|e| GeocodeError::Provider(e.to_string()))?
            .json()
            .await
            .map_err(|e| GeocodeError::Provider(e.to_string()))?;

        let hit = hits.first().ok_or_else(|| GeocodeError::NoResult(address.to_string()))?;
        let lat = hit.lat.parse::<f64>().map_err(|e| GeocodeError::Provider(e.to_string()))?;
        let lon = hit.lon.parse::<f64>().map_err(|e| GeocodeError::Provider(e.to_string()))?;
        Ok((lat, lon))
    }
}

impl Default for Geocoder {
    fn default() -> Self {
        Self::new()
    }
}

fn urlencode(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            b' ' => "+".to_string(),
            other => format!("%{:02X}", other),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        assert!(haversine_miles(42.35, -71.06, 42.35, -71.06).abs() < 1e-9);
    }

    #[test]
    fn boston_to_nyc_is_about_190_miles() {
        let d = haversine_miles(42.3601, -71.0589, 40.7128, -74.0060);
        assert!((d - 190.0).abs() < 10.0, "got {}", d);
    }

    #[test]
    fn urlencode_escapes_reserved_bytes() {
        assert_eq!(urlencode("233 Bay State Rd"), "233+Bay+State+Rd");
        assert_eq!(urlencode("a&b=c"), "a%26b%3Dc");
    }
}
