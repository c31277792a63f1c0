//! Nominatim-compatible address lookup
//!
//! Invoked only on explicit user action. One attempt per lookup; failures
//! come back to the caller as they are.

use serde::{Deserialize, Serialize};
use url::Url;

use super::network::NetworkGuard;
use crate::domain::result::{Error, Result};

/// Best match for an address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
}

/// Nominatim reports coordinates as strings
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

pub struct GeocodingClient {
    base_url: String,
    guard: NetworkGuard,
}

impl GeocodingClient {
    pub fn new(base_url: &str, guard: NetworkGuard) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            guard,
        }
    }

    /// URL queried for `query`
    pub fn search_url(&self, query: &str) -> Result<Url> {
        Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[("format", "json"), ("limit", "1"), ("q", query)],
        )
        .map_err(|e| Error::config(format!("Invalid geocoding URL: {}", e)))
    }

    /// Look up the best match for a free-text address
    pub async fn lookup(&self, query: &str) -> Result<GeocodeResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::validation("Enter an address to look up"));
        }

        let url = self.search_url(query)?;
        let places: Vec<Place> = self.guard.get_json(&url).await?;
        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("No location found for \"{}\"", query)))?;

        let lat = place.lat.parse::<f64>();
        let lon = place.lon.parse::<f64>();
        match (lat, lon) {
            (Ok(lat), Ok(lon)) => Ok(GeocodeResult {
                lat,
                lon,
                display_name: place.display_name,
            }),
            _ => Err(Error::network(format!(
                "Geocoder returned unusable coordinates: {}, {}",
                place.lat, place.lon
            ))),
        }
    }
}
