//! Map preview links and the notification capability flag
//!
//! Nothing here talks to the network; it only builds the URLs a viewer
//! would open. Bad input degrades to a placeholder message.

use serde::{Deserialize, Serialize};
use url::Url;

const OSM_BASE: &str = "https://www.openstreetmap.org";

/// Half-width of the embedded map's bounding box, in degrees
const EMBED_SPAN: f64 = 0.005;

/// What to show on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MapTarget {
    Coordinates { lat: f64, lon: f64 },
    Query { text: String },
}

/// Renderable map preview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MapPreview {
    /// Interactive embed centred on a marker, plus a link to the full map
    Embed { embed_url: String, link_url: String },
    /// Search page for a free-text location
    Search { url: String },
    /// Nothing to show
    Placeholder { message: String },
}

impl MapPreview {
    fn placeholder(message: &str) -> Self {
        MapPreview::Placeholder {
            message: message.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, MapPreview::Placeholder { .. })
    }
}

pub fn map_preview(target: &MapTarget) -> MapPreview {
    match target {
        MapTarget::Coordinates { lat, lon } => coordinates_preview(*lat, *lon),
        MapTarget::Query { text } => query_preview(text),
    }
}

fn coordinates_preview(lat: f64, lon: f64) -> MapPreview {
    let valid = lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon);
    if !valid {
        return MapPreview::placeholder("Map preview unavailable: invalid coordinates");
    }

    let bbox = format!(
        "{:.6},{:.6},{:.6},{:.6}",
        lon - EMBED_SPAN,
        lat - EMBED_SPAN,
        lon + EMBED_SPAN,
        lat + EMBED_SPAN
    );
    let marker = format!("{:.6},{:.6}", lat, lon);

    let embed = Url::parse_with_params(
        &format!("{}/export/embed.html", OSM_BASE),
        &[("bbox", bbox.as_str()), ("layer", "mapnik"), ("marker", marker.as_str())],
    );
    let link = Url::parse_with_params(
        &format!("{}/", OSM_BASE),
        &[("mlat", format!("{:.6}", lat)), ("mlon", format!("{:.6}", lon))],
    );

    match (embed, link) {
        (Ok(embed), Ok(mut link)) => {
            link.set_fragment(Some(&format!("map=16/{:.6}/{:.6}", lat, lon)));
            MapPreview::Embed {
                embed_url: embed.to_string(),
                link_url: link.to_string(),
            }
        }
        _ => MapPreview::placeholder("Map preview unavailable"),
    }
}

fn query_preview(text: &str) -> MapPreview {
    let text = text.trim();
    if text.is_empty() {
        return MapPreview::placeholder("Enter a location to preview the map");
    }
    match Url::parse_with_params(&format!("{}/search", OSM_BASE), &[("query", text)]) {
        Ok(url) => MapPreview::Search {
            url: url.to_string(),
        },
        Err(_) => MapPreview::placeholder("Map preview unavailable"),
    }
}

/// Push/SMS delivery is not available in this client
pub fn notifications_supported() -> bool {
    false
}
