//! Map command - build a map preview link

use anyhow::{bail, Result};
use colored::Colorize;
use roadside_core::services::{map_preview, MapPreview, MapTarget};

use crate::output;

pub fn run(lat: Option<f64>, lon: Option<f64>, query: Option<String>, json: bool) -> Result<()> {
    let target = match (lat, lon, query) {
        (Some(lat), Some(lon), _) => MapTarget::Coordinates { lat, lon },
        (None, None, Some(text)) => MapTarget::Query { text },
        _ => bail!("Pass either --lat and --lon, or a location to search for"),
    };

    let preview = map_preview(&target);
    if json {
        return output::print_json(&preview);
    }

    match preview {
        MapPreview::Embed {
            embed_url,
            link_url,
        } => {
            println!("Map: {}", link_url.underline());
            println!("Embed: {}", embed_url.dimmed());
        }
        MapPreview::Search { url } => println!("Search: {}", url.underline()),
        MapPreview::Placeholder { message } => output::warning(&message),
    }
    Ok(())
}
