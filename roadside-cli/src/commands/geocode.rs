//! Geocode command - look up an address

use anyhow::Result;
use colored::Colorize;
use dialoguer::Input;
use roadside_core::services::{map_preview, MapPreview, MapTarget};

use super::{get_context, spinner};
use crate::output;

pub async fn run(query: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let query = match query {
        Some(q) => q,
        None => Input::new().with_prompt("Address").interact_text()?,
    };

    let bar = spinner("Looking up address...");
    let result = ctx.geocoder.lookup(&query).await;
    bar.finish_and_clear();
    let place = result?;

    if json {
        return output::print_json(&place);
    }

    println!("{}", place.display_name.bold());
    println!("  Latitude: {:.6}", place.lat);
    println!("  Longitude: {:.6}", place.lon);

    if let MapPreview::Embed { link_url, .. } = map_preview(&MapTarget::Coordinates {
        lat: place.lat,
        lon: place.lon,
    }) {
        println!("  Map: {}", link_url.underline());
    }
    Ok(())
}
