// ABOUTME: Nearby places lookup around the plan's location and the map viewer query
// ABOUTME: Results are returned to the caller and never stored in the plan

use tracing::info;
use url::form_urlencoded;

use crate::error::{PlannerError, Result};
use crate::schema::{parse_contract, NearbyPlaces, PlaceResult};
use crate::session::SessionContext;

const MAP_EMBED_BASE: &str = "https://maps.google.com/maps";
const MAX_RATING: f64 = 5.0;

/// Embed URL the external map viewer loads for a place or location string
pub fn map_query(location: &str) -> String {
    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("q", location.trim())
        .append_pair("output", "embed")
        .finish();
    format!("{}?{}", MAP_EMBED_BASE, query)
}

pub(crate) struct PlaceFinder {
    ctx: SessionContext,
}

impl PlaceFinder {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    pub async fn find(&self, category: &str) -> Result<Vec<PlaceResult>> {
        let category = category.trim();
        if category.is_empty() {
            return Err(PlannerError::EmptyInput);
        }

        let (generation, location) = {
            let state = self.ctx.state.read().await;
            (state.generation, state.plan()?.target_location.clone())
        };

        let raw = self
            .ctx
            .call(
                "find_nearby_places",
                self.ctx.backend.find_nearby_places(category, &location),
            )
            .await?;
        let NearbyPlaces(places) = parse_contract(raw)?;

        if !self.ctx.state.read().await.is_current(generation) {
            info!(session_generation = generation, "Discarding places after reset");
            return Err(PlannerError::Stale);
        }

        let places: Vec<PlaceResult> = places
            .into_iter()
            .map(|mut place| {
                place.rating = place.rating.map(|r| r.clamp(0.0, MAX_RATING));
                place
            })
            .collect();

        info!(category, location = %location, count = places.len(), "Nearby places found");
        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_query_encodes_location() {
        assert_eq!(
            map_query(" Koramangala, Bangalore "),
            "https://maps.google.com/maps?q=Koramangala%2C+Bangalore&output=embed"
        );
    }

    #[test]
    fn test_map_query_encodes_non_ascii() {
        let url = map_query("ಬೆಂಗಳೂರು");
        assert!(url.starts_with("https://maps.google.com/maps?q=%E0%B2"));
        assert!(url.ends_with("&output=embed"));
    }
}
