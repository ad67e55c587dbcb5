use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::Listing;
use crate::page::container::ListingContainer;
use crate::pins::WILDCARD;

/// Filter selections from the area / room type / price dropdowns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    pub area: String,
    pub room_type: String,
    pub price_range: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            area: WILDCARD.to_string(),
            room_type: WILDCARD.to_string(),
            price_range: WILDCARD.to_string(),
        }
    }
}

/// Inclusive rupee bounds of a price bracket; `None` for unknown brackets
pub fn price_bounds(range: &str) -> Option<(u32, u32)> {
    match range {
        "low" => Some((5000, 7000)),
        "medium" => Some((7000, 9000)),
        "high" => Some((9000, u32::MAX)),
        _ => None,
    }
}

fn wildcard(value: &str) -> bool {
    value.is_empty() || value == WILDCARD
}

impl FilterConfig {
    pub fn accepts(&self, listing: &Listing) -> bool {
        let area_match = wildcard(&self.area) || listing.area_slug == self.area;
        let type_match = wildcard(&self.room_type) || listing.room_type == self.room_type;
        let price_match = wildcard(&self.price_range)
            || match price_bounds(&self.price_range) {
                Some((min, max)) => {
                    let price = listing.price.unwrap_or(0);
                    price >= min && price <= max
                }
                None => false,
            };

        area_match && type_match && price_match
    }
}

/// Show the listings the filter accepts and hide the rest. Order is untouched.
/// Returns the visible count.
pub fn apply_filters(container: &mut ListingContainer, filter: &FilterConfig) -> usize {
    let decisions: Vec<_> = container
        .elements()
        .iter()
        .map(|e| (e.id, filter.accepts(&e.listing)))
        .collect();

    for (id, visible) in decisions {
        container.set_visible(id, visible);
    }

    let visible = container.visible_count();
    debug!("Filter {:?} left {} listings visible", filter, visible);
    visible
}
