use crate::identity::normalize_area;
use crate::models::ListingFacts;
use crate::pins::types::{Criteria, WILDCARD};

fn specified(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != WILDCARD)
}

/// Check whether a listing satisfies every specified criteria field
pub fn matches_criteria(facts: &ListingFacts, criteria: &Criteria) -> bool {
    if let Some(room_type) = specified(&criteria.room_type) {
        if facts.room_type != room_type {
            return false;
        }
    }

    if let Some(price_range) = specified(&criteria.price_range) {
        if facts.price_range != price_range {
            return false;
        }
    }

    if let Some(area) = specified(&criteria.area) {
        if normalize_area(&facts.area) != normalize_area(area) {
            return false;
        }
    }

    let has_all_features = criteria.features.iter().all(|feature| {
        let feature = feature.trim().to_lowercase();
        facts.features.iter().any(|tag| tag.contains(&feature))
    });
    if !has_all_features {
        return false;
    }

    if let Some(badge) = specified(&criteria.badge) {
        if !facts.badge.to_lowercase().contains(&badge.to_lowercase()) {
            return false;
        }
    }

    true
}
