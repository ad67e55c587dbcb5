//! Canonical listing identity.
//!
//! Listings carry no author-assigned ID, so pin records and rotation history
//! reference a listing by a key derived from its visible title, area and room
//! type. Every component derives it through [`listing_identity`].

/// Room type reported for criteria and stats when nothing resolves.
pub const UNKNOWN_ROOM_TYPE: &str = "unknown";

/// Build the identity key for a listing.
///
/// `"{title}-{area}-{room_type}"` with whitespace runs collapsed to a single
/// space and the ends trimmed.
pub fn listing_identity(title: &str, area: &str, room_type: &str) -> String {
    collapse_whitespace(&format!("{}-{}-{}", title.trim(), area.trim(), room_type))
}

/// Resolve the room type from the `data-type` attribute, falling back to the
/// badge text.
pub fn resolve_room_type(data_type: &str, badge: &str) -> Option<String> {
    let data_type = data_type.trim();
    if !data_type.is_empty() {
        return Some(data_type.to_string());
    }
    infer_room_type(badge).map(str::to_string)
}

/// Guess a room type from free-form badge text ("Double Sharing", ...).
pub fn infer_room_type(badge: &str) -> Option<&'static str> {
    let badge = badge.to_lowercase();
    ["double", "triple", "single"]
        .into_iter()
        .find(|kind| badge.contains(kind))
}

/// Lowercase an area name and join its words with `-` ("Nanak Nagar" -> "nanak-nagar").
pub fn normalize_area(area: &str) -> String {
    area.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_collapses_inner_whitespace() {
        assert_eq!(
            listing_identity("  Rakshit   PG ", "NANAK\n NAGAR", "triple"),
            "Rakshit PG-NANAK NAGAR-triple"
        );
    }

    #[test]
    fn identity_with_unresolved_room_type_keeps_trailing_dash() {
        assert_eq!(listing_identity("Sunrise PG", "Gandhi Nagar", ""), "Sunrise PG-Gandhi Nagar-");
    }

    #[test]
    fn room_type_prefers_data_attribute() {
        assert_eq!(resolve_room_type("single", "Double Sharing"), Some("single".to_string()));
    }

    #[test]
    fn room_type_falls_back_to_badge_in_fixed_order() {
        assert_eq!(resolve_room_type("", "Double or Triple"), Some("double".to_string()));
        assert_eq!(resolve_room_type(" ", "TRIPLE sharing"), Some("triple".to_string()));
        assert_eq!(resolve_room_type("", "Premium"), None);
    }

    #[test]
    fn area_normalization() {
        assert_eq!(normalize_area("  Nanak   Nagar "), "nanak-nagar");
        assert_eq!(normalize_area("Trikuta"), "trikuta");
    }
}
