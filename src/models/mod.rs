use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{listing_identity, resolve_room_type, UNKNOWN_ROOM_TYPE};
use crate::pins::Criteria;

/// A rendered PG listing as read from the page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub title: String,
    /// Visible area tag ("Nanak Nagar")
    pub area: String,
    /// `data-type` attribute, may be empty
    pub room_type: String,
    /// `data-price` bracket tag ("low", "medium", "high")
    pub price_range: String,
    /// `data-area` attribute used by the area filter
    pub area_slug: String,
    /// Monthly rent in rupees, when the page shows one
    pub price: Option<u32>,
    pub features: Vec<String>,
    pub badge: String,
}

impl Listing {
    /// Identity correlating this listing with pin records and rotation history.
    pub fn identity(&self) -> String {
        let room_type = resolve_room_type(&self.room_type, &self.badge).unwrap_or_default();
        listing_identity(&self.title, &self.area, &room_type)
    }

    /// Room type used for criteria matching and stats.
    pub fn resolved_room_type(&self) -> String {
        resolve_room_type(&self.room_type, &self.badge)
            .unwrap_or_else(|| UNKNOWN_ROOM_TYPE.to_string())
    }

    /// Attributes visible to criteria matching.
    pub fn facts(&self) -> ListingFacts {
        ListingFacts {
            title: self.title.trim().to_string(),
            area: self.area.trim().to_string(),
            room_type: self.resolved_room_type(),
            price_range: self.price_range.clone(),
            features: self
                .features
                .iter()
                .map(|f| f.trim().to_lowercase())
                .collect(),
            badge: self.badge.trim().to_string(),
        }
    }
}

/// The attribute view criteria are evaluated against.
///
/// Built either from a rendered [`Listing`] or from a stored [`PinRecord`];
/// records only carry title, area and room type so the rest stay empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFacts {
    pub title: String,
    pub area: String,
    pub room_type: String,
    pub price_range: String,
    /// Lowercased feature tags
    pub features: Vec<String>,
    pub badge: String,
}

/// A pinned listing with explicit display priority
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PinRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub room_type: String,
    pub priority: i64,
    #[serde(default = "Utc::now")]
    pub pinned_at: DateTime<Utc>,
    /// Criteria that produced this pin; manual pins carry none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Criteria>,
}

impl PinRecord {
    pub fn facts(&self) -> ListingFacts {
        ListingFacts {
            title: self.title.clone(),
            area: self.area.clone(),
            room_type: self.room_type.clone(),
            ..ListingFacts::default()
        }
    }
}

/// Which listings were featured by the last rotation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RotationHistory {
    /// Epoch milliseconds of the last rotation, 0 when none happened
    #[serde(default)]
    pub last_rotation: i64,
    #[serde(default, rename = "topCards")]
    pub top_identities: Vec<String>,
    #[serde(default)]
    pub rotation_count: u64,
}
