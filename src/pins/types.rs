use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::PinRecord;

/// Sentinel meaning "any value" for a criteria or filter field
pub const WILDCARD: &str = "all";

/// Schema version written with every pin backup
pub const BACKUP_SCHEMA_VERSION: &str = "2.2";

/// Attribute predicate used for bulk pin/unpin.
///
/// Every field is optional; `None`, an empty string and `"all"` all mean
/// "don't care".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Criteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    /// Every listed feature must appear (substring) among the listing's tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    /// Case-insensitive substring of the badge text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
}

impl Criteria {
    pub fn room_type(room_type: impl Into<String>) -> Self {
        Self {
            room_type: Some(room_type.into()),
            ..Self::default()
        }
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    pub fn with_price_range(mut self, price_range: impl Into<String>) -> Self {
        self.price_range = Some(price_range.into());
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    pub fn with_badge(mut self, badge: impl Into<String>) -> Self {
        self.badge = Some(badge.into());
        self
    }
}

/// Pinned-listing counts
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PinStats {
    pub total_pinned: usize,
    pub by_room_type: BTreeMap<String, usize>,
    pub by_area: BTreeMap<String, usize>,
}

/// Shape of the static pin resource
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PinDocument {
    #[serde(default)]
    pub pinned_cards: Vec<PinRecord>,
}

/// Settings block stored next to the backup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupSettings {
    pub max_pinned_cards: u32,
    pub version: String,
}

/// Local durable copy of the pin set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    #[serde(default)]
    pub pinned_cards: Vec<PinRecord>,
    pub settings: BackupSettings,
}
