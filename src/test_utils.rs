//! Shared fixtures for unit tests.

use crate::error::{Error, Result};
use crate::models::Listing;
use crate::page::{ListingContainer, SharedContainer};
use crate::storage::KeyValueStore;

/// Listing in Nanak Nagar with the given title and room type
pub fn listing(title: &str, room_type: &str) -> Listing {
    Listing {
        title: title.to_string(),
        area: "Nanak Nagar".to_string(),
        room_type: room_type.to_string(),
        price_range: "low".to_string(),
        area_slug: "nanak-nagar".to_string(),
        price: Some(6000),
        features: vec!["WiFi".to_string()],
        badge: String::new(),
    }
}

/// Identity of [`listing`]
pub fn id(title: &str, room_type: &str) -> String {
    format!("{title}-Nanak Nagar-{room_type}")
}

/// Single-room listings titled after each entry, in order
pub fn shared_container(titles: &[&str]) -> SharedContainer {
    ListingContainer::new(titles.iter().map(|t| listing(t, "single")).collect()).shared()
}

/// Titles in display order
pub fn titles(container: &SharedContainer) -> Vec<String> {
    crate::sync::lock(container)
        .elements()
        .iter()
        .map(|e| e.listing.title.clone())
        .collect()
}

/// Storage that refuses every operation, like a browser in privacy mode
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(Error::StorageUnavailable("storage disabled".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(Error::StorageUnavailable("quota exceeded".to_string()))
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Err(Error::StorageUnavailable("storage disabled".to_string()))
    }
}
