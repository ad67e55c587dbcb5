use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

use crate::models::Listing;

/// Handle to a rendered listing element, stable for the page's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(usize);

/// "Top pick" marker attached by rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationBadge {
    /// 1-based rank
    pub rank: usize,
    pub label: String,
}

/// Transient border pulse: starts after `delay`, clears after `duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightPulse {
    pub delay: Duration,
    pub duration: Duration,
}

/// A listing as rendered in the container, with the markers the ordering
/// components inject
#[derive(Debug, Clone, Serialize)]
pub struct ListingElement {
    pub id: ElementId,
    pub listing: Listing,
    pub pin_indicator: bool,
    pub rotation_badge: Option<RotationBadge>,
    pub highlight: Option<HighlightPulse>,
    pub visible: bool,
}

/// Ordered set of rendered listings.
///
/// Order is only ever changed through [`ListingContainer::rebuild`], a full
/// replace of the child sequence.
#[derive(Debug, Clone, Default)]
pub struct ListingContainer {
    elements: Vec<ListingElement>,
}

/// Container shared by the pin store, rotation and filter
pub type SharedContainer = Arc<Mutex<ListingContainer>>;

impl ListingContainer {
    /// Render listings in author order
    pub fn new(listings: Vec<Listing>) -> Self {
        let elements = listings
            .into_iter()
            .enumerate()
            .map(|(idx, listing)| ListingElement {
                id: ElementId(idx),
                listing,
                pin_indicator: false,
                rotation_badge: None,
                highlight: None,
                visible: true,
            })
            .collect();
        Self { elements }
    }

    pub fn shared(self) -> SharedContainer {
        Arc::new(Mutex::new(self))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements in display order
    pub fn elements(&self) -> &[ListingElement] {
        &self.elements
    }

    /// Element ids in display order
    pub fn ids(&self) -> Vec<ElementId> {
        self.elements.iter().map(|e| e.id).collect()
    }

    fn get_mut(&mut self, id: ElementId) -> Option<&mut ListingElement> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    /// First element in display order whose listing has this identity
    pub fn find_by_identity(&self, identity: &str) -> Option<&ListingElement> {
        self.elements.iter().find(|e| e.listing.identity() == identity)
    }

    /// Replace the child sequence with `order`.
    ///
    /// Unknown and repeated ids are ignored; elements left out of `order`
    /// are appended after it in their previous relative order.
    pub fn rebuild(&mut self, order: &[ElementId]) {
        let mut by_id: HashMap<ElementId, ListingElement> =
            self.elements.iter().map(|e| (e.id, e.clone())).collect();
        let previous = self.ids();

        let mut rebuilt = Vec::with_capacity(self.elements.len());
        for id in order {
            if let Some(element) = by_id.remove(id) {
                rebuilt.push(element);
            }
        }
        for id in previous {
            if let Some(element) = by_id.remove(&id) {
                rebuilt.push(element);
            }
        }

        self.elements = rebuilt;
    }

    pub fn set_pin_indicator(&mut self, id: ElementId, pinned: bool) {
        if let Some(element) = self.get_mut(id) {
            element.pin_indicator = pinned;
        }
    }

    pub fn has_pin_indicator(&self, id: ElementId) -> bool {
        self.elements.iter().any(|e| e.id == id && e.pin_indicator)
    }

    /// Elements carrying a pin indicator, in display order
    pub fn pinned_ids(&self) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|e| e.pin_indicator)
            .map(|e| e.id)
            .collect()
    }

    pub fn attach_rotation_badge(&mut self, id: ElementId, badge: RotationBadge) {
        if let Some(element) = self.get_mut(id) {
            element.rotation_badge = Some(badge);
        }
    }

    /// Strip every rotation badge and highlight
    pub fn clear_rotation_badges(&mut self) {
        for element in &mut self.elements {
            element.rotation_badge = None;
            element.highlight = None;
        }
    }

    pub fn set_highlight(&mut self, id: ElementId, pulse: HighlightPulse) {
        if let Some(element) = self.get_mut(id) {
            element.highlight = Some(pulse);
        }
    }

    pub fn set_visible(&mut self, id: ElementId, visible: bool) {
        if let Some(element) = self.get_mut(id) {
            element.visible = visible;
        }
    }

    pub fn visible_count(&self) -> usize {
        self.elements.iter().filter(|e| e.visible).count()
    }
}
