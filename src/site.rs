//! Composition root: wires the listing container, pin store and rotation
//! together and exposes the page's control surface.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{Listing, PinRecord};
use crate::page::{apply_filters, FilterConfig, ListingContainer, ListingElement, SharedContainer};
use crate::pins::{Criteria, PinDocument, PinSource, PinStats, PinStore};
use crate::rotation::{
    RotationOutcome, RotationScheduler, RotationSelector, RotationStatus, Visibility,
};
use crate::storage::KeyValueStore;
use crate::sync::lock;

/// How rotation passes are triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduling {
    /// A background scheduler handles the timer, visibility and pin reorders
    Background,
    /// No timers; every pin reorder re-applies rotation inline
    Manual,
}

/// One page's worth of listings plus the components ordering them
pub struct Site {
    container: SharedContainer,
    pins: Arc<Mutex<PinStore>>,
    rotation: Arc<Mutex<RotationSelector>>,
    visibility: watch::Sender<Visibility>,
    scheduler: Option<JoinHandle<()>>,
}

impl Site {
    /// Render `listings`, load pins and start rotation.
    ///
    /// With [`Scheduling::Background`] the scheduler is spawned before the
    /// pin load and waits for its ready signal.
    pub async fn start(
        config: &Config,
        listings: Vec<Listing>,
        source: Box<dyn PinSource>,
        storage: Arc<dyn KeyValueStore>,
        scheduling: Scheduling,
    ) -> Self {
        Self::start_with(config, listings, source, storage, scheduling, |selector| selector).await
    }

    /// Like [`Site::start`], letting the caller build the selector for the
    /// shared container (e.g. with a seeded random source)
    pub async fn start_with<F>(
        config: &Config,
        listings: Vec<Listing>,
        source: Box<dyn PinSource>,
        storage: Arc<dyn KeyValueStore>,
        scheduling: Scheduling,
        customize: F,
    ) -> Self
    where
        F: FnOnce(RotationSelector) -> RotationSelector,
    {
        info!("🏠 Rendering {} listings", listings.len());
        let container = ListingContainer::new(listings).shared();

        let mut pins = PinStore::new(container.clone(), source, storage.clone())
            .with_backup_policy(config.backup_policy)
            .with_max_pinned_cards(config.max_pinned_cards);

        let selector = customize(RotationSelector::new(
            container.clone(),
            storage,
            config.rotation.clone(),
        ));
        let rotation = Arc::new(Mutex::new(selector));
        let (visibility, visibility_rx) = watch::channel(Visibility::Visible);

        let scheduler = match scheduling {
            Scheduling::Background => {
                let (requests, requests_rx) = mpsc::unbounded_channel();
                pins.connect_rotation(requests);
                let scheduler = RotationScheduler::new(
                    rotation.clone(),
                    config.rotation.clone(),
                    pins.subscribe_ready(),
                    visibility_rx,
                    requests_rx,
                );
                Some(tokio::spawn(scheduler.run()))
            }
            Scheduling::Manual => None,
        };

        pins.load().await;

        let site = Self {
            container,
            pins: Arc::new(Mutex::new(pins)),
            rotation,
            visibility,
            scheduler,
        };
        site.after_pin_order();
        site
    }

    fn pins(&self) -> MutexGuard<'_, PinStore> {
        lock(&self.pins)
    }

    fn rotation(&self) -> MutexGuard<'_, RotationSelector> {
        lock(&self.rotation)
    }

    /// Manual scheduling re-applies rotation inline after a pin reorder;
    /// the background scheduler gets its own request from the pin store.
    fn after_pin_order(&self) {
        if self.scheduler.is_none() {
            self.rotation().apply();
        }
    }

    /// Current display order with markers
    pub fn snapshot(&self) -> Vec<ListingElement> {
        lock(&self.container).elements().to_vec()
    }

    pub fn pin(&self, identity: &str, priority: Option<i64>) -> bool {
        let result = self.pins().pin(identity, priority);
        match result {
            Ok(()) => {
                self.after_pin_order();
                true
            }
            Err(e) => {
                warn!("❌ Could not pin: {}", e);
                false
            }
        }
    }

    pub fn unpin(&self, identity: &str) -> bool {
        let removed = self.pins().unpin(identity);
        if removed {
            self.after_pin_order();
        } else {
            debug!("Listing was not pinned: {}", identity);
        }
        removed
    }

    pub fn pin_by_criteria(&self, criteria: &Criteria) -> usize {
        let count = self.pins().pin_by_criteria(criteria);
        self.after_pin_order();
        count
    }

    pub fn unpin_by_criteria(&self, criteria: &Criteria) -> usize {
        let count = self.pins().unpin_by_criteria(criteria);
        self.after_pin_order();
        count
    }

    pub fn clear_all(&self) {
        self.pins().clear_all();
        self.after_pin_order();
    }

    pub fn is_pinned(&self, identity: &str) -> bool {
        self.pins().is_pinned(identity)
    }

    pub fn stats(&self) -> PinStats {
        self.pins().stats()
    }

    pub fn pinned_cards(&self) -> Vec<PinRecord> {
        self.pins().pinned_cards()
    }

    /// Pin set in the static resource's shape
    pub fn pin_document(&self) -> PinDocument {
        self.pins().document()
    }

    pub fn debug_identities(&self) -> Vec<(String, String)> {
        self.pins().debug_identities()
    }

    pub fn force_rotation(&self) -> Option<RotationOutcome> {
        self.rotation().force()
    }

    pub fn enable_rotation(&self) -> Option<RotationOutcome> {
        self.rotation().set_enabled(true)
    }

    pub fn disable_rotation(&self) {
        self.rotation().set_enabled(false);
    }

    pub fn rotation_status(&self) -> RotationStatus {
        self.rotation().status()
    }

    /// Show only listings the filter accepts, then bring pin and rotation
    /// order back in line. Returns the visible count.
    pub fn apply_filters(&self, filter: &FilterConfig) -> usize {
        let visible = apply_filters(&mut lock(&self.container), filter);
        info!("🔍 {} listing{} found", visible, if visible == 1 { "" } else { "s" });

        self.pins().apply_order();
        self.after_pin_order();
        visible
    }

    /// Report a tab switch to the scheduler. Repeating the current state is
    /// not a change and wakes nothing.
    pub fn set_visibility(&self, visibility: Visibility) {
        self.visibility.send_if_modified(|current| {
            let changed = *current != visibility;
            *current = visibility;
            changed
        });
    }

    /// Stop the background scheduler and wait for it to finish
    pub async fn shutdown(self) {
        let Self {
            pins, scheduler, ..
        } = self;
        // dropping the pin store closes the scheduler's request channel
        drop(pins);

        if let Some(handle) = scheduler {
            if let Err(e) = handle.await {
                warn!("Rotation scheduler ended abnormally: {}", e);
            }
        }
    }
}
