use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::BackupPolicy;
use crate::error::{Error, Result};
use crate::models::PinRecord;
use crate::page::SharedContainer;
use crate::pins::criteria::matches_criteria;
use crate::pins::source::parse_pin_records;
use crate::pins::traits::PinSource;
use crate::pins::types::{
    BackupDocument, BackupSettings, Criteria, PinDocument, PinStats, BACKUP_SCHEMA_VERSION,
};
use crate::rotation::RotationRequest;
use crate::storage::{write_json, KeyValueStore, PIN_BACKUP_KEY};
use crate::sync::lock;

/// Authoritative set of pinned listings.
///
/// Pinned listings always occupy the front of the container, sorted by
/// ascending priority. Every mutation re-applies that order and writes a
/// backup to local storage.
pub struct PinStore {
    container: SharedContainer,
    source: Box<dyn PinSource>,
    storage: Arc<dyn KeyValueStore>,
    policy: BackupPolicy,
    max_pinned_cards: u32,
    pinned: Vec<PinRecord>,
    ready: watch::Sender<bool>,
    rotation: Option<mpsc::UnboundedSender<RotationRequest>>,
}

impl PinStore {
    pub fn new(
        container: SharedContainer,
        source: Box<dyn PinSource>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            container,
            source,
            storage,
            policy: BackupPolicy::default(),
            max_pinned_cards: 10,
            pinned: Vec::new(),
            ready,
            rotation: None,
        }
    }

    pub fn with_backup_policy(mut self, policy: BackupPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_pinned_cards(mut self, max_pinned_cards: u32) -> Self {
        self.max_pinned_cards = max_pinned_cards;
        self
    }

    /// Ask the rotation scheduler to re-apply after every reorder
    pub fn connect_rotation(&mut self, requests: mpsc::UnboundedSender<RotationRequest>) {
        self.rotation = Some(requests);
    }

    /// Flips to `true` once [`PinStore::load`] has finished, whatever the outcome
    pub fn subscribe_ready(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// Load the pin list, apply it and signal readiness.
    ///
    /// Never fails: an unavailable or malformed resource leaves the pin set
    /// empty (or restored from backup, depending on the policy).
    pub async fn load(&mut self) {
        info!("📋 Loading pinned listings from {}", self.source.describe());

        let records = match self.fetch_records().await {
            Ok(records) => {
                info!("📋 Loaded {} pinned listings", records.len());
                records
            }
            Err(e) => {
                warn!("❌ Could not load pin resource: {}", e);
                self.recover_from_backup()
            }
        };

        self.pinned = records;
        self.apply_order();
        self.ready.send_replace(true);
    }

    async fn fetch_records(&self) -> Result<Vec<PinRecord>> {
        let payload = self.source.fetch().await?;
        parse_pin_records(&payload)
    }

    fn recover_from_backup(&self) -> Vec<PinRecord> {
        if self.policy == BackupPolicy::AuthoritativeOnly {
            return Vec::new();
        }

        let restored = self
            .storage
            .get(PIN_BACKUP_KEY)
            .and_then(|raw| raw.map(|raw| parse_pin_records(&raw)).transpose());

        match restored {
            Ok(Some(records)) => {
                info!("💾 Restored {} pinned listings from backup", records.len());
                records
            }
            Ok(None) => {
                debug!("No pin backup to restore");
                Vec::new()
            }
            Err(e) => {
                warn!("❌ Could not restore pin backup: {}", e);
                Vec::new()
            }
        }
    }

    /// Move pinned listings to the front in priority order and refresh pin
    /// indicators. Returns the number of pinned elements placed.
    pub fn apply_order(&self) -> usize {
        let pinned_count = {
            let mut container = lock(&self.container);
            if container.is_empty() {
                debug!("No listings rendered, nothing to order");
                return 0;
            }

            // ties on priority keep the order records were added in
            let priorities: HashMap<&str, (i64, usize)> = self
                .pinned
                .iter()
                .enumerate()
                .map(|(idx, record)| (record.id.as_str(), (record.priority, idx)))
                .collect();

            let mut pinned = Vec::new();
            let mut unpinned = Vec::new();
            for element in container.elements() {
                match priorities.get(element.listing.identity().as_str()) {
                    Some(&key) => pinned.push((element.id, key)),
                    None => unpinned.push(element.id),
                }
            }

            for (id, _) in &pinned {
                container.set_pin_indicator(*id, true);
            }
            for id in &unpinned {
                container.set_pin_indicator(*id, false);
            }

            pinned.sort_by_key(|(_, key)| *key);

            let order: Vec<_> = pinned
                .iter()
                .map(|(id, _)| *id)
                .chain(unpinned.iter().copied())
                .collect();
            container.rebuild(&order);

            pinned.len()
        };

        info!("📌 Applied pinned order: {} pinned listings", pinned_count);
        self.request_rotation();
        pinned_count
    }

    fn request_rotation(&self) {
        if let Some(rotation) = &self.rotation {
            if rotation.send(RotationRequest::PinOrderApplied).is_err() {
                debug!("Rotation scheduler gone, skipping re-trigger");
            }
        }
    }

    /// Pin one listing. Priority defaults to the current pin count + 1.
    pub fn pin(&mut self, identity: &str, priority: Option<i64>) -> Result<()> {
        if self.is_pinned(identity) {
            debug!("📌 Listing already pinned: {}", identity);
            return Err(Error::AlreadyPinned(identity.to_string()));
        }

        let record = {
            let container = lock(&self.container);
            let element = container
                .find_by_identity(identity)
                .ok_or_else(|| Error::ElementNotFound(identity.to_string()))?;
            let facts = element.listing.facts();
            PinRecord {
                id: element.listing.identity(),
                title: facts.title,
                area: facts.area,
                room_type: facts.room_type,
                priority: priority.unwrap_or((self.pinned.len() as i64).saturating_add(1)),
                pinned_at: Utc::now(),
                criteria: None,
            }
        };

        self.pinned.push(record);
        info!("📌 Manually pinned listing: {}", identity);
        self.apply_order();
        self.persist();
        Ok(())
    }

    /// Unpin one listing; `false` when it was not pinned
    pub fn unpin(&mut self, identity: &str) -> bool {
        let before = self.pinned.len();
        self.pinned.retain(|record| record.id != identity);

        if self.pinned.len() == before {
            return false;
        }

        info!("📌 Manually unpinned listing: {}", identity);
        self.apply_order();
        self.persist();
        true
    }

    /// Pin every unpinned listing matching `criteria`. Priorities continue
    /// from the current maximum. Returns how many were pinned.
    pub fn pin_by_criteria(&mut self, criteria: &Criteria) -> usize {
        let already: HashSet<String> = self.pinned.iter().map(|r| r.id.clone()).collect();
        let next_priority = self
            .pinned
            .iter()
            .map(|r| r.priority)
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        let now = Utc::now();

        let matched: Vec<PinRecord> = {
            let container = lock(&self.container);
            let mut seen = HashSet::new();
            container
                .elements()
                .iter()
                .filter_map(|element| {
                    let identity = element.listing.identity();
                    let facts = element.listing.facts();
                    if already.contains(&identity)
                        || !matches_criteria(&facts, criteria)
                        || !seen.insert(identity.clone())
                    {
                        return None;
                    }
                    Some(PinRecord {
                        id: identity,
                        title: facts.title,
                        area: facts.area,
                        room_type: facts.room_type,
                        priority: 0,
                        pinned_at: now,
                        criteria: Some(criteria.clone()),
                    })
                })
                .enumerate()
                .map(|(idx, mut record)| {
                    record.priority = next_priority.saturating_add(idx as i64);
                    record
                })
                .collect()
        };

        let count = matched.len();
        self.pinned.extend(matched);
        info!("📌 Pinned {} listings by criteria {:?}", count, criteria);

        self.apply_order();
        self.persist();
        count
    }

    /// Remove criteria-created pins whose stored attributes match `criteria`.
    /// Manual pins are never removed here. Returns how many were removed.
    pub fn unpin_by_criteria(&mut self, criteria: &Criteria) -> usize {
        let before = self.pinned.len();
        self.pinned.retain(|record| {
            record.criteria.is_none() || !matches_criteria(&record.facts(), criteria)
        });

        let removed = before - self.pinned.len();
        info!("📌 Unpinned {} listings by criteria {:?}", removed, criteria);

        self.apply_order();
        self.persist();
        removed
    }

    pub fn clear_all(&mut self) {
        self.pinned.clear();
        info!("📌 Cleared all pinned listings");
        self.apply_order();
        self.persist();
    }

    pub fn is_pinned(&self, identity: &str) -> bool {
        self.pinned.iter().any(|record| record.id == identity)
    }

    /// Records sorted by priority (stable)
    pub fn pinned_cards(&self) -> Vec<PinRecord> {
        let mut records = self.pinned.clone();
        records.sort_by_key(|record| record.priority);
        records
    }

    pub fn stats(&self) -> PinStats {
        let mut stats = PinStats {
            total_pinned: self.pinned.len(),
            ..PinStats::default()
        };
        for record in &self.pinned {
            *stats.by_room_type.entry(record.room_type.clone()).or_default() += 1;
            *stats.by_area.entry(record.area.clone()).or_default() += 1;
        }
        stats
    }

    /// Current pin set in the shape of the static resource
    pub fn document(&self) -> PinDocument {
        PinDocument {
            pinned_cards: self.pinned_cards(),
        }
    }

    /// `(identity, room type)` of every rendered listing, in display order
    pub fn debug_identities(&self) -> Vec<(String, String)> {
        let container = lock(&self.container);
        let identities: Vec<_> = container
            .elements()
            .iter()
            .map(|e| (e.listing.identity(), e.listing.resolved_room_type()))
            .collect();
        for (identity, room_type) in &identities {
            debug!("🃏 {} ({})", identity, room_type);
        }
        identities
    }

    fn persist(&self) {
        let backup = BackupDocument {
            pinned_cards: self.pinned.clone(),
            settings: BackupSettings {
                max_pinned_cards: self.max_pinned_cards,
                version: BACKUP_SCHEMA_VERSION.to_string(),
            },
        };

        match write_json(self.storage.as_ref(), PIN_BACKUP_KEY, &backup) {
            Ok(()) => debug!("💾 Pin backup saved"),
            Err(e) => warn!("❌ Could not save pin backup: {}", e),
        }
    }
}
