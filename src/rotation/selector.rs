use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::RotationConfig;
use crate::error::Error;
use crate::models::RotationHistory;
use crate::page::{ElementId, HighlightPulse, ListingContainer, RotationBadge, SharedContainer};
use crate::storage::{read_json, write_json, KeyValueStore, ROTATION_HISTORY_KEY};
use crate::sync::lock;

/// Badge text shown next to the rank
pub const TOP_PICK_LABEL: &str = "TOP PICK";

/// An unpinned listing that may be featured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: ElementId,
    pub identity: String,
}

/// Result of one rotation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationOutcome {
    /// Featured identities, rank #1 first
    pub picks: Vec<String>,
    pub eligible: usize,
}

/// Rotation state as reported to the control surface
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RotationStatus {
    pub enabled: bool,
    /// Epoch milliseconds, 0 when no rotation happened yet
    pub last_rotation: i64,
    pub rotation_count: u64,
    pub top_positions: usize,
}

impl RotationStatus {
    pub fn last_rotation_at(&self) -> Option<DateTime<Utc>> {
        if self.last_rotation == 0 {
            return None;
        }
        Utc.timestamp_millis_opt(self.last_rotation).single()
    }
}

/// Pick up to `top_slots` candidates, preferring ones not in `recent`.
///
/// When fewer than `top_slots` fresh candidates exist the whole eligible set
/// is used, so history only biases the pick and never starves it. The pool is
/// shuffled (Fisher-Yates) and the first `top_slots` become ranks #1, #2, ...
pub fn select_top<R: Rng + ?Sized>(
    eligible: &[Candidate],
    recent: &[String],
    top_slots: usize,
    rng: &mut R,
) -> Vec<Candidate> {
    let recent: HashSet<&str> = recent.iter().map(String::as_str).collect();
    let fresh: Vec<Candidate> = eligible
        .iter()
        .filter(|c| !recent.contains(c.identity.as_str()))
        .cloned()
        .collect();

    let mut pool = if fresh.len() >= top_slots {
        fresh
    } else {
        eligible.to_vec()
    };

    pool.shuffle(rng);
    pool.truncate(top_slots);
    pool
}

/// Features a rotating handful of unpinned listings right after the pinned ones
pub struct RotationSelector {
    container: SharedContainer,
    storage: Arc<dyn KeyValueStore>,
    config: RotationConfig,
    enabled: bool,
    rng: StdRng,
}

impl RotationSelector {
    pub fn new(
        container: SharedContainer,
        storage: Arc<dyn KeyValueStore>,
        config: RotationConfig,
    ) -> Self {
        Self {
            container,
            storage,
            enabled: config.enabled,
            config,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Replace the random source, e.g. with a seeded one
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Listings without a pin indicator, in display order
    pub fn eligible_listings(container: &ListingContainer) -> Vec<Candidate> {
        container
            .elements()
            .iter()
            .filter(|e| !e.pin_indicator)
            .map(|e| Candidate {
                id: e.id,
                identity: e.listing.identity(),
            })
            .collect()
    }

    pub fn select(&mut self, eligible: &[Candidate], history: &RotationHistory) -> Vec<Candidate> {
        select_top(eligible, &history.top_identities, self.config.top_slots, &mut self.rng)
    }

    /// Badge the selection by rank and schedule staggered highlight pulses
    pub fn decorate(&self, container: &mut ListingContainer, selection: &[Candidate]) {
        container.clear_rotation_badges();

        for (idx, candidate) in selection.iter().enumerate() {
            let rank = idx + 1;
            container.attach_rotation_badge(
                candidate.id,
                RotationBadge {
                    rank,
                    label: TOP_PICK_LABEL.to_string(),
                },
            );
            container.set_highlight(
                candidate.id,
                HighlightPulse {
                    delay: self.config.highlight_step().saturating_mul(rank as u32),
                    duration: self.config.highlight_duration(),
                },
            );
        }
    }

    /// Rebuild the container as pinned, then the selection, then the rest
    /// shuffled.
    ///
    /// Pinned elements are read from the live pin indicators, not from the
    /// pin store, so they always stay in front.
    pub fn reorder(
        &mut self,
        container: &mut ListingContainer,
        selection: &[Candidate],
        eligible: &[Candidate],
    ) {
        let pinned = container.pinned_ids();
        let selected: HashSet<ElementId> = selection.iter().map(|c| c.id).collect();

        let mut remaining: Vec<ElementId> = eligible
            .iter()
            .map(|c| c.id)
            .filter(|id| !selected.contains(id) && !container.has_pin_indicator(*id))
            .collect();
        remaining.shuffle(&mut self.rng);

        let order: Vec<ElementId> = pinned
            .into_iter()
            .chain(selection.iter().map(|c| c.id))
            .chain(remaining)
            .collect();

        container.rebuild(&order);
    }

    /// Run one rotation pass.
    ///
    /// Returns `None` when rotation is disabled or there are no more eligible
    /// listings than top slots, in which case nothing is touched.
    pub fn apply(&mut self) -> Option<RotationOutcome> {
        if !self.enabled {
            debug!("🔄 Rotation disabled");
            return None;
        }

        let container = self.container.clone();
        let mut container = lock(&container);

        let eligible = Self::eligible_listings(&container);
        if eligible.len() <= self.config.top_slots {
            debug!(
                "🔄 Not enough listings for rotation ({} eligible, {} slots)",
                eligible.len(),
                self.config.top_slots
            );
            return None;
        }

        info!("🔄 Applying rotation to {} eligible listings", eligible.len());

        let history = self.history();
        let selection = self.select(&eligible, &history);
        if selection.is_empty() {
            warn!("❌ No listings selected for rotation");
            return None;
        }

        self.reorder(&mut container, &selection, &eligible);
        self.decorate(&mut container, &selection);
        drop(container);

        self.save_history(&selection, &history);

        let picks: Vec<String> = selection.into_iter().map(|c| c.identity).collect();
        for (idx, identity) in picks.iter().enumerate() {
            info!("🎯 #{}: {}", idx + 1, identity);
        }

        Some(RotationOutcome {
            picks,
            eligible: eligible.len(),
        })
    }

    /// Rotate now, ignoring the timer
    pub fn force(&mut self) -> Option<RotationOutcome> {
        info!("🔄 Forcing rotation");
        self.apply()
    }

    /// Disabling strips badges and suppresses automatic passes; enabling
    /// rotates once immediately.
    pub fn set_enabled(&mut self, enabled: bool) -> Option<RotationOutcome> {
        self.enabled = enabled;
        info!("🔄 Rotation {}", if enabled { "enabled" } else { "disabled" });

        if enabled {
            self.apply()
        } else {
            lock(&self.container).clear_rotation_badges();
            None
        }
    }

    /// Stored history, or an empty one when missing or unreadable.
    /// Corrupt entries are dropped so the next pass starts clean.
    pub fn history(&self) -> RotationHistory {
        match read_json::<RotationHistory>(self.storage.as_ref(), ROTATION_HISTORY_KEY) {
            Ok(history) => history.unwrap_or_default(),
            Err(Error::MalformedData(e)) => {
                warn!("❌ Discarding unreadable rotation history: {}", e);
                if let Err(e) = self.storage.remove(ROTATION_HISTORY_KEY) {
                    debug!("Could not remove rotation history: {}", e);
                }
                RotationHistory::default()
            }
            Err(e) => {
                warn!("❌ Could not read rotation history: {}", e);
                RotationHistory::default()
            }
        }
    }

    fn save_history(&self, selection: &[Candidate], previous: &RotationHistory) {
        let history = RotationHistory {
            last_rotation: Utc::now().timestamp_millis(),
            top_identities: selection.iter().map(|c| c.identity.clone()).collect(),
            rotation_count: previous.rotation_count + 1,
        };

        if let Err(e) = write_json(self.storage.as_ref(), ROTATION_HISTORY_KEY, &history) {
            warn!("❌ Could not save rotation history: {}", e);
        }
    }

    pub fn status(&self) -> RotationStatus {
        let history = self.history();
        RotationStatus {
            enabled: self.enabled,
            last_rotation: history.last_rotation,
            rotation_count: history.rotation_count,
            top_positions: self.config.top_slots,
        }
    }
}
