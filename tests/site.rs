use std::sync::Arc;
use std::time::Duration;

use pg_finder::page::{parse_listings, FilterConfig, ListingElement};
use pg_finder::pins::{Criteria, StaticPinSource};
use pg_finder::rotation::Visibility;
use pg_finder::storage::{KeyValueStore, MemoryStore};
use pg_finder::{BackupPolicy, Config, Scheduling, Site};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// (title, data-type, price)
fn page(cards: &[(&str, &str, u32)]) -> String {
    let cards: String = cards
        .iter()
        .map(|(title, room_type, price)| {
            format!(
                r#"<div class="card" data-type="{room_type}" data-price="low" data-area="nanak-nagar">
                     <h3 class="card-title">{title}</h3>
                     <span class="area-tag">Nanak Nagar</span>
                     <div class="card-price">₹{price}<span>/month</span></div>
                     <span class="feature-tag">WiFi</span>
                   </div>"#
            )
        })
        .collect();
    format!(r#"<html><body><div class="cards-container">{cards}</div></body></html>"#)
}

fn six_singles() -> String {
    page(&[
        ("A", "single", 6000),
        ("B", "single", 6000),
        ("C", "single", 6000),
        ("D", "single", 6000),
        ("E", "single", 6000),
        ("F", "single", 6000),
    ])
}

const A_AND_B_PINNED: &str = r#"{"pinnedCards":[
    {"id":"A-Nanak Nagar-single","title":"A","area":"Nanak Nagar","roomType":"single","priority":2,"pinnedAt":"2024-01-01T00:00:00Z"},
    {"id":"B-Nanak Nagar-single","title":"B","area":"Nanak Nagar","roomType":"single","priority":1,"pinnedAt":"2024-01-01T00:00:00Z"}
]}"#;

async fn start(
    config: &Config,
    html: &str,
    source: StaticPinSource,
    storage: Arc<dyn KeyValueStore>,
    scheduling: Scheduling,
) -> Site {
    let listings = parse_listings(html).unwrap();
    Site::start_with(config, listings, Box::new(source), storage, scheduling, |selector| {
        selector.with_rng(StdRng::seed_from_u64(7))
    })
    .await
}

fn titles(elements: &[ListingElement]) -> Vec<&str> {
    elements.iter().map(|e| e.listing.title.as_str()).collect()
}

#[tokio::test]
async fn pinned_first_then_ranked_picks_then_the_rest() {
    let site = start(
        &Config::default(),
        &six_singles(),
        StaticPinSource::new(A_AND_B_PINNED),
        Arc::new(MemoryStore::new()),
        Scheduling::Manual,
    )
    .await;

    let order = site.snapshot();
    assert_eq!(order.len(), 6);
    assert_eq!(titles(&order)[..2], ["B", "A"]);
    assert!(order[..2].iter().all(|e| e.pin_indicator));
    assert!(order[2..].iter().all(|e| !e.pin_indicator));

    let ranks: Vec<usize> = order[2..5]
        .iter()
        .map(|e| e.rotation_badge.as_ref().unwrap().rank)
        .collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    assert!(order[5].rotation_badge.is_none());

    let status = site.rotation_status();
    assert_eq!(status.rotation_count, 1);
    assert!(status.last_rotation_at().is_some());
}

#[tokio::test]
async fn rotation_never_moves_pinned_listings() {
    let site = start(
        &Config::default(),
        &six_singles(),
        StaticPinSource::new(A_AND_B_PINNED),
        Arc::new(MemoryStore::new()),
        Scheduling::Manual,
    )
    .await;

    for _ in 0..10 {
        site.force_rotation().unwrap();
        let order = site.snapshot();
        assert_eq!(titles(&order)[..2], ["B", "A"]);
        assert!(order[..2].iter().all(|e| e.rotation_badge.is_none()));
    }
    assert_eq!(site.rotation_status().rotation_count, 11);
}

#[tokio::test]
async fn malformed_resource_leaves_page_order() {
    let mut config = Config::default();
    config.rotation.enabled = false;

    let site = start(
        &config,
        &six_singles(),
        StaticPinSource::new("{not json"),
        Arc::new(MemoryStore::new()),
        Scheduling::Manual,
    )
    .await;

    let order = site.snapshot();
    assert_eq!(titles(&order), ["A", "B", "C", "D", "E", "F"]);
    assert!(order.iter().all(|e| !e.pin_indicator));
    assert_eq!(site.stats().total_pinned, 0);
}

#[tokio::test]
async fn backup_restores_pins_only_when_allowed() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let first = start(
        &Config::default(),
        &six_singles(),
        StaticPinSource::new(A_AND_B_PINNED),
        storage.clone(),
        Scheduling::Manual,
    )
    .await;
    assert!(first.pin("C-Nanak Nagar-single", None));
    drop(first);

    let authoritative = start(
        &Config::default(),
        &six_singles(),
        StaticPinSource::unavailable(),
        storage.clone(),
        Scheduling::Manual,
    )
    .await;
    assert_eq!(authoritative.stats().total_pinned, 0);

    let mut config = Config::default();
    config.backup_policy = BackupPolicy::FallbackToBackup;
    let fallback = start(
        &config,
        &six_singles(),
        StaticPinSource::unavailable(),
        storage,
        Scheduling::Manual,
    )
    .await;
    assert_eq!(fallback.stats().total_pinned, 3);
    assert_eq!(titles(&fallback.snapshot())[..3], ["B", "A", "C"]);
}

#[tokio::test]
async fn pin_controls_keep_pins_in_front() {
    let site = start(
        &Config::default(),
        &page(&[
            ("A", "single", 6000),
            ("B", "double", 8000),
            ("C", "double", 8500),
            ("D", "triple", 5500),
            ("E", "single", 6500),
        ]),
        StaticPinSource::new(r#"{"pinnedCards":[]}"#),
        Arc::new(MemoryStore::new()),
        Scheduling::Manual,
    )
    .await;

    assert_eq!(site.pin_by_criteria(&Criteria::room_type("double")), 2);
    assert!(site.pin("E-Nanak Nagar-single", Some(0)));
    assert!(!site.pin("E-Nanak Nagar-single", None));
    assert!(!site.pin("Missing-Nanak Nagar-single", None));

    let order = site.snapshot();
    assert_eq!(titles(&order)[..3], ["E", "B", "C"]);
    assert_eq!(site.stats().by_room_type.get("double"), Some(&2));

    assert_eq!(site.unpin_by_criteria(&Criteria::room_type("double")), 2);
    assert!(site.is_pinned("E-Nanak Nagar-single"));
    assert_eq!(site.pinned_cards().len(), 1);

    site.clear_all();
    assert!(site.snapshot().iter().all(|e| !e.pin_indicator));
    assert!(site.pin_document().pinned_cards.is_empty());
}

#[tokio::test]
async fn filtering_hides_listings_without_breaking_pins() {
    let site = start(
        &Config::default(),
        &page(&[
            ("A", "single", 6000),
            ("B", "single", 6000),
            ("C", "double", 8000),
            ("D", "double", 8200),
            ("E", "triple", 5500),
            ("F", "triple", 5800),
        ]),
        StaticPinSource::new(A_AND_B_PINNED),
        Arc::new(MemoryStore::new()),
        Scheduling::Manual,
    )
    .await;

    let filter = FilterConfig {
        room_type: "double".to_string(),
        ..FilterConfig::default()
    };
    assert_eq!(site.apply_filters(&filter), 2);

    let order = site.snapshot();
    assert_eq!(titles(&order)[..2], ["B", "A"]);
    assert!(order[..2].iter().all(|e| e.pin_indicator && !e.visible));

    let visible: Vec<&str> = order
        .iter()
        .filter(|e| e.visible)
        .map(|e| e.listing.title.as_str())
        .collect();
    assert_eq!(visible.len(), 2);
    assert!(visible.contains(&"C") && visible.contains(&"D"));

    assert_eq!(site.apply_filters(&FilterConfig::default()), 6);
}

#[tokio::test]
async fn disabling_rotation_strips_badges() {
    let site = start(
        &Config::default(),
        &six_singles(),
        StaticPinSource::new(A_AND_B_PINNED),
        Arc::new(MemoryStore::new()),
        Scheduling::Manual,
    )
    .await;

    site.disable_rotation();
    assert!(site.snapshot().iter().all(|e| e.rotation_badge.is_none()));
    assert!(site.force_rotation().is_none());
    assert!(!site.rotation_status().enabled);

    assert!(site.enable_rotation().is_some());
    let badged = site
        .snapshot()
        .iter()
        .filter(|e| e.rotation_badge.is_some())
        .count();
    assert_eq!(badged, 3);
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

async fn step(duration: Duration) {
    settle().await;
    tokio::time::advance(duration).await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn background_scheduler_follows_pins_and_visibility() {
    let site = start(
        &Config::default(),
        &six_singles(),
        StaticPinSource::new(A_AND_B_PINNED),
        Arc::new(MemoryStore::new()),
        Scheduling::Background,
    )
    .await;

    // nothing rotates inline in the background mode
    assert_eq!(site.rotation_status().rotation_count, 0);
    step(Duration::from_millis(150)).await;
    assert_eq!(site.rotation_status().rotation_count, 1);

    assert!(site.pin("C-Nanak Nagar-single", None));
    step(Duration::from_millis(150)).await;
    assert_eq!(site.rotation_status().rotation_count, 2);
    assert_eq!(titles(&site.snapshot())[..3], ["B", "A", "C"]);

    // already visible, so nothing was regained
    site.set_visibility(Visibility::Visible);
    step(Duration::from_millis(600)).await;
    assert_eq!(site.rotation_status().rotation_count, 2);

    site.set_visibility(Visibility::Hidden);
    step(Duration::from_secs(30 * 60)).await;
    assert_eq!(site.rotation_status().rotation_count, 2);

    site.set_visibility(Visibility::Visible);
    step(Duration::from_millis(600)).await;
    assert_eq!(site.rotation_status().rotation_count, 3);

    tokio::time::timeout(Duration::from_secs(5), site.shutdown())
        .await
        .expect("scheduler should stop with the site");
}
