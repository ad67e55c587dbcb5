use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::RotationConfig;
use crate::rotation::selector::RotationSelector;
use crate::rotation::{RotationRequest, Visibility};
use crate::sync::lock;

/// Drives automatic rotation passes.
///
/// Waits for the pin store to become ready, rotates once, then rotates on
/// the interval (while visible), shortly after the page becomes visible
/// again, and one frame after every pin reorder. Passes run one at a time.
pub struct RotationScheduler {
    selector: Arc<Mutex<RotationSelector>>,
    config: RotationConfig,
    ready: watch::Receiver<bool>,
    visibility: watch::Receiver<Visibility>,
    requests: mpsc::UnboundedReceiver<RotationRequest>,
}

impl RotationScheduler {
    pub fn new(
        selector: Arc<Mutex<RotationSelector>>,
        config: RotationConfig,
        ready: watch::Receiver<bool>,
        visibility: watch::Receiver<Visibility>,
        requests: mpsc::UnboundedReceiver<RotationRequest>,
    ) -> Self {
        Self {
            selector,
            config,
            ready,
            visibility,
            requests,
        }
    }

    fn rotate(&self, reason: &str) {
        debug!("🔄 Rotation triggered: {}", reason);
        lock(&self.selector).apply();
    }

    fn is_visible(&self) -> bool {
        *self.visibility.borrow() == Visibility::Visible
    }

    /// Run until every request sender is dropped
    pub async fn run(mut self) {
        let became_ready = self.ready.wait_for(|ready| *ready).await.is_ok();
        if !became_ready {
            warn!("Pin store went away before it was ready, rotating anyway");
        }

        sleep(self.config.frame_delay()).await;
        self.rotate("startup");

        // the startup pass already saw the pin order these asked for
        while let Ok(request) = self.requests.try_recv() {
            debug!("Dropping {:?} queued before startup", request);
        }

        info!("🎲 Rotation scheduler running");

        let period = self.config.interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut watching_visibility = true;
        let mut was_visible = self.is_visible();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.is_visible() {
                        self.rotate("interval");
                    } else {
                        debug!("Page hidden, skipping scheduled rotation");
                    }
                }
                changed = self.visibility.changed(), if watching_visibility => {
                    if changed.is_err() {
                        watching_visibility = false;
                        continue;
                    }
                    let visible = *self.visibility.borrow_and_update() == Visibility::Visible;
                    let regained = visible && !was_visible;
                    was_visible = visible;
                    if regained {
                        sleep(self.config.visibility_delay()).await;
                        self.rotate("visibility regained");
                    }
                }
                request = self.requests.recv() => {
                    match request {
                        Some(RotationRequest::PinOrderApplied) => {
                            sleep(self.config.frame_delay()).await;
                            self.rotate("pin order applied");
                        }
                        None => break,
                    }
                }
            }
        }

        info!("Rotation scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::SharedContainer;
    use crate::storage::{KeyValueStore, MemoryStore};
    use crate::test_utils::shared_container;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;

    struct Harness {
        selector: Arc<Mutex<RotationSelector>>,
        ready: watch::Sender<bool>,
        visibility: watch::Sender<Visibility>,
        requests: mpsc::UnboundedSender<RotationRequest>,
        handle: tokio::task::JoinHandle<()>,
    }

    fn spawn(container: &SharedContainer) -> Harness {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let config = RotationConfig::default();
        let selector = Arc::new(Mutex::new(
            RotationSelector::new(container.clone(), storage, config.clone())
                .with_rng(StdRng::seed_from_u64(21)),
        ));
        let (ready, ready_rx) = watch::channel(false);
        let (visibility, visibility_rx) = watch::channel(Visibility::Visible);
        let (requests, requests_rx) = mpsc::unbounded_channel();

        let scheduler =
            RotationScheduler::new(selector.clone(), config, ready_rx, visibility_rx, requests_rx);
        let handle = tokio::spawn(scheduler.run());

        Harness {
            selector,
            ready,
            visibility,
            requests,
            handle,
        }
    }

    fn count(harness: &Harness) -> u64 {
        lock(&harness.selector).status().rotation_count
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    /// Let the scheduler catch up, move the paused clock, let it catch up again
    async fn step(duration: Duration) {
        settle().await;
        tokio::time::advance(duration).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_ready_before_first_rotation() {
        let container = shared_container(&["A", "B", "C", "D", "E"]);
        let harness = spawn(&container);

        step(Duration::from_secs(5)).await;
        assert_eq!(count(&harness), 0);

        harness.requests.send(RotationRequest::PinOrderApplied).unwrap();
        harness.ready.send_replace(true);
        step(Duration::from_millis(150)).await;
        // the queued request is folded into the startup pass
        assert_eq!(count(&harness), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pin_reorders_trigger_a_pass_after_a_frame() {
        let container = shared_container(&["A", "B", "C", "D", "E"]);
        let harness = spawn(&container);
        harness.ready.send_replace(true);
        step(Duration::from_millis(150)).await;
        assert_eq!(count(&harness), 1);

        harness.requests.send(RotationRequest::PinOrderApplied).unwrap();
        settle().await;
        assert_eq!(count(&harness), 1);
        step(Duration::from_millis(150)).await;
        assert_eq!(count(&harness), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_only_rotates_while_visible() {
        let container = shared_container(&["A", "B", "C", "D", "E"]);
        let harness = spawn(&container);
        harness.ready.send_replace(true);
        step(Duration::from_millis(150)).await;

        step(Duration::from_secs(30 * 60)).await;
        assert_eq!(count(&harness), 2);

        harness.visibility.send_replace(Visibility::Hidden);
        step(Duration::from_secs(30 * 60)).await;
        assert_eq!(count(&harness), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn regaining_visibility_rotates_after_delay() {
        let container = shared_container(&["A", "B", "C", "D", "E"]);
        let harness = spawn(&container);
        harness.ready.send_replace(true);
        step(Duration::from_millis(150)).await;

        harness.visibility.send_replace(Visibility::Hidden);
        settle().await;
        harness.visibility.send_replace(Visibility::Visible);
        settle().await;
        assert_eq!(count(&harness), 1);

        step(Duration::from_millis(600)).await;
        assert_eq!(count(&harness), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_visible_is_not_a_regain() {
        let container = shared_container(&["A", "B", "C", "D", "E"]);
        let harness = spawn(&container);
        harness.ready.send_replace(true);
        step(Duration::from_millis(150)).await;
        assert_eq!(count(&harness), 1);

        harness.visibility.send_replace(Visibility::Visible);
        step(Duration::from_millis(600)).await;
        assert_eq!(count(&harness), 1);

        harness.visibility.send_replace(Visibility::Hidden);
        settle().await;
        harness.visibility.send_replace(Visibility::Hidden);
        settle().await;
        harness.visibility.send_replace(Visibility::Visible);
        step(Duration::from_millis(600)).await;
        assert_eq!(count(&harness), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_requests_close() {
        let container = shared_container(&["A", "B"]);
        let Harness {
            ready,
            requests,
            handle,
            ..
        } = spawn(&container);
        ready.send_replace(true);
        drop(requests);

        step(Duration::from_millis(150)).await;
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop")
            .unwrap();
    }
}
