use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::select;
use tokio::sync::{Mutex, watch};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::device::{DeviceClient, ManualColor};
use crate::error::ApiError;
use crate::model::snapshot::Snapshot;
use crate::model::status::{StatusUpdate, normalize};

/// Outcome of the most recent poll tick.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    /// No refresh attempt has completed yet.
    Pending,
    /// The last attempt produced a payload that was merged into the snapshot.
    Merged,
    /// The last attempt failed; the snapshot holds the previous reading.
    Failed,
}

/// Published per-tank state. Swapped as a whole on every tick, so readers see
/// either the previous complete value or the new one, never a torn mix.
#[derive(Clone, Debug, Serialize)]
pub struct TankState {
    pub snapshot: Snapshot,
    pub status: PollState,
    pub polls: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl TankState {
    fn new() -> Self {
        Self {
            snapshot: Snapshot::default(),
            status: PollState::Pending,
            polls: 0,
            last_success: None,
            last_error: None,
        }
    }

    #[must_use]
    pub fn online(&self) -> bool {
        self.status == PollState::Merged
    }
}

/// Typed result of the fetch-and-normalize step, matched explicitly by the
/// tick handler.
enum PollOutcome {
    Merged(StatusUpdate),
    EmptyPayload,
    Error(ApiError),
}

/// Single-flight periodic refresh driver for one controller.
///
/// Exactly one writer (this coordinator) publishes [`TankState`] through a
/// watch channel; presentation adapters subscribe and re-render. Device
/// requests are serialized through the shared client mutex, so a manual color
/// write never interleaves with a status poll on the wire.
pub struct Coordinator {
    tank_name: String,
    client: Arc<Mutex<dyn DeviceClient>>,
    tx: watch::Sender<TankState>,
    interval: watch::Sender<Duration>,
}

impl Coordinator {
    pub fn new(
        tank_name: &str,
        client: Arc<Mutex<dyn DeviceClient>>,
        update_interval: Duration,
    ) -> Self {
        Self {
            tank_name: tank_name.to_string(),
            client,
            tx: watch::Sender::new(TankState::new()),
            interval: watch::Sender::new(update_interval),
        }
    }

    #[must_use]
    pub fn state(&self) -> TankState {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TankState> {
        self.tx.subscribe()
    }

    /// The shared device handle. Write adapters go through this mutex so
    /// commands and polls never overlap on the wire.
    #[must_use]
    pub fn device(&self) -> Arc<Mutex<dyn DeviceClient>> {
        self.client.clone()
    }

    pub fn set_update_interval(&self, update_interval: Duration) {
        log::debug!(
            "[{}] Poll interval set to {update_interval:?}",
            self.tank_name
        );
        self.interval.send_replace(update_interval);
    }

    /// Perform exactly one refresh tick.
    ///
    /// A successful poll merges into the snapshot; a failed or malformed poll
    /// leaves it untouched and only records the failure. Either way the state
    /// is republished, so subscribers can render staleness without ever
    /// observing a regression to defaults.
    pub async fn refresh(&self) {
        let outcome = self.poll_once().await;
        let now = Utc::now();

        self.tx.send_modify(|state| {
            state.polls += 1;
            match outcome {
                PollOutcome::Merged(update) => {
                    state.snapshot.merge(update);
                    state.status = PollState::Merged;
                    state.last_success = Some(now);
                    state.last_error = None;
                }
                PollOutcome::EmptyPayload => {
                    state.status = PollState::Failed;
                    state.last_error = Some("unexpected non-object status payload".to_string());
                }
                PollOutcome::Error(err) => {
                    state.status = PollState::Failed;
                    state.last_error = Some(err.to_string());
                }
            }
        });
    }

    async fn poll_once(&self) -> PollOutcome {
        let raw = {
            let client = self.client.lock().await;
            client.get_status().await
        };

        match raw {
            Ok(raw) => {
                log::trace!("[{}] Raw status payload: {raw}", self.tank_name);
                match normalize(&raw) {
                    Some(update) => PollOutcome::Merged(update),
                    None => {
                        log::warn!(
                            "[{}] Unexpected status payload shape from controller: {raw}",
                            self.tank_name
                        );
                        PollOutcome::EmptyPayload
                    }
                }
            }
            Err(err) => {
                log::error!("[{}] Status fetch failed: {err}", self.tank_name);
                PollOutcome::Error(err)
            }
        }
    }

    /// Write-through of a successful manual color command, ahead of the next
    /// poll reconciling it. Routing adapter writes through the coordinator
    /// keeps the snapshot single-writer.
    pub fn apply_manual_color(&self, color: ManualColor) {
        self.tx.send_modify(|state| {
            state.snapshot.white = color.white;
            state.snapshot.blue = color.blue;
            state.snapshot.green = color.green;
            state.snapshot.red = color.red;
        });
    }

    /// Periodic refresh loop. A failed tick is simply superseded by the next
    /// one; there is no edge-triggered retry. Interval changes take effect
    /// mid-wait, and cancellation stops the loop before its next tick.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = self.interval.subscribe();

        loop {
            let delay = *interval.borrow_and_update();

            select! {
                () = cancel.cancelled() => {
                    log::debug!("[{}] Refresh loop stopped", self.tank_name);
                    return;
                }
                _ = interval.changed() => {
                    // restart the wait with the new cadence
                }
                () = sleep(delay) => {
                    self.refresh().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use crate::error::{ApiError, ApiResult};

    use super::*;

    enum MockReply {
        Payload(Value),
        Failure(String),
    }

    #[derive(Default)]
    struct MockClient {
        replies: StdMutex<VecDeque<MockReply>>,
    }

    impl MockClient {
        fn with_replies(replies: Vec<MockReply>) -> Arc<Mutex<dyn DeviceClient>> {
            Arc::new(Mutex::new(Self {
                replies: StdMutex::new(replies.into()),
            }))
        }
    }

    #[async_trait]
    impl DeviceClient for MockClient {
        async fn get_status(&self) -> ApiResult<Value> {
            match self.replies.lock().unwrap().pop_front() {
                Some(MockReply::Payload(value)) => Ok(value),
                Some(MockReply::Failure(msg)) => Err(ApiError::service_error(msg)),
                None => panic!("mock exhausted"),
            }
        }

        async fn start_manual_color_simulation(&self, _minutes: u32) -> ApiResult<()> {
            Ok(())
        }

        async fn set_manual_color(&self, _color: ManualColor) -> ApiResult<()> {
            Ok(())
        }
    }

    fn coordinator(replies: Vec<MockReply>) -> Coordinator {
        Coordinator::new(
            "test-tank",
            MockClient::with_replies(replies),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn first_refresh_merges_payload() {
        let coord = coordinator(vec![MockReply::Payload(json!({
            "currentRed": 50,
            "currentProfile": "Sunrise",
            "deviceTime": "07:30",
        }))]);

        assert_eq!(coord.state().status, PollState::Pending);

        coord.refresh().await;

        let state = coord.state();
        assert_eq!(state.status, PollState::Merged);
        assert_eq!(state.polls, 1);
        assert_eq!(state.snapshot.red, 50);
        assert_eq!(state.snapshot.current_profile, "Sunrise");
        assert!(state.last_success.is_some());
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn failed_poll_preserves_previous_snapshot() {
        let coord = coordinator(vec![
            MockReply::Payload(json!({ "currentRed": 50, "currentProfile": "Sunrise" })),
            MockReply::Failure("connection refused".to_string()),
        ]);

        coord.refresh().await;
        let before = coord.state().snapshot;

        coord.refresh().await;
        let state = coord.state();

        assert_eq!(state.status, PollState::Failed);
        assert_eq!(state.snapshot, before);
        assert!(state.last_error.is_some());
        // the earlier success timestamp is kept
        assert!(state.last_success.is_some());
    }

    #[tokio::test]
    async fn non_object_payload_is_a_failed_tick() {
        let coord = coordinator(vec![
            MockReply::Payload(json!({ "currentBlue": 30 })),
            MockReply::Payload(json!(["not", "an", "object"])),
        ]);

        coord.refresh().await;
        coord.refresh().await;

        let state = coord.state();
        assert_eq!(state.status, PollState::Failed);
        assert_eq!(state.snapshot.blue, 30);
        assert_eq!(state.polls, 2);
    }

    #[tokio::test]
    async fn first_refresh_failure_leaves_defaults() {
        let coord = coordinator(vec![MockReply::Failure("timeout".to_string())]);

        coord.refresh().await;

        let state = coord.state();
        assert_eq!(state.status, PollState::Failed);
        assert_eq!(state.snapshot, Snapshot::default());
        assert!(!state.online());
    }

    #[tokio::test]
    async fn recovery_after_failures_keeps_earlier_extras() {
        let coord = coordinator(vec![
            MockReply::Payload(json!({ "currentRed": 20, "firmwareVersion": "2.2.2" })),
            MockReply::Failure("timeout".to_string()),
            MockReply::Failure("timeout".to_string()),
            MockReply::Payload(json!({ "currentWhite": 100 })),
        ]);

        for _ in 0..4 {
            coord.refresh().await;
        }

        let state = coord.state();
        assert_eq!(state.status, PollState::Merged);
        assert_eq!(state.snapshot.white, 100);
        assert_eq!(state.snapshot.extra["firmwareVersion"], json!("2.2.2"));
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn subscribers_are_notified_on_failed_ticks_too() {
        let coord = coordinator(vec![MockReply::Failure("timeout".to_string())]);
        let mut rx = coord.subscribe();
        rx.mark_unchanged();

        coord.refresh().await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, PollState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_polls_on_interval_and_stops_on_cancel() {
        let coord = Arc::new(Coordinator::new(
            "test-tank",
            MockClient::with_replies(vec![
                MockReply::Payload(json!({ "currentRed": 10 })),
                MockReply::Payload(json!({ "currentRed": 20 })),
            ]),
            Duration::from_secs(60),
        ));

        let cancel = CancellationToken::new();
        let task = {
            let coord = coord.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { coord.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(coord.state().polls, 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(coord.state().polls, 2);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_takes_effect_mid_wait() {
        let coord = Arc::new(Coordinator::new(
            "test-tank",
            MockClient::with_replies(vec![MockReply::Payload(json!({ "currentRed": 10 }))]),
            Duration::from_secs(3600),
        ));

        let cancel = CancellationToken::new();
        let task = {
            let coord = coord.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { coord.run(cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        coord.set_update_interval(Duration::from_secs(15));

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(coord.state().polls, 1);

        cancel.cancel();
        task.await.unwrap();
    }
}
