//! Background notification polling
//!
//! The poller alternates between `Idle` and `Polling`. A timer tick while a
//! fetch is in flight is skipped, so at most one request is ever outstanding
//! no matter how slow the backend is. Every start and stop bumps an epoch;
//! a fetch whose epoch is stale when it completes is discarded.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::models::{Notification, NotificationEvent, NotificationSummary};
use crate::api::NotificationApi;
use crate::error::Result;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another fetch was still in flight
    Skipped,
    /// Summary replaced, unread count did not go up
    Updated,
    /// Summary replaced and the unread count rose by this much
    NewArrivals(usize),
    /// Fetch failed, previous summary kept
    Failed,
    /// Poller was stopped or restarted while the fetch was in flight
    Discarded,
}

/// Last server response plus any local edits made since
struct Polled {
    summary: NotificationSummary,
    /// Unread count as the server reported it, untouched by local edits
    server_unread: usize,
}

impl Polled {
    fn new(summary: NotificationSummary) -> Self {
        Self {
            server_unread: summary.unread_count,
            summary,
        }
    }
}

struct Shared {
    api: Arc<dyn NotificationApi>,
    in_flight: AtomicBool,
    epoch: AtomicU64,
    /// `None` until the first successful poll establishes a baseline
    polled: RwLock<Option<Polled>>,
    events: broadcast::Sender<NotificationEvent>,
}

/// Resets the in-flight flag even if the tick future is dropped mid-fetch
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Shared {
    async fn tick(&self) -> PollOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Notification fetch still in flight, skipping tick");
            return PollOutcome::Skipped;
        }
        let _in_flight = InFlight(&self.in_flight);

        let epoch = self.epoch.load(Ordering::Acquire);
        let result = self.api.fetch_notifications().await;
        self.apply(epoch, result)
    }

    fn apply(&self, epoch: u64, result: Result<Vec<Notification>>) -> PollOutcome {
        let mut polled = self.polled.write().unwrap_or_else(PoisonError::into_inner);

        if self.epoch.load(Ordering::Acquire) != epoch {
            debug!("Poller restarted during fetch, discarding result");
            return PollOutcome::Discarded;
        }

        let items = match result {
            Ok(items) => items,
            Err(e) => {
                warn!("Failed to fetch notifications: {}", e);
                return PollOutcome::Failed;
            }
        };

        // Arrivals are measured against the last server count; local edits
        // do not move it.
        let next = Polled::new(NotificationSummary::new(items));
        let previous = polled.as_ref().map(|p| p.server_unread);
        let next = polled.insert(next).summary.clone();
        drop(polled);

        let Some(previous) = previous else {
            debug!("Notification baseline: {} unread", next.unread_count);
            return PollOutcome::Updated;
        };

        if next.unread_count <= previous {
            return PollOutcome::Updated;
        }

        let increase = next.unread_count - previous;
        if let Some(newest) = next.newest_unread() {
            debug!("{} new notification(s), newest #{}", increase, newest.id);
            // No receivers is fine
            let _ = self.events.send(NotificationEvent::New(newest.clone()));
        }
        PollOutcome::NewArrivals(increase)
    }
}

/// Periodically fetches the user's notifications
pub struct NotificationPoller {
    shared: Arc<Shared>,
    interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationPoller {
    pub fn new(api: Arc<dyn NotificationApi>, interval: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                api,
                in_flight: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                polled: RwLock::new(None),
                events,
            }),
            interval,
            timer: Mutex::new(None),
        }
    }

    /// Start the timer. Must be called from within a tokio runtime.
    ///
    /// The first tick fires immediately. Calling `start` on a running poller
    /// does nothing.
    pub fn start(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        self.shared.epoch.fetch_add(1, Ordering::AcqRel);
        let shared = Arc::clone(&self.shared);
        let period = self.interval;

        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                // The fetch runs on its own task so a slow request cannot
                // hold up the timer; overlapping ticks are skipped in `tick`.
                let shared = Arc::clone(&shared);
                tokio::spawn(async move {
                    shared.tick().await;
                });
            }
        }));

        info!("Notification polling started (every {:?})", period);
    }

    /// Cancel the timer and forget the current summary.
    ///
    /// A fetch already in flight is allowed to finish, but its result is
    /// dropped.
    pub fn stop(&self) {
        let handle = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let mut polled = self.shared.polled.write().unwrap_or_else(PoisonError::into_inner);
        self.shared.epoch.fetch_add(1, Ordering::AcqRel);
        *polled = None;
        drop(polled);

        if let Some(handle) = handle {
            handle.abort();
            info!("Notification polling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn state(&self) -> PollState {
        if self.shared.in_flight.load(Ordering::Acquire) {
            PollState::Polling
        } else {
            PollState::Idle
        }
    }

    /// Run one tick right away
    pub async fn poll_now(&self) -> PollOutcome {
        self.shared.tick().await
    }

    /// Current summary, empty before the first successful poll
    pub fn summary(&self) -> NotificationSummary {
        self.shared
            .polled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|polled| polled.summary.clone())
            .unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.shared.events.subscribe()
    }

    /// Mark a notification read locally, then tell the backend.
    ///
    /// The local change is kept even if the request fails; the next poll
    /// brings the summary back in line with the server.
    pub async fn mark_as_read(&self, id: i64) -> Result<()> {
        let known = self
            .shared
            .polled
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
            .is_some_and(|polled| polled.summary.mark_read(id));
        if !known {
            debug!("Notification #{} not in local summary", id);
        }

        self.shared.api.mark_as_read(id).await.inspect_err(|e| {
            warn!("Failed to mark notification #{} as read: {}", id, e);
        })
    }

    /// Empty the local summary, then delete everything on the backend
    pub async fn clear_all(&self) -> Result<()> {
        {
            let mut polled = self.shared.polled.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(polled) = polled.as_mut() {
                polled.summary = NotificationSummary::default();
            }
        }

        self.shared.api.clear_all().await.inspect_err(|e| {
            warn!("Failed to clear notifications: {}", e);
        })
    }
}

impl Drop for NotificationPoller {
    fn drop(&mut self) {
        if let Some(handle) = self
            .timer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}
