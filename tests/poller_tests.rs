//! Notification poller tests
//!
//! Run with: cargo test --test poller_tests

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rainsafe::api::NotificationApi;
use rainsafe::error::{Error, Result};
use rainsafe::notifications::{
    Notification, NotificationEvent, NotificationPoller, PollOutcome, PollState,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;

fn item(id: i64, second: u32, is_read: bool) -> Notification {
    Notification {
        id,
        title: format!("Rainfall alert {}", id),
        message: "Orange warning for the main campus".to_string(),
        created_at: Utc.with_ymd_and_hms(2025, 8, 12, 14, 0, second).unwrap(),
        is_read,
    }
}

/// Backend stand-in that replays scripted responses with a fixed latency
#[derive(Default)]
struct ScriptedApi {
    responses: Mutex<VecDeque<Option<Vec<Notification>>>>,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    marked: Mutex<Vec<i64>>,
    fail_writes: bool,
}

impl ScriptedApi {
    fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    /// `None` scripts a failed fetch
    fn push(&self, response: Option<Vec<Notification>>) {
        self.responses.lock().unwrap().push_back(response);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationApi for ScriptedApi {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Some(items)) => Ok(items),
            Some(None) => Err(Error::Api {
                status: 502,
                message: "Bad Gateway".to_string(),
            }),
            // Script exhausted: keep answering with nothing new
            None => Ok(Vec::new()),
        }
    }

    async fn mark_as_read(&self, id: i64) -> Result<()> {
        if self.fail_writes {
            return Err(Error::Other("connection reset".to_string()));
        }
        self.marked.lock().unwrap().push(id);
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        if self.fail_writes {
            return Err(Error::Other("connection reset".to_string()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_unread_rise_emits_one_signal_with_newest_item() {
    let api = Arc::new(ScriptedApi::default());
    api.push(Some(vec![item(1, 0, false), item(2, 1, false), item(3, 2, true)]));
    api.push(Some(vec![
        item(6, 9, false),
        item(5, 8, false),
        item(4, 7, false),
        item(1, 0, false),
        item(2, 1, false),
        item(3, 2, true),
    ]));

    let poller = NotificationPoller::new(api.clone(), Duration::from_secs(30));
    let mut events = poller.subscribe();

    assert_eq!(poller.poll_now().await, PollOutcome::Updated);
    assert_eq!(poller.summary().unread_count, 2);
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

    assert_eq!(poller.poll_now().await, PollOutcome::NewArrivals(3));
    assert_eq!(poller.summary().unread_count, 5);

    match events.try_recv() {
        Ok(NotificationEvent::New(newest)) => assert_eq!(newest.id, 6),
        other => panic!("expected one new-notification signal, got {:?}", other),
    }
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_concurrent_ticks_are_skipped() {
    let api = Arc::new(ScriptedApi::with_latency(Duration::from_millis(100)));
    let poller = Arc::new(NotificationPoller::new(api.clone(), Duration::from_secs(30)));

    let first = {
        let poller = Arc::clone(&poller);
        tokio::spawn(async move { poller.poll_now().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(poller.state(), PollState::Polling);

    let (a, b, c) = tokio::join!(poller.poll_now(), poller.poll_now(), poller.poll_now());
    assert_eq!((a, b, c), (PollOutcome::Skipped, PollOutcome::Skipped, PollOutcome::Skipped));

    assert_eq!(first.await.unwrap(), PollOutcome::Updated);
    assert_eq!(poller.state(), PollState::Idle);
    assert_eq!(api.calls(), 1);
}

#[tokio::test]
async fn test_timer_faster_than_latency_keeps_one_request_in_flight() {
    let api = Arc::new(ScriptedApi::with_latency(Duration::from_millis(60)));
    let poller = NotificationPoller::new(api.clone(), Duration::from_millis(10));

    poller.start();
    assert!(poller.is_running());
    tokio::time::sleep(Duration::from_millis(400)).await;
    poller.stop();
    assert!(!poller.is_running());

    assert!(api.calls() >= 2, "expected repeated polling, got {}", api.calls());
    assert_eq!(api.max_in_flight(), 1);
}

#[tokio::test]
async fn test_failure_keeps_summary_and_recovers() {
    let api = Arc::new(ScriptedApi::default());
    api.push(Some(vec![item(1, 0, false)]));
    api.push(None);
    api.push(Some(vec![item(2, 5, false), item(1, 0, false)]));

    let poller = NotificationPoller::new(api.clone(), Duration::from_secs(30));
    let mut events = poller.subscribe();

    assert_eq!(poller.poll_now().await, PollOutcome::Updated);
    assert_eq!(poller.poll_now().await, PollOutcome::Failed);
    assert_eq!(poller.summary().unread_count, 1);
    assert_eq!(poller.state(), PollState::Idle);

    assert_eq!(poller.poll_now().await, PollOutcome::NewArrivals(1));
    assert!(matches!(events.try_recv(), Ok(NotificationEvent::New(n)) if n.id == 2));
}

#[tokio::test]
async fn test_stop_discards_in_flight_result() {
    let api = Arc::new(ScriptedApi::with_latency(Duration::from_millis(80)));
    api.push(Some(vec![item(1, 0, false)]));
    let poller = Arc::new(NotificationPoller::new(api.clone(), Duration::from_secs(30)));

    let pending = {
        let poller = Arc::clone(&poller);
        tokio::spawn(async move { poller.poll_now().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    poller.stop();

    assert_eq!(pending.await.unwrap(), PollOutcome::Discarded);
    assert!(poller.summary().items.is_empty());
    assert_eq!(poller.state(), PollState::Idle);
}

#[tokio::test]
async fn test_mark_as_read_is_optimistic() {
    let api = Arc::new(ScriptedApi::default());
    api.push(Some(vec![item(1, 0, false), item(2, 1, false)]));
    let poller = NotificationPoller::new(api.clone(), Duration::from_secs(30));
    poller.poll_now().await;

    poller.mark_as_read(2).await.unwrap();
    let summary = poller.summary();
    assert_eq!(summary.unread_count, 1);
    assert!(summary.items.iter().any(|n| n.id == 2 && n.is_read));
    assert_eq!(*api.marked.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn test_failed_write_reconciles_on_next_poll() {
    let api = Arc::new(ScriptedApi {
        fail_writes: true,
        ..Default::default()
    });
    for _ in 0..3 {
        api.push(Some(vec![item(1, 0, false), item(2, 1, false)]));
    }
    let poller = NotificationPoller::new(api.clone(), Duration::from_secs(30));
    let mut events = poller.subscribe();
    assert_eq!(poller.poll_now().await, PollOutcome::Updated);

    assert!(poller.clear_all().await.is_err());
    assert!(poller.summary().items.is_empty());

    assert_eq!(poller.poll_now().await, PollOutcome::Updated);
    assert_eq!(poller.summary().unread_count, 2);
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));

    assert!(poller.mark_as_read(2).await.is_err());
    assert_eq!(poller.summary().unread_count, 1);

    assert_eq!(poller.poll_now().await, PollOutcome::Updated);
    assert_eq!(poller.summary().unread_count, 2);
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_clear_during_fetch_does_not_signal_old_items() {
    let api = Arc::new(ScriptedApi::with_latency(Duration::from_millis(50)));
    api.push(Some(vec![item(1, 0, false), item(2, 1, false)]));
    api.push(Some(vec![item(1, 0, false), item(2, 1, false)]));
    let poller = NotificationPoller::new(api.clone(), Duration::from_secs(30));
    let mut events = poller.subscribe();
    poller.poll_now().await;

    let (outcome, cleared) = tokio::join!(poller.poll_now(), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        poller.clear_all().await
    });

    assert!(cleared.is_ok());
    assert_eq!(outcome, PollOutcome::Updated);
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}
