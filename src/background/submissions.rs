use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::watch;
use uuid::Uuid;

use crate::workflow::submission::SubmissionState;

pub type StateSender = Arc<watch::Sender<SubmissionState>>;

/// How long a rendered form may go unwatched before its channel is dropped.
const UNCLAIMED_FOR: Duration = Duration::from_secs(300);

struct Live {
    sender: StateSender,
    opened: Instant,
}

/// Live post submissions, keyed by the id the form was rendered with.
///
/// Rendering the form opens the channel; only the submission itself and
/// `open` create entries, so a client reconnecting after `finish` finds
/// nothing.
#[derive(Default)]
pub struct SubmissionTracker {
    live: DashMap<Uuid, Live>,
}

impl SubmissionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly rendered form.
    pub fn open(&self, id: Uuid) {
        self.channel(id);
    }

    pub fn channel(&self, id: Uuid) -> StateSender {
        self.live
            .entry(id)
            .or_insert_with(|| Live {
                sender: Arc::new(watch::channel(SubmissionState::Idle).0),
                opened: Instant::now(),
            })
            .sender
            .clone()
    }

    /// `None` once the submission has finished or was never opened.
    pub fn subscribe(&self, id: Uuid) -> Option<watch::Receiver<SubmissionState>> {
        self.live.get(&id).map(|live| live.sender.subscribe())
    }

    /// Subscribers get the final state, then their streams end once the
    /// submission drops its sender.
    pub fn finish(&self, id: Uuid) {
        self.live.remove(&id);
    }

    /// Drops channels nobody has watched for a while and nothing is running on.
    pub fn prune(&self) {
        self.prune_older_than(UNCLAIMED_FOR);
    }

    fn prune_older_than(&self, age: Duration) {
        self.live.retain(|_, live| {
            live.sender.receiver_count() > 0
                || live.sender.borrow().is_busy()
                || live.opened.elapsed() < age
        });
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_sees_final_state_then_closes() {
        let tracker = SubmissionTracker::new();
        let id = Uuid::now_v7();
        tracker.open(id);
        let mut rx = tracker.subscribe(id).unwrap();

        let tx = tracker.channel(id);
        tx.send_replace(SubmissionState::Submitting);
        tracker.finish(id);
        let post_id = Uuid::now_v7();
        tx.send_replace(SubmissionState::Done { post_id });
        drop(tx);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SubmissionState::Done { post_id });
        assert!(rx.changed().await.is_err());
        assert_eq!(tracker.len(), 0);
    }

    #[test]
    fn reconnect_after_finish_creates_nothing() {
        let tracker = SubmissionTracker::new();
        let id = Uuid::now_v7();
        assert!(tracker.subscribe(id).is_none());

        tracker.open(id);
        tracker.finish(id);
        assert!(tracker.subscribe(id).is_none());
        assert_eq!(tracker.len(), 0);
    }

    #[test]
    fn prune_keeps_watched_busy_and_fresh() {
        let tracker = SubmissionTracker::new();
        let watched = Uuid::now_v7();
        let busy = Uuid::now_v7();
        let abandoned = Uuid::now_v7();

        tracker.open(watched);
        let _rx = tracker.subscribe(watched);
        tracker.channel(busy).send_replace(SubmissionState::Submitting);
        tracker.open(abandoned);
        assert_eq!(tracker.len(), 3);

        // nothing is old enough yet
        tracker.prune();
        assert_eq!(tracker.len(), 3);

        tracker.prune_older_than(Duration::ZERO);
        assert_eq!(tracker.len(), 2);
        assert!(tracker.live.contains_key(&watched));
        assert!(tracker.live.contains_key(&busy));
    }
}
