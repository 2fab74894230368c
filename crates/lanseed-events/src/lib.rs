#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links
)]

//! Asynchronous fan-out of session events.
//!
//! Every published [`Event`] is wrapped in an [`EventEnvelope`] with a
//! monotonically increasing [`EventId`], kept in a bounded journal, and sent
//! to live subscribers over a `tokio::broadcast` channel. A subscriber that
//! attaches late (a log view opened after startup, the tray reconnecting)
//! passes the last id it saw and first drains the journaled events after it.
//!
//! Same-tick observers hang off the session directly; this bus serves the
//! consumers that are allowed to lag. Slow receivers lose the oldest events
//! and can read how many through [`EventStream::missed`].

mod payloads;

pub use payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast::{self, Receiver, Sender, error::RecvError, error::TryRecvError};

/// Id allocation and the replay ring, guarded together so journal order and
/// broadcast order always match id order.
struct Journal {
    next_id: EventId,
    ring: VecDeque<EventEnvelope>,
    capacity: usize,
}

impl Journal {
    fn append(&mut self, event: Event) -> EventEnvelope {
        let envelope = EventEnvelope {
            id: self.next_id,
            timestamp: Utc::now(),
            event,
        };
        self.next_id += 1;
        if self.ring.len() >= self.capacity {
            self.ring.pop_front();
        }
        self.ring.push_back(envelope.clone());
        envelope
    }

    fn after(&self, since: EventId) -> VecDeque<EventEnvelope> {
        self.ring
            .iter()
            .skip_while(|envelope| envelope.id <= since)
            .cloned()
            .collect()
    }
}

/// Cloneable handle to one event journal and its broadcast channel.
#[derive(Clone)]
pub struct EventBus {
    journal: Arc<Mutex<Journal>>,
    live: Sender<EventEnvelope>,
}

impl EventBus {
    /// Bus retaining up to `capacity` events; zero is treated as one.
    ///
    /// The live channel lags by the same amount the journal retains.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (live, _) = broadcast::channel(capacity);
        Self {
            journal: Arc::new(Mutex::new(Journal {
                next_id: 1,
                ring: VecDeque::with_capacity(capacity),
                capacity,
            })),
            live,
        }
    }

    /// Bus with [`DEFAULT_REPLAY_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Journal `event` and hand it to live subscribers. Returns its id.
    pub fn publish(&self, event: Event) -> EventId {
        let mut journal = self.journal();
        let envelope = journal.append(event);
        let id = envelope.id;
        // Without receivers the event only lives in the journal.
        let _ = self.live.send(envelope);
        id
    }

    /// Attach a subscriber.
    ///
    /// With `Some(since)` the stream first yields the journaled events newer
    /// than `since`, then continues live without gaps or duplicates. With
    /// `None` it only sees events published from now on.
    #[must_use]
    pub fn subscribe(&self, since: Option<EventId>) -> EventStream {
        let journal = self.journal();
        let backlog = since.map(|since| journal.after(since)).unwrap_or_default();
        EventStream {
            backlog,
            receiver: self.live.subscribe(),
            missed: 0,
        }
    }

    /// Id of the newest published event.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        let journal = self.journal();
        (journal.next_id > 1).then(|| journal.next_id - 1)
    }

    /// Journaled events, oldest first.
    #[must_use]
    pub fn recent(&self) -> Vec<EventEnvelope> {
        self.journal().ring.iter().cloned().collect()
    }

    fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's view of the bus: the replayed backlog, then live events.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
    missed: u64,
}

impl EventStream {
    /// Wait for the next event.
    ///
    /// Returns `None` once every bus handle has been dropped.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(envelope) = self.backlog.pop_front() {
            return Some(envelope);
        }
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(RecvError::Lagged(skipped)) => self.missed += skipped,
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next event if one is ready, without waiting.
    pub fn try_next(&mut self) -> Option<EventEnvelope> {
        if let Some(envelope) = self.backlog.pop_front() {
            return Some(envelope);
        }
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) => return Some(envelope),
                Err(TryRecvError::Lagged(skipped)) => self.missed += skipped,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Events this subscriber lost because it fell too far behind.
    #[must_use]
    pub const fn missed(&self) -> u64 {
        self.missed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;
    use uuid::Uuid;

    fn progress(step: u64) -> Event {
        Event::StatusUpdated {
            torrent_id: Uuid::from_u128(1),
            state: "downloading".into(),
            progress_ppm: u32::try_from(step * 1_000).unwrap_or(u32::MAX),
            download_rate: step,
            upload_rate: 0,
        }
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let bus = EventBus::with_capacity(8);
        assert_eq!(bus.last_event_id(), None);
        let ids: Vec<_> = (0..3).map(|step| bus.publish(progress(step))).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(bus.last_event_id(), Some(3));
    }

    #[tokio::test]
    async fn late_subscriber_replays_then_follows_live() {
        let bus = EventBus::with_capacity(8);
        for step in 0..4 {
            bus.publish(progress(step));
        }
        let mut stream = bus.subscribe(Some(2));
        bus.publish(Event::SessionClosed);

        let mut seen = Vec::new();
        for _ in 0..3 {
            let envelope = timeout(Duration::from_secs(1), stream.next())
                .await
                .expect("event within a second")
                .expect("bus alive");
            seen.push(envelope.id);
        }
        assert_eq!(seen, vec![3, 4, 5]);
        assert!(stream.try_next().is_none());
    }

    #[test]
    fn journal_keeps_only_the_newest_events() {
        let bus = EventBus::with_capacity(2);
        for step in 0..5 {
            bus.publish(progress(step));
        }
        let ids: Vec<_> = bus.recent().iter().map(|envelope| envelope.id).collect();
        assert_eq!(ids, vec![4, 5]);
        assert_eq!(bus.last_event_id(), Some(5));
    }

    #[test]
    fn slow_subscribers_count_what_they_missed() {
        let bus = EventBus::with_capacity(2);
        let mut stream = bus.subscribe(None);
        for step in 0..5 {
            bus.publish(progress(step));
        }
        let first = stream.try_next().expect("newest events survive");
        assert_eq!(first.id, 4);
        assert_eq!(stream.missed(), 3);
    }

    #[tokio::test]
    async fn stream_ends_when_the_bus_is_dropped() {
        let bus = EventBus::new();
        let mut stream = bus.subscribe(None);
        drop(bus);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn concurrent_publishers_are_all_delivered() {
        let bus = EventBus::with_capacity(1_024);
        let mut stream = bus.subscribe(None);
        let publishers: Vec<_> = (0..4)
            .map(|_| {
                let bus = bus.clone();
                tokio::spawn(async move {
                    for step in 0..100 {
                        bus.publish(progress(step));
                    }
                })
            })
            .collect();
        for publisher in publishers {
            publisher.await.expect("publisher finished");
        }

        let mut last = 0;
        for _ in 0..400 {
            let envelope = stream.try_next().expect("delivered");
            assert!(envelope.id > last);
            last = envelope.id;
        }
        assert_eq!(last, 400);
    }
}
