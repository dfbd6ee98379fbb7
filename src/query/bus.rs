//! Shared change bus.
//!
//! One multicast channel for every registered query. It remembers the latest
//! event overall and per query so new subscribers start from the current
//! state. Publishing never blocks: a full subscriber buffer drops the event
//! for that subscriber only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::error::{MediaError, MediaResult};

use super::event::{ChangeEvent, SubscriptionId};

#[derive(Debug)]
struct Subscriber {
    filter: Option<String>,
    tx: Sender<ChangeEvent>,
}

impl Subscriber {
    fn wants(&self, event: &ChangeEvent) -> bool {
        self.filter.as_deref().map_or(true, |q| q == event.media_query)
    }
}

#[derive(Debug, Default)]
struct BusState {
    subscribers: HashMap<SubscriptionId, Subscriber>,
    latest: Option<ChangeEvent>,
    latest_by_query: HashMap<String, ChangeEvent>,
}

#[derive(Debug)]
pub(crate) struct ChangeBus {
    state: Mutex<BusState>,
    capacity: usize,
    dropped_events: AtomicU64,
}

impl ChangeBus {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(BusState::default()),
            capacity: capacity.max(1),
            dropped_events: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MediaResult<MutexGuard<'_, BusState>> {
        self.state.lock().map_err(|_| MediaError::poisoned("change_bus"))
    }

    /// Record `event` as the latest value and fan it out.
    pub(crate) fn publish(&self, event: ChangeEvent) -> MediaResult<()> {
        let mut state = self.lock()?;
        state
            .latest_by_query
            .insert(event.media_query.clone(), event.clone());
        state.latest = Some(event.clone());

        let mut disconnected = Vec::new();
        for (id, sub) in &state.subscribers {
            if !sub.wants(&event) {
                continue;
            }
            match sub.tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    let dropped = self.dropped_events.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::warn!(subscription = %id, dropped, query = %event.media_query, "subscriber buffer full, dropping change event");
                }
                Err(TrySendError::Disconnected(_)) => disconnected.push(*id),
            }
        }
        for id in disconnected {
            state.subscribers.remove(&id);
        }

        tracing::trace!(query = %event.media_query, matches = event.matches, "change event published");
        Ok(())
    }

    /// Attach a subscriber, optionally restricted to one query string.
    ///
    /// The receiver is seeded with the latest event visible through the filter.
    pub(crate) fn subscribe(&self, filter: Option<String>) -> MediaResult<(SubscriptionId, Receiver<ChangeEvent>)> {
        let (tx, rx) = bounded(self.capacity);
        let id = SubscriptionId::new();

        let mut state = self.lock()?;
        let replay = match filter.as_deref() {
            Some(query) => state.latest_by_query.get(query).cloned(),
            None => state.latest.clone(),
        };
        if let Some(event) = replay {
            // Fresh channel with capacity >= 1 cannot be full.
            let _ = tx.try_send(event);
        }
        state.subscribers.insert(id, Subscriber { filter, tx });

        Ok((id, rx))
    }

    /// Remove one subscriber. Unknown ids are ignored.
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut state) = self.lock() {
            state.subscribers.remove(&id);
        }
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.lock().map(|s| s.subscribers.len()).unwrap_or(0)
    }

    pub(crate) fn latest_for(&self, query: &str) -> Option<ChangeEvent> {
        self.lock().ok()?.latest_by_query.get(query).cloned()
    }

    pub(crate) fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }
}
