use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::error::{MediaResult, StreamError};

use super::bus::ChangeBus;
use super::event::{ChangeEvent, SubscriptionId};

fn disconnected() -> StreamError {
    StreamError::Disconnected {
        path: "media_query_stream".to_string(),
    }
}

/// A subscription to query-level change events.
///
/// Dropping the stream unsubscribes it. Disposal only detaches this
/// subscriber; the shared platform listener stays attached.
#[derive(Debug)]
pub struct MediaQueryStream {
    subscription_id: SubscriptionId,
    filter: Option<String>,
    rx: Receiver<ChangeEvent>,
    bus: Weak<ChangeBus>,
    unregistered: AtomicBool,
}

impl MediaQueryStream {
    pub(crate) fn new(
        subscription_id: SubscriptionId,
        filter: Option<String>,
        rx: Receiver<ChangeEvent>,
        bus: Weak<ChangeBus>,
    ) -> Self {
        Self {
            subscription_id,
            filter,
            rx,
            bus,
            unregistered: AtomicBool::new(false),
        }
    }

    /// The subscription id backing this stream.
    #[must_use]
    pub const fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    /// The query this stream is restricted to, if any.
    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Explicit unregistration. Idempotent.
    ///
    /// Events already buffered remain readable; no new ones arrive.
    pub fn unsubscribe(&self) {
        if self.unregistered.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.subscription_id);
        }
    }

    /// True once [`Self::unsubscribe`] has run.
    #[must_use]
    pub fn is_unsubscribed(&self) -> bool {
        self.unregistered.load(Ordering::Acquire)
    }

    /// Receive the next event (blocking).
    ///
    /// # Errors
    /// `StreamError::Disconnected` once the matcher is gone and the buffer is empty.
    pub fn recv(&self) -> MediaResult<ChangeEvent> {
        self.rx.recv().map_err(|_| disconnected().into())
    }

    /// Receive the next event with a timeout.
    ///
    /// # Errors
    /// `StreamError::Timeout` when nothing arrives in time, `StreamError::Disconnected`
    /// once the matcher is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> MediaResult<ChangeEvent> {
        self.rx.recv_timeout(timeout).map_err(|err| {
            let err = match err {
                RecvTimeoutError::Timeout => StreamError::Timeout {
                    duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                },
                RecvTimeoutError::Disconnected => disconnected(),
            };
            err.into()
        })
    }

    /// Next buffered event, if any. Never blocks.
    ///
    /// # Errors
    /// `StreamError::Disconnected` once the matcher is gone and the buffer is empty.
    pub fn try_recv(&self) -> MediaResult<Option<ChangeEvent>> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(disconnected().into()),
        }
    }

    /// Every event currently buffered, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<ChangeEvent> {
        self.rx.try_iter().collect()
    }
}

impl Drop for MediaQueryStream {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
