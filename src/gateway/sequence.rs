use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::AbortHandle;
use tracing::debug;

/// Identifies one request for a slot. Only the most recently issued ticket
/// of a slot is current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    slot: String,
    generation: u64,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request for slot '{slot}' was superseded by a newer one")]
pub struct Superseded {
    pub slot: String,
}

#[derive(Default)]
struct SlotState {
    generation: u64,
    in_flight: Option<(u64, AbortHandle)>,
}

/// Orders requests per named UI slot so that a slow, stale reply can never
/// overwrite a newer one.
///
/// Generations come from one counter shared by all slots, so a slot that was
/// released and recreated never hands out a generation seen before.
#[derive(Default)]
pub struct SlotSequencer {
    slots: DashMap<String, SlotState>,
    last_generation: AtomicU64,
}

impl SlotSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_generation(&self) -> u64 {
        self.last_generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn issue(&self, slot: &str) -> Ticket {
        let mut state = self.slots.entry(slot.to_string()).or_default();
        state.generation = self.next_generation();
        Ticket {
            slot: slot.to_string(),
            generation: state.generation,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.slots
            .get(&ticket.slot)
            .map(|state| state.generation == ticket.generation)
            .unwrap_or(false)
    }

    /// Run `future` as the latest request for `slot`, aborting whichever
    /// request for the slot is still in flight.
    ///
    /// The slot is released once its latest run finishes, so slots keyed by
    /// caller-supplied ids do not accumulate.
    pub async fn run_latest<F, T>(&self, slot: &str, future: F) -> Result<T, Superseded>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let handle = tokio::spawn(future);
        let generation = {
            let mut state = self.slots.entry(slot.to_string()).or_default();
            state.generation = self.next_generation();
            if let Some((previous, abort)) = state.in_flight.take() {
                debug!("Aborting request {} for slot {}", previous, slot);
                abort.abort();
            }
            state.in_flight = Some((state.generation, handle.abort_handle()));
            state.generation
        };

        let outcome = handle.await;

        let current = match self.slots.get_mut(slot) {
            Some(mut state) if state.generation == generation => {
                state.in_flight = None;
                true
            }
            _ => false,
        };
        if current {
            self.slots.remove_if(slot, |_, state| {
                state.generation == generation && state.in_flight.is_none()
            });
        }

        match outcome {
            Ok(value) if current => Ok(value),
            Ok(_) => Err(Superseded {
                slot: slot.to_string(),
            }),
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(Superseded {
                slot: slot.to_string(),
            }),
        }
    }
}

/// Holds the value produced by the newest applied ticket of a slot.
pub struct LatestSlot<T> {
    inner: RwLock<Option<(u64, T)>>,
}

impl<T: Clone> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    /// Store `value` if `ticket` is still current and newer than what is held.
    pub async fn apply(&self, sequencer: &SlotSequencer, ticket: &Ticket, value: T) -> bool {
        if !sequencer.is_current(ticket) {
            debug!(
                "Dropping stale reply {} for slot {}",
                ticket.generation, ticket.slot
            );
            return false;
        }
        let mut guard = self.inner.write().await;
        match guard.as_ref() {
            Some((held, _)) if *held >= ticket.generation => false,
            _ => {
                *guard = Some((ticket.generation, value));
                true
            }
        }
    }

    pub async fn get(&self) -> Option<T> {
        self.inner.read().await.as_ref().map(|(_, v)| v.clone())
    }
}

impl<T: Clone> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
