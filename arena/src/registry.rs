//! Duel Registry: one slot per channel
//!
//! The registry is the only shared mutable state between the lifecycle
//! manager and the race watchers. A slot is occupied while its duel is
//! `Forming` or `Active` and is freed as soon as the duel resolves or its
//! problem draw fails.
//!
//! The lock is a plain `std::sync::Mutex` and is never held across an
//! `.await`, so every operation here is a single atomic step with respect to
//! other tasks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::duel::Duel;
use crate::types::{ChannelId, DuelId};

/// Shared reference to DuelRegistry
pub type SharedDuelRegistry = Arc<DuelRegistry>;

/// Per-channel duel slots.
#[derive(Debug, Default)]
pub struct DuelRegistry {
    slots: Mutex<HashMap<ChannelId, Duel>>,
}

impl DuelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference to this registry
    pub fn shared(self) -> SharedDuelRegistry {
        Arc::new(self)
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<ChannelId, Duel>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve the duel's channel. Returns `false` if the slot is taken.
    pub fn try_occupy(&self, duel: Duel) -> bool {
        let mut slots = self.slots();
        if slots.contains_key(duel.channel()) {
            return false;
        }
        slots.insert(duel.channel().clone(), duel);
        true
    }

    /// Free the channel unconditionally, returning whatever occupied it.
    pub fn release(&self, channel: &ChannelId) -> Option<Duel> {
        self.slots().remove(channel)
    }

    /// Free the channel only if it is still held by duel `id`.
    pub fn release_if(&self, channel: &ChannelId, id: DuelId) -> Option<Duel> {
        self.release_where(channel, |duel| duel.id() == id)
    }

    /// Free the channel if its duel satisfies `pred`, checked under the lock.
    pub fn release_where(
        &self,
        channel: &ChannelId,
        pred: impl FnOnce(&Duel) -> bool,
    ) -> Option<Duel> {
        let mut slots = self.slots();
        match slots.get(channel) {
            Some(duel) if pred(duel) => slots.remove(channel),
            _ => None,
        }
    }

    pub fn is_occupied(&self, channel: &ChannelId) -> bool {
        self.slots().contains_key(channel)
    }

    /// Copy of the duel currently in the channel.
    pub fn snapshot(&self, channel: &ChannelId) -> Option<Duel> {
        self.slots().get(channel).cloned()
    }

    /// Mutate the duel in `channel` under the lock.
    ///
    /// Returns `None` if the channel is empty.
    pub fn update<R>(&self, channel: &ChannelId, f: impl FnOnce(&mut Duel) -> R) -> Option<R> {
        self.slots().get_mut(channel).map(f)
    }

    /// Number of occupied channels.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }
}
