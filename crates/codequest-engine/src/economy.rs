//! Gem balance, cosmetic ownership, and streak tracking.
//!
//! The ledger is pure bookkeeping: it enforces the no-overdraft invariant
//! on debits but knows nothing about prices or shop listings. Those live
//! in the shop controller.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Cosmetic ids every session owns from the start, free of charge.
pub const DEFAULT_COSMETICS: [&str; 2] = ["dark", "light"];

/// The cosmetic equipped when a session begins.
pub const DEFAULT_ACTIVE_COSMETIC: &str = "dark";

/// The reward and ownership ledger for one session.
///
/// Gems are an unsigned balance; a debit that would overdraw is rejected
/// without any partial effect. The owned set only ever grows within a
/// session, and the active cosmetic is always a member of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomyLedger {
    /// Current gem balance.
    gems: u32,

    /// Ids of owned cosmetics.
    owned: BTreeSet<String>,

    /// Id of the currently equipped cosmetic.
    active_cosmetic: String,

    /// Consecutive-day streak counter.
    streak: u32,

    /// Balance the ledger resets to.
    starting_gems: u32,
}

impl EconomyLedger {
    /// Creates a fresh ledger with the given starting balance, the free
    /// default cosmetics owned, and the default cosmetic equipped.
    #[must_use]
    pub fn new(starting_gems: u32) -> Self {
        Self {
            gems: starting_gems,
            owned: DEFAULT_COSMETICS.iter().map(ToString::to_string).collect(),
            active_cosmetic: DEFAULT_ACTIVE_COSMETIC.to_string(),
            streak: 1,
            starting_gems,
        }
    }

    /// Returns the current gem balance.
    #[must_use]
    pub const fn gems(&self) -> u32 {
        self.gems
    }

    /// Returns the current streak counter.
    #[must_use]
    pub const fn streak(&self) -> u32 {
        self.streak
    }

    /// Returns the id of the equipped cosmetic.
    #[must_use]
    pub fn active_cosmetic(&self) -> &str {
        &self.active_cosmetic
    }

    /// Returns `true` if the cosmetic is in the owned set.
    #[must_use]
    pub fn owns(&self, cosmetic_id: &str) -> bool {
        self.owned.contains(cosmetic_id)
    }

    /// Iterates over owned cosmetic ids in sorted order.
    pub fn owned(&self) -> impl Iterator<Item = &str> {
        self.owned.iter().map(String::as_str)
    }

    /// Adds gems to the balance.
    pub fn credit(&mut self, amount: u32) {
        self.gems = self.gems.saturating_add(amount);
    }

    /// Removes gems from the balance if it covers the amount.
    ///
    /// Returns `false` and leaves the balance untouched on overdraft.
    pub fn try_debit(&mut self, amount: u32) -> bool {
        match self.gems.checked_sub(amount) {
            Some(remaining) => {
                self.gems = remaining;
                true
            }
            None => false,
        }
    }

    /// Adds a cosmetic to the owned set.
    ///
    /// Returns `false` if it was already owned.
    pub fn grant(&mut self, cosmetic_id: impl Into<String>) -> bool {
        self.owned.insert(cosmetic_id.into())
    }

    /// Equips an owned cosmetic.
    ///
    /// Returns `false` and leaves the active cosmetic unchanged if the id
    /// is not in the owned set.
    pub fn activate(&mut self, cosmetic_id: &str) -> bool {
        if self.owned.contains(cosmetic_id) {
            self.active_cosmetic = cosmetic_id.to_string();
            true
        } else {
            false
        }
    }

    /// Restores the ledger to its initial state: starting balance, only
    /// the free cosmetics owned, default cosmetic equipped, streak at 1.
    pub fn reset(&mut self) {
        *self = Self::new(self.starting_gems);
    }
}
