//! Per-level progression state.
//!
//! Each catalog level has exactly one progress record for the lifetime of a
//! session. Status transitions are forward-only: `Locked` -> `Unlocked` ->
//! `Completed`, with no path back (other than a whole-session reset, which
//! rebuilds the store from the catalog).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;

/// Stars awarded on every completion.
pub const FULL_STARS: u8 = 3;

// ============================================================================
// LevelStatus
// ============================================================================

/// The lifecycle status of one level within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelStatus {
    /// Not yet reachable; the preceding level has not been completed.
    Locked,
    /// Reachable and playable, but never successfully completed.
    Unlocked,
    /// Successfully completed at least once. Still playable.
    Completed,
}

impl LevelStatus {
    /// Returns `true` if the level cannot be activated yet.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self, Self::Locked)
    }

    /// Returns `true` if the level has been completed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns `true` if the level can be activated and played.
    ///
    /// Completed levels remain playable and re-award on every success.
    #[must_use]
    pub const fn can_play(&self) -> bool {
        matches!(self, Self::Unlocked | Self::Completed)
    }
}

impl std::fmt::Display for LevelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked => write!(f, "locked"),
            Self::Unlocked => write!(f, "unlocked"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

// ============================================================================
// LevelProgress
// ============================================================================

/// Mutable progression state for one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    /// Catalog id of the level this record tracks.
    pub level_id: String,

    /// Current lifecycle status.
    pub status: LevelStatus,

    /// Stars earned; zero until completed, then always [`FULL_STARS`].
    pub stars: u8,

    /// Total submission attempts, successful or not.
    pub attempts: u32,
}

impl LevelProgress {
    fn new(level_id: impl Into<String>, status: LevelStatus) -> Self {
        Self {
            level_id: level_id.into(),
            status,
            stars: 0,
            attempts: 0,
        }
    }
}

// ============================================================================
// ProgressStore
// ============================================================================

/// The per-level progress records for one session.
///
/// Built from the catalog with the first level unlocked and all others
/// locked. Lookups and mutations take level ids; callers are expected to
/// pass ids that exist in the catalog the store was built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressStore {
    records: BTreeMap<String, LevelProgress>,
}

impl ProgressStore {
    /// Builds a fresh store from a catalog: the first level (by ordinal)
    /// starts `Unlocked`, every other level starts `Locked`.
    #[must_use]
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let first_id = catalog.first().map(|level| level.id.clone());
        let records = catalog
            .iter()
            .map(|level| {
                let status = if Some(&level.id) == first_id.as_ref() {
                    LevelStatus::Unlocked
                } else {
                    LevelStatus::Locked
                };
                (level.id.clone(), LevelProgress::new(&level.id, status))
            })
            .collect();

        Self { records }
    }

    /// Returns the progress record for a level, if tracked.
    #[must_use]
    pub fn get(&self, level_id: &str) -> Option<&LevelProgress> {
        self.records.get(level_id)
    }

    /// Returns the status of a level, if tracked.
    #[must_use]
    pub fn status(&self, level_id: &str) -> Option<LevelStatus> {
        self.records.get(level_id).map(|record| record.status)
    }

    /// Increments the attempt counter for a level.
    ///
    /// Every submission counts as one attempt regardless of verdict.
    pub fn record_attempt(&mut self, level_id: &str) {
        if let Some(record) = self.records.get_mut(level_id) {
            record.attempts += 1;
        }
    }

    /// Marks a level completed and awards full stars.
    ///
    /// Idempotent: completing an already-completed level leaves it
    /// completed with full stars.
    pub fn complete(&mut self, level_id: &str) {
        if let Some(record) = self.records.get_mut(level_id) {
            record.status = LevelStatus::Completed;
            record.stars = FULL_STARS;
        }
    }

    /// Unlocks a level, but only if it is currently locked.
    ///
    /// A completed level is never demoted back to unlocked by a replayed
    /// completion of its predecessor.
    pub fn unlock(&mut self, level_id: &str) {
        if let Some(record) = self.records.get_mut(level_id) {
            if record.status.is_locked() {
                record.status = LevelStatus::Unlocked;
            }
        }
    }

    /// Iterates over all records, ordered by level id.
    pub fn iter(&self) -> impl Iterator<Item = &LevelProgress> {
        self.records.values()
    }

    /// Returns the number of completed levels.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.records
            .values()
            .filter(|record| record.status.is_completed())
            .count()
    }

    /// Returns the total stars earned across all levels.
    #[must_use]
    pub fn total_stars(&self) -> u32 {
        self.records
            .values()
            .map(|record| u32::from(record.stars))
            .sum()
    }
}
