//! Session state and the progression controller.
//!
//! This module defines the state machine that drives one learner session:
//! which level is active, submission and hint flow against the judge, and
//! the reward bookkeeping performed when a verdict arrives.
//!
//! The session is shared behind an async mutex. The lock is never held
//! across a judge call: the controller takes a snapshot of what it needs,
//! releases the lock for the duration of the request, and re-acquires it
//! to apply the outcome. An activation counter makes late responses from
//! a previously active level detectable so they are discarded instead of
//! corrupting the current level's state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use codequest_judge::{
    FallbackMessages, HintDepth, HintRequest, Judge, JudgeRequest, JudgeVerdict,
};

use crate::catalog::{Catalog, LevelDefinition};
use crate::economy::EconomyLedger;
use crate::error::{QuestError, Result};
use crate::progress::ProgressStore;

/// Maximum hint escalation per level activation.
pub const MAX_HINT_ESCALATION: u8 = 3;

// ============================================================================
// HintState
// ============================================================================

/// Hint escalation bookkeeping for the active level.
///
/// The counter is consumed when a hint is requested, before the mentor
/// responds. A failed or discarded request therefore still uses up its
/// escalation step.
#[derive(Debug, Clone, Default)]
pub struct HintState {
    escalation: u8,
    last_hint: Option<String>,
}

impl HintState {
    /// Returns how many escalation steps have been consumed (0..=3).
    #[must_use]
    pub const fn escalation(&self) -> u8 {
        self.escalation
    }

    /// Returns the most recently delivered hint, if any.
    #[must_use]
    pub fn last_hint(&self) -> Option<&str> {
        self.last_hint.as_deref()
    }

    /// Consumes the next escalation step and returns its depth.
    ///
    /// Returns `None` when all steps have been used.
    fn escalate(&mut self) -> Option<HintDepth> {
        if self.escalation >= MAX_HINT_ESCALATION {
            return None;
        }
        self.escalation += 1;
        HintDepth::from_escalation(self.escalation)
    }

    fn reset(&mut self) {
        self.escalation = 0;
        self.last_hint = None;
    }
}

// ============================================================================
// Session
// ============================================================================

/// The complete mutable state of one learner session.
///
/// Fields are private; all mutation goes through the controllers so the
/// progression and economy invariants cannot be bypassed.
#[derive(Debug)]
pub struct Session {
    progress: ProgressStore,
    ledger: EconomyLedger,
    active_level: Option<String>,
    hints: HintState,
    last_verdict: Option<JudgeVerdict>,
    in_flight: bool,
    activation: u64,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    fn new(catalog: &Catalog, starting_gems: u32) -> Self {
        let now = Utc::now();
        Self {
            progress: ProgressStore::from_catalog(catalog),
            ledger: EconomyLedger::new(starting_gems),
            active_level: None,
            hints: HintState::default(),
            last_verdict: None,
            in_flight: false,
            activation: 0,
            started_at: now,
            updated_at: now,
        }
    }

    /// Returns the per-level progress records.
    #[must_use]
    pub const fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// Returns the reward and ownership ledger.
    #[must_use]
    pub const fn ledger(&self) -> &EconomyLedger {
        &self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut EconomyLedger {
        self.updated_at = Utc::now();
        &mut self.ledger
    }

    /// Returns the id of the active level, if one is selected.
    #[must_use]
    pub fn active_level(&self) -> Option<&str> {
        self.active_level.as_deref()
    }

    /// Returns hint escalation state for the active level.
    #[must_use]
    pub const fn hints(&self) -> &HintState {
        &self.hints
    }

    /// Returns the verdict of the most recent applied submission.
    #[must_use]
    pub const fn last_verdict(&self) -> Option<&JudgeVerdict> {
        self.last_verdict.as_ref()
    }

    /// Returns `true` while a submission is being judged.
    #[must_use]
    pub const fn is_judging(&self) -> bool {
        self.in_flight
    }

    /// Returns when this session was created.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns when this session last changed.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// The result of a submission that resolved.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The verdict arrived while its level was still active and all its
    /// effects (attempt count, completion, reward, unlock) were applied.
    Applied(JudgeVerdict),
    /// The active level changed while the submission was in flight. The
    /// verdict is returned for display but no session state was mutated
    /// beyond clearing the in-flight guard.
    Stale(JudgeVerdict),
}

impl SubmitOutcome {
    /// Returns the verdict regardless of whether it was applied.
    #[must_use]
    pub const fn verdict(&self) -> &JudgeVerdict {
        match self {
            Self::Applied(verdict) | Self::Stale(verdict) => verdict,
        }
    }

    /// Returns `true` if the verdict was discarded as stale.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }
}

/// The result of a hint request that resolved.
#[derive(Debug, Clone)]
pub enum HintOutcome {
    /// The hint arrived while its level was still active and was recorded.
    Delivered {
        /// Escalation depth the hint was requested at.
        depth: HintDepth,
        /// The hint text.
        text: String,
    },
    /// The active level changed while the request was in flight. The
    /// escalation step was still consumed.
    Stale {
        /// Escalation depth the hint was requested at.
        depth: HintDepth,
        /// The hint text, returned for display only.
        text: String,
    },
}

impl HintOutcome {
    /// Returns the hint text regardless of staleness.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Delivered { text, .. } | Self::Stale { text, .. } => text,
        }
    }
}

// ============================================================================
// ProgressionController
// ============================================================================

/// Drives level selection, submission judging, hints, and rewards for one
/// session.
///
/// Cheap to clone; clones share the same underlying session.
#[derive(Debug)]
pub struct ProgressionController<J> {
    catalog: Arc<Catalog>,
    judge: Arc<J>,
    session: Arc<Mutex<Session>>,
    level_reward: u32,
}

impl<J> Clone for ProgressionController<J> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            judge: Arc::clone(&self.judge),
            session: Arc::clone(&self.session),
            level_reward: self.level_reward,
        }
    }
}

impl<J: Judge> ProgressionController<J> {
    /// Creates a controller over a fresh session.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, judge: J, starting_gems: u32, level_reward: u32) -> Self {
        let session = Session::new(&catalog, starting_gems);
        Self {
            catalog,
            judge: Arc::new(judge),
            session: Arc::new(Mutex::new(session)),
            level_reward,
        }
    }

    /// Returns the catalog this controller was built from.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns a handle to the shared session state.
    #[must_use]
    pub fn session(&self) -> Arc<Mutex<Session>> {
        Arc::clone(&self.session)
    }

    /// Returns the gem reward credited per completion.
    #[must_use]
    pub const fn level_reward(&self) -> u32 {
        self.level_reward
    }

    /// Activates a level for play.
    ///
    /// Resets hint escalation and clears the previous verdict. Any
    /// submission or hint still in flight for the previous activation will
    /// be discarded as stale when it resolves.
    ///
    /// # Errors
    ///
    /// Returns `QuestError::UnknownLevel` if the id is not in the catalog
    /// and `QuestError::LevelLocked` if the level has not been unlocked.
    pub async fn select_level(&self, level_id: &str) -> Result<LevelDefinition> {
        let level = self
            .catalog
            .get(level_id)
            .ok_or_else(|| QuestError::unknown_level(level_id))?;

        let mut session = self.session.lock().await;
        let status = session
            .progress
            .status(level_id)
            .ok_or_else(|| QuestError::unknown_level(level_id))?;
        if status.is_locked() {
            return Err(QuestError::level_locked(level_id));
        }

        session.active_level = Some(level_id.to_string());
        session.hints.reset();
        session.last_verdict = None;
        session.activation += 1;
        session.touch();

        info!(level_id, %status, "level activated");
        Ok(level.clone())
    }

    /// Submits source code for the active level and applies the verdict.
    ///
    /// The session lock is released while the judge runs. If the active
    /// level changes in the meantime, the verdict is returned as
    /// [`SubmitOutcome::Stale`] and nothing is applied.
    ///
    /// On an applied verdict: the attempt counter always increments; on
    /// success the level is completed with full stars, the gem reward is
    /// credited, and the next level is unlocked if it was locked.
    /// A completed level re-awards on every success.
    ///
    /// # Errors
    ///
    /// Returns `QuestError::NoActiveLevel` if no level is selected and
    /// `QuestError::SubmissionInFlight` if a previous submission has not
    /// resolved yet.
    pub async fn submit(&self, source_code: &str) -> Result<SubmitOutcome> {
        let (request, level_id, activation) = {
            let mut session = self.session.lock().await;
            let level_id = session
                .active_level
                .clone()
                .ok_or(QuestError::NoActiveLevel)?;
            if session.in_flight {
                return Err(QuestError::SubmissionInFlight);
            }

            let level = self
                .catalog
                .get(&level_id)
                .ok_or_else(|| QuestError::unknown_level(&level_id))?;
            let request = JudgeRequest {
                source_code: source_code.to_string(),
                task: level.task.clone(),
                expected_output: level.expected_output.clone(),
            };

            session.in_flight = true;
            (request, level_id, session.activation)
        };

        debug!(%level_id, "submitting code for judgment");
        let verdict = self.judge.judge(&request).await;

        let mut session = self.session.lock().await;
        session.in_flight = false;
        session.touch();

        if session.activation != activation {
            warn!(%level_id, "discarding stale verdict after level switch");
            return Ok(SubmitOutcome::Stale(verdict));
        }

        session.progress.record_attempt(&level_id);
        if verdict.success {
            session.progress.complete(&level_id);
            session.ledger.credit(self.level_reward);
            if let Some(next) = self.catalog.next_after(&level_id) {
                session.progress.unlock(&next.id);
            }
            info!(
                %level_id,
                reward = self.level_reward,
                gems = session.ledger.gems(),
                "level completed"
            );
        } else {
            debug!(%level_id, compiled = verdict.compiled, "submission failed");
        }
        session.last_verdict = Some(verdict.clone());

        Ok(SubmitOutcome::Applied(verdict))
    }

    /// Requests the next hint escalation for the active level.
    ///
    /// The escalation step is consumed before the mentor is contacted, so
    /// an unreachable mentor or a stale response still uses it up.
    ///
    /// # Errors
    ///
    /// Returns `QuestError::NoActiveLevel` if no level is selected and
    /// `QuestError::MaxEscalationReached` after the third hint.
    pub async fn request_hint(&self, source_code: &str) -> Result<HintOutcome> {
        let (request, depth, activation) = {
            let mut session = self.session.lock().await;
            let level_id = session
                .active_level
                .clone()
                .ok_or(QuestError::NoActiveLevel)?;

            let depth = session
                .hints
                .escalate()
                .ok_or(QuestError::MaxEscalationReached)?;
            session.touch();

            let level = self
                .catalog
                .get(&level_id)
                .ok_or_else(|| QuestError::unknown_level(&level_id))?;
            let request = HintRequest {
                source_code: source_code.to_string(),
                task: level.task.clone(),
                depth,
            };
            (request, depth, session.activation)
        };

        debug!(%depth, "requesting hint");
        let text = self.judge.hint(&request).await;

        let mut session = self.session.lock().await;
        session.touch();
        if session.activation != activation {
            warn!(%depth, "discarding stale hint after level switch");
            return Ok(HintOutcome::Stale { depth, text });
        }

        session.hints.last_hint = Some(text.clone());
        Ok(HintOutcome::Delivered { depth, text })
    }

    /// Resets the whole session to its initial state.
    ///
    /// Progress, ledger, hints, and the active level all return to their
    /// starting values. Responses still in flight for the old state are
    /// discarded when they resolve.
    pub async fn reset_progress(&self) {
        let mut session = self.session.lock().await;
        session.progress = ProgressStore::from_catalog(&self.catalog);
        session.ledger.reset();
        session.active_level = None;
        session.hints.reset();
        session.last_verdict = None;
        session.activation += 1;
        session.touch();
        info!("session reset to initial state");
    }
}

// ============================================================================
// Fallback helpers
// ============================================================================

/// A judge that always reports the service as unreachable.
///
/// Used when no API key is configured, so the rest of the session remains
/// fully usable.
#[derive(Debug, Clone)]
pub struct OfflineJudge {
    messages: FallbackMessages,
}

impl OfflineJudge {
    /// Creates an offline judge using the given fallback strings.
    #[must_use]
    pub const fn new(messages: FallbackMessages) -> Self {
        Self { messages }
    }
}

impl Judge for OfflineJudge {
    async fn judge(&self, _request: &JudgeRequest) -> JudgeVerdict {
        JudgeVerdict::unreachable(&self.messages)
    }

    async fn hint(&self, _request: &HintRequest) -> String {
        self.messages.mentor_unavailable.clone()
    }
}
