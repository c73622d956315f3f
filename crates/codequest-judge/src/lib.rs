//! CodeQuest Judge Protocol Client
//!
//! This crate normalizes the request/response exchange with the external
//! AI capability that evaluates learner code submissions and produces
//! escalating hints. The evaluation itself (whether code compiles, what it
//! outputs, whether it satisfies a task) is performed entirely by the
//! remote service; this crate treats it as an opaque oracle.
//!
//! The central contract is that the [`Judge`] trait is infallible from the
//! caller's point of view: transport failures, timeouts, and malformed
//! responses are absorbed here and turned into ordinary data — a synthetic
//! failure [`JudgeVerdict`] or a fixed "mentor unavailable" hint string —
//! so the progression controller never needs failure branches for
//! transport issues.

pub mod client;

pub use client::{GeminiJudge, GeminiOptions};

use std::future::Future;

use serde::{Deserialize, Serialize};

// ============================================================================
// JudgeVerdict
// ============================================================================

/// A snapshot of one variable the judged program defines.
///
/// Used by the front end to visualize program memory after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSnapshot {
    /// Variable name as written in the source.
    pub name: String,

    /// Declared or inferred type, as reported by the judge.
    #[serde(rename = "type")]
    pub type_name: String,

    /// Rendered value at the end of the run.
    pub value: String,
}

/// The structured result of judging one code submission.
///
/// Produced once per submission by the judge client and consumed once by
/// the progression controller; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    /// Whether the submission would compile.
    pub compiled: bool,

    /// Whether the run satisfies the level's task.
    pub success: bool,

    /// Program output, or the compiler/runtime error text.
    pub output: String,

    /// Human-readable feedback for the learner.
    pub feedback: String,

    /// Variable snapshots for memory visualization, when provided.
    #[serde(default)]
    pub variables: Vec<VariableSnapshot>,
}

impl JudgeVerdict {
    /// Creates the synthetic verdict used when the judging service cannot
    /// be reached or returns an unusable payload.
    ///
    /// Always `compiled = false, success = false`, with the fixed
    /// unreachable/retry strings from `messages`.
    #[must_use]
    pub fn unreachable(messages: &FallbackMessages) -> Self {
        Self {
            compiled: false,
            success: false,
            output: messages.judge_unreachable.clone(),
            feedback: messages.judge_retry.clone(),
            variables: Vec::new(),
        }
    }

    /// Returns `true` if this verdict represents a failed submission.
    ///
    /// A submission that did not compile is always a failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        !self.success
    }
}

// ============================================================================
// HintDepth
// ============================================================================

/// The three-tier hint escalation depth.
///
/// Each depth maps to a distinct request intent: a conceptual explanation,
/// a pointer at the defective location, and finally a corrective code
/// fragment. Depths are visited strictly in order within one level
/// activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintDepth {
    /// Explain the underlying concept without revealing code.
    Concept,
    /// Point out which line or part of the code is wrong.
    Location,
    /// Show a similar code pattern or the missing fragment.
    CodeFragment,
}

impl HintDepth {
    /// Maps an escalation level (1..=3) to a hint depth.
    ///
    /// Returns `None` for 0 (no hint requested yet) and for anything
    /// past the maximum escalation.
    #[must_use]
    pub const fn from_escalation(escalation: u8) -> Option<Self> {
        match escalation {
            1 => Some(Self::Concept),
            2 => Some(Self::Location),
            3 => Some(Self::CodeFragment),
            _ => None,
        }
    }

    /// Returns the escalation level (1..=3) this depth corresponds to.
    #[must_use]
    pub const fn as_escalation(&self) -> u8 {
        match self {
            Self::Concept => 1,
            Self::Location => 2,
            Self::CodeFragment => 3,
        }
    }

    /// Returns the request intent sent to the mentor for this depth.
    #[must_use]
    pub const fn intent(&self) -> &'static str {
        match self {
            Self::Concept => "Explain the underlying concept without revealing any code.",
            Self::Location => "Point out which line or part of the code is wrong.",
            Self::CodeFragment => "Show a similar code pattern or the missing fragment.",
        }
    }
}

impl std::fmt::Display for HintDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Concept => write!(f, "concept"),
            Self::Location => write!(f, "location"),
            Self::CodeFragment => write!(f, "code_fragment"),
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// A judge request: the learner's source plus the level's task contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeRequest {
    /// The learner's submitted source text.
    pub source_code: String,

    /// The level's task description.
    pub task: String,

    /// The level's expected-output descriptor.
    pub expected_output: String,
}

/// A hint request at a specific escalation depth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintRequest {
    /// The learner's current source text.
    pub source_code: String,

    /// The level's task description.
    pub task: String,

    /// The escalation depth for this hint.
    pub depth: HintDepth,
}

// ============================================================================
// FallbackMessages
// ============================================================================

/// The fixed user-facing strings substituted when the judge or mentor
/// service fails.
///
/// The reference deployment shipped these in Simplified Chinese; the
/// language is a configuration choice, so defaults are English and every
/// string is overridable from the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackMessages {
    /// Console output shown when the judging service cannot be reached.
    #[serde(default = "default_judge_unreachable")]
    pub judge_unreachable: String,

    /// Feedback shown alongside the unreachable output.
    #[serde(default = "default_judge_retry")]
    pub judge_retry: String,

    /// Hint text shown when the mentor service fails.
    #[serde(default = "default_mentor_unavailable")]
    pub mentor_unavailable: String,
}

fn default_judge_unreachable() -> String {
    "Could not reach the judging service.".to_string()
}

fn default_judge_retry() -> String {
    "Check your network connection and try again.".to_string()
}

fn default_mentor_unavailable() -> String {
    "The mentor is offline right now. Try again in a moment.".to_string()
}

impl Default for FallbackMessages {
    fn default() -> Self {
        Self {
            judge_unreachable: default_judge_unreachable(),
            judge_retry: default_judge_retry(),
            mentor_unavailable: default_mentor_unavailable(),
        }
    }
}

// ============================================================================
// Judge trait
// ============================================================================

/// The judging capability the progression controller drives.
///
/// Both operations are infallible by contract: implementations must absorb
/// transport and parse failures and resolve to the synthetic unreachable
/// verdict (or the mentor-unavailable string) instead of returning errors.
/// Implementations should also bound each call with a timeout so a caller
/// holding an in-flight guard can never wedge.
pub trait Judge {
    /// Judges a code submission against a level's task contract.
    fn judge(&self, request: &JudgeRequest) -> impl Future<Output = JudgeVerdict> + Send;

    /// Fetches a hint at the requested escalation depth.
    fn hint(&self, request: &HintRequest) -> impl Future<Output = String> + Send;
}
