//! Error types for the CodeQuest engine.
//!
//! This module defines the error hierarchy for catalog loading,
//! configuration, and the domain preconditions enforced by the progression
//! and shop controllers. Judge-service transport failures never appear
//! here: they are absorbed at the judge-client boundary and arrive as
//! ordinary data (a synthetic failure verdict or hint string).

use std::path::PathBuf;

/// A specialized `Result` type for CodeQuest engine operations.
pub type Result<T> = std::result::Result<T, QuestError>;

/// Errors that can occur while driving a CodeQuest session.
///
/// Error variants are organized by subsystem and include actionable
/// suggestions where possible to help users resolve issues.
#[derive(Debug, thiserror::Error)]
pub enum QuestError {
    // ========================================================================
    // Catalog Errors
    // ========================================================================
    /// Level catalog file was not found at the specified path.
    #[error("Level catalog not found: '{path}'\n\nSuggestion: Check the 'levels' field in codequest.json or create the file")]
    CatalogNotFound {
        /// Path where the catalog was expected.
        path: PathBuf,
    },

    /// Invalid JSON syntax in the level catalog.
    #[error("Invalid JSON in level catalog '{path}': {message}\n\nSuggestion: Validate the catalog with a JSON linter")]
    CatalogParseError {
        /// Path to the catalog file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Level catalog content failed validation.
    #[error("Invalid level catalog: {message}\n\nSuggestion: {suggestion}")]
    CatalogInvalid {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your codequest.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Progression Preconditions
    // ========================================================================
    /// A submission or hint was requested with no level selected.
    #[error("No level is currently active\n\nSuggestion: Select a level before submitting code or requesting hints")]
    NoActiveLevel,

    /// A submission was attempted while another is still being judged.
    #[error("A submission is already being judged\n\nSuggestion: Wait for the current verdict before submitting again")]
    SubmissionInFlight,

    /// All three hint escalations have been consumed for this level.
    #[error("All hints for this level have been used (maximum escalation reached)")]
    MaxEscalationReached,

    /// The targeted level has not been unlocked yet.
    #[error("Level '{level_id}' is locked\n\nSuggestion: Complete the preceding level to unlock it")]
    LevelLocked {
        /// Identifier of the locked level.
        level_id: String,
    },

    /// A level id was not found in the catalog.
    ///
    /// Should not occur with a well-formed catalog; this is the
    /// invariant-violation class, not a recoverable runtime condition.
    #[error("Unknown level '{level_id}': not present in the catalog")]
    UnknownLevel {
        /// The missing level identifier.
        level_id: String,
    },

    // ========================================================================
    // Shop Preconditions
    // ========================================================================
    /// A cosmetic id was not found in the shop listing.
    #[error("Unknown cosmetic '{cosmetic_id}': not present in the shop listing")]
    UnknownCosmetic {
        /// The missing cosmetic identifier.
        cosmetic_id: String,
    },

    /// The gem balance does not cover the purchase price.
    #[error("Not enough gems: need {needed}, balance is {balance}")]
    InsufficientFunds {
        /// Price of the item.
        needed: u32,
        /// Current gem balance.
        balance: u32,
    },

    /// The cosmetic is already in the owned set.
    #[error("Cosmetic '{cosmetic_id}' is already owned")]
    AlreadyOwned {
        /// Identifier of the owned cosmetic.
        cosmetic_id: String,
    },

    /// The cosmetic is not in the owned set.
    #[error("Cosmetic '{cosmetic_id}' is not owned\n\nSuggestion: Purchase it in the shop first")]
    NotOwned {
        /// Identifier of the unowned cosmetic.
        cosmetic_id: String,
    },

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QuestError {
    /// Creates a new `CatalogNotFound` error.
    #[must_use]
    pub fn catalog_not_found(path: impl Into<PathBuf>) -> Self {
        Self::CatalogNotFound { path: path.into() }
    }

    /// Creates a new `CatalogParseError` with the given path and message.
    #[must_use]
    pub fn catalog_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CatalogParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `CatalogInvalid` error with a message and suggestion.
    #[must_use]
    pub fn catalog_invalid(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::CatalogInvalid {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `LevelLocked` error.
    #[must_use]
    pub fn level_locked(level_id: impl Into<String>) -> Self {
        Self::LevelLocked {
            level_id: level_id.into(),
        }
    }

    /// Creates a new `UnknownLevel` error.
    #[must_use]
    pub fn unknown_level(level_id: impl Into<String>) -> Self {
        Self::UnknownLevel {
            level_id: level_id.into(),
        }
    }

    /// Creates a new `UnknownCosmetic` error.
    #[must_use]
    pub fn unknown_cosmetic(cosmetic_id: impl Into<String>) -> Self {
        Self::UnknownCosmetic {
            cosmetic_id: cosmetic_id.into(),
        }
    }

    /// Creates a new `InsufficientFunds` error.
    #[must_use]
    pub const fn insufficient_funds(needed: u32, balance: u32) -> Self {
        Self::InsufficientFunds { needed, balance }
    }

    /// Creates a new `AlreadyOwned` error.
    #[must_use]
    pub fn already_owned(cosmetic_id: impl Into<String>) -> Self {
        Self::AlreadyOwned {
            cosmetic_id: cosmetic_id.into(),
        }
    }

    /// Creates a new `NotOwned` error.
    #[must_use]
    pub fn not_owned(cosmetic_id: impl Into<String>) -> Self {
        Self::NotOwned {
            cosmetic_id: cosmetic_id.into(),
        }
    }

    /// Returns `true` if this error is a domain precondition violation
    /// that the caller can surface as ordinary feedback.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NoActiveLevel
                | Self::SubmissionInFlight
                | Self::MaxEscalationReached
                | Self::LevelLocked { .. }
                | Self::InsufficientFunds { .. }
                | Self::AlreadyOwned { .. }
                | Self::NotOwned { .. }
                | Self::UnknownCosmetic { .. }
        )
    }

    /// Returns `true` if this error is fatal and requires immediate
    /// termination (startup data could not be loaded or is malformed).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CatalogNotFound { .. }
                | Self::CatalogParseError { .. }
                | Self::CatalogInvalid { .. }
                | Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
        )
    }
}
