//! Level catalog loading and lookup.
//!
//! The catalog is the static, ordered sequence of level definitions the
//! whole session is built around. It is loaded once at startup from a JSON
//! file, validated, and never mutated afterwards; the ordinal of each level
//! defines the "next level" relation used to unlock progression.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QuestError, Result};

// ============================================================================
// Difficulty
// ============================================================================

/// Difficulty rating shown on the level map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Difficulty {
    /// Introductory level (default).
    #[default]
    Easy,
    /// Intermediate level.
    Medium,
    /// Advanced level.
    Hard,
}

impl Difficulty {
    /// Parses a string into a `Difficulty`, case-insensitively.
    fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_case_insensitive(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid difficulty '{s}': expected one of 'easy', 'medium', 'hard'"
            ))
        })
    }
}

impl Serialize for Difficulty {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let s = match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        };
        serializer.serialize_str(s)
    }
}

// ============================================================================
// Narrative and learning content
// ============================================================================

/// Emotion displayed by the story character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Emotion {
    /// Calm, default presentation.
    #[default]
    Neutral,
    /// Celebratory presentation.
    Happy,
    /// Concerned presentation.
    Worried,
    /// Urgent presentation.
    Alert,
}

/// An optional narrative beat shown when a level is activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryBeat {
    /// Name of the speaking character.
    pub character: String,

    /// Emoji or image reference for the character.
    pub avatar: String,

    /// Emotion the character displays.
    #[serde(default)]
    pub emotion: Emotion,

    /// The narrative text itself.
    pub text: String,
}

/// Optional concept card shown before the learner starts coding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningCard {
    /// Name of the concept being introduced.
    pub concept: String,

    /// Prose explanation of the concept.
    pub explanation: String,

    /// Short example snippet illustrating the concept.
    pub example_code: String,
}

// ============================================================================
// LevelDefinition
// ============================================================================

/// A single catalog entry: one learning task with an initial code template
/// and a success criterion.
///
/// Created once from static configuration; never mutated; never destroyed
/// during a process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDefinition {
    /// Unique level identifier, e.g. `L01`.
    pub id: String,

    /// Position in the catalog; defines the "next level" relation.
    pub ordinal: u32,

    /// Display title.
    pub title: String,

    /// Topic tag, e.g. "Variables" or "Loops".
    #[serde(default)]
    pub topic: String,

    /// Difficulty rating.
    #[serde(default)]
    pub difficulty: Difficulty,

    /// The instruction given to the learner and to the judge.
    pub task: String,

    /// Expected-output descriptor handed to the judge.
    pub expected_output: String,

    /// Initial source template placed in the editor.
    #[serde(default)]
    pub starter_code: String,

    /// Optional syntax cheat sheet shown alongside the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cheat_sheet: Option<String>,

    /// Optional concept card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<LearningCard>,

    /// Optional narrative beat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story: Option<StoryBeat>,
}

// ============================================================================
// Catalog
// ============================================================================

/// The ordered, read-only collection of level definitions.
///
/// Levels are kept sorted by ordinal; lookups by id scan the (small)
/// sequence directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    levels: Vec<LevelDefinition>,
}

impl Catalog {
    /// Builds a catalog from a list of level definitions.
    ///
    /// Sorts by ordinal and validates the same invariants as [`Catalog::load`].
    ///
    /// # Errors
    ///
    /// Returns `QuestError::CatalogInvalid` if the list is empty or
    /// contains duplicate ids or ordinals.
    pub fn from_levels(mut levels: Vec<LevelDefinition>) -> Result<Self> {
        levels.sort_by_key(|level| level.ordinal);
        let catalog = Self { levels };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Loads and validates a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `QuestError::CatalogNotFound` if the file doesn't exist,
    /// `QuestError::CatalogParseError` for invalid JSON, and
    /// `QuestError::CatalogInvalid` when validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                QuestError::catalog_not_found(path)
            } else {
                QuestError::Io(e)
            }
        })?;

        let levels: Vec<LevelDefinition> = serde_json::from_str(&contents)
            .map_err(|e| QuestError::catalog_parse(path, e.to_string()))?;

        Self::from_levels(levels)
    }

    /// Validates catalog invariants: non-empty, unique ids, unique ordinals.
    fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(QuestError::catalog_invalid(
                "catalog contains no levels",
                "Add at least one level definition to the catalog file",
            ));
        }

        for (index, level) in self.levels.iter().enumerate() {
            if level.id.trim().is_empty() {
                return Err(QuestError::catalog_invalid(
                    format!("level at position {index} has an empty id"),
                    "Give every level a unique non-empty id",
                ));
            }

            for other in &self.levels[index + 1..] {
                if other.id == level.id {
                    return Err(QuestError::catalog_invalid(
                        format!("duplicate level id '{}'", level.id),
                        "Give every level a unique id",
                    ));
                }
                if other.ordinal == level.ordinal {
                    return Err(QuestError::catalog_invalid(
                        format!("duplicate ordinal {} ('{}' and '{}')", level.ordinal, level.id, other.id),
                        "Give every level a unique ordinal",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Returns the level with the given id, if present.
    #[must_use]
    pub fn get(&self, level_id: &str) -> Option<&LevelDefinition> {
        self.levels.iter().find(|level| level.id == level_id)
    }

    /// Returns the first level in ordinal order.
    #[must_use]
    pub fn first(&self) -> Option<&LevelDefinition> {
        self.levels.first()
    }

    /// Returns the level that follows `level_id` in ordinal order, if any.
    #[must_use]
    pub fn next_after(&self, level_id: &str) -> Option<&LevelDefinition> {
        let position = self.levels.iter().position(|level| level.id == level_id)?;
        self.levels.get(position + 1)
    }

    /// Iterates over levels in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = &LevelDefinition> {
        self.levels.iter()
    }

    /// Returns the number of levels in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Returns `true` if the catalog has no levels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
