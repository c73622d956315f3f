//! Configuration types for the CodeQuest session.
//!
//! This module provides all configuration structures used to control a
//! CodeQuest run, including the level catalog location, judge-service
//! connection settings, and reward economy tuning.

use std::path::Path;

use serde::{Deserialize, Serialize};

use codequest_judge::FallbackMessages;

use crate::error::{QuestError, Result};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "codequest.json";

/// Default level catalog file path.
fn default_levels() -> String {
    "levels.json".to_string()
}

/// Default judge endpoint (Gemini API base).
fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

/// Default judge model.
fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

/// Default environment variable holding the judge API key.
fn default_api_key_env() -> String {
    "CODEQUEST_API_KEY".to_string()
}

/// Default timeout in seconds for one judge or hint request.
const fn default_timeout_secs() -> u64 {
    30
}

/// Default language tag for judge feedback and hints.
fn default_language() -> String {
    "en".to_string()
}

/// Default starting gem balance.
const fn default_starting_gems() -> u32 {
    50
}

/// Default gem reward for completing a level.
const fn default_level_reward() -> u32 {
    10
}

/// Main configuration for a CodeQuest session.
///
/// Controls the level catalog location, the judge service connection,
/// and the reward economy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Path to the level catalog file.
    #[serde(default = "default_levels")]
    pub levels: String,

    /// Judge-service connection settings.
    #[serde(default)]
    pub judge: JudgeConfig,

    /// Reward economy and shop settings.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Fixed strings shown when the judge or mentor service fails.
    #[serde(default)]
    pub messages: FallbackMessages,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            levels: default_levels(),
            judge: JudgeConfig::default(),
            economy: EconomyConfig::default(),
            messages: FallbackMessages::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `codequest.json` in the current directory. If found, loads
    /// and validates the configuration. If not found, returns default
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            QuestError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        Self::load_from_file(&config_path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `QuestError::ConfigParseError` if the file exists but
    /// contains invalid JSON, and `QuestError::ConfigValidationError` if
    /// the configuration values are invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(QuestError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| QuestError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// Checks that all required fields have valid values:
    /// - `levels` path must not be empty
    /// - `judge.timeoutSecs` must be greater than 0
    /// - `economy.levelReward` must be greater than 0
    /// - cosmetic listings must have unique, non-empty ids
    ///
    /// # Errors
    ///
    /// Returns `QuestError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.levels.trim().is_empty() {
            return Err(QuestError::config_validation(
                "levels path must not be empty",
                "Provide a valid catalog file path in your codequest.json",
            ));
        }

        if self.judge.timeout_secs == 0 {
            return Err(QuestError::config_validation(
                "judge.timeoutSecs must be greater than 0",
                "Set judge.timeoutSecs to at least 1 second in your codequest.json",
            ));
        }

        if self.judge.model.trim().is_empty() {
            return Err(QuestError::config_validation(
                "judge.model must not be empty",
                "Set judge.model to a valid model name in your codequest.json",
            ));
        }

        if self.economy.level_reward == 0 {
            return Err(QuestError::config_validation(
                "economy.levelReward must be greater than 0",
                "Set economy.levelReward to at least 1 in your codequest.json",
            ));
        }

        for (index, item) in self.economy.cosmetics.iter().enumerate() {
            if item.id.trim().is_empty() {
                return Err(QuestError::config_validation(
                    format!("economy.cosmetics[{index}] has an empty id"),
                    "Give every cosmetic listing a unique non-empty id",
                ));
            }
            if self.economy.cosmetics[index + 1..]
                .iter()
                .any(|other| other.id == item.id)
            {
                return Err(QuestError::config_validation(
                    format!("duplicate cosmetic id '{}'", item.id),
                    "Give every cosmetic listing a unique id",
                ));
            }
        }

        Ok(())
    }
}

/// Judge-service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeConfig {
    /// Base URL of the generateContent-style API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name appended to the endpoint.
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable read for the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Upper bound in seconds for one judge or hint request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Language tag the judge is asked to respond in.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            language: default_language(),
        }
    }
}

/// Reward economy and shop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EconomyConfig {
    /// Gem balance a fresh session starts with.
    #[serde(default = "default_starting_gems")]
    pub starting_gems: u32,

    /// Gems credited for each level completion.
    #[serde(default = "default_level_reward")]
    pub level_reward: u32,

    /// Cosmetic items offered in the shop.
    #[serde(default = "default_cosmetics")]
    pub cosmetics: Vec<CosmeticItem>,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_gems: default_starting_gems(),
            level_reward: default_level_reward(),
            cosmetics: default_cosmetics(),
        }
    }
}

/// One purchasable cosmetic listing in the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CosmeticItem {
    /// Unique cosmetic identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Price in gems. Zero means free.
    #[serde(default)]
    pub price: u32,
}

/// Default shop listing: the two free themes plus two paid ones.
fn default_cosmetics() -> Vec<CosmeticItem> {
    vec![
        CosmeticItem {
            id: "dark".to_string(),
            name: "Dark".to_string(),
            price: 0,
        },
        CosmeticItem {
            id: "light".to_string(),
            name: "Light".to_string(),
            price: 0,
        },
        CosmeticItem {
            id: "ocean".to_string(),
            name: "Ocean".to_string(),
            price: 100,
        },
        CosmeticItem {
            id: "synthwave".to_string(),
            name: "Synthwave".to_string(),
            price: 150,
        },
    ]
}
