//! CodeQuest Engine
//!
//! Level progression, reward economy, and session state machine for the
//! CodeQuest learning game.

pub mod catalog;
pub mod config;
pub mod economy;
pub mod error;
pub mod progress;
pub mod session;
pub mod shop;

pub use catalog::{Catalog, Difficulty, Emotion, LearningCard, LevelDefinition, StoryBeat};
pub use config::{Config, CosmeticItem, EconomyConfig, JudgeConfig};
pub use economy::{EconomyLedger, DEFAULT_ACTIVE_COSMETIC, DEFAULT_COSMETICS};
pub use error::{QuestError, Result};
pub use progress::{LevelProgress, LevelStatus, ProgressStore, FULL_STARS};
pub use session::{
    HintOutcome, HintState, OfflineJudge, ProgressionController, Session, SubmitOutcome,
    MAX_HINT_ESCALATION,
};
pub use shop::{ShopController, ShopEntry};
