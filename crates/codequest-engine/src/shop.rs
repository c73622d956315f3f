//! The cosmetic shop controller.
//!
//! Purchases are all-or-nothing against the session ledger: the balance
//! check, debit, ownership grant, and auto-equip happen under one lock
//! acquisition, so no partial purchase is ever observable.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::config::CosmeticItem;
use crate::error::{QuestError, Result};
use crate::session::Session;

/// Sells cosmetics against a shared session ledger.
#[derive(Debug, Clone)]
pub struct ShopController {
    session: Arc<Mutex<Session>>,
    listing: Arc<Vec<CosmeticItem>>,
}

/// One shop row for display: the listing plus ownership flags.
#[derive(Debug, Clone)]
pub struct ShopEntry {
    /// The listed item.
    pub item: CosmeticItem,
    /// Whether the session already owns it.
    pub owned: bool,
    /// Whether it is currently equipped.
    pub equipped: bool,
}

impl ShopController {
    /// Creates a shop over the given session with the given listing.
    #[must_use]
    pub fn new(session: Arc<Mutex<Session>>, listing: Vec<CosmeticItem>) -> Self {
        Self {
            session,
            listing: Arc::new(listing),
        }
    }

    /// Returns the shop listing annotated with ownership state.
    pub async fn entries(&self) -> Vec<ShopEntry> {
        let session = self.session.lock().await;
        let ledger = session.ledger();
        self.listing
            .iter()
            .map(|item| ShopEntry {
                item: item.clone(),
                owned: ledger.owns(&item.id),
                equipped: ledger.active_cosmetic() == item.id,
            })
            .collect()
    }

    /// Purchases a listed cosmetic and equips it.
    ///
    /// The debit, ownership grant, and equip are applied atomically; on
    /// any precondition failure the ledger is untouched.
    ///
    /// # Errors
    ///
    /// Returns `QuestError::UnknownCosmetic` if the id is not listed,
    /// `QuestError::AlreadyOwned` if the session owns it, and
    /// `QuestError::InsufficientFunds` if the balance does not cover the
    /// price.
    pub async fn purchase(&self, cosmetic_id: &str) -> Result<()> {
        let item = self
            .listing
            .iter()
            .find(|item| item.id == cosmetic_id)
            .ok_or_else(|| QuestError::unknown_cosmetic(cosmetic_id))?;

        let mut session = self.session.lock().await;
        let ledger = session.ledger_mut();

        if ledger.owns(&item.id) {
            return Err(QuestError::already_owned(&item.id));
        }
        if !ledger.try_debit(item.price) {
            return Err(QuestError::insufficient_funds(item.price, ledger.gems()));
        }
        ledger.grant(&item.id);
        // Purchases auto-equip; ownership guarantees this succeeds
        ledger.activate(&item.id);

        info!(
            cosmetic_id = %item.id,
            price = item.price,
            gems = ledger.gems(),
            "cosmetic purchased and equipped"
        );
        Ok(())
    }

    /// Equips an owned cosmetic.
    ///
    /// # Errors
    ///
    /// Returns `QuestError::UnknownCosmetic` if the id is not listed and
    /// `QuestError::NotOwned` if the session does not own it.
    pub async fn equip(&self, cosmetic_id: &str) -> Result<()> {
        let item = self
            .listing
            .iter()
            .find(|item| item.id == cosmetic_id)
            .ok_or_else(|| QuestError::unknown_cosmetic(cosmetic_id))?;

        let mut session = self.session.lock().await;
        if !session.ledger_mut().activate(&item.id) {
            return Err(QuestError::not_owned(&item.id));
        }

        info!(cosmetic_id = %item.id, "cosmetic equipped");
        Ok(())
    }
}
