//! Integration tests for the cosmetic shop against a live session.
//!
//! These tests earn gems through real level completions and then spend
//! them, checking the all-or-nothing purchase contract and the
//! interaction between reset and ownership.

use std::path::PathBuf;
use std::sync::Arc;

use codequest_engine::{
    Catalog, EconomyConfig, ProgressionController, QuestError, ShopController,
};
use codequest_judge::{HintRequest, Judge, JudgeRequest, JudgeVerdict};

fn load_fixture_catalog() -> Arc<Catalog> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/levels.json");
    Arc::new(Catalog::load(path).expect("Failed to load catalog"))
}

/// A judge that approves everything.
struct LenientJudge;

impl Judge for LenientJudge {
    async fn judge(&self, _request: &JudgeRequest) -> JudgeVerdict {
        JudgeVerdict {
            compiled: true,
            success: true,
            output: "ok".to_string(),
            feedback: "ok".to_string(),
            variables: Vec::new(),
        }
    }

    async fn hint(&self, _request: &HintRequest) -> String {
        "hint".to_string()
    }
}

fn setup(starting_gems: u32) -> (ProgressionController<LenientJudge>, ShopController) {
    let ctl = ProgressionController::new(load_fixture_catalog(), LenientJudge, starting_gems, 10);
    let shop = ShopController::new(ctl.session(), EconomyConfig::default().cosmetics);
    (ctl, shop)
}

/// Fresh sessions own the free themes with the dark one equipped, and the
/// paid ones are listed but unowned.
#[tokio::test]
async fn test_default_shop_state() {
    let (_ctl, shop) = setup(50);

    let entries = shop.entries().await;
    let find = |id: &str| entries.iter().find(|e| e.item.id == id).expect("listed");

    assert!(find("dark").owned);
    assert!(find("dark").equipped);
    assert!(find("light").owned);
    assert!(!find("light").equipped);
    assert!(!find("ocean").owned);
    assert!(!find("synthwave").owned);
    assert_eq!(find("ocean").item.price, 100);
}

/// Earning gems through completions funds a purchase, which auto-equips.
#[tokio::test]
async fn test_earn_then_purchase() {
    let (ctl, shop) = setup(80);

    // Two completions take the balance from 80 to 100
    ctl.select_level("L01").await.expect("select");
    ctl.submit("code").await.expect("submit");
    ctl.select_level("L02").await.expect("select");
    ctl.submit("code").await.expect("submit");

    shop.purchase("ocean").await.expect("purchase");

    let session = ctl.session();
    let session = session.lock().await;
    assert_eq!(session.ledger().gems(), 0);
    assert!(session.ledger().owns("ocean"));
    assert_eq!(session.ledger().active_cosmetic(), "ocean");
}

/// A rejected purchase leaves balance, ownership, and the equipped theme
/// untouched.
#[tokio::test]
async fn test_failed_purchase_has_no_side_effects() {
    let (ctl, shop) = setup(99);

    let err = shop.purchase("ocean").await.expect_err("too expensive");
    assert!(matches!(
        err,
        QuestError::InsufficientFunds {
            needed: 100,
            balance: 99
        }
    ));
    assert!(err.is_precondition());

    let session = ctl.session();
    let session = session.lock().await;
    assert_eq!(session.ledger().gems(), 99);
    assert!(!session.ledger().owns("ocean"));
    assert_eq!(session.ledger().active_cosmetic(), "dark");
}

/// Unknown ids and double purchases are typed failures.
#[tokio::test]
async fn test_purchase_preconditions() {
    let (_ctl, shop) = setup(500);

    let err = shop.purchase("plasma").await.expect_err("not listed");
    assert!(matches!(err, QuestError::UnknownCosmetic { .. }));

    let err = shop.purchase("dark").await.expect_err("free default owned");
    assert!(matches!(err, QuestError::AlreadyOwned { .. }));

    shop.purchase("synthwave").await.expect("purchase");
    let err = shop.purchase("synthwave").await.expect_err("double buy");
    assert!(matches!(err, QuestError::AlreadyOwned { .. }));
}

/// Equip switches between owned cosmetics and rejects unowned ones.
#[tokio::test]
async fn test_equip_rules() {
    let (ctl, shop) = setup(200);

    let err = shop.equip("ocean").await.expect_err("not owned yet");
    assert!(matches!(err, QuestError::NotOwned { .. }));

    shop.purchase("ocean").await.expect("purchase");
    shop.equip("light").await.expect("equip owned");

    let session = ctl.session();
    let session = session.lock().await;
    assert_eq!(session.ledger().active_cosmetic(), "light");
}

/// Reset forfeits purchased cosmetics and re-equips the default theme.
#[tokio::test]
async fn test_reset_forfeits_purchases() {
    let (ctl, shop) = setup(150);

    shop.purchase("ocean").await.expect("purchase");
    ctl.reset_progress().await;

    let session = ctl.session();
    let session = session.lock().await;
    assert_eq!(session.ledger().gems(), 150);
    assert!(!session.ledger().owns("ocean"));
    assert_eq!(session.ledger().active_cosmetic(), "dark");
}
