//! End-to-end integration tests for the CodeQuest progression loop.
//!
//! These tests drive the full controller stack with a scripted judge:
//! level selection, submission judging, reward bookkeeping, hint
//! escalation, and reset.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use codequest_engine::{
    Catalog, Config, HintOutcome, LevelStatus, OfflineJudge, ProgressionController, QuestError,
    FULL_STARS,
};
use codequest_judge::{
    FallbackMessages, HintDepth, HintRequest, Judge, JudgeRequest, JudgeVerdict, VariableSnapshot,
};

/// Path to the fixture directory.
fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

fn load_fixture_catalog() -> Arc<Catalog> {
    Arc::new(Catalog::load(fixture_path().join("levels.json")).expect("Failed to load catalog"))
}

fn pass(output: &str) -> JudgeVerdict {
    JudgeVerdict {
        compiled: true,
        success: true,
        output: output.to_string(),
        feedback: "Correct!".to_string(),
        variables: Vec::new(),
    }
}

fn fail(feedback: &str) -> JudgeVerdict {
    JudgeVerdict {
        compiled: false,
        success: false,
        output: "Main.java:3: error: ';' expected".to_string(),
        feedback: feedback.to_string(),
        variables: Vec::new(),
    }
}

/// Replays a scripted sequence of verdicts and records hint requests.
struct ScriptedJudge {
    verdicts: Mutex<VecDeque<JudgeVerdict>>,
    hint_depths: Mutex<Vec<HintDepth>>,
}

impl ScriptedJudge {
    fn new(verdicts: impl IntoIterator<Item = JudgeVerdict>) -> Self {
        Self {
            verdicts: Mutex::new(verdicts.into_iter().collect()),
            hint_depths: Mutex::new(Vec::new()),
        }
    }
}

impl Judge for ScriptedJudge {
    async fn judge(&self, _request: &JudgeRequest) -> JudgeVerdict {
        self.verdicts
            .lock()
            .expect("verdict queue poisoned")
            .pop_front()
            .unwrap_or_else(|| fail("no more scripted verdicts"))
    }

    async fn hint(&self, request: &HintRequest) -> String {
        self.hint_depths
            .lock()
            .expect("hint log poisoned")
            .push(request.depth);
        format!("mentor says ({})", request.depth)
    }
}

fn controller(
    verdicts: impl IntoIterator<Item = JudgeVerdict>,
) -> ProgressionController<ScriptedJudge> {
    ProgressionController::new(load_fixture_catalog(), ScriptedJudge::new(verdicts), 50, 10)
}

/// The fixture catalog loads with the first level unlocked and the rest
/// locked.
#[tokio::test]
async fn test_fixture_catalog_initial_state() {
    let ctl = controller([]);
    assert_eq!(ctl.catalog().len(), 3);

    let session = ctl.session();
    let session = session.lock().await;
    assert_eq!(session.progress().status("L01"), Some(LevelStatus::Unlocked));
    assert_eq!(session.progress().status("L02"), Some(LevelStatus::Locked));
    assert_eq!(session.progress().status("L03"), Some(LevelStatus::Locked));
    assert_eq!(session.ledger().gems(), 50);
    assert_eq!(session.progress().total_stars(), 0);
}

/// The fixture config loads and points at the fixture catalog.
#[test]
fn test_fixture_config_loads() {
    let config =
        Config::load_from_file(&fixture_path().join("codequest.json")).expect("config load");

    assert_eq!(config.levels, "fixtures/levels.json");
    assert_eq!(config.judge.timeout_secs, 5);
    assert_eq!(config.economy.starting_gems, 50);
    assert_eq!(config.economy.level_reward, 10);
    assert_eq!(
        config.messages.judge_unreachable,
        "Could not reach the judging service."
    );
}

/// Playing two levels end to end: complete the first, unlock and complete
/// the second, balance grows from 50 to 70.
#[tokio::test]
async fn test_two_level_walkthrough() {
    let ctl = controller([fail("Missing semicolon"), pass("Hello Java"), pass("18")]);

    let level = ctl.select_level("L01").await.expect("select L01");
    assert_eq!(level.title, "First Steps");
    assert!(level.starter_code.contains("public class Main"));

    // First attempt fails
    let outcome = ctl.submit("bad code").await.expect("submit");
    assert!(outcome.verdict().is_failure());

    // Second attempt passes
    let outcome = ctl.submit("good code").await.expect("submit");
    assert!(outcome.verdict().success);

    {
        let session = ctl.session();
        let session = session.lock().await;
        let record = session.progress().get("L01").expect("L01 record");
        assert_eq!(record.status, LevelStatus::Completed);
        assert_eq!(record.stars, FULL_STARS);
        assert_eq!(record.attempts, 2);
        assert_eq!(session.ledger().gems(), 60);
        assert_eq!(session.progress().status("L02"), Some(LevelStatus::Unlocked));
        assert_eq!(session.progress().status("L03"), Some(LevelStatus::Locked));
    }

    // L02 is now playable and carries a cheat sheet
    let level = ctl.select_level("L02").await.expect("select L02");
    assert_eq!(
        level.cheat_sheet.as_deref(),
        Some("int age = 18;\nSystem.out.println(age);")
    );
    ctl.submit("int age = 18;").await.expect("submit");

    let session = ctl.session();
    let session = session.lock().await;
    assert_eq!(session.ledger().gems(), 70);
    assert_eq!(session.progress().total_stars(), 6);
    assert_eq!(session.progress().completed_count(), 2);
    assert_eq!(session.progress().status("L03"), Some(LevelStatus::Unlocked));
}

/// Selecting a locked or unknown level is rejected without changing the
/// active level.
#[tokio::test]
async fn test_locked_level_selection_rejected() {
    let ctl = controller([]);

    let err = ctl.select_level("L03").await.expect_err("should be locked");
    assert!(matches!(err, QuestError::LevelLocked { .. }));
    assert!(err.is_precondition());

    let err = ctl.select_level("L42").await.expect_err("unknown level");
    assert!(matches!(err, QuestError::UnknownLevel { .. }));

    let session = ctl.session();
    assert_eq!(session.lock().await.active_level(), None);
}

/// Submitting with no active level is a typed precondition failure.
#[tokio::test]
async fn test_submit_requires_active_level() {
    let ctl = controller([pass("x")]);

    let err = ctl.submit("code").await.expect_err("no level selected");
    assert!(matches!(err, QuestError::NoActiveLevel));

    let err = ctl.request_hint("code").await.expect_err("no level selected");
    assert!(matches!(err, QuestError::NoActiveLevel));
}

/// An unreachable judge produces the synthetic failure verdict; the
/// attempt still counts and no reward is paid.
#[tokio::test]
async fn test_unreachable_judge_is_an_ordinary_failure() {
    let messages = FallbackMessages::default();
    let ctl = ProgressionController::new(
        load_fixture_catalog(),
        OfflineJudge::new(messages.clone()),
        50,
        10,
    );

    ctl.select_level("L01").await.expect("select");
    let outcome = ctl.submit("code").await.expect("submit resolves");

    let verdict = outcome.verdict();
    assert!(!verdict.compiled);
    assert!(!verdict.success);
    assert_eq!(verdict.output, messages.judge_unreachable);
    assert_eq!(verdict.feedback, messages.judge_retry);

    let session = ctl.session();
    let session = session.lock().await;
    assert_eq!(session.progress().get("L01").expect("record").attempts, 1);
    assert_eq!(session.progress().status("L01"), Some(LevelStatus::Unlocked));
    assert_eq!(session.ledger().gems(), 50);
}

/// Hints escalate concept -> location -> code fragment, then the fourth
/// request is rejected. Re-selecting the level resets the ladder.
#[tokio::test]
async fn test_hint_escalation_ladder() {
    let ctl = controller([]);
    ctl.select_level("L01").await.expect("select");

    let mut depths = Vec::new();
    for _ in 0..3 {
        match ctl.request_hint("my code").await.expect("hint") {
            HintOutcome::Delivered { depth, text } => {
                assert!(text.starts_with("mentor says"));
                depths.push(depth);
            }
            HintOutcome::Stale { .. } => panic!("unexpected stale hint"),
        }
    }
    assert_eq!(
        depths,
        vec![HintDepth::Concept, HintDepth::Location, HintDepth::CodeFragment]
    );

    let err = ctl.request_hint("my code").await.expect_err("fourth hint");
    assert!(matches!(err, QuestError::MaxEscalationReached));

    // A fresh activation starts the ladder over
    ctl.select_level("L01").await.expect("reselect");
    match ctl.request_hint("my code").await.expect("hint") {
        HintOutcome::Delivered { depth, .. } => assert_eq!(depth, HintDepth::Concept),
        HintOutcome::Stale { .. } => panic!("unexpected stale hint"),
    }
}

/// A hint request that only reaches the offline fallback still consumes
/// its escalation step, so three failed requests exhaust the ladder.
#[tokio::test]
async fn test_unreachable_mentor_still_consumes_escalation() {
    let messages = FallbackMessages::default();
    let ctl = ProgressionController::new(
        load_fixture_catalog(),
        OfflineJudge::new(messages.clone()),
        50,
        10,
    );
    ctl.select_level("L01").await.expect("select");

    let outcome = ctl.request_hint("code").await.expect("hint resolves");
    assert_eq!(outcome.text(), messages.mentor_unavailable);
    assert!(matches!(outcome, HintOutcome::Delivered { .. }));
    {
        let session = ctl.session();
        assert_eq!(session.lock().await.hints().escalation(), 1);
    }

    ctl.request_hint("code").await.expect("hint resolves");
    ctl.request_hint("code").await.expect("hint resolves");
    let err = ctl.request_hint("code").await.expect_err("ladder exhausted");
    assert!(matches!(err, QuestError::MaxEscalationReached));
}

/// Replaying a completed level re-awards the gem reward and never
/// regresses statuses.
#[tokio::test]
async fn test_replay_reward_and_no_status_regression() {
    let ctl = controller([pass("Hello Java"), pass("Hello Java"), pass("Hello Java")]);

    ctl.select_level("L01").await.expect("select");
    ctl.submit("code").await.expect("submit");
    ctl.select_level("L01").await.expect("reselect");
    ctl.submit("code").await.expect("submit");
    ctl.select_level("L01").await.expect("reselect");
    ctl.submit("code").await.expect("submit");

    let session = ctl.session();
    let session = session.lock().await;
    assert_eq!(session.ledger().gems(), 80);
    assert_eq!(session.progress().get("L01").expect("record").attempts, 3);
    assert_eq!(session.progress().get("L01").expect("record").stars, FULL_STARS);
    assert_eq!(session.progress().status("L02"), Some(LevelStatus::Unlocked));
}

/// Reset returns the whole session to the initial snapshot.
#[tokio::test]
async fn test_reset_restores_initial_snapshot() {
    let ctl = controller([pass("Hello Java"), pass("18")]);

    ctl.select_level("L01").await.expect("select");
    ctl.submit("code").await.expect("submit");
    ctl.select_level("L02").await.expect("select");
    ctl.submit("code").await.expect("submit");
    ctl.request_hint("code").await.expect("hint");

    ctl.reset_progress().await;

    let session = ctl.session();
    let session = session.lock().await;
    assert_eq!(session.active_level(), None);
    assert_eq!(session.ledger().gems(), 50);
    assert_eq!(session.progress().status("L01"), Some(LevelStatus::Unlocked));
    assert_eq!(session.progress().status("L02"), Some(LevelStatus::Locked));
    assert_eq!(session.progress().status("L03"), Some(LevelStatus::Locked));
    assert_eq!(session.progress().total_stars(), 0);
    assert!(session.last_verdict().is_none());
}

/// A verdict that arrives after the learner switches levels is discarded
/// without mutating progress or the ledger.
#[tokio::test]
async fn test_stale_verdict_discarded_after_switch() {
    let gate = Arc::new(tokio::sync::Notify::new());

    struct GatedJudge {
        gate: Arc<tokio::sync::Notify>,
    }

    impl Judge for GatedJudge {
        async fn judge(&self, _request: &JudgeRequest) -> JudgeVerdict {
            self.gate.notified().await;
            JudgeVerdict {
                compiled: true,
                success: true,
                output: "Hello Java".to_string(),
                feedback: "Correct!".to_string(),
                variables: Vec::new(),
            }
        }

        async fn hint(&self, _request: &HintRequest) -> String {
            "hint".to_string()
        }
    }

    let ctl = ProgressionController::new(
        load_fixture_catalog(),
        GatedJudge {
            gate: Arc::clone(&gate),
        },
        50,
        10,
    );

    ctl.select_level("L01").await.expect("select");

    let pending = tokio::spawn({
        let ctl = ctl.clone();
        async move { ctl.submit("code").await }
    });
    tokio::task::yield_now().await;

    // Second submission is rejected while the first is in flight
    let err = ctl.submit("code").await.expect_err("in flight");
    assert!(matches!(err, QuestError::SubmissionInFlight));

    // Switching activation invalidates the pending verdict
    ctl.select_level("L01").await.expect("reselect");
    gate.notify_one();

    let outcome = pending.await.expect("join").expect("submit resolves");
    assert!(outcome.is_stale());
    assert!(outcome.verdict().success);

    let session = ctl.session();
    let session = session.lock().await;
    assert_eq!(session.progress().get("L01").expect("record").attempts, 0);
    assert_eq!(session.progress().status("L01"), Some(LevelStatus::Unlocked));
    assert_eq!(session.ledger().gems(), 50);
    assert!(!session.is_judging());
}

/// A hint that arrives after the learner re-selects the level is reported
/// stale and never stored against the fresh ladder.
#[tokio::test]
async fn test_stale_hint_discarded_after_switch() {
    let gate = Arc::new(tokio::sync::Notify::new());

    struct GatedJudge {
        gate: Arc<tokio::sync::Notify>,
    }

    impl Judge for GatedJudge {
        async fn judge(&self, _request: &JudgeRequest) -> JudgeVerdict {
            fail("unused")
        }

        async fn hint(&self, _request: &HintRequest) -> String {
            self.gate.notified().await;
            "look at line 3".to_string()
        }
    }

    let ctl = ProgressionController::new(
        load_fixture_catalog(),
        GatedJudge {
            gate: Arc::clone(&gate),
        },
        50,
        10,
    );

    ctl.select_level("L01").await.expect("select");

    let pending = tokio::spawn({
        let ctl = ctl.clone();
        async move { ctl.request_hint("code").await }
    });
    tokio::task::yield_now().await;

    // Re-selecting resets the ladder and invalidates the pending hint
    ctl.select_level("L01").await.expect("reselect");
    gate.notify_one();

    let outcome = pending.await.expect("join").expect("hint resolves");
    match outcome {
        HintOutcome::Stale { depth, text } => {
            assert_eq!(depth, HintDepth::Concept);
            assert_eq!(text, "look at line 3");
        }
        HintOutcome::Delivered { .. } => panic!("stale hint was delivered"),
    }

    let session = ctl.session();
    let session = session.lock().await;
    assert!(session.hints().last_hint().is_none());
    assert_eq!(session.hints().escalation(), 0);
}

/// Variable snapshots from the judge flow through to the applied verdict.
#[tokio::test]
async fn test_variable_snapshots_flow_through() {
    let verdict = JudgeVerdict {
        compiled: true,
        success: true,
        output: "18".to_string(),
        feedback: "Nice variable work".to_string(),
        variables: vec![VariableSnapshot {
            name: "age".to_string(),
            type_name: "int".to_string(),
            value: "18".to_string(),
        }],
    };
    let ctl = controller([verdict]);

    ctl.select_level("L01").await.expect("select");
    let outcome = ctl.submit("int age = 18;").await.expect("submit");

    let vars = &outcome.verdict().variables;
    assert_eq!(vars.len(), 1);
    assert_eq!(vars[0].name, "age");
    assert_eq!(vars[0].type_name, "int");

    let session = ctl.session();
    let session = session.lock().await;
    assert_eq!(
        session.last_verdict().expect("verdict").variables[0].value,
        "18"
    );
}
