//! End-to-end course flow tests
//!
//! These tests play the built-in courses through a [`CourseSession`] the
//! way a learner would: run code, move between modules, finish the course
//! and claim the reward with an in-memory signer.

use std::sync::Arc;

use learn2earn_chain::{Learn2EarnContract, RecordingSigner};
use learn2earn_course::{
    Catalog, Course, CourseError, CourseSession, Difficulty, GeneratedCourse, GeneratedModule,
    SessionHooks, SessionStatus,
};
use learn2earn_playground::{check, execute};

const WALLET: &str = "0x7567d83b7b8d80addcb281a71d54fc7b3364ffed";

fn python_basics() -> Arc<Course> {
    Catalog::builtin()
        .expect("built-in courses should load")
        .require("python-basics")
        .expect("python-basics should exist")
}

#[derive(Debug, Default)]
struct Events {
    modules: Vec<usize>,
    completed: Vec<String>,
    backs: usize,
}

impl SessionHooks for Events {
    fn on_module_success(&mut self, index: usize) {
        self.modules.push(index);
    }

    fn on_course_complete(&mut self, course_id: &str) {
        self.completed.push(course_id.to_string());
    }

    fn on_back(&mut self) {
        self.backs += 1;
    }
}

/// Tests that every built-in solution prints exactly what its module expects.
#[test]
fn test_builtin_solutions_match_expected_output() {
    let catalog = Catalog::builtin().expect("built-in courses should load");
    assert!(catalog.len() >= 4);

    for course in catalog.iter() {
        for module in &course.modules {
            let output = execute(&module.solution).unwrap_or_else(|e| {
                panic!("{} module {} failed: {e}", course.id, module.id)
            });
            assert!(
                check(&output, &module.expected_output).is_pass(),
                "{} module {} printed {output:?}",
                course.id,
                module.id
            );
        }
    }
}

/// Tests that the Solidity functions and smart contract starters do not pass as given.
#[test]
fn test_builtin_starter_code_does_not_pass() {
    let catalog = Catalog::builtin().expect("built-in courses should load");
    for id in ["solidity-functions", "smart-contract-dev"] {
        let course = catalog.require(id).expect("course should exist");
        for module in &course.modules {
            let output = execute(&module.starter_code).unwrap_or_default();
            assert!(
                !check(&output, &module.expected_output).is_pass(),
                "{id} module {} passes with starter code",
                module.id
            );
        }
    }
}

/// Tests the full gated flow from the first module to a claimed reward.
#[tokio::test]
async fn test_complete_python_basics_and_claim() {
    let course = python_basics();
    let mut events = Events::default();
    let signer = RecordingSigner::new();

    {
        let mut session = CourseSession::new(Arc::clone(&course), &mut events);
        assert_eq!(session.status(), SessionStatus::InModule);

        // Later modules stay locked until the earlier ones pass.
        let err = session.go_to(2).expect_err("module 3 should be locked");
        assert!(matches!(
            err,
            CourseError::NavigationLocked {
                target: 2,
                first_incomplete: 0
            }
        ));

        for index in 0..course.len() {
            if index > 0 {
                session.next().expect("next module should unlock");
            }
            assert_eq!(session.state().current_module, index);

            let solution = session.current_module().expect("module").solution.clone();
            let outcome = session.run(&solution);
            assert!(outcome.passed(), "module {index}: {:?}", outcome.message());
        }

        assert!(session.is_complete());
        assert_eq!(session.status(), SessionStatus::CourseComplete);
        assert!((session.completion_ratio() - 1.0).abs() < f64::EPSILON);

        let receipt = session
            .claim_reward(&signer, WALLET)
            .await
            .expect("claim should succeed");
        assert!(receipt.txid.starts_with("0x"));
        assert_eq!(session.status(), SessionStatus::RewardClaimed);

        let again = session.claim_reward(&signer, WALLET).await;
        assert!(matches!(again, Err(CourseError::InvalidStateTransition { .. })));

        let state = session.back();
        assert_eq!(state.reward_txid.as_deref(), Some(receipt.txid.as_str()));
        assert_eq!(state.completed_modules.len(), course.len());
    }

    assert_eq!(events.modules, vec![0, 1, 2, 3, 4]);
    assert_eq!(events.completed, vec!["python-basics".to_string()]);
    assert_eq!(events.backs, 1);

    let signed = signer.signed();
    assert_eq!(signed.len(), 1);
    assert_eq!(signed[0].signer, WALLET);
    assert_eq!(
        signed[0].comment,
        "Claiming reward for completing python-basics"
    );
    let expected_clause = Learn2EarnContract::default()
        .complete_course("python-basics")
        .expect("clause should encode");
    assert_eq!(signed[0].clauses, vec![expected_clause]);
}

/// Tests that failing runs report the mismatch and never lose progress.
#[test]
fn test_failed_runs_keep_progress() {
    let course = python_basics();
    let mut session = CourseSession::new(Arc::clone(&course), ());

    let starter = course.modules[0].starter_code.clone();
    let outcome = session.run(&starter);
    assert!(!outcome.passed());
    assert!(outcome.message().is_some());
    assert_eq!(session.status(), SessionStatus::InModule);

    let solution = course.modules[0].solution.clone();
    assert!(session.run(&solution).passed());
    assert_eq!(session.status(), SessionStatus::ModuleComplete);

    // A broken run afterwards leaves the module complete.
    let outcome = session.run("print(undefined_name");
    assert!(!outcome.passed());
    assert!(session.state().completed_modules.contains(&0));
    assert!(session.can_go_to(1));
    assert!(!session.can_go_to(2));
}

/// Tests that a rejected claim can be retried.
#[tokio::test]
async fn test_rejected_claim_can_be_retried() {
    let course = python_basics();
    let mut session = CourseSession::new(Arc::clone(&course), ());

    for index in 0..course.len() {
        session.go_to(index).expect("module should unlock");
        let solution = course.modules[index].solution.clone();
        assert!(session.run(&solution).passed());
    }

    let err = session
        .claim_reward(&RecordingSigner::rejecting("User cancelled"), WALLET)
        .await
        .expect_err("rejecting signer should fail");
    match err {
        CourseError::ClaimFailed { course_id, source } => {
            assert_eq!(course_id, "python-basics");
            assert!(source.is_user_rejection());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(session.status(), SessionStatus::CourseComplete);

    let receipt = session
        .claim_reward(&RecordingSigner::new(), WALLET)
        .await
        .expect("retry should succeed");
    assert_eq!(
        session.state().reward_txid.as_deref(),
        Some(receipt.txid.as_str())
    );
}

/// Tests that claiming before completion is refused without signing.
#[tokio::test]
async fn test_claim_before_completion_is_refused() {
    let signer = RecordingSigner::new();
    let mut session = CourseSession::new(python_basics(), ());

    let result = session.claim_reward(&signer, WALLET).await;
    assert!(matches!(result, Err(CourseError::InvalidStateTransition { .. })));
    assert!(signer.signed().is_empty());
}

/// Tests that generated courses allow jumping to any module.
#[test]
fn test_generated_course_has_free_navigation() {
    let generated = GeneratedCourse {
        title: "Loops in Depth".to_string(),
        description: "Counting things".to_string(),
        icon: "🔁".to_string(),
        difficulty: Difficulty::Beginner,
        duration: "20 min".to_string(),
        modules: (1..=5)
            .map(|i| GeneratedModule {
                title: format!("Step {i}"),
                theory: format!("<p>Step {i}</p><script>alert(1)</script>"),
                task: "Print the step number".to_string(),
                starter_code: String::new(),
                solution: format!("print({i})"),
                expected_output: i.to_string(),
                hint: String::new(),
            })
            .collect(),
    };

    let course = generated
        .into_course("ai-loops-in-depth-1")
        .expect("five modules should convert");
    assert!(course.free_navigation());
    assert!(!course.modules[0].theory.contains("script"));

    let mut session = CourseSession::new(Arc::new(course), ());
    session.go_to(4).expect("generated courses are not gated");
    assert!(session.run("print(5)").passed());
    assert_eq!(session.status(), SessionStatus::ModuleComplete);
    assert!(!session.is_complete());
}
