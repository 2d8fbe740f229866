//! Course session controller.
//!
//! A [`CourseSession`] drives one learner through one course: it runs code
//! against the current module, records completions, guards navigation and
//! hands the finished course to the ledger for a reward claim.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use learn2earn_chain::{Learn2EarnContract, TransactionSigner, TxReceipt};
use learn2earn_playground::{check, Interpreter, Program, Verdict};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::course::{Course, Module};
use crate::error::{CourseError, Result};

// ============================================================================
// SessionStatus
// ============================================================================

/// Where a session stands.
///
/// - `InModule` -> `ModuleComplete` after a passing run
/// - `ModuleComplete` -> `InModule` after moving to an incomplete module
/// - any -> `CourseComplete` once every module passed
/// - `CourseComplete` -> `RewardClaimed` after a successful claim
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Current module not passed yet.
    #[default]
    InModule,
    /// Current module passed, others remain.
    ModuleComplete,
    /// Every module passed; the reward can be claimed.
    CourseComplete,
    /// Reward claimed.
    RewardClaimed,
}

impl SessionStatus {
    /// Returns `true` once every module has passed.
    ///
    /// # Examples
    ///
    /// ```
    /// use learn2earn_course::SessionStatus;
    ///
    /// assert!(SessionStatus::CourseComplete.is_course_complete());
    /// assert!(SessionStatus::RewardClaimed.is_course_complete());
    /// assert!(!SessionStatus::ModuleComplete.is_course_complete());
    /// ```
    #[must_use]
    pub const fn is_course_complete(self) -> bool {
        matches!(self, Self::CourseComplete | Self::RewardClaimed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InModule => write!(f, "in_module"),
            Self::ModuleComplete => write!(f, "module_complete"),
            Self::CourseComplete => write!(f, "course_complete"),
            Self::RewardClaimed => write!(f, "reward_claimed"),
        }
    }
}

// ============================================================================
// RunOutcome
// ============================================================================

/// Result of running code against a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    /// Module the code ran against (0-based).
    pub module_index: usize,
    /// Lines printed before the run finished or failed.
    pub output: Vec<String>,
    /// Comparison with the expected output; `None` when execution failed.
    pub verdict: Option<Verdict>,
    /// Execution error text, shown verbatim.
    pub error: Option<String>,
}

impl RunOutcome {
    /// Returns `true` if the output matched.
    pub fn passed(&self) -> bool {
        self.verdict.as_ref().is_some_and(Verdict::is_pass)
    }

    /// Learner-facing failure message, `None` on success.
    pub fn message(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(error.clone());
        }
        self.verdict.as_ref().and_then(Verdict::message)
    }
}

// ============================================================================
// SessionHooks
// ============================================================================

/// Callbacks into the surrounding front end.
///
/// Every method has an empty default.
pub trait SessionHooks {
    /// A module passed for the first time.
    fn on_module_success(&mut self, _index: usize) {}

    /// The reward for `course_id` was claimed.
    fn on_course_complete(&mut self, _course_id: &str) {}

    /// The learner left the course.
    fn on_back(&mut self) {}
}

impl SessionHooks for () {}

impl<T: SessionHooks + ?Sized> SessionHooks for &mut T {
    fn on_module_success(&mut self, index: usize) {
        (**self).on_module_success(index);
    }

    fn on_course_complete(&mut self, course_id: &str) {
        (**self).on_course_complete(course_id);
    }

    fn on_back(&mut self) {
        (**self).on_back();
    }
}

// ============================================================================
// SessionState
// ============================================================================

/// Serializable state of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Course being played.
    pub course_id: String,
    /// Current module (0-based).
    pub current_module: usize,
    /// Modules that passed.
    pub completed_modules: BTreeSet<usize>,
    /// Whether the hint is shown.
    pub hint_visible: bool,
    /// Set once every module passed; never cleared.
    pub course_completed: bool,
    /// Current status.
    pub status: SessionStatus,
    /// Most recent run.
    pub last_run: Option<RunOutcome>,
    /// Transaction id of the reward claim.
    pub reward_txid: Option<String>,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// When the session last changed.
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    /// Fresh state for `course_id` at the first module.
    pub fn new(course_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            course_id: course_id.into(),
            current_module: 0,
            completed_modules: BTreeSet::new(),
            hint_visible: false,
            course_completed: false,
            status: SessionStatus::InModule,
            last_run: None,
            reward_txid: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Updates the `updated_at` timestamp to now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// CourseSession
// ============================================================================

/// One learner's pass through one course.
///
/// # Example
///
/// ```
/// use learn2earn_course::{Catalog, CourseSession, SessionStatus};
///
/// let catalog = Catalog::builtin()?;
/// let course = catalog.require("python-basics")?;
/// let mut session = CourseSession::new(course, ());
///
/// let outcome = session.run("greeting = \"Hello, Python!\"\nprint(greeting)");
/// assert!(outcome.passed());
/// assert_eq!(session.status(), SessionStatus::ModuleComplete);
/// session.next()?;
/// assert_eq!(session.state().current_module, 1);
/// # Ok::<(), learn2earn_course::CourseError>(())
/// ```
#[derive(Debug)]
pub struct CourseSession<H: SessionHooks = ()> {
    course: Arc<Course>,
    contract: Learn2EarnContract,
    state: SessionState,
    hooks: H,
}

impl<H: SessionHooks> CourseSession<H> {
    /// Opens `course` at its first module.
    pub fn new(course: Arc<Course>, hooks: H) -> Self {
        let state = SessionState::new(&course.id);
        info!(course_id = %course.id, modules = course.len(), "Session started");
        Self {
            course,
            contract: Learn2EarnContract::default(),
            state,
            hooks,
        }
    }

    /// Uses `contract` for reward claims instead of the default deployment.
    #[must_use]
    pub fn with_contract(mut self, contract: Learn2EarnContract) -> Self {
        self.contract = contract;
        self
    }

    /// Course being played.
    pub fn course(&self) -> &Arc<Course> {
        &self.course
    }

    /// Current state.
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current status.
    pub const fn status(&self) -> SessionStatus {
        self.state.status
    }

    /// Callbacks.
    pub const fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Module at the current index.
    ///
    /// # Errors
    ///
    /// Never fails for a session built with [`CourseSession::new`]; the
    /// index is kept in range.
    pub fn current_module(&self) -> Result<&Module> {
        self.course.module(self.state.current_module)
    }

    /// Share of completed modules.
    pub fn completion_ratio(&self) -> f64 {
        self.course.completion_ratio(&self.state.completed_modules)
    }

    /// Returns `true` once every module passed.
    pub fn is_complete(&self) -> bool {
        self.course.is_complete(&self.state.completed_modules)
    }

    /// Runs `source` and checks it against the current module.
    ///
    /// A passing run marks the module complete, hides the hint and, when it
    /// was the last missing module, completes the course. Failing runs never
    /// undo earlier completions.
    pub fn run(&mut self, source: &str) -> RunOutcome {
        let index = self.state.current_module;
        let expected = self
            .course
            .modules
            .get(index)
            .map(|m| m.expected_output.clone())
            .unwrap_or_default();

        let mut interpreter = Interpreter::new();
        let result = interpreter.run(&Program::parse(source));
        let output = interpreter.into_output();

        let outcome = match result {
            Ok(()) => RunOutcome {
                module_index: index,
                verdict: Some(check(&output, &expected)),
                output,
                error: None,
            },
            Err(e) => RunOutcome {
                module_index: index,
                output,
                verdict: None,
                error: Some(e.to_string()),
            },
        };

        if outcome.passed() {
            self.state.hint_visible = false;
            if self.state.completed_modules.insert(index) {
                info!(course_id = %self.course.id, module = index, "Module completed");
                self.hooks.on_module_success(index);
            }
            if !self.state.course_completed && self.is_complete() {
                self.state.course_completed = true;
                info!(course_id = %self.course.id, "Course completed");
            }
        } else {
            debug!(course_id = %self.course.id, module = index, "Run did not pass");
        }

        self.state.last_run = Some(outcome.clone());
        self.refresh_status();
        outcome
    }

    /// Shows or hides the hint and returns the new visibility.
    pub fn toggle_hint(&mut self) -> bool {
        self.state.hint_visible = !self.state.hint_visible;
        self.state.touch();
        self.state.hint_visible
    }

    /// Returns `true` if [`CourseSession::go_to`] would accept `index`.
    pub fn can_go_to(&self, index: usize) -> bool {
        index < self.course.len()
            && (self.course.free_navigation()
                || index <= self.state.current_module
                || self.first_incomplete().map_or(true, |first| index <= first))
    }

    /// Moves to module `index`.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::ModuleIndexOutOfRange` past the last module and
    /// `CourseError::NavigationLocked` when an earlier module is incomplete
    /// on a gated course. The index is unchanged on error.
    pub fn go_to(&mut self, index: usize) -> Result<()> {
        if index >= self.course.len() {
            return Err(CourseError::ModuleIndexOutOfRange {
                index,
                len: self.course.len(),
            });
        }
        if !self.can_go_to(index) {
            let first_incomplete = self.first_incomplete().unwrap_or(index);
            warn!(course_id = %self.course.id, module = index, first_incomplete, "Navigation locked");
            return Err(CourseError::NavigationLocked {
                target: index,
                first_incomplete,
            });
        }

        self.state.current_module = index;
        self.state.hint_visible = false;
        self.state.last_run = None;
        self.refresh_status();
        debug!(course_id = %self.course.id, module = index, "Moved to module");
        Ok(())
    }

    /// Moves to the next module.
    ///
    /// # Errors
    ///
    /// Same as [`CourseSession::go_to`].
    pub fn next(&mut self) -> Result<()> {
        self.go_to(self.state.current_module + 1)
    }

    /// Moves to the previous module.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::ModuleIndexOutOfRange` on the first module.
    pub fn previous(&mut self) -> Result<()> {
        let index = self
            .state
            .current_module
            .checked_sub(1)
            .ok_or(CourseError::ModuleIndexOutOfRange {
                index: 0,
                len: self.course.len(),
            })?;
        self.go_to(index)
    }

    /// Claims the completion reward by asking `signer` to sign a
    /// `completeCourse` call as `wallet`.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::InvalidStateTransition` before the course is
    /// complete or after the reward was claimed, and
    /// `CourseError::ClaimFailed` if building or signing the transaction
    /// fails. A failed claim can be retried.
    pub async fn claim_reward<S>(&mut self, signer: &S, wallet: &str) -> Result<TxReceipt>
    where
        S: TransactionSigner + ?Sized,
    {
        if self.state.status != SessionStatus::CourseComplete {
            return Err(CourseError::invalid_transition(
                self.state.status,
                SessionStatus::RewardClaimed,
            ));
        }

        let course_id = self.course.id.clone();
        let clause = self
            .contract
            .complete_course(&course_id)
            .map_err(|source| CourseError::ClaimFailed {
                course_id: course_id.clone(),
                source,
            })?;
        let comment = format!("Claiming reward for completing {course_id}");

        info!(course_id = %course_id, wallet, "Claiming reward");
        let receipt = match signer.sign(&[clause], wallet, &comment).await {
            Ok(receipt) => receipt,
            Err(source) => {
                warn!(course_id = %course_id, error = %source, "Reward claim failed");
                return Err(CourseError::ClaimFailed { course_id, source });
            }
        };

        self.state.reward_txid = Some(receipt.txid.clone());
        self.refresh_status();
        info!(course_id = %course_id, txid = %receipt.txid, "Reward claimed");
        self.hooks.on_course_complete(&course_id);
        Ok(receipt)
    }

    /// Leaves the course and returns the final state.
    pub fn back(mut self) -> SessionState {
        info!(course_id = %self.course.id, status = %self.state.status, "Session closed");
        self.hooks.on_back();
        self.state
    }

    fn first_incomplete(&self) -> Option<usize> {
        (0..self.course.len()).find(|i| !self.state.completed_modules.contains(i))
    }

    fn refresh_status(&mut self) {
        self.state.status = if self.state.reward_txid.is_some() {
            SessionStatus::RewardClaimed
        } else if self.state.course_completed {
            SessionStatus::CourseComplete
        } else if self
            .state
            .completed_modules
            .contains(&self.state.current_module)
        {
            SessionStatus::ModuleComplete
        } else {
            SessionStatus::InModule
        };
        self.state.touch();
    }
}
