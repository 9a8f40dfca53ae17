// Semantic Scorer Port
// Boundary to the external, long-running similarity model

use crate::domain::SupervisorState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// One entry of a scorer response, before validation.
///
/// `job_index` is signed so a negative index is reported as malformed
/// rather than failing deserialization somewhere upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawMatch {
    pub job_index: i64,
    pub similarity_score: f64,
}

impl RawMatch {
    pub fn new(job_index: i64, similarity_score: f64) -> Self {
        Self {
            job_index,
            similarity_score,
        }
    }
}

/// Scorer errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScorerError {
    #[error("Scorer not ready (state: {0})")]
    NotReady(SupervisorState),

    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Startup failed: {0}")]
    StartupFailed(String),

    #[error("Scorer timeout after {0}ms")]
    Timeout(u64),

    #[error("Scorer process exited: {0}")]
    ProcessExited(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Scorer rejected request: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// A running scorer the engine can send requests to
///
/// Implementations:
/// - ProcessScorerClient: line-delimited JSON over a child's stdio
#[async_trait]
pub trait SemanticScorer: Send + Sync {
    /// Rank `job_descriptions` against `resume_text`
    ///
    /// # Errors
    /// - ScorerError::ProcessExited if the process is gone
    /// - ScorerError::MalformedResponse if the reply cannot be decoded
    /// - ScorerError::Rejected if the scorer answered with an error
    async fn score(
        &self,
        resume_text: &str,
        job_descriptions: &[String],
        top_k: usize,
    ) -> Result<Vec<RawMatch>, ScorerError>;

    fn is_alive(&self) -> bool;

    /// Resolves once the scorer has exited, for whatever reason
    async fn closed(&self);

    /// Stop the scorer; idempotent
    async fn shutdown(&self);
}

/// Starts a scorer and returns it once it has proven it is alive
#[async_trait]
pub trait ScorerLauncher: Send + Sync {
    /// # Errors
    /// - ScorerError::SpawnFailed if the process cannot be started
    /// - ScorerError::StartupFailed on an error banner, early exit or failed probe
    async fn launch(&self) -> Result<Arc<dyn SemanticScorer>, ScorerError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::watch;

    /// Mock scorer behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Reply with these matches
        Respond(Vec<RawMatch>),
        /// Fail every request
        Fail(ScorerError),
        /// Never reply (for timeout testing)
        Hang,
    }

    /// Mock SemanticScorer for testing
    pub struct MockSemanticScorer {
        behavior: Mutex<MockBehavior>,
        call_count: Mutex<usize>,
        exited: watch::Sender<bool>,
    }

    impl MockSemanticScorer {
        pub fn new(behavior: MockBehavior) -> Self {
            let (exited, _rx) = watch::channel(false);
            Self {
                behavior: Mutex::new(behavior),
                call_count: Mutex::new(0),
                exited,
            }
        }

        pub fn new_respond(matches: Vec<RawMatch>) -> Self {
            Self::new(MockBehavior::Respond(matches))
        }

        pub fn new_fail(error: ScorerError) -> Self {
            Self::new(MockBehavior::Fail(error))
        }

        pub fn new_hang() -> Self {
            Self::new(MockBehavior::Hang)
        }

        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }

        /// Simulate the process dying
        pub fn exit(&self) {
            self.exited.send_replace(true);
        }
    }

    #[async_trait]
    impl SemanticScorer for MockSemanticScorer {
        async fn score(
            &self,
            _resume_text: &str,
            _job_descriptions: &[String],
            _top_k: usize,
        ) -> Result<Vec<RawMatch>, ScorerError> {
            *self.call_count.lock().unwrap() += 1;

            if !self.is_alive() {
                return Err(ScorerError::ProcessExited("mock exited".to_string()));
            }

            let behavior = self.behavior.lock().unwrap().clone();
            match behavior {
                MockBehavior::Respond(matches) => Ok(matches),
                MockBehavior::Fail(error) => Err(error),
                MockBehavior::Hang => std::future::pending().await,
            }
        }

        fn is_alive(&self) -> bool {
            !*self.exited.borrow()
        }

        async fn closed(&self) {
            let mut rx = self.exited.subscribe();
            let _ = rx.wait_for(|exited| *exited).await;
        }

        async fn shutdown(&self) {
            self.exit();
        }
    }

    /// What the launcher does on each `launch` call
    #[derive(Debug, Clone)]
    pub enum LaunchBehavior {
        /// Hand out a fresh scorer with this behavior
        Ready(MockBehavior),
        Fail(ScorerError),
        /// Never finish starting (for startup timeout testing)
        Hang,
    }

    /// Mock ScorerLauncher for testing
    pub struct MockScorerLauncher {
        behavior: Mutex<LaunchBehavior>,
        launch_count: Mutex<usize>,
        last: Mutex<Option<Arc<MockSemanticScorer>>>,
    }

    impl MockScorerLauncher {
        pub fn new(behavior: LaunchBehavior) -> Self {
            Self {
                behavior: Mutex::new(behavior),
                launch_count: Mutex::new(0),
                last: Mutex::new(None),
            }
        }

        pub fn new_ready(matches: Vec<RawMatch>) -> Self {
            Self::new(LaunchBehavior::Ready(MockBehavior::Respond(matches)))
        }

        pub fn new_failing(message: impl Into<String>) -> Self {
            Self::new(LaunchBehavior::Fail(ScorerError::StartupFailed(
                message.into(),
            )))
        }

        pub fn new_hanging() -> Self {
            Self::new(LaunchBehavior::Hang)
        }

        pub fn set_behavior(&self, behavior: LaunchBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        pub fn launch_count(&self) -> usize {
            *self.launch_count.lock().unwrap()
        }

        /// Scorer handed out by the most recent successful launch
        pub fn last_scorer(&self) -> Option<Arc<MockSemanticScorer>> {
            self.last.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ScorerLauncher for MockScorerLauncher {
        async fn launch(&self) -> Result<Arc<dyn SemanticScorer>, ScorerError> {
            *self.launch_count.lock().unwrap() += 1;

            let behavior = self.behavior.lock().unwrap().clone();
            match behavior {
                LaunchBehavior::Ready(scorer_behavior) => {
                    let scorer = Arc::new(MockSemanticScorer::new(scorer_behavior));
                    *self.last.lock().unwrap() = Some(Arc::clone(&scorer));
                    Ok(scorer)
                }
                LaunchBehavior::Fail(error) => Err(error),
                LaunchBehavior::Hang => std::future::pending().await,
            }
        }
    }
}
