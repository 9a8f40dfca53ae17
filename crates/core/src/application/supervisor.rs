// Scorer Process Supervisor
// Owns the external scorer's lifecycle and the readiness state.
//
// State is written by the start task (NotStarted -> Ready | Failed,
// Ready -> Failed on exit) and by an explicit restart (Failed -> NotStarted).
// Match requests only read it.

use crate::config::ScorerSettings;
use crate::error::{AppError, Result as AppResult};
use crate::domain::{DomainError, MatchResult, ReadinessCell, ScoredJob, SupervisorState};
use crate::port::{RawMatch, ScorerError, ScorerLauncher, SemanticScorer, TimeProvider};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

pub struct ScorerSupervisor {
    launcher: Arc<dyn ScorerLauncher>,
    settings: ScorerSettings,
    readiness: ReadinessCell,
    client: RwLock<Option<Arc<dyn SemanticScorer>>>,
    started: AtomicBool,
    /// Serializes restart against itself
    lifecycle: Mutex<()>,
    time_provider: Arc<dyn TimeProvider>,
    state_changed_at: AtomicI64,
}

impl ScorerSupervisor {
    pub fn new(
        launcher: Arc<dyn ScorerLauncher>,
        settings: ScorerSettings,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        let created_at = time_provider.now_millis();
        Self {
            launcher,
            settings,
            readiness: ReadinessCell::new(),
            client: RwLock::new(None),
            started: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
            time_provider,
            state_changed_at: AtomicI64::new(created_at),
        }
    }

    /// Issue the single start attempt in the background.
    ///
    /// Returns `None` if an attempt was already issued; further attempts
    /// only happen through [`ScorerSupervisor::restart`].
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("Scorer start already issued");
            return None;
        }
        Some(self.spawn_attempt())
    }

    fn spawn_attempt(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_attempt().await })
    }

    async fn run_attempt(&self) {
        if !self.settings.enabled {
            info!("Semantic scorer disabled, lexical matching only");
            self.record_transition(SupervisorState::NotStarted, SupervisorState::Failed);
            return;
        }

        let timeout_ms = self.settings.startup_timeout_ms;
        info!(
            command = %self.settings.command,
            timeout_ms = timeout_ms,
            "Starting semantic scorer"
        );

        let scorer = match timeout(Duration::from_millis(timeout_ms), self.launcher.launch()).await
        {
            Ok(Ok(scorer)) => scorer,
            Ok(Err(e)) => {
                error!(error = %e, "Semantic scorer failed to start");
                self.record_transition(SupervisorState::NotStarted, SupervisorState::Failed);
                return;
            }
            Err(_) => {
                error!(timeout_ms = timeout_ms, "Semantic scorer did not become ready in time");
                self.record_transition(SupervisorState::NotStarted, SupervisorState::Failed);
                return;
            }
        };

        *self.client.write().await = Some(Arc::clone(&scorer));
        if !self.record_transition(SupervisorState::NotStarted, SupervisorState::Ready) {
            scorer.shutdown().await;
            self.client.write().await.take();
            return;
        }

        scorer.closed().await;

        if self.record_transition(SupervisorState::Ready, SupervisorState::Failed) {
            warn!("Semantic scorer exited, falling back to lexical matching");
            // Reap the dead process now; a restart may already have
            // installed a fresh client, which must be left alone
            let dead = {
                let mut slot = self.client.write().await;
                match slot.as_ref() {
                    Some(current) if Arc::ptr_eq(current, &scorer) => slot.take(),
                    _ => None,
                }
            };
            if dead.is_some() {
                scorer.shutdown().await;
            }
        }
    }

    /// Apply a transition and stamp its time. Returns false if it was stale.
    fn record_transition(&self, from: SupervisorState, to: SupervisorState) -> bool {
        match self.readiness.transition(from, to) {
            Ok(()) => {
                self.state_changed_at
                    .store(self.time_provider.now_millis(), Ordering::SeqCst);
                info!(from = %from, to = %to, "Scorer state changed");
                true
            }
            Err(e) => {
                debug!(error = %e, "Scorer state transition skipped");
                false
            }
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.readiness.get()
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// Millisecond timestamp of the last state change (creation time before any)
    pub fn state_changed_at_millis(&self) -> i64 {
        self.state_changed_at.load(Ordering::SeqCst)
    }

    /// Wait until a start attempt has settled or `wait` elapses; returns the
    /// state observed at that point
    pub async fn wait_until_settled(&self, wait: Duration) -> SupervisorState {
        let mut rx = self.readiness.subscribe();
        let settled = timeout(wait, async {
            rx.wait_for(|state| *state != SupervisorState::NotStarted)
                .await
                .map(|state| *state)
        })
        .await;

        match settled {
            Ok(Ok(state)) => state,
            _ => self.readiness.get(),
        }
    }

    /// Ask the external scorer to rank the jobs.
    ///
    /// # Errors
    /// - ScorerError::NotReady unless the state is Ready
    /// - ScorerError::Timeout past `request_timeout_ms`
    /// - ScorerError::MalformedResponse if the reply fails validation
    /// - any error the scorer itself returns
    pub async fn request_score(
        &self,
        resume_text: &str,
        job_descriptions: &[String],
        limit: usize,
    ) -> Result<MatchResult, ScorerError> {
        let state = self.readiness.get();
        if state != SupervisorState::Ready {
            return Err(ScorerError::NotReady(state));
        }

        let client = self
            .client
            .read()
            .await
            .clone()
            .ok_or(ScorerError::NotReady(state))?;

        let timeout_ms = self.settings.request_timeout_ms;
        let raw = match timeout(
            Duration::from_millis(timeout_ms),
            client.score(resume_text, job_descriptions, limit),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(ScorerError::Timeout(timeout_ms)),
        };

        validate_response(
            raw,
            job_descriptions.len(),
            limit,
            self.settings.score_scale,
        )
    }

    /// Start over after a failure.
    ///
    /// # Errors
    /// - AppError::InvalidState unless the state is Failed
    pub async fn restart(self: &Arc<Self>) -> AppResult<JoinHandle<()>> {
        let _guard = self.lifecycle.lock().await;

        self.readiness
            .transition(SupervisorState::Failed, SupervisorState::NotStarted)
            .map_err(|e| match e {
                DomainError::InvalidStateTransition { from, .. } => {
                    AppError::InvalidState(format!("scorer restart refused in state {}", from))
                }
                other => AppError::Domain(other),
            })?;
        self.state_changed_at
            .store(self.time_provider.now_millis(), Ordering::SeqCst);
        info!("Restarting semantic scorer");

        let previous = self.client.write().await.take();
        if let Some(previous) = previous {
            previous.shutdown().await;
        }

        self.started.store(true, Ordering::SeqCst);
        Ok(self.spawn_attempt())
    }

    /// Stop the scorer process if one is running
    pub async fn shutdown(&self) {
        let client = self.client.write().await.take();
        if let Some(client) = client {
            info!("Stopping semantic scorer");
            client.shutdown().await;
        }
    }
}

/// Check a scorer reply against the request and turn it into a ranking.
///
/// Every index must be in range and unique and every score finite. Scores
/// are scaled, clamped to 0..=100 and rounded to two decimals. A reply with
/// fewer than `min(limit, job_count)` entries is rejected.
pub fn validate_response(
    raw: Vec<RawMatch>,
    job_count: usize,
    limit: usize,
    score_scale: f64,
) -> Result<MatchResult, ScorerError> {
    let mut seen = vec![false; job_count];
    let mut jobs = Vec::with_capacity(raw.len());

    for entry in raw {
        let index = usize::try_from(entry.job_index)
            .ok()
            .filter(|i| *i < job_count)
            .ok_or_else(|| {
                ScorerError::MalformedResponse(format!(
                    "job_index {} out of range 0..{}",
                    entry.job_index, job_count
                ))
            })?;

        if seen[index] {
            return Err(ScorerError::MalformedResponse(format!(
                "duplicate job_index {}",
                index
            )));
        }
        seen[index] = true;

        if !entry.similarity_score.is_finite() {
            return Err(ScorerError::MalformedResponse(format!(
                "non-finite score for job_index {}",
                index
            )));
        }

        let scaled = (entry.similarity_score * score_scale).clamp(0.0, 100.0);
        jobs.push(ScoredJob::new(index, (scaled * 100.0).round() / 100.0));
    }

    let expected = limit.min(job_count);
    if jobs.len() < expected {
        return Err(ScorerError::MalformedResponse(format!(
            "expected at least {} matches, got {}",
            expected,
            jobs.len()
        )));
    }

    Ok(MatchResult::ranked(jobs, limit))
}
