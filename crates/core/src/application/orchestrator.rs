// Match Orchestrator
// Picks the external scorer when it is ready, the lexical path otherwise.

use super::stats::{FallbackReason, MatchStats, StatsSnapshot};
use super::supervisor::ScorerSupervisor;
use crate::config::MatchingSettings;
use crate::domain::{DomainError, MatchMode, MatchOutcome, MatchRequest, MatchResult};
use crate::error::{AppError, Result};
use crate::lexical::{LexicalMatcher, TextProfile};
use crate::port::ScorerError;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Normalization view of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    pub resume: TextProfile,
    pub jobs: Vec<TextProfile>,
}

pub struct MatchOrchestrator {
    supervisor: Arc<ScorerSupervisor>,
    lexical: Arc<LexicalMatcher>,
    settings: MatchingSettings,
    stats: Arc<MatchStats>,
}

impl MatchOrchestrator {
    pub fn new(
        supervisor: Arc<ScorerSupervisor>,
        lexical: Arc<LexicalMatcher>,
        settings: MatchingSettings,
    ) -> Self {
        Self {
            supervisor,
            lexical,
            settings,
            stats: Arc::new(MatchStats::new()),
        }
    }

    pub fn supervisor(&self) -> &Arc<ScorerSupervisor> {
        &self.supervisor
    }

    pub fn settings(&self) -> MatchingSettings {
        self.settings
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Rank the request's jobs against its résumé.
    ///
    /// # Errors
    /// - AppError::Domain(InvalidLimit) if `limit` is 0
    /// - AppError::Internal if a lexical worker thread dies
    ///
    /// Scorer problems never surface here; they fall back to lexical mode.
    pub async fn match_jobs(&self, request: &MatchRequest) -> Result<MatchOutcome> {
        if request.limit == 0 {
            return Err(DomainError::InvalidLimit(request.limit).into());
        }

        if request.job_descriptions.is_empty() {
            debug!("No job descriptions, nothing to rank");
            return Ok(MatchOutcome::new(MatchResult::empty(), MatchMode::Lexical));
        }

        let limit = request.effective_limit();

        if request.has_resume_text() {
            match self
                .supervisor
                .request_score(&request.resume_text, &request.job_descriptions, limit)
                .await
            {
                Ok(result) => {
                    self.stats.record_external();
                    info!(
                        jobs = request.job_descriptions.len(),
                        returned = result.len(),
                        mode = %MatchMode::External,
                        "Match completed"
                    );
                    return Ok(MatchOutcome::new(result, MatchMode::External));
                }
                Err(e) => self.note_fallback(&e),
            }
        } else {
            debug!("Empty resume text, skipping semantic scorer");
        }

        let result = self
            .rank_lexical(&request.resume_text, &request.job_descriptions, limit)
            .await?;
        self.stats.record_lexical();
        info!(
            jobs = request.job_descriptions.len(),
            returned = result.len(),
            mode = %MatchMode::Lexical,
            "Match completed"
        );

        Ok(MatchOutcome::new(result, MatchMode::Lexical))
    }

    fn note_fallback(&self, error: &ScorerError) {
        let reason = FallbackReason::from(error);
        self.stats.record_fallback(reason);

        // A scorer that is down is reported once by the supervisor
        if matches!(error, ScorerError::NotReady(_)) {
            debug!(reason = %reason, error = %error, "Falling back to lexical matching");
        } else {
            warn!(reason = %reason, error = %error, "Semantic scorer failed, falling back to lexical matching");
        }
    }

    async fn rank_lexical(
        &self,
        resume_text: &str,
        jobs: &[String],
        limit: usize,
    ) -> Result<MatchResult> {
        if jobs.len() < self.settings.parallel_threshold {
            return Ok(self.lexical.rank(resume_text, jobs, limit));
        }

        let resume = Arc::new(self.lexical.features(resume_text));
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let chunk_size = jobs.len().div_ceil(workers).max(1);
        debug!(jobs = jobs.len(), chunk_size, "Scoring lexical matches in parallel");

        let mut set = JoinSet::new();
        for (chunk_no, chunk) in jobs.chunks(chunk_size).enumerate() {
            let matcher = Arc::clone(&self.lexical);
            let resume = Arc::clone(&resume);
            let chunk = chunk.to_vec();
            let offset = chunk_no * chunk_size;
            set.spawn_blocking(move || matcher.score_range(&resume, &chunk, offset));
        }

        let mut scored = Vec::with_capacity(jobs.len());
        while let Some(joined) = set.join_next().await {
            let part = joined
                .map_err(|e| AppError::Internal(format!("lexical worker failed: {}", e)))?;
            scored.extend(part);
        }

        Ok(MatchResult::ranked(scored, limit))
    }

    /// Profile the résumé and every job description as the lexical path sees them
    pub fn inspect(&self, resume_text: &str, jobs: &[String]) -> InspectReport {
        let sample = self.settings.inspect_sample_size;
        InspectReport {
            resume: self.lexical.inspect(resume_text, sample),
            jobs: jobs
                .iter()
                .map(|job| self.lexical.inspect(job, sample))
                .collect(),
        }
    }
}
