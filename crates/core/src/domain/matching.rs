// Match Domain Model

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Engine path that produced a ranking.
///
/// Scores are only comparable within one mode; callers must never merge
/// `External` and `Lexical` results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    External,
    Lexical,
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMode::External => write!(f, "external"),
            MatchMode::Lexical => write!(f, "lexical"),
        }
    }
}

/// One résumé ranked against an ordered list of job descriptions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRequest {
    pub resume_text: String,
    pub job_descriptions: Vec<String>,
    pub limit: usize,
}

impl MatchRequest {
    pub fn new(
        resume_text: impl Into<String>,
        job_descriptions: Vec<String>,
        limit: usize,
    ) -> Self {
        Self {
            resume_text: resume_text.into(),
            job_descriptions,
            limit,
        }
    }

    /// Requested limit clamped to the number of job descriptions
    pub fn effective_limit(&self) -> usize {
        self.limit.min(self.job_descriptions.len())
    }

    /// Whitespace-only résumé text counts as empty
    pub fn has_resume_text(&self) -> bool {
        !self.resume_text.trim().is_empty()
    }
}

/// Score for a single job description, identified by its input position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredJob {
    pub source_index: usize,
    pub score: f64,
}

impl ScoredJob {
    pub fn new(source_index: usize, score: f64) -> Self {
        Self {
            source_index,
            score,
        }
    }

    /// Ranking order: score descending, then source index ascending
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.source_index.cmp(&other.source_index))
    }
}

/// Ranked, truncated list of scored jobs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchResult(Vec<ScoredJob>);

impl MatchResult {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Sort into ranking order and keep the first `limit` entries
    pub fn ranked(mut jobs: Vec<ScoredJob>, limit: usize) -> Self {
        jobs.sort_by(ScoredJob::rank_cmp);
        jobs.truncate(limit);
        Self(jobs)
    }

    pub fn as_slice(&self) -> &[ScoredJob] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredJob> {
        self.0.iter()
    }
}

/// A ranking tagged with the mode that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub result: MatchResult,
    pub mode: MatchMode,
}

impl MatchOutcome {
    pub fn new(result: MatchResult, mode: MatchMode) -> Self {
        Self { result, mode }
    }
}
