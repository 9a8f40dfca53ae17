//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use serde::{Deserialize, Serialize};
use talentmatch_core::application::StatsSnapshot;
use talentmatch_core::application::constants::DEFAULT_RESULT_LIMIT;
use talentmatch_core::domain::{MatchMode, SupervisorState};
use talentmatch_core::lexical::TextProfile;

/// match.jobs.v1 - Rank job descriptions against a résumé
#[derive(Debug, Deserialize)]
pub struct MatchJobsRequest {
    pub resume_text: String,
    pub job_descriptions: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_RESULT_LIMIT
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchEntry {
    pub source_index: usize,
    pub score: f64,
    pub mode: MatchMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchJobsResponse {
    pub mode: MatchMode,
    pub matches: Vec<MatchEntry>,
    pub elapsed_ms: u64,
}

/// match.inspect.v1 - Show how the lexical path sees the inputs
#[derive(Debug, Deserialize)]
pub struct InspectRequest {
    pub resume_text: String,
    #[serde(default)]
    pub job_descriptions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectResponse {
    pub resume: TextProfile,
    pub jobs: Vec<TextProfile>,
}

/// engine.status.v1 - Scorer state and match counters
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub scorer_state: SupervisorState,
    /// RFC 3339
    pub state_changed_at: String,
    pub stats: StatsSnapshot,
    pub uptime_seconds: u64,
}

/// admin.scorer.restart.v1 - Restart a failed scorer
#[derive(Debug, Clone, Serialize)]
pub struct RestartResponse {
    pub restarted: bool,
    pub scorer_state: SupervisorState,
}
