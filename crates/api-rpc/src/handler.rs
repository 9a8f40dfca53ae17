//! RPC Method Handlers
//!
//! Implements the business logic for each JSON-RPC method.

use crate::error::to_rpc_error;
use crate::types::{
    InspectRequest, InspectResponse, MatchEntry, MatchJobsRequest, MatchJobsResponse,
    RestartResponse, StatusResponse,
};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use std::time::Instant;
use talentmatch_core::application::MatchOrchestrator;
use talentmatch_core::domain::MatchRequest;
use tracing::{info, warn};

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    orchestrator: Arc<MatchOrchestrator>,
    start_time: Instant,
}

impl RpcHandler {
    pub fn new(orchestrator: Arc<MatchOrchestrator>) -> Self {
        Self {
            orchestrator,
            start_time: Instant::now(),
        }
    }

    /// match.jobs.v1
    pub async fn match_jobs(
        &self,
        params: MatchJobsRequest,
    ) -> Result<MatchJobsResponse, ErrorObjectOwned> {
        let started = Instant::now();

        // Caller-facing cap; the orchestrator further clamps to the job count
        let limit = params.limit.min(self.orchestrator.settings().max_limit);
        let request = MatchRequest::new(params.resume_text, params.job_descriptions, limit);

        let outcome = self
            .orchestrator
            .match_jobs(&request)
            .await
            .map_err(to_rpc_error)?;

        let mode = outcome.mode;
        let matches = outcome
            .result
            .iter()
            .map(|job| MatchEntry {
                source_index: job.source_index,
                score: job.score,
                mode,
            })
            .collect();

        Ok(MatchJobsResponse {
            mode,
            matches,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// match.inspect.v1
    pub async fn inspect(&self, params: InspectRequest) -> Result<InspectResponse, ErrorObjectOwned> {
        let report = self
            .orchestrator
            .inspect(&params.resume_text, &params.job_descriptions);

        Ok(InspectResponse {
            resume: report.resume,
            jobs: report.jobs,
        })
    }

    /// engine.status.v1
    pub async fn status(&self) -> Result<StatusResponse, ErrorObjectOwned> {
        let supervisor = self.orchestrator.supervisor();
        let state_changed_at =
            chrono::DateTime::<chrono::Utc>::from_timestamp_millis(supervisor.state_changed_at_millis())
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();

        Ok(StatusResponse {
            scorer_state: supervisor.state(),
            state_changed_at,
            stats: self.orchestrator.stats(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        })
    }

    /// admin.scorer.restart.v1
    ///
    /// Only a failed scorer is restarted; any other state is a conflict.
    pub async fn restart_scorer(&self) -> Result<RestartResponse, ErrorObjectOwned> {
        let supervisor = self.orchestrator.supervisor();

        if let Err(e) = supervisor.restart().await {
            warn!(error = %e, "Scorer restart refused");
            return Err(to_rpc_error(e));
        }
        info!("Scorer restart requested over RPC");

        Ok(RestartResponse {
            restarted: true,
            scorer_state: supervisor.state(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::code;
    use std::time::Duration;
    use talentmatch_core::application::ScorerSupervisor;
    use talentmatch_core::config::{EngineConfig, MatchingSettings, ScorerSettings};
    use talentmatch_core::domain::{MatchMode, SupervisorState};
    use talentmatch_core::lexical::LexicalMatcher;
    use talentmatch_core::port::semantic_scorer::mocks::MockScorerLauncher;
    use talentmatch_core::port::{RawMatch, SystemTimeProvider};

    fn handler(launcher: MockScorerLauncher, matching: MatchingSettings) -> RpcHandler {
        let supervisor = Arc::new(ScorerSupervisor::new(
            Arc::new(launcher),
            ScorerSettings {
                startup_timeout_ms: 200,
                request_timeout_ms: 100,
                ..ScorerSettings::default()
            },
            Arc::new(SystemTimeProvider),
        ));
        let lexical = Arc::new(LexicalMatcher::from_config(&EngineConfig::default()).unwrap());
        RpcHandler::new(Arc::new(MatchOrchestrator::new(supervisor, lexical, matching)))
    }

    async fn settle(handler: &RpcHandler) {
        let supervisor = handler.orchestrator.supervisor();
        supervisor.start();
        supervisor.wait_until_settled(Duration::from_secs(2)).await;
    }

    fn request(limit: usize, jobs: usize) -> MatchJobsRequest {
        MatchJobsRequest {
            resume_text: "react node api".to_string(),
            job_descriptions: (0..jobs).map(|i| format!("react api {}", i)).collect(),
            limit,
        }
    }

    #[tokio::test]
    async fn test_match_tags_every_entry_with_mode() {
        let h = handler(
            MockScorerLauncher::new_failing("no model"),
            MatchingSettings::default(),
        );
        settle(&h).await;

        let response = h.match_jobs(request(2, 3)).await.unwrap();

        assert_eq!(response.mode, MatchMode::Lexical);
        assert_eq!(response.matches.len(), 2);
        assert!(response.matches.iter().all(|m| m.mode == MatchMode::Lexical));
    }

    #[tokio::test]
    async fn test_external_mode_over_rpc() {
        let h = handler(
            MockScorerLauncher::new_ready(vec![RawMatch::new(0, 77.0)]),
            MatchingSettings::default(),
        );
        settle(&h).await;

        let response = h.match_jobs(request(1, 1)).await.unwrap();

        assert_eq!(response.mode, MatchMode::External);
        assert_eq!(response.matches[0].score, 77.0);
    }

    #[tokio::test]
    async fn test_limit_capped_at_max() {
        let h = handler(
            MockScorerLauncher::new_failing("no model"),
            MatchingSettings {
                max_limit: 3,
                ..MatchingSettings::default()
            },
        );
        settle(&h).await;

        let response = h.match_jobs(request(40, 10)).await.unwrap();
        assert_eq!(response.matches.len(), 3);
    }

    #[tokio::test]
    async fn test_zero_limit_is_validation_error() {
        let h = handler(
            MockScorerLauncher::new_failing("no model"),
            MatchingSettings::default(),
        );

        let err = h.match_jobs(request(0, 2)).await.unwrap_err();
        assert_eq!(err.code(), code::VALIDATION_ERROR);
    }

    #[tokio::test]
    async fn test_status_and_restart() {
        let h = handler(
            MockScorerLauncher::new_failing("no model"),
            MatchingSettings::default(),
        );
        settle(&h).await;
        h.match_jobs(request(1, 1)).await.unwrap();

        let status = h.status().await.unwrap();
        assert_eq!(status.scorer_state, SupervisorState::Failed);
        assert_eq!(status.stats.lexical_matches, 1);
        assert_eq!(status.stats.fallback_unavailable, 1);
        assert!(!status.state_changed_at.is_empty());

        let restart = h.restart_scorer().await.unwrap();
        assert!(restart.restarted);
    }

    #[tokio::test]
    async fn test_restart_refused_when_not_failed() {
        let h = handler(MockScorerLauncher::new_ready(vec![]), MatchingSettings::default());
        settle(&h).await;

        let err = h.restart_scorer().await.unwrap_err();

        assert_eq!(err.code(), code::CONFLICT);
        assert!(err.message().contains("READY"));
        assert_eq!(h.orchestrator.supervisor().state(), SupervisorState::Ready);
    }

    #[tokio::test]
    async fn test_inspect() {
        let h = handler(
            MockScorerLauncher::new_failing("no model"),
            MatchingSettings::default(),
        );

        let response = h
            .inspect(InspectRequest {
                resume_text: "C++ developer".to_string(),
                job_descriptions: vec!["Node.js".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(response.resume.sample_tokens, vec!["cpp", "developer"]);
        assert_eq!(response.jobs[0].sample_tokens, vec!["nodejs"]);
    }
}
