//! Shared fixtures: `sh` scripts standing in for the semantic scorer

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use talentmatch_core::application::{MatchOrchestrator, ScorerSupervisor};
use talentmatch_core::config::{EngineConfig, MatchingSettings, ScorerSettings};
use talentmatch_core::lexical::LexicalMatcher;
use talentmatch_core::port::time_provider::SystemTimeProvider;
use talentmatch_infra_system::ProcessScorerLauncher;

pub const SETTLE: Duration = Duration::from_secs(5);

/// Pulls the request id out of a compact JSON line into $id
const READ_ID: &str = r#"id=$(printf '%s' "$line" | sed -n 's/^{"id":\([0-9]*\).*/\1/p')"#;

/// Answers pings, and ranks job 1 above job 0 for every match request
pub fn ready_scorer() -> String {
    format!(
        r#"
echo 'loading model...'
echo '{{"status":"ready"}}'
while IFS= read -r line; do
  {READ_ID}
  case "$line" in
    *'"op":"ping"'*) printf '{{"id":%s,"success":true}}\n' "$id" ;;
    *) printf '{{"id":%s,"success":true,"matches":[{{"job_index":1,"similarity_score":0.91}},{{"job_index":0,"similarity_score":0.33}}]}}\n' "$id" ;;
  esac
done
"#
    )
}

/// Answers pings; every match request gets `reply` (with `%s` for the id)
pub fn scorer_replying(reply: &str) -> String {
    format!(
        r#"
echo '{{"status":"ready"}}'
while IFS= read -r line; do
  {READ_ID}
  case "$line" in
    *'"op":"ping"'*) printf '{{"id":%s,"success":true}}\n' "$id" ;;
    *) printf '{reply}\n' "$id" ;;
  esac
done
"#
    )
}

/// Answers pings, sleeps before answering match requests
pub fn slow_scorer(delay_secs: u32) -> String {
    format!(
        r#"
echo '{{"status":"ready"}}'
while IFS= read -r line; do
  {READ_ID}
  case "$line" in
    *'"op":"ping"'*) printf '{{"id":%s,"success":true}}\n' "$id" ;;
    *) sleep {delay_secs}; printf '{{"id":%s,"success":true,"matches":[{{"job_index":0,"similarity_score":0.5}}]}}\n' "$id" ;;
  esac
done
"#
    )
}

/// Answers the ping, then dies on the first match request
pub fn exit_on_match_scorer() -> String {
    format!(
        r#"
echo '{{"status":"ready"}}'
IFS= read -r line
{READ_ID}
printf '{{"id":%s,"success":true}}\n' "$id"
IFS= read -r line
exit 1
"#
    )
}

pub const NEVER_READY: &str = "echo 'loading model...'; sleep 30";
pub const ERROR_BANNER: &str = r#"echo '{"status":"error","error":"model weights not found"}'; exit 1"#;
pub const EARLY_EXIT: &str = "echo 'crashing'; exit 2";

pub fn scorer_settings(script: &str) -> ScorerSettings {
    ScorerSettings {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        startup_timeout_ms: 3_000,
        request_timeout_ms: 1_000,
        ..ScorerSettings::default()
    }
}

pub fn supervisor(settings: ScorerSettings) -> Arc<ScorerSupervisor> {
    let launcher = Arc::new(
        ProcessScorerLauncher::new(settings.clone()).with_shutdown_timeout(Duration::from_millis(500)),
    );
    Arc::new(ScorerSupervisor::new(
        launcher,
        settings,
        Arc::new(SystemTimeProvider),
    ))
}

pub fn orchestrator(settings: ScorerSettings) -> MatchOrchestrator {
    let lexical = Arc::new(LexicalMatcher::from_config(&EngineConfig::default()).unwrap());
    MatchOrchestrator::new(supervisor(settings), lexical, MatchingSettings::default())
}

/// Orchestrator whose scorer start attempt has already settled
pub async fn settled_orchestrator(settings: ScorerSettings) -> MatchOrchestrator {
    let orch = orchestrator(settings);
    orch.supervisor().start();
    orch.supervisor().wait_until_settled(SETTLE).await;
    orch
}

pub fn jobs(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}
