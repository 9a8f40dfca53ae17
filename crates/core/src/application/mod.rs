// Application Layer - Use Cases and Business Logic

pub mod constants;
pub mod orchestrator;
pub mod stats;
pub mod supervisor;

// Re-exports
pub use orchestrator::{InspectReport, MatchOrchestrator};
pub use stats::{FallbackReason, MatchStats, StatsSnapshot};
pub use supervisor::{validate_response, ScorerSupervisor};
