// Domain Layer - Pure value objects and the readiness state machine

pub mod error;
pub mod matching;
pub mod readiness;

// Re-exports
pub use error::DomainError;
pub use matching::{MatchMode, MatchOutcome, MatchRequest, MatchResult, ScoredJob};
pub use readiness::{ReadinessCell, SupervisorState};
