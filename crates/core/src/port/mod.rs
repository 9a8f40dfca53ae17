// Port Layer - Interfaces for external dependencies

pub mod semantic_scorer;
pub mod time_provider; // For deterministic testing

// Re-exports
pub use semantic_scorer::{RawMatch, ScorerError, ScorerLauncher, SemanticScorer};
pub use time_provider::{SystemTimeProvider, TimeProvider};
