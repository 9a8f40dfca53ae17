// TalentMatch Infrastructure - System Adapters
// Implements: ScorerLauncher, SemanticScorer (child process over stdio)

pub mod process_scorer;

pub use process_scorer::{ProcessScorerClient, ProcessScorerLauncher};
