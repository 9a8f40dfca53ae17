//! Lexical matching pipeline
//!
//! Deterministic, in-process fallback used whenever the semantic scorer is
//! unavailable: normalize -> bigrams -> overlap score.

pub mod matcher;
pub mod ngram;
pub mod normalizer;
pub mod scorer;

pub use matcher::{LexicalMatcher, TextProfile};
pub use ngram::bigrams;
pub use normalizer::TextNormalizer;
pub use scorer::{LexicalScorer, TextFeatures};
