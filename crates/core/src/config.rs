// Engine Configuration
// Plain data with documented defaults. Loading from files and the
// environment is the daemon's job; tests substitute fixtures directly.

use crate::application::constants::{
    DEFAULT_INSPECT_SAMPLE_SIZE, DEFAULT_MAX_LIMIT, DEFAULT_PARALLEL_THRESHOLD,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_STARTUP_TIMEOUT_MS,
};
use crate::domain::DomainError;
use regex::Regex;
use serde::Deserialize;

/// Everything the engine needs to run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub lexicon: LexiconConfig,
    pub weights: LexicalWeights,
    pub scorer: ScorerSettings,
    pub matching: MatchingSettings,
}

impl EngineConfig {
    /// Reject values that would make scoring or supervision meaningless
    pub fn validate(&self) -> Result<(), DomainError> {
        self.lexicon.validate()?;
        self.weights.validate()?;
        self.scorer.validate()?;
        Ok(())
    }
}

/// A literal or regex rewrite applied to lowercased text before tokenizing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RewriteRule {
    pub pattern: String,
    pub replacement: String,
}

impl RewriteRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
        }
    }
}

/// Text normalization tables
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LexiconConfig {
    /// Tokens dropped after splitting
    pub stop_words: Vec<String>,
    /// Applied in order, before punctuation is stripped
    pub rewrites: Vec<RewriteRule>,
    /// Tokens shorter than this are dropped
    pub min_token_len: usize,
    /// Suffixes removed by the stemmer; the longest matching one wins
    pub stem_suffixes: Vec<String>,
    /// Canonical tokens that are never stemmed
    pub protected_terms: Vec<String>,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            rewrites: vec![
                RewriteRule::new(r"\+", "p"),
                RewriteRule::new("#", "sharp"),
                RewriteRule::new(r"node\.?\s*js", "nodejs"),
            ],
            min_token_len: 3,
            stem_suffixes: vec!["ing".to_string(), "ed".to_string(), "s".to_string()],
            protected_terms: vec!["nodejs".to_string()],
        }
    }
}

impl LexiconConfig {
    fn validate(&self) -> Result<(), DomainError> {
        for rule in &self.rewrites {
            Regex::new(&rule.pattern).map_err(|e| {
                DomainError::InvalidConfig(format!("rewrite pattern '{}': {}", rule.pattern, e))
            })?;
        }
        if self.stem_suffixes.iter().any(|s| s.is_empty()) {
            return Err(DomainError::InvalidConfig(
                "stem suffixes must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

const DEFAULT_STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "into", "that", "this", "will", "shall", "have", "has",
    "are", "was", "were", "to", "in", "on", "of", "a", "an", "by", "at", "as", "or", "your", "you",
    "we", "our",
];

/// Lexical score weights.
///
/// score = 100 * (unigram * unigram_overlap + bigram * bigram_overlap) * evidence
/// where evidence = matched / (matched + evidence_smoothing) over distinct
/// matched job tokens. A smoothing of 0 disables the evidence factor.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LexicalWeights {
    pub unigram: f64,
    pub bigram: f64,
    pub evidence_smoothing: f64,
}

impl Default for LexicalWeights {
    fn default() -> Self {
        Self {
            unigram: 0.7,
            bigram: 0.3,
            evidence_smoothing: 1.0,
        }
    }
}

impl LexicalWeights {
    fn validate(&self) -> Result<(), DomainError> {
        let values = [
            ("unigram", self.unigram),
            ("bigram", self.bigram),
            ("evidence_smoothing", self.evidence_smoothing),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(DomainError::InvalidConfig(format!(
                    "weight '{}' must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// One variable set on the scorer process.
///
/// Names are carried as values: config sources lowercase table keys, and
/// environment names are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// How to launch and talk to the external semantic scorer
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScorerSettings {
    /// When false the engine runs lexical-only and never spawns a process
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: String,
    /// Inherited environment variables passed through to the child
    pub env_allowlist: Vec<String>,
    /// Variables set on the child regardless of the parent environment
    pub extra_env: Vec<EnvVar>,
    pub startup_timeout_ms: u64,
    pub request_timeout_ms: u64,
    /// Multiplier applied to `similarity_score` before clamping to 0..=100
    pub score_scale: f64,
}

impl Default for ScorerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "python".to_string(),
            args: vec!["ml-service/semantic_scorer.py".to_string()],
            working_dir: ".".to_string(),
            env_allowlist: ["PATH", "HOME", "USER", "PYTHONPATH"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extra_env: vec![EnvVar::new("PYTHONIOENCODING", "utf-8")],
            startup_timeout_ms: DEFAULT_STARTUP_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            score_scale: 1.0,
        }
    }
}

impl ScorerSettings {
    fn validate(&self) -> Result<(), DomainError> {
        if self.startup_timeout_ms == 0 || self.request_timeout_ms == 0 {
            return Err(DomainError::InvalidConfig(
                "scorer timeouts must be greater than zero".to_string(),
            ));
        }
        if !self.score_scale.is_finite() || self.score_scale <= 0.0 {
            return Err(DomainError::InvalidConfig(format!(
                "score_scale must be positive, got {}",
                self.score_scale
            )));
        }
        if self.enabled && self.command.trim().is_empty() {
            return Err(DomainError::InvalidConfig(
                "scorer command is empty".to_string(),
            ));
        }
        if let Some(var) = self
            .extra_env
            .iter()
            .find(|var| var.name.is_empty() || var.name.contains('='))
        {
            return Err(DomainError::InvalidConfig(format!(
                "invalid scorer environment variable name '{}'",
                var.name
            )));
        }
        Ok(())
    }
}

/// Orchestrator tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    pub parallel_threshold: usize,
    pub inspect_sample_size: usize,
    pub max_limit: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            inspect_sample_size: DEFAULT_INSPECT_SAMPLE_SIZE,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let weights = LexicalWeights::default();
        assert_eq!(weights.unigram, 0.7);
        assert_eq!(weights.bigram, 0.3);
        assert_eq!(weights.evidence_smoothing, 1.0);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut config = EngineConfig::default();
        config.weights.bigram = -0.1;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bigram"));
    }

    #[test]
    fn test_rejects_invalid_rewrite_pattern() {
        let mut config = EngineConfig::default();
        config.lexicon.rewrites.push(RewriteRule::new("(unclosed", "x"));

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = EngineConfig::default();
        config.scorer.request_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_scorer_allows_empty_command() {
        let mut config = EngineConfig::default();
        config.scorer.enabled = false;
        config.scorer.command = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_malformed_env_name() {
        let mut config = EngineConfig::default();
        config.scorer.extra_env.push(EnvVar::new("HF_HOME=/models", "x"));
        assert!(config.validate().is_err());
    }
}
