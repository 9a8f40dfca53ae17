// Lexical Matcher
// Normalizer + bigrams + scorer behind one handle

use super::ngram::bigrams;
use super::normalizer::TextNormalizer;
use super::scorer::{LexicalScorer, TextFeatures};
use crate::config::{EngineConfig, LexicalWeights, LexiconConfig};
use crate::domain::{DomainError, MatchResult, ScoredJob};
use serde::Serialize;

/// Summary of how a text looks after normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextProfile {
    /// Length of the raw input in characters
    pub text_length: usize,
    pub token_count: usize,
    pub bigram_count: usize,
    /// First tokens in input order
    pub sample_tokens: Vec<String>,
}

/// Deterministic in-process ranking path.
///
/// Immutable after construction, so one instance can be shared across
/// blocking worker threads.
#[derive(Debug, Clone)]
pub struct LexicalMatcher {
    normalizer: TextNormalizer,
    scorer: LexicalScorer,
}

impl LexicalMatcher {
    pub fn new(lexicon: &LexiconConfig, weights: LexicalWeights) -> Result<Self, DomainError> {
        Ok(Self {
            normalizer: TextNormalizer::new(lexicon)?,
            scorer: LexicalScorer::new(weights),
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, DomainError> {
        Self::new(&config.lexicon, config.weights)
    }

    /// Normalize a text and collect its distinct tokens and bigrams
    pub fn features(&self, text: &str) -> TextFeatures {
        let tokens = self.normalizer.normalize(text);
        let pairs = bigrams(&tokens);
        TextFeatures::new(&tokens, &pairs)
    }

    /// Score one job description against one résumé
    pub fn score_pair(&self, resume_text: &str, job_text: &str) -> f64 {
        self.scorer
            .score_features(&self.features(resume_text), &self.features(job_text))
    }

    /// Score a slice of jobs whose first element sits at `offset` in the
    /// caller's full list
    pub fn score_range(
        &self,
        resume: &TextFeatures,
        jobs: &[String],
        offset: usize,
    ) -> Vec<ScoredJob> {
        jobs.iter()
            .enumerate()
            .map(|(i, job)| {
                let score = self.scorer.score_features(resume, &self.features(job));
                ScoredJob::new(offset + i, score)
            })
            .collect()
    }

    /// Rank every job and keep the top `limit`. The résumé is normalized once.
    pub fn rank(&self, resume_text: &str, jobs: &[String], limit: usize) -> MatchResult {
        let resume = self.features(resume_text);
        MatchResult::ranked(self.score_range(&resume, jobs, 0), limit)
    }

    pub fn inspect(&self, text: &str, sample_size: usize) -> TextProfile {
        let tokens = self.normalizer.normalize(text);
        let bigram_count = tokens.len().saturating_sub(1);

        TextProfile {
            text_length: text.chars().count(),
            token_count: tokens.len(),
            bigram_count,
            sample_tokens: tokens.into_iter().take(sample_size).collect(),
        }
    }
}
