//! Overlap scorer for normalized text.

use crate::config::LexicalWeights;
use std::collections::HashSet;

/// Distinct tokens and bigrams of one text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextFeatures {
    pub tokens: HashSet<String>,
    pub bigrams: HashSet<String>,
}

impl TextFeatures {
    pub fn new<S: AsRef<str>>(tokens: &[S], bigrams: &[S]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.as_ref().to_string()).collect(),
            bigrams: bigrams.iter().map(|b| b.as_ref().to_string()).collect(),
        }
    }
}

/// Weighted unigram/bigram overlap, scaled to 0..=100
#[derive(Debug, Clone, Copy)]
pub struct LexicalScorer {
    weights: LexicalWeights,
}

impl LexicalScorer {
    pub fn new(weights: LexicalWeights) -> Self {
        Self { weights }
    }

    /// Score a job against a résumé from their token and bigram sequences
    pub fn score<S: AsRef<str>>(
        &self,
        resume_tokens: &[S],
        resume_bigrams: &[S],
        job_tokens: &[S],
        job_bigrams: &[S],
    ) -> f64 {
        let resume = TextFeatures::new(resume_tokens, resume_bigrams);
        let job = TextFeatures::new(job_tokens, job_bigrams);
        self.score_features(&resume, &job)
    }

    /// Score pre-built feature sets (lets callers hash the résumé once)
    pub fn score_features(&self, resume: &TextFeatures, job: &TextFeatures) -> f64 {
        if job.tokens.is_empty() {
            return 0.0;
        }

        let (unigram_ratio, matched) = overlap(&resume.tokens, &job.tokens);
        let (bigram_ratio, _) = overlap(&resume.bigrams, &job.bigrams);

        let overlap_score = self.weights.unigram * unigram_ratio + self.weights.bigram * bigram_ratio;

        // Few shared tokens are weaker evidence than many
        let smoothing = self.weights.evidence_smoothing;
        let evidence = if smoothing > 0.0 {
            matched as f64 / (matched as f64 + smoothing)
        } else {
            1.0
        };

        (overlap_score * evidence * 100.0).clamp(0.0, 100.0)
    }
}

impl Default for LexicalScorer {
    fn default() -> Self {
        Self::new(LexicalWeights::default())
    }
}

/// Share of distinct `job` entries present in `resume`, plus the match count
fn overlap(resume: &HashSet<String>, job: &HashSet<String>) -> (f64, usize) {
    if job.is_empty() {
        return (0.0, 0);
    }
    let matched = job.iter().filter(|entry| resume.contains(*entry)).count();
    (matched as f64 / job.len() as f64, matched)
}
