// Match Counters
// Degraded mode has to be visible; every fallback is counted by reason.

use crate::port::ScorerError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Why a request fell back to lexical matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Scorer not ready, never started or exited
    Unavailable,
    Timeout,
    Malformed,
    Other,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::Unavailable => "unavailable",
            FallbackReason::Timeout => "timeout",
            FallbackReason::Malformed => "malformed",
            FallbackReason::Other => "other",
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&ScorerError> for FallbackReason {
    fn from(error: &ScorerError) -> Self {
        match error {
            ScorerError::NotReady(_)
            | ScorerError::ProcessExited(_)
            | ScorerError::SpawnFailed(_)
            | ScorerError::StartupFailed(_) => FallbackReason::Unavailable,
            ScorerError::Timeout(_) => FallbackReason::Timeout,
            ScorerError::MalformedResponse(_) => FallbackReason::Malformed,
            ScorerError::Rejected(_) | ScorerError::Io(_) => FallbackReason::Other,
        }
    }
}

/// Process-wide match counters
#[derive(Debug, Default)]
pub struct MatchStats {
    external_matches: AtomicU64,
    lexical_matches: AtomicU64,
    fallback_unavailable: AtomicU64,
    fallback_timeout: AtomicU64,
    fallback_malformed: AtomicU64,
    fallback_other: AtomicU64,
}

/// Point-in-time copy of [`MatchStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub external_matches: u64,
    pub lexical_matches: u64,
    pub fallback_unavailable: u64,
    pub fallback_timeout: u64,
    pub fallback_malformed: u64,
    pub fallback_other: u64,
}

impl StatsSnapshot {
    pub fn total_fallbacks(&self) -> u64 {
        self.fallback_unavailable + self.fallback_timeout + self.fallback_malformed + self.fallback_other
    }
}

impl MatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_external(&self) {
        self.external_matches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lexical(&self) {
        self.lexical_matches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self, reason: FallbackReason) {
        let counter = match reason {
            FallbackReason::Unavailable => &self.fallback_unavailable,
            FallbackReason::Timeout => &self.fallback_timeout,
            FallbackReason::Malformed => &self.fallback_malformed,
            FallbackReason::Other => &self.fallback_other,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            external_matches: self.external_matches.load(Ordering::Relaxed),
            lexical_matches: self.lexical_matches.load(Ordering::Relaxed),
            fallback_unavailable: self.fallback_unavailable.load(Ordering::Relaxed),
            fallback_timeout: self.fallback_timeout.load(Ordering::Relaxed),
            fallback_malformed: self.fallback_malformed.load(Ordering::Relaxed),
            fallback_other: self.fallback_other.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SupervisorState;

    #[test]
    fn test_reason_mapping() {
        let cases = [
            (ScorerError::NotReady(SupervisorState::Failed), FallbackReason::Unavailable),
            (ScorerError::ProcessExited("eof".into()), FallbackReason::Unavailable),
            (ScorerError::Timeout(30_000), FallbackReason::Timeout),
            (ScorerError::MalformedResponse("bad".into()), FallbackReason::Malformed),
            (ScorerError::Rejected("model error".into()), FallbackReason::Other),
        ];
        for (error, expected) in cases {
            assert_eq!(FallbackReason::from(&error), expected, "{}", error);
        }
    }

    #[test]
    fn test_counters_accumulate() {
        let stats = MatchStats::new();
        stats.record_external();
        stats.record_lexical();
        stats.record_lexical();
        stats.record_fallback(FallbackReason::Timeout);
        stats.record_fallback(FallbackReason::Unavailable);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.external_matches, 1);
        assert_eq!(snapshot.lexical_matches, 2);
        assert_eq!(snapshot.fallback_timeout, 1);
        assert_eq!(snapshot.total_fallbacks(), 2);
    }
}
