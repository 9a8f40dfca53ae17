//! Text normalizer: lowercase, rewrite, strip, split, filter, stem.
//!
//! Pure and deterministic. The same input and the same [`LexiconConfig`]
//! always produce the same tokens.

use crate::config::LexiconConfig;
use crate::domain::DomainError;
use regex::Regex;
use std::collections::HashSet;

/// Compiled form of a [`LexiconConfig`]
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    rewrites: Vec<(Regex, String)>,
    strip: Regex,
    stop_words: HashSet<String>,
    min_token_len: usize,
    stem_suffixes: Vec<String>,
    protected_terms: HashSet<String>,
}

impl TextNormalizer {
    /// Compile the rewrite table.
    ///
    /// # Errors
    /// - DomainError::InvalidConfig if a rewrite pattern is not a valid regex
    pub fn new(config: &LexiconConfig) -> Result<Self, DomainError> {
        let rewrites = config
            .rewrites
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|re| (re, rule.replacement.clone()))
                    .map_err(|e| {
                        DomainError::InvalidConfig(format!(
                            "rewrite pattern '{}': {}",
                            rule.pattern, e
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let strip = Regex::new(r"[^a-z0-9\s]+")
            .map_err(|e| DomainError::InvalidConfig(e.to_string()))?;

        // Longest suffix first so "ing" wins over "s"-style overlaps
        let mut stem_suffixes = config.stem_suffixes.clone();
        stem_suffixes.sort_by(|a, b| b.len().cmp(&a.len()));

        Ok(Self {
            rewrites,
            strip,
            stop_words: config.stop_words.iter().cloned().collect(),
            min_token_len: config.min_token_len,
            stem_suffixes,
            protected_terms: config.protected_terms.iter().cloned().collect(),
        })
    }

    /// Normalize free text into an ordered token sequence
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let mut buffer = text.to_lowercase();
        for (pattern, replacement) in &self.rewrites {
            buffer = pattern
                .replace_all(&buffer, replacement.as_str())
                .into_owned();
        }

        let cleaned = self.strip.replace_all(&buffer, " ");

        cleaned
            .split_whitespace()
            .filter(|token| token.len() >= self.min_token_len)
            .filter(|token| !self.stop_words.contains(*token))
            .map(|token| self.stem(token))
            .filter(|token| !token.is_empty())
            .collect()
    }

    /// Strip at most one trailing suffix
    pub fn stem(&self, token: &str) -> String {
        if self.protected_terms.contains(token) {
            return token.to_string();
        }
        self.stem_suffixes
            .iter()
            .find_map(|suffix| token.strip_suffix(suffix.as_str()))
            .unwrap_or(token)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewriteRule;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new(&LexiconConfig::default()).unwrap()
    }

    #[test]
    fn test_runtime_name_and_symbols_rewritten_before_strip() {
        let tokens = normalizer().normalize("Node.js developer, C++ and C#");
        assert_eq!(tokens, vec!["nodejs", "developer", "cpp", "csharp"]);
    }

    #[test]
    fn test_runtime_name_variants_collapse() {
        let n = normalizer();
        for variant in ["node.js", "Node JS", "NODEJS", "node  js", "Node.JS"] {
            assert_eq!(n.normalize(variant), vec!["nodejs"], "variant: {}", variant);
        }
    }

    #[test]
    fn test_stop_words_and_short_tokens_removed() {
        let tokens = normalizer().normalize("We are looking for an ML expert with Go and UI skills");
        assert_eq!(tokens, vec!["look", "expert", "skill"]);
    }

    #[test]
    fn test_stemming_single_pass_longest_first() {
        let n = normalizer();
        assert_eq!(n.stem("testing"), "test");
        assert_eq!(n.stem("managed"), "manag");
        assert_eq!(n.stem("apis"), "api");
        assert_eq!(n.stem("things"), "thing");
        assert_eq!(n.stem("process"), "proces");
        assert_eq!(n.stem("rust"), "rust");
    }

    #[test]
    fn test_token_that_stems_to_nothing_is_dropped() {
        assert!(normalizer().normalize("ing").is_empty());
    }

    #[test]
    fn test_empty_input_yields_no_tokens() {
        let n = normalizer();
        assert!(n.normalize("").is_empty());
        assert!(n.normalize("   \n\t").is_empty());
        assert!(n.normalize("!!! ,,, ---").is_empty());
    }

    #[test]
    fn test_punctuation_splits_tokens() {
        let tokens = normalizer().normalize("docker/kubernetes;terraform");
        assert_eq!(tokens, vec!["docker", "kubernete", "terraform"]);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let n = normalizer();
        let text = "Senior Backend Engineer: Node.js, PostgreSQL, Redis, C#, testing & CI/CD pipelines";
        let first = n.normalize(text);
        for _ in 0..10 {
            assert_eq!(n.normalize(text), first);
        }
    }

    #[test]
    fn test_custom_lexicon_fixture() {
        let config = LexiconConfig {
            stop_words: vec!["rust".to_string()],
            rewrites: vec![RewriteRule::new("golang", "go_lang")],
            min_token_len: 2,
            stem_suffixes: vec![],
            protected_terms: vec![],
        };
        let n = TextNormalizer::new(&config).unwrap();

        // underscore is stripped after the rewrite
        assert_eq!(n.normalize("Rust and Golang"), vec!["and", "go", "lang"]);
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let config = LexiconConfig {
            rewrites: vec![RewriteRule::new("[", "x")],
            ..LexiconConfig::default()
        };
        assert!(matches!(
            TextNormalizer::new(&config),
            Err(DomainError::InvalidConfig(_))
        ));
    }
}
