//! Adjacent-token bigrams.

/// Space-joined pairs `tokens[i] tokens[i+1]`, in order.
///
/// Empty and single-token input yields no bigrams.
pub fn bigrams<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    tokens
        .windows(2)
        .map(|pair| format!("{} {}", pair[0].as_ref(), pair[1].as_ref()))
        .collect()
}
