//! Content fingerprints used as cache and dedup keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 of normalized text, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of `text` after [`normalize`].
    ///
    /// ```
    /// use fakecheck_core::Fingerprint;
    ///
    /// let a = Fingerprint::of("Breaking  news:\n the end is near ");
    /// let b = Fingerprint::of("Breaking news: the end is near");
    /// assert_eq!(a, b);
    /// assert_eq!(a.as_str().len(), 64);
    /// ```
    pub fn of(text: &str) -> Self {
        Self::digest(normalize(text).as_bytes())
    }

    /// Order-independent fingerprint of two texts
    pub fn of_pair(a: &str, b: &str) -> Self {
        let (a, b) = (normalize(a), normalize(b));
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        let mut hasher = Sha256::new();
        hasher.update(first.as_bytes());
        // Unit separator keeps ("ab", "c") and ("a", "bc") apart
        hasher.update(b"\x1f");
        hasher.update(second.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    fn digest(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight hex digits, for log lines
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonical form of text for hashing: trimmed, with every whitespace run
/// collapsed to a single space. Case and punctuation are preserved.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-separated word count
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  a\t\tb \n c  "), "a b c");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_case_is_significant() {
        assert_ne!(Fingerprint::of("Alarm"), Fingerprint::of("alarm"));
    }

    #[test]
    fn test_pair_is_order_independent() {
        assert_eq!(Fingerprint::of_pair("x y", "z"), Fingerprint::of_pair("z", " x  y"));
        assert_ne!(Fingerprint::of_pair("ab", "c"), Fingerprint::of_pair("a", "bc"));
    }

    #[test]
    fn test_known_digest() {
        // sha256("abc")
        assert_eq!(
            Fingerprint::of(" abc ").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(Fingerprint::of("abc").short(), "ba7816bf");
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("one  two\nthree"), 3);
        assert_eq!(word_count("   "), 0);
    }
}
