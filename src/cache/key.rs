use std::fmt;

/// Cache fingerprint: voice tag plus normalized content text.
///
/// Normalization (trim, lower-case) happens only here so reads and writes
/// can never derive different keys for the same content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(voice: &str, text: &str) -> Self {
        Self(format!("{}:{}", voice, text.trim().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
