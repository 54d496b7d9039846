//! Cache entry key generation.
//!
//! Entries are keyed by request URL with the fragment removed, the same way
//! the browser Cache API matches requests.

use sha2::{Digest, Sha256};
use url::Url;

/// URL under which a request is stored: the full URL without its fragment.
pub fn entry_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}

/// Compute the key hash for a cache entry.
pub fn compute_cache_key(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entry_url(url).as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_cache_key(&url("https://example.com/styles/app.css"));
        let hash2 = compute_cache_key(&url("https://example.com/styles/app.css"));
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_ignores_fragment() {
        let plain = compute_cache_key(&url("https://example.com/glossary"));
        let with_fragment = compute_cache_key(&url("https://example.com/glossary#regression"));
        assert_eq!(plain, with_fragment);
    }

    #[test]
    fn test_hash_keeps_query() {
        let a = compute_cache_key(&url("https://example.com/api/data.json?page=1"));
        let b = compute_cache_key(&url("https://example.com/api/data.json?page=2"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_cache_key(&url("https://example.com/"));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_entry_url() {
        assert_eq!(entry_url(&url("https://example.com/quiz#q3")), "https://example.com/quiz");
    }
}
