//! Small shared helpers for cache naming and list handling.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha1::{Digest, Sha1};

/// Encode the SHA-1 digest of `input` as URL-safe base64 without padding.
///
/// The result is deterministic and filesystem-safe, which makes it suitable
/// for deriving per-URL cache directory names.
pub fn encode_base64_sha1(input: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha1::digest(input.as_bytes()))
}

/// Remove duplicates from `items`, keeping the first occurrence of each value.
pub fn dedup_preserving_order<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
