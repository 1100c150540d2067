use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const CACHE_PREFIX: &str = "cache/";

/// Hex SHA-256 fingerprint of the inputs that determine a model's output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Location of the entry in the blob store.
    pub fn blob_key(&self) -> String {
        format!("{}{}.json", CACHE_PREFIX, self.0)
    }

    /// Inverse of [`CacheKey::blob_key`].
    pub fn from_blob_key(key: &str) -> Option<Self> {
        let hex = key.strip_prefix(CACHE_PREFIX)?.strip_suffix(".json")?;
        if hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(hex.to_string()))
        } else {
            None
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint `(model, resolved_system_prompt, user_message)`.
///
/// Inputs are hashed byte for byte; no trimming or case folding.
pub fn compute_key(model: &str, resolved_system_prompt: &str, user_message: &str) -> CacheKey {
    let mut h = Sha256::new();
    h.update(model.as_bytes());
    h.update(b"|");
    h.update(resolved_system_prompt.as_bytes());
    h.update(b"|");
    h.update(user_message.as_bytes());
    CacheKey(hex::encode(h.finalize()))
}
