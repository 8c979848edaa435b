//! Record keys and digests.

use crate::value::signed_byte_array;
use sha2::{Digest, Sha256};
use std::fmt;

/// Size of a record digest in bytes.
pub const DIGEST_SIZE: usize = 20;

/// A user-supplied key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserKey {
    Int(i64),
    String(String),
    Blob(Vec<u8>),
}

impl UserKey {
    /// Particle type tag mixed into the digest.
    fn type_tag(&self) -> u8 {
        match self {
            UserKey::Int(_) => 1,
            UserKey::String(_) => 3,
            UserKey::Blob(_) => 4,
        }
    }

    fn digest_bytes(&self) -> Vec<u8> {
        match self {
            UserKey::Int(v) => v.to_be_bytes().to_vec(),
            UserKey::String(s) => s.as_bytes().to_vec(),
            UserKey::Blob(b) => b.clone(),
        }
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserKey::Int(v) => write!(f, "{}", v),
            UserKey::String(s) => f.write_str(s),
            UserKey::Blob(b) => f.write_str(&signed_byte_array(b)),
        }
    }
}

impl From<&str> for UserKey {
    fn from(v: &str) -> Self {
        UserKey::String(v.to_string())
    }
}

impl From<String> for UserKey {
    fn from(v: String) -> Self {
        UserKey::String(v)
    }
}

impl From<i64> for UserKey {
    fn from(v: i64) -> Self {
        UserKey::Int(v)
    }
}

impl From<Vec<u8>> for UserKey {
    fn from(v: Vec<u8>) -> Self {
        UserKey::Blob(v)
    }
}

/// Identifies a record: namespace, set, and either a user key or only its digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    pub namespace: String,
    pub set_name: String,
    pub user_key: Option<UserKey>,
    pub digest: [u8; DIGEST_SIZE],
}

impl Key {
    /// Builds a key from a user key, computing its digest.
    pub fn new(
        namespace: impl Into<String>,
        set_name: impl Into<String>,
        user_key: impl Into<UserKey>,
    ) -> Self {
        let set_name = set_name.into();
        let user_key = user_key.into();
        let digest = compute_digest(&set_name, &user_key);
        Self {
            namespace: namespace.into(),
            set_name,
            user_key: Some(user_key),
            digest,
        }
    }

    /// Builds a digest-only key.
    pub fn from_digest(
        namespace: impl Into<String>,
        set_name: impl Into<String>,
        digest: [u8; DIGEST_SIZE],
    ) -> Self {
        Self {
            namespace: namespace.into(),
            set_name: set_name.into(),
            user_key: None,
            digest,
        }
    }

    /// Returns a copy of this key without its user key.
    pub fn without_user_key(&self) -> Self {
        Self::from_digest(self.namespace.clone(), self.set_name.clone(), self.digest)
    }
}

/// Computes the record digest from set name and user key.
///
/// The digest only has to be stable and well distributed within one cluster.
pub fn compute_digest(set_name: &str, user_key: &UserKey) -> [u8; DIGEST_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(set_name.as_bytes());
    hasher.update([user_key.type_tag()]);
    hasher.update(user_key.digest_bytes());
    let hash = hasher.finalize();

    let mut digest = [0u8; DIGEST_SIZE];
    digest.copy_from_slice(&hash[..DIGEST_SIZE]);
    digest
}
