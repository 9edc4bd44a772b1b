pub mod credentials;
pub mod encoding;
pub mod endpoints;
pub mod util;

use {
    crate::encoding::{decode_for_human, encode_for_human},
    anyhow::{Error, format_err},
    derive_more::Display,
    serde::{Deserialize, Serialize},
    std::str::FromStr,
};

/// Length of a SHA-256 digest, and therefore of a decoded [`ObjectId`].
pub const OBJECT_ID_LENGTH: usize = 32;

/// Name under which an encrypted file and its metadata are stored.
///
/// Derived from the encryption key with a one-way hash, so the storage server
/// never learns the key even though the receiver can recompute the id from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    #[must_use]
    #[inline]
    pub fn from_digest(digest: &[u8; OBJECT_ID_LENGTH]) -> Self {
        Self(encode_for_human(digest))
    }

    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_for_human(s)?;
        let digest = <[u8; OBJECT_ID_LENGTH]>::try_from(bytes).map_err(|bytes| {
            format_err!(
                "invalid object id length; got {}, expected {OBJECT_ID_LENGTH}",
                bytes.len()
            )
        })?;
        Ok(Self::from_digest(&digest))
    }
}

/// Description of a shared file, stored encrypted next to its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filename: String,
    pub filesize: u64,
}
