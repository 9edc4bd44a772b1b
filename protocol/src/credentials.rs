use {
    crate::encoding::{decode_for_human, encode_for_human},
    anyhow::{Error, bail, ensure, format_err},
    serde::{Deserialize, Deserializer, Serialize, de},
    std::{
        borrow::Cow,
        fmt::{self, Debug},
        str::FromStr,
    },
    zeroize::Zeroize,
};

/// Length of an [`EncryptionKey`] in bytes (AES-256).
pub const KEY_LENGTH: usize = 32;

/// Shared secret that the sender gives to the secretshare server to be allowed
/// to upload.
///
/// It is configured by the server operator and distributed out of band.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AuthKey(String);

impl AuthKey {
    #[must_use]
    #[inline]
    pub fn as_unmasked_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AuthKey {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ensure!(!s.is_empty(), "auth key cannot be empty");
        if let Some(c) = s.chars().find(|c| c.is_whitespace() || c.is_control()) {
            bail!("auth key contains invalid character {c:?}");
        }
        Ok(Self(s.to_owned()))
    }
}

impl<'de> Deserialize<'de> for AuthKey {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Cow::<'_, str>::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

impl Debug for AuthKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthKey").finish()
    }
}

/// Symmetric key protecting one shared file and its metadata.
///
/// A fresh key is generated for every share. The bytes are wiped when the
/// key is dropped, and `Debug` never prints them.
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_LENGTH]);

impl EncryptionKey {
    #[must_use]
    #[inline]
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    #[must_use]
    #[inline]
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    /// Returns the text form that the receiver has to type in.
    #[must_use]
    #[inline]
    pub fn to_human_unmasked(&self) -> String {
        encode_for_human(&self.0)
    }
}

impl FromStr for EncryptionKey {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = decode_for_human(s)?;
        let key = <[u8; KEY_LENGTH]>::try_from(bytes.as_slice()).map_err(|_len| {
            format_err!("invalid length; got {}, expected {KEY_LENGTH}", bytes.len())
        });
        bytes.zeroize();
        Ok(Self(key?))
    }
}

impl Drop for EncryptionKey {
    #[inline]
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl Debug for EncryptionKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey").finish()
    }
}
