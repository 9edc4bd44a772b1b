use {
    crate::error::EntropyUnavailable,
    rand::{TryRngCore, rngs::OsRng},
    secretshare_protocol::{
        OBJECT_ID_LENGTH, ObjectId,
        credentials::{EncryptionKey, KEY_LENGTH},
    },
    sha2::{Digest, Sha256},
    zeroize::Zeroize,
};

/// Generates a fresh key from the operating system's random source and
/// returns it together with its text form.
#[inline]
pub fn generate_key() -> Result<(EncryptionKey, String), EntropyUnavailable> {
    generate_key_with_rng(&mut OsRng)
}

#[inline]
pub fn generate_key_with_rng<R: TryRngCore + ?Sized>(
    rng: &mut R,
) -> Result<(EncryptionKey, String), EntropyUnavailable> {
    let mut bytes = [0; KEY_LENGTH];
    rng.try_fill_bytes(&mut bytes)
        .map_err(EntropyUnavailable::new)?;
    let key = EncryptionKey::from_bytes(bytes);
    bytes.zeroize();
    let human = key.to_human_unmasked();
    Ok((key, human))
}

/// Computes the storage name of the object protected by `key`.
#[must_use]
#[inline]
pub fn derive_id(key: &EncryptionKey) -> ObjectId {
    let digest: [u8; OBJECT_ID_LENGTH] = Sha256::digest(key.as_bytes()).into();
    ObjectId::from_digest(&digest)
}
