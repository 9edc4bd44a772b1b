use {
    crate::error::{EntropyUnavailable, EnvelopeError},
    aes::{
        Aes256,
        cipher::{BlockDecryptMut, BlockEncryptMut, InnerIvInit, KeyInit, block_padding::Pkcs7},
    },
    rand::TryRngCore,
    secretshare_protocol::credentials::EncryptionKey,
    std::fmt,
};

/// AES block size, which is also the IV size.
pub const BLOCK_LEN: usize = 16;
/// Pad length byte followed by the IV.
pub const HEADER_LEN: usize = 1 + BLOCK_LEN;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Number of padding bytes PKCS#7 appends to a plaintext of the given length.
///
/// Always in `1..=16`: a plaintext that is already block aligned gets a whole
/// block of padding.
#[must_use]
#[inline]
pub fn pad_len(plaintext_len: usize) -> u8 {
    let tail = plaintext_len % BLOCK_LEN;
    u8::try_from(BLOCK_LEN - tail).unwrap_or(u8::MAX)
}

/// A parsed encrypted blob.
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope {
    pad_len: u8,
    iv: [u8; BLOCK_LEN],
    ciphertext: Vec<u8>,
}

impl Envelope {
    #[must_use]
    #[inline]
    pub fn pad_len(&self) -> u8 {
        self.pad_len
    }

    #[must_use]
    #[inline]
    pub fn iv(&self) -> &[u8; BLOCK_LEN] {
        &self.iv
    }

    #[must_use]
    #[inline]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    #[must_use]
    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN.saturating_add(self.ciphertext.len()));
        bytes.push(self.pad_len);
        bytes.extend_from_slice(&self.iv);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Splits raw bytes into header fields. Only the length is checked here;
    /// everything else is checked by [`Cipher::open`].
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let too_short = EnvelopeError::TooShort { len: bytes.len() };
        if bytes.len() < HEADER_LEN {
            return Err(too_short);
        }
        let (&pad_len, rest) = bytes.split_first().ok_or(too_short)?;
        let (iv, ciphertext) = rest.split_first_chunk::<BLOCK_LEN>().ok_or(too_short)?;
        Ok(Self {
            pad_len,
            iv: *iv,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

impl fmt::Debug for Envelope {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("pad_len", &self.pad_len)
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

/// Encrypts and decrypts envelopes under one key.
pub struct Cipher {
    inner: Aes256,
}

impl Cipher {
    #[must_use]
    #[inline]
    pub fn new(key: &EncryptionKey) -> Self {
        Self {
            inner: Aes256::new(key.as_bytes().into()),
        }
    }

    /// Encrypts `plaintext` under a fresh IV drawn from `rng`.
    #[inline]
    pub fn seal<R: TryRngCore + ?Sized>(
        &self,
        plaintext: &[u8],
        rng: &mut R,
    ) -> Result<Envelope, EntropyUnavailable> {
        let mut iv = [0; BLOCK_LEN];
        rng.try_fill_bytes(&mut iv)
            .map_err(EntropyUnavailable::new)?;
        Ok(self.seal_with_iv(plaintext, iv))
    }

    fn seal_with_iv(&self, plaintext: &[u8], iv: [u8; BLOCK_LEN]) -> Envelope {
        let ciphertext = Aes256CbcEnc::inner_iv_init(self.inner.clone(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
        Envelope {
            pad_len: pad_len(plaintext.len()),
            iv,
            ciphertext,
        }
    }

    #[inline]
    pub fn open(&self, envelope: &Envelope) -> Result<Vec<u8>, EnvelopeError> {
        let pad = usize::from(envelope.pad_len);
        if !(1..=BLOCK_LEN).contains(&pad) {
            return Err(EnvelopeError::Corrupt("pad length out of range"));
        }
        if envelope.ciphertext.is_empty() || envelope.ciphertext.len() % BLOCK_LEN != 0 {
            return Err(EnvelopeError::Corrupt(
                "ciphertext is not a whole number of blocks",
            ));
        }
        let plaintext = Aes256CbcDec::inner_iv_init(self.inner.clone(), &envelope.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&envelope.ciphertext)
            .map_err(|_unpad| EnvelopeError::DecryptionFailed)?;
        if plaintext.len().saturating_add(pad) % BLOCK_LEN != 0 {
            return Err(EnvelopeError::Corrupt(
                "pad length does not match decrypted data",
            ));
        }
        Ok(plaintext)
    }

    /// Encrypts `plaintext` into the serialized envelope form.
    #[inline]
    pub fn encode<R: TryRngCore + ?Sized>(
        &self,
        plaintext: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>, EntropyUnavailable> {
        Ok(self.seal(plaintext, rng)?.to_bytes())
    }

    #[inline]
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        self.open(&Envelope::from_bytes(bytes)?)
    }
}

impl fmt::Debug for Cipher {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, clippy::indexing_slicing, reason = "test")]
mod tests {
    use {
        super::*,
        crate::testing::{BrokenRng, ZeroRng},
        aes::cipher::{KeyIvInit, block_padding::NoPadding},
        rand::{Rng, SeedableRng, rngs::StdRng},
    };

    const EMPTY_CIPHERTEXT: [u8; 16] = [
        0x1f, 0x78, 0x8f, 0xe6, 0xd8, 0x6c, 0x31, 0x75, 0x49, 0x69, 0x7f, 0xbf, 0x0c, 0x07, 0xfa,
        0x43,
    ];

    fn zero_cipher() -> Cipher {
        Cipher::new(&EncryptionKey::from_bytes([0; 32]))
    }

    #[test]
    fn pad_len_bounds() {
        assert_eq!(pad_len(0), 16);
        assert_eq!(pad_len(1), 15);
        assert_eq!(pad_len(15), 1);
        assert_eq!(pad_len(16), 16);
        assert_eq!(pad_len(17), 15);
        for len in 0..=100_usize {
            let pad = usize::from(pad_len(len));
            assert!((1..=16).contains(&pad), "{len}: {pad}");
            assert_eq!((len + pad) % 16, 0, "{len}");
        }
    }

    #[test]
    fn known_answers() {
        let cipher = zero_cipher();
        assert_eq!(
            cipher.seal_with_iv(b"", [0; 16]).ciphertext(),
            EMPTY_CIPHERTEXT
        );
        assert_eq!(
            cipher.seal_with_iv(b"a", [0; 16]).ciphertext(),
            [
                0xb4, 0xa5, 0xe9, 0x8a, 0xf6, 0x81, 0x0a, 0x83, 0xbd, 0xf5, 0x2b, 0x14, 0xae, 0x82,
                0x2c, 0x37,
            ]
        );
        assert_eq!(
            cipher.seal_with_iv(&[b'a'; 16], [0; 16]).ciphertext(),
            [
                0x98, 0x4c, 0x52, 0x6a, 0x73, 0x35, 0xb5, 0x5c, 0x84, 0x57, 0x58, 0x63, 0x4a, 0xa0,
                0x65, 0x4d, 0x38, 0xbf, 0xbe, 0x21, 0x6a, 0x20, 0x6c, 0xc9, 0x1a, 0xca, 0xe0, 0xe3,
                0xca, 0xc2, 0x0e, 0x44,
            ]
        );
    }

    #[test]
    fn layout() {
        let cipher = zero_cipher();
        let bytes = cipher.encode(b"", &mut ZeroRng).unwrap();
        assert_eq!(bytes.len(), 33);
        assert_eq!(bytes[0], 16);
        assert_eq!(bytes[1..17], [0; 16]);
        assert_eq!(bytes[17..], EMPTY_CIPHERTEXT);

        let mut rng = StdRng::seed_from_u64(1);
        for len in [0, 1, 15, 16, 17, 1000] {
            let plaintext = vec![7; len];
            let envelope = cipher.seal(&plaintext, &mut rng).unwrap();
            let bytes = envelope.to_bytes();
            assert_eq!(bytes.len(), HEADER_LEN + envelope.ciphertext().len());
            assert_eq!(bytes[0], pad_len(len));
            assert_eq!(&bytes[1..17], envelope.iv());
            assert_eq!(envelope.ciphertext().len(), len + usize::from(pad_len(len)));
            assert_eq!(Envelope::from_bytes(&bytes).unwrap(), envelope);
        }
    }

    #[test]
    fn roundtrip() {
        let mut rng = StdRng::seed_from_u64(2);
        let key = EncryptionKey::from_bytes(rng.random());
        let cipher = Cipher::new(&key);
        for len in [0, 1, 15, 16, 17, 1000] {
            let mut plaintext = vec![0; len];
            rng.fill(plaintext.as_mut_slice());
            let bytes = cipher.encode(&plaintext, &mut rng).unwrap();
            assert_eq!(cipher.decode(&bytes).unwrap(), plaintext);
        }
    }

    #[test]
    fn fresh_iv_per_envelope() {
        let cipher = zero_cipher();
        let mut rng = StdRng::seed_from_u64(3);
        let first = cipher.seal(b"same", &mut rng).unwrap();
        let second = cipher.seal(b"same", &mut rng).unwrap();
        assert_ne!(first.iv(), second.iv());
        assert_ne!(first.ciphertext(), second.ciphertext());
    }

    #[test]
    fn stripping_pad_len_bytes_recovers_plaintext() {
        let key = EncryptionKey::from_bytes([9; 32]);
        let cipher = Cipher::new(&key);
        let mut rng = StdRng::seed_from_u64(4);
        for len in [0, 5, 16, 33] {
            let plaintext = vec![b'x'; len];
            let envelope = cipher.seal(&plaintext, &mut rng).unwrap();
            let mut raw = Aes256CbcDec::new(key.as_bytes().into(), envelope.iv().into())
                .decrypt_padded_vec_mut::<NoPadding>(envelope.ciphertext())
                .unwrap();
            raw.truncate(raw.len() - usize::from(envelope.pad_len()));
            assert_eq!(raw, plaintext);
        }
    }

    #[test]
    fn too_short() {
        let cipher = zero_cipher();
        assert_eq!(
            cipher.decode(&[]).unwrap_err(),
            EnvelopeError::TooShort { len: 0 }
        );
        assert_eq!(
            cipher.decode(&[16; 16]).unwrap_err(),
            EnvelopeError::TooShort { len: 16 }
        );
        // Header without ciphertext.
        assert!(matches!(
            cipher.decode(&[16; 17]).unwrap_err(),
            EnvelopeError::Corrupt(_)
        ));
    }

    #[test]
    fn tampered_pad_len() {
        let cipher = zero_cipher();
        let mut bytes = cipher.encode(b"hello", &mut ZeroRng).unwrap();
        assert_eq!(bytes[0], 11);

        bytes[0] = 3;
        assert!(matches!(
            cipher.decode(&bytes).unwrap_err(),
            EnvelopeError::Corrupt(_)
        ));
        bytes[0] = 0;
        assert!(matches!(
            cipher.decode(&bytes).unwrap_err(),
            EnvelopeError::Corrupt(_)
        ));
        bytes[0] = 200;
        assert!(matches!(
            cipher.decode(&bytes).unwrap_err(),
            EnvelopeError::Corrupt(_)
        ));
        bytes[0] = 11;
        assert_eq!(cipher.decode(&bytes).unwrap(), b"hello");
    }

    #[test]
    fn truncated_ciphertext() {
        let cipher = zero_cipher();
        let bytes = cipher.encode(&[1; 40], &mut ZeroRng).unwrap();
        assert!(matches!(
            cipher.decode(&bytes[..bytes.len() - 1]).unwrap_err(),
            EnvelopeError::Corrupt(_)
        ));
    }

    #[test]
    fn wrong_key() {
        let bytes = zero_cipher().encode(b"hello", &mut ZeroRng).unwrap();
        let other = Cipher::new(&EncryptionKey::from_bytes([1; 32]));
        assert_eq!(
            other.decode(&bytes).unwrap_err(),
            EnvelopeError::DecryptionFailed
        );
    }

    #[test]
    fn tampered_ciphertext() {
        let cipher = zero_cipher();
        let mut bytes = cipher.encode(&[7; 16], &mut ZeroRng).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 2 * BLOCK_LEN);
        // Turns the last byte of the padding block from 16 into 17.
        bytes[HEADER_LEN + BLOCK_LEN - 1] ^= 1;
        assert_eq!(
            cipher.decode(&bytes).unwrap_err(),
            EnvelopeError::DecryptionFailed
        );
    }

    #[test]
    fn iv_entropy_failure() {
        let err = zero_cipher().encode(b"hello", &mut BrokenRng).unwrap_err();
        assert!(err.to_string().contains("unavailable"), "{err}");
    }
}
