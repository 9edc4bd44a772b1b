//! Every share gets its own random 256-bit key. The key never reaches the
//! server: the sender shows it to the user, and the object is stored under
//! the SHA-256 digest of the key instead, so anyone holding the key can find
//! and decrypt the object while the storage service learns neither.
//!
//! File content and metadata are encrypted separately with AES-256-CBC and
//! PKCS#7 padding, each under a fresh random IV, into an envelope laid out as:
//!
//! - pad length (8 bits) - number of padding bytes the cipher appended, 1 to 16
//! - IV (128 bits)
//! - ciphertext
//!
//! The pad length is redundant with the PKCS#7 padding and is kept for
//! receivers that strip the padding themselves. Decryption checks that the
//! two agree.

mod envelope;
mod keys;

pub use {
    envelope::{BLOCK_LEN, Cipher, Envelope, HEADER_LEN, pad_len},
    keys::{derive_id, generate_key, generate_key_with_rng},
};
