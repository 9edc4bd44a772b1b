//! Text form of keys and object ids.
//!
//! Standard base64 with every `/` replaced by `_` and the `=` padding removed.
//! `/` would split an object id into path components in the storage bucket,
//! and both characters break double-click selection when a key is pasted
//! into a terminal or a chat message. `+` is left as is.

use base64::{
    DecodeError, Engine, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};

const UNPADDED_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encodes `bytes` into the copy-paste friendly form.
#[must_use]
#[inline]
pub fn encode_for_human(bytes: &[u8]) -> String {
    UNPADDED_STANDARD.encode(bytes).replace('/', "_")
}

/// Reverses [`encode_for_human`].
///
/// Surrounding whitespace and trailing `=` padding are tolerated, since both
/// tend to sneak in when a key travels through a chat client.
#[inline]
pub fn decode_for_human(text: &str) -> Result<Vec<u8>, DecodeError> {
    UNPADDED_STANDARD.decode(text.trim().replace('_', "/"))
}
