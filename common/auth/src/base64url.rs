//! Unpadded base64url, the alphabet used by every JWT segment.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

pub use base64::DecodeError;

const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes without `=` padding.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    ENGINE.encode(bytes)
}

/// Decode padded or unpadded base64url input.
pub fn decode(input: impl AsRef<[u8]>) -> Result<Vec<u8>, DecodeError> {
    ENGINE.decode(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_strips_padding_and_uses_url_alphabet() {
        assert_eq!(encode(b""), "");
        assert_eq!(encode(b"f"), "Zg");
        assert_eq!(encode(b"fo"), "Zm8");
        assert_eq!(encode(b"hello"), "aGVsbG8");
        assert_eq!(encode([0xfb, 0xff]), "-_8");
    }

    #[test]
    fn decode_accepts_padded_and_unpadded() {
        assert_eq!(decode("Zg").unwrap(), b"f");
        assert_eq!(decode("Zg==").unwrap(), b"f");
        assert_eq!(decode("-_8").unwrap(), vec![0xfb, 0xff]);
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn decode_rejects_standard_alphabet() {
        assert!(decode("+/8").is_err());
        assert!(decode("aGVs bG8").is_err());
    }
}
