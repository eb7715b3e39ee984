use base64::Engine;

use crate::error::{RemoteError, RemoteResult};
use crate::types::FileContent;

/// Decode base64 as delivered by the contents API (wrapped at 60 columns).
pub fn decode_base64(encoded: &str) -> RemoteResult<Vec<u8>> {
    let joined: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(joined.as_bytes())
        .map_err(|e| RemoteError::Decode(format!("base64: {e}")))
}

pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Text means: empty, or valid UTF-8 throughout.
pub fn is_text(bytes: &[u8]) -> bool {
    bytes.is_empty() || std::str::from_utf8(bytes).is_ok()
}

/// Build a [`FileContent`] from an encoded payload.
pub fn file_content_from_base64(path: &str, sha: &str, encoded: &str) -> RemoteResult<FileContent> {
    let bytes = decode_base64(encoded)?;
    Ok(FileContent {
        path: path.to_string(),
        sha: sha.to_string(),
        is_text: is_text(&bytes),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_payload() {
        let bytes = decode_base64("aGVs\nbG8g\nd29y\nbGQ=\n").unwrap();
        assert_eq!(bytes, b"hello world");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode_base64("***"), Err(RemoteError::Decode(_))));
    }

    #[test]
    fn empty_file_is_text() {
        let c = file_content_from_base64("empty.md", "e69de29", "").unwrap();
        assert!(c.is_text);
        assert_eq!(c.text(), Some(""));
    }

    #[test]
    fn invalid_utf8_is_binary() {
        let encoded = encode_base64(&[0x89, 0x50, 0x4e, 0x47, 0xff]);
        let c = file_content_from_base64("logo.png", "abc", &encoded).unwrap();
        assert!(!c.is_text);
    }

    #[test]
    fn multibyte_text_survives() {
        let encoded = encode_base64("笔记 ✓".as_bytes());
        let c = file_content_from_base64("zh.md", "abc", &encoded).unwrap();
        assert_eq!(c.text(), Some("笔记 ✓"));
    }
}
