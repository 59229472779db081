//! Canonical checksum form shared by every metadata source.
//!
//! Checksums are compared as plain strings, so every source must agree on one
//! spelling: `"<algo>:<lowercase hex>"`, e.g. `md5:5d41402abc4b2a76b9719d911017c592`.
//! Providers report MD5 digests as bare hex (`x-checksum-md5`, most ETags),
//! base64 (RFC 1864 `Content-MD5`, `x-goog-hash: md5=...`) or already
//! prefixed (`md5:...` on deposition records); all of these normalize to the
//! same value.

use base64::Engine as _;
use base64::engine::general_purpose;

const MD5_LEN: usize = 16;

/// Formats a raw digest in canonical form.
pub fn format(algorithm: &str, digest: impl AsRef<[u8]>) -> String {
    format!("{algorithm}:{}", hex::encode(digest))
}

/// Brings a provider-reported checksum into canonical form.
///
/// Quotes and weak-validator prefixes are stripped first. Values that are
/// neither recognisably MD5 nor already prefixed (opaque ETags, for example)
/// are returned trimmed but otherwise untouched; they will only ever match
/// themselves.
pub fn normalize(raw: &str) -> String {
    let value = clean(raw);
    if let Some((algorithm, digest)) = value.split_once([':', '='])
        && is_algorithm(algorithm)
    {
        let algorithm = algorithm.to_ascii_lowercase();
        if is_hex(digest) {
            return format!("{algorithm}:{}", digest.to_ascii_lowercase());
        }
        if let Some(bytes) = decode_base64(digest) {
            return format(&algorithm, bytes);
        }
    }
    if is_hex(value) && value.len() == MD5_LEN * 2 {
        return format!("md5:{}", value.to_ascii_lowercase());
    }
    match decode_base64(value) {
        Some(bytes) if bytes.len() == MD5_LEN => format("md5", bytes),
        _ => value.to_string(),
    }
}

fn clean(raw: &str) -> &str {
    let raw = raw.trim();
    raw.strip_prefix("W/").unwrap_or(raw).trim_matches('"').trim()
}

fn is_algorithm(name: &str) -> bool {
    ["md5", "sha1", "sha256", "sha512", "blake3"].iter().any(|known| name.eq_ignore_ascii_case(known))
}

fn is_hex(value: &str) -> bool {
    !value.is_empty() && value.len() % 2 == 0 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn decode_base64(value: &str) -> Option<Vec<u8>> {
    general_purpose::STANDARD.decode(value).ok().filter(|bytes| !bytes.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HELLO: &str = "md5:5d41402abc4b2a76b9719d911017c592";

    #[rstest]
    #[case("5d41402abc4b2a76b9719d911017c592")]
    #[case("5D41402ABC4B2A76B9719D911017C592")]
    #[case("\"5d41402abc4b2a76b9719d911017c592\"")]
    #[case("W/\"5d41402abc4b2a76b9719d911017c592\"")]
    #[case("md5:5d41402abc4b2a76b9719d911017c592")]
    #[case("MD5:5D41402ABC4B2A76B9719D911017C592")]
    #[case("XUFAKrxLKna5cZ2REBfFkg==")]
    #[case("md5=XUFAKrxLKna5cZ2REBfFkg==")]
    fn test_md5_spellings_agree(#[case] raw: &str) {
        assert_eq!(normalize(raw), HELLO);
    }

    #[test]
    fn test_format() {
        assert_eq!(format("md5", md5::compute(b"hello").0), HELLO);
    }

    #[rstest]
    #[case("  \"3858f62230ac3c915f300c664312c63f-2\" ", "3858f62230ac3c915f300c664312c63f-2")]
    #[case("opaque", "opaque")]
    #[case("blake3:ABCDEF", "blake3:abcdef")]
    fn test_other_values(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw), expected);
    }
}
