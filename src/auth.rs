//! RFC 7617 Basic Authentication.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Generate a Basic Auth header value (RFC 7617).
///
/// # Arguments
/// * `username` - The user ID.
/// * `password` - The password.
///
/// # Returns
/// "Basic " followed by base64-encoded credentials.
pub fn basic_auth(username: &str, password: &str) -> String {
    let plain = format!("{}:{}", username, password);
    let encoded = BASE64.encode(plain);
    format!("Basic {}", encoded)
}

/// Parse a Basic Auth header value.
///
/// Returns (username, password) or None if invalid.
pub fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let encoded = header.strip_prefix("Basic ")?.trim();
    let decoded_vec = BASE64.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded_vec).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_encoding_rfc7617_section_2() {
        // "Aladdin" : "open sesame" -> "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ=="
        let header = basic_auth("Aladdin", "open sesame");
        assert_eq!(header, "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    }

    #[test]
    fn test_basic_auth_roundtrip() {
        let header = basic_auth("testuser", "secret123");
        let (user, pass) = parse_basic_auth(&header).unwrap();
        assert_eq!(user, "testuser");
        assert_eq!(pass, "secret123");
    }

    #[test]
    fn test_basic_auth_colon_in_password() {
        let header = basic_auth("admin", "pass:word");
        let (user, pass) = parse_basic_auth(&header).unwrap();
        assert_eq!(user, "admin");
        assert_eq!(pass, "pass:word");
    }

    #[test]
    fn test_parse_rejects_non_basic() {
        assert!(parse_basic_auth("Bearer abc").is_none());
        assert!(parse_basic_auth("Basic !!!not-base64!!!").is_none());
    }
}
