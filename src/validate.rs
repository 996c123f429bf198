//! Boundary validation for the three identifier kinds the request handlers accept (`spec.md`
//! §4.4). Validation failures never reach the cache or upstream.

use crate::error::EdgeError;
use std::sync::LazyLock;
use uuid::Uuid;

static USERNAME_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[a-zA-Z0-9_]{2,16}$").expect("valid regex"));

static TEXTURE_ID_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^[a-fA-F0-9]+$").expect("valid regex"));

/// Parses `raw` as a canonical UUID. Any deviation (wrong length, non-hex characters, misplaced
/// hyphens) is reported with the exact body format the client sees (`spec.md` §7).
pub fn parse_uuid(raw: &str) -> Result<Uuid, EdgeError> {
    Uuid::parse_str(raw).map_err(|_| EdgeError::Validation(format!("bad uuid: {raw}")))
}

/// Validates a Minecraft username: `^[a-zA-Z0-9_]{2,16}$`.
pub fn validate_username(raw: &str) -> Result<(), EdgeError> {
    if USERNAME_PATTERN.is_match(raw) {
        Ok(())
    } else {
        Err(EdgeError::Validation(format!("bad username: {raw}")))
    }
}

/// Validates a hex texture id: `^[a-fA-F0-9]+$`.
pub fn validate_texture_id(raw: &str) -> Result<(), EdgeError> {
    if TEXTURE_ID_PATTERN.is_match(raw) {
        Ok(())
    } else {
        Err(EdgeError::Validation(format!("bad texture id: {raw}")))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accepts_canonical_uuid() {
        assert!(parse_uuid("e71be459-ee50-4ec8-93dd-0dfce4a5efd6").is_ok());
    }

    #[test]
    fn rejects_garbage_uuid() {
        let err = parse_uuid("not-a-uuid").unwrap_err();
        assert_eq!("bad uuid: not-a-uuid", err.to_string());
    }

    #[test]
    fn rejects_uuid_wrong_length() {
        assert!(parse_uuid("e71be459-ee50-4ec8-93dd-0dfce4a5efd60").is_err());
        assert!(parse_uuid("e71be459-ee50-4ec8-93dd-0dfce4a5ef").is_err());
    }

    #[test]
    fn username_boundaries() {
        assert!(validate_username("ab").is_ok());
        assert!(validate_username("a").is_err());
        assert!(validate_username("a2345678901234567").is_err());
        assert!(validate_username("bad-name").is_err());
        assert!(validate_username("bad name").is_err());
    }

    #[test]
    fn texture_id_rejects_non_hex() {
        assert!(validate_texture_id("abcdef0123").is_ok());
        assert!(validate_texture_id("zz").is_err());
    }
}
