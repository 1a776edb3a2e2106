use common_http_errors::ApiError;

pub const MAX_USERNAME_LEN: usize = 32;
pub const MAX_GROUP_LEN: usize = 64;
pub const MIN_PASSWORD_LEN: usize = 8;
/// Bounds the argon2 input.
pub const MAX_PASSWORD_LEN: usize = 1024;
pub const MAX_MESSAGE_LEN: usize = 4096;

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

fn valid_name(value: &str, max: usize) -> bool {
    !value.is_empty() && value.len() <= max && value.chars().all(is_name_char)
}

pub fn username(value: &str) -> Result<(), ApiError> {
    if valid_name(value, MAX_USERNAME_LEN) {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            "invalid_username",
            format!("username must be 1-{MAX_USERNAME_LEN} characters of A-Z a-z 0-9 _ . -"),
        ))
    }
}

pub fn group(value: &str) -> Result<(), ApiError> {
    if valid_name(value, MAX_GROUP_LEN) {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            "invalid_group",
            format!("group must be 1-{MAX_GROUP_LEN} characters of A-Z a-z 0-9 _ . -"),
        ))
    }
}

pub fn password(value: &str) -> Result<(), ApiError> {
    let len = value.chars().count();
    if (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            "invalid_password",
            format!("password must be {MIN_PASSWORD_LEN}-{MAX_PASSWORD_LEN} characters"),
        ))
    }
}

/// Returns the trimmed text.
pub fn message_text(value: &str) -> Result<&str, ApiError> {
    let text = value.trim();
    let len = text.chars().count();
    if (1..=MAX_MESSAGE_LEN).contains(&len) {
        Ok(text)
    } else {
        Err(ApiError::bad_request(
            "invalid_text",
            format!("text must be 1-{MAX_MESSAGE_LEN} characters"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(username("ada.lovelace_1-x").is_ok());
        assert!(username(&"a".repeat(32)).is_ok());
        assert!(username("").is_err());
        assert!(username(&"a".repeat(33)).is_err());
        assert!(username("ada lovelace").is_err());
        assert!(username("ada:admin").is_err());
        assert!(username("ädä").is_err());
    }

    #[test]
    fn groups_allow_longer_names() {
        assert!(group(&"g".repeat(64)).is_ok());
        assert!(group(&"g".repeat(65)).is_err());
        assert!(group("rust/async").is_err());
    }

    #[test]
    fn passwords_need_eight_characters() {
        assert!(password("1234567").is_err());
        assert!(password("12345678").is_ok());
    }

    #[test]
    fn message_text_is_trimmed() {
        assert_eq!(message_text("  hello \n").unwrap(), "hello");
        assert!(message_text("   ").is_err());
        assert!(message_text(&"x".repeat(4096)).is_ok());
        assert!(message_text(&"x".repeat(4097)).is_err());
    }
}
