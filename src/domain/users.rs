//! Username rules.

use super::error::DomainError;

pub const MAX_USERNAME_LEN: usize = 150;

/// Usernames are 1-150 characters of letters, digits and `_.@+-`.
pub fn validate_username(raw: &str) -> Result<String, DomainError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(DomainError::validation("username", "this field is required"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(DomainError::validation(
            "username",
            format!("must be at most {MAX_USERNAME_LEN} characters"),
        ));
    }
    if !username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '.' | '@' | '+' | '-'))
    {
        return Err(DomainError::validation(
            "username",
            "may contain only letters, digits and _.@+- characters",
        ));
    }
    if username.chars().all(|ch| ch == '.') {
        return Err(DomainError::validation(
            "username",
            "may not consist only of dots",
        ));
    }
    Ok(username.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_usernames() {
        assert_eq!(validate_username("post_author_user").unwrap(), "post_author_user");
        assert_eq!(validate_username(" leo.t+blog@x ").unwrap(), "leo.t+blog@x");
    }

    #[test]
    fn rejects_invalid_usernames() {
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("slash/user").is_err());
        assert!(validate_username(&"u".repeat(151)).is_err());
        assert!(validate_username(".").is_err());
        assert!(validate_username("..").is_err());
        assert!(validate_username(" ... ").is_err());
        assert_eq!(validate_username("a.b").unwrap(), "a.b");
    }
}
