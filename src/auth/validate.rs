use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ApiError;

const PASSWORD_SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:'\",.<>?/";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Registration-strength policy, shared with the reset and change flows.
pub(crate) fn validate_password_strength(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < 8 {
        return Err(ApiError::InvalidInput(
            "Password must be at least 8 characters long".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ApiError::InvalidInput(
            "Password must contain an uppercase letter".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ApiError::InvalidInput(
            "Password must contain a lowercase letter".into(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::InvalidInput(
            "Password must contain a digit".into(),
        ));
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        return Err(ApiError::InvalidInput(
            "Password must contain a special character".into(),
        ));
    }
    Ok(())
}

/// Strips formatting characters and checks the remaining digit count.
pub(crate) fn validate_phone(phone: &str) -> Result<(), ApiError> {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if digits < 10 {
        return Err(ApiError::InvalidInput(
            "Phone number must contain at least 10 digits".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_emails() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last@clinic.example.org"));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("two@@signs.com"));
        assert!(!is_valid_email("spa ce@x.com"));
    }

    #[test]
    fn password_policy_rejects_short() {
        // Scenario A: 7 characters fails on length before anything else.
        let err = validate_password_strength("Weak1!a").unwrap_err();
        assert!(err.to_string().contains("at least 8"));
    }

    #[test]
    fn password_policy_requires_each_class() {
        assert!(validate_password_strength("alllower1!").is_err());
        assert!(validate_password_strength("ALLUPPER1!").is_err());
        assert!(validate_password_strength("NoDigits!!").is_err());
        assert!(validate_password_strength("NoSymbol11").is_err());
        assert!(validate_password_strength("Str0ng!Pw").is_ok());
    }

    #[test]
    fn password_length_counts_characters_not_bytes() {
        // Six characters but nine bytes; must still fail the length rule.
        let err = validate_password_strength("Pä1!ßÖ").unwrap_err();
        assert!(err.to_string().contains("at least 8"));
        assert!(validate_password_strength("Päßwörd1!").is_ok());
    }

    #[test]
    fn phone_is_counted_by_digits_only() {
        assert!(validate_phone("(555) 123-4567").is_ok());
        assert!(validate_phone("+1 555 123 4567").is_ok());
        assert!(validate_phone("123-456").is_err());
    }
}
