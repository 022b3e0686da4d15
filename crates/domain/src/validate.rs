//! Field-level validation helpers shared across entities.

use crate::DomainError;

/// Checks that an email address has a plausible `local@domain.tld` shape.
pub fn email(value: &str) -> Result<(), DomainError> {
    let Some((local, domain)) = value.split_once('@') else {
        return Err(DomainError::validation(format!(
            "invalid email address: {value}"
        )));
    };

    if local.is_empty()
        || domain.is_empty()
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || value.contains(char::is_whitespace)
    {
        return Err(DomainError::validation(format!(
            "invalid email address: {value}"
        )));
    }

    Ok(())
}

/// Checks a phone number: optional leading `+`, then 6 to 15 digits once
/// spaces, dots and dashes are stripped.
pub fn phone(value: &str) -> Result<(), DomainError> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-'))
        .collect();
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    if digits.is_empty()
        || !digits.chars().all(|c| c.is_ascii_digit())
        || !(6..=15).contains(&digits.len())
    {
        return Err(DomainError::validation(format!(
            "invalid phone number: {value}"
        )));
    }

    Ok(())
}

/// Checks a postal code: exactly five ASCII digits.
pub fn postal_code(value: &str) -> Result<(), DomainError> {
    if value.len() != 5 || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::validation(format!(
            "invalid postal code: {value} (expected 5 digits)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_emails() {
        assert!(email("alice@example.com").is_ok());
        assert!(email("a.b+c@mail.example.fr").is_ok());
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(email("not-an-email").is_err());
        assert!(email("@example.com").is_err());
        assert!(email("alice@").is_err());
        assert!(email("alice@localhost").is_err());
        assert!(email("alice smith@example.com").is_err());
    }

    #[test]
    fn accepts_phone_formats() {
        assert!(phone("0612345678").is_ok());
        assert!(phone("+33 6 12 34 56 78").is_ok());
        assert!(phone("06.12.34.56.78").is_ok());
    }

    #[test]
    fn rejects_bad_phones() {
        assert!(phone("").is_err());
        assert!(phone("12345").is_err());
        assert!(phone("call-me-maybe").is_err());
    }

    #[test]
    fn postal_code_must_be_five_digits() {
        assert!(postal_code("75001").is_ok());
        assert!(postal_code("7500").is_err());
        assert!(postal_code("750011").is_err());
        assert!(postal_code("7500a").is_err());
    }
}
