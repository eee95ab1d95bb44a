//! Field validation shared by every record type.

/// Longest accepted identifier.
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Trim and validate an identifier such as a wallet or transaction id.
///
/// Accepts 1..=128 ASCII alphanumerics plus `-`, `_`, `:` and `.`.
pub fn validate_identifier(field: &str, value: &str) -> Result<String, String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(format!("{} is required", field));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(format!(
            "{} must be at most {} characters",
            field, MAX_IDENTIFIER_LEN
        ));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')))
    {
        return Err(format!("{} contains invalid character '{}'", field, bad));
    }

    Ok(value.to_string())
}

/// Validate an amount that must be finite and strictly positive.
pub fn validate_positive_amount(field: &str, amount: f64) -> Result<f64, String> {
    if !amount.is_finite() {
        return Err(format!("{} must be a finite number", field));
    }
    if amount <= 0.0 {
        return Err(format!("{} must be greater than zero", field));
    }
    Ok(amount)
}

/// Validate an amount that must be finite and not negative.
pub fn validate_non_negative_amount(field: &str, amount: f64) -> Result<f64, String> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("{} must be a finite, non-negative number", field));
    }
    Ok(amount)
}

/// Trim a required free-text field.
pub fn require_text(field: &str, value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(value.to_string())
}

/// Trim an optional free-text field, mapping blank strings to `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_trimmed() {
        assert_eq!(
            validate_identifier("wallet_id", "  w-123 ").unwrap(),
            "w-123"
        );
        assert!(validate_identifier("wallet_id", "0x9fA1:main.net_2").is_ok());
    }

    #[test]
    fn test_identifier_rejects_bad_input() {
        assert!(validate_identifier("wallet_id", "").is_err());
        assert!(validate_identifier("wallet_id", "   ").is_err());
        assert!(validate_identifier("wallet_id", "a/b").is_err());
        assert!(validate_identifier("wallet_id", "drop table;").is_err());
        assert!(validate_identifier("wallet_id", &"x".repeat(129)).is_err());
        assert!(validate_identifier("wallet_id", &"x".repeat(128)).is_ok());
    }

    #[test]
    fn test_amounts() {
        assert!(validate_positive_amount("amount", 10.5).is_ok());
        assert!(validate_positive_amount("amount", 0.0).is_err());
        assert!(validate_positive_amount("amount", -1.0).is_err());
        assert!(validate_positive_amount("amount", f64::NAN).is_err());
        assert!(validate_non_negative_amount("amount", 0.0).is_ok());
        assert!(validate_non_negative_amount("amount", f64::INFINITY).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text(Some("  ".to_string())), None);
        assert_eq!(optional_text(Some(" cafe ".to_string())), Some("cafe".to_string()));
        assert_eq!(optional_text(None), None);
    }
}
