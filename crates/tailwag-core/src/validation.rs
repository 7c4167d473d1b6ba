//! # Input Validation
//!
//! Validation helpers applied at the edge, before any side effect runs.
//! Each returns `Result<(), ValidationError>` (or the normalized value) so
//! call sites can `?` straight through.

use crate::error::ValidationError;

/// Maximum SKU length.
pub const MAX_SKU_LENGTH: usize = 64;

/// Maximum discount code length.
pub const MAX_CODE_LENGTH: usize = 32;

/// Maximum line-item quantity per order.
pub const MAX_QUANTITY: i64 = 1_000;

/// Validates a SKU: required, bounded, no whitespace.
pub fn validate_sku(sku: &str) -> Result<(), ValidationError> {
    let trimmed = sku.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }
    if trimmed.len() > MAX_SKU_LENGTH {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: MAX_SKU_LENGTH,
        });
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }
    Ok(())
}

/// Validates an order/adjustment quantity.
pub fn validate_quantity(quantity: i64) -> Result<(), ValidationError> {
    if quantity < 1 || quantity > MAX_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_QUANTITY,
        });
    }
    Ok(())
}

/// Validates that a money amount (in cents) is strictly positive.
///
/// Used for charge amounts; refunds and ledger deltas go through their own
/// paths and may be negative.
pub fn validate_positive_amount(field: &str, cents: i64) -> Result<(), ValidationError> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates and normalizes a 2-letter US state code to upper-case.
pub fn normalize_state_code(state: &str) -> Result<String, ValidationError> {
    let trimmed = state.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "state".to_string(),
        });
    }
    if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            field: "state".to_string(),
            reason: "expected a 2-letter state code".to_string(),
        });
    }
    Ok(trimmed.to_uppercase())
}

/// Validates and normalizes a discount code to its canonical upper-case
/// form. Codes are stored and looked up in this form, so "welcome15" and
/// "WELCOME15" are the same code.
pub fn normalize_discount_code(code: &str) -> Result<String, ValidationError> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }
    if trimmed.len() > MAX_CODE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LENGTH,
        });
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "only letters, digits, '-' and '_' allowed".to_string(),
        });
    }
    Ok(trimmed.to_uppercase())
}

/// Validates that a string parses as a UUID.
pub fn validate_uuid(field: &str, value: &str) -> Result<(), ValidationError> {
    uuid::Uuid::parse_str(value).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "expected a UUID".to_string(),
    })?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("CHKN-BOWL-5LB").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("HAS SPACE").is_err());
        assert!(validate_sku(&"X".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(1_000).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(1_001).is_err());
    }

    #[test]
    fn test_validate_positive_amount() {
        assert!(validate_positive_amount("amount", 1).is_ok());
        assert!(validate_positive_amount("amount", 0).is_err());
        assert!(validate_positive_amount("amount", -500).is_err());
    }

    #[test]
    fn test_normalize_state_code() {
        assert_eq!(normalize_state_code("nc").unwrap(), "NC");
        assert_eq!(normalize_state_code(" Ca ").unwrap(), "CA");
        assert!(normalize_state_code("").is_err());
        assert!(normalize_state_code("NCX").is_err());
        assert!(normalize_state_code("N1").is_err());
    }

    #[test]
    fn test_normalize_discount_code() {
        assert_eq!(normalize_discount_code("welcome15").unwrap(), "WELCOME15");
        assert_eq!(normalize_discount_code(" Save-10 ").unwrap(), "SAVE-10");
        assert!(normalize_discount_code("").is_err());
        assert!(normalize_discount_code("BAD CODE").is_err());
        assert!(normalize_discount_code(&"A".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("variant_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("variant_id", "not-a-uuid").is_err());
    }
}
