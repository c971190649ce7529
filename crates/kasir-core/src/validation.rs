//! # Validation Module
//!
//! Input validation utilities for Kasir POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (HTTP / UI, outside this workspace)                   │
//! │  ├── Deserialization into NewItem, SaleLine, ...                       │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: kasir-core                                                   │
//! │  └── THIS MODULE: field rules before an entity is constructed          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE barcode / username / transaction_number                    │
//! │  └── CHECK (stock_quantity >= 0)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kasir_core::validation::{validate_barcode, validate_quantity};
//!
//! validate_barcode("A1B2C3D4E5").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::MAX_BARCODE_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Fails with `Required` if `value` is blank.
pub fn require(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Length check on the trimmed value, counted in characters.
fn check_length(field: &str, value: &str, min: usize, max: usize) -> ValidationResult<()> {
    let len = value.trim().chars().count();

    if min > 0 && len == 0 {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if len < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }
    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates an item barcode.
///
/// ## Rules
/// - Must not be empty
/// - At most 20 characters
/// - Only uppercase ASCII letters and digits (generated barcodes are
///   drawn from the same alphabet)
///
/// ## Example
/// ```rust
/// use kasir_core::validation::validate_barcode;
///
/// assert!(validate_barcode("8991234567890").is_ok());
/// assert!(validate_barcode("").is_err());
/// assert!(validate_barcode("abc-123").is_err());
/// ```
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    check_length("barcode", barcode, 1, MAX_BARCODE_LENGTH)?;

    if !barcode
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only uppercase letters and digits".to_string(),
        });
    }

    Ok(())
}

/// Validates an item name (1-200 characters).
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    check_length("name", name, 1, 200)
}

/// Validates a username (1-50 characters, no whitespace).
pub fn validate_username(username: &str) -> ValidationResult<()> {
    check_length("username", username, 1, 50)?;

    if username.trim().chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }
    Ok(())
}

/// Validates a user's display name (1-100 characters).
pub fn validate_full_name(full_name: &str) -> ValidationResult<()> {
    check_length("full_name", full_name, 1, 100)
}

/// Validates a plaintext password before hashing (6-100 characters).
pub fn validate_password(password: &str) -> ValidationResult<()> {
    check_length("password", password, 6, 100)
}

pub fn validate_category_name(name: &str) -> ValidationResult<()> {
    check_length("category name", name, 1, 100)
}

/// Optional free text, at most 500 characters.
pub fn validate_description(description: &str) -> ValidationResult<()> {
    check_length("description", description, 0, 500)
}

/// Reason attached to a manual stock movement (1-200 characters).
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    check_length("reason", reason, 1, 200)
}

/// Optional transaction notes, at most 500 characters.
pub fn validate_notes(notes: &str) -> ValidationResult<()> {
    check_length("notes", notes, 0, 500)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale quantity.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cashier enters quantity: 5                                             │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       └── OK → add_line                                                │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a price. Zero is allowed (free items).
///
/// ## Example
/// ```rust
/// use kasir_core::money::Money;
/// use kasir_core::validation::validate_price;
///
/// assert!(validate_price("price", Money::from_cents(1099)).is_ok());
/// assert!(validate_price("price", Money::zero()).is_ok());
/// assert!(validate_price("price", Money::from_cents(-100)).is_err());
/// ```
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Units per wholesale pack must be at least 1.
pub fn validate_quantity_per_wholesale(qpw: i64) -> ValidationResult<()> {
    if qpw < 1 {
        return Err(ValidationError::OutOfRange {
            field: "quantity_per_wholesale".to_string(),
            min: 1,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Stock levels and thresholds are never negative.
pub fn validate_stock_level(field: &str, level: i64) -> ValidationResult<()> {
    if level < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_barcode() {
        assert!(validate_barcode("A1B2C3D4E5").is_ok());
        assert!(validate_barcode("8991234567890").is_ok());

        assert!(validate_barcode("").is_err());
        assert!(validate_barcode("   ").is_err());
        assert!(validate_barcode("a1b2").is_err());
        assert!(validate_barcode("AB 12").is_err());
        assert!(validate_barcode(&"A".repeat(21)).is_err());
    }

    #[test]
    fn test_validate_item_name() {
        assert!(validate_item_name("Teh Botol Sosro 450ml").is_ok());
        assert!(validate_item_name("").is_err());
        assert!(validate_item_name(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_username_and_password() {
        assert!(validate_username("kasir1").is_ok());
        assert!(validate_username("kasir 1").is_err());
        assert!(validate_username(&"u".repeat(51)).is_err());

        assert!(matches!(
            validate_password("12345"),
            Err(ValidationError::TooShort { min: 6, .. })
        ));
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_optional_text() {
        assert!(validate_notes("").is_ok());
        assert!(validate_notes(&"n".repeat(501)).is_err());
        assert!(validate_description("").is_ok());
        assert!(validate_reason("").is_err());
        assert!(validate_reason("Stock opname").is_ok());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(10_000).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
    }

    #[test]
    fn test_numeric_bounds() {
        assert!(validate_quantity_per_wholesale(1).is_ok());
        assert!(validate_quantity_per_wholesale(0).is_err());
        assert!(validate_stock_level("stock_quantity", 0).is_ok());
        assert!(validate_stock_level("stock_quantity", -1).is_err());
    }
}
