//! # Validation Module
//!
//! Centralized input validation for the DriveLink client.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Screens (TypeScript)                                         │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (Rust)                                           │
//! │  ├── Named rules shared by every form-submitting flow                  │
//! │  └── Runs before any gateway round trip                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Remote data store                                            │
//! │  └── NOT NULL / UNIQUE / FK constraints                                │
//! │                                                                         │
//! │  Defense in depth: Multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every rule returns a structured [`ValidationError`] naming the violated
//! field, so forms can highlight the right input.

use crate::error::ValidationError;
use crate::role::Role;
use crate::MIN_PASSWORD_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Account Validators
// =============================================================================

/// Validates an email address shape.
///
/// ## Rules
/// - Must not be empty
/// - Exactly one `@` with non-empty local part
/// - Domain must contain a dot and no whitespace
///
/// This is a shape check, not RFC 5322; the auth backend has the final say.
///
/// ## Example
/// ```rust
/// use drivelink_core::validation::validate_email;
///
/// assert!(validate_email("m@x.com").is_ok());
/// assert!(validate_email("not-an-email").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@domain.tld".to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            if local.is_empty() || domain.is_empty() {
                return Err(invalid());
            }
            // Domain needs at least one dot with characters on both sides
            let dot = domain.find('.');
            match dot {
                Some(i) if i > 0 && i < domain.len() - 1 => Ok(()),
                _ => Err(invalid()),
            }
        }
        _ => Err(invalid()),
    }
}

/// Validates password strength.
///
/// ## Rules
/// - Must be at least [`MIN_PASSWORD_LEN`] characters (6)
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }

    Ok(())
}

/// Validates that the password confirmation matches the password.
pub fn validate_password_confirmation(
    password: &str,
    confirmation: &str,
) -> ValidationResult<()> {
    if password != confirmation {
        return Err(ValidationError::Mismatch {
            field: "password confirmation".to_string(),
        });
    }

    Ok(())
}

/// Validates a person's full name.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 100 characters
pub fn validate_full_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "full name".to_string(),
        });
    }

    if name.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "full name".to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates a role chosen at registration.
///
/// Only owner, manager, and driver accounts can self-register.
pub fn validate_registration_role(role: Role) -> ValidationResult<()> {
    if !role.is_registerable() {
        return Err(ValidationError::NotAllowed {
            field: "role".to_string(),
            allowed: vec![
                Role::Owner.as_str().to_string(),
                Role::Manager.as_str().to_string(),
                Role::Driver.as_str().to_string(),
            ],
        });
    }

    Ok(())
}

// =============================================================================
// Car Validators
// =============================================================================

/// Validates a license plate number.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 20 characters
/// - Letters, digits, hyphens, and spaces only
pub fn validate_plate_no(plate_no: &str) -> ValidationResult<()> {
    let plate_no = plate_no.trim();

    if plate_no.is_empty() {
        return Err(ValidationError::Required {
            field: "plate_no".to_string(),
        });
    }

    if plate_no.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "plate_no".to_string(),
            max: 20,
        });
    }

    if !plate_no
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == ' ')
    {
        return Err(ValidationError::InvalidFormat {
            field: "plate_no".to_string(),
            reason: "must contain only letters, numbers, hyphens, and spaces".to_string(),
        });
    }

    Ok(())
}

/// Validates a car model year, when provided.
pub fn validate_year(year: i32) -> ValidationResult<()> {
    if !(1950..=2100).contains(&year) {
        return Err(ValidationError::OutOfRange {
            field: "year".to_string(),
            min: 1950,
            max: 2100,
        });
    }

    Ok(())
}

// =============================================================================
// Ledger Validators
// =============================================================================

/// Validates a ledger amount in cents.
///
/// ## Rules
/// - Must be positive (> 0); zero-amount entries are noise
pub fn validate_amount_cents(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use drivelink_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
