//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest identifier accepted for players.
const MAX_IDENTIFIER_LEN: usize = 64;

/// Validates that an identifier is non-empty, reasonably short and free of whitespace.
///
/// # Examples
///
/// ```ignore
/// validate_identifier("player-1") // Ok
/// validate_identifier("")         // Err - empty
/// validate_identifier("player 1") // Err - whitespace
/// ```
pub fn validate_identifier(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_IDENTIFIER_LEN {
        let mut err = ValidationError::new("identifier_length");
        err.message = Some(
            format!(
                "Identifier must be between 1 and {MAX_IDENTIFIER_LEN} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if id.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("identifier_format");
        err.message = Some("Identifier must not contain whitespace".into());
        return Err(err);
    }

    Ok(())
}
