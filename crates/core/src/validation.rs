//! Entity identifier validation.
//!
//! Entity ids come from the presentation layer (`CAM-03`, `INC-7`) and
//! are used as map keys and tracing fields throughout the enrichment
//! core, so they are validated once at registration time.

use crate::error::CoreError;

/// Maximum length of an entity id.
const MAX_ID_LEN: usize = 64;

/// Validate an entity id.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_ID_LEN` characters.
/// - Must contain only alphanumeric, hyphen, underscore, or dot characters.
pub fn validate_entity_id(id: &str) -> Result<(), CoreError> {
    if id.is_empty() {
        return Err(CoreError::Validation(
            "Entity id must not be empty".to_string(),
        ));
    }
    if id.len() > MAX_ID_LEN {
        return Err(CoreError::Validation(format!(
            "Entity id must not exceed {MAX_ID_LEN} characters"
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CoreError::Validation(
            "Entity id may only contain alphanumeric, hyphen, underscore, or dot characters"
                .to_string(),
        ));
    }
    Ok(())
}
