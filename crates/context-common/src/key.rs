//! Registry key validation.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum KeyError {
    #[error("Key must not be empty.")]
    Empty,

    #[error("Key must only contains lower case or underscore: '{0}'")]
    InvalidCharacters(String),

    #[error("Key is longer than 200 characters: '{0}'")]
    TooLong(String),
}

/// Maximum stored key length.
pub const MAX_KEY_LENGTH: usize = 200;

/// Keys are `[0-9a-z_]+` and at most 200 characters.
pub fn validate_key(key: &str) -> Result<(), KeyError> {
    if key.is_empty() {
        return Err(KeyError::Empty);
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(KeyError::TooLong(key.to_string()));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(KeyError::InvalidCharacters(key.to_string()));
    }
    Ok(())
}
