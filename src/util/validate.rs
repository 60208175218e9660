//! Input validation for client-supplied fields.

use crate::error::GameError;

/// Display names: trimmed, 1..=30 characters.
pub fn name(raw: &str) -> Result<String, GameError> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > 30 {
        return Err(GameError::InvalidName);
    }
    Ok(trimmed.to_string())
}

/// Player/spectator ids: 1..=64 chars of `[A-Za-z0-9_-]`.
pub fn ident(raw: &str) -> Result<(), GameError> {
    if raw.is_empty() || raw.len() > 64 {
        return Err(GameError::InvalidIdentifier);
    }
    if !raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(GameError::InvalidIdentifier);
    }
    Ok(())
}

/// Room codes: exactly 8 decimal digits.
pub fn code(raw: &str) -> Result<(), GameError> {
    if raw.len() != 8 || !raw.chars().all(|c| c.is_ascii_digit()) {
        return Err(GameError::InvalidCode);
    }
    Ok(())
}

/// Chat messages: trimmed, 1..=500 characters.
pub fn chat(raw: &str) -> Result<String, GameError> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > 500 {
        return Err(GameError::InvalidChat);
    }
    Ok(trimmed.to_string())
}

/// Declared room size: 2..=6.
pub fn max_players(n: u8) -> Result<(), GameError> {
    if !(2..=6).contains(&n) {
        return Err(GameError::InvalidMaxPlayers);
    }
    Ok(())
}
