use crate::error::{ProtocolError, Result};

/// Привести срез к 32-байтовому публичному ключу
pub fn public_key_array(field: &str, key: &[u8]) -> Result<[u8; 32]> {
    <[u8; 32]>::try_from(key).map_err(|_| {
        ProtocolError::InvalidKeyMaterial(format!(
            "{} must be 32 bytes, got {}",
            field,
            key.len()
        ))
    })
}

/// Проверка без раннего выхода
pub fn is_all_zero(bytes: &[u8]) -> bool {
    bytes.iter().fold(0u8, |acc, b| acc | b) == 0
}
