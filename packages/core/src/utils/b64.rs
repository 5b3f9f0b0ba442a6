// Base64 утилиты для JSON wire-формата

use crate::error::{ProtocolError, Result};
use base64::{engine::general_purpose, Engine};

pub fn encode(data: &[u8]) -> String {
    general_purpose::STANDARD.encode(data)
}

/// Декодировать поле wire-формата. Ошибка несёт имя поля.
pub fn decode(field: &str, data: &str) -> Result<Vec<u8>> {
    general_purpose::STANDARD.decode(data).map_err(|e| {
        ProtocolError::InvalidKeyMaterial(format!("{}: base64 decode failed: {}", field, e))
    })
}
