// Сериализация снапшотов (bincode)

use crate::error::Result;
use serde::{Deserialize, Serialize};

pub fn to_bytes<T: Serialize>(data: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(data)?)
}

pub fn from_bytes<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}
