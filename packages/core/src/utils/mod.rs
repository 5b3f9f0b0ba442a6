// Вспомогательные модули

pub mod b64;
pub mod clock;
pub mod serialization;
pub mod validation;
