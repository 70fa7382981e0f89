//! Ошибки ввода-вывода вокруг генератора.
//!
//! Сам конвейер генерации ошибок не возвращает: некорректные размеры дают
//! пустые массивы, а не панику. Ошибки возникают только на краях — чтение
//! конфигурации, запись PNG и JSON-отчёта.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image buffer error: {0}")]
    Buffer(String),
}

pub type Result<T> = std::result::Result<T, Error>;
