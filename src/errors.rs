//! Типизированные ошибки стора.
//!
//! Публичные API возвращают anyhow::Result; варианты ниже кладутся в цепочку
//! anyhow и достаются обратно через `err.downcast_ref::<StoreError>()`.
//! I/O-ошибки идут как std::io::Error с контекстом (`.with_context`),
//! без повторов: транзиентной классификации нет, операция просто падает.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Тип записи не совпадает с entity name, настроенным для таблицы.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// У записи нет целочисленного ключевого поля (канонически "Id").
    #[error("record has no integer key field '{0}'")]
    MissingKeyField(String),

    /// Ключ, заданный вызывающим, уже есть в живом индексе.
    #[error("document key {0} already exists in the index")]
    DuplicateKey(i64),

    /// update не нашёл живой слот под ключ записи.
    #[error("no existing document with key {0} to update")]
    NotFound(i64),

    /// Заголовок data-файла имеет неверную длину при декодировании.
    #[error("malformed data file header: expected {expected} bytes, got {got}")]
    MalformedHeader { expected: usize, got: usize },

    /// Слот индекса имеет неверную длину при декодировании.
    #[error("malformed index slot: expected {expected} bytes, got {got}")]
    MalformedIndexSlot { expected: usize, got: usize },
}
