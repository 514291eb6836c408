#![allow(non_snake_case)]

// Базовые модули
pub mod config;
pub mod consts;
pub mod errors;
pub mod util;

// Формат на диске
pub mod header;
pub mod index;
pub mod slot;

// Коллабораторы (кодек и доступ к ключевому полю)
pub mod keys;
pub mod serializer;

// Стор и многотабличный фасад
pub mod storage;
pub mod store; // src/store/{mod,core,crud,scan}.rs

// Удобные реэкспорты
pub use config::StoreConfig;
pub use errors::StoreError;
pub use header::DataFileHeader;
pub use index::IndexFile;
pub use keys::{FieldKey, KeyAccessor, KeyWidth, ValueKey};
pub use serializer::{EntitySerializer, JsonSerializer};
pub use slot::IndexSlot;
pub use storage::{Document, DocumentKey, DocumentStorage};
pub use store::{RecordStore, Repository};
