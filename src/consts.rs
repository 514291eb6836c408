//! Общие константы форматов (data file header, index slots, имена файлов).

// -------- Data file --------
// Заголовок (64 байта, big-endian):
// [record_count i64][last_record_id i64][largest_record_id i64][reserved 40B]
pub const HEADER_SIZE: usize = 64;
pub const DATA_EXT: &str = "ndb";

// -------- Index files --------
// Слот (32 байта, big-endian):
// [document_key i64][pointer i64][record_length i32][padding_length i32][reserved 8B]
pub const SLOT_SIZE: usize = 32;
pub const INDEX_EXT: &str = "idx";
pub const DELETED_INDEX_SUFFIX: &str = "_deleted";

// document_key == 0 помечает tombstone; реальные ключи начинаются с 1.
pub const TOMBSTONE_KEY: i64 = 0;
