//! Слот индекса (32 байта) — описывает положение одного документа в data-файле.
//!
//! Формат (big-endian):
//! [document_key i64][pointer i64][record_length i32][padding_length i32][reserved 8B]
//!
//! 24 байта занято, 8 зарезервировано (выравнивание до 32).
//! document_key == 0 — tombstone: слот удалён/свободен, поиск его не матчит.
//!
//! Поля `position` и `requires_relocation` живут только в памяти на время
//! вызова и на диск не пишутся.

use anyhow::Result;
use byteorder::{BigEndian, ByteOrder};

use crate::consts::{SLOT_SIZE, TOMBSTONE_KEY};
use crate::errors::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSlot {
    /// Первичный ключ документа; 0 = tombstone.
    pub document_key: i64,
    /// Смещение payload документа в data-файле.
    pub pointer: i64,
    /// Длина payload в байтах.
    pub record_length: i32,
    /// Резерв из хвостовых байт после payload — место для роста без переезда.
    pub padding_length: i32,

    /// Смещение самого слота внутри индекс-файла. Заполняется find-операциями,
    /// на диск не пишется.
    pub position: i64,
    /// Взводится, когда рост при update превысил доступный padding;
    /// сбрасывается после переезда записи.
    pub requires_relocation: bool,
}

impl IndexSlot {
    /// Новый слот; padding_length считается от record_length и фактора.
    ///
    /// Конвенция фактора: 100 = без паддинга, 150 = +50% места; всё <= 1
    /// трактуется как 0%.
    pub fn new(document_key: i64, pointer: i64, record_length: i32, padding_factor_percent: i32) -> Self {
        let mut slot = Self {
            document_key,
            pointer,
            record_length,
            padding_length: 0,
            position: 0,
            requires_relocation: false,
        };
        slot.padding_length = padding_for(record_length, padding_factor_percent);
        slot
    }

    /// Tombstone: зануляет только ключ, геометрия слота остаётся.
    pub fn mark_as_deleted(&mut self) {
        self.document_key = TOMBSTONE_KEY;
    }

    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.document_key == TOMBSTONE_KEY
    }

    /// Суммарная ёмкость места под этим слотом.
    #[inline]
    pub fn capacity(&self) -> i64 {
        self.record_length as i64 + self.padding_length as i64
    }

    /// Обновить длину записи, пересчитав padding.
    ///
    /// Рост съедает padding; если резерв исчерпан (padding ушёл бы в минус),
    /// padding обнуляется и взводится requires_relocation — сигнал перенести
    /// запись в новое место.
    pub fn update_record_length(&mut self, new_record_length: i32) {
        let delta = self.record_length - new_record_length;
        self.padding_length += delta;
        self.record_length = new_record_length;

        if self.padding_length < 0 {
            self.requires_relocation = true;
            self.padding_length = 0;
        }
    }

    /// Передать слот новому ключу (переиспользование tombstone).
    pub fn change_document_key(&mut self, document_key: i64) {
        self.document_key = document_key;
    }

    /// Вызывается после переезда записи в конец data-файла: новый pointer,
    /// сброс requires_relocation, свежий padding от текущей длины.
    pub fn update_record_pointer(&mut self, new_pointer: i64, padding_factor_percent: i32) {
        self.pointer = new_pointer;
        self.requires_relocation = false;
        self.padding_length = padding_for(self.record_length, padding_factor_percent);
    }

    /// Сериализовать в ровно 32 байта (position/requires_relocation не пишутся).
    pub fn to_bytes(&self) -> [u8; SLOT_SIZE] {
        let mut buf = [0u8; SLOT_SIZE];
        BigEndian::write_i64(&mut buf[0..8], self.document_key);
        BigEndian::write_i64(&mut buf[8..16], self.pointer);
        BigEndian::write_i32(&mut buf[16..20], self.record_length);
        BigEndian::write_i32(&mut buf[20..24], self.padding_length);
        buf
    }

    /// Разобрать 32 байта слота; иная длина — MalformedIndexSlot.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SLOT_SIZE {
            return Err(StoreError::MalformedIndexSlot {
                expected: SLOT_SIZE,
                got: bytes.len(),
            }
            .into());
        }
        Ok(Self {
            document_key: BigEndian::read_i64(&bytes[0..8]),
            pointer: BigEndian::read_i64(&bytes[8..16]),
            record_length: BigEndian::read_i32(&bytes[16..20]),
            padding_length: BigEndian::read_i32(&bytes[20..24]),
            position: 0,
            requires_relocation: false,
        })
    }
}

/// Паддинг от фактора: 100 = без паддинга, 150 = +50% длины записи.
/// floor(record_length * (factor - 100) / 100); фактор <= 1 (и всё, что не
/// превышает 100) — нулевой паддинг.
fn padding_for(record_length: i32, padding_factor_percent: i32) -> i32 {
    if padding_factor_percent <= 1 {
        return 0;
    }
    let extra_percent = (padding_factor_percent as i64 - 100).max(0);
    ((record_length as i64 * extra_percent) / 100) as i32
}
