//! Заголовок data-файла (64 байта, offset 0).
//!
//! Формат (big-endian, независимо от хоста):
//! [record_count i64][last_record_id i64][largest_record_id i64][reserved 40B]
//!
//! Инварианты:
//! - largest_record_id >= last_record_id
//! - record_count >= 0
//!
//! Кодирование безусловно big-endian, без детекции порядка байт хоста.

use anyhow::Result;
use byteorder::{BigEndian, ByteOrder};

use crate::consts::HEADER_SIZE;
use crate::errors::StoreError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataFileHeader {
    /// Количество живых записей в таблице.
    pub record_count: i64,
    /// Ключ, выданный последней созданной записи.
    pub last_record_id: i64,
    /// High-water mark всех когда-либо выданных ключей.
    pub largest_record_id: i64,
}

impl DataFileHeader {
    /// Нулевой заголовок пустой таблицы.
    pub fn new() -> Self {
        Self::default()
    }

    /// Выдать ключ следующей записи и увеличить счётчик записей.
    ///
    /// requested == 0 — чистый автоинкремент: largest += 1, last = largest.
    /// requested > largest — ключ вызывающего принимается и двигает
    /// high-water mark вперёд (назад — никогда).
    /// 0 < requested <= largest — принимается молча, без проверки коллизий:
    /// дешёвая оптимистичная выдача, дубликат отлавливается позже на вставке
    /// в индекс (и только когда ключ задан вызывающим).
    pub fn generate_next_id(&mut self, requested: i64) -> i64 {
        self.record_count += 1;

        if requested == 0 {
            self.largest_record_id += 1;
            self.last_record_id = self.largest_record_id;
            return self.last_record_id;
        }

        if requested > self.largest_record_id {
            self.last_record_id = requested;
            self.largest_record_id = requested;
        }
        requested
    }

    /// Уменьшить счётчик живых записей (delete).
    pub fn remove_record(&mut self) {
        self.record_count -= 1;
    }

    /// Сериализовать в ровно 64 байта (хвост — reserved, нули).
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        BigEndian::write_i64(&mut buf[0..8], self.record_count);
        BigEndian::write_i64(&mut buf[8..16], self.last_record_id);
        BigEndian::write_i64(&mut buf[16..24], self.largest_record_id);
        buf
    }

    /// Разобрать 64 байта заголовка; иная длина — MalformedHeader.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != HEADER_SIZE {
            return Err(StoreError::MalformedHeader {
                expected: HEADER_SIZE,
                got: bytes.len(),
            }
            .into());
        }
        Ok(Self {
            record_count: BigEndian::read_i64(&bytes[0..8]),
            last_record_id: BigEndian::read_i64(&bytes[8..16]),
            largest_record_id: BigEndian::read_i64(&bytes[16..24]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;

    #[test]
    fn header_roundtrip() {
        let mut h = DataFileHeader::new();
        h.record_count = 7;
        h.last_record_id = 42;
        h.largest_record_id = 99;

        let bytes = h.to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);
        // big-endian: старший байт первым
        assert_eq!(&bytes[0..8], &[0, 0, 0, 0, 0, 0, 0, 7]);

        let back = DataFileHeader::from_bytes(&bytes).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn header_bad_length() {
        let err = DataFileHeader::from_bytes(&[0u8; 63]).unwrap_err();
        match err.downcast_ref::<StoreError>() {
            Some(StoreError::MalformedHeader { expected: 64, got: 63 }) => {}
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn auto_increment_issues_dense_keys() {
        let mut h = DataFileHeader::new();
        for expected in 1..=5i64 {
            assert_eq!(h.generate_next_id(0), expected);
        }
        assert_eq!(h.record_count, 5);
        assert_eq!(h.last_record_id, 5);
        assert_eq!(h.largest_record_id, 5);
    }

    #[test]
    fn supplied_key_moves_high_water_mark_forward_only() {
        let mut h = DataFileHeader::new();
        assert_eq!(h.generate_next_id(10), 10);
        assert_eq!(h.largest_record_id, 10);

        // Меньший ключ принимается молча, high-water mark не двигается.
        assert_eq!(h.generate_next_id(3), 3);
        assert_eq!(h.largest_record_id, 10);

        // Автоинкремент продолжает с high-water mark.
        assert_eq!(h.generate_next_id(0), 11);
        assert_eq!(h.record_count, 3);
        assert!(h.largest_record_id >= h.last_record_id);
    }

    #[test]
    fn remove_record_decrements_count() {
        let mut h = DataFileHeader::new();
        h.generate_next_id(0);
        h.generate_next_id(0);
        h.remove_record();
        assert_eq!(h.record_count, 1);
    }
}
