//! store/scan — полные проходы по таблице.
//!
//! read_all материализует свежий проход на каждый вызов: порядок — по
//! порядковым номерам слотов, без инкрементальности. Предикаты и сортировка
//! вычисляются над материализованным результатом — в бинарный слой ничего
//! не проталкивается.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom};

use crate::index::IndexFile;

use super::core::RecordStore;

impl<T> RecordStore<T> {
    /// Все живые записи в порядке слотов. Обход идёт по порядковым номерам
    /// 1, 2, … до первого None (конец файла или tombstone на позиции).
    pub fn read_all(&mut self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        if !self.data_path().exists() {
            return Ok(out);
        }

        let mut live = IndexFile::open(self.index_path())?;
        // один read-хэндл data-файла на весь проход
        let mut data = OpenOptions::new()
            .read(true)
            .open(self.data_path())
            .with_context(|| format!("open data file {}", self.data_path().display()))?;

        let mut record_number = 1i64;
        while let Some(slot) = live.slot_at_record_number(record_number)? {
            let mut buf = vec![0u8; slot.record_length as usize];
            data.seek(SeekFrom::Start(slot.pointer as u64))?;
            data.read_exact(&mut buf).with_context(|| {
                format!(
                    "read record {} at {} in {}",
                    slot.document_key,
                    slot.pointer,
                    self.data_path().display()
                )
            })?;
            out.push(self.serializer.deserialize(&buf)?);
            record_number += 1;
        }

        Ok(out)
    }

    /// Страница результата read_all: (записи, общее количество).
    /// skip = page_index * page_size, take = page_size.
    pub fn read_page(&mut self, page_index: usize, page_size: usize) -> Result<(Vec<T>, usize)> {
        let all = self.read_all()?;
        let total = all.len();
        let page = all
            .into_iter()
            .skip(page_index * page_size)
            .take(page_size)
            .collect();
        Ok((page, total))
    }

    /// Записи, прошедшие предикат.
    pub fn filter<P>(&mut self, predicate: P) -> Result<Vec<T>>
    where
        P: Fn(&T) -> bool,
    {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| predicate(r))
            .collect())
    }

    /// Отфильтрованная и отсортированная страница: (записи, количество
    /// прошедших фильтр).
    pub fn filter_sorted<P, K, O>(
        &mut self,
        predicate: P,
        key_selector: K,
        ascending: bool,
        page_index: usize,
        page_size: usize,
    ) -> Result<(Vec<T>, usize)>
    where
        P: Fn(&T) -> bool,
        K: Fn(&T) -> O,
        O: Ord,
    {
        let mut rows: Vec<T> = self
            .read_all()?
            .into_iter()
            .filter(|r| predicate(r))
            .collect();
        rows.sort_by(|a, b| {
            let ord = key_selector(a).cmp(&key_selector(b));
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        });
        let total = rows.len();
        let page = rows
            .into_iter()
            .skip(page_index * page_size)
            .take(page_size)
            .collect();
        Ok((page, total))
    }

    /// Есть ли хоть одна запись, проходящая предикат.
    pub fn contains<P>(&mut self, predicate: P) -> Result<bool>
    where
        P: Fn(&T) -> bool,
    {
        Ok(self.read_all()?.iter().any(|r| predicate(r)))
    }

    /// Первая запись, проходящая предикат.
    pub fn find_first<P>(&mut self, predicate: P) -> Result<Option<T>>
    where
        P: Fn(&T) -> bool,
    {
        Ok(self.read_all()?.into_iter().find(|r| predicate(r)))
    }
}
