//! store/crud — create/read_by_key/update/delete.
//!
//! Жизненный цикл слота:
//! absent -> live (свежее размещение);
//! live -> live (update на месте, паддинга хватило);
//! live -> live (update с переездом: старый слот уходит в tombstone,
//!               новый живёт в конце data-файла);
//! live -> tombstoned (delete);
//! tombstoned -> live (переиспользован последующим create/переездом).
//! Терминальное состояние — только clear() всей таблицы.
//!
//! Байты payload при delete не стираются и не зануляются — нейтрализуется
//! только запись индекса. Мёртвое место возвращается исключительно через
//! free-list (deleted-индекс); физической компактации нет.

use anyhow::{Context, Result};
use log::{debug, info};

use crate::errors::StoreError;
use crate::index::IndexFile;
use crate::slot::IndexSlot;

use super::core::RecordStore;

impl<T> RecordStore<T> {
    /// Сохранить новую запись; возвращает её же с проставленным ключом.
    ///
    /// Ключ 0 — автоинкремент (без проверки дубликата: плотная выдача сама
    /// гарантирует уникальность). Ненулевой ключ вызывающего — вставка с
    /// проверкой дубликата в живом индексе.
    ///
    /// Место: сперва ищется достаточно ёмкий слот в deleted-индексе
    /// (переиспользование освобождённого), иначе запись размещается в конце
    /// data-файла.
    pub fn create(&mut self, mut record: T) -> Result<T> {
        self.validate_record_type()?;
        let requested = self.record_key(&record)?;

        let mut header = self.read_header()?;

        // дубликат проверяем только когда ключ задан вызывающим
        let check_duplicate = requested != 0;
        let key = header.generate_next_id(requested);
        self.keys.set(&mut record, key);

        let payload = self.serializer.serialize(&record)?;
        let payload_len = i32::try_from(payload.len())
            .context("record payload exceeds i32::MAX bytes")?;

        let mut deleted = IndexFile::open(self.deleted_index_path())?;
        let mut reused = false;
        let slot = match deleted.find_space_for(payload_len as i64)? {
            Some(mut slot) => {
                debug!(
                    "table '{}': key {} reuses freed slot at pointer {} (capacity {})",
                    self.table(),
                    key,
                    slot.pointer,
                    slot.capacity()
                );
                reused = true;
                slot.change_document_key(key);
                slot.update_record_length(payload_len);
                slot
            }
            None => {
                let slot = IndexSlot::new(
                    key,
                    self.file_size as i64,
                    payload_len,
                    self.padding_factor_percent,
                );
                self.file_size += slot.record_length as u64 + slot.padding_length as u64;
                slot
            }
        };

        {
            let mut live = IndexFile::open(self.index_path())?;
            if check_duplicate {
                live.append_check_duplicate(&slot)?;
            } else {
                live.append(&slot)?;
            }
        }

        // вычеркнуть занятое место из free-list
        if reused {
            // позиция слота в deleted-индексе пришла из find_space_for
            let mut dead = slot.clone();
            dead.mark_as_deleted();
            deleted.update(&dead)?;
        } else {
            // ключ вызывающего мог совпасть со старой освобождённой записью
            deleted.remove(slot.document_key)?;
        }

        self.write_payload(&slot, &payload)?;
        self.write_header(&header)?;

        Ok(record)
    }

    /// Прочитать запись по ключу; отсутствие — обычный пустой результат.
    pub fn read_by_key(&mut self, key: i64) -> Result<Option<T>> {
        let mut live = IndexFile::open(self.index_path())?;
        let Some(slot) = live.find(key)? else {
            return Ok(None);
        };
        let bytes = self.read_payload(&slot)?;
        Ok(Some(self.serializer.deserialize(&bytes)?))
    }

    /// Перезаписать существующую запись.
    ///
    /// Если новый payload влезает в record_length + padding — запись
    /// обновляется на месте. Иначе старое место уходит tombstone'ом в
    /// deleted-индекс (с его настоящей ёмкостью), а запись переезжает в конец
    /// data-файла со свежим паддингом.
    pub fn update(&mut self, record: T) -> Result<T> {
        self.validate_record_type()?;
        let key = self.record_key(&record)?;

        let mut live = IndexFile::open(self.index_path())?;
        let Some(mut slot) = live.find(key)? else {
            return Err(StoreError::NotFound(key).into());
        };

        let payload = self.serializer.serialize(&record)?;
        let payload_len = i32::try_from(payload.len())
            .context("record payload exceeds i32::MAX bytes")?;

        // копия до пересчёта длины: free-list должен увидеть старое место
        // с его настоящей ёмкостью (старые pointer/length/padding)
        let old_slot = slot.clone();
        slot.update_record_length(payload_len);

        if slot.requires_relocation {
            {
                let mut deleted = IndexFile::open(self.deleted_index_path())?;
                deleted.append_reuse_tombstone(&old_slot)?;
            }
            let new_pointer = self.file_size as i64;
            slot.update_record_pointer(new_pointer, self.padding_factor_percent);
            self.file_size += slot.record_length as u64 + slot.padding_length as u64;
            info!(
                "table '{}': record {} relocated ({} -> {}, {} bytes)",
                self.table(),
                key,
                old_slot.pointer,
                new_pointer,
                payload_len
            );
        }

        self.write_payload(&slot, &payload)?;

        // слот возвращается на своё место в живом индексе (position из find)
        live.update(&slot)?;

        Ok(record)
    }

    /// Удалить запись. Отсутствие ключа в живом индексе — no-op.
    pub fn delete(&mut self, record: &T) -> Result<()> {
        let key = self.record_key(record)?;

        let mut live = IndexFile::open(self.index_path())?;
        let Some(slot) = live.find(key)? else {
            return Ok(());
        };

        {
            // копия слота в free-list: место становится переиспользуемым
            let mut deleted = IndexFile::open(self.deleted_index_path())?;
            deleted.append_reuse_tombstone(&slot)?;
        }

        // в живом индексе — только нейтрализация записи
        live.remove(key)?;

        let mut header = self.read_header()?;
        header.remove_record();
        self.write_header(&header)?;

        debug!("table '{}': deleted record {}", self.table(), key);
        Ok(())
    }
}
