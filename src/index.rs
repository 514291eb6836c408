//! Индекс-файл: конкатенация 32-байтных слотов (размер кратен 32).
//!
//! Держит два постоянных хэндла (read + write) на время жизни экземпляра и
//! append-only кэш прочитанных слотов, чтобы повторные поиски не сканировали
//! файл с нуля.
//!
//! Поиск (`find`):
//! 1) fast path — для автоинкрементных ключей слот ключа k лежит по смещению
//!    (k-1)*32; читаем его и возвращаем сразу при совпадении;
//! 2) иначе точное совпадение в кэше;
//! 3) иначе линейный скан с конца закэшированного, с дозаполнением кэша.
//!
//! Таблицы с чистым автоинкрементом получают O(1)-поиск; внешние/разреженные
//! ключи деградируют до амортизированного скана.
//!
//! Кэш инвалидируется при любой перезаписи слота на месте (update/remove/
//! переиспользование tombstone); чистый append оставляет кэш валидным
//! префиксом. Кэш не разделяется между экземплярами: два хэндла на один путь
//! видят только сброшенные на диск байты друг друга.

use anyhow::{Context, Result};
use log::debug;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::consts::{SLOT_SIZE, TOMBSTONE_KEY};
use crate::errors::StoreError;
use crate::slot::IndexSlot;

pub struct IndexFile {
    pub path: PathBuf,
    reader: File,
    writer: File,
    pub file_size: u64,
    cache: Vec<IndexSlot>,
}

impl IndexFile {
    /// Открыть (создав при отсутствии) индекс-файл.
    pub fn open(path: &Path) -> Result<Self> {
        let writer = OpenOptions::new()
            .create(true)
            .write(true)
            .open(path)
            .with_context(|| format!("open index for write {}", path.display()))?;
        let reader = OpenOptions::new()
            .read(true)
            .open(path)
            .with_context(|| format!("open index for read {}", path.display()))?;

        let file_size = writer
            .metadata()
            .with_context(|| format!("stat index {}", path.display()))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            writer,
            file_size,
            cache: Vec::new(),
        })
    }

    /// Дописать слот в конец файла.
    pub fn append(&mut self, slot: &IndexSlot) -> Result<()> {
        self.write_slot_at(self.file_size, slot)?;
        self.file_size += SLOT_SIZE as u64;
        Ok(())
    }

    /// Дописать слот, предварительно убедившись, что ключа ещё нет.
    pub fn append_check_duplicate(&mut self, slot: &IndexSlot) -> Result<()> {
        if self.find(slot.document_key)?.is_some() {
            return Err(StoreError::DuplicateKey(slot.document_key).into());
        }
        self.append(slot)
    }

    /// Записать слот на место первого tombstone (document_key == 0);
    /// если свободных слотов нет — добавить в конец.
    pub fn append_reuse_tombstone(&mut self, slot: &IndexSlot) -> Result<()> {
        let mut pos = 0u64;
        while pos < self.file_size {
            let existing = self.read_slot_at(pos)?;
            if existing.is_tombstone() {
                debug!(
                    "index {}: reuse tombstone slot at {}",
                    self.path.display(),
                    pos
                );
                self.write_slot_at(pos, slot)?;
                // перезапись внутри закэшированной зоны — кэш устарел
                self.cache.clear();
                return Ok(());
            }
            pos += SLOT_SIZE as u64;
        }
        self.append(slot)
    }

    /// Перезаписать слот по его position (получен из предыдущего find).
    pub fn update(&mut self, slot: &IndexSlot) -> Result<()> {
        self.write_slot_at(slot.position as u64, slot)?;
        self.cache.clear();
        Ok(())
    }

    /// Затомбстонить слот с данным ключом; отсутствие ключа — no-op.
    pub fn remove(&mut self, document_key: i64) -> Result<()> {
        let Some(mut slot) = self.find(document_key)? else {
            return Ok(());
        };
        slot.mark_as_deleted();
        self.write_slot_at(slot.position as u64, &slot)?;
        self.cache.clear();
        Ok(())
    }

    /// Найти слот по ключу; ключ 0 не матчится никогда.
    pub fn find(&mut self, document_key: i64) -> Result<Option<IndexSlot>> {
        if document_key == TOMBSTONE_KEY {
            return Ok(None);
        }

        // 1) fast path: автоинкрементный ключ k ожидаем по (k-1)*32.
        // Сравниваем порядковый номер со счётчиком слотов до умножения:
        // (k-1)*32 для больших внешних ключей переполнило бы u64.
        if document_key >= 1 {
            let ordinal = document_key as u64 - 1;
            if ordinal < self.file_size / SLOT_SIZE as u64 {
                let slot = self.read_slot_at(ordinal * SLOT_SIZE as u64)?;
                if slot.document_key == document_key {
                    return Ok(Some(slot));
                }
            }
        }

        // 2) кэш.
        if let Some(slot) = self
            .cache
            .iter()
            .find(|s| s.document_key == document_key)
        {
            return Ok(Some(slot.clone()));
        }

        // 3) продолжить скан с конца закэшированного, дозаполняя кэш.
        let mut pos = self.cache.len() as u64 * SLOT_SIZE as u64;
        while pos < self.file_size {
            let slot = self.read_slot_at(pos)?;
            self.cache.push(slot.clone());
            if slot.document_key == document_key {
                return Ok(Some(slot));
            }
            pos += SLOT_SIZE as u64;
        }

        Ok(None)
    }

    /// Есть ли живой слот с таким ключом.
    pub fn exists(&mut self, document_key: i64) -> Result<bool> {
        Ok(self.find(document_key)?.is_some())
    }

    /// Слот по порядковому номеру (1-based) — для полного обхода таблицы.
    /// None за концом файла и на tombstone.
    pub fn slot_at_record_number(&mut self, record_number: i64) -> Result<Option<IndexSlot>> {
        if record_number < 1 {
            return Ok(None);
        }
        // порядковый номер против счётчика слотов, до умножения
        let ordinal = record_number as u64 - 1;
        if ordinal >= self.file_size / SLOT_SIZE as u64 {
            return Ok(None);
        }
        let slot = self.read_slot_at(ordinal * SLOT_SIZE as u64)?;
        if slot.is_tombstone() {
            return Ok(None);
        }
        Ok(Some(slot))
    }

    /// Первый не-tombstone слот с ёмкостью (record_length + padding_length)
    /// не меньше min_bytes. Осмысленно только против deleted-индекса, где
    /// записи описывают переиспользуемое освобождённое место.
    pub fn find_space_for(&mut self, min_bytes: i64) -> Result<Option<IndexSlot>> {
        // сначала кэш
        if let Some(slot) = self
            .cache
            .iter()
            .find(|s| !s.is_tombstone() && s.capacity() >= min_bytes)
        {
            return Ok(Some(slot.clone()));
        }

        // затем диск, продолжая с конца закэшированного
        let mut pos = self.cache.len() as u64 * SLOT_SIZE as u64;
        while pos < self.file_size {
            let slot = self.read_slot_at(pos)?;
            self.cache.push(slot.clone());
            if !slot.is_tombstone() && slot.capacity() >= min_bytes {
                return Ok(Some(slot));
            }
            pos += SLOT_SIZE as u64;
        }

        Ok(None)
    }

    /// Снести файл и начать с нуля: размер 0, пустой кэш, свежие хэндлы.
    pub fn reset(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("remove index {}", self.path.display()))?;
        }
        // старые хэндлы указывают на удалённый inode — переоткрываем
        self.writer = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.path)
            .with_context(|| format!("recreate index {}", self.path.display()))?;
        self.reader = OpenOptions::new()
            .read(true)
            .open(&self.path)
            .with_context(|| format!("reopen index {}", self.path.display()))?;
        self.file_size = 0;
        self.cache.clear();
        Ok(())
    }

    // ---- внутренние помощники ----

    fn read_slot_at(&mut self, pos: u64) -> Result<IndexSlot> {
        let mut buf = [0u8; SLOT_SIZE];
        self.reader.seek(SeekFrom::Start(pos))?;
        self.reader
            .read_exact(&mut buf)
            .with_context(|| format!("read slot at {} in {}", pos, self.path.display()))?;
        let mut slot = IndexSlot::from_bytes(&buf)?;
        slot.position = pos as i64;
        Ok(slot)
    }

    fn write_slot_at(&mut self, pos: u64, slot: &IndexSlot) -> Result<()> {
        self.writer.seek(SeekFrom::Start(pos))?;
        self.writer
            .write_all(&slot.to_bytes())
            .with_context(|| format!("write slot at {} in {}", pos, self.path.display()))?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;

    fn unique_index(prefix: &str) -> PathBuf {
        let t = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("ndb-{}-{}-{}.idx", prefix, std::process::id(), t))
    }

    #[test]
    fn append_and_find_fast_path() -> Result<()> {
        let path = unique_index("fastpath");
        let mut idx = IndexFile::open(&path)?;

        for k in 1..=10i64 {
            idx.append(&IndexSlot::new(k, 64 + k * 100, 100, 0))?;
        }
        assert_eq!(idx.file_size, 320);

        // автоинкрементный ключ находится чтением ровно одного слота
        let slot = idx.find(7)?.expect("key 7 must exist");
        assert_eq!(slot.position, 6 * SLOT_SIZE as i64);
        assert_eq!(slot.pointer, 764);
        // кэш не понадобился
        assert!(idx.cache.is_empty());

        fs::remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn sparse_keys_fall_back_to_cached_scan() -> Result<()> {
        let path = unique_index("sparse");
        let mut idx = IndexFile::open(&path)?;

        // ключи не на «своих» местах — fast path промахивается
        idx.append(&IndexSlot::new(50, 64, 10, 0))?;
        idx.append(&IndexSlot::new(9, 74, 10, 0))?;
        idx.append(&IndexSlot::new(23, 84, 10, 0))?;

        let slot = idx.find(23)?.expect("key 23 must exist");
        assert_eq!(slot.position, 2 * SLOT_SIZE as i64);
        // скан закэшировал всё пройденное
        assert_eq!(idx.cache.len(), 3);

        // повторный поиск обслуживается из кэша
        let again = idx.find(9)?.expect("key 9 must exist");
        assert_eq!(again.position, SLOT_SIZE as i64);

        fs::remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn duplicate_append_is_rejected() -> Result<()> {
        let path = unique_index("dup");
        let mut idx = IndexFile::open(&path)?;

        idx.append(&IndexSlot::new(5, 64, 10, 0))?;
        let err = idx
            .append_check_duplicate(&IndexSlot::new(5, 100, 10, 0))
            .unwrap_err();
        match err.downcast_ref::<StoreError>() {
            Some(StoreError::DuplicateKey(5)) => {}
            other => panic!("unexpected error: {:?}", other),
        }

        fs::remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn remove_tombstones_and_reuse_overwrites_in_place() -> Result<()> {
        let path = unique_index("reuse");
        let mut idx = IndexFile::open(&path)?;

        idx.append(&IndexSlot::new(1, 64, 10, 0))?;
        idx.append(&IndexSlot::new(2, 74, 10, 0))?;
        idx.append(&IndexSlot::new(3, 84, 10, 0))?;

        idx.remove(2)?;
        assert!(!idx.exists(2)?);
        assert_eq!(idx.file_size, 96); // слот не удаляется физически

        // новый слот занимает место tombstone, файл не растёт
        idx.append_reuse_tombstone(&IndexSlot::new(4, 200, 10, 0))?;
        assert_eq!(idx.file_size, 96);
        let slot = idx.find(4)?.expect("key 4 must exist");
        assert_eq!(slot.position, SLOT_SIZE as i64);

        // без tombstone — обычный append в конец
        idx.append_reuse_tombstone(&IndexSlot::new(5, 300, 10, 0))?;
        assert_eq!(idx.file_size, 128);

        fs::remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn ordinal_iteration_stops_on_tombstone_and_eof() -> Result<()> {
        let path = unique_index("ordinal");
        let mut idx = IndexFile::open(&path)?;

        idx.append(&IndexSlot::new(1, 64, 10, 0))?;
        idx.append(&IndexSlot::new(2, 74, 10, 0))?;

        assert!(idx.slot_at_record_number(1)?.is_some());
        assert!(idx.slot_at_record_number(2)?.is_some());
        assert!(idx.slot_at_record_number(3)?.is_none()); // за концом файла

        idx.remove(1)?;
        assert!(idx.slot_at_record_number(1)?.is_none()); // tombstone

        fs::remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn find_space_scans_for_capacity() -> Result<()> {
        let path = unique_index("space");
        let mut idx = IndexFile::open(&path)?;

        // deleted-индекс: записи описывают освобождённое место
        idx.append(&IndexSlot::new(11, 64, 10, 0))?; // ёмкость 10
        idx.append(&IndexSlot::new(12, 74, 30, 100))?; // ёмкость 30
        idx.append(&IndexSlot::new(13, 104, 100, 150))?; // ёмкость 150

        let slot = idx.find_space_for(25)?.expect("must find space");
        assert_eq!(slot.document_key, 12);

        let big = idx.find_space_for(120)?.expect("must find big space");
        assert_eq!(big.document_key, 13);

        assert!(idx.find_space_for(1000)?.is_none());

        fs::remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn huge_external_key_skips_fast_path() -> Result<()> {
        let path = unique_index("hugekey");
        let mut idx = IndexFile::open(&path)?;

        // внешний ключ у верхней границы i64: (k-1)*32 не помещается в u64,
        // поиск обязан уйти на скан, а не падать на умножении
        idx.append(&IndexSlot::new(1, 64, 10, 0))?;
        idx.append(&IndexSlot::new(i64::MAX, 74, 10, 0))?;

        let slot = idx.find(i64::MAX)?.expect("huge key must be found");
        assert_eq!(slot.position, SLOT_SIZE as i64);
        assert_eq!(slot.pointer, 74);

        // порядковый доступ тем же номером — просто за концом файла
        assert!(idx.slot_at_record_number(i64::MAX)?.is_none());

        fs::remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn reset_starts_empty() -> Result<()> {
        let path = unique_index("reset");
        let mut idx = IndexFile::open(&path)?;
        idx.append(&IndexSlot::new(1, 64, 10, 0))?;

        idx.reset()?;
        assert_eq!(idx.file_size, 0);
        assert!(idx.find(1)?.is_none());

        // файл снова пригоден для записи
        idx.append(&IndexSlot::new(2, 64, 10, 0))?;
        assert!(idx.exists(2)?);

        fs::remove_file(&path)?;
        Ok(())
    }
}
