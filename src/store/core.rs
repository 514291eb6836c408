//! store/core — структура RecordStore, открытие таблицы, header I/O,
//! count()/clear().
//!
//! Ресурсная дисциплина (важно): каждая публичная операция открывает свои
//! короткоживущие хэндлы (IndexFile-экземпляры и хэндлы data-файла) и
//! детерминированно отпускает их на любом пути выхода. Плата — лишний open
//! на вызов, выгода — после падения посреди операции не остаётся висящих
//! дескрипторов, максимум одна незавершённая запись. Один логический writer
//! на таблицу; никаких локов и координации процессов нет.

use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::consts::{DATA_EXT, DELETED_INDEX_SUFFIX, HEADER_SIZE, INDEX_EXT};
use crate::errors::StoreError;
use crate::header::DataFileHeader;
use crate::keys::KeyAccessor;
use crate::serializer::{EntitySerializer, JsonSerializer};
use crate::slot::IndexSlot;
use crate::util::short_type_name;

/// Одна таблица документов. Эксклюзивно владеет тремя путями файлов;
/// во время записи никто другой их не открывает.
pub struct RecordStore<T> {
    table: String,
    entity_name: String,
    data_path: PathBuf,
    index_path: PathBuf,
    deleted_index_path: PathBuf,
    /// Отслеживаемый размер data-файла; двигается вперёд при размещении
    /// новых записей, чтобы не дёргать stat на каждый create.
    pub(crate) file_size: u64,
    pub(crate) padding_factor_percent: i32,
    pub(crate) serializer: Box<dyn EntitySerializer<T>>,
    pub(crate) keys: Box<dyn KeyAccessor<T>>,
}

impl<T> RecordStore<T> {
    /// Открыть таблицу в каталоге base_path (каталог создаётся при
    /// отсутствии). Кодек и аксессор ключа инжектируются здесь.
    pub fn open(
        base_path: &Path,
        table: &str,
        config: StoreConfig,
        serializer: Box<dyn EntitySerializer<T>>,
        keys: Box<dyn KeyAccessor<T>>,
    ) -> Result<Self> {
        fs::create_dir_all(base_path)
            .with_context(|| format!("create store dir {}", base_path.display()))?;

        let data_path = base_path.join(format!("{}.{}", table, DATA_EXT));
        let index_path = base_path.join(format!("{}.{}", table, INDEX_EXT));
        let deleted_index_path =
            base_path.join(format!("{}{}.{}", table, DELETED_INDEX_SUFFIX, INDEX_EXT));

        let entity_name = config
            .entity_name
            .unwrap_or_else(|| short_type_name::<T>().to_string());

        let file_size = match fs::metadata(&data_path) {
            Ok(m) => m.len(),
            Err(_) => 0,
        };

        debug!(
            "open table '{}' at {} (data size {}, padding factor {})",
            table,
            base_path.display(),
            file_size,
            config.padding_factor_percent
        );

        Ok(Self {
            table: table.to_string(),
            entity_name,
            data_path,
            index_path,
            deleted_index_path,
            file_size,
            padding_factor_percent: config.padding_factor_percent,
            serializer,
            keys,
        })
    }

    #[inline]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[inline]
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    #[inline]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    #[inline]
    pub fn deleted_index_path(&self) -> &Path {
        &self.deleted_index_path
    }

    /// record_count заголовка: O(1) и авторитетно, по индексу не пересчитывается.
    pub fn count(&mut self) -> Result<i64> {
        Ok(self.read_header()?.record_count)
    }

    /// Текущий заголовок data-файла (для status/диагностики).
    pub fn header(&mut self) -> Result<DataFileHeader> {
        self.read_header()
    }

    /// Снести все три файла таблицы. Без отката.
    pub fn clear(&mut self) -> Result<()> {
        for path in [&self.data_path, &self.index_path, &self.deleted_index_path] {
            if path.exists() {
                fs::remove_file(path)
                    .with_context(|| format!("remove {}", path.display()))?;
            }
        }
        self.file_size = 0;
        info!("table '{}': destroyed data and indexes", self.table);
        Ok(())
    }

    // ---- header I/O (короткоживущие хэндлы на вызов) ----

    /// Прочитать заголовок. Пустой data-файл — неявное создание нулевого
    /// заголовка с немедленной записью на диск.
    pub(crate) fn read_header(&mut self) -> Result<DataFileHeader> {
        if self.file_size == 0 {
            let header = DataFileHeader::new();
            self.write_header(&header)?;
            self.file_size = HEADER_SIZE as u64;
            return Ok(header);
        }

        let mut f = OpenOptions::new()
            .read(true)
            .open(&self.data_path)
            .with_context(|| format!("open data file {}", self.data_path.display()))?;
        let mut buf = [0u8; HEADER_SIZE];
        f.seek(SeekFrom::Start(0))?;
        f.read_exact(&mut buf)
            .with_context(|| format!("read header of {}", self.data_path.display()))?;
        DataFileHeader::from_bytes(&buf)
    }

    pub(crate) fn write_header(&self, header: &DataFileHeader) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.data_path)
            .with_context(|| format!("open data file {}", self.data_path.display()))?;
        f.seek(SeekFrom::Start(0))?;
        f.write_all(&header.to_bytes())
            .with_context(|| format!("write header of {}", self.data_path.display()))?;
        f.flush()?;
        Ok(())
    }

    // ---- payload I/O ----

    pub(crate) fn read_payload(&self, slot: &IndexSlot) -> Result<Vec<u8>> {
        let mut f = OpenOptions::new()
            .read(true)
            .open(&self.data_path)
            .with_context(|| format!("open data file {}", self.data_path.display()))?;
        let mut buf = vec![0u8; slot.record_length as usize];
        f.seek(SeekFrom::Start(slot.pointer as u64))?;
        f.read_exact(&mut buf).with_context(|| {
            format!(
                "read {} payload bytes at {} in {}",
                slot.record_length,
                slot.pointer,
                self.data_path.display()
            )
        })?;
        Ok(buf)
    }

    /// Записать payload по pointer слота, следом — padding_length нулей.
    pub(crate) fn write_payload(&self, slot: &IndexSlot, payload: &[u8]) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.data_path)
            .with_context(|| format!("open data file {}", self.data_path.display()))?;
        f.seek(SeekFrom::Start(slot.pointer as u64))?;
        f.write_all(payload).with_context(|| {
            format!(
                "write {} payload bytes at {} in {}",
                payload.len(),
                slot.pointer,
                self.data_path.display()
            )
        })?;
        if slot.padding_length > 0 {
            f.write_all(&vec![0u8; slot.padding_length as usize])?;
        }
        f.flush()?;
        Ok(())
    }

    // ---- валидация записей ----

    /// Тип записи обязан совпадать с entity name таблицы.
    pub(crate) fn validate_record_type(&self) -> Result<()> {
        let declared = short_type_name::<T>();
        if declared != self.entity_name {
            return Err(StoreError::InvalidArgument(format!(
                "record type '{}' does not match entity '{}' of table '{}'",
                declared, self.entity_name, self.table
            ))
            .into());
        }
        Ok(())
    }

    /// Ключ записи через аксессор; отсутствие поля — MissingKeyField.
    pub(crate) fn record_key(&self, record: &T) -> Result<i64> {
        self.keys.get(record).ok_or_else(|| {
            StoreError::MissingKeyField(self.keys.field_name().to_string()).into()
        })
    }
}

impl<T> RecordStore<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    /// Удобный конструктор со штатным JSON-кодеком.
    pub fn open_json(
        base_path: &Path,
        table: &str,
        config: StoreConfig,
        keys: Box<dyn KeyAccessor<T>>,
    ) -> Result<Self> {
        Self::open(
            base_path,
            table,
            config,
            Box::new(JsonSerializer::<T>::new()),
            keys,
        )
    }
}
