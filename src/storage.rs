//! DocumentStorage — тонкий многотабличный фасад.
//!
//! Держит по одному RecordStore на тип записи: отображение TypeId ->
//! сконструированный стор, строится лениво и живёт вместе с фасадом.

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::keys::{KeyAccessor, KeyWidth};
use crate::serializer::JsonSerializer;
use crate::store::RecordStore;
use crate::util::short_type_name;

/// Самоописывающийся документ: знает своё ключевое поле.
/// Достаточно для хранения через фасад без ручной сборки аксессоров.
pub trait Document: Serialize + DeserializeOwned + 'static {
    fn key(&self) -> i64;
    fn set_key(&mut self, key: i64);

    /// Имя таблицы; по умолчанию — короткое имя типа.
    fn entity_name() -> &'static str {
        short_type_name::<Self>()
    }

    fn key_width() -> KeyWidth {
        KeyWidth::I64
    }
}

/// Аксессор ключа поверх контракта Document.
pub struct DocumentKey<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> DocumentKey<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for DocumentKey<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Document> KeyAccessor<T> for DocumentKey<T> {
    fn field_name(&self) -> &str {
        "Id"
    }

    fn get(&self, record: &T) -> Option<i64> {
        Some(record.key())
    }

    fn set(&self, record: &mut T, key: i64) {
        record.set_key(T::key_width().narrow(key));
    }
}

pub struct DocumentStorage {
    base_path: PathBuf,
    config: StoreConfig,
    stores: HashMap<TypeId, Box<dyn Any>>,
}

impl DocumentStorage {
    pub fn open(base_path: &Path) -> Result<Self> {
        Self::with_config(base_path, StoreConfig::default())
    }

    pub fn with_config(base_path: &Path, config: StoreConfig) -> Result<Self> {
        std::fs::create_dir_all(base_path)?;
        Ok(Self {
            base_path: base_path.to_path_buf(),
            config,
            stores: HashMap::new(),
        })
    }

    /// Стор для типа T: строится при первом обращении, дальше — из кэша.
    pub fn repository<T: Document>(&mut self) -> Result<&mut RecordStore<T>> {
        let type_id = TypeId::of::<T>();
        if !self.stores.contains_key(&type_id) {
            let store: RecordStore<T> = RecordStore::open(
                &self.base_path,
                T::entity_name(),
                self.config.clone().with_entity_name(short_type_name::<T>()),
                Box::new(JsonSerializer::<T>::new()),
                Box::new(DocumentKey::<T>::new()),
            )?;
            self.stores.insert(type_id, Box::new(store));
        }
        self.stores
            .get_mut(&type_id)
            .and_then(|boxed| boxed.downcast_mut::<RecordStore<T>>())
            .ok_or_else(|| anyhow!("repository cache holds unexpected type for {}", short_type_name::<T>()))
    }

    pub fn add<T: Document>(&mut self, record: T) -> Result<T> {
        self.repository::<T>()?.create(record)
    }

    pub fn find<T: Document>(&mut self, key: i64) -> Result<Option<T>> {
        self.repository::<T>()?.read_by_key(key)
    }

    pub fn all<T: Document>(&mut self) -> Result<Vec<T>> {
        self.repository::<T>()?.read_all()
    }

    pub fn filter<T: Document, P>(&mut self, predicate: P) -> Result<Vec<T>>
    where
        P: Fn(&T) -> bool,
    {
        self.repository::<T>()?.filter(predicate)
    }

    pub fn update<T: Document>(&mut self, record: T) -> Result<T> {
        self.repository::<T>()?.update(record)
    }

    pub fn delete<T: Document>(&mut self, record: &T) -> Result<()> {
        self.repository::<T>()?.delete(record)
    }

    pub fn count<T: Document>(&mut self) -> Result<i64> {
        self.repository::<T>()?.count()
    }

    pub fn clear<T: Document>(&mut self) -> Result<()> {
        self.repository::<T>()?.clear()
    }
}
