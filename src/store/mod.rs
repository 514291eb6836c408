//! RecordStore — таблица документов поверх трёх файлов:
//! `<table>.ndb` (заголовок + payload'ы), `<table>.idx` (живые слоты),
//! `<table>_deleted.idx` (tombstone'ы — free-list переиспользуемого места).
//!
//! Раскладка модуля:
//! - core — структура, открытие, header I/O, count/clear;
//! - crud — create/read_by_key/update/delete, переезд и переиспользование слотов;
//! - scan — полные проходы: read_all, страницы, фильтры.

mod core;
mod crud;
mod scan;

pub use self::core::RecordStore;

use anyhow::Result;

/// Единый контракт репозитория. Альтернативные бэкенды (снапшотные сторы,
/// внешние движки) реализуют ту же поверхность, позволяя менять хранилище
/// без правок вызывающего кода.
pub trait Repository<T> {
    fn create(&mut self, record: T) -> Result<T>;
    fn read_by_key(&mut self, key: i64) -> Result<Option<T>>;
    fn read_all(&mut self) -> Result<Vec<T>>;
    fn read_page(&mut self, page_index: usize, page_size: usize) -> Result<(Vec<T>, usize)>;
    fn filter<P>(&mut self, predicate: P) -> Result<Vec<T>>
    where
        P: Fn(&T) -> bool;
    fn filter_sorted<P, K, O>(
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
        O: Ord;
    fn contains<P>(&mut self, predicate: P) -> Result<bool>
    where
        P: Fn(&T) -> bool;
    fn count(&mut self) -> Result<i64>;
    fn update(&mut self, record: T) -> Result<T>;
    fn delete(&mut self, record: &T) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

impl<T> Repository<T> for RecordStore<T> {
    fn create(&mut self, record: T) -> Result<T> {
        RecordStore::create(self, record)
    }

    fn read_by_key(&mut self, key: i64) -> Result<Option<T>> {
        RecordStore::read_by_key(self, key)
    }

    fn read_all(&mut self) -> Result<Vec<T>> {
        RecordStore::read_all(self)
    }

    fn read_page(&mut self, page_index: usize, page_size: usize) -> Result<(Vec<T>, usize)> {
        RecordStore::read_page(self, page_index, page_size)
    }

    fn filter<P>(&mut self, predicate: P) -> Result<Vec<T>>
    where
        P: Fn(&T) -> bool,
    {
        RecordStore::filter(self, predicate)
    }

    fn filter_sorted<P, K, O>(
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
        RecordStore::filter_sorted(self, predicate, key_selector, ascending, page_index, page_size)
    }

    fn contains<P>(&mut self, predicate: P) -> Result<bool>
    where
        P: Fn(&T) -> bool,
    {
        RecordStore::contains(self, predicate)
    }

    fn count(&mut self) -> Result<i64> {
        RecordStore::count(self)
    }

    fn update(&mut self, record: T) -> Result<T> {
        RecordStore::update(self, record)
    }

    fn delete(&mut self, record: &T) -> Result<()> {
        RecordStore::delete(self, record)
    }

    fn clear(&mut self) -> Result<()> {
        RecordStore::clear(self)
    }
}
