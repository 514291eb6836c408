//! Доступ к ключевому полю записи.
//!
//! Ключевое поле записи — целое (i16/i32/i64), канонически "Id". Способ его
//! чтения и записи — явный контракт, инжектируемый в стор при конструировании:
//! - FieldKey<T> — статический доступ через пару функций (типизированные записи);
//! - ValueKey — динамический поиск поля в serde_json::Value (документы без схемы).

use serde_json::Value;

/// Объявленная ширина целочисленного ключевого поля.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWidth {
    I16,
    I32,
    I64,
}

impl KeyWidth {
    /// Сузить значение до ширины поля (усекающий каст).
    #[inline]
    pub fn narrow(self, value: i64) -> i64 {
        match self {
            KeyWidth::I16 => value as i16 as i64,
            KeyWidth::I32 => value as i32 as i64,
            KeyWidth::I64 => value,
        }
    }
}

/// Контракт доступа к ключевому полю записи.
pub trait KeyAccessor<T>: Send + Sync {
    /// Имя ключевого поля (канонически "Id").
    fn field_name(&self) -> &str;

    /// Прочитать ключ, расширенный до i64. None — у записи нет такого
    /// целочисленного поля (стор поднимет MissingKeyField).
    fn get(&self, record: &T) -> Option<i64>;

    /// Записать ключ, суженный до объявленной ширины поля.
    fn set(&self, record: &mut T, key: i64);
}

/// Статический доступ к ключу типизированной записи через пару функций.
pub struct FieldKey<T> {
    name: String,
    width: KeyWidth,
    get: fn(&T) -> i64,
    set: fn(&mut T, i64),
}

impl<T> FieldKey<T> {
    pub fn new(name: &str, width: KeyWidth, get: fn(&T) -> i64, set: fn(&mut T, i64)) -> Self {
        Self {
            name: name.to_string(),
            width,
            get,
            set,
        }
    }

    /// Каноничный аксессор: поле "Id" шириной i64.
    pub fn id(get: fn(&T) -> i64, set: fn(&mut T, i64)) -> Self {
        Self::new("Id", KeyWidth::I64, get, set)
    }
}

impl<T> KeyAccessor<T> for FieldKey<T> {
    fn field_name(&self) -> &str {
        &self.name
    }

    fn get(&self, record: &T) -> Option<i64> {
        Some((self.get)(record))
    }

    fn set(&self, record: &mut T, key: i64) {
        (self.set)(record, self.width.narrow(key))
    }
}

/// Динамический доступ к ключу внутри JSON-объекта, имя поля — без учёта
/// регистра ASCII ("Id" == "id" == "ID").
pub struct ValueKey {
    name: String,
    width: KeyWidth,
}

impl ValueKey {
    pub fn new(name: &str, width: KeyWidth) -> Self {
        Self {
            name: name.to_string(),
            width,
        }
    }
}

impl Default for ValueKey {
    fn default() -> Self {
        Self::new("Id", KeyWidth::I64)
    }
}

impl KeyAccessor<Value> for ValueKey {
    fn field_name(&self) -> &str {
        &self.name
    }

    fn get(&self, record: &Value) -> Option<i64> {
        let obj = record.as_object()?;
        obj.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&self.name))
            .and_then(|(_, v)| v.as_i64())
    }

    fn set(&self, record: &mut Value, key: i64) {
        let value = self.width.narrow(key);
        if let Some(obj) = record.as_object_mut() {
            // сохраняем регистр имени, как оно записано в документе
            let existing = obj
                .keys()
                .find(|k| k.eq_ignore_ascii_case(&self.name))
                .cloned();
            let field = existing.unwrap_or_else(|| self.name.clone());
            obj.insert(field, Value::from(value));
        }
    }
}
