//! Конфигурация стора: одно место для тюнинга вместо разбросанных env-lookup.
//!
//! StoreConfig::from_env() читает те же переменные, что и builder-методы:
//! - NDB_PADDING_FACTOR — процент паддинга (100 = без паддинга, 150 = +50%;
//!   0 отключает паддинг; default 0)

/// Конфигурация одной таблицы RecordStore.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Фактор паддинга в процентах. 0 (или <= 1) — без паддинга;
    /// 150 — каждой записи резервируется +50% её длины под рост.
    /// Env: NDB_PADDING_FACTOR (default 0)
    pub padding_factor_percent: i32,

    /// Переопределение entity name для проверки типа записи.
    /// None — используется короткое имя Rust-типа записи.
    pub entity_name: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            padding_factor_percent: 0,
            entity_name: None,
        }
    }
}

impl StoreConfig {
    /// Конфигурация из окружения; нераспознанные значения падают в default.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(s) = std::env::var("NDB_PADDING_FACTOR") {
            if let Ok(v) = s.trim().parse::<i32>() {
                cfg.padding_factor_percent = v;
            }
        }
        cfg
    }

    pub fn with_padding_factor(mut self, percent: i32) -> Self {
        self.padding_factor_percent = percent;
        self
    }

    pub fn with_entity_name(mut self, name: &str) -> Self {
        self.entity_name = Some(name.to_string());
        self
    }
}
