//! Подключаемый кодек записей.
//!
//! Контракт симметрии: deserialize(serialize(x)) воспроизводит наблюдаемое
//! состояние x. Формат на диске кодеку безразличен — стор хранит payload как
//! непрозрачные байты.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

pub trait EntitySerializer<T>: Send + Sync {
    fn serialize(&self, record: &T) -> Result<Vec<u8>>;
    fn deserialize(&self, bytes: &[u8]) -> Result<T>;
}

/// Штатный кодек: JSON через serde_json.
pub struct JsonSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonSerializer<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntitySerializer<T> for JsonSerializer<T>
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, record: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(record).context("serialize record to JSON")
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).context("deserialize record from JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Probe {
        id: i64,
        name: String,
    }

    #[test]
    fn json_codec_is_symmetric() -> Result<()> {
        let codec = JsonSerializer::<Probe>::new();
        let probe = Probe {
            id: 3,
            name: "alpha".into(),
        };
        let bytes = codec.serialize(&probe)?;
        let back = codec.deserialize(&bytes)?;
        assert_eq!(back, probe);
        Ok(())
    }
}
