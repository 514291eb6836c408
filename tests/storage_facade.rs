use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use BlobDB::store::RecordStore;
use BlobDB::{Document, DocumentStorage};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct User {
    id: i64,
    name: String,
}

impl Document for User {
    fn key(&self) -> i64 {
        self.id
    }
    fn set_key(&mut self, key: i64) {
        self.id = key;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Order {
    id: i64,
    user_id: i64,
    total_cents: i64,
}

impl Document for Order {
    fn key(&self) -> i64 {
        self.id
    }
    fn set_key(&mut self, key: i64) {
        self.id = key;
    }
}

fn user(name: &str) -> User {
    User {
        id: 0,
        name: name.to_string(),
    }
}

fn order(user_id: i64, total_cents: i64) -> Order {
    Order {
        id: 0,
        user_id,
        total_cents,
    }
}

#[test]
fn add_find_update_delete_through_facade() -> Result<()> {
    let root = unique_root("facade");
    let mut storage = DocumentStorage::open(&root)?;

    let alice = storage.add(user("alice"))?;
    assert_eq!(alice.id, 1);

    let found: User = storage.find(1)?.expect("alice must exist");
    assert_eq!(found.name, "alice");

    storage.update(User {
        id: 1,
        name: "alicia".into(),
    })?;
    let found: User = storage.find(1)?.expect("alice must exist");
    assert_eq!(found.name, "alicia");

    storage.delete(&found)?;
    assert!(storage.find::<User>(1)?.is_none());
    assert_eq!(storage.count::<User>()?, 0);

    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn types_get_isolated_tables() -> Result<()> {
    let root = unique_root("tables");
    let mut storage = DocumentStorage::open(&root)?;

    let bob = storage.add(user("bob"))?;
    storage.add(order(bob.id, 1200))?;
    storage.add(order(bob.id, 3400))?;

    // каждая таблица считает свои ключи с единицы
    assert_eq!(storage.count::<User>()?, 1);
    assert_eq!(storage.count::<Order>()?, 2);
    assert!(storage.find::<Order>(1)?.is_some());

    // файлы таблиц названы по типу записи
    assert!(root.join("User.ndb").exists());
    assert!(root.join("Order.ndb").exists());
    assert!(root.join("Order.idx").exists());

    let bobs_orders = storage.filter::<Order, _>(|o| o.user_id == bob.id)?;
    assert_eq!(bobs_orders.len(), 2);

    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn facade_state_survives_reopen() -> Result<()> {
    let root = unique_root("reopen");
    {
        let mut storage = DocumentStorage::open(&root)?;
        storage.add(user("carol"))?;
        storage.add(user("dave"))?;
    }

    let mut storage = DocumentStorage::open(&root)?;
    let all: Vec<User> = storage.all()?;
    assert_eq!(all.len(), 2);
    let next = storage.add(user("erin"))?;
    assert_eq!(next.id, 3);

    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn repository_is_built_once_per_type() -> Result<()> {
    let root = unique_root("cache");
    let mut storage = DocumentStorage::open(&root)?;

    // повторные обращения отдают тот же экземпляр стора, не переоткрытие
    let first = storage.repository::<User>()? as *const RecordStore<User>;
    let second = storage.repository::<User>()? as *const RecordStore<User>;
    assert_eq!(first, second);

    // запись через взятый напрямую стор видна через фасад: общее состояние
    let repo = storage.repository::<User>()?;
    let grace = repo.create(user("grace"))?;
    assert_eq!(storage.find::<User>(grace.id)?.map(|u| u.name), Some("grace".into()));

    // другой тип — другой стор
    let other = storage.repository::<Order>()? as *const RecordStore<Order>;
    assert_ne!(other as usize, first as usize);

    fs::remove_dir_all(&root)?;
    Ok(())
}

#[test]
fn clear_drops_a_single_table() -> Result<()> {
    let root = unique_root("clear");
    let mut storage = DocumentStorage::open(&root)?;

    storage.add(user("frank"))?;
    storage.add(order(1, 500))?;

    storage.clear::<User>()?;
    assert!(!root.join("User.ndb").exists());
    assert!(!root.join("User.idx").exists());
    assert_eq!(storage.count::<User>()?, 0);
    // соседняя таблица не тронута
    assert_eq!(storage.count::<Order>()?, 1);

    fs::remove_dir_all(&root)?;
    Ok(())
}

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("ndb-{}-{}-{}", prefix, pid, t))
}
