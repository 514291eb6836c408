//! Минимальный CLI: админ/отладка таблиц BlobDB поверх JSON-документов.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use log::error;
use serde_json::Value;
use std::path::PathBuf;

use BlobDB::keys::{KeyAccessor, ValueKey};
use BlobDB::store::RecordStore;
use BlobDB::StoreConfig;

#[derive(Parser, Debug)]
#[command(name = "blobdb", version, about = "BlobDB CLI (JSON documents)")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Store a JSON document (auto-increment key when "Id" is 0 or absent)
    Put {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        table: String,
        /// Документ как JSON-объект, например '{"name":"alpha"}'
        #[arg(long)]
        json: String,
    },
    /// Get a document by key
    Get {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        table: String,
        #[arg(long)]
        key: i64,
    },
    /// Overwrite an existing document (requires "Id" in the JSON)
    Update {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        table: String,
        #[arg(long)]
        json: String,
    },
    /// Delete a document by key
    Del {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        table: String,
        #[arg(long)]
        key: i64,
    },
    /// Print all live documents (JSONL)
    Scan {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        table: String,
    },
    /// Print the authoritative record count
    Count {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        table: String,
    },
    /// Header fields and file sizes of the table
    Status {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        table: String,
    },
    /// Remove the table's data and index files
    Destroy {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        table: String,
    },
}

fn init_logger() {
    // Уровень из RUST_LOG, иначе info.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        error!("{:?}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Put { path, table, json } => {
            let mut doc: Value =
                serde_json::from_str(&json).context("parse --json as a JSON document")?;
            let obj = doc
                .as_object_mut()
                .ok_or_else(|| anyhow!("--json must be a JSON object"))?;
            // без ключа — автоинкремент
            if !obj.keys().any(|k| k.eq_ignore_ascii_case("Id")) {
                obj.insert("Id".to_string(), Value::from(0));
            }
            let mut store = open_store(&path, &table)?;
            let saved = store.create(doc)?;
            let key = ValueKey::default()
                .get(&saved)
                .ok_or_else(|| anyhow!("stored document lost its key"))?;
            println!("OK key={}", key);
            println!("{}", saved);
        }
        Cmd::Get { path, table, key } => {
            let mut store = open_store(&path, &table)?;
            match store.read_by_key(key)? {
                Some(doc) => println!("{}", doc),
                None => println!("NOT FOUND key={}", key),
            }
        }
        Cmd::Update { path, table, json } => {
            let doc: Value =
                serde_json::from_str(&json).context("parse --json as a JSON document")?;
            let mut store = open_store(&path, &table)?;
            let saved = store.update(doc)?;
            println!("OK");
            println!("{}", saved);
        }
        Cmd::Del { path, table, key } => {
            let mut store = open_store(&path, &table)?;
            match store.read_by_key(key)? {
                Some(doc) => {
                    store.delete(&doc)?;
                    println!("DELETED key={}", key);
                }
                None => println!("NOT FOUND key={}", key),
            }
        }
        Cmd::Scan { path, table } => {
            let mut store = open_store(&path, &table)?;
            for doc in store.read_all()? {
                println!("{}", doc);
            }
        }
        Cmd::Count { path, table } => {
            let mut store = open_store(&path, &table)?;
            println!("{}", store.count()?);
        }
        Cmd::Status { path, table } => {
            let mut store = open_store(&path, &table)?;
            let header = store.header()?;
            println!("table:             {}", store.table());
            println!("record_count:      {}", header.record_count);
            println!("last_record_id:    {}", header.last_record_id);
            println!("largest_record_id: {}", header.largest_record_id);
            for p in [
                store.data_path(),
                store.index_path(),
                store.deleted_index_path(),
            ] {
                let size = std::fs::metadata(p).map(|m| m.len()).unwrap_or(0);
                println!("{}: {} B", p.display(), size);
            }
        }
        Cmd::Destroy { path, table } => {
            let mut store = open_store(&path, &table)?;
            store.clear()?;
            println!("DESTROYED table '{}'", table);
        }
    }
    Ok(())
}

fn open_store(path: &std::path::Path, table: &str) -> Result<RecordStore<Value>> {
    RecordStore::open_json(
        path,
        table,
        StoreConfig::from_env(),
        Box::new(ValueKey::default()),
    )
}
