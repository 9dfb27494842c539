//! SQLite-backed document store.
//!
//! Each product and category is stored as a JSON document next to a unique
//! identity-key column, which is what makes identity upserts safe to replay.

use crate::error::{StorageError, StorageResult};
use crate::store::{
    CatalogStore, DeleteOutcome, UpsertOutcome, category_key, plan_category_upsert,
    plan_product_upsert, product_key,
};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use storefront_model::{Category, Product};
use storefront_types::{IdentityKey, RecordId};
use tracing::debug;

/// Persistent catalog store backed by a single SQLite file.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            StorageError::Unavailable(format!("failed to open {}: {e}", path.display()))
        })?;
        debug!("Opened catalog store at {}", path.display());
        Self::from_connection(conn)
    }

    /// Opens an in-memory store (for testing and dry runs).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                identity_key TEXT NOT NULL UNIQUE,
                document TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                identity_key TEXT NOT NULL UNIQUE,
                document TEXT NOT NULL
            );
            ",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs a blocking closure against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StorageError::Unavailable("connection lock poisoned".into()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

fn load_documents<T: serde::de::DeserializeOwned>(
    conn: &Connection,
    table: &str,
) -> StorageResult<Vec<T>> {
    let mut stmt = conn.prepare(&format!("SELECT document FROM {table} ORDER BY rowid"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut result = Vec::new();
    for row in rows {
        result.push(serde_json::from_str(&row?)?);
    }
    Ok(result)
}

fn load_document<T: serde::de::DeserializeOwned>(
    conn: &Connection,
    table: &str,
    key: &IdentityKey,
) -> StorageResult<Option<T>> {
    let document: Option<String> = conn
        .query_row(
            &format!("SELECT document FROM {table} WHERE identity_key = ?1"),
            params![key.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    document
        .map(|d| serde_json::from_str(&d).map_err(Into::into))
        .transpose()
}

fn write_document(
    conn: &Connection,
    table: &str,
    key: &IdentityKey,
    document: &str,
) -> StorageResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO {table} (id, identity_key, document) VALUES (?1, ?2, ?3)
             ON CONFLICT(identity_key) DO UPDATE SET document = excluded.document"
        ),
        params![RecordId::new().to_string(), key.as_str(), document],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(code, msg)
            if code.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::Constraint(msg.unwrap_or_else(|| format!("{table}: {key}")))
        }
        other => StorageError::Database(other),
    })?;
    Ok(())
}

#[async_trait]
impl CatalogStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    async fn find_all(&self) -> StorageResult<Vec<Product>> {
        self.with_conn(|conn| load_documents(conn, "products")).await
    }

    async fn upsert_by_identity(&self, product: &Product) -> StorageResult<UpsertOutcome> {
        let key = product_key(product)?;
        let incoming = product.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let existing: Option<Product> = load_document(&tx, "products", &key)?;
            let (outcome, record) = plan_product_upsert(existing.as_ref(), &incoming, Utc::now());
            if let Some(record) = record {
                write_document(&tx, "products", &key, &serde_json::to_string(&record)?)?;
            }
            tx.commit()?;
            Ok(outcome)
        })
        .await
    }

    async fn delete_by_identity(&self, key: &IdentityKey) -> StorageResult<DeleteOutcome> {
        let key = key.clone();
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM products WHERE identity_key = ?1",
                params![key.as_str()],
            )?;
            Ok(if removed > 0 {
                DeleteOutcome::Deleted
            } else {
                DeleteOutcome::Missing
            })
        })
        .await
    }

    async fn find_categories(&self) -> StorageResult<Vec<Category>> {
        self.with_conn(|conn| load_documents(conn, "categories")).await
    }

    async fn upsert_category(&self, category: &Category) -> StorageResult<UpsertOutcome> {
        let key = category_key(category)?;
        let incoming = category.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let existing: Option<Category> = load_document(&tx, "categories", &key)?;
            let (outcome, record) =
                plan_category_upsert(existing.as_ref(), &incoming, Utc::now());
            if let Some(record) = record {
                write_document(&tx, "categories", &key, &serde_json::to_string(&record)?)?;
            }
            tx.commit()?;
            Ok(outcome)
        })
        .await
    }
}
