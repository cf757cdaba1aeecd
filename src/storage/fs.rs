//! Filesystem-backed storage index
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/.webdl-index.sqlite3                   entry catalog
//! <root>/<relative_path>/<display_name>         finalized content
//! <root>/<relative_path>/.pending-<id>-<name>   content while pending
//! ```
//!
//! The catalog is a SQLite database, so several processes may share one root:
//! ids come from `AUTOINCREMENT` and every state change is a single-row
//! statement.

use crate::core::media::Locator;
use crate::error::WebdlError;
use crate::storage::index::{Collection, ContentWriter, EntryAttributes, MediaEntry, MediaStore};
use crate::utils::filename::is_safe_filename;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Name of the entry catalog inside the root
pub const INDEX_FILE: &str = ".webdl-index.sqlite3";

const LOCATOR_SCHEME: &str = "media://";

/// How long a statement waits for another process holding the write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const ENTRY_COLUMNS: &str =
    "id, collection, display_name, mime_type, relative_path, pending, created_at";

/// Storage index kept as files under a root directory, catalogued in SQLite
pub struct FsMediaStore {
    root: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl FsMediaStore {
    /// Open (or create) a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, WebdlError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;

        let db_path = root.join(INDEX_FILE);
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, WebdlError> {
            let conn = Connection::open(&db_path)?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            init_schema(&conn)?;
            Ok(conn)
        })
        .await
        .map_err(|e| WebdlError::StorageIndex(format!("index task failed: {}", e)))??;
        debug!("Opened storage index at {:?}", root);

        Ok(Self {
            root,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run `f` against the catalog on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, WebdlError>
    where
        F: FnOnce(&mut Connection, &Path) -> Result<T, WebdlError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| WebdlError::StorageIndex("index connection poisoned".to_string()))?;
            f(&mut conn, &root)
        })
        .await
        .map_err(|e| WebdlError::StorageIndex(format!("index task failed: {}", e)))?
    }

    async fn pending_entry(&self, locator: &Locator) -> Result<MediaEntry, WebdlError> {
        let locator = locator.clone();
        self.with_conn(move |conn, _| require_pending(conn, &locator))
            .await
    }
}

fn init_schema(conn: &Connection) -> Result<(), WebdlError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS entries (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            collection      TEXT NOT NULL,
            display_name    TEXT NOT NULL,
            mime_type       TEXT NOT NULL,
            relative_path   TEXT NOT NULL,
            pending         INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_entries_collection ON entries(collection);",
    )?;
    Ok(())
}

fn locator_for(collection: Collection, id: i64) -> Locator {
    Locator::new(format!("{}{}/{}", LOCATOR_SCHEME, collection, id))
}

fn entry_id(locator: &Locator) -> Option<i64> {
    locator
        .as_str()
        .strip_prefix(LOCATOR_SCHEME)?
        .rsplit('/')
        .next()?
        .parse()
        .ok()
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<MediaEntry> {
    let id: i64 = row.get(0)?;
    let collection: String = row.get(1)?;
    let collection = Collection::parse(&collection).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown collection '{}'", collection).into(),
        )
    })?;
    let created_at: DateTime<Utc> = row.get(6)?;

    Ok(MediaEntry {
        locator: locator_for(collection, id),
        collection,
        attributes: EntryAttributes {
            display_name: row.get(2)?,
            mime_type: row.get(3)?,
            relative_path: row.get(4)?,
            pending: row.get(5)?,
        },
        created_at,
    })
}

fn find_entry(conn: &Connection, locator: &Locator) -> Result<Option<MediaEntry>, WebdlError> {
    let Some(id) = entry_id(locator) else {
        return Ok(None);
    };
    let entry = conn
        .query_row(
            &format!("SELECT {} FROM entries WHERE id = ?1", ENTRY_COLUMNS),
            params![id],
            entry_from_row,
        )
        .optional()?;
    // The collection segment must match too
    Ok(entry.filter(|e| &e.locator == locator))
}

fn require_pending(conn: &Connection, locator: &Locator) -> Result<MediaEntry, WebdlError> {
    let entry = find_entry(conn, locator)?
        .ok_or_else(|| WebdlError::StorageIndex(format!("unknown locator {}", locator)))?;
    if !entry.is_pending() {
        return Err(WebdlError::StorageIndex(format!(
            "{} is already finalized",
            locator
        )));
    }
    Ok(entry)
}

fn folder_of(root: &Path, attributes: &EntryAttributes) -> PathBuf {
    root.join(attributes.relative_path.trim_end_matches('/'))
}

fn visible_path(root: &Path, entry: &MediaEntry) -> PathBuf {
    folder_of(root, &entry.attributes).join(&entry.attributes.display_name)
}

fn pending_path(root: &Path, entry: &MediaEntry) -> PathBuf {
    let id = entry_id(&entry.locator).unwrap_or_default();
    folder_of(root, &entry.attributes)
        .join(format!(".pending-{}-{}", id, entry.attributes.display_name))
}

fn validate_attributes(attributes: &EntryAttributes) -> Result<(), WebdlError> {
    if !is_safe_filename(&attributes.display_name) {
        return Err(WebdlError::StorageIndex(format!(
            "invalid display name '{}'",
            attributes.display_name
        )));
    }

    let relative = Path::new(attributes.relative_path.trim_end_matches('/'));
    let only_plain_parts = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if attributes.relative_path.trim().is_empty() || !only_plain_parts {
        return Err(WebdlError::StorageIndex(format!(
            "invalid relative path '{}'",
            attributes.relative_path
        )));
    }
    Ok(())
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn create_pending(
        &self,
        collection: Collection,
        attributes: EntryAttributes,
    ) -> Result<Locator, WebdlError> {
        validate_attributes(&attributes)?;

        self.with_conn(move |conn, root| {
            conn.execute(
                "INSERT INTO entries (collection, display_name, mime_type, relative_path, pending, created_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5)",
                params![
                    collection.as_str(),
                    attributes.display_name,
                    attributes.mime_type,
                    attributes.relative_path,
                    Utc::now(),
                ],
            )?;
            let id = conn.last_insert_rowid();
            let entry = MediaEntry {
                locator: locator_for(collection, id),
                collection,
                attributes: EntryAttributes {
                    pending: true,
                    ..attributes
                },
                created_at: Utc::now(),
            };

            let placeholder = std::fs::create_dir_all(folder_of(root, &entry.attributes))
                .and_then(|()| std::fs::File::create(pending_path(root, &entry)).map(drop));
            if let Err(e) = placeholder {
                conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
                return Err(e.into());
            }

            debug!("Created pending entry {}", entry.locator);
            Ok(entry.locator)
        })
        .await
    }

    async fn open_output(&self, locator: &Locator) -> Result<ContentWriter, WebdlError> {
        let entry = self.pending_entry(locator).await?;
        let file = tokio::fs::File::create(pending_path(&self.root, &entry)).await?;
        Ok(Box::new(file))
    }

    async fn finalize(&self, locator: &Locator) -> Result<(), WebdlError> {
        let locator = locator.clone();
        self.with_conn(move |conn, root| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let entry = require_pending(&tx, &locator)?;

            let from = pending_path(root, &entry);
            let to = visible_path(root, &entry);
            if to.try_exists()? {
                return Err(WebdlError::StorageIndex(format!(
                    "{} already exists",
                    to.display()
                )));
            }

            tx.execute(
                "UPDATE entries SET pending = 0 WHERE id = ?1 AND pending = 1",
                params![entry_id(&locator)],
            )?;
            // Dropping the transaction on an error below rolls the row back
            std::fs::rename(&from, &to)?;
            if let Err(e) = tx.commit() {
                if let Err(undo) = std::fs::rename(&to, &from) {
                    warn!("Could not move {:?} back to pending: {}", to, undo);
                }
                return Err(e.into());
            }

            info!("Finalized {} at {:?}", locator, to);
            Ok(())
        })
        .await
    }

    async fn abort(&self, locator: &Locator) -> Result<(), WebdlError> {
        let locator = locator.clone();
        self.with_conn(move |conn, root| {
            let entry = require_pending(conn, &locator)?;

            match std::fs::remove_file(pending_path(root, &entry)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!("Pending content of {} was already gone", locator);
                }
                Err(e) => return Err(e.into()),
            }
            conn.execute(
                "DELETE FROM entries WHERE id = ?1 AND pending = 1",
                params![entry_id(&locator)],
            )?;

            debug!("Aborted pending entry {}", locator);
            Ok(())
        })
        .await
    }

    async fn entries(&self, collection: Collection) -> Result<Vec<MediaEntry>, WebdlError> {
        self.with_conn(move |conn, _| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM entries WHERE collection = ?1 ORDER BY id",
                ENTRY_COLUMNS
            ))?;
            let entries = stmt
                .query_map(params![collection.as_str()], entry_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
        .await
    }

    async fn content_path(&self, locator: &Locator) -> Option<PathBuf> {
        let lookup = locator.clone();
        match self
            .with_conn(move |conn, root| {
                Ok(find_entry(conn, &lookup)?
                    .filter(|e| !e.is_pending())
                    .map(|e| visible_path(root, &e)))
            })
            .await
        {
            Ok(path) => path,
            Err(e) => {
                warn!("Could not look up {}: {}", locator, e);
                None
            }
        }
    }
}
