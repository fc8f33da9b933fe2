//! SQLite-backed profile cache
//!
//! Provides a `ProfileStore` that keeps one `userpics` row per username and
//! upserts refreshed data in place.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::data::CachedProfile;

/// Errors that can occur when reading or writing the cache
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not determine a data directory")]
    NoDataDir,

    #[error("store lock poisoned")]
    Poisoned,
}

/// Maps a `userpics` row to a [`CachedProfile`].
///
/// NULL name or image columns become empty strings.
pub fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<CachedProfile> {
    Ok(CachedProfile {
        identity: row.get("username")?,
        display_name: row.get::<_, Option<String>>("name")?.unwrap_or_default(),
        image_url: row.get::<_, Option<String>>("image")?.unwrap_or_default(),
        blocked: row.get::<_, Option<bool>>("blocked")?.unwrap_or(false),
        refreshed_at: row.get("refreshdate")?,
    })
}

/// Keyed table of cached profiles
///
/// The connection sits behind a mutex so a single store can be shared between
/// concurrent resolutions. Upserts are a single `INSERT ... ON CONFLICT`
/// statement, so two writers for the same username never produce two rows.
#[derive(Debug)]
pub struct ProfileStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl ProfileStore {
    /// Opens or creates the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let store = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };
        store.create_schema()?;
        Ok(store)
    }

    /// Opens the database in the XDG-compliant data directory
    ///
    /// Uses `~/.local/share/ljpics/ljpics.db` on Linux, or the equivalent
    /// location on other platforms.
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(&Self::default_path().ok_or(StoreError::NoDataDir)?)
    }

    /// Default database location, if a home directory can be determined.
    pub fn default_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "ljpics")?;
        Some(project_dirs.data_dir().join("ljpics.db"))
    }

    /// Creates a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            path: None,
        };
        store.create_schema()?;
        Ok(store)
    }

    /// Path of the database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        self.lock()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS userpics (
                username    TEXT PRIMARY KEY,
                name        TEXT NOT NULL DEFAULT '',
                image       TEXT NOT NULL DEFAULT '',
                blocked     INTEGER NOT NULL DEFAULT 0,
                refreshdate INTEGER NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Reads the row for `username`.
    pub fn get(&self, username: &str) -> Result<Option<CachedProfile>, StoreError> {
        let conn = self.lock()?;
        let profile = conn
            .query_row(
                "SELECT username, name, image, blocked, refreshdate
                 FROM userpics WHERE username = ?1",
                params![username],
                profile_from_row,
            )
            .optional()?;
        Ok(profile)
    }

    /// Inserts the row or rewrites every mutable field of the existing one.
    pub fn upsert(&self, profile: &CachedProfile) -> Result<(), StoreError> {
        self.lock()?.execute(
            "INSERT INTO userpics (username, name, image, blocked, refreshdate)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(username) DO UPDATE SET
                name = excluded.name,
                image = excluded.image,
                blocked = excluded.blocked,
                refreshdate = MAX(userpics.refreshdate, excluded.refreshdate)",
            params![
                profile.identity,
                profile.display_name,
                profile.image_url,
                profile.blocked,
                profile.refreshed_at,
            ],
        )?;
        Ok(())
    }

    /// Like [`ProfileStore::upsert`], but leaves an existing blocked row
    /// untouched. The check and the write are one statement, so a block
    /// committed by another connection is never undone.
    ///
    /// Returns false if the row was blocked and nothing was written.
    pub fn upsert_unless_blocked(&self, profile: &CachedProfile) -> Result<bool, StoreError> {
        let changed = self.lock()?.execute(
            "INSERT INTO userpics (username, name, image, blocked, refreshdate)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(username) DO UPDATE SET
                name = excluded.name,
                image = excluded.image,
                blocked = excluded.blocked,
                refreshdate = MAX(userpics.refreshdate, excluded.refreshdate)
             WHERE userpics.blocked = 0",
            params![
                profile.identity,
                profile.display_name,
                profile.image_url,
                profile.blocked,
                profile.refreshed_at,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Number of cached rows.
    pub fn count_all(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM userpics", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Sets the administrative block flag. Returns false if no row exists.
    ///
    /// `refreshdate` is left alone so unblocking does not make a row look fresh.
    pub fn set_blocked(&self, username: &str, blocked: bool) -> Result<bool, StoreError> {
        let changed = self.lock()?.execute(
            "UPDATE userpics SET blocked = ?2 WHERE username = ?1",
            params![username, blocked],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn profile(identity: &str, name: &str, refreshed_at: i64) -> CachedProfile {
        CachedProfile {
            identity: identity.to_string(),
            display_name: name.to_string(),
            image_url: format!("http://example.com/{identity}.png"),
            blocked: false,
            refreshed_at,
        }
    }

    #[test]
    fn test_get_returns_none_for_missing_username() {
        let store = ProfileStore::open_in_memory().unwrap();
        assert!(store.get("nobody").unwrap().is_none());
        assert_eq!(store.count_all().unwrap(), 0);
    }

    #[test]
    fn test_upsert_inserts_then_updates_in_place() {
        let store = ProfileStore::open_in_memory().unwrap();

        store.upsert(&profile("jace", "First", 100)).unwrap();
        store.upsert(&profile("jace", "Second", 200)).unwrap();

        assert_eq!(store.count_all().unwrap(), 1);
        let row = store.get("jace").unwrap().unwrap();
        assert_eq!(row.display_name, "Second");
        assert_eq!(row.refreshed_at, 200);
    }

    #[test]
    fn test_upsert_rewrites_all_mutable_fields() {
        let store = ProfileStore::open_in_memory().unwrap();
        store.upsert(&profile("jace", "Jace", 100)).unwrap();

        store.upsert(&CachedProfile::empty("jace", 300)).unwrap();

        let row = store.get("jace").unwrap().unwrap();
        assert_eq!(row, CachedProfile::empty("jace", 300));
    }

    #[test]
    fn test_refreshdate_never_goes_backwards() {
        let store = ProfileStore::open_in_memory().unwrap();
        store.upsert(&profile("jace", "Newer", 500)).unwrap();
        store.upsert(&profile("jace", "Older", 400)).unwrap();

        let row = store.get("jace").unwrap().unwrap();
        assert_eq!(row.refreshed_at, 500);
        assert_eq!(row.display_name, "Older");
    }

    #[test]
    fn test_set_blocked() {
        let store = ProfileStore::open_in_memory().unwrap();
        assert!(!store.set_blocked("jace", true).unwrap());

        store.upsert(&profile("jace", "Jace", 100)).unwrap();
        assert!(store.set_blocked("jace", true).unwrap());

        let row = store.get("jace").unwrap().unwrap();
        assert!(row.blocked);
        assert_eq!(row.refreshed_at, 100);

        store.set_blocked("jace", false).unwrap();
        assert!(!store.get("jace").unwrap().unwrap().blocked);
    }

    #[test]
    fn test_upsert_unless_blocked() {
        let store = ProfileStore::open_in_memory().unwrap();

        assert!(store.upsert_unless_blocked(&profile("jace", "Jace", 100)).unwrap());
        assert!(store.upsert_unless_blocked(&profile("jace", "Jace 2", 200)).unwrap());
        assert_eq!(store.get("jace").unwrap().unwrap().display_name, "Jace 2");

        store.set_blocked("jace", true).unwrap();
        assert!(!store.upsert_unless_blocked(&profile("jace", "Jace 3", 300)).unwrap());

        let row = store.get("jace").unwrap().unwrap();
        assert!(row.blocked);
        assert_eq!(row.display_name, "Jace 2");
        assert_eq!(row.refreshed_at, 200);
    }

    #[test]
    fn test_block_from_another_connection_survives_refresh_write() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("ljpics.db");
        let refresher = ProfileStore::open(&path).unwrap();
        let admin = ProfileStore::open(&path).unwrap();

        refresher.upsert(&profile("spam", "Spam", 100)).unwrap();
        assert!(!refresher.get("spam").unwrap().unwrap().blocked);

        // Blocked between the refresher's read and its write
        assert!(admin.set_blocked("spam", true).unwrap());
        let written = refresher
            .upsert_unless_blocked(&profile("spam", "Spam v2", 200))
            .unwrap();

        assert!(!written);
        let row = admin.get("spam").unwrap().unwrap();
        assert!(row.blocked);
        assert_eq!(row.display_name, "Spam");
        assert_eq!(row.refreshed_at, 100);
    }

    #[test]
    fn test_open_creates_file_and_persists() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("nested").join("ljpics.db");

        {
            let store = ProfileStore::open(&path).unwrap();
            store.upsert(&profile("jace", "Jace", 100)).unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
        }

        assert!(path.exists(), "Database file should exist");
        let reopened = ProfileStore::open(&path).unwrap();
        assert_eq!(reopened.get("jace").unwrap().unwrap().display_name, "Jace");
    }

    #[test]
    fn test_profile_from_row_maps_nulls_to_empty() {
        let store = ProfileStore::open_in_memory().unwrap();
        store
            .lock()
            .unwrap()
            .execute_batch(
                "CREATE TABLE legacy (username TEXT, name TEXT, image TEXT, blocked INTEGER, refreshdate INTEGER);
                 INSERT INTO legacy VALUES ('old', NULL, NULL, NULL, 7);",
            )
            .unwrap();

        let row = store
            .lock()
            .unwrap()
            .query_row("SELECT * FROM legacy", [], profile_from_row)
            .unwrap();

        assert_eq!(row, CachedProfile::empty("old", 7));
    }

    #[test]
    fn test_concurrent_upserts_keep_one_row_per_username() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(ProfileStore::open(&temp_dir.path().join("ljpics.db")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store.upsert(&profile("jace", &format!("writer {i}"), 100 + i)).unwrap();
                    store.upsert(&profile(&format!("user{i}"), "other", 100)).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.count_all().unwrap(), 9);
        assert_eq!(store.get("jace").unwrap().unwrap().refreshed_at, 107);
    }
}
