//! Persistent crawl state, one SQLite file per logical database
//!
//! The store treats a logical database as a SQLite file under the data
//! directory, attached on demand to a single hub connection and addressed
//! with qualified table names. The store itself performs no crawl logic;
//! it exposes the row operations the sessions and workers need. Callers
//! serialize access through the process-wide store mutex, so the store is
//! written as a plain single-writer object.

mod schema;

pub use schema::MAX_SITE_LENGTH;

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Database used when a client does not name one
pub const DEFAULT_DATABASE: &str = "webcrawler";

/// Maximum length of a logical database name
pub const MAX_DATABASE_NAME_LENGTH: usize = 63;

/// Store-level errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid database name: {0:?}")]
    InvalidDatabaseName(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Checks a logical database name against `[A-Za-z_][A-Za-z0-9_]*`, max 63
///
/// Names that pass are safe to splice into SQL as schema qualifiers and to
/// use as file names under the data directory.
pub fn is_valid_database_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_DATABASE_NAME_LENGTH {
        return false;
    }
    let mut chars = name.chars();
    let first = chars.next().unwrap();
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// SQLite-backed store for all logical databases
pub struct Store {
    conn: Connection,
    data_dir: PathBuf,
    attached: HashSet<String>,
}

impl Store {
    /// Opens a store rooted at `data_dir`, creating the directory if needed
    ///
    /// The hub connection itself holds no data; every table lives in an
    /// attached per-database file.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir)?;
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self {
            conn,
            data_dir: data_dir.to_path_buf(),
            attached: HashSet::new(),
        })
    }

    fn database_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.db"))
    }

    fn ensure_attached(&mut self, name: &str) -> StoreResult<()> {
        if !is_valid_database_name(name) {
            return Err(StoreError::InvalidDatabaseName(name.to_string()));
        }
        if self.attached.contains(name) {
            return Ok(());
        }

        let path = self.database_path(name);
        let path_str = path.to_string_lossy();
        self.conn.execute(
            &format!(r#"ATTACH DATABASE ?1 AS "{name}""#),
            params![path_str],
        )?;
        self.attached.insert(name.to_string());
        Ok(())
    }

    /// Creates the logical database `name` if it does not exist
    pub fn create_database(&mut self, name: &str) -> StoreResult<()> {
        self.ensure_attached(name)?;
        // Force the file into existence; ATTACH alone creates it lazily.
        self.conn
            .execute_batch(&format!(r#"PRAGMA "{name}".user_version = 0;"#))?;
        Ok(())
    }

    /// Drops the logical database `name` if it exists
    pub fn drop_database(&mut self, name: &str) -> StoreResult<()> {
        if !is_valid_database_name(name) {
            return Err(StoreError::InvalidDatabaseName(name.to_string()));
        }
        if self.attached.remove(name) {
            self.conn
                .execute(&format!(r#"DETACH DATABASE "{name}""#), [])?;
        }
        match std::fs::remove_file(self.database_path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Creates or replaces the crawl tables of `db`
    pub fn init_tables(&mut self, db: &str) -> StoreResult<()> {
        self.ensure_attached(db)?;
        schema::init_tables(&self.conn, db)
    }

    /// Inserts one unvisited seed row
    pub fn insert_seed(&mut self, db: &str, site: &str) -> StoreResult<()> {
        self.ensure_attached(db)?;
        self.conn.execute(
            &format!(r#"INSERT INTO "{db}".seeds (site, visited) VALUES (?1, 0)"#),
            params![site],
        )?;
        Ok(())
    }

    /// Claims up to `limit` unvisited seeds for crawling
    ///
    /// Each claimed seed is atomically marked visited and recorded in
    /// `sites` as a dedup witness, so no peer session can schedule it again.
    pub fn claim_seeds(&mut self, db: &str, limit: usize) -> StoreResult<Vec<String>> {
        self.ensure_attached(db)?;

        let tx = self.conn.transaction()?;
        let seeds: Vec<String> = {
            let mut stmt = tx.prepare(&format!(
                r#"SELECT site FROM "{db}".seeds WHERE visited = 0 LIMIT ?1"#
            ))?;
            let rows = stmt
                .query_map(params![limit as i64], |row| row.get(0))?
                .collect::<Result<_, _>>()?;
            rows
        };

        for site in &seeds {
            tx.execute(
                &format!(r#"UPDATE "{db}".seeds SET visited = 1 WHERE site = ?1"#),
                params![site],
            )?;
            tx.execute(
                &format!(r#"INSERT INTO "{db}".sites (site) VALUES (?1)"#),
                params![site],
            )?;
        }
        tx.commit()?;

        Ok(seeds)
    }

    /// Records `url` in `sites` unless it is already present or too long
    ///
    /// Returns `true` when the URL was new and should be crawled. The
    /// check-then-insert is race-free because all store access happens
    /// under the exclusive store guard.
    pub fn record_site_if_new(&mut self, db: &str, url: &str) -> StoreResult<bool> {
        if url.len() > MAX_SITE_LENGTH {
            return Ok(false);
        }
        self.ensure_attached(db)?;

        let exists: Option<i64> = self
            .conn
            .query_row(
                &format!(r#"SELECT 1 FROM "{db}".sites WHERE site = ?1"#),
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Ok(false);
        }

        self.conn.execute(
            &format!(r#"INSERT INTO "{db}".sites (site) VALUES (?1)"#),
            params![url],
        )?;
        Ok(true)
    }

    /// Persists the paused frontier, skipping URLs over the length bound
    pub fn save_state(&mut self, db: &str, urls: &[String]) -> StoreResult<()> {
        self.ensure_attached(db)?;

        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare(&format!(r#"INSERT INTO "{db}".state (site) VALUES (?1)"#))?;
            for url in urls {
                if url.len() <= MAX_SITE_LENGTH {
                    stmt.execute(params![url])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Drains the saved frontier: returns every `state` row and clears them
    pub fn take_state(&mut self, db: &str) -> StoreResult<Vec<String>> {
        self.ensure_attached(db)?;

        let tx = self.conn.transaction()?;
        let urls: Vec<String> = {
            let mut stmt = tx.prepare(&format!(r#"SELECT site FROM "{db}".state"#))?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<_, _>>()?;
            rows
        };
        tx.execute(&format!(r#"DELETE FROM "{db}".state"#), [])?;
        tx.commit()?;

        Ok(urls)
    }

    /// Counts rows in `sites`
    pub fn count_sites(&mut self, db: &str) -> StoreResult<u64> {
        self.count_rows(db, "sites")
    }

    /// Counts rows in `state`
    pub fn count_state(&mut self, db: &str) -> StoreResult<u64> {
        self.count_rows(db, "state")
    }

    /// Counts seeds still available to `start`
    pub fn count_unvisited_seeds(&mut self, db: &str) -> StoreResult<u64> {
        self.ensure_attached(db)?;
        let count: i64 = self.conn.query_row(
            &format!(r#"SELECT COUNT(*) FROM "{db}".seeds WHERE visited = 0"#),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_rows(&mut self, db: &str, table: &str) -> StoreResult<u64> {
        self.ensure_attached(db)?;
        let count: i64 = self.conn.query_row(
            &format!(r#"SELECT COUNT(*) FROM "{db}".{table}"#),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_database_name_validation() {
        assert!(is_valid_database_name("webcrawler"));
        assert!(is_valid_database_name("_x"));
        assert!(is_valid_database_name("Db_2"));
        assert!(is_valid_database_name(&"a".repeat(63)));

        assert!(!is_valid_database_name(""));
        assert!(!is_valid_database_name("1db"));
        assert!(!is_valid_database_name("my-db"));
        assert!(!is_valid_database_name("a b"));
        assert!(!is_valid_database_name("x; DROP TABLE sites"));
        assert!(!is_valid_database_name(&"a".repeat(64)));
    }

    #[test]
    fn test_create_database_materializes_file() {
        let (dir, mut store) = open_store();
        store.create_database("crawl").unwrap();
        assert!(dir.path().join("crawl.db").exists());
    }

    #[test]
    fn test_drop_database_removes_file() {
        let (dir, mut store) = open_store();
        store.create_database("crawl").unwrap();
        store.drop_database("crawl").unwrap();
        assert!(!dir.path().join("crawl.db").exists());

        // Dropping again is fine: drop database if exists.
        store.drop_database("crawl").unwrap();
    }

    #[test]
    fn test_invalid_name_is_rejected() {
        let (_dir, mut store) = open_store();
        let err = store.create_database("../escape").unwrap_err();
        assert!(matches!(err, StoreError::InvalidDatabaseName(_)));
    }

    #[test]
    fn test_claim_seeds_marks_visited_and_records_sites() {
        let (_dir, mut store) = open_store();
        store.create_database("crawl").unwrap();
        store.init_tables("crawl").unwrap();
        store.insert_seed("crawl", "http://a/").unwrap();
        store.insert_seed("crawl", "http://b/").unwrap();
        store.insert_seed("crawl", "http://c/").unwrap();

        let claimed = store.claim_seeds("crawl", 2).unwrap();
        assert_eq!(claimed.len(), 2);
        assert_eq!(store.count_unvisited_seeds("crawl").unwrap(), 1);
        assert_eq!(store.count_sites("crawl").unwrap(), 2);

        // Asking for more than remain returns what there is.
        let rest = store.claim_seeds("crawl", 10).unwrap();
        assert_eq!(rest.len(), 1);
        let none = store.claim_seeds("crawl", 10).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_record_site_deduplicates() {
        let (_dir, mut store) = open_store();
        store.create_database("crawl").unwrap();
        store.init_tables("crawl").unwrap();

        assert!(store.record_site_if_new("crawl", "http://a/").unwrap());
        assert!(!store.record_site_if_new("crawl", "http://a/").unwrap());
        assert_eq!(store.count_sites("crawl").unwrap(), 1);
    }

    #[test]
    fn test_single_quote_in_url_is_stored_verbatim() {
        let (_dir, mut store) = open_store();
        store.create_database("crawl").unwrap();
        store.init_tables("crawl").unwrap();

        let url = "http://example.com/o'reilly";
        assert!(store.record_site_if_new("crawl", url).unwrap());
        assert!(!store.record_site_if_new("crawl", url).unwrap());

        // The store survived and holds exactly one verbatim row.
        assert_eq!(store.count_sites("crawl").unwrap(), 1);
    }

    #[test]
    fn test_site_length_boundary() {
        let (_dir, mut store) = open_store();
        store.create_database("crawl").unwrap();
        store.init_tables("crawl").unwrap();

        let base = "http://e/";
        let exactly = format!("{base}{}", "a".repeat(MAX_SITE_LENGTH - base.len()));
        let over = format!("{base}{}", "a".repeat(MAX_SITE_LENGTH + 1 - base.len()));
        assert_eq!(exactly.len(), MAX_SITE_LENGTH);
        assert_eq!(over.len(), MAX_SITE_LENGTH + 1);

        assert!(store.record_site_if_new("crawl", &exactly).unwrap());
        assert!(!store.record_site_if_new("crawl", &over).unwrap());
        assert_eq!(store.count_sites("crawl").unwrap(), 1);

        store.save_state("crawl", &[exactly, over]).unwrap();
        assert_eq!(store.count_state("crawl").unwrap(), 1);
    }

    #[test]
    fn test_state_roundtrip_drains() {
        let (_dir, mut store) = open_store();
        store.create_database("crawl").unwrap();
        store.init_tables("crawl").unwrap();

        let urls = vec!["http://a/".to_string(), "http://b/".to_string()];
        store.save_state("crawl", &urls).unwrap();
        assert_eq!(store.count_state("crawl").unwrap(), 2);

        let mut recovered = store.take_state("crawl").unwrap();
        recovered.sort();
        assert_eq!(recovered, urls);
        assert_eq!(store.count_state("crawl").unwrap(), 0);

        assert!(store.take_state("crawl").unwrap().is_empty());
    }

    #[test]
    fn test_logical_databases_are_isolated() {
        let (_dir, mut store) = open_store();
        for db in ["one", "two"] {
            store.create_database(db).unwrap();
            store.init_tables(db).unwrap();
        }

        assert!(store.record_site_if_new("one", "http://a/").unwrap());
        // The same URL is new again on a different logical database.
        assert!(store.record_site_if_new("two", "http://a/").unwrap());
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = Store::open(dir.path()).unwrap();
            store.create_database("crawl").unwrap();
            store.init_tables("crawl").unwrap();
            store
                .save_state("crawl", &["http://a/".to_string()])
                .unwrap();
        }

        let mut store = Store::open(dir.path()).unwrap();
        let recovered = store.take_state("crawl").unwrap();
        assert_eq!(recovered, vec!["http://a/".to_string()]);
    }
}
