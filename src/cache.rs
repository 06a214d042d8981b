use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;

use crate::identity::CanonicalId;

// Cache namespaces. Each key holds one whole collection as a JSON array,
// scoped per user: `<namespace>_<canonical id>`.
pub const ARCHIVED_MATCHES: &str = "archivedCompanies";
pub const ACCEPTED_MATCHES: &str = "acceptedCompanies";
pub const APPLIED_SLOTS: &str = "appliedInternships";
pub const SHORTLIST: &str = "shortlistedStudents";

/// Durable per-user key-value store backing optimistic state. The backend
/// stays authoritative for everything in here; this is a possibly-stale
/// replica used to bridge backend unavailability and skip redundant
/// fetches.
pub struct CacheStore {
    conn: Connection,
    path: PathBuf,
}

impl CacheStore {
    pub fn open() -> Result<Self> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        Ok(Self { conn, path })
    }

    /// In-memory store for tests.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            path: PathBuf::from(":memory:"),
        };
        store.init()?;
        Ok(store)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> Result<PathBuf> {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "stint") {
            Ok(proj_dirs.data_dir().join("stint.db"))
        } else {
            Ok(PathBuf::from("stint.db"))
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn key(namespace: &str, user: &CanonicalId) -> String {
        format!("{}_{}", namespace, user.as_str())
    }

    /// Load a whole collection. Absent key, storage error, and malformed
    /// JSON all come back as an empty list; a bad cache must never take
    /// the client down.
    pub fn load<T: DeserializeOwned>(&self, namespace: &str, user: &CanonicalId) -> Vec<T> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                [Self::key(namespace, user)],
                |row| row.get(0),
            )
            .ok();

        match raw {
            Some(json) => serde_json::from_str(&json).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Overwrite a whole collection. Merging happens one layer up; this
    /// layer only replaces. Storage failure is swallowed: the in-memory
    /// state stays authoritative for the session and the next transition's
    /// save retries naturally.
    pub fn save<T: Serialize>(&self, namespace: &str, user: &CanonicalId, items: &[T]) {
        let json = match serde_json::to_string(items) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("warning: failed to serialize {} cache: {}", namespace, e);
                return;
            }
        };

        if let Err(e) = self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            [Self::key(namespace, user), json],
        ) {
            eprintln!("warning: failed to persist {} cache: {}", namespace, e);
        }
    }

    /// Raw write, bypassing serialization. Test hook for seeding corrupt
    /// entries.
    #[cfg(test)]
    pub(crate) fn write_raw(&self, namespace: &str, user: &CanonicalId, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            [Self::key(namespace, user), value.to_string()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{RawUser, canonical_id};

    fn uid(id: &str) -> CanonicalId {
        canonical_id(&RawUser {
            user_id: Some(id.to_string()),
            record_id: None,
            name: None,
        })
        .unwrap()
    }

    #[test]
    fn test_load_absent_namespace_is_empty() {
        let store = CacheStore::open_in_memory().unwrap();
        let slots: Vec<String> = store.load(APPLIED_SLOTS, &uid("s1"));
        assert!(slots.is_empty());
    }

    #[test]
    fn test_save_overwrites_whole_collection() {
        let store = CacheStore::open_in_memory().unwrap();
        let user = uid("s1");

        store.save(APPLIED_SLOTS, &user, &["a".to_string(), "b".to_string()]);
        store.save(APPLIED_SLOTS, &user, &["c".to_string()]);

        let slots: Vec<String> = store.load(APPLIED_SLOTS, &user);
        assert_eq!(slots, vec!["c".to_string()]);
    }

    #[test]
    fn test_corrupt_json_treated_as_empty() {
        let store = CacheStore::open_in_memory().unwrap();
        let user = uid("s1");

        store.write_raw(ARCHIVED_MATCHES, &user, "{not json]").unwrap();

        let archived: Vec<String> = store.load(ARCHIVED_MATCHES, &user);
        assert!(archived.is_empty());
    }

    #[test]
    fn test_wrong_shape_json_treated_as_empty() {
        let store = CacheStore::open_in_memory().unwrap();
        let user = uid("s1");

        // Valid JSON, but an object where an array is expected.
        store.write_raw(APPLIED_SLOTS, &user, r#"{"slot":"a"}"#).unwrap();

        let slots: Vec<String> = store.load(APPLIED_SLOTS, &user);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_namespaces_scoped_per_user() {
        let store = CacheStore::open_in_memory().unwrap();

        store.save(APPLIED_SLOTS, &uid("s1"), &["a".to_string()]);

        let other: Vec<String> = store.load(APPLIED_SLOTS, &uid("s2"));
        assert!(other.is_empty());

        let own: Vec<String> = store.load(APPLIED_SLOTS, &uid("s1"));
        assert_eq!(own, vec!["a".to_string()]);
    }
}
