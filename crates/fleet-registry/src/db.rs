use std::path::Path;

use rusqlite::Connection;
use tracing::debug;

use crate::RegistryError;

/// Scoped handle to an instance's own database.
///
/// Acquired just before use and released when the value drops, on every
/// exit path. Callers probing many instances must not cache these across
/// passes; each pass opens its own handle.
pub struct InstanceDb {
    conn: Connection,
}

impl InstanceDb {
    /// Open the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, RegistryError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, RegistryError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Number of tables the backend has provisioned so far.
    ///
    /// A cheap proxy for "has provisioning finished creating the schema";
    /// the prober treats any error here as the instance being unavailable.
    pub fn table_count(&self) -> Result<u64, RegistryError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    /// One-time migration cleanup: remove the obsolete `setting` row early
    /// provisioners left behind in `system_resource`.
    pub fn clear_legacy_setting(&self) -> Result<usize, RegistryError> {
        let removed = self
            .conn
            .execute("DELETE FROM system_resource WHERE name = 'setting'", [])?;
        if removed > 0 {
            debug!(removed, "removed legacy setting rows");
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for InstanceDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceDb").finish_non_exhaustive()
    }
}
