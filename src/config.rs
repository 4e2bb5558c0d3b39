//! Store configuration.

use crate::task::domain::TaskIdentityKey;
use std::path::{Path, PathBuf};

/// Database location used when nothing else is configured.
pub const DEFAULT_DATABASE: &str = "sqlite.db";

/// Location accepted as "keep everything in RAM".
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Environment variable naming the database location.
pub const DATABASE_ENV: &str = "CHOREZ_DB_SQLITE_DATABASE";

/// Environment variable overriding the connection pool size.
pub const POOL_SIZE_ENV: &str = "CHOREZ_DB_POOL_SIZE";

const DEFAULT_POOL_SIZE: u32 = 4;
const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5_000;

/// Where the embedded database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// File-backed database.
    File(PathBuf),
    /// Ephemeral database that lives as long as the store handle.
    InMemory,
}

impl DatabaseLocation {
    /// Parses a configured location; `:memory:` selects the ephemeral mode.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == IN_MEMORY_DATABASE {
            Self::InMemory
        } else {
            Self::File(PathBuf::from(raw))
        }
    }

    /// Returns the connection string handed to `SQLite`.
    #[must_use]
    pub fn connection_string(&self) -> String {
        match self {
            Self::File(path) => path.to_string_lossy().into_owned(),
            Self::InMemory => IN_MEMORY_DATABASE.to_owned(),
        }
    }
}

/// Settings for opening the task store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    location: DatabaseLocation,
    pool_size: u32,
    busy_timeout_ms: u32,
    identity_key: TaskIdentityKey,
}

impl StoreConfig {
    /// Configuration for a file-backed database.
    #[must_use]
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::new(DatabaseLocation::File(path.as_ref().to_path_buf()))
    }

    /// Configuration for an ephemeral in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(DatabaseLocation::InMemory)
    }

    /// Configuration for an explicit location.
    #[must_use]
    pub const fn new(location: DatabaseLocation) -> Self {
        Self {
            location,
            pool_size: DEFAULT_POOL_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            identity_key: TaskIdentityKey::full(),
        }
    }

    /// Sets the maximum number of pooled connections (at least one).
    #[must_use]
    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    /// Sets how long a writer waits for the database lock.
    #[must_use]
    pub const fn with_busy_timeout_ms(mut self, busy_timeout_ms: u32) -> Self {
        self.busy_timeout_ms = busy_timeout_ms;
        self
    }

    /// Sets the fields that decide task identity.
    #[must_use]
    pub const fn with_identity_key(mut self, identity_key: TaskIdentityKey) -> Self {
        self.identity_key = identity_key;
        self
    }

    /// Returns the database location.
    #[must_use]
    pub const fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    /// Effective pool size; an in-memory database is a single connection
    /// so every operation sees the same data.
    #[must_use]
    pub const fn pool_size(&self) -> u32 {
        match self.location {
            DatabaseLocation::InMemory => 1,
            DatabaseLocation::File(_) => self.pool_size,
        }
    }

    /// Returns the lock wait in milliseconds.
    #[must_use]
    pub const fn busy_timeout_ms(&self) -> u32 {
        self.busy_timeout_ms
    }

    /// Returns the task identity key.
    #[must_use]
    pub const fn identity_key(&self) -> TaskIdentityKey {
        self.identity_key
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::file(DEFAULT_DATABASE)
    }
}
