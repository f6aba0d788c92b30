//! redb environment wrapper.
//!
//! Owns the database handle and the single entries table. All access goes
//! through [`Engine::read`] and [`Engine::write`], which scope a closure to
//! exactly one transaction: a write commits when the closure returns `Ok`
//! and aborts otherwise.

use redb::{
    Database, ReadOnlyTable, ReadableDatabase, ReadableTableMetadata, Table, TableDefinition,
    WriteTransaction,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{DIR_MODE, FILE_MODE, StoreConfig, TABLE_NAME};
use crate::error::{Error, Result};

/// The single table holding every entry, keyed by raw key bytes.
pub(crate) const ENTRIES: TableDefinition<'static, &'static [u8], &'static [u8]> =
    TableDefinition::new(TABLE_NAME);

/// Read-only view of the entries table.
pub(crate) type EntriesRead = ReadOnlyTable<&'static [u8], &'static [u8]>;

/// Writable view of the entries table inside a write transaction.
pub(crate) type EntriesWrite<'txn> = Table<'txn, &'static [u8], &'static [u8]>;

/// Pages kept free under the bound for the bookkeeping a commit writes.
const COMMIT_RESERVE_PAGES: u64 = 8;

/// Opened storage environment.
pub struct Engine {
    db: Database,
    file: PathBuf,
    max_size: u64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("file", &self.file)
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Opens (or creates) the database described by `config`.
    ///
    /// Creates the storage directory when it does not exist and the entries
    /// table when the database is new.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The storage path exists but is not a directory
    /// - The directory or database file cannot be created
    /// - The table initialization transaction fails
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        ensure_dir(&config.path)?;

        let file = config.db_file();
        let mut builder = Database::builder();
        if let Some(cache_size) = config.cache_size {
            builder.set_cache_size(cache_size);
        }
        let db = builder.create(&file)?;
        set_file_mode(&file)?;

        // Create the table up front so read transactions can always open it
        let write_txn = db.begin_write()?;
        {
            let _table = write_txn.open_table(ENTRIES)?;
        }
        write_txn.commit()?;

        info!(
            file = %file.display(),
            max_size = config.max_size,
            "Opened cache database"
        );

        Ok(Self {
            db,
            file,
            max_size: config.max_size,
        })
    }

    /// Runs `f` against the entries table inside one read transaction.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&EntriesRead) -> Result<T>) -> Result<T> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES)?;
        f(&table)
    }

    /// Runs `f` against the entries table inside one write transaction.
    ///
    /// Commits if `f` succeeds, aborts if it fails. Blocks while another
    /// write transaction holds the writer slot.
    pub(crate) fn write<T>(&self, f: impl FnOnce(&mut EntriesWrite<'_>) -> Result<T>) -> Result<T> {
        self.run_write(false, f)
    }

    /// Like [`Engine::write`], but aborts with [`Error::StorageFull`] when the
    /// transaction leaves more than `max_size` bytes of pages allocated.
    pub(crate) fn write_bounded<T>(
        &self,
        f: impl FnOnce(&mut EntriesWrite<'_>) -> Result<T>,
    ) -> Result<T> {
        self.run_write(true, f)
    }

    fn run_write<T>(
        &self,
        bounded: bool,
        f: impl FnOnce(&mut EntriesWrite<'_>) -> Result<T>,
    ) -> Result<T> {
        let write_txn = self.db.begin_write()?;
        let result = {
            let mut table = write_txn.open_table(ENTRIES)?;
            f(&mut table)
        };
        let result = match result {
            Ok(value) if bounded => self.check_capacity(&write_txn).map(|()| value),
            other => other,
        };

        match result {
            Ok(value) => {
                write_txn.commit()?;
                Ok(value)
            },
            Err(err) => {
                if let Err(abort_err) = write_txn.abort() {
                    warn!(error = %abort_err, "Failed to abort write transaction");
                }
                Err(err)
            },
        }
    }

    /// Number of records in the entries table, expired ones included.
    pub fn entry_count(&self) -> Result<u64> {
        self.read(|table| Ok(table.len()?))
    }

    /// Bytes of database pages currently allocated.
    ///
    /// Space freed by deletes stops counting once a later commit releases
    /// it; the file itself never shrinks.
    ///
    /// # Errors
    ///
    /// Returns an error if a write transaction cannot be started.
    pub fn used_bytes(&self) -> Result<u64> {
        let write_txn = self.db.begin_write()?;
        let used = allocated_bytes(&write_txn);
        write_txn.abort()?;
        used
    }

    /// Fails with [`Error::StorageFull`] if the uncommitted state of
    /// `write_txn`, plus room for the commit itself, exceeds the bound.
    fn check_capacity(&self, write_txn: &WriteTransaction) -> Result<()> {
        let stats = write_txn.stats()?;
        let page_size = stats.page_size() as u64;
        let used = stats.allocated_pages() * page_size;
        let reserve = COMMIT_RESERVE_PAGES * page_size;

        if used.saturating_add(reserve) > self.max_size {
            debug!(used, reserve, limit = self.max_size, "Write rejected, storage full");
            return Err(Error::StorageFull {
                limit: self.max_size,
            });
        }
        Ok(())
    }

    /// Configured upper bound on allocated bytes.
    #[must_use]
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Path of the database file.
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }
}

fn allocated_bytes(write_txn: &WriteTransaction) -> Result<u64> {
    let stats = write_txn.stats()?;
    Ok(stats.allocated_pages() * stats.page_size() as u64)
}

/// Creates the storage directory if absent. An existing non-directory at the
/// path is left alone and reported.
fn ensure_dir(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(Error::NotADirectory {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let mut builder = fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                builder.mode(DIR_MODE);
            }
            builder.create(path).map_err(|e| {
                Error::io(format!("creating storage directory {}", path.display()), e)
            })
        },
        Err(e) => Err(Error::io(
            format!("inspecting storage directory {}", path.display()),
            e,
        )),
    }
}

#[cfg(unix)]
fn set_file_mode(file: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(file, fs::Permissions::from_mode(FILE_MODE))
        .map_err(|e| Error::io(format!("setting permissions on {}", file.display()), e))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn set_file_mode(_file: &Path) -> Result<()> {
    let _ = (DIR_MODE, FILE_MODE);
    Ok(())
}
