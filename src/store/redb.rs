//! Redb-backed cache handler.
//!
//! Every operation is scoped to exactly one redb transaction and runs on the
//! blocking thread pool. redb allows one writer at a time alongside any
//! number of snapshot readers, so no extra locking happens here.

use async_trait::async_trait;
use redb::ReadableTable;
use std::sync::Arc;
use tracing::debug;

use super::backend::CacheHandler;
use super::engine::{Engine, EntriesRead, EntriesWrite};
use super::entry::{Entry, rewrite_expiration};
use super::expiry::{self, compute_expiration};
use super::lookup::{self, Lookup, LookupSink};
use super::reaper::{self, Reaper, SweepReport};
use super::types::{
    DeleteRequest, GatRequest, GetEResponse, GetKey, GetRequest, GetResponse, SetRequest,
    TouchRequest,
};
use crate::config::StoreConfig;
use crate::error::{Error, Result, translate};

/// Where new bytes go relative to the stored payload.
#[derive(Debug, Clone, Copy)]
enum Splice {
    Append,
    Prepend,
}

/// Cache handler over a redb database, with its reaper.
///
/// Cloning is cheap and every clone shares the same database and reaper.
#[derive(Clone, Debug)]
pub struct RedbHandler {
    engine: Arc<Engine>,
    reaper: Arc<Reaper>,
}

impl RedbHandler {
    /// Opens the database described by `config` and starts its reaper.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the storage
    /// directory cannot be prepared, or the database cannot be opened.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let engine_config = config.clone();
        let engine = tokio::task::spawn_blocking(move || Engine::open(&engine_config)).await??;
        Ok(Self::with_engine(Arc::new(engine), config))
    }

    /// Wraps an already opened engine and starts its reaper.
    pub fn with_engine(engine: Arc<Engine>, config: &StoreConfig) -> Self {
        let reaper = Reaper::spawn(Arc::clone(&engine), config.reap_interval());
        Self {
            engine,
            reaper: Arc::new(reaper),
        }
    }

    /// Number of stored records, including expired ones not yet reaped.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    pub async fn entry_count(&self) -> Result<u64> {
        self.blocking("stats", |engine| engine.entry_count()).await
    }

    /// Bytes of database pages in use, measured the way writes are bounded.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    pub async fn used_bytes(&self) -> Result<u64> {
        self.blocking("stats", |engine| engine.used_bytes()).await
    }

    /// Runs one reaper sweep now, independent of the periodic schedule.
    ///
    /// # Errors
    ///
    /// Returns the storage failure that aborted the sweep.
    pub async fn sweep_now(&self) -> Result<SweepReport> {
        self.blocking("sweep", |engine| reaper::sweep(engine, expiry::now))
            .await
    }

    /// Stops the reaper after its current sweep. Operations keep working.
    pub async fn shutdown(&self) {
        self.reaper.stop().await;
    }

    /// Whether the periodic reaper is still running.
    pub fn reaper_running(&self) -> bool {
        self.reaper.is_running()
    }

    /// Shared engine handle.
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Runs `f` on the blocking pool and logs passthrough failures.
    async fn blocking<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Engine) -> Result<T> + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        let result = match tokio::task::spawn_blocking(move || f(&engine)).await {
            Ok(result) => result,
            Err(join_err) => Err(Error::from(join_err)),
        };
        translate(op, result)
    }
}

fn set_sync(engine: &Engine, req: &SetRequest) -> Result<()> {
    let buf = new_entry(req).encode();
    engine.write_bounded(|table| {
        table.insert(req.key.as_slice(), buf.as_slice())?;
        Ok(())
    })
}

fn add_sync(engine: &Engine, req: &SetRequest) -> Result<()> {
    let buf = new_entry(req).encode();
    engine.write_bounded(|table| {
        if table.get(req.key.as_slice())?.is_some() {
            return Err(Error::KeyExists);
        }
        table.insert(req.key.as_slice(), buf.as_slice())?;
        Ok(())
    })
}

fn replace_sync(engine: &Engine, req: &SetRequest) -> Result<()> {
    let buf = new_entry(req).encode();
    engine.write_bounded(|table| {
        if table.get(req.key.as_slice())?.is_none() {
            return Err(Error::KeyNotFound);
        }
        table.insert(req.key.as_slice(), buf.as_slice())?;
        Ok(())
    })
}

fn splice_sync(engine: &Engine, req: &SetRequest, splice: Splice) -> Result<()> {
    engine.write_bounded(|table| {
        let prev = match table.get(req.key.as_slice())? {
            Some(guard) => Entry::decode(guard.value())?,
            None => return Err(Error::KeyNotFound),
        };

        let payload = match splice {
            Splice::Append => [prev.payload.as_slice(), req.data.as_slice()].concat(),
            Splice::Prepend => [req.data.as_slice(), prev.payload.as_slice()].concat(),
        };
        let buf = Entry::new(prev.expiration, prev.flags, payload).encode();

        table.insert(req.key.as_slice(), buf.as_slice())?;
        Ok(())
    })
}

/// Existing record bytes for `key`, or `KeyNotFound`.
fn fetch(table: &EntriesWrite<'_>, key: &[u8]) -> Result<Vec<u8>> {
    table
        .get(key)?
        .map(|guard| guard.value().to_vec())
        .ok_or(Error::KeyNotFound)
}

fn touch_sync(engine: &Engine, req: &TouchRequest) -> Result<()> {
    // The stored expiration is not checked: touching an expired entry that
    // the reaper has not collected yet brings it back.
    engine.write(|table| {
        let mut buf = fetch(table, &req.key)?;
        rewrite_expiration(&mut buf, compute_expiration(req.exptime, expiry::now()))?;
        table.insert(req.key.as_slice(), buf.as_slice())?;
        Ok(())
    })
}

fn gat_sync(engine: &Engine, req: &GatRequest) -> Result<Option<Entry>> {
    engine.write(|table| {
        let mut buf = match fetch(table, &req.key) {
            Ok(buf) => buf,
            Err(Error::KeyNotFound) => return Ok(None),
            Err(err) => return Err(err),
        };
        let entry = Entry::decode(&buf)?;
        let now = expiry::now();

        if entry.is_expired(now) {
            table.remove(req.key.as_slice())?;
            debug!(key = ?req.key, "Deleted expired entry on get-and-touch");
            return Ok(None);
        }

        rewrite_expiration(&mut buf, compute_expiration(req.exptime, now))?;
        table.insert(req.key.as_slice(), buf.as_slice())?;
        Ok(Some(entry))
    })
}

fn delete_sync(engine: &Engine, req: &DeleteRequest) -> Result<()> {
    engine.write(|table| {
        if table.remove(req.key.as_slice())?.is_none() {
            return Err(Error::KeyNotFound);
        }
        Ok(())
    })
}

fn new_entry(req: &SetRequest) -> Entry {
    Entry::new(
        compute_expiration(req.exptime, expiry::now()),
        req.flags,
        req.data.clone(),
    )
}

/// Live entry for `key`, or `None` if absent or expired at `now`.
fn lookup_live(table: &EntriesRead, key: &[u8], now: u32) -> Result<Option<Entry>> {
    match table.get(key)? {
        Some(guard) => {
            let entry = Entry::decode(guard.value())?;
            Ok((!entry.is_expired(now)).then_some(entry))
        },
        None => Ok(None),
    }
}

/// Starts a batched lookup on the blocking pool.
///
/// `respond` turns each key and its live entry (if any) into a response.
fn spawn_lookup<T, F>(
    engine: &Arc<Engine>,
    op: &'static str,
    req: GetRequest,
    respond: F,
) -> Lookup<T>
where
    T: Send + 'static,
    F: Fn(&GetKey, Option<Entry>) -> T + Send + 'static,
{
    let (sink, handle) = lookup::channel(req.len());
    let engine = Arc::clone(engine);
    tokio::task::spawn_blocking(move || {
        let outcome = run_lookup(&engine, &req, &sink, &respond);
        sink.finish(translate(op, outcome));
    });
    handle
}

fn run_lookup<T>(
    engine: &Engine,
    req: &GetRequest,
    sink: &LookupSink<T>,
    respond: &impl Fn(&GetKey, Option<Entry>) -> T,
) -> Result<()> {
    engine.read(|table| {
        let now = expiry::now();
        for key in &req.keys {
            let entry = lookup_live(table, &key.key, now)?;
            if !sink.push(respond(key, entry)) {
                debug!("Lookup consumer went away, stopping early");
                break;
            }
        }
        Ok(())
    })
}

#[async_trait]
impl CacheHandler for RedbHandler {
    async fn set(&self, req: SetRequest) -> Result<()> {
        self.blocking("set", move |engine| set_sync(engine, &req)).await
    }

    async fn add(&self, req: SetRequest) -> Result<()> {
        self.blocking("add", move |engine| add_sync(engine, &req)).await
    }

    async fn replace(&self, req: SetRequest) -> Result<()> {
        self.blocking("replace", move |engine| replace_sync(engine, &req)).await
    }

    async fn append(&self, req: SetRequest) -> Result<()> {
        self.blocking("append", move |engine| splice_sync(engine, &req, Splice::Append))
            .await
    }

    async fn prepend(&self, req: SetRequest) -> Result<()> {
        self.blocking("prepend", move |engine| splice_sync(engine, &req, Splice::Prepend))
            .await
    }

    fn get(&self, req: GetRequest) -> Lookup<GetResponse> {
        spawn_lookup(&self.engine, "get", req, |key, entry| match entry {
            Some(entry) => GetResponse {
                miss: false,
                quiet: key.quiet,
                opaque: key.opaque,
                flags: entry.flags,
                key: key.key.clone(),
                data: entry.payload,
            },
            None => GetResponse::miss(key),
        })
    }

    fn get_e(&self, req: GetRequest) -> Lookup<GetEResponse> {
        spawn_lookup(&self.engine, "get_e", req, |key, entry| match entry {
            Some(entry) => GetEResponse {
                miss: false,
                quiet: key.quiet,
                opaque: key.opaque,
                exptime: entry.expiration,
                flags: entry.flags,
                key: key.key.clone(),
                data: entry.payload,
            },
            None => GetEResponse::miss(key),
        })
    }

    async fn gat(&self, req: GatRequest) -> Result<GetResponse> {
        let key = GetKey {
            key: req.key.clone(),
            opaque: req.opaque,
            quiet: false,
        };
        let entry = self
            .blocking("gat", move |engine| gat_sync(engine, &req))
            .await?;

        Ok(match entry {
            Some(entry) => GetResponse {
                miss: false,
                quiet: false,
                opaque: key.opaque,
                flags: entry.flags,
                key: key.key,
                data: entry.payload,
            },
            None => GetResponse::miss(&key),
        })
    }

    async fn touch(&self, req: TouchRequest) -> Result<()> {
        self.blocking("touch", move |engine| touch_sync(engine, &req)).await
    }

    async fn delete(&self, req: DeleteRequest) -> Result<()> {
        self.blocking("delete", move |engine| delete_sync(engine, &req)).await
    }
}
