//! Background eviction of expired entries.
//!
//! Each sweep runs in two phases:
//!
//! 1. **Scan**: one read transaction walks the whole table and reads only
//!    the expiration header of each record, collecting expired keys.
//! 2. **Reap**: each candidate gets its own short write transaction that
//!    re-reads the record and deletes it only if it is still expired.
//!
//! The re-check matters because writers may refresh an entry between the
//! two phases. Scans never take the writer slot, and each reap holds it for
//! a single key.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use redb::{ReadableTable, ReadableTableMetadata};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::engine::Engine;
use super::entry::decode_expiration;
use super::expiry::{self, is_expired};
use crate::error::Result;

/// Outcome of a single reap-phase transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReapOutcome {
    /// Still expired and deleted.
    Reaped,
    /// Refreshed since the scan; left in place.
    Refreshed,
    /// Already gone.
    Gone,
}

/// Statistics for one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Records in the table when the scan started.
    pub before: u64,
    /// Records in the table after the reap phase.
    pub after: u64,
    /// Keys the scan found expired.
    pub candidates: usize,
    /// Keys actually deleted.
    pub reaped: usize,
    /// Wall-clock duration of the sweep.
    pub elapsed: Duration,
}

/// Keys found expired by a scan, with the table size at scan time.
#[derive(Debug)]
pub(crate) struct Scan {
    pub before: u64,
    pub candidates: Vec<Vec<u8>>,
}

/// Scan phase: collect every key whose header says it is expired at `now`.
pub(crate) fn scan(engine: &Engine, now: u32) -> Result<Scan> {
    engine.read(|table| {
        let before = table.len()?;
        let mut candidates = Vec::new();

        for item in table.iter()? {
            let (key, value) = item?;
            match decode_expiration(value.value()) {
                Ok(expiration) if is_expired(expiration, now) => {
                    candidates.push(key.value().to_vec());
                },
                Ok(_) => {},
                Err(err) => {
                    warn!(key = ?key.value(), error = %err, "Skipping unreadable record");
                },
            }
        }

        Ok(Scan { before, candidates })
    })
}

/// Reap phase for one key: delete it if it is still expired at `now`.
pub(crate) fn reap_one(engine: &Engine, key: &[u8], now: u32) -> Result<ReapOutcome> {
    engine.write(|table| {
        let expired = match table.get(key)? {
            Some(guard) => is_expired(decode_expiration(guard.value())?, now),
            None => return Ok(ReapOutcome::Gone),
        };

        if expired {
            table.remove(key)?;
            Ok(ReapOutcome::Reaped)
        } else {
            Ok(ReapOutcome::Refreshed)
        }
    })
}

/// Runs one full sweep, sampling `clock` for the scan and again for each
/// reap transaction.
///
/// # Errors
///
/// Returns the first storage failure; candidates after it are left for the
/// next sweep.
pub fn sweep(engine: &Engine, clock: impl Fn() -> u32) -> Result<SweepReport> {
    let start = Instant::now();
    let Scan { before, candidates } = scan(engine, clock())?;
    debug!(before, candidates = candidates.len(), "Reaper scan complete");

    let mut reaped = 0;
    for key in &candidates {
        match reap_one(engine, key, clock())? {
            ReapOutcome::Reaped => reaped += 1,
            ReapOutcome::Refreshed => debug!(key = ?key, "Entry refreshed since scan, kept"),
            ReapOutcome::Gone => {},
        }
    }

    let after = engine.entry_count()?;
    Ok(SweepReport {
        before,
        after,
        candidates: candidates.len(),
        reaped,
        elapsed: start.elapsed(),
    })
}

/// Handle to the periodic reaper task.
///
/// Dropping the handle also stops the task after its current sweep.
#[derive(Debug)]
pub struct Reaper {
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Reaper {
    /// Starts sweeping `engine` every `interval`. The first sweep runs one
    /// interval after start.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(engine: Arc<Engine>, interval: Duration) -> Self {
        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run(engine, interval, stop_rx));
        Self {
            stop,
            task: Mutex::new(Some(task)),
        }
    }

    /// Signals the task to stop and waits for it to finish its current sweep.
    pub async fn stop(&self) {
        let _ = self.stop.send(true);
        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(err) = task.await
        {
            error!(error = %err, "Reaper task ended abnormally");
        }
    }

    /// Whether the task is still running.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

async fn run(engine: Arc<Engine>, interval: Duration, mut stop: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval = ?interval, "Starting reaper loop");

    loop {
        tokio::select! {
            _ = ticker.tick() => {},
            _ = stop.changed() => break,
        }

        info!("Reaper sweep started");
        let engine = Arc::clone(&engine);
        match tokio::task::spawn_blocking(move || sweep(&engine, expiry::now)).await {
            Ok(Ok(report)) => info!(
                before = report.before,
                after = report.after,
                candidates = report.candidates,
                reaped = report.reaped,
                elapsed_ms = report.elapsed.as_secs_f64() * 1000.0,
                "Reaper sweep finished"
            ),
            Ok(Err(err)) => error!(error = %err, "Error while reaping"),
            Err(err) => error!(error = %err, "Reaper sweep task failed"),
        }
    }

    info!("Reaper stopped");
}
