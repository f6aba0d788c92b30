//! Asynchronous batched lookup handle.
//!
//! A [`Lookup`] is returned as soon as a batched Get/GetE is issued. A
//! blocking task runs one read transaction and pushes results through a
//! bounded channel sized to the batch, in request-key order. The first
//! storage failure stops production; it is placed in a single-slot error
//! channel before the result channel closes.

use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};

/// Consumer side of a batched lookup.
#[derive(Debug)]
pub struct Lookup<T> {
    results: mpsc::Receiver<T>,
    error: oneshot::Receiver<Error>,
}

/// Producer side, owned by the background task.
#[derive(Debug)]
pub(crate) struct LookupSink<T> {
    results: mpsc::Sender<T>,
    error: oneshot::Sender<Error>,
}

/// Creates a connected sink/handle pair for a batch of `len` keys.
pub(crate) fn channel<T>(len: usize) -> (LookupSink<T>, Lookup<T>) {
    let (results_tx, results_rx) = mpsc::channel(len.max(1));
    let (error_tx, error_rx) = oneshot::channel();
    (
        LookupSink {
            results: results_tx,
            error: error_tx,
        },
        Lookup {
            results: results_rx,
            error: error_rx,
        },
    )
}

impl<T> LookupSink<T> {
    /// Pushes one result from a blocking context.
    ///
    /// Returns `false` once the consumer has gone away.
    pub(crate) fn push(&self, item: T) -> bool {
        self.results.blocking_send(item).is_ok()
    }

    /// Closes the handle, reporting `outcome`'s error if any.
    ///
    /// The error is stored before the result channel closes, so a consumer
    /// that sees the end of results always finds it.
    pub(crate) fn finish(self, outcome: Result<()>) {
        let Self { results, error } = self;
        if let Err(err) = outcome {
            // Consumer may have dropped the handle already
            let _ = error.send(err);
        }
        drop(results);
    }
}

impl<T> Lookup<T> {
    /// Next result in request order, `None` once production ended.
    pub async fn next(&mut self) -> Option<T> {
        self.results.recv().await
    }

    /// Checks how production ended. Call after [`Lookup::next`] returns `None`.
    ///
    /// # Errors
    ///
    /// Returns the storage error that aborted the batch.
    pub async fn finish(self) -> Result<()> {
        match self.error.await {
            Ok(err) => Err(err),
            Err(_closed) => Ok(()),
        }
    }

    /// Drains every result, then reports the batch outcome.
    ///
    /// # Errors
    ///
    /// Returns the storage error that aborted the batch. Results produced
    /// before the failure are discarded.
    pub async fn collect(mut self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        while let Some(item) = self.next().await {
            out.push(item);
        }
        self.finish().await?;
        Ok(out)
    }

    /// Splits the handle into the raw result and error channels.
    pub fn into_parts(self) -> (mpsc::Receiver<T>, oneshot::Receiver<Error>) {
        (self.results, self.error)
    }
}
