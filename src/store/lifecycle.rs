//! One-time handler initialization.
//!
//! A [`HandlerFactory`] is built at startup from a [`StoreConfig`] and handed
//! to every component that needs storage. The first call to
//! [`HandlerFactory::handler`] opens the database and starts the reaper;
//! every later call returns the same shared [`RedbHandler`].

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info};

use super::redb::RedbHandler;
use crate::config::StoreConfig;
use crate::error::Result;

/// Lazily opens one shared handler for a storage directory.
///
/// Cloning shares the same underlying handler.
#[derive(Debug, Clone)]
pub struct HandlerFactory {
    inner: Arc<FactoryInner>,
}

#[derive(Debug)]
struct FactoryInner {
    config: StoreConfig,
    handler: OnceCell<RedbHandler>,
}

impl HandlerFactory {
    /// Creates a factory for `config`. Nothing is opened until
    /// [`HandlerFactory::handler`] is first called.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(FactoryInner {
                config,
                handler: OnceCell::new(),
            }),
        }
    }

    /// Returns the shared handler, opening it on first use.
    ///
    /// Concurrent first callers wait on a single initialization.
    ///
    /// # Errors
    ///
    /// Returns the initialization failure (directory creation, database open,
    /// table creation). Callers should treat it as fatal; the next call
    /// retries from scratch.
    pub async fn handler(&self) -> Result<RedbHandler> {
        let config = &self.inner.config;
        self.inner
            .handler
            .get_or_try_init(|| async {
                info!(path = %config.path.display(), "Initializing cache handler");
                RedbHandler::open(config).await.inspect_err(|err| {
                    error!(
                        path = %config.path.display(),
                        error = %err,
                        "Cache handler initialization failed"
                    );
                })
            })
            .await
            .cloned()
    }

    /// Whether the handler has been opened.
    pub fn is_initialized(&self) -> bool {
        self.inner.handler.initialized()
    }

    /// Configuration this factory opens.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }
}
