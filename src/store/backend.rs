//! Handler trait for the cache storage layer.
//!
//! Defines the operation surface a protocol front end programs against,
//! independent of the storage engine behind it.

use async_trait::async_trait;

use super::lookup::Lookup;
use super::types::{
    DeleteRequest, GatRequest, GetEResponse, GetRequest, GetResponse, SetRequest, TouchRequest,
};
use crate::error::Result;

/// Cache operations with memcached semantics.
///
/// All implementations must be thread-safe (`Send + Sync`) so a single
/// instance can serve every connection.
///
/// # Example
///
/// ```ignore
/// use ttlcache::store::{CacheHandler, GetRequest, SetRequest};
///
/// handler.set(SetRequest::new("greeting", "hello").with_ttl(60)).await?;
/// let hits = handler.get(GetRequest::new(["greeting"])).collect().await?;
/// ```
#[async_trait]
pub trait CacheHandler: Send + Sync + 'static {
    /// Stores the entry, overwriting any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn set(&self, req: SetRequest) -> Result<()>;

    /// Stores the entry only if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns `KeyExists` if the key is present.
    async fn add(&self, req: SetRequest) -> Result<()>;

    /// Overwrites the entry only if the key is present.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the key is absent; nothing is written.
    async fn replace(&self, req: SetRequest) -> Result<()>;

    /// Appends `req.data` to the existing payload, keeping flags and expiration.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the key is absent.
    async fn append(&self, req: SetRequest) -> Result<()>;

    /// Prepends `req.data` to the existing payload, keeping flags and expiration.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the key is absent.
    async fn prepend(&self, req: SetRequest) -> Result<()>;

    /// Looks up every key in one snapshot. Returns immediately; results
    /// arrive through the handle in request order.
    fn get(&self, req: GetRequest) -> Lookup<GetResponse>;

    /// Like [`CacheHandler::get`], with expirations on hits.
    fn get_e(&self, req: GetRequest) -> Lookup<GetEResponse>;

    /// Returns the entry and refreshes its expiration.
    ///
    /// Absent and expired keys produce a miss response, not an error. An
    /// expired entry is deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn gat(&self, req: GatRequest) -> Result<GetResponse>;

    /// Refreshes the expiration of an existing entry.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the key is absent.
    async fn touch(&self, req: TouchRequest) -> Result<()>;

    /// Removes the key.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the key is absent.
    async fn delete(&self, req: DeleteRequest) -> Result<()>;

    /// Releases per-caller resources. Handlers shared for the life of the
    /// process have none, so the default does nothing.
    ///
    /// # Errors
    ///
    /// Implementations holding per-caller resources may fail to release them.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}
