//! TTL-aware cache storage on top of redb.
//!
//! Entries carry an expiration, opaque flags and a payload, encoded into a
//! single value per key (see [`entry`]). Reads treat expired entries as
//! misses; the [`Reaper`] deletes them in the background.
//!
//! # Example
//!
//! ```ignore
//! use ttlcache::config::StoreConfig;
//! use ttlcache::store::{CacheHandler, GetRequest, HandlerFactory, SetRequest};
//!
//! let factory = HandlerFactory::new(StoreConfig::new("/tmp/ttlcache", 2 << 30));
//! let handler = factory.handler().await?;
//!
//! handler.set(SetRequest::new("session:1", "alice").with_ttl(3600)).await?;
//! for resp in handler.get(GetRequest::new(["session:1"])).collect().await? {
//!     println!("{:?} miss={}", resp.key, resp.miss);
//! }
//! ```

mod backend;
pub mod engine;
pub mod entry;
pub mod expiry;
mod lifecycle;
mod lookup;
mod reaper;
mod redb;
mod types;


pub use backend::CacheHandler;
pub use engine::Engine;
pub use entry::Entry;
pub use lifecycle::HandlerFactory;
pub use lookup::Lookup;
pub use reaper::{Reaper, SweepReport, sweep};
pub use redb::RedbHandler;
pub use types::{
    DeleteRequest, GatRequest, GetEResponse, GetKey, GetRequest, GetResponse, SetRequest,
    TouchRequest,
};
