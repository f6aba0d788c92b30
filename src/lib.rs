//! TTL-aware cache storage handler backed by the redb embedded database.
//!
//! This crate provides the storage half of a memcached-style cache server:
//!
//! - [`store::RedbHandler`] - Set/Add/Replace/Append/Prepend, batched Get and
//!   GetE, get-and-touch, Touch and Delete, each in one redb transaction
//! - [`store::Reaper`] - periodic background eviction of expired entries
//! - [`store::HandlerFactory`] - one-time initialization shared by all callers
//! - [`config::StoreConfig`] - storage directory, size bound, reaper period
//!
//! Network listeners and protocol parsing live outside this crate; they
//! program against the [`store::CacheHandler`] trait.

pub mod config;
pub mod error;
pub mod store;

pub use error::{Error, Result};
