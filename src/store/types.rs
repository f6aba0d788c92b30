//! Request and response shapes exchanged with the protocol layer.
//!
//! TTLs in requests are relative seconds; `0` means the entry never expires.
//! `opaque` and `quiet` are caller metadata echoed back untouched.

/// Set, Add, Replace, Append and Prepend request.
///
/// Append and Prepend use only `key` and `data`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetRequest {
    pub key: Vec<u8>,
    pub flags: u32,
    pub exptime: u32,
    pub data: Vec<u8>,
    pub opaque: u32,
}

impl SetRequest {
    pub fn new(key: impl Into<Vec<u8>>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            data: data.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, exptime: u32) -> Self {
        self.exptime = exptime;
        self
    }
}

/// One key of a batched lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetKey {
    pub key: Vec<u8>,
    pub opaque: u32,
    pub quiet: bool,
}

/// Batched Get/GetE request. Results come back in `keys` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetRequest {
    pub keys: Vec<GetKey>,
}

impl GetRequest {
    /// Request for `keys`, assigning each its index as opaque.
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Vec<u8>>,
    {
        let keys = keys
            .into_iter()
            .zip(0u32..)
            .map(|(key, opaque)| GetKey {
                key: key.into(),
                opaque,
                quiet: false,
            })
            .collect();
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Touch request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchRequest {
    pub key: Vec<u8>,
    pub exptime: u32,
    pub opaque: u32,
}

impl TouchRequest {
    pub fn new(key: impl Into<Vec<u8>>, exptime: u32) -> Self {
        Self {
            key: key.into(),
            exptime,
            opaque: 0,
        }
    }
}

/// Get-and-touch request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatRequest {
    pub key: Vec<u8>,
    pub exptime: u32,
    pub opaque: u32,
}

impl GatRequest {
    pub fn new(key: impl Into<Vec<u8>>, exptime: u32) -> Self {
        Self {
            key: key.into(),
            exptime,
            opaque: 0,
        }
    }
}

/// Delete request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteRequest {
    pub key: Vec<u8>,
    pub opaque: u32,
}

impl DeleteRequest {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            opaque: 0,
        }
    }
}

/// Result for one key of a Get, or for a GAT.
///
/// On a miss, `flags` is `0` and `data` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetResponse {
    pub miss: bool,
    pub quiet: bool,
    pub opaque: u32,
    pub flags: u32,
    pub key: Vec<u8>,
    pub data: Vec<u8>,
}

impl GetResponse {
    pub(crate) fn miss(key: &GetKey) -> Self {
        Self {
            miss: true,
            quiet: key.quiet,
            opaque: key.opaque,
            key: key.key.clone(),
            ..Self::default()
        }
    }
}

/// Result for one key of a GetE: a [`GetResponse`] plus the expiration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetEResponse {
    pub miss: bool,
    pub quiet: bool,
    pub opaque: u32,
    pub exptime: u32,
    pub flags: u32,
    pub key: Vec<u8>,
    pub data: Vec<u8>,
}

impl GetEResponse {
    pub(crate) fn miss(key: &GetKey) -> Self {
        Self {
            miss: true,
            quiet: key.quiet,
            opaque: key.opaque,
            key: key.key.clone(),
            ..Self::default()
        }
    }
}
