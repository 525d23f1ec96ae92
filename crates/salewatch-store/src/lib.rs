//! Snapshot persistence for aggregated product collections.
//!
//! A [`BlobStore`] maps string keys to opaque bytes; [`PersistentCache`]
//! layers JSON snapshots of product collections on top of it.

pub mod blob;
pub mod cache;

use thiserror::Error;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use cache::{CachedCollections, PersistentCache, PRODUCTS_KEY, SALES_KEY};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("snapshot `{key}` does not exist")]
    Missing { key: String },
    #[error("invalid snapshot key `{key}`")]
    InvalidKey { key: String },
    #[error("I/O error on snapshot `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode snapshot `{key}`: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("snapshot `{key}` is not a product collection: {source}")]
    Deserialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
