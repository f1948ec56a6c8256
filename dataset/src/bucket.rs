//! Object storage collaborator interface.
//!
//! The enumerator only needs two calls from a storage backend: look a bucket
//! up by name and list the keys inside it. [`MemoryBucketClient`] implements
//! both over an in-process map for tests and offline runs.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::DatasetError;

/// Iterator over object keys returned by [`Bucket::list_objects`].
pub type ObjectKeys = Box<dyn Iterator<Item = Result<String, DatasetError>> + Send>;

/// Resolves buckets by name.
pub trait BucketClient: Send + Sync {
    /// Looks up a bucket.
    fn get_bucket(&self, name: &str) -> Result<Box<dyn Bucket>, DatasetError>;
}

impl fmt::Debug for dyn BucketClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketClient {{ ... }}")
    }
}

/// A bucket of objects addressed by key.
pub trait Bucket: Send {
    /// Lists every object key in the bucket.
    fn list_objects(&self) -> Result<ObjectKeys, DatasetError>;
}

/// An in-memory bucket client.
#[derive(Clone, Default)]
pub struct MemoryBucketClient {
    buckets: Arc<RwLock<BTreeMap<String, Vec<String>>>>,
}

impl MemoryBucketClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or replaces) a bucket holding `keys`.
    pub fn insert_bucket<I, S>(&self, name: &str, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys = keys.into_iter().map(Into::into).collect();
        self.buckets.write().insert(name.to_string(), keys);
    }

    /// Adds one key to a bucket, creating the bucket if needed.
    pub fn put(&self, bucket: &str, key: impl Into<String>) {
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_default()
            .push(key.into());
    }
}

impl BucketClient for MemoryBucketClient {
    fn get_bucket(&self, name: &str) -> Result<Box<dyn Bucket>, DatasetError> {
        let buckets = self.buckets.read();
        let keys = buckets
            .get(name)
            .ok_or_else(|| DatasetError::BucketNotFound(name.to_string()))?;
        Ok(Box::new(MemoryBucket { keys: keys.clone() }))
    }
}

/// Snapshot of a [`MemoryBucketClient`] bucket at lookup time.
struct MemoryBucket {
    keys: Vec<String>,
}

impl Bucket for MemoryBucket {
    fn list_objects(&self) -> Result<ObjectKeys, DatasetError> {
        Ok(Box::new(self.keys.clone().into_iter().map(Ok)))
    }
}
