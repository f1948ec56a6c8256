//! Training data plumbing for the deepvoice speaker model.
//!
//! This crate provides:
//!
//! - [`FileSource`] and [`list_files`]: lazy enumeration of a local tree or a
//!   cloud bucket, filtered by a predicate such as [`audio_predicate`]
//! - [`BucketClient`] / [`Bucket`]: the storage collaborator interface, with
//!   [`MemoryBucketClient`] for tests and offline use
//! - [`SyncIter`] and [`threadsafe`]: one iterator shared by many threads
//! - [`BatchGenerator`]: speaker-labelled, fixed-shape feature batches
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use deepvoice_dataset::{audio_predicate, FileLister, FileSource, MemoryBucketClient};
//!
//! let client = MemoryBucketClient::new();
//! client.insert_bucket("voices", ["spk1/a.wav", "spk1/readme.md"]);
//!
//! let lister = FileLister::new(FileSource::parse("gs://voices").unwrap(), audio_predicate)
//!     .with_client(Arc::new(client));
//! let files: Vec<String> = lister.files().map(Result::unwrap).collect();
//! assert_eq!(files, vec!["gs://voices/spk1/a.wav"]);
//! ```

mod batch;
mod bucket;
mod error;
mod predicate;
mod source;
mod sync_iter;

pub use batch::{Batch, BatchConfig, BatchGenerator, Batches, Loader, Normalization};
pub use bucket::{Bucket, BucketClient, MemoryBucketClient, ObjectKeys};
pub use error::DatasetError;
pub use predicate::{audio_predicate, AUDIO_EXTENSIONS};
pub use source::{list_files, FileLister, FileSource, Files, Predicate, CLOUD_SCHEME};
pub use sync_iter::{threadsafe, SyncIter};
