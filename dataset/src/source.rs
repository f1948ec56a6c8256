//! Enumerating audio files from a local tree or a cloud bucket.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;
use walkdir::WalkDir;

use crate::bucket::{BucketClient, ObjectKeys};
use crate::DatasetError;

/// Scheme prefix recognised as a cloud bucket location.
pub const CLOUD_SCHEME: &str = "gs";

/// Where files are listed from, decided once when the source is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// A directory walked recursively.
    Local(PathBuf),
    /// Every object in a bucket.
    Cloud { scheme: String, bucket: String },
}

impl FileSource {
    /// Parses `gs://bucket[/...]` as a cloud source and anything else as a
    /// local path. Only the bucket name of a cloud URL is kept.
    pub fn parse(base: &str) -> Result<Self, DatasetError> {
        let cloud_prefix = format!("{CLOUD_SCHEME}://");
        match base.strip_prefix(&cloud_prefix) {
            Some(rest) => {
                let bucket = rest.split('/').next().unwrap_or_default();
                if bucket.is_empty() {
                    return Err(DatasetError::InvalidSource(base.to_string()));
                }
                Ok(FileSource::Cloud {
                    scheme: CLOUD_SCHEME.to_string(),
                    bucket: bucket.to_string(),
                })
            }
            None if base.is_empty() => Err(DatasetError::InvalidSource(base.to_string())),
            None => Ok(FileSource::Local(PathBuf::from(base))),
        }
    }

    pub fn is_cloud(&self) -> bool {
        matches!(self, FileSource::Cloud { .. })
    }
}

impl FromStr for FileSource {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSource::Local(path) => write!(f, "{}", path.display()),
            FileSource::Cloud { scheme, bucket } => write!(f, "{scheme}://{bucket}"),
        }
    }
}

/// Filter applied to every candidate path before it is yielded.
pub type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A restartable file listing.
///
/// Each call to [`FileLister::files`] starts a fresh, lazy traversal.
#[derive(Clone)]
pub struct FileLister {
    source: FileSource,
    predicate: Predicate,
    client: Option<Arc<dyn BucketClient>>,
}

impl fmt::Debug for FileLister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileLister")
            .field("source", &self.source)
            .field("client", &self.client.is_some())
            .finish()
    }
}

impl FileLister {
    pub fn new(source: FileSource, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            source,
            predicate: Arc::new(predicate),
            client: None,
        }
    }

    /// Sets the client used for cloud sources.
    pub fn with_client(mut self, client: Arc<dyn BucketClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    /// Starts a new traversal.
    pub fn files(&self) -> Files {
        list_files(&self.source, self.predicate.clone(), self.client.clone())
    }
}

/// Lists files under `source` whose full path satisfies `predicate`.
///
/// Local sources yield absolute paths: a relative root is resolved against
/// the current directory first. Cloud sources yield `scheme://bucket/key`.
/// The predicate sees exactly the string that would be yielded. Nothing is read until the iterator is first advanced. Errors from
/// the walk or the bucket client are yielded as `Err` items.
pub fn list_files(source: &FileSource, predicate: Predicate, client: Option<Arc<dyn BucketClient>>) -> Files {
    let state = match source {
        FileSource::Local(root) => match std::path::absolute(root) {
            Ok(root) => State::Local(WalkDir::new(root).follow_links(true).into_iter()),
            Err(e) => State::Failed(Some(e.into())),
        },
        FileSource::Cloud { scheme, bucket } => State::CloudPending {
            client,
            prefix: format!("{scheme}://{bucket}/"),
            bucket: bucket.clone(),
        },
    };
    Files { state, predicate }
}

/// Iterator returned by [`list_files`].
pub struct Files {
    state: State,
    predicate: Predicate,
}

enum State {
    Local(walkdir::IntoIter),
    CloudPending {
        client: Option<Arc<dyn BucketClient>>,
        bucket: String,
        prefix: String,
    },
    CloudListing {
        keys: ObjectKeys,
        prefix: String,
    },
    Failed(Option<DatasetError>),
    Done,
}

impl Files {
    fn next_local(walker: &mut walkdir::IntoIter, predicate: &Predicate) -> Option<Result<String, DatasetError>> {
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };
            if entry.file_type().is_dir() {
                continue;
            }
            let path = path_string(entry.path());
            if predicate(&path) {
                return Some(Ok(path));
            }
        }
        None
    }

    fn next_cloud(keys: &mut ObjectKeys, prefix: &str, predicate: &Predicate) -> Option<Result<String, DatasetError>> {
        for key in keys {
            let key = match key {
                Ok(key) => key,
                Err(e) => return Some(Err(e)),
            };
            let path = format!("{prefix}{key}");
            if predicate(&path) {
                info!("Found file: {path}");
                return Some(Ok(path));
            }
        }
        None
    }
}

impl Iterator for Files {
    type Item = Result<String, DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = match &mut self.state {
                State::Local(walker) => Self::next_local(walker, &self.predicate),
                State::CloudListing { keys, prefix } => Self::next_cloud(keys, prefix, &self.predicate),
                State::CloudPending { client, bucket, prefix } => {
                    let Some(client) = client.take() else {
                        let err = DatasetError::NoClient(prefix.clone());
                        self.state = State::Done;
                        return Some(Err(err));
                    };
                    let listing = client.get_bucket(bucket).and_then(|b| b.list_objects());
                    match listing {
                        Ok(keys) => {
                            let prefix = std::mem::take(prefix);
                            self.state = State::CloudListing { keys, prefix };
                            continue;
                        }
                        Err(e) => {
                            self.state = State::Done;
                            return Some(Err(e));
                        }
                    }
                }
                State::Failed(err) => err.take().map(Err),
                State::Done => return None,
            };
            if item.is_none() {
                self.state = State::Done;
            }
            return item;
        }
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
