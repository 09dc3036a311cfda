//! Remote object-storage paths

use serde::{Deserialize, Serialize};
use std::fmt;

/// URI scheme of the remote object store
pub const STORAGE_SCHEME: &str = "gs://";

/// A path inside a remote storage bucket (`gs://bucket/some/prefix`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoragePath {
    bucket: String,
    /// Object prefix without leading or trailing slashes; empty for the bucket root
    prefix: String,
}

impl StoragePath {
    /// Parses a `gs://` URI, returning `None` for anything else
    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.trim().strip_prefix(STORAGE_SCHEME)?;
        let (bucket, prefix) = match rest.split_once('/') {
            Some((bucket, prefix)) => (bucket, prefix),
            None => (rest, ""),
        };

        if bucket.is_empty() {
            return None;
        }

        Some(Self {
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object name relative to the bucket
    pub fn object_name(&self) -> &str {
        &self.prefix
    }

    /// Appends one or more `/`-separated segments
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.trim_matches('/');
        let prefix = if self.prefix.is_empty() {
            segment.to_string()
        } else if segment.is_empty() {
            self.prefix.clone()
        } else {
            format!("{}/{}", self.prefix, segment)
        };

        Self {
            bucket: self.bucket.clone(),
            prefix,
        }
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "{}{}", STORAGE_SCHEME, self.bucket)
        } else {
            write!(f, "{}{}/{}", STORAGE_SCHEME, self.bucket, self.prefix)
        }
    }
}

impl TryFrom<String> for StoragePath {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("not a storage path: {}", value))
    }
}

impl From<StoragePath> for String {
    fn from(value: StoragePath) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bucket_and_prefix() {
        let path = StoragePath::parse("gs://my-bucket/work/dir/").unwrap();
        assert_eq!(path.bucket(), "my-bucket");
        assert_eq!(path.object_name(), "work/dir");
        assert_eq!(path.to_string(), "gs://my-bucket/work/dir");
    }

    #[test]
    fn test_parse_bucket_root() {
        let path = StoragePath::parse("gs://my-bucket").unwrap();
        assert_eq!(path.object_name(), "");
        assert_eq!(path.to_string(), "gs://my-bucket");
    }

    #[test]
    fn test_rejects_non_remote_paths() {
        assert!(StoragePath::parse("/tmp/work").is_none());
        assert!(StoragePath::parse("s3://bucket/work").is_none());
        assert!(StoragePath::parse("gs://").is_none());
        assert!(StoragePath::parse("work").is_none());
    }

    #[test]
    fn test_join() {
        let root = StoragePath::parse("gs://b").unwrap();
        let nested = root.join("tmp").join("/abc/bin/");
        assert_eq!(nested.to_string(), "gs://b/tmp/abc/bin");
    }
}
