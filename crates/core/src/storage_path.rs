// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical form for file locations stored in metadata records.
//!
//! Records may hold either a path relative to the storage root or an
//! absolute path. The tag is decided once, at parse time, and resolution
//! against the root happens in exactly one place.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoragePathError {
    #[error("empty storage path")]
    Empty,
    #[error("relative storage path escapes the storage root: {0}")]
    EscapesRoot(String),
}

/// A stored file location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoragePath {
    /// Interpreted relative to the configured storage root.
    Relative(PathBuf),
    /// Used as-is.
    Absolute(PathBuf),
}

impl StoragePath {
    /// Tag a raw stored path.
    pub fn parse(raw: impl Into<PathBuf>) -> Self {
        let path = raw.into();
        if path.is_absolute() {
            StoragePath::Absolute(path)
        } else {
            StoragePath::Relative(path)
        }
    }

    /// Resolve to an absolute path.
    ///
    /// Relative paths may not contain `..` or a root/prefix component, so a
    /// record can never point outside `root`.
    pub fn resolve(&self, root: &Path) -> Result<PathBuf, StoragePathError> {
        match self {
            StoragePath::Absolute(p) => {
                if p.as_os_str().is_empty() {
                    return Err(StoragePathError::Empty);
                }
                Ok(p.clone())
            }
            StoragePath::Relative(p) => {
                let mut out = root.to_path_buf();
                let mut pushed = false;
                for component in p.components() {
                    match component {
                        Component::Normal(part) => {
                            out.push(part);
                            pushed = true;
                        }
                        Component::CurDir => {}
                        Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                            return Err(StoragePathError::EscapesRoot(p.display().to_string()));
                        }
                    }
                }
                if !pushed {
                    return Err(StoragePathError::Empty);
                }
                Ok(out)
            }
        }
    }

    pub fn as_path(&self) -> &Path {
        match self {
            StoragePath::Relative(p) | StoragePath::Absolute(p) => p,
        }
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_path().display())
    }
}

impl serde::Serialize for StoragePath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.as_path().display())
    }
}

impl<'de> serde::Deserialize<'de> for StoragePath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(StoragePath::parse(s))
    }
}

#[cfg(test)]
#[path = "storage_path_tests.rs"]
mod tests;
