//! Storage backends for the bronze layer.
//!
//! The base directory is either a plain filesystem path or a URI on a mounted
//! volume (`dbfs:/mnt/bronze` is reachable locally as `/dbfs/mnt/bronze`). The
//! backend is chosen once from the scheme; the lander only ever works with local
//! paths and asks the backend how to display them.

use std::{
    fmt,
    path::{Component, Path, PathBuf},
};

use crate::{IngestError, Res};

pub const DBFS_SCHEME: &str = "dbfs:/";
pub const DBFS_MOUNT: &str = "/dbfs";

pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Locally addressable directory for the configured base directory.
    fn local_root(&self) -> &Path;

    /// Fails when the target cannot be reached at all.
    fn ensure_available(&self) -> Res<()>;

    /// Externally displayed form of a local path below [`Self::local_root`].
    fn display_path(&self, local: &Path) -> String;
}

/// Select the backend from the base directory's scheme.
pub fn backend_for(base_dir: &str) -> Box<dyn StorageBackend> {
    if base_dir.starts_with(DBFS_SCHEME) {
        Box::new(MountedVolume::new(DBFS_SCHEME, DBFS_MOUNT, base_dir))
    } else {
        Box::new(LocalFs::new(base_dir))
    }
}

#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl StorageBackend for LocalFs {
    fn local_root(&self) -> &Path {
        &self.root
    }

    fn ensure_available(&self) -> Res<()> {
        Ok(())
    }

    fn display_path(&self, local: &Path) -> String {
        local.display().to_string()
    }
}

/// A URI scheme backed by a local mount point.
#[derive(Debug, Clone)]
pub struct MountedVolume {
    scheme: String,
    mount_point: PathBuf,
    root: PathBuf,
}

impl MountedVolume {
    /// `uri` must start with `scheme`; the remainder is resolved below `mount_point`.
    pub fn new(scheme: &str, mount_point: impl Into<PathBuf>, uri: &str) -> Self {
        let mount_point = mount_point.into();
        let relative = uri.strip_prefix(scheme).unwrap_or(uri).trim_start_matches('/');
        let root = if relative.is_empty() {
            mount_point.clone()
        } else {
            mount_point.join(relative)
        };
        Self {
            scheme: scheme.to_string(),
            mount_point,
            root,
        }
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }
}

impl StorageBackend for MountedVolume {
    fn local_root(&self) -> &Path {
        &self.root
    }

    fn ensure_available(&self) -> Res<()> {
        if self.mount_point.is_dir() {
            Ok(())
        } else {
            Err(IngestError::StorageUnavailable(format!(
                "mount point {} for {} is not available",
                self.mount_point.display(),
                self.scheme
            )))
        }
    }

    fn display_path(&self, local: &Path) -> String {
        match local.strip_prefix(&self.mount_point) {
            Ok(relative) => {
                let segments: Vec<String> = relative
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                        _ => None,
                    })
                    .collect();
                format!("{}{}", self.scheme, segments.join("/"))
            }
            Err(_) => local.display().to_string(),
        }
    }
}
