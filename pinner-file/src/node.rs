//! Filesystem nodes: one regular file, or every regular file beneath a directory.

use std::collections::HashSet;
use std::fs::{FileType, Metadata};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use pinner_core::error::{PinnerError, Result};

/// Whether a node was built from a file or a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A single regular file
    File,
    /// A directory tree
    Directory,
}

/// A regular file captured by a [`FileNode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the node root, `/`-separated; empty for file nodes
    pub relative_path: String,
    /// Size in bytes
    pub size: u64,
    /// Unix mode bits (0 on other platforms)
    pub mode: u32,
}

/// One step of a node's upload layout, in depth-first order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeItem {
    /// A directory, named by its upload path
    Directory(String),
    /// A file with its upload name and location on disk
    File {
        /// Name presented to the remote service
        name: String,
        /// Absolute or root-relative location to read from
        path: PathBuf,
        /// Size in bytes
        size: u64,
    },
}

/// A filesystem entity to be uploaded.
///
/// The entry list is never empty: building a node from a directory without any
/// regular file fails with [`PinnerError::EmptyNode`].
#[derive(Clone, Debug)]
pub struct FileNode {
    root: PathBuf,
    kind: NodeKind,
    entries: Vec<FileEntry>,
    base: Option<String>,
}

impl FileNode {
    /// Builds a node from a path.
    ///
    /// Directories are walked recursively in file-name order; directory entries
    /// themselves produce no rows. Symlinks and special files are rejected.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let meta = match std::fs::symlink_metadata(&root) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PinnerError::NotFound(root))
            }
            Err(e) => return Err(e.into()),
        };

        let file_type = meta.file_type();
        let node = if file_type.is_file() {
            Self {
                entries: vec![FileEntry {
                    relative_path: String::new(),
                    size: meta.len(),
                    mode: mode_of(&meta),
                }],
                root,
                kind: NodeKind::File,
                base: None,
            }
        } else if file_type.is_dir() {
            let entries = walk(&root)?;
            if entries.is_empty() {
                return Err(PinnerError::EmptyNode(root));
            }
            Self {
                root,
                kind: NodeKind::Directory,
                entries,
                base: None,
            }
        } else {
            return Err(PinnerError::UnsupportedFileType {
                kind: describe(file_type),
                path: root,
            });
        };

        debug!(root = ?node.root, files = node.entries.len(), "Built file node");
        Ok(node)
    }

    /// Builds a node on the blocking pool.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        tokio::task::spawn_blocking(move || Self::new(path))
            .await
            .map_err(|e| PinnerError::Io(io::Error::new(io::ErrorKind::Other, e)))?
    }

    /// Sets the logical top-level folder name. No-op for file nodes.
    pub fn map_directory(&mut self, name: impl Into<String>) {
        if self.kind != NodeKind::Directory {
            return;
        }
        let name = name.into();
        let name = name.trim_matches('/');
        self.base = (!name.is_empty()).then(|| name.to_string());
    }

    /// The path the node was built from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File or directory.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns true for directory nodes.
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    /// Regular files in walk order.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Total size of all regular files.
    pub fn size(&self) -> Result<u64> {
        if self.entries.is_empty() {
            return Err(PinnerError::EmptyNode(self.root.clone()));
        }
        Ok(self.entries.iter().map(|e| e.size).sum())
    }

    /// Top-level folder name for directory nodes: the mapped name, else the
    /// directory's own name.
    pub fn folder_name(&self) -> Option<String> {
        match self.kind {
            NodeKind::File => None,
            NodeKind::Directory => self.base.clone().or_else(|| Some(self.root_name())),
        }
    }

    /// Name describing the whole upload: folder name or file name.
    pub fn display_name(&self) -> String {
        self.folder_name().unwrap_or_else(|| self.root_name())
    }

    /// Name under which `entry` is presented to the remote service.
    pub fn upload_name(&self, entry: &FileEntry) -> String {
        match self.folder_name() {
            Some(folder) => format!("{}/{}", folder, entry.relative_path),
            None => self.root_name(),
        }
    }

    /// Location of `entry` on disk.
    pub fn path_of(&self, entry: &FileEntry) -> PathBuf {
        if entry.relative_path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(&entry.relative_path)
        }
    }

    /// Upload layout in depth-first order.
    ///
    /// With `directories` set, every folder on the way to a file is emitted
    /// once, before the first file beneath it.
    pub fn tree(&self, directories: bool) -> Vec<TreeItem> {
        let mut items = Vec::with_capacity(self.entries.len());
        let mut seen = HashSet::new();
        let folder = self.folder_name();

        for entry in &self.entries {
            if directories {
                if let Some(folder) = &folder {
                    let mut current = folder.clone();
                    if seen.insert(current.clone()) {
                        items.push(TreeItem::Directory(current.clone()));
                    }
                    let mut components: Vec<&str> = entry.relative_path.split('/').collect();
                    components.pop();
                    for component in components {
                        current = format!("{}/{}", current, component);
                        if seen.insert(current.clone()) {
                            items.push(TreeItem::Directory(current.clone()));
                        }
                    }
                }
            }
            items.push(TreeItem::File {
                name: self.upload_name(entry),
                path: self.path_of(entry),
                size: entry.size,
            });
        }

        items
    }

    fn root_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.to_string_lossy().into_owned())
    }
}

fn walk(root: &Path) -> Result<Vec<FileEntry>> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(io::Error::from)?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            return Err(PinnerError::UnsupportedFileType {
                path: entry.path().to_path_buf(),
                kind: describe(file_type),
            });
        }

        let meta = entry.metadata().map_err(io::Error::from)?;
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        entries.push(FileEntry {
            relative_path: to_slash(relative),
            size: meta.len(),
            mode: mode_of(&meta),
        });
    }

    Ok(entries)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn mode_of(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn mode_of(_meta: &Metadata) -> u32 {
    0
}

#[cfg(unix)]
fn describe(file_type: FileType) -> String {
    use std::os::unix::fs::FileTypeExt;

    let kind = if file_type.is_symlink() {
        "symlink"
    } else if file_type.is_block_device() {
        "block device"
    } else if file_type.is_char_device() {
        "character device"
    } else if file_type.is_fifo() {
        "named pipe"
    } else if file_type.is_socket() {
        "socket"
    } else {
        "unknown"
    };
    kind.to_string()
}

#[cfg(not(unix))]
fn describe(file_type: FileType) -> String {
    if file_type.is_symlink() {
        "symlink".into()
    } else {
        "unknown".into()
    }
}
