//! Strata Storage - Storage Traits, Reference Backend and Cache Layer
//!
//! Defines the hierarchical storage interface in both calling conventions
//! ([`StorageTrait`] blocking, [`AsyncStorageTrait`] suspending), an
//! in-memory backend implementing both, and the caching decorators in
//! [`cache`].

pub mod async_trait;
pub mod cache;

pub use async_trait::AsyncStorageTrait;
pub use cache::{
    AsyncCachedStorage, CacheLayer, CacheLayerStats, CachedStorage, MutationGuard, MutationScope,
    TtlCache, TtlCacheStats,
};

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use strata_core::path::{self, ROOT};
use strata_core::{
    FileStat, StorageError, StrataError, StrataResult, DEFAULT_DIR_MODE, DEFAULT_FILE_MODE,
};

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Blocking storage interface over a `/`-separated hierarchical namespace.
///
/// Implementations include concrete backends and decorators that wrap
/// another `StorageTrait`.
pub trait StorageTrait: Send + Sync {
    /// Check whether `path` names a file or directory.
    fn exists(&self, path: &str) -> StrataResult<bool>;

    /// Read the content of file `path`.
    fn read(&self, path: &str) -> StrataResult<String>;

    /// Create or replace file `path` with `data`.
    fn write(&self, path: &str, data: &str) -> StrataResult<()>;

    /// Delete file `path`.
    fn delete(&self, path: &str) -> StrataResult<()>;

    /// List the immediate children of directory `path`.
    ///
    /// Subdirectory names carry a trailing `/`.
    fn list_directory(&self, path: &str) -> StrataResult<Vec<String>>;

    /// Create directory `path` and any missing ancestors.
    fn ensure_directory(&self, path: &str) -> StrataResult<()>;

    /// Delete directory `path` and everything beneath it.
    fn delete_directory(&self, path: &str) -> StrataResult<()>;

    /// Set permission bits on `path`.
    fn set_permissions(&self, path: &str, mode: u32) -> StrataResult<()>;

    /// Metadata for `path`.
    fn stat(&self, path: &str) -> StrataResult<FileStat>;

    /// Remove everything beneath directory `path`, keeping `path` itself.
    ///
    /// Optional; backends without it report [`StorageError::Unsupported`].
    fn clear_subtree(&self, _path: &str) -> StrataResult<()> {
        Err(StrataError::Storage(StorageError::Unsupported {
            operation: "clear_subtree".to_string(),
        }))
    }
}

// ============================================================================
// IN-MEMORY STORAGE
// ============================================================================

#[derive(Debug, Clone)]
struct FileNode {
    content: String,
    mode: u32,
}

/// Files and directories keyed by normalized path.
#[derive(Debug)]
struct Tree {
    files: BTreeMap<String, FileNode>,
    dirs: BTreeMap<String, u32>,
}

impl Default for Tree {
    fn default() -> Self {
        let mut dirs = BTreeMap::new();
        dirs.insert(ROOT.to_string(), DEFAULT_DIR_MODE);
        Self {
            files: BTreeMap::new(),
            dirs,
        }
    }
}

impl Tree {
    /// Create every missing ancestor of `key`, failing if one is a file.
    fn create_ancestors(&mut self, key: &str) -> StrataResult<()> {
        let ancestors = path::ancestors(key);
        if let Some(blocked) = ancestors.iter().find(|a| self.files.contains_key(**a)) {
            return Err(StrataError::Storage(StorageError::NotADirectory {
                path: blocked.to_string(),
            }));
        }
        for ancestor in ancestors {
            self.dirs
                .entry(ancestor.to_string())
                .or_insert(DEFAULT_DIR_MODE);
        }
        Ok(())
    }

    /// Fail unless `key` is an existing directory.
    fn require_dir(&self, key: &str) -> StrataResult<()> {
        if self.dirs.contains_key(key) {
            Ok(())
        } else if self.files.contains_key(key) {
            Err(StrataError::Storage(StorageError::NotADirectory {
                path: key.to_string(),
            }))
        } else {
            Err(StrataError::Storage(StorageError::not_found(key)))
        }
    }

    /// Remove everything strictly beneath `dir`.
    fn remove_under(&mut self, dir: &str) {
        let prefix = path::dir_prefix(dir);
        self.files.retain(|k, _| !k.starts_with(&prefix));
        self.dirs.retain(|k, _| k == ROOT || !k.starts_with(&prefix));
    }
}

/// In-memory storage backend.
///
/// The root `/` always exists; writes create missing parent directories.
/// Clones share the same tree.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    tree: Arc<RwLock<Tree>>,
}

impl InMemoryStorage {
    /// Create an empty storage holding only the root directory.
    pub fn new() -> Self {
        Self::default()
    }

    fn read_tree(&self) -> StrataResult<RwLockReadGuard<'_, Tree>> {
        self.tree
            .read()
            .map_err(|_| StrataError::Storage(StorageError::LockPoisoned))
    }

    fn write_tree(&self) -> StrataResult<RwLockWriteGuard<'_, Tree>> {
        self.tree
            .write()
            .map_err(|_| StrataError::Storage(StorageError::LockPoisoned))
    }

    /// Remove all files and directories except the root.
    pub fn clear(&self) -> StrataResult<()> {
        *self.write_tree()? = Tree::default();
        Ok(())
    }

    /// Number of stored files.
    pub fn file_count(&self) -> StrataResult<usize> {
        Ok(self.read_tree()?.files.len())
    }
}

impl StorageTrait for InMemoryStorage {
    fn exists(&self, path: &str) -> StrataResult<bool> {
        let key = path::normalize_dir(path);
        let tree = self.read_tree()?;
        Ok(tree.files.contains_key(key) || tree.dirs.contains_key(key))
    }

    fn read(&self, path: &str) -> StrataResult<String> {
        let key = path::normalize_dir(path);
        let tree = self.read_tree()?;
        match tree.files.get(key) {
            Some(node) => Ok(node.content.clone()),
            None if tree.dirs.contains_key(key) => {
                Err(StrataError::Storage(StorageError::IsADirectory {
                    path: key.to_string(),
                }))
            }
            None => Err(StrataError::Storage(StorageError::not_found(key))),
        }
    }

    fn write(&self, path: &str, data: &str) -> StrataResult<()> {
        let key = path::normalize_dir(path);
        let mut tree = self.write_tree()?;
        if tree.dirs.contains_key(key) {
            return Err(StrataError::Storage(StorageError::IsADirectory {
                path: key.to_string(),
            }));
        }
        tree.create_ancestors(key)?;

        let mode = tree
            .files
            .get(key)
            .map(|node| node.mode)
            .unwrap_or(DEFAULT_FILE_MODE);
        tree.files.insert(
            key.to_string(),
            FileNode {
                content: data.to_string(),
                mode,
            },
        );
        Ok(())
    }

    fn delete(&self, path: &str) -> StrataResult<()> {
        let key = path::normalize_dir(path);
        let mut tree = self.write_tree()?;
        if tree.files.remove(key).is_some() {
            Ok(())
        } else if tree.dirs.contains_key(key) {
            Err(StrataError::Storage(StorageError::IsADirectory {
                path: key.to_string(),
            }))
        } else {
            Err(StrataError::Storage(StorageError::not_found(key)))
        }
    }

    fn list_directory(&self, path: &str) -> StrataResult<Vec<String>> {
        let dir = path::normalize_dir(path);
        let tree = self.read_tree()?;
        tree.require_dir(dir)?;

        let files = tree
            .files
            .keys()
            .filter(|k| path::parent_dir(k) == dir)
            .map(|k| path::file_name(k).to_string());
        let dirs = tree
            .dirs
            .keys()
            .filter(|k| k.as_str() != ROOT && path::parent_dir(k) == dir)
            .map(|k| format!("{}{}", path::file_name(k), path::SEPARATOR));

        let mut children: Vec<String> = files.chain(dirs).collect();
        children.sort();
        Ok(children)
    }

    fn ensure_directory(&self, path: &str) -> StrataResult<()> {
        let key = path::normalize_dir(path);
        let mut tree = self.write_tree()?;
        if tree.files.contains_key(key) {
            return Err(StrataError::Storage(StorageError::AlreadyExists {
                path: key.to_string(),
            }));
        }
        tree.create_ancestors(key)?;
        tree.dirs.entry(key.to_string()).or_insert(DEFAULT_DIR_MODE);
        Ok(())
    }

    fn delete_directory(&self, path: &str) -> StrataResult<()> {
        let key = path::normalize_dir(path);
        if key == ROOT {
            return Err(StrataError::Storage(StorageError::PermissionDenied {
                path: key.to_string(),
            }));
        }
        let mut tree = self.write_tree()?;
        tree.require_dir(key)?;
        tree.remove_under(key);
        tree.dirs.remove(key);
        Ok(())
    }

    fn set_permissions(&self, path: &str, mode: u32) -> StrataResult<()> {
        let key = path::normalize_dir(path);
        let mut tree = self.write_tree()?;
        if let Some(node) = tree.files.get_mut(key) {
            node.mode = mode;
            return Ok(());
        }
        match tree.dirs.get_mut(key) {
            Some(dir_mode) => {
                *dir_mode = mode;
                Ok(())
            }
            None => Err(StrataError::Storage(StorageError::not_found(key))),
        }
    }

    fn stat(&self, path: &str) -> StrataResult<FileStat> {
        let key = path::normalize_dir(path);
        let tree = self.read_tree()?;
        if let Some(node) = tree.files.get(key) {
            return Ok(FileStat::file(node.content.len() as u64, node.mode));
        }
        tree.dirs
            .get(key)
            .map(|mode| FileStat::dir(*mode))
            .ok_or_else(|| StrataError::Storage(StorageError::not_found(key)))
    }

    fn clear_subtree(&self, path: &str) -> StrataResult<()> {
        let key = path::normalize_dir(path);
        let mut tree = self.write_tree()?;
        tree.require_dir(key)?;
        tree.remove_under(key);
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
