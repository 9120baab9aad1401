//! Directory seam to the coordination service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use arsrpc_common::{ArsrpcError, Result};
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::trace;

/// The two directory primitives endpoint discovery needs.
#[async_trait]
pub trait DirectoryClient: Send + Sync + 'static {
    /// Lists the children of `path`.
    async fn list_children(&self, path: &str) -> Result<Vec<String>>;

    /// Blocks until the children of `path` change, then lists them.
    async fn watch_children(&self, path: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Default)]
struct Node {
    children: Vec<String>,
    version: u64,
}

#[derive(Debug, Default)]
struct Tree {
    nodes: HashMap<String, Node>,
    unavailable: bool,
}

#[derive(Debug)]
struct Shared {
    tree: Mutex<Tree>,
    // Bumped on every mutation to wake blocked watches
    revision: watch::Sender<u64>,
}

/// In-process hierarchical directory.
///
/// Clones share the same tree but act as separate client sessions: each
/// remembers the version of every path it last returned, and
/// [`watch_children`](DirectoryClient::watch_children) resolves as soon as
/// the path is newer than that. A change made between two calls is
/// therefore never missed.
#[derive(Debug)]
pub struct MemoryDirectory {
    shared: Arc<Shared>,
    observed: Mutex<HashMap<String, u64>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                tree: Mutex::new(Tree::default()),
                revision,
            }),
            observed: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the children of `path`, creating the path if needed.
    pub fn set_children<I, S>(&self, path: &str, children: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut tree = lock(&self.shared.tree);
            let node = tree.nodes.entry(path.to_string()).or_default();
            node.children = children.into_iter().map(Into::into).collect();
            node.version += 1;
            trace!(path, version = node.version, "Directory children changed");
        }
        self.bump();
    }

    /// Deletes `path`. Watches on it keep waiting until it is recreated.
    pub fn remove_path(&self, path: &str) {
        let removed = lock(&self.shared.tree).nodes.remove(path).is_some();
        if removed {
            self.bump();
        }
    }

    /// Makes every call fail with a directory error until restored, and
    /// fails watches that are already blocked.
    pub fn set_unavailable(&self, unavailable: bool) {
        lock(&self.shared.tree).unavailable = unavailable;
        self.bump();
    }

    fn bump(&self) {
        self.shared.revision.send_modify(|revision| *revision += 1);
    }

    /// Current children and version of `path`.
    fn snapshot(&self, path: &str) -> Result<Option<(Vec<String>, u64)>> {
        let tree = lock(&self.shared.tree);
        if tree.unavailable {
            return Err(ArsrpcError::Directory("directory unavailable".to_string()));
        }
        Ok(tree
            .nodes
            .get(path)
            .map(|node| (node.children.clone(), node.version)))
    }

    fn observe(&self, path: &str, version: u64) {
        lock(&self.observed).insert(path.to_string(), version);
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryDirectory {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            observed: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl DirectoryClient for MemoryDirectory {
    async fn list_children(&self, path: &str) -> Result<Vec<String>> {
        match self.snapshot(path)? {
            Some((children, version)) => {
                self.observe(path, version);
                Ok(children)
            }
            None => Err(ArsrpcError::Directory(format!("no node at {}", path))),
        }
    }

    async fn watch_children(&self, path: &str) -> Result<Vec<String>> {
        // Subscribe before checking so a concurrent change still wakes us
        let mut revision = self.shared.revision.subscribe();
        let seen = lock(&self.observed).get(path).copied().unwrap_or(0);

        loop {
            if let Some((children, version)) = self.snapshot(path)? {
                if version > seen {
                    self.observe(path, version);
                    return Ok(children);
                }
            }
            revision
                .changed()
                .await
                .map_err(|_| ArsrpcError::Directory("directory dropped".to_string()))?;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
