use std::collections::HashSet;
use std::sync::Arc;

use arsrpc_common::{ArsrpcError, Result};
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::diff::{diff, normalize};
use crate::directory::DirectoryClient;
use crate::update::EndpointUpdate;

#[derive(Debug, Default)]
struct WatcherState {
    initialized: bool,
    /// Endpoints announced so far; equals the latest listing after each call
    known: HashSet<String>,
}

/// Turns changes of one directory path into endpoint update batches.
///
/// The first [`next`](Self::next) announces the current listing. Every later
/// call blocks until the directory reports a change and returns the
/// difference to what was announced before, so an address is never added
/// twice without being removed in between. Calls are serialised.
pub struct Watcher {
    directory: Arc<dyn DirectoryClient>,
    path: String,
    state: Mutex<WatcherState>,
    shutdown: CancellationToken,
}

impl Watcher {
    pub fn new(directory: Arc<dyn DirectoryClient>, path: impl Into<String>) -> Self {
        Self {
            directory,
            path: path.into(),
            state: Mutex::new(WatcherState::default()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Returns the next batch of updates.
    ///
    /// The batch may be empty when the directory changed and changed back.
    ///
    /// # Errors
    ///
    /// - [`ArsrpcError::WatcherClosed`] once [`close`](Self::close) was
    ///   called, including for a call blocked at that moment
    /// - any directory error; the known endpoints are left untouched so the
    ///   call can simply be retried
    pub async fn next(&self) -> Result<Vec<EndpointUpdate>> {
        let mut state = tokio::select! {
            _ = self.shutdown.cancelled() => return Err(ArsrpcError::WatcherClosed),
            state = self.state.lock() => state,
        };
        if self.is_closed() {
            return Err(ArsrpcError::WatcherClosed);
        }

        if !state.initialized {
            let listing = tokio::select! {
                _ = self.shutdown.cancelled() => return Err(ArsrpcError::WatcherClosed),
                listing = self.directory.list_children(&self.path) => listing,
            };
            // Only a listing that came back counts; an abandoned call lists again
            state.initialized = true;
            match listing {
                Ok(children) => {
                    let listing = normalize(children);
                    if !listing.is_empty() {
                        info!(path = %self.path, endpoints = listing.len(), "Discovered initial endpoints");
                        state.known = listing.iter().cloned().collect();
                        return Ok(listing.into_iter().map(EndpointUpdate::add).collect());
                    }
                }
                Err(e) => {
                    debug!(path = %self.path, error = %e, "Initial listing failed, waiting for changes");
                }
            }
        }

        let children = tokio::select! {
            _ = self.shutdown.cancelled() => return Err(ArsrpcError::WatcherClosed),
            children = self.directory.watch_children(&self.path) => children?,
        };

        let (updates, known) = diff(&state.known, children);
        state.known = known;
        if !updates.is_empty() {
            debug!(path = %self.path, updates = updates.len(), "Endpoints changed");
        }
        Ok(updates)
    }

    /// Stops the watcher. A blocked [`next`](Self::next) returns
    /// [`ArsrpcError::WatcherClosed`], as does every later call.
    pub fn close(&self) {
        if !self.shutdown.is_cancelled() {
            debug!(path = %self.path, "Closing watcher");
            self.shutdown.cancel();
        }
    }

    /// Yields update batches until the watcher is closed.
    ///
    /// Directory errors are yielded as items and the stream keeps going.
    pub fn into_stream(self: Arc<Self>) -> BoxStream<'static, Result<Vec<EndpointUpdate>>> {
        stream::unfold(self, |watcher| async move {
            let batch = watcher.next().await;
            match batch {
                Err(ArsrpcError::WatcherClosed) => None,
                batch => Some((batch, watcher)),
            }
        })
        .boxed()
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}
