//! Two-phase emission pipeline.
//!
//! Phase one hands every finished module to the plugin and queues the writes
//! it asks for. Once all queued writes have completed, phase two lets the
//! plugin add assets (entry stubs) which are written below the host's output
//! directory.

use crate::error::{Error, Result};
use crate::fs::OutputFileSystem;
use crate::host::{AssetMap, BuildHost};
use crate::path_map::PathMapping;
use crate::plugin::Plugin;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmitSummary {
    /// Emitted modules, sorted by output path.
    pub written: Vec<PathMapping>,
    /// Modules the plugin declined to emit.
    pub skipped: usize,
    /// Absolute paths of written assets.
    pub assets: Vec<PathBuf>,
}

/// Pending directory-create-then-write tasks.
///
/// Each scheduled write runs on its own tokio task; scheduling never waits.
/// [`WriteQueue::finish`] is the barrier.
pub struct WriteQueue {
    fs: Arc<dyn OutputFileSystem>,
    tasks: JoinSet<Result<PathBuf>>,
}

impl WriteQueue {
    #[must_use]
    pub fn new(fs: Arc<dyn OutputFileSystem>) -> Self {
        Self {
            fs,
            tasks: JoinSet::new(),
        }
    }

    /// Number of writes not yet collected by [`finish`](Self::finish).
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Create the parent directory of `path`, then write `contents` to it.
    pub fn schedule(&mut self, path: PathBuf, contents: String) {
        let fs = Arc::clone(&self.fs);
        self.tasks.spawn(async move {
            if let Some(dir) = path.parent() {
                fs.mkdirp(dir).await.map_err(|source| Error::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
            fs.write_file(&path, &contents)
                .await
                .map_err(|source| Error::Io {
                    path: path.clone(),
                    source,
                })?;
            tracing::info!(path = %path.display(), bytes = contents.len(), "wrote");
            Ok(path)
        });
    }

    /// Wait for every scheduled write.
    ///
    /// All tasks are drained even after a failure; the first failure is
    /// returned. Paths come back sorted.
    pub async fn finish(mut self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.tasks.len());
        let mut first_error = None;

        while let Some(joined) = self.tasks.join_next().await {
            let outcome = joined.map_err(Error::from).and_then(|result| result);
            match outcome {
                Ok(path) => written.push(path),
                Err(e) => {
                    tracing::debug!(error = %e, "write failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        written.sort();
        Ok(written)
    }
}

/// Drive `plugin` over every module of `host`, writing through `fs`.
pub async fn run(
    plugin: &dyn Plugin,
    host: &dyn BuildHost,
    fs: Arc<dyn OutputFileSystem>,
) -> Result<EmitSummary> {
    tracing::debug!(plugin = plugin.name(), modules = host.modules().len(), "emit start");

    let mut queue = WriteQueue::new(Arc::clone(&fs));
    let mut summary = EmitSummary::default();
    let mut targets = FxHashSet::default();

    for module in host.modules() {
        match plugin.succeed_module(host, module) {
            Ok(Some(emit)) => {
                if !targets.insert(emit.mapping.absolute_output_path.clone()) {
                    tracing::warn!(
                        module = %emit.resource.display(),
                        output = %emit.mapping.absolute_output_path,
                        "another module maps to the same output path, last write wins"
                    );
                }
                queue.schedule(
                    PathBuf::from(&emit.mapping.absolute_output_path),
                    emit.code,
                );
                summary.written.push(emit.mapping);
            }
            Ok(None) => summary.skipped += 1,
            Err(e) => {
                // No write may outlive the run.
                if let Err(write_error) = queue.finish().await {
                    tracing::debug!(error = %write_error, "write failed after module error");
                }
                return Err(e);
            }
        }
    }

    queue.finish().await?;
    summary
        .written
        .sort_by(|a, b| a.absolute_output_path.cmp(&b.absolute_output_path));

    let mut assets = AssetMap::new();
    plugin.process_assets(host, &mut assets)?;

    let mut queue = WriteQueue::new(fs);
    for (name, contents) in assets {
        queue.schedule(host.output_path().join(name), contents);
    }
    summary.assets = queue.finish().await?;

    tracing::info!(
        written = summary.written.len(),
        skipped = summary.skipped,
        assets = summary.assets.len(),
        "emit complete"
    );
    Ok(summary)
}
