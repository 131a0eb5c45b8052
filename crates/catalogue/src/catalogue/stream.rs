use crate::Context;
use crate::catalogue::error::{ErrorKind, Result as CatalogueResult};
use crate::catalogue::file::{Action, catalogue_file_inner};
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::tree::error::ErrorKind as TreeErrorKind;
use crate::tree::{FileEntry, NodeId, RootRef, Tree, TreeBuilder};
use async_stream::stream;
use derive_more::Display;
use exn::ResultExt;
use futures::Stream;
use pcat_store::StoreHandle;
use std::ops::Deref;

/// Which side of the run a snapshot tree belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TreeRole {
    #[display("source")]
    Source,
    #[display("target")]
    Target,
}

/// Progress events emitted by [`catalogue`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. [`TreeBuilt`](Self::TreeBuilt), once for the source and then once for
///    the target.
/// 3. [`DiscoveryComplete`](Self::DiscoveryComplete), exactly once, with the
///    number of media files found under the source.
/// 4. [`Catalogued`](Self::Catalogued) (or an `Err` item), once per file.
/// 5. [`Complete`](Self::Complete), exactly once, signalling the stream is
///    finished.
///
/// A fatal error terminates the stream early, in which case
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogueEvent {
    /// Cataloguing has begun; emitted exactly once before any other event.
    Started,
    /// A snapshot tree has been built.
    TreeBuilt {
        role: TreeRole,
        root: String,
        folders: usize,
        files: usize,
        /// `false` when some folders could only be listed partially.
        complete: bool,
    },
    /// All source media files have been discovered; the total count is now known.
    DiscoveryComplete(u64),
    /// A file has been handled.
    Catalogued(Action),
    /// Every discovered file has been handled; the stream is finished.
    Complete,
}
impl CatalogueEvent {
    fn tree_built(role: TreeRole, tree: &Tree) -> Self {
        Self::TreeBuilt {
            role,
            root: tree.node(tree.root()).name.clone(),
            folders: tree.folder_count(),
            files: tree.file_count(),
            complete: tree.is_complete(),
        }
    }
}

/// Tally of per-file outcomes over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[display("{moved} moved, {already_existed} already existed, {uncatalogable} uncatalogable, {failed} failed")]
pub struct Summary {
    pub moved: u64,
    pub already_existed: u64,
    pub uncatalogable: u64,
    pub failed: u64,
}
impl Summary {
    pub fn record(&mut self, action: &Action) {
        match action {
            Action::Moved { .. } => self.moved += 1,
            Action::AlreadyExists { .. } => self.already_existed += 1,
            Action::Uncatalogable(_) => self.uncatalogable += 1,
        }
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> u64 {
        self.moved + self.already_existed + self.uncatalogable + self.failed
    }
}

/// Streams [`CatalogueEvent`]s while moving every media file under `source`
/// into a `YYYY/MM/DD` folder under `target`.
///
/// Both hierarchies are snapshotted once, source first, before any file is
/// touched. Files are then handled one at a time, in pre-order of the source
/// tree. A `source` name that matches no folder makes for an empty run.
///
/// The stream yields events in the order documented on [`CatalogueEvent`].
/// Individual file failures are surfaced as `Err` items without terminating
/// the stream; only failing to resolve either root is fatal, and a missing
/// target is detected before any folder is created or file moved.
pub fn catalogue<'a>(
    store: &'a StoreHandle,
    ctx: &'a Context,
    source: RootRef,
    target: RootRef,
) -> impl Stream<Item = LibraryResult<CatalogueEvent>> + 'a {
    // `rustfmt` does not format macro-specific syntax such as
    // `for await` even using the parentheses trick.
    stream! {
        for await event in catalogue_inner(store, ctx, source, target) {
            yield event.or_raise(|| LibraryErrorKind::Catalogue);
        }
    }
}

fn catalogue_inner<'a>(
    store: &'a StoreHandle,
    ctx: &'a Context,
    source: RootRef,
    target: RootRef,
) -> impl Stream<Item = CatalogueResult<CatalogueEvent>> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(CatalogueEvent::Started);
        let builder = TreeBuilder::new(store, ctx);

        let mut source_tree = match builder.build(&source).await.or_raise(|| ErrorKind::Tree) {
            Ok(tree) => tree,
            Err(e) => {
                yield Err(e);
                return;
            },
        };
        yield Ok(CatalogueEvent::tree_built(TreeRole::Source, &source_tree));

        // Unlike the source, a target that can't be found stops the run.
        let mut target_tree = match builder.resolve(&target).await {
            Ok((id, name)) => builder.build_from(&id, &name).await,
            Err(e) if matches!(e.deref(), TreeErrorKind::FolderNotFound(_)) => {
                tracing::error!(store = store.name(), target = %target, "Target folder not found; nothing will be moved");
                yield Err(e).or_raise(|| ErrorKind::FolderNotFound(target.to_string()));
                return;
            },
            Err(e) => {
                yield Err(e).or_raise(|| ErrorKind::Tree);
                return;
            },
        };
        yield Ok(CatalogueEvent::tree_built(TreeRole::Target, &target_tree));

        let files: Vec<(NodeId, FileEntry)> = source_tree.files().map(|(parent, file)| (parent, file.clone())).collect();
        // Infallible: a usize (either 32- or 64-bit) will always fit in a u64.
        yield Ok(CatalogueEvent::DiscoveryComplete(u64::try_from(files.len()).unwrap_or(0)));

        for (parent, file) in files {
            let result = catalogue_file_inner(store, &mut source_tree, &mut target_tree, parent, file).await;
            if let Err(e) = &result {
                tracing::warn!(error = ?e, "Could not catalogue file");
            }
            yield result.map(CatalogueEvent::Catalogued);
        }

        yield Ok(CatalogueEvent::Complete);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moved(name: &str) -> Action {
        Action::Moved {
            name: name.to_string(),
            destination: crate::DatePath { year: 2022, month: 11, day: 5 },
        }
    }

    #[test]
    fn test_summary() {
        let mut summary = Summary::default();
        summary.record(&moved("A.jpg"));
        summary.record(&moved("B.jpg"));
        summary.record(&Action::Uncatalogable("C.jpg".to_string()));
        summary.record(&Action::AlreadyExists {
            name: "A.jpg".to_string(),
            destination: crate::DatePath { year: 2022, month: 11, day: 5 },
        });
        summary.record_failure();
        assert_eq!(summary.total(), 5);
        assert_eq!(summary.to_string(), "2 moved, 1 already existed, 1 uncatalogable, 1 failed");
    }

    #[test]
    fn test_role_display() {
        assert_eq!(TreeRole::Source.to_string(), "source");
        assert_eq!(TreeRole::Target.to_string(), "target");
    }
}
