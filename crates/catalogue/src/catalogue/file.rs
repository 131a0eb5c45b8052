use crate::DatePath;
use crate::catalogue::error::{ErrorKind, Result as CatalogueResult};
use crate::error::{ErrorKind as LibraryErrorKind, Result as LibraryResult};
use crate::materialize::materialize;
use crate::tree::{FileEntry, NodeId, Tree};
use exn::ResultExt;
use pcat_store::StoreHandle;

/// The outcome of (successfully) handling a single media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// File was moved into its date folder.
    Moved { name: String, destination: DatePath },
    /// A file with the same name is already in the date folder; nothing moved.
    AlreadyExists { name: String, destination: DatePath },
    /// File has no capture date and was left where it is.
    Uncatalogable(String),
}
impl Action {
    pub fn name(&self) -> &str {
        match self {
            Self::Moved { name, .. } | Self::AlreadyExists { name, .. } | Self::Uncatalogable(name) => name,
        }
    }
}

/// Moves one file from the `source` snapshot into its date folder under
/// `target`, creating folders as needed.
///
/// `parent` is the node currently holding `file` in `source`. On success both
/// snapshots are updated to reflect the move, so later calls see the file in
/// its new location.
///
/// # Errors
/// Returns [`Exn<LibraryErrorKind::Catalogue>`](LibraryErrorKind::Catalogue)
/// raised from an inner [`Exn<ErrorKind>`](ErrorKind).
pub async fn catalogue_file(
    store: &StoreHandle,
    source: &mut Tree,
    target: &mut Tree,
    parent: NodeId,
    file: FileEntry,
) -> LibraryResult<Action> {
    catalogue_file_inner(store, source, target, parent, file).await.or_raise(|| LibraryErrorKind::Catalogue)
}

pub(crate) async fn catalogue_file_inner(
    store: &StoreHandle,
    source: &mut Tree,
    target: &mut Tree,
    parent: NodeId,
    file: FileEntry,
) -> CatalogueResult<Action> {
    let Some(capture) = file.capture else {
        tracing::info!(file = %file.name, folder = %source.path_of(parent), "No capture date; leaving file in place");
        return Ok(Action::Uncatalogable(file.name));
    };
    let destination = DatePath::from(&capture);
    let root = target.root();
    let folder = materialize(store, target, root, &destination.segments()).await?;
    // An unlisted name in a partly listed folder may still exist remotely.
    if !target.node(folder).is_complete() {
        exn::bail!(ErrorKind::IncompleteDestination(target.path_of(folder)));
    }

    if target.node(folder).has_file_named(&file.name) {
        tracing::info!(file = %file.name, %destination, "Destination already has a file with this name; skipping");
        return Ok(Action::AlreadyExists {
            name: file.name,
            destination,
        });
    }

    store
        .move_entry(&file.file_id, &source.node(parent).folder_id, &target.node(folder).folder_id)
        .await
        .or_raise(|| ErrorKind::MoveFailed(file.name.clone()))?;
    tracing::info!(file = %file.name, from = %source.path_of(parent), %destination, "Moved file");

    let name = file.name.clone();
    let entry = source.take_file(parent, &file.file_id).unwrap_or(file);
    target.add_file(folder, entry);
    Ok(Action::Moved { name, destination })
}
