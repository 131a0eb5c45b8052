//! Find-or-create of destination folder paths.

use crate::catalogue::error::{ErrorKind, Result};
use crate::tree::{NodeId, Tree};
use exn::{OptionExt, ResultExt};
use pcat_store::{StoreHandle, validate_name};
use tracing::instrument;

/// Walk `segments` down from `from`, creating any folder that doesn't exist
/// yet, and return the deepest node.
///
/// Existing folders are matched by exact name among direct children of the
/// current node. Newly created folders are inserted into `tree` as they are
/// created, so asking for the same path again makes no remote calls.
///
/// # Errors
/// - [`ErrorKind::FolderNotFound`] if `tree` has no remote root.
/// - [`ErrorKind::IncompleteDestination`] if a segment is missing below a
///   folder that was only partly listed. Nothing is created there.
/// - [`ErrorKind::CreateFolderFailed`] if a segment is not a valid folder
///   name or the store refused to create it. Folders created before the
///   failure stay in place.
#[instrument(skip(store, tree, segments), fields(store = store.name(), root = %tree.node(tree.root()).name))]
pub async fn materialize<S: AsRef<str>>(
    store: &StoreHandle,
    tree: &mut Tree,
    from: NodeId,
    segments: &[S],
) -> Result<NodeId> {
    if !tree.is_resolved() {
        exn::bail!(ErrorKind::FolderNotFound(tree.node(tree.root()).name.clone()));
    }
    let mut current = from;
    for segment in segments.iter().map(AsRef::as_ref) {
        if let Some(existing) = tree.find_folder(current, segment) {
            current = existing;
            continue;
        }
        let path = join(tree.path_of(current), segment);
        if !tree.node(current).is_complete() {
            exn::bail!(ErrorKind::IncompleteDestination(path));
        }
        validate_name(segment).or_raise(|| ErrorKind::CreateFolderFailed(path.clone()))?;
        let parent_id = tree.node(current).folder_id.clone();
        let folder_id = store
            .create_folder(segment, &parent_id)
            .await
            .or_raise(|| ErrorKind::CreateFolderFailed(path.clone()))?;
        tracing::info!(folder = %path, folder_id = %folder_id, "Created folder");
        current = tree
            .add_folder(current, folder_id.as_str(), segment)
            .ok_or_raise(|| ErrorKind::CreateFolderFailed(path.clone()))?;
    }
    Ok(current)
}

fn join(parent: String, name: &str) -> String {
    if parent.is_empty() { name.to_string() } else { format!("{parent}/{name}") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcat_store::backend::{Call, MockStore, Operation};
    use pcat_store::{RawEntry, ROOT_ID};
    use std::sync::Arc;

    fn handle(store: MockStore) -> (Arc<MockStore>, StoreHandle) {
        let mock = Arc::new(store);
        let handle: StoreHandle = mock.clone();
        (mock, handle)
    }

    fn creates(calls: &[Call]) -> Vec<(String, String)> {
        calls
            .iter()
            .filter_map(|c| match c {
                Call::CreateFolder { name, parent_id } => Some((name.clone(), parent_id.clone())),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_creates_missing_segments_in_order() {
        let mut store = MockStore::default();
        store.insert(ROOT_ID, RawEntry::folder("archive", "Archive"));
        let (mock, handle) = handle(store);
        let mut tree = Tree::new("archive", "Archive");

        let root = tree.root();
        let day = materialize(&handle, &mut tree, root, &["2022", "11", "05"]).await.unwrap();
        assert_eq!(tree.path_of(day), "2022/11/05");

        let calls = mock.calls().await;
        let created = creates(&calls);
        assert_eq!(created.len(), 3);
        assert_eq!(created[0], ("2022".to_string(), "archive".to_string()));
        assert_eq!(created[1].0, "11");
        assert_eq!(created[2].0, "05");
        // Each folder is created inside the one created just before it.
        assert_eq!(created[2].1, tree.node(tree.node(day).parent().unwrap()).folder_id);
        assert_eq!(mock.resolve("Archive/2022/11/05").await.as_deref(), Some(tree.node(day).folder_id.as_str()));
    }

    #[tokio::test]
    async fn test_second_run_creates_nothing() {
        let (mock, handle) = handle(MockStore::default());
        let mut tree = Tree::new(ROOT_ID, "");

        let root = tree.root();
        let first = materialize(&handle, &mut tree, root, &["2022", "11", "05"]).await.unwrap();
        let second = materialize(&handle, &mut tree, root, &["2022", "11", "05"]).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(creates(&mock.calls().await).len(), 3);

        materialize(&handle, &mut tree, root, &["2022", "11", "06"]).await.unwrap();
        assert_eq!(creates(&mock.calls().await).len(), 4);
    }

    #[tokio::test]
    async fn test_reuses_existing_folders() {
        let (mock, handle) = handle(MockStore::default());
        let mut tree = Tree::new(ROOT_ID, "");
        tree.add_folder(tree.root(), "y2022", "2022").unwrap();

        let root = tree.root();
        let day = materialize(&handle, &mut tree, root, &["2022", "11"]).await.unwrap();
        assert_eq!(creates(&mock.calls().await), vec![("11".to_string(), "y2022".to_string())]);
        assert_eq!(tree.path_of(day), "2022/11");
    }

    #[tokio::test]
    async fn test_creation_failure() {
        let mut store = MockStore::default();
        store.fail(Operation::Create, "11");
        let (_, handle) = handle(store);
        let mut tree = Tree::new(ROOT_ID, "");

        let root = tree.root();
        let err = materialize(&handle, &mut tree, root, &["2022", "11", "05"]).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::CreateFolderFailed(path) if path == "2022/11"));
        // The year folder was created before the failure and is kept.
        assert!(tree.find_folder(tree.root(), "2022").is_some());
    }

    #[tokio::test]
    async fn test_invalid_name_makes_no_remote_call() {
        let (mock, handle) = handle(MockStore::default());
        let mut tree = Tree::new(ROOT_ID, "");

        let root = tree.root();
        let err = materialize(&handle, &mut tree, root, &["a/b"]).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::CreateFolderFailed(_)));
        assert!(mock.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_nothing_created_below_partly_listed_folder() {
        let (mock, handle) = handle(MockStore::default());
        let mut tree = Tree::new(ROOT_ID, "");
        let year = tree.add_folder(tree.root(), "y2022", "2022").unwrap();
        tree.mark_incomplete(year);

        let root = tree.root();
        let err = materialize(&handle, &mut tree, root, &["2022", "11", "05"]).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::IncompleteDestination(path) if path == "2022/11"));
        assert!(mock.calls().await.is_empty());
        assert!(tree.node(year).folders().is_empty());
    }

    #[tokio::test]
    async fn test_existing_path_below_partly_listed_folder_is_reused() {
        let (mock, handle) = handle(MockStore::default());
        let mut tree = Tree::new(ROOT_ID, "");
        let year = tree.add_folder(tree.root(), "y2022", "2022").unwrap();
        let month = tree.add_folder(year, "m11", "11").unwrap();
        tree.mark_incomplete(year);

        let root = tree.root();
        let found = materialize(&handle, &mut tree, root, &["2022", "11"]).await.unwrap();
        assert_eq!(found, month);
        assert!(mock.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_tree() {
        let (mock, handle) = handle(MockStore::default());
        let mut tree = Tree::unresolved("Archive");

        let root = tree.root();
        let err = materialize(&handle, &mut tree, root, &["2022"]).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::FolderNotFound(_)));
        assert!(mock.calls().await.is_empty());
    }
}
