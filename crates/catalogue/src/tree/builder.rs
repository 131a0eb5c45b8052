use crate::tree::error::{ErrorKind, Result as TreeResult};
use crate::tree::{FileEntry, NodeId, RootRef, Tree};
use crate::{Classification, Classifier, Context};
use exn::ResultExt;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use pcat_store::error::{Error as StoreError, ErrorKind as StoreErrorKind};
use pcat_store::{RawEntry, ROOT_ID, StoreHandle};
use std::collections::HashSet;
use std::ops::Deref;
use tracing::instrument;

/// Builds [`Tree`] snapshots by listing a store folder by folder.
///
/// Traversal uses an explicit work-stack instead of recursion, so arbitrarily
/// deep hierarchies can't overflow the call stack. Pages within one folder are
/// always fetched in sequence; up to [`Context::concurrency`] sibling folders
/// are listed at the same time, but only this builder ever touches the tree.
pub struct TreeBuilder<'a> {
    store: &'a StoreHandle,
    classifier: Classifier,
    concurrency: usize,
}

struct Listing {
    node: NodeId,
    entries: Vec<RawEntry>,
    error: Option<StoreError>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(store: &'a StoreHandle, ctx: &Context) -> Self {
        Self {
            store,
            classifier: ctx.classifier,
            concurrency: ctx.concurrency.max(1),
        }
    }

    /// Look up the folder a [`RootRef`] points at, returning its id and name.
    ///
    /// Names are only matched against top-level folders. When several folders
    /// share the name, the first one reported by the store wins.
    ///
    /// # Errors
    /// - [`ErrorKind::FolderNotFound`] if no folder matches.
    /// - [`ErrorKind::NotAFolder`] if an id resolves to a file.
    /// - [`ErrorKind::Storage`] if the store couldn't be asked.
    pub async fn resolve(&self, root: &RootRef) -> TreeResult<(String, String)> {
        let (id, name) = match root {
            RootRef::Sentinel => (ROOT_ID.to_string(), ROOT_ID.to_string()),
            RootRef::Id(id) => {
                let entry = match self.store.get_entry(id).await {
                    Ok(entry) => entry,
                    Err(e) if matches!(e.deref(), StoreErrorKind::NotFound(_)) => {
                        return Err(e).or_raise(|| ErrorKind::FolderNotFound(id.clone()));
                    },
                    Err(e) => return Err(e).or_raise(|| ErrorKind::Storage),
                };
                if !entry.is_folder() {
                    exn::bail!(ErrorKind::NotAFolder(id.clone()));
                }
                (entry.id, entry.name)
            },
            RootRef::Name(name) => {
                let mut matches = self.store.find_folders_by_name(name).await.or_raise(|| ErrorKind::Storage)?;
                if matches.len() > 1 {
                    tracing::warn!(store = self.store.name(), folder = name.as_str(), matches = matches.len(), "Found more than one folder with this name; using the first");
                }
                if matches.is_empty() {
                    exn::bail!(ErrorKind::FolderNotFound(name.clone()));
                }
                let first = matches.swap_remove(0);
                (first.id, first.name)
            },
        };
        tracing::info!(store = self.store.name(), root = %root, folder_id = id.as_str(), "Resolved root folder");
        Ok((id, name))
    }

    /// Resolve `root` and snapshot everything beneath it.
    ///
    /// A name that matches no folder is reported and produces an empty,
    /// [unresolved](Tree::is_resolved) tree rather than an error.
    pub async fn build(&self, root: &RootRef) -> TreeResult<Tree> {
        match self.resolve(root).await {
            Ok((id, name)) => Ok(self.build_from(&id, &name).await),
            Err(e) if matches!(root, RootRef::Name(_)) && matches!(e.deref(), ErrorKind::FolderNotFound(_)) => {
                tracing::warn!(store = self.store.name(), root = %root, "No folder found; continuing with an empty tree");
                Ok(Tree::unresolved(root.to_string()))
            },
            Err(e) => Err(e),
        }
    }

    /// Snapshot the hierarchy under a known folder id.
    ///
    /// Never fails: a folder whose listing errors keeps whatever entries were
    /// already fetched, is [marked incomplete](crate::tree::DirectoryNode::is_complete)
    /// and its unlisted subtree is skipped. Everything else is still built.
    #[instrument(skip(self), fields(store = self.store.name()))]
    pub async fn build_from(&self, folder_id: &str, name: &str) -> Tree {
        let mut tree = Tree::new(folder_id, name);
        let mut seen_files = HashSet::new();
        let mut pending = vec![tree.root()];
        let mut listing = FuturesUnordered::new();
        loop {
            while listing.len() < self.concurrency
                && let Some(node) = pending.pop()
            {
                listing.push(self.list_folder(node, tree.node(node).folder_id.clone()));
            }
            let Some(Listing { node, entries, error }) = listing.next().await else {
                break;
            };
            if let Some(e) = error {
                tracing::warn!(folder = %tree.path_of(node), listed = entries.len(), error = ?e, "Listing failed; subtree will be incomplete");
                tree.mark_incomplete(node);
            }
            tracing::debug!(folder = %tree.path_of(node), entries = entries.len(), "Listed folder");

            let mut children = Vec::new();
            for raw in entries {
                match self.classifier.classify(&raw) {
                    Classification::Folder => match tree.add_folder(node, raw.id.as_str(), raw.name.as_str()) {
                        Some(child) => children.push(child),
                        None => tracing::warn!(folder = %tree.path_of(node), folder_id = %raw.id, "Folder already visited; skipping (cyclic hierarchy?)"),
                    },
                    Classification::Media(capture) => {
                        if !seen_files.insert(raw.id.clone()) {
                            tracing::warn!(folder = %tree.path_of(node), file_id = %raw.id, "File listed in more than one folder; keeping the first");
                            continue;
                        }
                        tree.add_file(node, FileEntry {
                            file_id: raw.id,
                            name: raw.name,
                            mime_type: raw.mime_type,
                            capture,
                        });
                    },
                    Classification::Ignored => {
                        tracing::trace!(name = %raw.name, mime_type = %raw.mime_type, "Ignoring entry");
                    },
                }
            }
            // Reversed so the first child is the next one popped (pre-order).
            pending.extend(children.into_iter().rev());
        }
        tracing::info!(
            root = %name,
            folders = tree.folder_count(),
            files = tree.file_count(),
            complete = tree.is_complete(),
            "Built snapshot tree"
        );
        tree
    }

    /// Fetch every page of one folder, keeping what was listed before any error.
    async fn list_folder(&self, node: NodeId, folder_id: String) -> Listing {
        let mut entries = Vec::new();
        let mut stream = self.store.children_stream(&folder_id);
        while let Some(item) = stream.next().await {
            match item {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    return Listing {
                        node,
                        entries,
                        error: Some(error),
                    };
                },
            }
        }
        Listing { node, entries, error: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcat_store::RemoteStore;
    use pcat_store::backend::{Call, MockStore, Operation};
    use rstest::rstest;
    use std::sync::Arc;
    use time::macros::datetime;

    fn ctx(concurrency: usize) -> Context {
        Context {
            concurrency,
            ..Context::default()
        }
    }

    fn jpeg(id: &str, name: &str) -> RawEntry {
        RawEntry::file(id, name, "image/jpeg").with_taken(datetime!(2022-11-05 10:00))
    }

    async fn build(store: MockStore, root: RootRef, concurrency: usize) -> (Arc<MockStore>, TreeResult<Tree>) {
        let mock = Arc::new(store);
        let handle: StoreHandle = mock.clone();
        let tree = TreeBuilder::new(&handle, &ctx(concurrency)).build(&root).await;
        (mock, tree)
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 1)]
    #[case(3, 1)]
    #[case(7, 1)]
    #[case(100, 1)]
    #[case(2, 4)]
    #[tokio::test]
    async fn test_pagination_collects_every_entry(#[case] page_size: usize, #[case] concurrency: usize) {
        let mut store = MockStore::default().with_page_size(page_size);
        let mobile = store.insert(ROOT_ID, RawEntry::folder("mobile", "Mobile"));
        for i in 0..7 {
            store.insert(&mobile, jpeg(&format!("p{i}"), &format!("IMG_{i}.jpg")));
        }
        let sub = store.insert(&mobile, RawEntry::folder("sub", "Sub"));
        for i in 0..5 {
            store.insert(&sub, jpeg(&format!("s{i}"), &format!("IMG_{i}.jpg")));
        }

        let (_, tree) = build(store, RootRef::Name("Mobile".to_string()), concurrency).await;
        let tree = tree.unwrap();
        assert_eq!(tree.file_count(), 12);
        assert_eq!(tree.folder_count(), 2);
        assert!(tree.is_complete());
        assert_eq!(tree.node(tree.root()).folder_id, "mobile");
    }

    #[tokio::test]
    async fn test_classification_applied() {
        let mut store = MockStore::default();
        store.insert(ROOT_ID, jpeg("p1", "IMG_1.jpg"));
        store.insert(ROOT_ID, RawEntry::file("v1", "clip.mp4", "video/mp4"));
        store.insert(ROOT_ID, RawEntry::file("d1", "notes.txt", "text/plain"));
        store.insert(ROOT_ID, RawEntry::folder("f1", "Empty"));

        let (_, tree) = build(store, RootRef::Sentinel, 1).await;
        let tree = tree.unwrap();
        let names: Vec<_> = tree.files().map(|(_, f)| f.name.as_str()).collect();
        assert_eq!(names, vec!["IMG_1.jpg", "clip.mp4"]);
        assert_eq!(tree.files().next().unwrap().1.capture, Some(datetime!(2022-11-05 10:00).into()));
        assert_eq!(tree.folder_count(), 2);
    }

    #[tokio::test]
    async fn test_preorder_listing_when_sequential() {
        let mut store = MockStore::default();
        let a = store.insert(ROOT_ID, RawEntry::folder("a", "A"));
        store.insert(ROOT_ID, RawEntry::folder("b", "B"));
        store.insert(&a, RawEntry::folder("a1", "A1"));

        let (mock, _) = build(store, RootRef::Sentinel, 1).await;
        let listed: Vec<_> = mock
            .calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                Call::ListChildren { folder_id, .. } => Some(folder_id),
                _ => None,
            })
            .collect();
        assert_eq!(listed, vec!["root", "a", "a1", "b"]);
    }

    #[tokio::test]
    async fn test_failed_subfolder_keeps_siblings() {
        let mut store = MockStore::default().with_page_size(2);
        let mobile = store.insert(ROOT_ID, RawEntry::folder("mobile", "Mobile"));
        let broken = store.insert(&mobile, RawEntry::folder("broken", "Broken"));
        let fine = store.insert(&mobile, RawEntry::folder("fine", "Fine"));
        store.insert(&broken, jpeg("b1", "B1.jpg"));
        let deeper = store.insert(&broken, RawEntry::folder("deeper", "Deeper"));
        store.insert(&deeper, jpeg("d1", "D1.jpg"));
        store.insert(&fine, jpeg("f1", "F1.jpg"));
        store.insert(&fine, jpeg("f2", "F2.jpg"));
        store.insert(&fine, jpeg("f3", "F3.jpg"));
        store.fail(Operation::List, "broken");

        let (_, tree) = build(store, RootRef::Name("Mobile".to_string()), 1).await;
        let tree = tree.unwrap();
        assert!(!tree.is_complete());
        let broken = tree.find_by_folder_id("broken").unwrap();
        assert!(!tree.node(broken).is_complete());
        assert!(tree.node(broken).files().is_empty());
        assert!(tree.find_by_folder_id("deeper").is_none());
        let fine = tree.find_by_folder_id("fine").unwrap();
        assert!(tree.node(fine).is_complete());
        assert_eq!(tree.node(fine).files().len(), 3);
    }

    #[tokio::test]
    async fn test_failure_on_later_page_keeps_earlier_pages() {
        let mut store = MockStore::default().with_page_size(2);
        for i in 0..5 {
            store.insert(ROOT_ID, jpeg(&format!("p{i}"), &format!("IMG_{i}.jpg")));
        }
        let handle: StoreHandle = Arc::new(FailAfterFirstPage(store));
        let tree = TreeBuilder::new(&handle, &ctx(1)).build_from(ROOT_ID, "").await;
        assert_eq!(tree.file_count(), 2);
        assert!(!tree.is_complete());
    }

    /// Lets the first page of every listing through, then fails.
    struct FailAfterFirstPage(MockStore);

    #[async_trait::async_trait]
    impl RemoteStore for FailAfterFirstPage {
        fn name(&self) -> &str {
            self.0.name()
        }

        async fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> pcat_store::error::Result<pcat_store::Page> {
            match page_token {
                None => self.0.list_children(folder_id, None).await,
                Some(_) => exn::bail!(StoreErrorKind::RemoteUnavailable("connection reset".to_string())),
            }
        }

        async fn get_entry(&self, entry_id: &str) -> pcat_store::error::Result<RawEntry> {
            self.0.get_entry(entry_id).await
        }

        async fn find_folders_by_name(&self, name: &str) -> pcat_store::error::Result<Vec<RawEntry>> {
            self.0.find_folders_by_name(name).await
        }

        async fn create_folder(&self, name: &str, parent_id: &str) -> pcat_store::error::Result<String> {
            self.0.create_folder(name, parent_id).await
        }

        async fn move_entry(&self, entry_id: &str, from: &str, to: &str) -> pcat_store::error::Result<()> {
            self.0.move_entry(entry_id, from, to).await
        }
    }

    #[tokio::test]
    async fn test_cycles_are_not_followed() {
        let mut store = MockStore::default();
        let a = store.insert(ROOT_ID, RawEntry::folder("a", "A"));
        let b = store.insert(&a, RawEntry::folder("b", "B"));
        store.insert(&b, jpeg("p1", "IMG_1.jpg"));
        // B lists A as its child: A → B → A → …
        store.link(&b, &a);
        // The same file reported in two folders.
        store.link(&a, "p1");

        let (_, tree) = build(store, RootRef::Sentinel, 1).await;
        let tree = tree.unwrap();
        assert_eq!(tree.folder_count(), 3);
        assert_eq!(tree.file_count(), 1);
    }

    #[tokio::test]
    async fn test_ambiguous_name_uses_first_match() {
        let mut store = MockStore::default();
        store.insert(ROOT_ID, RawEntry::folder("first", "Photos"));
        store.insert(ROOT_ID, RawEntry::folder("second", "Photos"));

        let (_, tree) = build(store, RootRef::Name("Photos".to_string()), 1).await;
        let tree = tree.unwrap();
        assert_eq!(tree.node(tree.root()).folder_id, "first");
        assert!(tree.is_resolved());
    }

    #[tokio::test]
    async fn test_unknown_name_gives_empty_tree() {
        let (mock, tree) = build(MockStore::default(), RootRef::Name("Nope".to_string()), 1).await;
        let tree = tree.unwrap();
        assert!(!tree.is_resolved());
        assert_eq!(tree.file_count(), 0);
        assert!(mock.calls().await.iter().all(|c| !matches!(c, Call::ListChildren { .. })));
    }

    #[tokio::test]
    async fn test_root_by_id() {
        let mut store = MockStore::default();
        let a = store.insert(ROOT_ID, RawEntry::folder("a", "A"));
        store.insert(&a, jpeg("p1", "IMG_1.jpg"));

        let (_, tree) = build(store, RootRef::Id("a".to_string()), 1).await;
        let tree = tree.unwrap();
        assert_eq!(tree.node(tree.root()).name, "A");
        assert_eq!(tree.file_count(), 1);
    }

    #[rstest]
    #[case(RootRef::Id("missing".to_string()))]
    #[case(RootRef::Id("p1".to_string()))]
    #[tokio::test]
    async fn test_bad_root_id_fails(#[case] root: RootRef) {
        let mut store = MockStore::default();
        store.insert(ROOT_ID, jpeg("p1", "IMG_1.jpg"));
        let (_, tree) = build(store, root, 1).await;
        let err = tree.unwrap_err();
        assert!(matches!(&*err, ErrorKind::FolderNotFound(_) | ErrorKind::NotAFolder(_)));
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_resolution() {
        let mut store = MockStore::default();
        store.fail(Operation::Find, "Mobile");
        let (_, tree) = build(store, RootRef::Name("Mobile".to_string()), 1).await;
        assert!(matches!(&*tree.unwrap_err(), ErrorKind::Storage));
    }
}
