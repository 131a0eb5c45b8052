//! In-memory remote store for testing.

use crate::entry::{Page, ROOT_ID, RawEntry};
use crate::error::{ErrorKind, Result};
use crate::name::validate as validate_name;
use crate::RemoteStore;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Default number of entries per listing page.
const DEFAULT_PAGE_SIZE: usize = 100;

/// A remote call recorded by [`MockStore`], in the order it was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListChildren { folder_id: String, page_token: Option<String> },
    GetEntry(String),
    FindFolders(String),
    CreateFolder { name: String, parent_id: String },
    MoveEntry { entry_id: String, from: String, to: String },
}

/// Operations that can have failures injected.
///
/// The failure key depends on the operation: the folder id for
/// [`List`](Self::List), the entry id for [`Get`](Self::Get) and
/// [`Move`](Self::Move), and the requested name for [`Find`](Self::Find)
/// and [`Create`](Self::Create).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Get,
    Find,
    Create,
    Move,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, RawEntry>,
    children: HashMap<String, Vec<String>>,
    /// `None` fails forever, `Some(n)` fails the next `n` calls.
    failures: HashMap<(Operation, String), Option<usize>>,
    calls: Vec<Call>,
    next_id: u64,
}
impl State {
    fn should_fail(&mut self, op: Operation, key: &str) -> bool {
        match self.failures.get_mut(&(op, key.to_string())) {
            Some(None) => true,
            Some(Some(remaining)) if *remaining > 0 => {
                *remaining -= 1;
                true
            },
            _ => false,
        }
    }

    fn is_folder(&self, id: &str) -> bool {
        self.children.contains_key(id)
    }
}

/// In-memory remote store for testing.
///
/// Entries and folder listings live in maps behind a [`RwLock`], so all trait
/// methods operate on `&self`. Setup methods take `&mut self` and don't need
/// a runtime. Every remote call is recorded (see [`calls`](Self::calls)) and
/// failures can be injected per operation and key.
///
/// # Examples
///
/// ```
/// use pcat_store::backend::MockStore;
/// use pcat_store::{RawEntry, RemoteStore, ROOT_ID};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut store = MockStore::default().with_page_size(2);
/// let mobile = store.insert(ROOT_ID, RawEntry::folder("mobile", "Mobile"));
/// store.insert(&mobile, RawEntry::file("p1", "IMG_1.jpg", "image/jpeg"));
///
/// let found = store.find_folders_by_name("Mobile").await.unwrap();
/// assert_eq!(found[0].id, "mobile");
/// # }
/// ```
pub struct MockStore {
    name: String,
    page_size: usize,
    state: RwLock<State>,
}

impl MockStore {
    /// Change the number of entries returned per listing page.
    ///
    /// Panics on zero; a store that never advances is a broken test setup.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        assert!(page_size > 0, "MockStore::with_page_size: page size must be positive");
        self.page_size = page_size;
        self
    }

    /// Insert an entry under `parent`, returning its id.
    ///
    /// Panics if the parent is not a known folder or the id is already used.
    /// If test setup is wrong, then test should not pass.
    pub fn insert(&mut self, parent: &str, entry: RawEntry) -> String {
        let state = self.state.get_mut();
        assert!(state.is_folder(parent), "MockStore::insert: unknown parent folder {parent}");
        assert!(!state.entries.contains_key(&entry.id), "MockStore::insert: duplicate id {}", entry.id);
        let id = entry.id.clone();
        if entry.is_folder() {
            state.children.insert(id.clone(), Vec::new());
        }
        state.entries.insert(id.clone(), entry);
        state.children.entry(parent.to_string()).or_default().push(id.clone());
        id
    }

    /// List an existing entry as a child of a second folder as well.
    ///
    /// Real drives can report malformed parent/child links; this is how tests
    /// build them (including cycles).
    pub fn link(&mut self, parent: &str, id: &str) {
        let state = self.state.get_mut();
        assert!(state.is_folder(parent), "MockStore::link: unknown parent folder {parent}");
        assert!(state.entries.contains_key(id), "MockStore::link: unknown entry {id}");
        state.children.entry(parent.to_string()).or_default().push(id.to_string());
    }

    /// Make every call of `op` for `key` fail with
    /// [`RemoteUnavailable`](ErrorKind::RemoteUnavailable).
    pub fn fail(&mut self, op: Operation, key: impl Into<String>) {
        self.state.get_mut().failures.insert((op, key.into()), None);
    }

    /// Make the next `times` calls of `op` for `key` fail, then succeed.
    pub fn fail_times(&mut self, op: Operation, key: impl Into<String>, times: usize) {
        self.state.get_mut().failures.insert((op, key.into()), Some(times));
    }

    /// Every call received so far, in order.
    pub async fn calls(&self) -> Vec<Call> {
        self.state.read().await.calls.clone()
    }

    /// Names of a folder's direct children, in listing order.
    pub async fn child_names(&self, folder_id: &str) -> Vec<String> {
        let state = self.state.read().await;
        state
            .children
            .get(folder_id)
            .map(|ids| ids.iter().filter_map(|id| state.entries.get(id)).map(|e| e.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Id of the first direct child of `parent` named `name`.
    pub async fn child_id(&self, parent: &str, name: &str) -> Option<String> {
        let state = self.state.read().await;
        state.children.get(parent)?.iter().find(|id| state.entries.get(*id).is_some_and(|e| e.name == name)).cloned()
    }

    /// Resolve a `/`-separated path of names from the root to an id.
    pub async fn resolve(&self, path: &str) -> Option<String> {
        let mut current = ROOT_ID.to_string();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = self.child_id(&current, segment).await?;
        }
        Some(current)
    }

    async fn record(&self, call: Call) {
        self.state.write().await.calls.push(call);
    }

    fn unavailable(op: Operation, key: &str) -> crate::error::Error {
        exn::Exn::from(ErrorKind::RemoteUnavailable(format!("injected {op:?} failure for {key}")))
    }
}
impl Default for MockStore {
    fn default() -> Self {
        let mut state = State::default();
        state.children.insert(ROOT_ID.to_string(), Vec::new());
        Self {
            name: "mock".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            state: RwLock::new(state),
        }
    }
}

#[async_trait]
impl RemoteStore for MockStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<Page> {
        self.record(Call::ListChildren {
            folder_id: folder_id.to_string(),
            page_token: page_token.map(str::to_string),
        })
        .await;
        let mut state = self.state.write().await;
        if state.should_fail(Operation::List, folder_id) {
            return Err(Self::unavailable(Operation::List, folder_id));
        }
        let offset = match page_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| exn::Exn::from(ErrorKind::BackendError(format!("invalid page token {token:?}"))))?,
        };
        let ids = state.children.get(folder_id).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(folder_id.to_string())))?;
        let end = (offset + self.page_size).min(ids.len());
        let entries = ids
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| state.entries.get(id))
            .cloned()
            .collect();
        let next = (end < ids.len()).then(|| end.to_string());
        Ok(Page::new(entries, next))
    }

    async fn get_entry(&self, entry_id: &str) -> Result<RawEntry> {
        self.record(Call::GetEntry(entry_id.to_string())).await;
        let mut state = self.state.write().await;
        if state.should_fail(Operation::Get, entry_id) {
            return Err(Self::unavailable(Operation::Get, entry_id));
        }
        if entry_id == ROOT_ID {
            return Ok(RawEntry::folder(ROOT_ID, ""));
        }
        state.entries.get(entry_id).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(entry_id.to_string())))
    }

    async fn find_folders_by_name(&self, name: &str) -> Result<Vec<RawEntry>> {
        self.record(Call::FindFolders(name.to_string())).await;
        let mut state = self.state.write().await;
        if state.should_fail(Operation::Find, name) {
            return Err(Self::unavailable(Operation::Find, name));
        }
        let top = state.children.get(ROOT_ID).cloned().unwrap_or_default();
        Ok(top
            .iter()
            .filter_map(|id| state.entries.get(id))
            .filter(|e| e.is_folder() && e.name == name)
            .cloned()
            .collect())
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
        self.record(Call::CreateFolder {
            name: name.to_string(),
            parent_id: parent_id.to_string(),
        })
        .await;
        validate_name(name)?;
        let mut state = self.state.write().await;
        if state.should_fail(Operation::Create, name) {
            return Err(Self::unavailable(Operation::Create, name));
        }
        if !state.is_folder(parent_id) {
            exn::bail!(ErrorKind::NotFound(parent_id.to_string()));
        }
        state.next_id += 1;
        let id = format!("folder-{}", state.next_id);
        state.entries.insert(id.clone(), RawEntry::folder(id.clone(), name));
        state.children.insert(id.clone(), Vec::new());
        state.children.entry(parent_id.to_string()).or_default().push(id.clone());
        Ok(id)
    }

    async fn move_entry(&self, entry_id: &str, from_parent_id: &str, to_parent_id: &str) -> Result<()> {
        self.record(Call::MoveEntry {
            entry_id: entry_id.to_string(),
            from: from_parent_id.to_string(),
            to: to_parent_id.to_string(),
        })
        .await;
        let mut state = self.state.write().await;
        if state.should_fail(Operation::Move, entry_id) {
            return Err(Self::unavailable(Operation::Move, entry_id));
        }
        if !state.is_folder(to_parent_id) {
            exn::bail!(ErrorKind::NotFound(to_parent_id.to_string()));
        }
        let siblings = state.children.get_mut(from_parent_id).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(from_parent_id.to_string())))?;
        let position = siblings
            .iter()
            .position(|id| id == entry_id)
            .ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(entry_id.to_string())))?;
        siblings.remove(position);
        state.children.entry(to_parent_id.to_string()).or_default().push(entry_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn store_with_files(page_size: usize, count: usize) -> MockStore {
        let mut store = MockStore::default().with_page_size(page_size);
        for i in 0..count {
            store.insert(ROOT_ID, RawEntry::file(format!("p{i}"), format!("IMG_{i}.jpg"), "image/jpeg"));
        }
        store
    }

    #[tokio::test]
    async fn test_first_page() {
        let store = store_with_files(2, 5);
        let page = store.list_children(ROOT_ID, None).await.unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.next_page_token.as_deref(), Some("2"));
    }

    #[rstest]
    #[case(1, 5)]
    #[case(2, 5)]
    #[case(5, 5)]
    #[case(7, 5)]
    #[case(3, 0)]
    #[tokio::test]
    async fn test_children_stream_collects_every_page(#[case] page_size: usize, #[case] count: usize) {
        let store = store_with_files(page_size, count);
        let all = store.list_all_children(ROOT_ID).await.unwrap();
        assert_eq!(all.len(), count);
        let lists = store.calls().await.iter().filter(|c| matches!(c, Call::ListChildren { .. })).count();
        assert_eq!(lists, count.div_ceil(page_size).max(1));
    }

    #[tokio::test]
    async fn test_list_unknown_folder() {
        let store = MockStore::default();
        let err = store.list_children("nope", None).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_injected_failures_run_out() {
        let mut store = MockStore::default();
        store.fail_times(Operation::List, ROOT_ID, 2);
        assert!(store.list_children(ROOT_ID, None).await.is_err());
        let err = store.list_children(ROOT_ID, None).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(store.list_children(ROOT_ID, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_find_only_top_level_folders() {
        let mut store = MockStore::default();
        let a = store.insert(ROOT_ID, RawEntry::folder("a", "Archive"));
        store.insert(&a, RawEntry::folder("b", "Archive"));
        store.insert(ROOT_ID, RawEntry::file("c", "Archive", "image/jpeg"));
        let found = store.find_folders_by_name("Archive").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "a");
    }

    #[tokio::test]
    async fn test_create_and_move() {
        let mut store = MockStore::default();
        store.insert(ROOT_ID, RawEntry::file("p1", "IMG_1.jpg", "image/jpeg"));
        let folder = store.create_folder("2022", ROOT_ID).await.unwrap();
        store.move_entry("p1", ROOT_ID, &folder).await.unwrap();
        assert_eq!(store.child_names(&folder).await, vec!["IMG_1.jpg"]);
        assert_eq!(store.resolve("2022/IMG_1.jpg").await.as_deref(), Some("p1"));
        assert_eq!(store.child_names(ROOT_ID).await, vec!["2022"]);
    }

    #[tokio::test]
    async fn test_move_from_wrong_parent() {
        let mut store = MockStore::default();
        store.insert(ROOT_ID, RawEntry::file("p1", "IMG_1.jpg", "image/jpeg"));
        let folder = store.create_folder("2022", ROOT_ID).await.unwrap();
        let err = store.move_entry("p1", &folder, ROOT_ID).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(id) if id == "p1"));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_name() {
        let store = MockStore::default();
        let err = store.create_folder("../escape", ROOT_ID).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidName(_)));
    }

    #[test]
    #[should_panic(expected = "unknown parent folder")]
    fn test_insert_panics_on_missing_parent() {
        MockStore::default().insert("missing", RawEntry::folder("a", "A"));
    }
}
