//! Point-in-time snapshot of a remote folder hierarchy.
//!
//! A [`Tree`] is built once per run by the [`TreeBuilder`] and never
//! re-fetched: it is not a live view. Folders are stored in an arena and
//! addressed by [`NodeId`], which lets the materializer and cataloguer add
//! folders and move files around without fighting the borrow checker over
//! parent/child references.
//!
//! Folder ids are unique within one tree; the tree refuses a second folder
//! with an id it already holds, which is also what stops traversal of
//! malformed (cyclic) store hierarchies.

mod builder;
pub mod error;

pub use self::builder::TreeBuilder;
use crate::CaptureDate;
use pcat_store::ROOT_ID;
use std::collections::HashMap;
use std::fmt;

/// Index of a [`DirectoryNode`] within its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A media file listed in a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub file_id: String,
    pub name: String,
    pub mime_type: String,
    /// `None` when the file can't be catalogued.
    pub capture: Option<CaptureDate>,
}

/// A folder and its direct contents.
#[derive(Debug, Clone)]
pub struct DirectoryNode {
    pub folder_id: String,
    pub name: String,
    parent: Option<NodeId>,
    files: Vec<FileEntry>,
    folders: Vec<NodeId>,
    complete: bool,
}
impl DirectoryNode {
    fn new(folder_id: String, name: String, parent: Option<NodeId>) -> Self {
        Self {
            folder_id,
            name,
            parent,
            files: Vec::new(),
            folders: Vec::new(),
            complete: true,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn folders(&self) -> &[NodeId] {
        &self.folders
    }

    /// `false` when listing this folder failed part-way.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Whether a file with exactly this name (case-sensitive) is directly in this folder.
    pub fn has_file_named(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.name == name)
    }
}

/// How a tree's root folder is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootRef {
    /// The store's top-level container.
    Sentinel,
    /// A folder id.
    Id(String),
    /// A human-readable name, looked up among top-level folders only.
    Name(String),
}
impl RootRef {
    /// Parse user input: `root` is the sentinel, `id:<id>` an id, anything
    /// else a folder name.
    pub fn parse(input: &str) -> Self {
        match input {
            ROOT_ID => Self::Sentinel,
            other => match other.strip_prefix("id:") {
                Some(id) => Self::Id(id.to_string()),
                None => Self::Name(other.to_string()),
            },
        }
    }
}
impl fmt::Display for RootRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sentinel => f.write_str(ROOT_ID),
            Self::Id(id) => write!(f, "id:{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Arena-backed folder hierarchy.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<DirectoryNode>,
    index: HashMap<String, NodeId>,
    resolved: bool,
}
impl Tree {
    /// A tree containing only its root folder.
    pub fn new(folder_id: impl Into<String>, name: impl Into<String>) -> Self {
        let root = DirectoryNode::new(folder_id.into(), name.into(), None);
        let index = HashMap::from([(root.folder_id.clone(), NodeId(0))]);
        Self {
            nodes: vec![root],
            index,
            resolved: true,
        }
    }

    /// An empty tree for a root that couldn't be found in the store.
    ///
    /// Its root has no remote counterpart, so nothing may be created in it.
    pub fn unresolved(name: impl Into<String>) -> Self {
        let mut tree = Self::new(String::new(), name);
        tree.index.clear();
        tree.resolved = false;
        tree
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// `false` when the root couldn't be located in the store.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// `true` when every folder in the tree was listed in full.
    pub fn is_complete(&self) -> bool {
        self.nodes.iter().all(|n| n.complete)
    }

    pub fn node(&self, id: NodeId) -> &DirectoryNode {
        &self.nodes[id.0]
    }

    pub fn find_by_folder_id(&self, folder_id: &str) -> Option<NodeId> {
        self.index.get(folder_id).copied()
    }

    pub fn folder_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn file_count(&self) -> usize {
        self.nodes.iter().map(|n| n.files.len()).sum()
    }

    /// Add a child folder, returning `None` if a folder with that id is
    /// already part of the tree.
    pub fn add_folder(&mut self, parent: NodeId, folder_id: impl Into<String>, name: impl Into<String>) -> Option<NodeId> {
        let folder_id = folder_id.into();
        if self.index.contains_key(&folder_id) {
            return None;
        }
        let id = NodeId(self.nodes.len());
        self.index.insert(folder_id.clone(), id);
        self.nodes.push(DirectoryNode::new(folder_id, name.into(), Some(parent)));
        self.nodes[parent.0].folders.push(id);
        Some(id)
    }

    pub fn add_file(&mut self, parent: NodeId, file: FileEntry) {
        self.nodes[parent.0].files.push(file);
    }

    /// Remove a file from a folder, returning it.
    pub fn take_file(&mut self, parent: NodeId, file_id: &str) -> Option<FileEntry> {
        let files = &mut self.nodes[parent.0].files;
        let position = files.iter().position(|f| f.file_id == file_id)?;
        Some(files.remove(position))
    }

    pub fn mark_incomplete(&mut self, node: NodeId) {
        self.nodes[node.0].complete = false;
    }

    /// The first direct child folder of `parent` named exactly `name`.
    pub fn find_folder(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node(parent).folders.iter().copied().find(|child| self.node(*child).name == name)
    }

    /// Folder names from the root (exclusive) down to `node`, `/`-separated.
    pub fn path_of(&self, node: NodeId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current
            && id != self.root()
        {
            segments.push(self.node(id).name.as_str());
            current = self.node(id).parent;
        }
        segments.reverse();
        segments.join("/")
    }

    /// Every file in the tree with the folder that holds it, folders visited
    /// in pre-order.
    pub fn files(&self) -> impl Iterator<Item = (NodeId, &FileEntry)> + '_ {
        self.preorder().flat_map(move |id| self.node(id).files.iter().map(move |f| (id, f)))
    }

    /// Folder ids in pre-order (a folder before its children).
    pub fn preorder(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = vec![self.root()];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.node(id).folders.iter().rev().copied());
            Some(id)
        })
    }
}
