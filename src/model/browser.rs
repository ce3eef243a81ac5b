//! Library browser
//!
//! [`BrowseTree`] is an arena of nodes mirroring the server's library. Nodes
//! refer to their parent by [`NodeId`]; directories stay unloaded until they
//! are opened. [`Browser`] adds navigation, selection and search on top and
//! is what the UI observes.
//!
//! Loading is two-phase: the listing is fetched first and installed only
//! after the fetch succeeded, so a failed load leaves the tree as it was.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::ServiceResult;

use super::list::{Query, Searchable, clamp_cursor};
use super::pubsub::PubSub;
use super::service::DirectoryLister;
use super::types::{DirEntry, Track};

pub type NodeId = usize;

pub const ROOT: NodeId = 0;

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// `children` is `None` until the directory has been listed
    Directory {
        children: Option<Vec<NodeId>>,
        selected: isize,
    },
    Song(Rc<Track>),
    Playlist,
    Link {
        label: String,
        target: Vec<String>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub path: Vec<String>,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    /// Last path segment; `None` for the root
    pub fn name(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }

    pub fn path_string(&self) -> String {
        self.path.join("/")
    }

    pub fn is_link(&self) -> bool {
        matches!(self.kind, NodeKind::Link { .. })
    }

    pub fn label(&self) -> String {
        match &self.kind {
            NodeKind::Directory { .. } => format!("{}/", self.name().unwrap_or("")),
            NodeKind::Song(track) if track.artist.is_empty() => track.display_title().to_string(),
            NodeKind::Song(track) if track.album.is_empty() => {
                format!("{} - {}", track.artist, track.display_title())
            }
            NodeKind::Song(track) => format!(
                "{} - {} ({})",
                track.artist,
                track.display_title(),
                track.album
            ),
            NodeKind::Playlist => self.name().unwrap_or("").to_string(),
            NodeKind::Link { label, .. } => label.clone(),
        }
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct BrowseTree {
    nodes: Vec<Node>,
}

impl BrowseTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                path: Vec::new(),
                parent: None,
                kind: NodeKind::Directory {
                    children: None,
                    selected: -1,
                },
            }],
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn is_unloaded_directory(&self, id: NodeId) -> bool {
        matches!(
            self.node(id).map(|n| &n.kind),
            Some(NodeKind::Directory { children: None, .. })
        )
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Directory {
                children: Some(children),
                ..
            }) => children,
            _ => &[],
        }
    }

    pub fn path_string(&self, id: NodeId) -> String {
        self.node(id).map(Node::path_string).unwrap_or_default()
    }

    /// Fetch and install one level below `id`
    pub async fn load<L: DirectoryLister>(&mut self, id: NodeId, lister: &mut L) -> ServiceResult<()> {
        let path = self.path_string(id);
        let entries = lister.list_directory(&path).await?;
        tracing::debug!(path = %path, entries = entries.len(), "Loaded directory");
        self.install(id, entries);
        Ok(())
    }

    /// Replace the children of directory `id` with `entries`
    pub fn install(&mut self, id: NodeId, entries: Vec<DirEntry>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if !matches!(node.kind, NodeKind::Directory { .. }) {
            return;
        }

        let mut children = Vec::with_capacity(entries.len() + 2);
        if let Some(parent) = node.parent {
            let up = self.nodes.get(parent).map(|p| p.path.clone()).unwrap_or_default();
            children.push(self.push(id, Vec::new(), NodeKind::Link {
                label: "/".to_string(),
                target: Vec::new(),
            }));
            children.push(self.push(id, up.clone(), NodeKind::Link {
                label: "../".to_string(),
                target: up,
            }));
        }

        for entry in entries {
            let child = match entry {
                DirEntry::Directory(path) => self.push(
                    id,
                    split_path(&path),
                    NodeKind::Directory {
                        children: None,
                        selected: -1,
                    },
                ),
                DirEntry::File(track) => {
                    let path = split_path(&track.file);
                    self.push(id, path, NodeKind::Song(Rc::new(track)))
                }
                DirEntry::Playlist(name) => self.push(id, split_path(&name), NodeKind::Playlist),
            };
            children.push(child);
        }

        let selected = clamp_cursor(0, children.len());
        if let Some(node) = self.nodes.get_mut(id) {
            node.kind = NodeKind::Directory {
                children: Some(children),
                selected,
            };
        }
    }

    fn push(&mut self, parent: NodeId, path: Vec<String>, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            path,
            parent: Some(parent),
            kind,
        });
        self.nodes.len() - 1
    }

    /// Non-link child of `id` named `segment`
    pub fn lookup(&self, id: NodeId, segment: &str) -> Option<NodeId> {
        self.children(id).iter().copied().find(|&child| {
            self.node(child)
                .is_some_and(|n| !n.is_link() && n.name() == Some(segment))
        })
    }

    /// Walk `path` from the root through loaded directories only
    pub fn resolve(&self, path: &[String]) -> Option<NodeId> {
        path.iter()
            .try_fold(ROOT, |id, segment| self.lookup(id, segment))
    }

    /// Walk `path` from the root, loading directories on the way
    pub async fn resolve_with<L: DirectoryLister>(
        &mut self,
        path: &[String],
        lister: &mut L,
    ) -> ServiceResult<Option<NodeId>> {
        let mut id = ROOT;
        for segment in path {
            if self.is_unloaded_directory(id) {
                self.load(id, lister).await?;
            }
            match self.lookup(id, segment) {
                Some(child) => id = child,
                None => return Ok(None),
            }
        }
        Ok(Some(id))
    }

    /// Songs below `id` matching `query`, depth first, in loaded directories only
    pub fn search_subtree(&self, id: NodeId, query: &Query) -> Vec<NodeId> {
        let mut hits = Vec::new();
        self.collect_matches(id, query, &mut hits);
        hits
    }

    fn collect_matches(&self, id: NodeId, query: &Query, hits: &mut Vec<NodeId>) {
        for &child in self.children(id) {
            match self.node(child).map(|n| &n.kind) {
                Some(NodeKind::Directory { .. }) => self.collect_matches(child, query, hits),
                Some(NodeKind::Song(track)) if track.matches(query) => hits.push(child),
                _ => {}
            }
        }
    }

    pub fn selected_index(&self, id: NodeId) -> isize {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Directory { selected, .. }) => *selected,
            _ => -1,
        }
    }

    pub fn select(&mut self, id: NodeId, index: isize, relative: bool) -> isize {
        let len = self.children(id).len();
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Directory { selected, .. }) => {
                let target = if relative {
                    selected.saturating_add(index)
                } else {
                    index
                };
                *selected = clamp_cursor(target, len);
                *selected
            }
            _ => -1,
        }
    }

    pub fn select_child(&mut self, id: NodeId, child: NodeId) {
        if let Some(index) = self.children(id).iter().position(|&c| c == child) {
            self.select(id, index as isize, false);
        }
    }
}

impl Default for BrowseTree {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Navigation
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrowserEvent {
    NodeChanged,
    SelectionChanged,
    SearchStarted,
    SearchStopped,
}

/// What the selected entry stands for, as far as the server is concerned
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    File(String),
    Directory(String),
    Playlist(String),
}

/// Server action requested by entering a node
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrowseAction {
    Play(String),
    LoadPlaylist(String),
}

struct Search {
    query: Query,
    hits: Vec<NodeId>,
    selected: isize,
}

pub struct Browser {
    tree: RefCell<BrowseTree>,
    current: Cell<NodeId>,
    search: RefCell<Option<Search>>,
    pub events: PubSub<BrowserEvent>,
}

impl Browser {
    pub fn new() -> Self {
        Self {
            tree: RefCell::new(BrowseTree::new()),
            current: Cell::new(ROOT),
            search: RefCell::new(None),
            events: PubSub::new(),
        }
    }

    pub fn current(&self) -> NodeId {
        self.current.get()
    }

    pub fn is_searching(&self) -> bool {
        self.search.borrow().is_some()
    }

    /// Location shown in the header
    pub fn title(&self) -> String {
        if let Some(search) = &*self.search.borrow() {
            return format!("search: {}", search.query.text());
        }
        format!("/{}", self.tree.borrow().path_string(self.current()))
    }

    /// Entries currently on display: search hits or the current directory
    pub fn entries(&self) -> Vec<Node> {
        let tree = self.tree.borrow();
        let ids = match &*self.search.borrow() {
            Some(search) => search.hits.clone(),
            None => tree.children(self.current()).to_vec(),
        };
        ids.iter().filter_map(|&id| tree.node(id).cloned()).collect()
    }

    pub fn cursor(&self) -> isize {
        match &*self.search.borrow() {
            Some(search) => search.selected,
            None => self.tree.borrow().selected_index(self.current()),
        }
    }

    pub fn selected(&self) -> Option<NodeId> {
        let index = usize::try_from(self.cursor()).ok()?;
        match &*self.search.borrow() {
            Some(search) => search.hits.get(index).copied(),
            None => self
                .tree
                .borrow()
                .children(self.current())
                .get(index)
                .copied(),
        }
    }

    pub fn selected_node(&self) -> Option<Node> {
        let id = self.selected()?;
        self.tree.borrow().node(id).cloned()
    }

    pub fn selected_target(&self) -> Option<Target> {
        let node = self.selected_node()?;
        match node.kind {
            NodeKind::Song(track) => Some(Target::File(track.file.clone())),
            NodeKind::Directory { .. } => Some(Target::Directory(node.path_string())),
            NodeKind::Playlist => Some(Target::Playlist(node.path_string())),
            NodeKind::Link { .. } => None,
        }
    }

    pub fn select(&self, index: isize, relative: bool) -> isize {
        let cursor = match &mut *self.search.borrow_mut() {
            Some(search) => {
                let target = if relative {
                    search.selected.saturating_add(index)
                } else {
                    index
                };
                search.selected = clamp_cursor(target, search.hits.len());
                search.selected
            }
            None => self
                .tree
                .borrow_mut()
                .select(self.current(), index, relative),
        };
        self.events.notify(&BrowserEvent::SelectionChanged);
        cursor
    }

    fn set_current(&self, id: NodeId) {
        self.current.set(id);
        self.events.notify(&BrowserEvent::NodeChanged);
    }

    /// List directory `id` unless it already is
    pub async fn ensure_loaded<L: DirectoryLister>(&self, id: NodeId, lister: &mut L) -> ServiceResult<()> {
        if !self.tree.borrow().is_unloaded_directory(id) {
            return Ok(());
        }
        let path = self.tree.borrow().path_string(id);
        let entries = lister.list_directory(&path).await?;
        tracing::debug!(path = %path, entries = entries.len(), "Loaded directory");
        self.tree.borrow_mut().install(id, entries);
        Ok(())
    }

    /// Drop everything and list the root again. The old tree stays on failure.
    pub async fn reload<L: DirectoryLister>(&self, lister: &mut L) -> ServiceResult<()> {
        let mut tree = BrowseTree::new();
        tree.load(ROOT, lister).await?;
        *self.tree.borrow_mut() = tree;
        self.end_search();
        self.set_current(ROOT);
        Ok(())
    }

    /// Open the selected entry. Directories and links are navigated here;
    /// songs and playlists come back as actions for the server.
    pub async fn enter<L: DirectoryLister>(&self, lister: &mut L) -> ServiceResult<Option<BrowseAction>> {
        let Some(id) = self.selected() else {
            return Ok(None);
        };
        let Some(node) = self.tree.borrow().node(id).cloned() else {
            return Ok(None);
        };

        match node.kind {
            NodeKind::Song(track) => Ok(Some(BrowseAction::Play(track.file.clone()))),
            NodeKind::Playlist => Ok(Some(BrowseAction::LoadPlaylist(node.path_string()))),
            NodeKind::Directory { .. } => {
                self.ensure_loaded(id, lister).await?;
                self.end_search();
                self.set_current(id);
                Ok(None)
            }
            NodeKind::Link { target, .. } => {
                self.tree.borrow_mut().select(self.current(), 0, false);
                self.go_to(&target, lister).await?;
                Ok(None)
            }
        }
    }

    /// Leave the search, or move to the parent directory
    pub fn go_up(&self) {
        if self.is_searching() {
            self.end_search();
            return;
        }
        let current = self.current();
        let parent = self.tree.borrow().node(current).and_then(|n| n.parent);
        if let Some(parent) = parent {
            self.tree.borrow_mut().select(current, 0, false);
            self.set_current(parent);
        }
    }

    /// Navigate to `path`. A song path opens its directory with the song selected.
    pub async fn go_to<L: DirectoryLister>(&self, path: &[String], lister: &mut L) -> ServiceResult<bool> {
        let loaded = self.tree.borrow().resolve(path);
        let resolved = match loaded {
            Some(id) => Some(id),
            None => {
                // Detached while listing so no borrow is held across an await
                let mut tree = self.tree.take();
                let resolved = tree.resolve_with(path, lister).await;
                *self.tree.borrow_mut() = tree;
                resolved?
            }
        };
        let Some(id) = resolved else {
            return Ok(false);
        };

        let node = self.tree.borrow().node(id).cloned();
        match node.map(|n| (n.kind, n.parent)) {
            Some((NodeKind::Song(_), Some(parent))) => {
                self.tree.borrow_mut().select_child(parent, id);
                self.end_search();
                self.set_current(parent);
            }
            Some((NodeKind::Directory { .. }, _)) => {
                self.ensure_loaded(id, lister).await?;
                self.end_search();
                self.set_current(id);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Show songs anywhere in the loaded tree matching `text`. Blank text ends the search.
    pub fn begin_search(&self, text: &str) {
        let Some(query) = Query::parse(text) else {
            self.end_search();
            return;
        };

        let hits = self.tree.borrow().search_subtree(ROOT, &query);
        let started = {
            let mut search = self.search.borrow_mut();
            let started = search.is_none();
            *search = Some(Search {
                query,
                selected: clamp_cursor(0, hits.len()),
                hits,
            });
            started
        };
        if started {
            self.events.notify(&BrowserEvent::SearchStarted);
        }
        self.events.notify(&BrowserEvent::NodeChanged);
    }

    pub fn end_search(&self) {
        if self.search.borrow_mut().take().is_some() {
            self.events.notify(&BrowserEvent::SearchStopped);
            self.events.notify(&BrowserEvent::NodeChanged);
        }
    }

    pub fn search_text(&self) -> Option<String> {
        self.search
            .borrow()
            .as_ref()
            .map(|s| s.query.text().to_string())
    }

    pub fn search_hits(&self) -> usize {
        self.search.borrow().as_ref().map_or(0, |s| s.hits.len())
    }
}

impl Default for Browser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeLibrary, Recorder, library_file};

    fn library() -> FakeLibrary {
        FakeLibrary::with(&[
            (
                "",
                vec![
                    DirEntry::Directory("Rock".into()),
                    DirEntry::Directory("Jazz".into()),
                    DirEntry::Playlist("Radio Mix".into()),
                    library_file("intro.mp3", "Intro"),
                ],
            ),
            (
                "Rock",
                vec![
                    DirEntry::Directory("Rock/Live".into()),
                    DirEntry::File(Track {
                        file: "Rock/android.flac".into(),
                        title: "Paranoid Android".into(),
                        artist: "Radiohead".into(),
                        album: "OK Computer".into(),
                        ..Track::default()
                    }),
                    DirEntry::File(Track {
                        file: "Rock/money.flac".into(),
                        title: "Money".into(),
                        artist: "Pink Floyd".into(),
                        ..Track::default()
                    }),
                ],
            ),
            (
                "Rock/Live",
                vec![DirEntry::File(Track {
                    file: "Rock/Live/creep.flac".into(),
                    title: "Creep".into(),
                    artist: "Radiohead".into(),
                    ..Track::default()
                })],
            ),
            ("Jazz", vec![library_file("Jazz/so_what.flac", "So What")]),
        ])
    }

    fn path(p: &str) -> Vec<String> {
        split_path(p)
    }

    #[tokio::test]
    async fn load_classifies_entries_and_adds_links_below_root() {
        let mut lib = library();
        let mut tree = BrowseTree::new();
        tree.load(ROOT, &mut lib).await.unwrap();

        let root: Vec<_> = tree.children(ROOT).iter().map(|&c| tree.node(c).unwrap().clone()).collect();
        assert_eq!(root.len(), 4);
        assert!(matches!(root[0].kind, NodeKind::Directory { children: None, .. }));
        assert!(matches!(root[2].kind, NodeKind::Playlist));
        assert!(matches!(root[3].kind, NodeKind::Song(_)));

        let rock = tree.lookup(ROOT, "Rock").unwrap();
        tree.load(rock, &mut lib).await.unwrap();
        let labels: Vec<_> = tree.children(rock).iter().map(|&c| tree.node(c).unwrap().label()).collect();
        assert_eq!(
            labels,
            vec!["/", "../", "Live/", "Radiohead - Paranoid Android (OK Computer)", "Pink Floyd - Money"]
        );
        assert_eq!(tree.selected_index(rock), 0);
    }

    #[tokio::test]
    async fn lookup_ignores_links() {
        let mut lib = library();
        let mut tree = BrowseTree::new();
        tree.load(ROOT, &mut lib).await.unwrap();
        let rock = tree.lookup(ROOT, "Rock").unwrap();
        tree.load(rock, &mut lib).await.unwrap();

        assert_eq!(tree.lookup(rock, "../"), None);
        assert!(tree.lookup(rock, "money.flac").is_some());
        assert_eq!(tree.lookup(rock, "missing"), None);
    }

    #[tokio::test]
    async fn resolve_needs_loaded_nodes_and_resolve_with_loads_them() {
        let mut lib = library();
        let mut tree = BrowseTree::new();
        tree.load(ROOT, &mut lib).await.unwrap();

        assert_eq!(tree.resolve(&path("Rock/Live")), None);

        let live = tree.resolve_with(&path("Rock/Live"), &mut lib).await.unwrap();
        assert!(live.is_some());
        assert_eq!(tree.resolve(&path("Rock/Live")), live);
        assert_eq!(lib.requests, vec!["", "Rock"]);
        assert_eq!(tree.resolve(&[]), Some(ROOT));
        assert_eq!(tree.resolve_with(&path("Rock/Nope"), &mut lib).await.unwrap(), None);
    }

    #[tokio::test]
    async fn search_covers_loaded_songs_only() {
        let mut lib = library();
        let mut tree = BrowseTree::new();
        tree.load(ROOT, &mut lib).await.unwrap();
        let rock = tree.lookup(ROOT, "Rock").unwrap();
        tree.load(rock, &mut lib).await.unwrap();

        let query = Query::parse("radiohead").unwrap();
        let hits = tree.search_subtree(ROOT, &query);
        assert_eq!(hits.len(), 1);

        let live = tree.lookup(rock, "Live").unwrap();
        tree.load(live, &mut lib).await.unwrap();
        assert_eq!(tree.search_subtree(ROOT, &query).len(), 2);

        let both = Query::parse("radiohead creep").unwrap();
        assert_eq!(tree.search_subtree(ROOT, &both).len(), 1);
        assert!(tree.search_subtree(ROOT, &Query::parse("mix").unwrap()).is_empty());
    }

    #[tokio::test]
    async fn failed_load_leaves_tree_untouched() {
        let mut lib = library();
        let mut tree = BrowseTree::new();
        tree.load(ROOT, &mut lib).await.unwrap();
        let jazz = tree.lookup(ROOT, "Jazz").unwrap();
        lib.entries.remove("Jazz");

        assert!(tree.load(jazz, &mut lib).await.is_err());
        assert!(tree.is_unloaded_directory(jazz));
        assert_eq!(tree.children(ROOT).len(), 4);
    }

    async fn browser() -> (Browser, FakeLibrary) {
        let mut lib = library();
        let browser = Browser::new();
        browser.reload(&mut lib).await.unwrap();
        (browser, lib)
    }

    #[tokio::test]
    async fn enter_and_go_up() {
        let (browser, mut lib) = browser().await;
        assert_eq!(browser.enter(&mut lib).await.unwrap(), None);
        assert_eq!(browser.title(), "/Rock");
        assert_eq!(browser.entries().len(), 5);

        browser.select(3, false);
        assert_eq!(
            browser.enter(&mut lib).await.unwrap(),
            Some(BrowseAction::Play("Rock/android.flac".into()))
        );

        browser.go_up();
        assert_eq!(browser.current(), ROOT);
        browser.select(2, false);
        assert_eq!(
            browser.enter(&mut lib).await.unwrap(),
            Some(BrowseAction::LoadPlaylist("Radio Mix".into()))
        );
    }

    #[tokio::test]
    async fn links_navigate_to_root_and_parent() {
        let (browser, mut lib) = browser().await;
        browser.enter(&mut lib).await.unwrap();
        browser.select(2, false);
        browser.enter(&mut lib).await.unwrap();
        assert_eq!(browser.title(), "/Rock/Live");

        browser.select(1, false);
        browser.enter(&mut lib).await.unwrap();
        assert_eq!(browser.title(), "/Rock");

        browser.select(0, false);
        browser.enter(&mut lib).await.unwrap();
        assert_eq!(browser.current(), ROOT);
    }

    #[tokio::test]
    async fn go_to_song_selects_it_in_its_directory() {
        let (browser, mut lib) = browser().await;
        assert!(browser.go_to(&path("Rock/money.flac"), &mut lib).await.unwrap());
        assert_eq!(browser.title(), "/Rock");
        assert_eq!(browser.cursor(), 4);
        assert_eq!(
            browser.selected_target(),
            Some(Target::File("Rock/money.flac".into()))
        );
        assert!(!browser.go_to(&path("Blues"), &mut lib).await.unwrap());
    }

    #[tokio::test]
    async fn go_to_lists_only_what_is_missing() {
        let (browser, mut lib) = browser().await;

        assert!(browser.go_to(&path("Rock/Live/creep.flac"), &mut lib).await.unwrap());
        assert_eq!(browser.title(), "/Rock/Live");
        assert_eq!(lib.requests, vec!["", "Rock", "Rock/Live"]);

        // Already loaded: no further listings, the tree survives the walk
        assert!(browser.go_to(&path("Rock/money.flac"), &mut lib).await.unwrap());
        assert!(browser.go_to(&path("Rock/Live"), &mut lib).await.unwrap());
        assert_eq!(lib.requests.len(), 3);
        assert_eq!(browser.entries().len(), 3);
    }

    #[tokio::test]
    async fn failed_go_to_keeps_the_loaded_tree() {
        let (browser, mut lib) = browser().await;
        lib.entries.remove("Jazz");

        assert!(browser.go_to(&path("Jazz/so_what.flac"), &mut lib).await.is_err());
        assert_eq!(browser.current(), ROOT);
        assert_eq!(browser.entries().len(), 4);
    }

    #[tokio::test]
    async fn search_is_an_overlay_on_the_current_directory() {
        let (browser, mut lib) = browser().await;
        browser.enter(&mut lib).await.unwrap();
        let events = Recorder::new();
        browser.events.subscribe(&events);

        browser.begin_search("PINK money");
        assert_eq!(browser.search_hits(), 1);
        assert_eq!(browser.cursor(), 0);
        assert_eq!(browser.title(), "search: PINK money");
        browser.go_up();

        assert!(!browser.is_searching());
        assert_eq!(browser.title(), "/Rock");
        assert_eq!(
            events.take(),
            vec![
                BrowserEvent::SearchStarted,
                BrowserEvent::NodeChanged,
                BrowserEvent::SearchStopped,
                BrowserEvent::NodeChanged,
            ]
        );
    }

    #[tokio::test]
    async fn reload_failure_keeps_the_old_tree() {
        let (browser, mut lib) = browser().await;
        browser.enter(&mut lib).await.unwrap();
        lib.entries.clear();

        assert!(browser.reload(&mut lib).await.is_err());
        assert_eq!(browser.title(), "/Rock");
    }
}
