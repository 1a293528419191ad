//! Comment forest with deferred-placeholder resolution.
//!
//! The forest is an arena: comments are nodes, and every child list holds
//! either a node or a pending `more` stub. Stubs are queued in discovery
//! order and resolved one by one; whatever a fetch returns is grafted in
//! place of the stub, and any stubs inside the new subtree join the back of
//! the queue. Flattening walks the finished forest breadth-first and drops
//! stubs that were left unresolved.
use crate::reddit::extract::comment_from_wire;
use crate::reddit::types::{CommentThing, MoreData};
use async_trait::async_trait;
use harvest_common::{Comment, Result};
use std::collections::{HashMap, VecDeque};

/// Upper bound on ids per `/api/morechildren` call.
pub const MORE_CHILDREN_CHUNK: usize = 100;

/// Fetches the comments hidden behind placeholders.
#[async_trait]
pub trait MoreFetcher: Send + Sync {
    /// The comments named by `ids`, flat, each carrying its `parent_id`.
    async fn more_children(&self, post_id: &str, ids: &[String]) -> Result<Vec<CommentThing>>;

    /// The replies below `comment_id`, nested.
    async fn continue_thread(&self, post_id: &str, comment_id: &str)
    -> Result<Vec<CommentThing>>;
}

/// Caps on placeholder resolution. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoreLimits {
    /// Placeholders fetched per post.
    pub max_requests: Option<usize>,
    /// Placeholders whose comments would sit deeper than this stay unresolved.
    /// Top-level comments have depth 0.
    pub max_depth: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub fetched: usize,
    pub unresolved: usize,
}

type NodeId = usize;
type StubId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Node(NodeId),
    Stub(StubId),
}

#[derive(Debug)]
struct Node {
    comment: Comment,
    depth: u32,
    children: Vec<Entry>,
}

#[derive(Debug)]
struct Stub {
    more: MoreData,
    parent: Option<NodeId>,
    depth: u32,
}

#[derive(Debug)]
pub struct CommentForest {
    post_id: String,
    nodes: Vec<Node>,
    stubs: Vec<Option<Stub>>,
    roots: Vec<Entry>,
    by_id: HashMap<String, NodeId>,
    queue: VecDeque<StubId>,
}

impl CommentForest {
    /// Build from the top-level comment listing of `post_id`.
    pub fn from_listing(post_id: &str, things: Vec<CommentThing>) -> Self {
        let mut forest = Self {
            post_id: post_id.to_string(),
            nodes: Vec::new(),
            stubs: Vec::new(),
            roots: Vec::new(),
            by_id: HashMap::new(),
            queue: VecDeque::new(),
        };
        forest.roots = forest.graft(None, things);
        forest
    }

    /// Concrete comments currently in the forest.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Stubs still waiting in the worklist.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drain the worklist, replacing stubs with fetched comments.
    ///
    /// Any fetch error aborts resolution for the whole post.
    pub async fn resolve<F>(&mut self, fetcher: &F, limits: MoreLimits) -> Result<ResolveStats>
    where
        F: MoreFetcher + ?Sized,
    {
        let mut stats = ResolveStats::default();
        while let Some(stub_id) = self.queue.pop_front() {
            let Some(stub) = self.stubs[stub_id].take() else {
                continue;
            };
            if limits.max_requests.is_some_and(|cap| stats.fetched >= cap)
                || limits.max_depth.is_some_and(|max| stub.depth > max)
            {
                tracing::debug!(
                    post_id = %self.post_id,
                    stub = %stub.more.id,
                    depth = stub.depth,
                    hidden = stub.more.count,
                    "reddit.more.unresolved"
                );
                stats.unresolved += 1;
                continue;
            }

            let entries = if stub.more.is_continue_thread() {
                let Some(parent) = stub.parent else {
                    self.splice(None, stub_id, Vec::new());
                    continue;
                };
                let comment_id = self.nodes[parent].comment.id.clone();
                stats.fetched += 1;
                let things = fetcher.continue_thread(&self.post_id, &comment_id).await?;
                self.graft(Some(parent), things)
            } else {
                stats.fetched += 1;
                let mut entries = Vec::new();
                for chunk in stub.more.children.chunks(MORE_CHILDREN_CHUNK) {
                    let things = fetcher.more_children(&self.post_id, chunk).await?;
                    entries.extend(self.graft_flat(stub.parent, things));
                }
                entries
            };
            self.splice(stub.parent, stub_id, entries);
        }
        Ok(stats)
    }

    /// Breadth-first: all top-level comments, then their replies, and so on.
    pub fn into_comments(self) -> Vec<Comment> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue: VecDeque<Entry> = self.roots.iter().copied().collect();
        while let Some(entry) = queue.pop_front() {
            if let Entry::Node(id) = entry {
                order.push(id);
                queue.extend(self.nodes[id].children.iter().copied());
            }
        }

        let mut slots: Vec<Option<Comment>> =
            self.nodes.into_iter().map(|n| Some(n.comment)).collect();
        order
            .into_iter()
            .filter_map(|id| slots[id].take())
            .collect()
    }

    fn depth_below(&self, parent: Option<NodeId>) -> u32 {
        parent.map_or(0, |p| self.nodes[p].depth + 1)
    }

    /// Insert a nested listing under `parent` and return its entries.
    fn graft(&mut self, parent: Option<NodeId>, things: Vec<CommentThing>) -> Vec<Entry> {
        things
            .into_iter()
            .filter_map(|thing| self.insert(parent, thing))
            .collect()
    }

    /// Insert a flat `morechildren` answer.
    ///
    /// Things that reply to a comment already in the forest are attached to
    /// it directly; the rest take the stub's place under `stub_parent`.
    fn graft_flat(&mut self, stub_parent: Option<NodeId>, things: Vec<CommentThing>) -> Vec<Entry> {
        let mut in_place = Vec::new();
        for thing in things {
            let target = parent_fullname(&thing)
                .and_then(|name| name.strip_prefix("t1_"))
                .and_then(|id| self.by_id.get(id).copied());
            match target {
                Some(node) if Some(node) != stub_parent => {
                    if let Some(entry) = self.insert(Some(node), thing) {
                        self.nodes[node].children.push(entry);
                    }
                }
                _ => in_place.extend(self.insert(stub_parent, thing)),
            }
        }
        in_place
    }

    fn insert(&mut self, parent: Option<NodeId>, thing: CommentThing) -> Option<Entry> {
        let depth = self.depth_below(parent);
        match thing {
            CommentThing::Comment(mut data) => {
                if self.by_id.contains_key(&data.id) {
                    return None;
                }
                let replies = std::mem::take(&mut data.replies).into_children();
                let id = self.nodes.len();
                self.by_id.insert(data.id.clone(), id);
                self.nodes.push(Node {
                    comment: comment_from_wire(&self.post_id, data),
                    depth,
                    children: Vec::new(),
                });
                let children = self.graft(Some(id), replies);
                self.nodes[id].children = children;
                Some(Entry::Node(id))
            }
            CommentThing::More(more) => {
                let id = self.stubs.len();
                self.stubs.push(Some(Stub {
                    more,
                    parent,
                    depth,
                }));
                self.queue.push_back(id);
                Some(Entry::Stub(id))
            }
        }
    }

    fn splice(&mut self, parent: Option<NodeId>, stub: StubId, entries: Vec<Entry>) {
        let list = match parent {
            Some(p) => &mut self.nodes[p].children,
            None => &mut self.roots,
        };
        match list.iter().position(|e| *e == Entry::Stub(stub)) {
            Some(pos) => {
                list.splice(pos..=pos, entries);
            }
            None => list.extend(entries),
        }
    }
}

fn parent_fullname(thing: &CommentThing) -> Option<&str> {
    match thing {
        CommentThing::Comment(c) => c.parent_id.as_deref(),
        CommentThing::More(m) => m.parent_id.as_deref(),
    }
}
