//! The content-node graph: an explicit registry of source-file, content, and
//! derived tag nodes, shared between the loader threads and the tag deriver.
//! Node identifiers and content digests are content-addressed (sha256), so
//! identical semantic keys always map to the same node and re-registration
//! is a no-op.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::derive::ContentNode;

/// A content-addressed node identifier: the hex sha256 digest of the node's
/// semantic key. Identical keys yield identical ids; distinct keys yield
/// distinct ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A source file observed by the content loader. Carries the logical source
/// name of the root it was loaded from (e.g. `posts` vs. `pages`), which the
/// deriver uses to decide whether the file's content should be tag-indexed.
#[derive(Clone, Debug)]
pub struct FileNode {
    pub id: NodeId,
    /// The logical name of the content root this file belongs to.
    pub source_name: String,
    /// The file's path relative to its content root.
    pub relative_path: String,
}

/// A derived node representing one distinct tag value observed among
/// article-bearing content. At most one exists per tag value; see
/// [`crate::derive::derive_article_tags`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArticleTagNode {
    pub id: NodeId,
    /// The raw tag string, exactly as authored.
    pub name: String,
    /// Back-reference to the content node that first carried the tag. A
    /// lookup aid only; post↔tag associations come from the tag index, not
    /// from this link.
    pub parent: NodeId,
    /// Digest over the node's own serialized fields, for downstream change
    /// detection.
    pub content_digest: String,
}

/// One entry in the node graph.
#[derive(Clone, Debug)]
pub enum Node {
    File(FileNode),
    Content(ContentNode),
    ArticleTag(ArticleTagNode),
}

impl Node {
    pub fn id(&self) -> &NodeId {
        match self {
            Node::File(file) => &file.id,
            Node::Content(content) => &content.id,
            Node::ArticleTag(tag) => &tag.id,
        }
    }

    /// The logical source name, for file nodes.
    pub fn source_name(&self) -> Option<&str> {
        match self {
            Node::File(file) => Some(&file.source_name),
            _ => None,
        }
    }
}

/// The node registry. Cheap to share by reference across loader threads; the
/// only synchronization is the per-id check-and-insert in
/// [`NodeGraph::create_if_absent`].
pub struct NodeGraph {
    nodes: DashMap<NodeId, Node>,
}

impl NodeGraph {
    pub fn new() -> NodeGraph {
        NodeGraph {
            nodes: DashMap::new(),
        }
    }

    /// Constructs a [`NodeId`] from a semantic key.
    pub fn node_id(key: &str) -> NodeId {
        NodeId(hex_digest(&[key]))
    }

    /// Computes a content digest over an ordered set of serialized fields.
    pub fn content_digest(fields: &[&str]) -> String {
        hex_digest(fields)
    }

    /// Looks up a node by id, returning an owned copy.
    pub fn get(&self, id: &NodeId) -> Option<Node> {
        self.nodes.get(id).map(|entry| entry.value().clone())
    }

    /// Registers a node under its own id, replacing any previous entry. Used
    /// by the content loader, whose ids are unique per source entry.
    pub fn insert(&self, node: Node) {
        self.nodes.insert(node.id().clone(), node);
    }

    /// Atomically registers the node produced by `make` unless a node with
    /// the given id already exists. Returns whether a node was created. The
    /// existence check and the insertion hold the id's shard lock together,
    /// so concurrent observers of one id race to a single winner and `make`
    /// runs at most once per id.
    pub fn create_if_absent<F>(&self, id: &NodeId, make: F) -> bool
    where
        F: FnOnce() -> ArticleTagNode,
    {
        match self.nodes.entry(id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Node::ArticleTag(make()));
                true
            }
        }
    }

    /// Returns all derived tag nodes, ordered by tag name for deterministic
    /// iteration.
    pub fn article_tags(&self) -> Vec<ArticleTagNode> {
        let mut tags: Vec<ArticleTagNode> = self
            .nodes
            .iter()
            .filter_map(|entry| match entry.value() {
                Node::ArticleTag(tag) => Some(tag.clone()),
                _ => None,
            })
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for NodeGraph {
    fn default() -> NodeGraph {
        NodeGraph::new()
    }
}

fn hex_digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod test {
    use super::*;

    fn tag_node(id: &NodeId, name: &str, parent: &str) -> ArticleTagNode {
        let parent = NodeGraph::node_id(parent);
        ArticleTagNode {
            id: id.clone(),
            name: name.to_owned(),
            parent: parent.clone(),
            content_digest: NodeGraph::content_digest(&[id.as_str(), name, parent.as_str()]),
        }
    }

    #[test]
    fn test_node_id_deterministic_and_distinct() {
        assert_eq!(NodeGraph::node_id("azure"), NodeGraph::node_id("azure"));
        assert_ne!(NodeGraph::node_id("azure"), NodeGraph::node_id("m365"));
        assert_ne!(NodeGraph::node_id("azure"), NodeGraph::node_id("Azure"));
    }

    #[test]
    fn test_content_digest_covers_all_fields() {
        assert_eq!(
            NodeGraph::content_digest(&["a", "b"]),
            NodeGraph::content_digest(&["a", "b"])
        );
        assert_ne!(
            NodeGraph::content_digest(&["a", "b"]),
            NodeGraph::content_digest(&["a", "c"])
        );
    }

    #[test]
    fn test_create_if_absent_keeps_first_node() {
        let graph = NodeGraph::new();
        let id = NodeGraph::node_id("azure >>> ArticleTag");
        assert!(graph.create_if_absent(&id, || tag_node(&id, "azure", "first")));
        assert!(!graph.create_if_absent(&id, || tag_node(&id, "azure", "second")));

        let tags = graph.article_tags();
        assert_eq!(1, tags.len());
        assert_eq!(NodeGraph::node_id("first"), tags[0].parent);
    }

    #[test]
    fn test_create_if_absent_atomic_across_threads() {
        let graph = NodeGraph::new();
        let id = NodeGraph::node_id("Power Platform >>> ArticleTag");
        let created = std::sync::atomic::AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for i in 0..8 {
                let graph = &graph;
                let id = &id;
                let created = &created;
                scope.spawn(move || {
                    let parent = format!("post-{}", i);
                    if graph.create_if_absent(id, || tag_node(id, "Power Platform", &parent)) {
                        created.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(1, created.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(1, graph.article_tags().len());
    }
}
