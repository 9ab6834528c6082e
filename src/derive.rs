//! Derives one [`ArticleTagNode`] per distinct tag value observed among
//! article-bearing content nodes. The deriver is invoked once per node as the
//! content loader registers it, may run concurrently across loader threads,
//! and never fails: nodes of other kinds, nodes from non-indexed sources, and
//! malformed tag fields are all silent no-ops.

use crate::graph::{ArticleTagNode, NodeGraph, NodeId};
use crate::tag::tag_names;

/// The type discriminator carried by every derived tag node, and the
/// namespace of its content-addressed id.
pub const ARTICLE_TAG_TYPE: &str = "ArticleTag";

/// The closed set of content-node kinds the loader can register. The first
/// four bear articles and are eligible for tag derivation; the rest are
/// ignored by the deriver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A Markdown entry parsed from a local content root. The only kind
    /// whose originating source root is also checked (see
    /// [`DeriveConfig::sources`]).
    Markdown,
    /// An article entry from a Contentful space.
    ContentfulArticle,
    /// An article entry from a Sanity dataset.
    SanityArticle,
    /// An article entry from a Strapi collection.
    StrapiArticle,
    /// A standalone site page (about, contact, ...).
    SitePage,
    /// A binary asset referenced by content.
    Asset,
}

/// An observed content entry, registered in the node graph by the loader.
#[derive(Clone, Debug)]
pub struct ContentNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// The file node this entry was parsed from, when it has one. CMS-backed
    /// kinds have no file parent.
    pub parent: Option<NodeId>,
    /// The raw frontmatter bag, for kinds that carry frontmatter.
    pub frontmatter: Option<serde_yaml::Value>,
    /// The top-level field bag, consulted for tags only when `frontmatter`
    /// is absent.
    pub fields: serde_yaml::Value,
}

impl ContentNode {
    /// The node's declared tags: read from the frontmatter when present,
    /// else from the top-level fields. Missing or malformed shapes yield an
    /// empty list; duplicates collapse to the first occurrence.
    pub fn tags(&self) -> Vec<String> {
        match &self.frontmatter {
            Some(frontmatter) => tag_names(frontmatter),
            None => tag_names(&self.fields),
        }
    }
}

/// Caller-supplied derivation settings.
#[derive(Clone, Debug)]
pub struct DeriveConfig {
    /// Logical source names whose Markdown entries are tag-indexed. Entries
    /// from any other root (e.g. `pages`) are skipped.
    pub sources: Vec<String>,
}

impl Default for DeriveConfig {
    fn default() -> DeriveConfig {
        DeriveConfig {
            sources: vec!["posts".to_owned()],
        }
    }
}

/// Observes one content node and registers an [`ArticleTagNode`] for each of
/// its distinct tag values that has not been derived yet. Re-deriving from
/// the same inputs is idempotent: ids are content-addressed by
/// `(tag, "ArticleTag")`, and an existing id is left untouched, so the
/// `parent` back-reference always points at the first observer.
pub fn derive_article_tags(graph: &NodeGraph, node: &ContentNode, config: &DeriveConfig) {
    match node.kind {
        NodeKind::Markdown => {
            // Markdown comes from several local roots; only allow-listed
            // roots feed the tag index.
            let source = node
                .parent
                .as_ref()
                .and_then(|parent| graph.get(parent))
                .and_then(|parent| parent.source_name().map(str::to_owned));
            match source {
                Some(name) if config.sources.iter().any(|allowed| *allowed == name) => {}
                _ => {
                    log::debug!("skipping node {}: source not tag-indexed", node.id);
                    return;
                }
            }
        }
        NodeKind::ContentfulArticle | NodeKind::SanityArticle | NodeKind::StrapiArticle => {}
        NodeKind::SitePage | NodeKind::Asset => return,
    }

    for tag in node.tags() {
        let id = tag_node_id(&tag);
        let created = graph.create_if_absent(&id, || {
            let digest =
                NodeGraph::content_digest(&[id.as_str(), &tag, node.id.as_str(), ARTICLE_TAG_TYPE]);
            ArticleTagNode {
                id: id.clone(),
                name: tag.clone(),
                parent: node.id.clone(),
                content_digest: digest,
            }
        });
        if created {
            log::debug!("derived tag node `{}`", tag);
        }
    }
}

/// The content-addressed id shared by every observation of one tag value.
pub fn tag_node_id(tag: &str) -> NodeId {
    NodeGraph::node_id(&format!("{} >>> {}", tag, ARTICLE_TAG_TYPE))
}
