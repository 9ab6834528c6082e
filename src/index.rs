//! Groups a realized set of [`Post`]s by tag. Runs once per build over the
//! full snapshot and is a pure function of it: no caching, no incremental
//! updates, no failure modes. Posts without tags simply contribute to no
//! group.
//!
//! Two orderings are exposed. [`group_by_tag`] returns groups in
//! first-appearance order of each tag across the input sequence, which the
//! tag catalog page preserves. [`ranked`] reorders by descending post count
//! for the places that want a "top tags" view, breaking ties by tag name so
//! the result is stable across builds.

use std::collections::HashMap;

use crate::post::Post;
use crate::tag::Tag;

/// One tag value plus the posts carrying it, in input order.
pub struct TagGroup<'a> {
    pub tag: Tag,
    pub posts: Vec<&'a Post>,
}

impl<'a> TagGroup<'a> {
    /// The number of posts carrying the tag.
    pub fn count(&self) -> usize {
        self.posts.len()
    }

    /// A bounded view of the group: at most `n` posts, alongside the
    /// original total so callers can render "showing n of total".
    pub fn take(&self, n: usize) -> TagSample<'a, '_> {
        TagSample {
            tag: &self.tag,
            posts: &self.posts[..n.min(self.posts.len())],
            total: self.posts.len(),
        }
    }
}

/// A truncated view of a [`TagGroup`], produced by [`TagGroup::take`].
pub struct TagSample<'a, 'g> {
    pub tag: &'g Tag,
    pub posts: &'g [&'a Post],
    pub total: usize,
}

impl TagSample<'_, '_> {
    /// Whether the sample shows fewer posts than the group holds.
    pub fn truncated(&self) -> bool {
        self.posts.len() < self.total
    }
}

/// Groups posts by tag. For every (post, tag) pair the post is appended to
/// that tag's group, so the groups' sizes sum to the total pair count.
/// Grouping is an exact, case-sensitive match on the tag name; slugs only
/// enter the picture where a tag becomes a link target. Groups come back in
/// first-appearance order of their tag.
pub fn group_by_tag(posts: &[Post]) -> Vec<TagGroup> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<TagGroup> = Vec::new();

    for post in posts {
        for tag in &post.tags {
            match positions.get(tag.name.as_str()) {
                Some(&at) => groups[at].posts.push(post),
                None => {
                    positions.insert(&tag.name, groups.len());
                    groups.push(TagGroup {
                        tag: tag.clone(),
                        posts: vec![post],
                    });
                }
            }
        }
    }

    groups
}

/// Views the groups in ranked order: descending post count, ties broken by
/// tag name ascending. The underlying groups keep their first-appearance
/// order; this is the presentation order for "top tags" surfaces.
pub fn ranked<'g, 'a>(groups: &'g [TagGroup<'a>]) -> Vec<&'g TagGroup<'a>> {
    let mut ordered: Vec<&TagGroup> = groups.iter().collect();
    ordered.sort_by(|a, b| {
        b.count()
            .cmp(&a.count())
            .then_with(|| a.tag.name.cmp(&b.tag.name))
    });
    ordered
}

#[cfg(test)]
mod test {
    use super::*;
    use url::Url;

    fn posts(entries: &[(&str, &[&str])]) -> Vec<Post> {
        let tags_url = Url::parse("https://example.org/tags/").unwrap();
        let posts_url = Url::parse("https://example.org/posts/").unwrap();
        entries
            .iter()
            .map(|(slug, tags)| Post {
                slug: (*slug).to_owned(),
                date: String::new(),
                title: (*slug).to_owned(),
                category: None,
                author: None,
                cover: None,
                tags: tags.iter().map(|name| Tag::new(name, &tags_url)).collect(),
                url: posts_url.join(&format!("{}.html", slug)).unwrap(),
                file_path: std::path::PathBuf::from(format!("{}.html", slug)),
                body: String::new(),
            })
            .collect()
    }

    fn counts<'a>(groups: &'a [TagGroup]) -> Vec<(&'a str, usize)> {
        groups
            .iter()
            .map(|group| (group.tag.name.as_str(), group.count()))
            .collect()
    }

    #[test]
    fn test_groups_and_counts() {
        let posts = posts(&[
            ("a", &["azure", "m365"]),
            ("b", &["azure"]),
            ("c", &[]),
        ]);
        let groups = group_by_tag(&posts);
        assert_eq!(vec![("azure", 2), ("m365", 1)], counts(&groups));

        // The untagged post appears in no group.
        for group in &groups {
            assert!(group.posts.iter().all(|post| post.slug != "c"));
        }
    }

    #[test]
    fn test_group_sizes_sum_to_pair_count() {
        let posts = posts(&[
            ("a", &["rust", "wasm", "cli"]),
            ("b", &["rust"]),
            ("c", &[]),
            ("d", &["wasm", "rust"]),
        ]);
        let pairs: usize = posts.iter().map(|post| post.tags.len()).sum();
        let grouped: usize = group_by_tag(&posts).iter().map(TagGroup::count).sum();
        assert_eq!(pairs, grouped);
    }

    #[test]
    fn test_empty_input_yields_no_groups() {
        assert!(group_by_tag(&[]).is_empty());
    }

    #[test]
    fn test_first_appearance_order() {
        let posts = posts(&[
            ("a", &["m365", "azure"]),
            ("b", &["devops", "azure"]),
        ]);
        let groups = group_by_tag(&posts);
        assert_eq!(
            vec!["m365", "azure", "devops"],
            groups
                .iter()
                .map(|group| group.tag.name.as_str())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_grouping_is_case_sensitive() {
        let posts = posts(&[("a", &["DevOps"]), ("b", &["devops"])]);
        let groups = group_by_tag(&posts);
        assert_eq!(vec![("DevOps", 1), ("devops", 1)], counts(&groups));
        // Both resolve to the same link target.
        assert_eq!(groups[0].tag.url, groups[1].tag.url);
    }

    #[test]
    fn test_ranked_orders_by_count_then_name() {
        let posts = posts(&[
            ("a", &["wasm", "rust"]),
            ("b", &["rust", "cli"]),
            ("c", &["rust", "cli"]),
        ]);
        let groups = group_by_tag(&posts);
        let ordered = ranked(&groups);
        assert_eq!(
            vec![("rust", 3), ("cli", 2), ("wasm", 1)],
            ordered
                .iter()
                .map(|group| (group.tag.name.as_str(), group.count()))
                .collect::<Vec<_>>()
        );
        // The catalog ordering underneath is untouched.
        assert_eq!(vec![("wasm", 1), ("rust", 3), ("cli", 2)], counts(&groups));
    }

    #[test]
    fn test_take_exposes_total() {
        let entries: Vec<(String, Vec<&str>)> = (0..12)
            .map(|i| (format!("post-{:02}", i), vec!["azure"]))
            .collect();
        let borrowed: Vec<(&str, &[&str])> = entries
            .iter()
            .map(|(slug, tags)| (slug.as_str(), tags.as_slice()))
            .collect();
        let posts = posts(&borrowed);
        let groups = group_by_tag(&posts);

        let sample = groups[0].take(5);
        assert_eq!(5, sample.posts.len());
        assert_eq!(12, sample.total);
        assert!(sample.truncated());
        // The sample keeps the group's leading posts.
        assert_eq!("post-00", sample.posts[0].slug);
    }

    #[test]
    fn test_take_beyond_len_returns_everything() {
        let posts = posts(&[("a", &["azure"]), ("b", &["azure"])]);
        let groups = group_by_tag(&posts);
        let sample = groups[0].take(5);
        assert_eq!(2, sample.posts.len());
        assert_eq!(2, sample.total);
        assert!(!sample.truncated());
    }
}
