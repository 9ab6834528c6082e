//! Defines the [`Tag`] type, which represents a [`crate::post::Post`] tag,
//! along with [`slugify`], the one conversion used everywhere a tag name
//! becomes a link target.

use std::hash::{Hash, Hasher};
use url::Url;

/// Converts a display string into a URL-safe path segment: lowercased, with
/// runs of non-alphanumeric characters collapsed into single hyphens.
/// Idempotent, so a value that is already a slug passes through unchanged.
pub fn slugify(s: &str) -> String {
    slug::slugify(s)
}

/// Represents a [`crate::post::Post`] tag. The `name` field keeps the raw,
/// case-preserved string from the frontmatter; grouping and equality work on
/// the raw name, while `url` is built from its slug.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The tag's name, exactly as authored. `macOS` and `MacOS` are distinct
    /// tags even though they share a slug.
    pub name: String,

    /// The URL for the tag's first index page. Given a `tags_url`, this
    /// looks like `{tags_url}/{slug(name)}/index.html`.
    pub url: Url,
}

impl Tag {
    /// Constructs a [`Tag`] from a raw name and the base URL for tag index
    /// pages. `tags_url` must end with a trailing slash for [`Url::join`] to
    /// append rather than replace.
    pub fn new(name: &str, tags_url: &Url) -> Tag {
        Tag {
            name: name.to_owned(),
            url: tags_url
                .join(&format!("{}/index.html", slugify(name)))
                // slugs only contain [a-z0-9-], which always joins cleanly
                .unwrap(),
        }
    }
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `name`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `name` field.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Tag {}

/// Extracts tag names from a YAML field bag. Looks up the `tags` key of a
/// mapping and keeps the string entries of a sequence value, deduplicated
/// while preserving first-occurrence order. Every other shape (missing key,
/// scalar, null, non-string entries) degrades to "no tags" rather than an
/// error.
pub fn tag_names(fields: &serde_yaml::Value) -> Vec<String> {
    use serde_yaml::Value;

    let tags = match fields {
        Value::Mapping(mapping) => mapping.get(&Value::String("tags".to_owned())),
        _ => None,
    };
    match tags {
        Some(Value::Sequence(values)) => {
            let mut names: Vec<String> = Vec::with_capacity(values.len());
            for value in values {
                if let Value::String(name) = value {
                    if !names.iter().any(|seen| seen == name) {
                        names.push(name.clone());
                    }
                }
            }
            names
        }
        _ => Vec::new(),
    }
}
