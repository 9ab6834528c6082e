//! Defines the [`Post`] type: one authored piece of content with its
//! frontmatter metadata, rendered body, and output location. Posts are
//! parsed once per build by [`crate::parser`] and immutable afterwards.

use gtmpl::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use url::Url;

use crate::tag::Tag;

/// The marker separating a post's summary from the rest of its body.
pub const FOLD_TAG: &str = "<!-- more -->";

#[derive(Clone, Debug)]
pub struct Post {
    /// The post's slug: the source file name less the date prefix and
    /// extension. Unique across the site.
    pub slug: String,

    /// The date prefix of the source file name (`YYYY-MM-DD`), empty when
    /// the file has none. Posts sort by this, newest first.
    pub date: String,

    /// The post's title.
    pub title: String,

    /// The post's category, if any.
    pub category: Option<String>,

    /// The author named in the frontmatter, if any.
    pub author: Option<String>,

    /// A cover image path relative to the post, if any.
    pub cover: Option<String>,

    /// The post's tags, in frontmatter order, deduplicated.
    pub tags: Vec<Tag>,

    /// The URL of the rendered post page.
    pub url: Url,

    /// The target location on disk for the rendered page.
    pub file_path: PathBuf,

    /// The post body, already rendered to HTML.
    pub body: String,
}

impl Post {
    /// The part of the body above the fold marker, and whether the marker
    /// was present at all.
    pub fn summary(&self) -> (&str, bool) {
        match self.body.find(FOLD_TAG) {
            Some(at) => (&self.body[..at], true),
            None => (&self.body, false),
        }
    }

    /// Converts the full post into a template [`Value`].
    pub fn to_value(&self) -> Value {
        let mut fields = self.common_fields();
        fields.insert("body".to_owned(), Value::String(self.body.clone()));
        Value::Object(fields)
    }

    /// Converts the post into its index-page [`Value`]: the summary instead
    /// of the body, plus whether the summary was truncated.
    pub fn summarize(&self) -> Value {
        let (summary, summarized) = self.summary();
        let mut fields = self.common_fields();
        fields.insert("summary".to_owned(), Value::String(summary.to_owned()));
        fields.insert("summarized".to_owned(), Value::Bool(summarized));
        Value::Object(fields)
    }

    fn common_fields(&self) -> HashMap<String, Value> {
        let option = |value: &Option<String>| match value {
            Some(s) => Value::String(s.clone()),
            None => Value::Nil,
        };

        let mut fields: HashMap<String, Value> = HashMap::new();
        fields.insert("title".to_owned(), Value::String(self.title.clone()));
        fields.insert("date".to_owned(), Value::String(self.date.clone()));
        fields.insert("url".to_owned(), Value::String(self.url.to_string()));
        fields.insert("category".to_owned(), option(&self.category));
        fields.insert("author".to_owned(), option(&self.author));
        fields.insert("cover".to_owned(), option(&self.cover));
        fields.insert(
            "tags".to_owned(),
            Value::Array(self.tags.iter().map(Value::from).collect()),
        );
        fields
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn post(body: &str) -> Post {
        Post {
            slug: "p".to_owned(),
            date: "2021-01-01".to_owned(),
            title: "P".to_owned(),
            category: None,
            author: None,
            cover: None,
            tags: Vec::new(),
            url: Url::parse("https://example.org/posts/p.html").unwrap(),
            file_path: PathBuf::from("p.html"),
            body: body.to_owned(),
        }
    }

    #[test]
    fn test_summary_folds_at_marker() {
        let post = post("<p>above</p><!-- more --><p>below</p>");
        assert_eq!(("<p>above</p>", true), post.summary());
    }

    #[test]
    fn test_summary_without_marker_is_whole_body() {
        let post = post("<p>everything</p>");
        assert_eq!(("<p>everything</p>", false), post.summary());
    }
}
