//! Conversions from tag-index types into [`gtmpl_value::Value`]s for
//! templating.

use gtmpl_value::Value;
use std::collections::HashMap;

use crate::index::{TagGroup, TagSample};
use crate::tag::Tag;

impl From<&Tag> for Value {
    /// Converts [`Tag`]s into [`Value`]s for templating.
    fn from(tag: &Tag) -> Value {
        let mut fields: HashMap<String, Value> = HashMap::new();
        fields.insert("tag".to_owned(), Value::String(tag.name.clone()));
        fields.insert("url".to_owned(), Value::String(tag.url.to_string()));
        Value::Object(fields)
    }
}

impl From<&TagGroup<'_>> for Value {
    /// Converts a [`TagGroup`] into a sidebar entry: the tag plus its count.
    fn from(group: &TagGroup) -> Value {
        let mut fields: HashMap<String, Value> = HashMap::new();
        fields.insert("tag".to_owned(), Value::String(group.tag.name.clone()));
        fields.insert("url".to_owned(), Value::String(group.tag.url.to_string()));
        fields.insert("total".to_owned(), Value::from(group.count() as u64));
        Value::Object(fields)
    }
}

impl From<&TagSample<'_, '_>> for Value {
    /// Converts a [`TagSample`] into a catalog entry: the tag, the sampled
    /// post summaries, the group total, and whether the sample is truncated.
    fn from(sample: &TagSample) -> Value {
        let mut fields: HashMap<String, Value> = HashMap::new();
        fields.insert("tag".to_owned(), Value::String(sample.tag.name.clone()));
        fields.insert("url".to_owned(), Value::String(sample.tag.url.to_string()));
        fields.insert("total".to_owned(), Value::from(sample.total as u64));
        fields.insert("truncated".to_owned(), Value::Bool(sample.truncated()));
        fields.insert(
            "posts".to_owned(),
            Value::Array(sample.posts.iter().map(|post| post.summarize()).collect()),
        );
        Value::Object(fields)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use url::Url;

    #[test]
    fn test_tag_value_fields() {
        let base = Url::parse("https://example.org/tags/").unwrap();
        let tag = Tag::new("Power Platform", &base);
        match Value::from(&tag) {
            Value::Object(fields) => {
                assert_eq!(
                    Some(&Value::String("Power Platform".to_owned())),
                    fields.get("tag")
                );
                assert_eq!(
                    Some(&Value::String(
                        "https://example.org/tags/power-platform/index.html".to_owned()
                    )),
                    fields.get("url")
                );
            }
            other => panic!("expected object, got {:?}", other),
        }
    }
}
