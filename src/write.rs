//! Responsible for templating and writing HTML pages to disk from [`Post`]
//! sources and their tag groups. Four kinds of page come out of a build:
//!
//! 1. Post pages, one per post, linked prev/next in date order.
//! 2. Main index pages: all posts, paginated; every page carries the ranked
//!    "top tags" sidebar.
//! 3. Per-tag index pages: one paginated index per tag group, addressed by
//!    the tag's slug.
//! 4. The tag catalog page: every group in first-appearance order, each with
//!    a bounded post sample and its total count.

use gtmpl::{Template, Value};
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::index::{ranked, TagGroup};
use crate::post::Post;
use crate::tag::slugify;
use url::Url;

/// Renders posts and tag groups into output HTML files.
pub struct Writer<'a> {
    /// The template for post pages.
    pub posts_template: &'a Template,

    /// The template for index pages (main and per-tag).
    pub index_template: &'a Template,

    /// The template for the tag catalog page.
    pub tags_template: &'a Template,

    /// The base URL for main index pages: `{index_url}/index.html`,
    /// `{index_url}/1.html`, etc. Must end with a trailing slash.
    pub index_url: &'a Url,

    /// The directory in which main index files are written.
    pub index_output_directory: &'a Path,

    /// The base URL for tag pages: the catalog at `{tags_url}/index.html`,
    /// per-tag indexes at `{tags_url}/{slug}/index.html`, `{slug}/1.html`,
    /// etc. Must end with a trailing slash.
    pub tags_url: &'a Url,

    /// The directory in which tag catalog and per-tag index files are
    /// written.
    pub tags_output_directory: &'a Path,

    /// The number of posts per index page.
    pub index_page_size: usize,

    /// How many ranked tags the index-page sidebar shows.
    pub sidebar_tags: usize,

    /// How many posts the catalog page samples per tag.
    pub catalog_sample: usize,

    /// The URL for the site's home page, available to every template.
    pub home_page: &'a Url,

    /// The URL for the static assets, available to every template.
    pub static_url: &'a Url,
}

impl Writer<'_> {
    /// Takes a slice of [`Post`]s and their tag groups and writes every
    /// output page to disk.
    pub fn write_posts(&self, posts: &[Post], groups: &[TagGroup]) -> Result<()> {
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        for page in self.pages(posts, groups) {
            let dir = page.file_path.parent().unwrap(); // there should always be a dir
            if seen_dirs.insert(dir.to_owned()) {
                std::fs::create_dir_all(dir)?;
            }
            self.write_page(&page)?;
        }
        Ok(())
    }

    /// Takes a single [`Page`], templates it, and writes it to disk.
    fn write_page(&self, page: &Page) -> Result<()> {
        let mut value = page.to_value();
        if let Value::Object(obj) = &mut value {
            obj.insert(
                "home_page".to_owned(),
                Value::String(self.home_page.to_string()),
            );
            obj.insert(
                "static_url".to_owned(),
                Value::String(self.static_url.to_string()),
            );
        }
        page.template.execute(
            &mut std::fs::File::create(&page.file_path)?,
            &gtmpl::Context::from(value).unwrap(),
        )?;
        Ok(())
    }

    /// Creates all of the output [`Page`]s for a set of posts and groups.
    fn pages<'t>(&'t self, posts: &[Post], groups: &[TagGroup]) -> Vec<Page<'t>> {
        let sidebar = self.sidebar_value(groups);

        let all: Vec<&Post> = posts.iter().collect();
        let mut pages = self.index_pages(
            &all,
            self.index_url,
            self.index_output_directory,
            vec![("tags".to_owned(), sidebar)],
        );

        for group in groups {
            let slug = slugify(&group.tag.name);
            // slugs only contain [a-z0-9-], which always joins cleanly
            let base_url = self.tags_url.join(&format!("{}/", slug)).unwrap();
            pages.extend(self.index_pages(
                &group.posts,
                &base_url,
                &self.tags_output_directory.join(&slug),
                vec![
                    ("tag".to_owned(), Value::from(&group.tag)),
                    ("total".to_owned(), Value::from(group.count() as u64)),
                ],
            ));
        }

        pages.push(self.catalog_page(groups));
        pages.extend(self.post_pages(posts));
        pages
    }

    /// The ranked top-N sidebar entries shared by every index page.
    fn sidebar_value(&self, groups: &[TagGroup]) -> Value {
        Value::Array(
            ranked(groups)
                .into_iter()
                .take(self.sidebar_tags)
                .map(Value::from)
                .collect(),
        )
    }

    /// Creates the paginated index [`Page`]s for one sequence of posts,
    /// rooted at `base_url`/`output_directory`. The first page is
    /// `index.html`, later ones `1.html`, `2.html`, etc.
    fn index_pages<'t>(
        &'t self,
        posts: &[&Post],
        base_url: &Url,
        output_directory: &Path,
        extra: Vec<(String, Value)>,
    ) -> Vec<Page<'t>> {
        // a page size of zero would never terminate
        let page_size = self.index_page_size.max(1);
        let total_pages = match posts.len() % page_size {
            0 => (posts.len() / page_size).max(1),
            _ => posts.len() / page_size + 1,
        };

        let page_file_name = |i: usize| match i {
            0 => String::from("index.html"),
            _ => format!("{}.html", i),
        };

        (0..total_pages)
            .map(|i| {
                let chunk = &posts[i * page_size..posts.len().min((i + 1) * page_size)];
                Page {
                    item: Value::Array(chunk.iter().map(|post| post.summarize()).collect()),
                    extra: extra.clone(),
                    file_path: output_directory.join(page_file_name(i)),
                    prev: match i {
                        0 => None,
                        _ => Some(base_url.join(&page_file_name(i - 1)).unwrap()),
                    },
                    next: match i < total_pages - 1 {
                        false => None,
                        true => Some(base_url.join(&format!("{}.html", i + 1)).unwrap()),
                    },
                    template: self.index_template,
                }
            })
            .collect()
    }

    /// Creates the tag catalog [`Page`]: every group in first-appearance
    /// order with a bounded sample of posts and the group's total, so the
    /// template can render "showing n of total".
    fn catalog_page<'t>(&'t self, groups: &[TagGroup]) -> Page<'t> {
        Page {
            item: Value::Array(
                groups
                    .iter()
                    .map(|group| Value::from(&group.take(self.catalog_sample)))
                    .collect(),
            ),
            extra: Vec::new(),
            file_path: self.tags_output_directory.join("index.html"),
            prev: None,
            next: None,
            template: self.tags_template,
        }
    }

    /// Creates all of the post [`Page`]s for a set of [`Post`]s.
    fn post_pages<'t>(&'t self, posts: &[Post]) -> Vec<Page<'t>> {
        posts
            .iter()
            .enumerate()
            .map(|(i, post)| Page {
                item: post.to_value(),
                extra: Vec::new(),
                file_path: post.file_path.clone(),
                prev: match i < 1 {
                    true => None,
                    false => Some(posts[i - 1].url.clone()),
                },
                next: match i >= posts.len() - 1 {
                    true => None,
                    false => Some(posts[i + 1].url.clone()),
                },
                template: self.posts_template,
            })
            .collect()
    }
}

/// An object representing an output HTML file. A [`Page`] can be converted
/// to a [`Value`] and thus rendered in a template via [`Page::to_value`].
struct Page<'a> {
    /// The main item for the page: a post object or an array of summaries.
    item: Value,

    /// Page-specific template fields (the sidebar, the selected tag, ...).
    extra: Vec<(String, Value)>,

    /// The target location on disk for the output file.
    file_path: PathBuf,

    /// The URL for the previous page, if any.
    prev: Option<Url>,

    /// The URL for the next page, if any.
    next: Option<Url>,

    /// The template with which the page will be rendered.
    template: &'a Template,
}

impl Page<'_> {
    /// Converts a [`Page`] into a [`Value`]. The result is a
    /// [`Value::Object`] with fields `item`, `prev`, and `next`, plus the
    /// page's extra fields.
    fn to_value(&self) -> Value {
        use std::collections::HashMap;

        let option_to_value = |opt: &Option<Url>| match opt {
            Some(url) => Value::String(url.to_string()),
            None => Value::Nil,
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("item".to_owned(), self.item.clone());
        m.insert("prev".to_owned(), option_to_value(&self.prev));
        m.insert("next".to_owned(), option_to_value(&self.next));
        for (key, value) in &self.extra {
            m.insert(key.clone(), value.clone());
        }
        Value::Object(m)
    }
}

/// The result of a fallible page-writing operation.
type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`].
    /// This allows us to use the `?` operator for fallible template
    /// operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::index::group_by_tag;
    use crate::tag::Tag;

    fn posts(n: usize, tags: &[&str]) -> Vec<Post> {
        let posts_url = Url::parse("https://example.org/posts/").unwrap();
        let tags_url = Url::parse("https://example.org/tags/").unwrap();
        (0..n)
            .map(|i| Post {
                slug: format!("post-{:02}", i),
                date: format!("2021-01-{:02}", i + 1),
                title: format!("Post {}", i),
                category: None,
                author: None,
                cover: None,
                tags: tags.iter().map(|name| Tag::new(name, &tags_url)).collect(),
                url: posts_url.join(&format!("post-{:02}.html", i)).unwrap(),
                file_path: PathBuf::from(format!("/tmp/out/posts/post-{:02}.html", i)),
                body: String::new(),
            })
            .collect()
    }

    fn template() -> Template {
        let mut template = Template::default();
        template.parse("ok").unwrap();
        template
    }

    #[test]
    fn test_pages_cover_all_surfaces() {
        let posts = posts(25, &["Azure Stack"]);
        let groups = group_by_tag(&posts);

        let posts_template = template();
        let index_template = template();
        let tags_template = template();
        let index_url = Url::parse("https://example.org/pages/").unwrap();
        let tags_url = Url::parse("https://example.org/tags/").unwrap();
        let home_page = Url::parse("https://example.org/").unwrap();
        let static_url = Url::parse("https://example.org/static/").unwrap();
        let writer = Writer {
            posts_template: &posts_template,
            index_template: &index_template,
            tags_template: &tags_template,
            index_url: &index_url,
            index_output_directory: Path::new("/tmp/out/pages"),
            tags_url: &tags_url,
            tags_output_directory: Path::new("/tmp/out/tags"),
            index_page_size: 10,
            sidebar_tags: 10,
            catalog_sample: 5,
            home_page: &home_page,
            static_url: &static_url,
        };

        let pages = writer.pages(&posts, &groups);
        let paths: Vec<&Path> = pages.iter().map(|page| page.file_path.as_path()).collect();

        // 3 main index pages + 3 per-tag pages + catalog + 25 post pages.
        assert_eq!(32, pages.len());
        assert!(paths.contains(&Path::new("/tmp/out/pages/index.html")));
        assert!(paths.contains(&Path::new("/tmp/out/pages/2.html")));
        assert!(paths.contains(&Path::new("/tmp/out/tags/azure-stack/index.html")));
        assert!(paths.contains(&Path::new("/tmp/out/tags/azure-stack/2.html")));
        assert!(paths.contains(&Path::new("/tmp/out/tags/index.html")));
        assert!(paths.contains(&Path::new("/tmp/out/posts/post-07.html")));

        // Pagination links: the second main index page points both ways.
        let second = pages
            .iter()
            .find(|page| page.file_path == Path::new("/tmp/out/pages/1.html"))
            .unwrap();
        assert_eq!(
            "https://example.org/pages/index.html",
            second.prev.as_ref().unwrap().as_str()
        );
        assert_eq!(
            "https://example.org/pages/2.html",
            second.next.as_ref().unwrap().as_str()
        );
    }

    #[test]
    fn test_empty_post_set_still_yields_index_and_catalog() {
        let posts: Vec<Post> = Vec::new();
        let groups = group_by_tag(&posts);

        let posts_template = template();
        let index_template = template();
        let tags_template = template();
        let index_url = Url::parse("https://example.org/pages/").unwrap();
        let tags_url = Url::parse("https://example.org/tags/").unwrap();
        let home_page = Url::parse("https://example.org/").unwrap();
        let static_url = Url::parse("https://example.org/static/").unwrap();
        let writer = Writer {
            posts_template: &posts_template,
            index_template: &index_template,
            tags_template: &tags_template,
            index_url: &index_url,
            index_output_directory: Path::new("/tmp/out/pages"),
            tags_url: &tags_url,
            tags_output_directory: Path::new("/tmp/out/tags"),
            index_page_size: 10,
            sidebar_tags: 10,
            catalog_sample: 5,
            home_page: &home_page,
            static_url: &static_url,
        };

        let pages = writer.pages(&posts, &groups);
        // An empty main index page plus the (empty) catalog.
        assert_eq!(2, pages.len());
    }
}
