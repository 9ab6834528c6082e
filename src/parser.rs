//! Loads [`Post`]s from a content root. Each source entry is either a plain
//! Markdown file (`{date}--{slug}.md`) or a post bundle (a directory holding
//! `index.md` plus its assets). As each post is parsed, the loader registers
//! its file and content nodes in the shared [`NodeGraph`] and invokes the
//! caller's observer, which is how the tag deriver sees every node exactly
//! once. With more than one thread, entries fan out over a channel and the
//! observer runs concurrently, so it must be re-entrant.

use std::fmt;
use std::fs::{read_dir, File};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::derive::{ContentNode, NodeKind};
use crate::graph::{FileNode, Node, NodeGraph};
use crate::markdown;
use crate::post::Post;
use crate::tag::{tag_names, Tag};

const MARKDOWN_EXTENSION: &str = ".md";

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    /// `posts_url` is the base URL for post pages (i.e., the URL for a post
    /// is `{posts_url}/{slug}.html`). Must end with a trailing slash.
    posts_url: &'a Url,

    /// `tags_url` is the base URL for tag index pages, used to build each
    /// tag's link target. Must end with a trailing slash.
    tags_url: &'a Url,

    /// `posts_directory` is the directory in which post pages will be
    /// rendered.
    posts_directory: &'a Path,

    /// The logical name of the content root being parsed (e.g. `posts`).
    /// Recorded on every file node; the tag deriver filters on it.
    source_name: &'a str,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser. See fields on [`Parser`] for argument
    /// descriptions.
    pub fn new(
        posts_url: &'a Url,
        tags_url: &'a Url,
        posts_directory: &'a Path,
        source_name: &'a str,
    ) -> Parser<'a> {
        Parser {
            posts_url,
            tags_url,
            posts_directory,
            source_name,
        }
    }

    /// Searches `source_directory` for post files and post bundles, parses
    /// them on up to `threads` threads, registers each parsed post's nodes
    /// in `graph`, and invokes `observe` once per content node. Returns the
    /// posts sorted by date (most recent first, slug ascending on ties)
    /// together with the bundle assets to copy into the output.
    ///
    /// Each post file must be structured as follows:
    ///
    /// 1. Initial frontmatter fence (`---`)
    /// 2. YAML frontmatter with a `title` field and optionally `category`,
    ///    `tags`, `author`, and `cover`
    /// 3. Terminal frontmatter fence (`---`)
    /// 4. Post body
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// tags: [greet]
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    pub fn parse_posts<F>(
        &self,
        source_directory: &Path,
        threads: usize,
        graph: &NodeGraph,
        observe: &F,
    ) -> Result<Posts>
    where
        F: Fn(&NodeGraph, &ContentNode) + Sync,
    {
        let (mut posts, static_files) = if threads < 2 {
            self.parse_posts_singlethreaded(source_directory, graph, observe)?
        } else {
            self.parse_posts_parallel(source_directory, threads, graph, observe)?
        };

        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
        Ok((posts, static_files))
    }

    fn parse_posts_singlethreaded<F>(
        &self,
        source_directory: &Path,
        graph: &NodeGraph,
        observe: &F,
    ) -> Result<Posts>
    where
        F: Fn(&NodeGraph, &ContentNode) + Sync,
    {
        let mut posts = Vec::new();
        let mut static_files = Vec::new();
        for result in read_dir(source_directory)? {
            let entry = result?;
            if let Some(name) = Self::entry_name(&entry)? {
                posts.push(self.process_entry(
                    source_directory,
                    &name,
                    &mut static_files,
                    graph,
                    observe,
                )?);
            }
        }
        Ok((posts, static_files))
    }

    fn parse_posts_parallel<F>(
        &self,
        source_directory: &Path,
        threads: usize,
        graph: &NodeGraph,
        observe: &F,
    ) -> Result<Posts>
    where
        F: Fn(&NodeGraph, &ContentNode) + Sync,
    {
        use crossbeam_channel::unbounded;

        let (tx, rx) = unbounded::<String>();
        let results: Vec<Result<Posts>> = std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(threads);
            for _ in 0..threads {
                let rx = rx.clone();
                handles.push(scope.spawn(move || -> Result<Posts> {
                    let mut posts = Vec::new();
                    let mut static_files = Vec::new();
                    for name in rx {
                        posts.push(self.process_entry(
                            source_directory,
                            &name,
                            &mut static_files,
                            graph,
                            observe,
                        )?);
                    }
                    Ok((posts, static_files))
                }));
            }

            let fed = (|| -> Result<()> {
                for result in read_dir(source_directory)? {
                    let entry = result?;
                    if let Some(name) = Self::entry_name(&entry)? {
                        if tx.send(name).is_err() {
                            // every worker is gone; joining will surface why
                            break;
                        }
                    }
                }
                Ok(())
            })();
            drop(tx);

            let mut results: Vec<Result<Posts>> = handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect();
            if let Err(e) = fed {
                results.push(Err(e));
            }
            results
        });

        let mut posts = Vec::new();
        let mut static_files = Vec::new();
        for result in results {
            let (p, s) = result?;
            posts.extend(p);
            static_files.extend(s);
        }
        Ok((posts, static_files))
    }

    /// Returns the entry's file name when it is a post source: a directory
    /// holding `index.md`, or a `.md` file.
    fn entry_name(entry: &std::fs::DirEntry) -> std::io::Result<Option<String>> {
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() {
            if entry.path().join("index.md").is_file() {
                return Ok(Some(name));
            }
        } else if name.ends_with(MARKDOWN_EXTENSION) {
            return Ok(Some(name));
        }
        Ok(None)
    }

    fn process_entry<F>(
        &self,
        source_directory: &Path,
        file_name: &str,
        static_files: &mut Vec<StaticFile>,
        graph: &NodeGraph,
        observe: &F,
    ) -> Result<Post>
    where
        F: Fn(&NodeGraph, &ContentNode) + Sync,
    {
        let bundle = source_directory.join(file_name).join("index.md").is_file();
        let (relative_path, stem) = if bundle {
            (format!("{}/index.md", file_name), file_name)
        } else {
            (
                file_name.to_owned(),
                file_name.trim_end_matches(MARKDOWN_EXTENSION),
            )
        };

        let (post, frontmatter) = self
            .parse_post(source_directory, &relative_path, stem)
            .map_err(|e| {
                Error::Annotated(format!("parsing post `{}`", relative_path), Box::new(e))
            })?;

        // Collect bundle assets only after the post itself parsed.
        if bundle {
            self.collect_bundle_assets(source_directory, file_name, &post, static_files)?;
        }

        let node = self.register_nodes(graph, &relative_path, &post, frontmatter);
        observe(graph, &node);
        log::debug!("parsed post `{}`", post.slug);
        Ok(post)
    }

    fn parse_post(
        &self,
        source_directory: &Path,
        relative_path: &str,
        stem: &str,
    ) -> Result<(Post, serde_yaml::Value)> {
        fn frontmatter_indices(input: &str) -> Result<(usize, usize, usize)> {
            const FENCE: &str = "---";
            if !input.starts_with(FENCE) {
                return Err(Error::FrontmatterMissingStartFence);
            }
            match input[FENCE.len()..].find("---") {
                None => Err(Error::FrontmatterMissingEndFence),
                Some(offset) => Ok((
                    FENCE.len(),                        // yaml_start
                    FENCE.len() + offset,               // yaml_stop
                    FENCE.len() + offset + FENCE.len(), // body_start
                )),
            }
        }

        use std::io::Read;
        let mut contents = String::new();
        File::open(source_directory.join(relative_path))?.read_to_string(&mut contents)?;
        let input: &str = &contents;

        let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
        let bag: serde_yaml::Value = serde_yaml::from_str(&input[yaml_start..yaml_stop])?;
        let frontmatter: Frontmatter = serde_yaml::from_value(bag.clone())?;

        let (date, slug) = split_date_prefix(stem);
        let file_name = format!("{}.html", slug);

        let mut post = Post {
            slug: slug.to_owned(),
            date: date.to_owned(),
            title: frontmatter.title,
            category: frontmatter.category,
            author: frontmatter.author,
            cover: frontmatter.cover,
            // The frontmatter bag, not the typed struct, is the source of
            // tags: a malformed `tags` field degrades to none instead of
            // failing the parse.
            tags: tag_names(&bag)
                .iter()
                .map(|name| Tag::new(name, self.tags_url))
                .collect(),
            url: self.posts_url.join(&file_name)?,
            file_path: self.posts_directory.join(&file_name),
            body: String::new(),
        };
        markdown::to_html(&mut post.body, &input[body_start..]);
        Ok((post, bag))
    }

    fn collect_bundle_assets(
        &self,
        source_directory: &Path,
        bundle_name: &str,
        post: &Post,
        static_files: &mut Vec<StaticFile>,
    ) -> Result<()> {
        use walkdir::WalkDir;
        let bundle_dir = source_directory.join(bundle_name);
        for result in WalkDir::new(&bundle_dir) {
            let entry = result?;
            if entry.file_type().is_file() && entry.file_name() != "index.md" {
                static_files.push((
                    entry.path().to_owned(),
                    self.posts_directory
                        .join(&post.slug)
                        // strip_prefix can't fail: bundle_dir is always an
                        // ancestor of the walked entry
                        .join(entry.path().strip_prefix(&bundle_dir).unwrap()),
                ));
            }
        }
        Ok(())
    }

    fn register_nodes(
        &self,
        graph: &NodeGraph,
        relative_path: &str,
        post: &Post,
        frontmatter: serde_yaml::Value,
    ) -> ContentNode {
        let file_id = NodeGraph::node_id(&format!(
            "File >>> {}/{}",
            self.source_name, relative_path
        ));
        graph.insert(Node::File(FileNode {
            id: file_id.clone(),
            source_name: self.source_name.to_owned(),
            relative_path: relative_path.to_owned(),
        }));

        let node = ContentNode {
            id: NodeGraph::node_id(&format!("{} >>> {}", post.slug, self.source_name)),
            kind: NodeKind::Markdown,
            parent: Some(file_id),
            frontmatter: Some(frontmatter),
            fields: serde_yaml::Value::Null,
        };
        graph.insert(Node::Content(node.clone()));
        node
    }
}

/// Splits a source stem into its date prefix and slug. `2021-04-16--hello`
/// becomes `("2021-04-16", "hello")`; a stem without a prefix keeps an empty
/// date and sorts after every dated post.
fn split_date_prefix(stem: &str) -> (&str, &str) {
    match stem.split_once("--") {
        Some((date, slug)) if !date.is_empty() && !slug.is_empty() => (date, slug),
        _ => ("", stem),
    }
}

#[derive(Deserialize)]
struct Frontmatter {
    /// The title of the post.
    pub title: String,

    /// The post's category.
    #[serde(default)]
    pub category: Option<String>,

    /// The author named in the frontmatter.
    #[serde(default)]
    pub author: Option<String>,

    /// A cover image path.
    #[serde(default)]
    pub cover: Option<String>,
}

/// The parsed posts plus the bundle assets to copy, as (source, destination)
/// pairs.
pub type Posts = (Vec<Post>, Vec<StaticFile>);

pub type StaticFile = (PathBuf, PathBuf);

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file is missing its starting frontmatter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when a post source file is missing its terminal frontmatter
    /// fence (`---` i.e., the starting fence was found but the ending one
    /// was missing).
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when there is a problem building post URLs.
    UrlParse(url::ParseError),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "Post must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingStartFence => None,
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL parsing and joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::derive::{derive_article_tags, DeriveConfig};
    use std::fs;

    fn write_post(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    fn parse(dir: &Path, threads: usize) -> Result<(Posts, NodeGraph)> {
        let posts_url = Url::parse("https://example.org/posts/").unwrap();
        let tags_url = Url::parse("https://example.org/tags/").unwrap();
        let posts_directory = PathBuf::from("/tmp/out/posts");
        let parser = Parser::new(&posts_url, &tags_url, &posts_directory, "posts");

        let graph = NodeGraph::new();
        let config = DeriveConfig::default();
        let posts = parser.parse_posts(dir, threads, &graph, &|graph, node| {
            derive_article_tags(graph, node, &config)
        })?;
        Ok((posts, graph))
    }

    #[test]
    fn test_parse_posts() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_post(
            dir.path(),
            "2021-04-16--hello.md",
            "---\ntitle: Hello\ntags: [azure, m365]\n---\n# Hi\n",
        );
        write_post(
            dir.path(),
            "2021-04-17--newer.md",
            "---\ntitle: Newer\ntags: [azure]\n---\nBody\n",
        );

        let ((posts, static_files), graph) = parse(dir.path(), 1)?;

        assert_eq!(2, posts.len());
        // Newest first.
        assert_eq!("newer", posts[0].slug);
        assert_eq!("2021-04-17", posts[0].date);
        assert_eq!("hello", posts[1].slug);
        assert_eq!("Hello", posts[1].title);
        assert_eq!(
            "https://example.org/posts/hello.html",
            posts[1].url.as_str()
        );
        assert_eq!(
            vec!["azure", "m365"],
            posts[1]
                .tags
                .iter()
                .map(|tag| tag.name.as_str())
                .collect::<Vec<_>>()
        );
        assert!(posts[1].body.contains("<h1>Hi</h1>"));
        assert!(static_files.is_empty());

        // Both posts were observed by the deriver.
        let derived = graph.article_tags();
        assert_eq!(2, derived.len());
        assert_eq!("azure", derived[0].name);
        assert_eq!("m365", derived[1].name);
        Ok(())
    }

    #[test]
    fn test_parse_bundle_collects_assets() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let bundle = dir.path().join("2021-05-01--pics");
        fs::create_dir(&bundle)?;
        write_post(&bundle, "index.md", "---\ntitle: Pics\n---\n![a](a.jpg)\n");
        fs::write(bundle.join("a.jpg"), b"jpeg")?;

        let ((posts, static_files), _) = parse(dir.path(), 1)?;

        assert_eq!(1, posts.len());
        assert_eq!("pics", posts[0].slug);
        assert_eq!(1, static_files.len());
        assert_eq!(bundle.join("a.jpg"), static_files[0].0);
        assert_eq!(
            PathBuf::from("/tmp/out/posts/pics/a.jpg"),
            static_files[0].1
        );
        Ok(())
    }

    #[test]
    fn test_parse_posts_parallel_matches_singlethreaded() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for i in 0..12 {
            write_post(
                dir.path(),
                &format!("2021-01-{:02}--post-{:02}.md", i + 1, i),
                &format!("---\ntitle: Post {}\ntags: [shared, t{}]\n---\nBody\n", i, i),
            );
        }

        let ((sequential, _), _) = parse(dir.path(), 1)?;
        let ((parallel, _), graph) = parse(dir.path(), 4)?;

        let slugs = |posts: &[Post]| {
            posts
                .iter()
                .map(|post| post.slug.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(slugs(&sequential), slugs(&parallel));
        // `shared` plus one distinct tag per post.
        assert_eq!(13, graph.article_tags().len());
        Ok(())
    }

    #[test]
    fn test_malformed_tags_degrade_to_none() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_post(
            dir.path(),
            "2021-04-16--odd.md",
            "---\ntitle: Odd\ntags: scalar\n---\nBody\n",
        );

        let ((posts, _), graph) = parse(dir.path(), 1)?;
        assert_eq!(1, posts.len());
        assert!(posts[0].tags.is_empty());
        assert!(graph.article_tags().is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_fence_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "2021-04-16--broken.md", "title: no fence\n");

        match parse(dir.path(), 1) {
            Err(Error::Annotated(_, inner)) => {
                assert!(matches!(*inner, Error::FrontmatterMissingStartFence))
            }
            other => panic!("expected annotated fence error, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn test_stem_without_prefix_has_empty_date() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write_post(dir.path(), "undated.md", "---\ntitle: Undated\n---\nBody\n");
        write_post(
            dir.path(),
            "2021-04-16--dated.md",
            "---\ntitle: Dated\n---\nBody\n",
        );

        let ((posts, _), _) = parse(dir.path(), 1)?;
        assert_eq!("dated", posts[0].slug);
        assert_eq!("undated", posts[1].slug);
        assert_eq!("", posts[1].date);
        Ok(())
    }
}
