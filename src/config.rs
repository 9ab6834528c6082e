//! Project configuration. A site is described by two YAML files: the
//! project file (`taghord.yaml`) at the project root, and the theme file
//! (`theme/theme.yaml`) listing the template sets. [`Config`] flattens both
//! plus the output directory into the paths and URLs the build steps use.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// The site author, used for the Atom feed.
#[derive(Deserialize, Clone, Debug)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

fn default_sidebar_tags() -> usize {
    10
}

fn default_catalog_sample() -> usize {
    5
}

fn default_sources() -> Vec<String> {
    vec!["posts".to_owned()]
}

#[derive(Deserialize)]
struct Project {
    pub title: String,

    #[serde(default)]
    pub author: Option<Author>,

    pub site_root: Url,

    #[serde(default)]
    pub index_page_size: PageSize,

    #[serde(default = "default_sidebar_tags")]
    pub sidebar_tags: usize,

    #[serde(default = "default_catalog_sample")]
    pub catalog_sample: usize,

    /// The logical source names whose content feeds the tag index.
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
}

#[derive(Deserialize)]
struct Theme {
    index_template: Vec<PathBuf>,
    posts_template: Vec<PathBuf>,
    tags_template: Vec<PathBuf>,
}

pub struct Config {
    pub title: String,
    pub author: Option<Author>,

    pub posts_source_directory: PathBuf,
    pub static_source_directory: PathBuf,

    pub home_page: Url,
    pub index_url: Url,
    pub posts_url: Url,
    pub tags_url: Url,
    pub static_url: Url,

    pub index_template: Vec<PathBuf>,
    pub posts_template: Vec<PathBuf>,
    pub tags_template: Vec<PathBuf>,

    pub root_output_directory: PathBuf,
    pub index_output_directory: PathBuf,
    pub posts_output_directory: PathBuf,
    pub tags_output_directory: PathBuf,
    pub static_output_directory: PathBuf,

    pub index_page_size: usize,
    pub sidebar_tags: usize,
    pub catalog_sample: usize,
    pub sources: Vec<String>,
    pub threads: usize,
}

impl Config {
    /// Finds `taghord.yaml` in `dir` or the nearest ancestor directory and
    /// loads the configuration from it.
    pub fn from_directory(
        dir: &Path,
        output_directory: &Path,
        threads: Option<usize>,
    ) -> Result<Config> {
        let path = dir.join("taghord.yaml");
        if path.exists() {
            match Config::from_project_file(&path, output_directory, threads) {
                Ok(config) => Ok(config),
                Err(e) => Err(anyhow!("Loading configuration: {:?}", e)),
            }
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory, threads),
                None => Err(anyhow!(
                    "Could not find `taghord.yaml` in any parent directory"
                )),
            }
        }
    }

    pub fn from_project_file(
        path: &Path,
        output_directory: &Path,
        threads: Option<usize>,
    ) -> Result<Config> {
        use crate::util::open;
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        let project_root = path
            .parent()
            .ok_or_else(|| {
                anyhow!(
                    "Can't get parent directory for provided project file path '{:?}'",
                    path
                )
            })?;

        let theme_dir = project_root.join("theme");
        let theme_file = open(&theme_dir.join("theme.yaml"), "theme")?;
        let theme: Theme = serde_yaml::from_reader(theme_file)?;

        let site_root = with_trailing_slash(project.site_root);
        Ok(Config {
            title: project.title,
            author: project.author,
            posts_source_directory: project_root.join("posts"),
            static_source_directory: theme_dir.join("static"),
            home_page: site_root.clone(),
            index_url: site_root.join("pages/")?,
            posts_url: site_root.join("posts/")?,
            tags_url: site_root.join("tags/")?,
            static_url: site_root.join("static/")?,
            index_template: theme
                .index_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            posts_template: theme
                .posts_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            tags_template: theme
                .tags_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            root_output_directory: output_directory.to_owned(),
            index_output_directory: output_directory.join("pages"),
            posts_output_directory: output_directory.join("posts"),
            tags_output_directory: output_directory.join("tags"),
            static_output_directory: output_directory.join("static"),
            index_page_size: project.index_page_size.0,
            sidebar_tags: project.sidebar_tags,
            catalog_sample: project.catalog_sample,
            sources: project.sources,
            threads: match threads {
                None => num_cpus::get(),
                Some(threads) => threads,
            },
        })
    }
}

/// [`Url::join`] treats a base without a trailing slash as a file and
/// replaces its last segment, so the site root must always end in one.
fn with_trailing_slash(url: Url) -> Url {
    if url.path().ends_with('/') {
        url
    } else {
        let mut url = url;
        let path = format!("{}/", url.path());
        url.set_path(&path);
        url
    }
}
