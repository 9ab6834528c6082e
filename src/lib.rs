//! The library code for the `taghord` static blog generator. The
//! architecture can be generally broken down into three distinct steps:
//!
//! 1. Parsing posts from source files on disk ([`crate::parser`]). As each
//!    post is parsed, its file and content nodes are registered in a shared
//!    content graph ([`crate::graph`]) and observed by the tag deriver
//!    ([`crate::derive`]), which emits one deduplicated, content-addressed
//!    node per distinct tag value.
//! 2. Grouping the realized post set by tag ([`crate::index`]): per-tag
//!    post lists and counts, a ranked "top tags" ordering for the sidebar,
//!    and a first-appearance catalog ordering with bounded per-tag samples.
//! 3. Rendering pages to disk ([`crate::write`]): post pages, the paginated
//!    main index, one paginated index per tag, and the tag catalog page —
//!    plus the Atom feed ([`crate::feed`]).
//!
//! Tag names keep their authored casing throughout: grouping is an exact
//! string match, and a tag only passes through [`crate::tag::slugify`] at
//! the point where it becomes a link target.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod derive;
pub mod feed;
pub mod graph;
pub mod index;
pub mod markdown;
pub mod parser;
pub mod post;
pub mod tag;
pub mod value;
pub mod write;

mod util;
