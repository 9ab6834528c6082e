//! Markdown-to-HTML rendering for post bodies.

use pulldown_cmark::{html, Options, Parser};

/// Renders `markdown` to HTML, appending to `out`. The extension set matches
/// what the blog's existing content uses: footnotes, smart punctuation,
/// strikethrough, tables, and task lists.
pub fn to_html(out: &mut String, markdown: &str) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    html::push_html(out, Parser::new_ext(markdown, options));
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_renders_heading_and_paragraph() {
        let mut out = String::new();
        to_html(&mut out, "# Hello\n\nWorld");
        assert!(out.contains("<h1>Hello</h1>"));
        assert!(out.contains("<p>World</p>"));
    }

    #[test]
    fn test_preserves_fold_marker() {
        let mut out = String::new();
        to_html(&mut out, "above\n\n<!-- more -->\n\nbelow");
        assert!(out.contains(crate::post::FOLD_TAG));
    }
}
