//! Syntax highlighting for code blocks in the headless page.
//!
//! Output uses CSS classes rather than inline colors, so the active
//! stylesheet decides how highlighted code looks.

use kuchikiki::NodeRef;
use mdsync_core::fragment::{add_class, class_tokens, parse_fragment, serialize_children};
use mdsync_core::ReconcileError;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use thiserror::Error;
use tracing::{debug, warn};

pub const HIGHLIGHTED_CLASS: &str = "hljs";
pub const HIGHLIGHTED_ATTR: &str = "data-highlighted";
const LANGUAGE_PREFIX: &str = "language-";

#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("unknown language: {0}")]
    UnknownLanguage(String),
    #[error("highlighting failed: {0}")]
    Syntect(#[from] syntect::Error),
    #[error(transparent)]
    Fragment(#[from] ReconcileError),
}

pub struct CodeHighlighter {
    syntax_set: SyntaxSet,
}

impl Default for CodeHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeHighlighter {
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
        }
    }

    pub fn supports(&self, language: &str) -> bool {
        self.syntax_set.find_syntax_by_token(language).is_some()
    }

    /// Highlight `code` as `language`, returning class-annotated spans.
    pub fn highlight(&self, language: &str, code: &str) -> Result<String, HighlightError> {
        let syntax = self
            .syntax_set
            .find_syntax_by_token(language)
            .ok_or_else(|| HighlightError::UnknownLanguage(language.to_string()))?;
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntax_set, ClassStyle::Spaced);
        for line in LinesWithEndings::from(code) {
            generator.parse_html_for_line_which_includes_newline(line)?;
        }
        Ok(generator.finalize())
    }

    /// Highlight every element of the fragment `html` matching `selector`.
    pub fn highlight_fragment(&self, html: &str, selector: &str) -> Result<String, HighlightError> {
        let body = parse_fragment(html)?;
        let blocks = body
            .select(selector)
            .map_err(|_| ReconcileError::Selector("highlight"))?
            .collect::<Vec<_>>();

        let mut highlighted = 0usize;
        for block in blocks {
            let node = block.as_node();
            if is_highlighted(node) {
                continue;
            }
            let Some(language) = block_language(node) else {
                continue;
            };
            match self.highlight_block(node, &language) {
                Ok(()) => highlighted += 1,
                Err(HighlightError::UnknownLanguage(language)) => {
                    debug!("highlight_skipped: unknown language {language}")
                }
                Err(err) => warn!("highlight_block_error: {err}"),
            }
        }

        debug!(blocks = highlighted, "code highlighted");
        Ok(serialize_children(&body)?)
    }

    fn highlight_block(&self, node: &NodeRef, language: &str) -> Result<(), HighlightError> {
        let spans = self.highlight(language, &node.text_contents())?;
        replace_children(node, &spans)?;
        add_class(node, HIGHLIGHTED_CLASS);
        if let Some(element) = node.as_element() {
            element
                .attributes
                .borrow_mut()
                .insert(HIGHLIGHTED_ATTR, "yes".to_string());
        }
        Ok(())
    }
}

fn block_language(node: &NodeRef) -> Option<String> {
    class_tokens(node).into_iter().find_map(|token| {
        token
            .strip_prefix(LANGUAGE_PREFIX)
            .filter(|language| !language.is_empty())
            .map(str::to_string)
    })
}

fn is_highlighted(node: &NodeRef) -> bool {
    let marked = node
        .as_element()
        .map(|element| element.attributes.borrow().contains(HIGHLIGHTED_ATTR))
        .unwrap_or(false);
    marked || class_tokens(node).iter().any(|token| token == HIGHLIGHTED_CLASS)
}

fn replace_children(node: &NodeRef, html: &str) -> Result<(), HighlightError> {
    for child in node.children().collect::<Vec<_>>() {
        child.detach();
    }
    let spans = parse_fragment(html)?;
    for child in spans.children().collect::<Vec<_>>() {
        node.append(child);
    }
    Ok(())
}
