//! An in-process page that renders to an HTML snapshot file.

use std::path::PathBuf;

use mdsync_core::{LinkHandle, PagePort, ScrollBehavior, ScrollTarget};
use tracing::{debug, warn};

use crate::highlight::CodeHighlighter;

const DEFAULT_TITLE: &str = "mdsync";
/// Estimated rendered height of one line of body markup, in pixels.
const LINE_HEIGHT: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
struct StylesheetLink {
    handle: LinkHandle,
    href: String,
    id: Option<String>,
}

pub struct HeadlessPage {
    title: String,
    base_href: Option<String>,
    body: String,
    links: Vec<StylesheetLink>,
    next_handle: u64,
    scroll_y: i64,
    highlighter: Option<CodeHighlighter>,
    snapshot: Option<PathBuf>,
}

impl Default for HeadlessPage {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPage {
    pub fn new() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            base_href: None,
            body: String::new(),
            links: Vec::new(),
            next_handle: 0,
            scroll_y: 0,
            highlighter: None,
            snapshot: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Resolve relative stylesheet and image URLs against the server.
    pub fn with_base(mut self, href: impl Into<String>) -> Self {
        self.base_href = Some(href.into());
        self
    }

    pub fn with_highlighter(mut self, highlighter: CodeHighlighter) -> Self {
        self.highlighter = Some(highlighter);
        self
    }

    /// Rewrite `path` with the full document after every change.
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot = Some(path.into());
        self
    }

    /// Start with `href` as the active stylesheet.
    pub fn with_stylesheet(mut self, href: &str) -> Self {
        let link = self.push_link(href);
        self.tag_link(link, mdsync_core::STYLESHEET_ID);
        self
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn scroll_y(&self) -> i64 {
        self.scroll_y
    }

    pub fn stylesheet_hrefs(&self) -> Vec<&str> {
        self.links.iter().map(|link| link.href.as_str()).collect()
    }

    pub fn active_stylesheet(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.id.as_deref() == Some(mdsync_core::STYLESHEET_ID))
            .map(|link| link.href.as_str())
    }

    fn document_height(&self) -> i64 {
        self.body.lines().count() as i64 * LINE_HEIGHT
    }

    fn push_link(&mut self, href: &str) -> LinkHandle {
        self.next_handle += 1;
        let handle = LinkHandle(self.next_handle);
        self.links.push(StylesheetLink {
            handle,
            href: href.to_string(),
            id: None,
        });
        handle
    }

    fn tag_link(&mut self, link: LinkHandle, id: &str) {
        for candidate in &mut self.links {
            if candidate.handle == link {
                candidate.id = Some(id.to_string());
            } else if candidate.id.as_deref() == Some(id) {
                candidate.id = None;
            }
        }
    }

    fn write_snapshot(&self) {
        let Some(path) = &self.snapshot else {
            return;
        };
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if let Err(err) = std::fs::create_dir_all(parent) {
                warn!("snapshot_dir_error: {err}");
                return;
            }
        }
        if let Err(err) = std::fs::write(path, self.outer_html()) {
            warn!("snapshot_write_error: {}: {err}", path.display());
        }
    }
}

impl PagePort for HeadlessPage {
    fn replace_body(&mut self, html: &str) {
        self.body = html.to_string();
        self.scroll_y = self.scroll_y.min(self.document_height());
        self.write_snapshot();
    }

    fn highlight_code(&mut self, selector: &str) {
        let Some(highlighter) = &self.highlighter else {
            return;
        };
        match highlighter.highlight_fragment(&self.body, selector) {
            Ok(html) => {
                self.body = html;
                self.write_snapshot();
            }
            Err(err) => warn!("highlight_error: {err}"),
        }
    }

    fn find_stylesheet(&self, id: &str) -> Option<LinkHandle> {
        self.links
            .iter()
            .find(|link| link.id.as_deref() == Some(id))
            .map(|link| link.handle)
    }

    fn stylesheet_href(&self, link: LinkHandle) -> Option<String> {
        self.links
            .iter()
            .find(|candidate| candidate.handle == link)
            .map(|candidate| candidate.href.clone())
    }

    fn append_stylesheet(&mut self, href: &str) -> LinkHandle {
        let link = self.push_link(href);
        self.write_snapshot();
        link
    }

    fn remove_stylesheet(&mut self, link: LinkHandle) {
        self.links.retain(|candidate| candidate.handle != link);
        self.write_snapshot();
    }

    fn tag_stylesheet(&mut self, link: LinkHandle, id: &str) {
        self.tag_link(link, id);
        self.write_snapshot();
    }

    fn scroll_by(&mut self, delta: i64, behavior: ScrollBehavior) {
        self.scroll_y = self
            .scroll_y
            .saturating_add(delta)
            .clamp(0, self.document_height());
        debug!(y = self.scroll_y, ?behavior, "scrolled");
        self.write_snapshot();
    }

    fn scroll_to(&mut self, target: ScrollTarget, behavior: ScrollBehavior) {
        self.scroll_y = match target {
            ScrollTarget::Top => 0,
            ScrollTarget::Bottom => self.document_height(),
        };
        debug!(y = self.scroll_y, ?behavior, "scrolled");
        self.write_snapshot();
    }

    fn outer_html(&self) -> String {
        let mut head = String::new();
        head.push_str("<meta charset=\"utf-8\"/>\n");
        head.push_str(&format!("<title>{}</title>\n", escape_text(&self.title)));
        if let Some(base) = &self.base_href {
            head.push_str(&format!("<base href=\"{}\"/>\n", escape_attr(base)));
        }
        for link in &self.links {
            match &link.id {
                Some(id) => head.push_str(&format!(
                    "<link id=\"{}\" rel=\"stylesheet\" href=\"{}\"/>\n",
                    escape_attr(id),
                    escape_attr(&link.href)
                )),
                None => head.push_str(&format!(
                    "<link rel=\"stylesheet\" href=\"{}\"/>\n",
                    escape_attr(&link.href)
                )),
            }
        }
        format!(
            "<!DOCTYPE html>\n<html data-scroll-y=\"{}\">\n<head>\n{head}</head>\n<body class=\"markdown-body\" id=\"body\">\n{}\n</body>\n</html>\n",
            self.scroll_y, self.body
        )
    }
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdsync_core::reconcile::HIGHLIGHT_SELECTOR;
    use mdsync_core::{StylesheetReference, StylesheetSwitcher, STYLESHEET_ID};

    #[test]
    fn snapshot_tracks_body_and_stylesheet() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("preview").join("index.html");
        let mut page = HeadlessPage::new()
            .with_base("http://localhost:2323/")
            .with_stylesheet("css/a.css")
            .with_snapshot(&out);

        page.replace_body("<h1>Title</h1>");
        StylesheetSwitcher::new().apply(&mut page, &StylesheetReference::new("css/b.css"));

        let snapshot = std::fs::read_to_string(&out).expect("snapshot");
        assert!(snapshot.contains("<h1>Title</h1>"));
        assert!(snapshot.contains(r#"<base href="http://localhost:2323/"/>"#));
        assert!(snapshot.contains(r#"<body class="markdown-body" id="body">"#));
        assert!(snapshot.contains(r#"<link id="md-stylesheet" rel="stylesheet" href="css/b.css?noise="#));
        assert!(!snapshot.contains("css/a.css"));
        assert_eq!(page.stylesheet_hrefs().len(), 1);
    }

    #[test]
    fn retagging_moves_the_reserved_id() {
        let mut page = HeadlessPage::new().with_stylesheet("a.css");
        let next = page.append_stylesheet("b.css");
        page.tag_stylesheet(next, STYLESHEET_ID);

        assert_eq!(page.active_stylesheet(), Some("b.css"));
        assert_eq!(page.outer_html().matches(STYLESHEET_ID).count(), 1);
    }

    #[test]
    fn scrolling_is_clamped_to_document() {
        let mut page = HeadlessPage::new();
        page.replace_body("<p>one</p>\n<p>two</p>\n<p>three</p>");

        page.scroll_by(-50, ScrollBehavior::Smooth);
        assert_eq!(page.scroll_y(), 0);

        page.scroll_by(10_000, ScrollBehavior::Smooth);
        assert_eq!(page.scroll_y(), 3 * LINE_HEIGHT);

        page.scroll_to(ScrollTarget::Top, ScrollBehavior::Instant);
        assert_eq!(page.scroll_y(), 0);

        page.scroll_to(ScrollTarget::Bottom, ScrollBehavior::Smooth);
        assert!(page.outer_html().contains(&format!("data-scroll-y=\"{}\"", 3 * LINE_HEIGHT)));
    }

    #[test]
    fn extreme_deltas_saturate() {
        let mut page = HeadlessPage::new();
        page.replace_body("<p>one</p>\n<p>two</p>");
        page.scroll_by(24, ScrollBehavior::Smooth);

        page.scroll_by(i64::MAX, ScrollBehavior::Smooth);
        assert_eq!(page.scroll_y(), 2 * LINE_HEIGHT);

        page.scroll_by(i64::MIN, ScrollBehavior::Smooth);
        assert_eq!(page.scroll_y(), 0);
    }

    #[test]
    fn highlighting_runs_only_with_a_highlighter() {
        let source = r#"<pre><code class="language-rust">let x = 1;</code></pre>"#;

        let mut plain = HeadlessPage::new();
        plain.replace_body(source);
        plain.highlight_code(HIGHLIGHT_SELECTOR);
        assert_eq!(plain.body(), source);

        let mut page = HeadlessPage::new().with_highlighter(CodeHighlighter::new());
        page.replace_body(source);
        page.highlight_code(HIGHLIGHT_SELECTOR);
        assert!(page.body().contains(r#"data-highlighted="yes""#));
    }

    #[test]
    fn attributes_are_escaped() {
        let page = HeadlessPage::new()
            .with_title("a <b> & c")
            .with_stylesheet(r#"x.css?a=1&b="2""#);
        let html = page.outer_html();
        assert!(html.contains("<title>a &lt;b&gt; &amp; c</title>"));
        assert!(html.contains(r#"href="x.css?a=1&amp;b=&quot;2&quot;""#));
    }
}
