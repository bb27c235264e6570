//! The host page as seen by the controller.
//!
//! Everything the controller does to the displayed document goes through
//! [`PagePort`]: replacing the body, swapping stylesheet links, scrolling.

/// Element id carried by the active stylesheet link.
pub const STYLESHEET_ID: &str = "md-stylesheet";

/// Opaque handle to a stylesheet link owned by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Instant,
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollTarget {
    Top,
    Bottom,
}

pub trait PagePort {
    /// Replace the rendered content of the document body.
    fn replace_body(&mut self, html: &str);

    /// Run syntax highlighting over the code elements matching `selector`.
    fn highlight_code(&mut self, selector: &str);

    fn find_stylesheet(&self, id: &str) -> Option<LinkHandle>;

    fn stylesheet_href(&self, link: LinkHandle) -> Option<String>;

    /// Append a stylesheet link to the document head.
    fn append_stylesheet(&mut self, href: &str) -> LinkHandle;

    fn remove_stylesheet(&mut self, link: LinkHandle);

    /// Give `link` the element id `id`.
    fn tag_stylesheet(&mut self, link: LinkHandle, id: &str);

    fn scroll_by(&mut self, delta: i64, behavior: ScrollBehavior);

    fn scroll_to(&mut self, target: ScrollTarget, behavior: ScrollBehavior);

    /// Serialized markup of the whole document.
    fn outer_html(&self) -> String;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct Link {
        pub handle: LinkHandle,
        pub href: String,
        pub id: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Scroll {
        By(i64, ScrollBehavior),
        To(ScrollTarget, ScrollBehavior),
    }

    /// Page double that records every call the controller makes.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingPage {
        pub body: String,
        pub links: Vec<Link>,
        pub highlights: Vec<String>,
        pub scrolls: Vec<Scroll>,
        pub mutations: usize,
        /// Link count observed after every stylesheet mutation.
        pub link_counts: Vec<usize>,
        next_handle: u64,
    }

    impl RecordingPage {
        pub fn with_stylesheet(href: &str) -> Self {
            let mut page = Self::default();
            let link = page.append_stylesheet(href);
            page.tag_stylesheet(link, STYLESHEET_ID);
            page.link_counts.clear();
            page.mutations = 0;
            page
        }

        pub fn active_href(&self) -> Option<String> {
            self.find_stylesheet(STYLESHEET_ID)
                .and_then(|link| self.stylesheet_href(link))
        }

        pub fn tagged_count(&self) -> usize {
            self.links
                .iter()
                .filter(|link| link.id.as_deref() == Some(STYLESHEET_ID))
                .count()
        }
    }

    impl PagePort for RecordingPage {
        fn replace_body(&mut self, html: &str) {
            self.mutations += 1;
            self.body = html.to_string();
        }

        fn highlight_code(&mut self, selector: &str) {
            self.highlights.push(selector.to_string());
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
            self.mutations += 1;
            self.next_handle += 1;
            let handle = LinkHandle(self.next_handle);
            self.links.push(Link {
                handle,
                href: href.to_string(),
                id: None,
            });
            self.link_counts.push(self.links.len());
            handle
        }

        fn remove_stylesheet(&mut self, link: LinkHandle) {
            self.mutations += 1;
            self.links.retain(|candidate| candidate.handle != link);
            self.link_counts.push(self.links.len());
        }

        fn tag_stylesheet(&mut self, link: LinkHandle, id: &str) {
            self.mutations += 1;
            if let Some(candidate) = self.links.iter_mut().find(|c| c.handle == link) {
                candidate.id = Some(id.to_string());
            }
            self.link_counts.push(self.links.len());
        }

        fn scroll_by(&mut self, delta: i64, behavior: ScrollBehavior) {
            self.scrolls.push(Scroll::By(delta, behavior));
        }

        fn scroll_to(&mut self, target: ScrollTarget, behavior: ScrollBehavior) {
            self.scrolls.push(Scroll::To(target, behavior));
        }

        fn outer_html(&self) -> String {
            format!("<html><body>{}</body></html>", self.body)
        }
    }
}
