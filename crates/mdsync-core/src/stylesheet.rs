use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::page::{PagePort, STYLESHEET_ID};

/// Query parameter carrying the cache-busting token.
pub const CACHE_BUST_PARAM: &str = "noise";

/// Path or URL of a stylesheet, without any cache-busting token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StylesheetReference(String);

impl StylesheetReference {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Recover the reference from an applied href, dropping every token.
    pub fn from_href(href: &str) -> Self {
        Self(strip_cache_bust(href))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The href to load, with `token` appended as the cache-busting parameter.
    pub fn href_with_token(&self, token: &str) -> String {
        let base = strip_cache_bust(&self.0);
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{base}{separator}{CACHE_BUST_PARAM}={token}")
    }
}

impl fmt::Display for StylesheetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token carried by an applied href, if any.
pub fn cache_bust_token(href: &str) -> Option<&str> {
    let (_, query) = href.split_once('?')?;
    let query = query.split('#').next().unwrap_or_default();
    query.split('&').find_map(|pair| {
        pair.strip_prefix(CACHE_BUST_PARAM)
            .and_then(|rest| rest.strip_prefix('='))
    })
}

fn strip_cache_bust(href: &str) -> String {
    let (without_fragment, fragment) = match href.split_once('#') {
        Some((head, tail)) => (head, Some(tail)),
        None => (href, None),
    };
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, query),
        None => return href.to_string(),
    };
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default();
            key != CACHE_BUST_PARAM
        })
        .collect();
    let mut out = path.to_string();
    if !kept.is_empty() {
        out.push('?');
        out.push_str(&kept.join("&"));
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// Swaps the active stylesheet link.
#[derive(Debug, Default)]
pub struct StylesheetSwitcher {
    last_token: Option<String>,
}

impl StylesheetSwitcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `reference` with a fresh token and make it the active stylesheet.
    ///
    /// The new link is appended before the old one is removed so the page is
    /// never without a stylesheet, and only receives the reserved id once the
    /// old link is gone.
    pub fn apply<P: PagePort>(&mut self, page: &mut P, reference: &StylesheetReference) {
        let token = self.fresh_token();
        let href = reference.href_with_token(&token);
        info!("css_apply: {href}");

        let previous = page.find_stylesheet(STYLESHEET_ID);
        let next = page.append_stylesheet(&href);
        if let Some(previous) = previous {
            page.remove_stylesheet(previous);
        }
        page.tag_stylesheet(next, STYLESHEET_ID);
        self.last_token = Some(token);
    }

    /// Re-fetch the active stylesheet after it changed on disk.
    pub fn refresh<P: PagePort>(&mut self, page: &mut P) {
        let Some(href) = page
            .find_stylesheet(STYLESHEET_ID)
            .and_then(|link| page.stylesheet_href(link))
        else {
            warn!("css_refresh_skipped: no active stylesheet");
            return;
        };
        let reference = StylesheetReference::from_href(&href);
        debug!("css_refresh: {reference}");
        self.apply(page, &reference);
    }

    fn fresh_token(&self) -> String {
        loop {
            let token = Uuid::new_v4().simple().to_string();
            if self.last_token.as_deref() != Some(token.as_str()) {
                return token;
            }
        }
    }
}
