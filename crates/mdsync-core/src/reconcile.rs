use thiserror::Error;
use tracing::{debug, warn};

use crate::fragment::{add_class, parse_fragment, serialize_children};
use crate::page::PagePort;

pub const TASK_CHECKBOX_SELECTOR: &str = r#"li > p > input[type="checkbox"]"#;
pub const TASK_CHECKBOX_CLASS: &str = "task-list-item-checkbox";
pub const TASK_ITEM_CLASS: &str = "task-list-item";
pub const TASK_LIST_CLASS: &str = "contains-task-list";

/// Only code blocks that declare a language are highlighted.
pub const HIGHLIGHT_SELECTOR: &str = r#"code[class*="language-"]"#;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("selector failed: {0}")]
    Selector(&'static str),
    #[error("fragment serialization failed: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcessPolicy {
    /// Tag task lists on every update.
    Always,
    /// Apply the first update of the session untouched, then tag every later one.
    SkipFirst,
}

/// Add the task-list marker classes the markdown renderer leaves out.
pub fn tag_task_lists(html: &str) -> Result<String, ReconcileError> {
    let body = parse_fragment(html)?;
    let checkboxes = body
        .select(TASK_CHECKBOX_SELECTOR)
        .map_err(|_| ReconcileError::Selector(TASK_CHECKBOX_SELECTOR))?
        .collect::<Vec<_>>();

    for checkbox in checkboxes {
        let checkbox = checkbox.as_node();
        add_class(checkbox, TASK_CHECKBOX_CLASS);

        // The selector guarantees p and li above the checkbox.
        let Some(item) = checkbox.parent().and_then(|paragraph| paragraph.parent()) else {
            continue;
        };
        add_class(&item, TASK_ITEM_CLASS);
        if let Some(list) = item.parent() {
            add_class(&list, TASK_LIST_CLASS);
        }
    }

    serialize_children(&body)
}

/// Owns the displayed body content.
#[derive(Debug)]
pub struct ContentReconciler {
    policy: PostProcessPolicy,
    applied: u64,
}

impl ContentReconciler {
    pub fn new(policy: PostProcessPolicy) -> Self {
        Self { policy, applied: 0 }
    }

    pub fn policy(&self) -> PostProcessPolicy {
        self.policy
    }

    /// Number of updates applied so far.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn apply_html<P: PagePort>(&mut self, page: &mut P, body: &str) {
        let skip = self.policy == PostProcessPolicy::SkipFirst && self.applied == 0;
        let html = if skip {
            debug!("html_update_untagged: first update applied without task-list classes");
            body.to_string()
        } else {
            match tag_task_lists(body) {
                Ok(tagged) => tagged,
                Err(err) => {
                    warn!("html_post_process_error: {err}; inserting raw body");
                    body.to_string()
                }
            }
        };

        page.replace_body(&html);
        page.highlight_code(HIGHLIGHT_SELECTOR);
        self.applied += 1;
        debug!(applied = self.applied, bytes = html.len(), "markdown updated");
    }
}
