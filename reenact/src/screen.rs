//! Reading visible text off the live screen.
//!
//! Verification compares text, not pixels. The platform adapter exposes the
//! foreground application's accessibility tree; [`screen_text`] flattens it
//! into one string by pre-order concatenation of every text-bearing node.

use serde::{Deserialize, Serialize};

/// A node in a UI accessibility tree, as the text extractor sees it.
///
/// `child` returns `None` for a child that detached between enumeration and
/// access; the walk skips it rather than failing, since foreground trees
/// mutate underneath the reader.
pub trait ScreenNode: Sized {
    /// The node's own text, if it carries any.
    fn text(&self) -> Option<String>;

    fn child_count(&self) -> usize;

    fn child(&self, index: usize) -> Option<Self>;
}

/// All visible text under `node`: the node's own text followed by each
/// child's text, depth-first, with no separators.
pub fn screen_text<N: ScreenNode>(node: &N) -> String {
    let mut out = String::new();
    if let Some(text) = node.text() {
        out.push_str(&text);
    }
    for index in 0..node.child_count() {
        if let Some(child) = node.child(index) {
            out.push_str(&screen_text(&child));
        }
    }
    out
}

/// An owned snapshot of an accessibility subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<UiNode>,
}

impl UiNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            children: Vec::new(),
        }
    }

    pub fn container(children: Vec<UiNode>) -> Self {
        Self {
            text: None,
            children,
        }
    }

    pub fn with_children(mut self, children: Vec<UiNode>) -> Self {
        self.children = children;
        self
    }
}

impl ScreenNode for &UiNode {
    fn text(&self) -> Option<String> {
        self.text.clone()
    }

    fn child_count(&self) -> usize {
        self.children.len()
    }

    fn child(&self, index: usize) -> Option<Self> {
        self.children.get(index)
    }
}

/// Source of foreground-screen snapshots.
#[async_trait::async_trait]
pub trait ScreenReader: Send + Sync {
    /// The foreground application's tree, or `None` when no window is
    /// active. A `None` here skips verification for the current step.
    async fn active_window(&self) -> Option<UiNode>;
}
