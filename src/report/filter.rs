//! Visibility rules for rows of a [`ResultTree`].

use super::kind::ErrorKind;
use super::tree::{ResultTree, Row, RowId};

/// Decides which rows are shown.
///
/// Both tests are made at the top-level ancestor, so an entry is always
/// shown or hidden as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    /// Only show entries of this kind. `None` shows every kind.
    pub kind: Option<ErrorKind>,
    /// Substring the entry must contain in a label, dir or file column.
    pub text: Option<String>,
    /// Show entries that do *not* contain `text`.
    pub invert: bool,
}

impl ReportFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// Returns true if the filter lets every row through.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.text.as_deref().map_or(true, str::is_empty)
    }

    /// Returns true if `id` is visible.
    #[must_use]
    pub fn matches(&self, tree: &ResultTree, id: RowId) -> bool {
        let top = tree.toplevel(id);
        self.kind_matches(&tree[top]) && self.text_matches(tree, top)
    }

    /// Visible top-level rows, in order.
    #[must_use]
    pub fn visible_roots(&self, tree: &ResultTree) -> Vec<RowId> {
        tree.roots()
            .iter()
            .copied()
            .filter(|&id| self.matches(tree, id))
            .collect()
    }

    fn kind_matches(&self, top: &Row) -> bool {
        // Markers carry no kind and are never hidden.
        if top.error_kind == ErrorKind::Unclassified {
            return true;
        }
        self.kind.map_or(true, |kind| kind == top.error_kind)
    }

    fn text_matches(&self, tree: &ResultTree, top: RowId) -> bool {
        let Some(needle) = self.text.as_deref().filter(|t| !t.is_empty()) else {
            return true;
        };
        // Childless rows are markers, not entries.
        if tree.children(top).is_empty() {
            return true;
        }
        subtree_contains(tree, top, needle) != self.invert
    }
}

fn row_contains(row: &Row, needle: &str) -> bool {
    row.label.contains(needle)
        || row.dir.as_deref().is_some_and(|d| d.contains(needle))
        || row.file.as_deref().is_some_and(|f| f.contains(needle))
}

fn subtree_contains(tree: &ResultTree, id: RowId, needle: &str) -> bool {
    row_contains(&tree[id], needle)
        || tree
            .children(id)
            .iter()
            .any(|&child| subtree_contains(tree, child, needle))
}
