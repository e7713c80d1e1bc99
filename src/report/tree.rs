//! The result tree filled from the report stream.
//!
//! Rows live in an arena and refer to each other by [`RowId`]. Rows are
//! only ever appended and never move, so an id stays valid for the life of
//! the tree.

use std::ops::Index;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::kind::ErrorKind;

/// Handle to a row of a [`ResultTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(usize);

impl RowId {
    /// Position of the row in insertion order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    /// A top-level finding.
    Error,
    /// An auxiliary explanation nested under a finding.
    Auxiliary,
    /// A stack frame.
    Frame,
    /// The `STATUS` marker.
    Status,
    /// The `ERRORCOUNTS` marker.
    ErrorCounts,
    /// The trailing `END` marker.
    End,
}

/// One row and its columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub kind: RowKind,
    pub label: String,
    /// Instruction pointer, 0 when unknown.
    pub ip: u64,
    pub dir: Option<String>,
    pub file: Option<String>,
    pub line: u32,
    pub error_kind: ErrorKind,
}

impl Row {
    #[must_use]
    pub fn new(kind: RowKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            ip: 0,
            dir: None,
            file: None,
            line: 0,
            error_kind: ErrorKind::Unclassified,
        }
    }

    /// Source location to open when the row is activated.
    #[must_use]
    pub fn location(&self) -> Option<(PathBuf, u32)> {
        let file = self.file.as_deref()?;
        let path = match self.dir.as_deref() {
            Some(dir) => PathBuf::from(dir).join(file),
            None => PathBuf::from(file),
        };
        Some((path, self.line))
    }
}

/// Notification sent to an observer after the tree changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeChange {
    Inserted { id: RowId, parent: Option<RowId> },
    Changed { id: RowId },
}

#[derive(Debug)]
struct Slot {
    row: Row,
    parent: Option<RowId>,
    children: Vec<RowId>,
}

/// Ordered forest of rows.
#[derive(Debug, Default)]
pub struct ResultTree {
    slots: Vec<Slot>,
    roots: Vec<RowId>,
    observer: Option<UnboundedSender<TreeChange>>,
}

impl ResultTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive a [`TreeChange`] for every later mutation.
    ///
    /// Replaces any previous subscriber.
    pub fn subscribe(&mut self) -> UnboundedReceiver<TreeChange> {
        let (tx, rx) = unbounded_channel();
        self.observer = Some(tx);
        rx
    }

    /// Total number of rows at every level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: RowId) -> Option<&Row> {
        self.slots.get(id.0).map(|slot| &slot.row)
    }

    /// Top-level rows in insertion order.
    #[must_use]
    pub fn roots(&self) -> &[RowId] {
        &self.roots
    }

    #[must_use]
    pub fn children(&self, id: RowId) -> &[RowId] {
        self.slots
            .get(id.0)
            .map_or(&[][..], |slot| slot.children.as_slice())
    }

    #[must_use]
    pub fn parent(&self, id: RowId) -> Option<RowId> {
        self.slots.get(id.0).and_then(|slot| slot.parent)
    }

    /// The top-level ancestor of a row (the row itself if top-level).
    #[must_use]
    pub fn toplevel(&self, mut id: RowId) -> RowId {
        while let Some(parent) = self.parent(id) {
            id = parent;
        }
        id
    }

    /// All rows in pre-order with their depth (0 for top-level rows).
    #[must_use]
    pub fn walk(&self) -> Vec<(usize, RowId)> {
        let mut out = Vec::with_capacity(self.slots.len());
        let mut stack: Vec<(usize, RowId)> = self.roots.iter().rev().map(|&id| (0, id)).collect();
        while let Some((depth, id)) = stack.pop() {
            out.push((depth, id));
            stack.extend(self.children(id).iter().rev().map(|&child| (depth + 1, child)));
        }
        out
    }

    /// Labels of the top-level rows.
    #[must_use]
    pub fn root_labels(&self) -> Vec<&str> {
        self.roots
            .iter()
            .map(|&id| self[id].label.as_str())
            .collect()
    }

    /// Nested view of the tree, for serialization.
    #[must_use]
    pub fn to_nodes(&self) -> Vec<TreeNode<'_>> {
        self.roots.iter().map(|&id| self.node(id)).collect()
    }

    /// Nested view of one row and its descendants.
    #[must_use]
    pub fn node(&self, id: RowId) -> TreeNode<'_> {
        TreeNode {
            row: &self[id],
            children: self.children(id).iter().map(|&c| self.node(c)).collect(),
        }
    }

    pub(crate) fn append(&mut self, parent: Option<RowId>, row: Row) -> RowId {
        let id = RowId(self.slots.len());
        self.slots.push(Slot {
            row,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.slots[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        self.notify(TreeChange::Inserted { id, parent });
        id
    }

    pub(crate) fn set_label(&mut self, id: RowId, label: &str) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            label.clone_into(&mut slot.row.label);
            self.notify(TreeChange::Changed { id });
        }
    }

    pub(crate) fn set_error_kind(&mut self, id: RowId, kind: ErrorKind) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            slot.row.error_kind = kind;
            self.notify(TreeChange::Changed { id });
        }
    }

    fn notify(&mut self, change: TreeChange) {
        let closed = self
            .observer
            .as_ref()
            .is_some_and(|tx| tx.send(change).is_err());
        if closed {
            self.observer = None;
        }
    }
}

impl Index<RowId> for ResultTree {
    type Output = Row;

    fn index(&self, id: RowId) -> &Row {
        &self.slots[id.0].row
    }
}

impl Serialize for ResultTree {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_nodes().serialize(serializer)
    }
}

/// A row with its children, borrowed from a [`ResultTree`].
#[derive(Debug, Serialize)]
pub struct TreeNode<'a> {
    #[serde(flatten)]
    pub row: &'a Row,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode<'a>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (ResultTree, RowId, RowId) {
        let mut tree = ResultTree::new();
        let error = tree.append(None, Row::new(RowKind::Error, ""));
        let frame = tree.append(Some(error), Row::new(RowKind::Frame, "at main (a.c:1)"));
        tree.append(None, Row::new(RowKind::End, "END"));
        (tree, error, frame)
    }

    #[test]
    fn test_append_keeps_order_and_hierarchy() {
        let (tree, error, frame) = sample();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.roots().len(), 2);
        assert_eq!(tree.children(error), &[frame]);
        assert_eq!(tree.parent(frame), Some(error));
        assert_eq!(tree.toplevel(frame), error);
        assert_eq!(tree.root_labels(), vec!["", "END"]);
    }

    #[test]
    fn test_walk_is_preorder_with_depth() {
        let (tree, error, frame) = sample();
        let walk = tree.walk();
        assert_eq!(walk[0], (0, error));
        assert_eq!(walk[1], (1, frame));
        assert_eq!(walk[2].0, 0);
    }

    #[test]
    fn test_observer_sees_inserts_and_changes() {
        let mut tree = ResultTree::new();
        let mut rx = tree.subscribe();
        let id = tree.append(None, Row::new(RowKind::Error, ""));
        tree.set_label(id, "Invalid read");
        assert_eq!(
            rx.try_recv().unwrap(),
            TreeChange::Inserted { id, parent: None }
        );
        assert_eq!(rx.try_recv().unwrap(), TreeChange::Changed { id });
        assert_eq!(tree[id].label, "Invalid read");
    }

    #[test]
    fn test_dropped_observer_is_forgotten() {
        let mut tree = ResultTree::new();
        drop(tree.subscribe());
        tree.append(None, Row::new(RowKind::Status, "STATUS"));
        assert!(tree.observer.is_none());
    }

    #[test]
    fn test_location_joins_dir_and_file() {
        let mut row = Row::new(RowKind::Frame, "at f (x.c:3)");
        assert_eq!(row.location(), None);
        row.file = Some("x.c".into());
        row.line = 3;
        assert_eq!(row.location(), Some((PathBuf::from("x.c"), 3)));
        row.dir = Some("/src".into());
        assert_eq!(row.location(), Some((PathBuf::from("/src/x.c"), 3)));
    }

    #[test]
    fn test_serializes_nested() {
        let (tree, _, _) = sample();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json[0]["kind"], "error");
        assert_eq!(json[0]["children"][0]["label"], "at main (a.c:1)");
        assert!(json[1].get("children").is_none());
    }
}
