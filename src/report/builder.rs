//! Element-path state machine turning report events into a [`ResultTree`].

use tokio::sync::mpsc::UnboundedReceiver;

use crate::xml::{Attribute, ElementHandler};

use super::error::{NumericRangeWarning, ReportError};
use super::frame::{parse_ip, parse_line, Frame};
use super::kind::ErrorKind;
use super::tree::{ResultTree, Row, RowId, RowKind, TreeChange};

/// Root element of the report document.
pub const DEFAULT_ROOT_ELEMENT: &str = "report";

/// Tool identifier expected in `<tool>`.
pub const DEFAULT_TOOL_ID: &str = "memcheck";

pub const END_LABEL: &str = "END";
pub const STATUS_LABEL: &str = "STATUS";
pub const ERRORCOUNTS_LABEL: &str = "ERRORCOUNTS";

/// Full paths of the elements the builder reacts to.
#[derive(Debug, Clone)]
struct SchemaPaths {
    root: String,
    tool: String,
    status: String,
    errorcounts: String,
    error: String,
    kind: String,
    what: String,
    xwhat_text: String,
    auxwhat: String,
    stack: String,
    frame: String,
    ip: String,
    obj: String,
    func: String,
    dir: String,
    file: String,
    line: String,
}

impl SchemaPaths {
    fn new(root_element: &str) -> Self {
        let root = format!("/{root_element}");
        let error = format!("{root}/error");
        let frame = format!("{error}/stack/frame");
        Self {
            tool: format!("{root}/tool"),
            status: format!("{root}/status"),
            errorcounts: format!("{root}/errorcounts"),
            kind: format!("{error}/kind"),
            what: format!("{error}/what"),
            xwhat_text: format!("{error}/xwhat/text"),
            auxwhat: format!("{error}/auxwhat"),
            stack: format!("{error}/stack"),
            ip: format!("{frame}/ip"),
            obj: format!("{frame}/obj"),
            func: format!("{frame}/fn"),
            dir: format!("{frame}/dir"),
            file: format!("{frame}/file"),
            line: format!("{frame}/line"),
            root,
            error,
            frame,
        }
    }
}

/// Builds the result tree from parser events.
///
/// Paths are compared as whole strings; anything not in the schema is
/// ignored so newer tool versions can add elements freely.
#[derive(Debug)]
pub struct ReportBuilder {
    tree: ResultTree,
    paths: SchemaPaths,
    expected_tool: String,
    /// Row new frames and auxiliary rows attach to.
    current: Option<RowId>,
    /// Top-level row of the error being read.
    error_root: Option<RowId>,
    what: Option<String>,
    stack_len: u32,
    frame: Frame,
    warnings: Vec<NumericRangeWarning>,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportBuilder {
    /// Builder for `<report>` documents produced by memcheck.
    #[must_use]
    pub fn new() -> Self {
        Self::with_schema(DEFAULT_ROOT_ELEMENT, DEFAULT_TOOL_ID)
    }

    /// Builder for a custom root element name and tool identifier.
    #[must_use]
    pub fn with_schema(root_element: &str, expected_tool: impl Into<String>) -> Self {
        Self {
            tree: ResultTree::new(),
            paths: SchemaPaths::new(root_element),
            expected_tool: expected_tool.into(),
            current: None,
            error_root: None,
            what: None,
            stack_len: 0,
            frame: Frame::default(),
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn tree(&self) -> &ResultTree {
        &self.tree
    }

    #[must_use]
    pub fn into_tree(self) -> ResultTree {
        self.tree
    }

    /// Observe tree mutations as they happen.
    pub fn subscribe(&mut self) -> UnboundedReceiver<TreeChange> {
        self.tree.subscribe()
    }

    /// Numeric values clamped so far.
    #[must_use]
    pub fn warnings(&self) -> &[NumericRangeWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn expected_tool(&self) -> &str {
        &self.expected_tool
    }

    fn begin_error(&mut self) {
        let id = self.tree.append(None, Row::new(RowKind::Error, ""));
        self.current = Some(id);
        self.error_root = Some(id);
        self.what = None;
        self.stack_len = 0;
        self.frame.clear();
    }

    fn end_error(&mut self) {
        if let (Some(root), Some(what)) = (self.error_root, self.what.take()) {
            self.tree.set_label(root, &what);
        }
        self.current = None;
        self.error_root = None;
    }

    fn set_what(&mut self, text: &str) {
        if let Some(root) = self.error_root {
            self.tree.set_label(root, text);
        }
        self.what = Some(text.to_string());
    }

    fn push_frame(&mut self) {
        let mut row = Row::new(RowKind::Frame, self.frame.display(self.stack_len));
        row.ip = self.frame.ip;
        row.dir.clone_from(&self.frame.directory);
        row.file.clone_from(&self.frame.file);
        row.line = self.frame.line;
        self.tree.append(self.current, row);
    }

    fn push_auxwhat(&mut self, text: &str) {
        // Later stacks (e.g. where a block was allocated) nest under the explanation.
        let id = self
            .tree
            .append(self.current, Row::new(RowKind::Auxiliary, text));
        self.current = Some(id);
    }

    fn record(&mut self, warning: Option<NumericRangeWarning>) {
        if let Some(warning) = warning {
            self.warnings.push(warning);
        }
    }
}

impl ElementHandler for ReportBuilder {
    type Error = ReportError;

    fn element_start(
        &mut self,
        _name: &str,
        _attributes: &[Attribute],
        path: &str,
    ) -> Result<(), ReportError> {
        if path == self.paths.error {
            self.begin_error();
        } else if path == self.paths.stack {
            self.stack_len = 0;
        } else if path == self.paths.frame {
            self.frame.clear();
            self.stack_len += 1;
        }
        Ok(())
    }

    fn element_end(&mut self, _name: &str, text: &str, path: &str) -> Result<(), ReportError> {
        let p = &self.paths;
        if path == p.root {
            self.tree.append(None, Row::new(RowKind::End, END_LABEL));
        } else if path == p.tool {
            if text.trim() != self.expected_tool {
                return Err(ReportError::ToolMismatch {
                    expected: self.expected_tool.clone(),
                    found: text.to_string(),
                });
            }
        } else if path == p.status {
            self.tree.append(None, Row::new(RowKind::Status, STATUS_LABEL));
        } else if path == p.errorcounts {
            self.tree
                .append(None, Row::new(RowKind::ErrorCounts, ERRORCOUNTS_LABEL));
        } else if path == p.error {
            self.end_error();
        } else if path == p.frame {
            self.push_frame();
        } else if path == p.ip {
            let (ip, warning) = parse_ip(text);
            self.frame.ip = ip;
            self.record(warning);
        } else if path == p.obj {
            self.frame.object = Some(text.to_string());
        } else if path == p.func {
            self.frame.function = Some(text.to_string());
        } else if path == p.dir {
            self.frame.directory = Some(text.to_string());
        } else if path == p.file {
            self.frame.file = Some(text.to_string());
        } else if path == p.line {
            let (line, warning) = parse_line(text);
            self.frame.line = line;
            self.record(warning);
        } else if path == p.xwhat_text || path == p.what {
            self.set_what(text);
        } else if path == p.kind {
            if let Some(root) = self.error_root {
                let kind = ErrorKind::from_tool_name(text);
                if kind == ErrorKind::Unclassified {
                    tracing::debug!(kind = %text, "Unrecognized error kind");
                }
                self.tree.set_error_kind(root, kind);
            }
        } else if path == p.auxwhat {
            self.push_auxwhat(text);
        }
        Ok(())
    }
}
