//! Configuration types.

use serde::{Deserialize, Serialize};

use crate::args::{CoreOptions, MemcheckOptions, ToolOptions};

/// How to invoke the analysis tool and what its report looks like.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ToolConfig {
    /// Tool executable.
    #[serde(default = "default_program")]
    pub program: String,
    /// Content expected in the report's `<tool>` element.
    #[serde(default = "default_tool_id")]
    pub tool_id: String,
    /// Name of the report's root element.
    #[serde(default = "default_root_element")]
    pub root_element: String,
    /// Flag switching the tool to structured output.
    #[serde(default = "default_report_flag")]
    pub report_flag: String,
    /// Option naming the descriptor the report is written to, without dashes.
    #[serde(default = "default_fd_flag")]
    pub fd_flag: String,
}

fn default_program() -> String {
    "valgrind".to_string()
}

fn default_tool_id() -> String {
    crate::report::DEFAULT_TOOL_ID.to_string()
}

fn default_root_element() -> String {
    crate::report::DEFAULT_ROOT_ELEMENT.to_string()
}

fn default_report_flag() -> String {
    "--structured-report=yes".to_string()
}

fn default_fd_flag() -> String {
    "report-fd".to_string()
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            tool_id: default_tool_id(),
            root_element: default_root_element(),
            report_flag: default_report_flag(),
            fd_flag: default_fd_flag(),
        }
    }
}

impl ToolConfig {
    /// Settings for a stock valgrind, which calls the report `valgrindoutput`.
    #[must_use]
    pub fn valgrind() -> Self {
        Self {
            root_element: "valgrindoutput".to_string(),
            report_flag: "--xml=yes".to_string(),
            fd_flag: "xml-fd".to_string(),
            ..Self::default()
        }
    }

    /// Use a different executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrindConfig {
    #[serde(default)]
    pub tool: ToolConfig,
    #[serde(default)]
    pub core: CoreOptions,
    #[serde(default)]
    pub memcheck: MemcheckOptions,
}

impl GrindConfig {
    /// Options passed to the tool on every run.
    #[must_use]
    pub fn tool_options(&self) -> ToolOptions {
        ToolOptions {
            core: self.core.clone(),
            memcheck: self.memcheck.clone(),
        }
    }
}
