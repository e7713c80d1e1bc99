//! Typed tool options and their command-line form.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::builder::ArgsBuilder;

/// How much leak detail memcheck reports at exit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeakCheckMode {
    No,
    #[default]
    Summary,
    Yes,
    Full,
}

impl LeakCheckMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Summary => "summary",
            Self::Yes => "yes",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for LeakCheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How closely leak stacks must match to be merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeakResolution {
    Low,
    Med,
    #[default]
    High,
}

impl LeakResolution {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Med => "med",
            Self::High => "high",
        }
    }
}

impl fmt::Display for LeakResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options understood by the tool core, whatever the analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CoreOptions {
    /// Demangle C++ names.
    pub demangle: bool,
    /// Stop reporting after too many errors.
    pub error_limit: bool,
    /// Show stack frames below `main`.
    pub show_below_main: bool,
    pub track_fds: bool,
    pub time_stamp: bool,
    /// Maximum number of entries in a stack trace.
    pub num_callers: u32,
    /// Maximum size of a stack frame.
    pub max_stackframe: u64,
    /// Main thread stack size. `None` uses the ulimit value.
    pub main_stacksize: Option<u64>,
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self {
            demangle: true,
            error_limit: true,
            show_below_main: false,
            track_fds: false,
            time_stamp: false,
            num_callers: 12,
            max_stackframe: 2_000_000,
            main_stacksize: None,
        }
    }
}

impl CoreOptions {
    pub fn add_to(&self, args: &mut ArgsBuilder) {
        args.add_bool("demangle", self.demangle)
            .add_bool("error-limit", self.error_limit)
            .add_bool("show-below-main", self.show_below_main)
            .add_bool("track-fds", self.track_fds)
            .add_bool("time-stamp", self.time_stamp)
            .add_value("num-callers", self.num_callers)
            .add_value("max-stackframe", self.max_stackframe)
            .add_optional("main-stacksize", self.main_stacksize);
    }

    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = ArgsBuilder::new();
        self.add_to(&mut args);
        args.build()
    }
}

/// Memcheck-specific options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MemcheckOptions {
    pub leak_check: LeakCheckMode,
    pub leak_resolution: LeakResolution,
    /// Bytes of freed memory kept out of circulation.
    pub freelist_vol: Option<u64>,
    /// Byte written into new allocations.
    pub malloc_fill: Option<u8>,
    /// Byte written into freed blocks.
    pub free_fill: Option<u8>,
    pub show_reachable: bool,
    pub undef_value_errors: bool,
    pub track_origins: bool,
    pub partial_loads_ok: bool,
    pub workaround_gcc296_bugs: bool,
}

impl Default for MemcheckOptions {
    fn default() -> Self {
        Self {
            leak_check: LeakCheckMode::Summary,
            leak_resolution: LeakResolution::High,
            freelist_vol: Some(20_000_000),
            malloc_fill: None,
            free_fill: None,
            show_reachable: false,
            undef_value_errors: true,
            track_origins: false,
            partial_loads_ok: false,
            workaround_gcc296_bugs: false,
        }
    }
}

impl MemcheckOptions {
    /// Append `--tool=memcheck` followed by the memcheck flags.
    pub fn add_to(&self, args: &mut ArgsBuilder) {
        args.add_value("tool", "memcheck")
            .add_value("leak-check", self.leak_check)
            .add_value("leak-resolution", self.leak_resolution)
            .add_optional("freelist-vol", self.freelist_vol)
            .add_byte("malloc-fill", self.malloc_fill)
            .add_byte("free-fill", self.free_fill)
            .add_bool("show-reachable", self.show_reachable)
            .add_bool("undef-value-errors", self.undef_value_errors)
            .add_bool("track-origins", self.track_origins)
            .add_bool("partial-loads-ok", self.partial_loads_ok)
            .add_bool("workaround-gcc296-bugs", self.workaround_gcc296_bugs);
    }

    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = ArgsBuilder::new();
        self.add_to(&mut args);
        args.build()
    }
}

/// Everything passed to the tool between the fixed flags and `--`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolOptions {
    pub core: CoreOptions,
    pub memcheck: MemcheckOptions,
}

impl ToolOptions {
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = ArgsBuilder::new();
        self.core.add_to(&mut args);
        self.memcheck.add_to(&mut args);
        args.build()
    }
}
