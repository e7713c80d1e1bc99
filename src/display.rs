//! Colored CLI display utilities for report output.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::process::ExitStatus;

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::report::{ErrorKind, ReportFilter, ResultTree, Row, RowKind};

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Maximum length for truncated display strings.
const DEFAULT_MAX_LEN: usize = 80;

/// Truncate a string to a maximum number of characters, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let kept: String = s.chars().take(max_len - 3).collect();
    format!("{kept}...")
}

/// One row as printed, without indentation.
#[must_use]
pub fn format_row(row: &Row, color: bool) -> String {
    if !color {
        return match row.kind {
            RowKind::Error if row.error_kind != ErrorKind::Unclassified => {
                format!("{} [{}]", row.label, row.error_kind)
            }
            RowKind::Frame if row.ip != 0 => format!("{} 0x{:X}", row.label, row.ip),
            _ => row.label.clone(),
        };
    }
    match row.kind {
        RowKind::Error => {
            let mut out = row.label.red().bold().to_string();
            if row.error_kind != ErrorKind::Unclassified {
                let _ = write!(out, " {}", format!("[{}]", row.error_kind).dimmed());
            }
            out
        }
        RowKind::Auxiliary => row.label.yellow().to_string(),
        RowKind::Frame if row.ip != 0 => {
            format!("{} {}", row.label, format!("0x{:X}", row.ip).dimmed())
        }
        RowKind::Frame => row.label.clone(),
        RowKind::Status | RowKind::ErrorCounts | RowKind::End => {
            row.label.blue().dimmed().to_string()
        }
    }
}

/// Render the visible part of the tree, two spaces per level.
#[must_use]
pub fn render_tree(tree: &ResultTree, filter: &ReportFilter, color: bool) -> String {
    let mut out = String::new();
    for (depth, id) in tree.walk() {
        if !filter.matches(tree, id) {
            continue;
        }
        let _ = writeln!(
            out,
            "{:indent$}{}",
            "",
            format_row(&tree[id], color),
            indent = depth * 2
        );
    }
    out
}

/// Print the visible part of the tree.
pub fn print_tree(tree: &ResultTree, filter: &ReportFilter) {
    print!("{}", render_tree(tree, filter, true));
    let _ = io::stdout().flush();
}

/// Number of findings in the tree.
#[must_use]
pub fn count_entries(tree: &ResultTree) -> usize {
    tree.roots()
        .iter()
        .filter(|&&id| tree[id].kind == RowKind::Error)
        .count()
}

/// Print run start information.
pub fn print_run_start(argv: &[String]) {
    println!(
        "{} {} {}",
        timestamp().dimmed(),
        "[RUN]".blue().bold(),
        truncate(&argv.join(" "), DEFAULT_MAX_LEN).cyan()
    );
    let _ = io::stdout().flush();
}

/// Print run end information.
pub fn print_run_end(status: Option<ExitStatus>, entries: usize) {
    let ts = timestamp();
    let status = status.map_or_else(|| "unknown".to_string(), |s| s.to_string());
    if entries == 0 {
        println!(
            "{} {} No errors found ({})",
            ts.dimmed(),
            "[RUN]".green().bold(),
            status.dimmed()
        );
    } else {
        println!(
            "{} {} {} error(s) reported ({})",
            ts.dimmed(),
            "[RUN]".red().bold(),
            entries,
            status.dimmed()
        );
    }
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}
