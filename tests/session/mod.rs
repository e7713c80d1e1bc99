//! Session tests against a scripted stand-in for the tool.

mod session_test;

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use grindview::config::ToolConfig;
use tempfile::TempDir;
use tokio::sync::{Mutex, MutexGuard};

/// The report pipe's write end is inheritable until the child is spawned,
/// so a child spawned concurrently by another test could hold it open.
static SERIAL: Mutex<()> = Mutex::const_new(());

pub async fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().await
}

/// A bash script accepting the tool's command line.
///
/// The header finds `--report-fd=N`, moves it to descriptor 3 and puts the
/// report file path in `$REPORT`; `body` does the rest. The report
/// descriptor is usually above 9, which dash cannot redirect.
pub struct FakeTool {
    _dir: TempDir,
    pub path: PathBuf,
}

impl FakeTool {
    pub fn new(report: &str, body: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let report_path = dir.path().join("report.xml");
        std::fs::write(&report_path, report).unwrap();

        let script = format!(
            r#"#!/usr/bin/env bash
fd=
for arg in "$@"; do
  case "$arg" in
    --report-fd=*) fd="${{arg#--report-fd=}}" ;;
    --) break ;;
  esac
done
[ -n "$fd" ] || exit 64
eval "exec 3>&$fd $fd>&-"
REPORT="{report}"
{body}
"#,
            report = report_path.display(),
        );
        let path = dir.path().join("fake-memcheck");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        Self { _dir: dir, path }
    }

    /// Write the whole report, close the pipe and exit with `code`.
    pub fn complete(report: &str, code: i32) -> Self {
        Self::new(report, &format!("cat \"$REPORT\" >&3\nexec 3>&-\nexit {code}"))
    }

    pub fn config(&self) -> ToolConfig {
        ToolConfig::default().with_program(self.path.display().to_string())
    }
}
