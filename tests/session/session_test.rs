//! Spawning, pumping and tearing down runs.

use std::os::unix::process::ExitStatusExt;
use std::time::{Duration, Instant};

use grindview::args::ToolOptions;
use grindview::report::{ErrorKind, ReportError, RowKind, TreeChange};
use grindview::session::{ReadStatus, Session, SessionError};

use super::{serial, FakeTool};
use crate::MEMCHECK_REPORT;

const HEAD: &str = "<report><tool>memcheck</tool>\
    <error><kind>InvalidWrite</kind><what>Invalid write of size 1</what>\
    <stack><frame><fn>main</fn><file>w.c</file><line>9</line></frame></stack></error>";

fn start(tool: &FakeTool) -> Session {
    let mut session = Session::new(tool.config());
    session
        .start(&["./a.out", "arg"], &ToolOptions::default())
        .unwrap();
    session
}

#[tokio::test]
async fn run_builds_tree_and_reaps_child() {
    let _serial = serial().await;
    let tool = FakeTool::complete(MEMCHECK_REPORT, 3);
    let mut session = start(&tool);
    assert!(session.is_busy());

    let run = tokio::time::timeout(Duration::from_secs(10), session.run());
    let status = tokio_test::assert_ok!(run.await.unwrap()).unwrap();
    assert_eq!(status.code(), Some(3));
    assert!(!session.is_busy());
    assert!(session.is_finalized());

    let tree = session.tree();
    assert_eq!(tree.roots().len(), 7);
    assert_eq!(tree[tree.roots()[1]].error_kind, ErrorKind::InvalidRead);
    assert_eq!(tree[*tree.roots().last().unwrap()].kind, RowKind::End);
}

#[tokio::test]
async fn start_while_busy_is_rejected() {
    let _serial = serial().await;
    let tool = FakeTool::new(HEAD, "cat \"$REPORT\" >&3\nexec sleep 30");
    let mut session = start(&tool);

    let err = session
        .start(&["./other"], &ToolOptions::default())
        .unwrap_err();
    assert!(matches!(err, SessionError::Busy));
    assert!(session.is_busy());

    session.terminate().await;
    assert!(!session.is_busy());
}

#[tokio::test]
async fn terminate_mid_stream_keeps_partial_tree() {
    let _serial = serial().await;
    let tool = FakeTool::new(HEAD, "cat \"$REPORT\" >&3\nexec sleep 30");
    let mut session = start(&tool);

    tokio::time::timeout(Duration::from_secs(10), async {
        while session.tree().is_empty() {
            assert_eq!(session.pump().await, ReadStatus::KeepWatching);
        }
    })
    .await
    .unwrap();

    let started = Instant::now();
    session.terminate().await;
    assert!(started.elapsed() < Duration::from_secs(5));

    assert!(!session.is_busy());
    assert!(session.is_finalized());
    assert_eq!(
        session.exit_status().and_then(|s| s.signal()),
        Some(nix::sys::signal::Signal::SIGTERM as i32)
    );

    let tree = session.tree();
    assert_eq!(tree.root_labels(), vec!["Invalid write of size 1"]);
    assert_eq!(tree.children(tree.roots()[0]).len(), 1);
}

#[tokio::test]
async fn terminate_after_exit_is_noop() {
    let _serial = serial().await;
    let tool = FakeTool::complete(MEMCHECK_REPORT, 0);
    let mut session = start(&tool);
    session.run().await.unwrap();
    let rows = session.tree().len();

    session.terminate().await;
    session.terminate().await;
    assert!(!session.is_busy());
    assert_eq!(session.tree().len(), rows);
}

#[tokio::test]
async fn tool_exiting_after_closing_report_keeps_its_status() {
    let _serial = serial().await;
    let tool = FakeTool::new(
        MEMCHECK_REPORT,
        "cat \"$REPORT\" >&3\nexec 3>&-\nsleep 0.3\nexit 3",
    );
    let mut session = start(&tool);

    let status = tokio::time::timeout(Duration::from_secs(10), session.run())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(status.code(), Some(3));
    assert_eq!(status.signal(), None);
    assert!(session.is_finalized());
    assert_eq!(session.tree().roots().len(), 7);
}

#[tokio::test]
async fn run_waits_for_tool_after_report_ends() {
    let _serial = serial().await;
    let tool = FakeTool::new(
        MEMCHECK_REPORT,
        "cat \"$REPORT\" >&3\nexec 3>&-\nexec sleep 30",
    );
    let mut session = start(&tool);

    let waited = tokio::time::timeout(Duration::from_secs(1), session.run()).await;
    assert!(waited.is_err());
    assert!(session.is_busy());
    assert_eq!(session.tree().roots().len(), 7);

    session.terminate().await;
    assert!(!session.is_busy());
    assert!(session.is_finalized());
    assert_eq!(
        session.exit_status().and_then(|s| s.signal()),
        Some(nix::sys::signal::Signal::SIGTERM as i32)
    );
}

#[tokio::test]
async fn tool_mismatch_stops_run() {
    let _serial = serial().await;
    let report = "<report><tool>helgrind</tool><error><what>race</what></error></report>";
    let tool = FakeTool::new(report, "cat \"$REPORT\" >&3\nexec sleep 30");
    let mut session = start(&tool);

    let err = session.run().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Report(ReportError::ToolMismatch { ref found, .. }) if found == "helgrind"
    ));
    assert!(!session.is_busy());
    assert!(session.tree().is_empty());
}

#[tokio::test]
async fn large_report_spans_many_reads() {
    let _serial = serial().await;
    let mut report = String::from("<report><tool>memcheck</tool>");
    for i in 0..500 {
        report.push_str(&format!(
            "<error><kind>UninitCondition</kind><what>Conditional jump {i}</what>\
             <stack><frame><ip>0x{i:X}</ip><fn>f{i}</fn><obj>/lib/libx.so</obj></frame></stack></error>"
        ));
    }
    report.push_str("</report>");
    assert!(report.len() > 4 * grindview::session::READ_BUFFER_SIZE);

    let tool = FakeTool::complete(&report, 0);
    let mut session = start(&tool);
    session.run().await.unwrap();

    let tree = session.tree();
    assert_eq!(tree.roots().len(), 501);
    let last_entry = tree.roots()[499];
    assert_eq!(tree[last_entry].label, "Conditional jump 499");
    assert_eq!(
        tree[tree.children(last_entry)[0]].label,
        "at f499 (in /lib/libx.so)"
    );
}

#[tokio::test]
async fn session_can_be_restarted() {
    let _serial = serial().await;
    let tool = FakeTool::complete(MEMCHECK_REPORT, 0);
    let mut session = start(&tool);
    session.run().await.unwrap();
    let first = session.tree().len();

    session.start(&["./b.out"], &ToolOptions::default()).unwrap();
    assert!(!session.is_finalized());
    session.run().await.unwrap();
    assert!(session.is_finalized());
    assert_eq!(session.tree().len(), first);
    assert_eq!(session.tree().roots().len(), 7);
}

#[tokio::test]
async fn subscriber_sees_rows_as_they_arrive() {
    let _serial = serial().await;
    let tool = FakeTool::complete(MEMCHECK_REPORT, 0);
    let mut session = start(&tool);
    let mut rx = session.subscribe();
    session.run().await.unwrap();

    let mut inserted = 0;
    while let Ok(change) = rx.try_recv() {
        if let TreeChange::Inserted { .. } = change {
            inserted += 1;
        }
    }
    assert_eq!(inserted, session.tree().len());
}

#[tokio::test]
async fn ignored_sigterm_escalates_to_kill() {
    let _serial = serial().await;
    let tool = FakeTool::new(HEAD, "trap '' TERM\ncat \"$REPORT\" >&3\nexec sleep 30");
    let mut session = start(&tool);
    // The trap is set once the report starts flowing.
    tokio::time::timeout(Duration::from_secs(10), async {
        while session.tree().is_empty() {
            assert_eq!(session.pump().await, ReadStatus::KeepWatching);
        }
    })
    .await
    .unwrap();

    let started = Instant::now();
    session.terminate().await;
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_secs(15));
    assert_eq!(
        session.exit_status().and_then(|s| s.signal()),
        Some(nix::sys::signal::Signal::SIGKILL as i32)
    );
    assert!(!session.is_busy());
}
