//! Report builder and filter tests.

mod builder_test;
mod filter_test;

/// Verify the report types are exported from the library.
#[test]
fn test_all_report_types_exported() {
    use grindview::report::{
        ErrorKind, Frame, NumericRangeWarning, ReportBuilder, ReportError, ReportFilter,
        ResultTree, Row, RowKind, TreeChange,
    };

    let _ = ReportBuilder::new();
    let _ = ReportFilter::new();
    let _ = ResultTree::new();
    let _ = Frame::default();
    let _ = Row::new(RowKind::End, "END");
    let _ = ErrorKind::default();
    let _: fn() -> ReportError = || ReportError::ToolMismatch {
        expected: String::new(),
        found: String::new(),
    };
    let _: Option<NumericRangeWarning> = None;
    let _: Option<TreeChange> = None;
}
