//! Filtering a built report.

use grindview::report::{ErrorKind, ReportBuilder, ReportFilter, ResultTree};
use grindview::xml::StreamingXmlParser;

use crate::MEMCHECK_REPORT;

fn tree() -> ResultTree {
    let mut parser = StreamingXmlParser::new(ReportBuilder::new());
    parser.feed(MEMCHECK_REPORT.as_bytes(), true).unwrap();
    parser.into_handler().into_tree()
}

fn visible_labels(tree: &ResultTree, filter: &ReportFilter) -> Vec<String> {
    filter
        .visible_roots(tree)
        .into_iter()
        .map(|id| tree[id].label.clone())
        .collect()
}

#[test]
fn kind_filter_keeps_markers() {
    let tree = tree();
    let filter = ReportFilter::new().with_kind(ErrorKind::LeakDefinitelyLost);
    let labels = visible_labels(&tree, &filter);
    assert_eq!(labels.len(), 6);
    assert!(!labels.iter().any(|l| l.starts_with("Invalid read")));
}

#[test]
fn text_filter_searches_nested_frames() {
    let tree = tree();
    let filter = ReportFilter::new().with_text("a.c");
    assert_eq!(visible_labels(&tree, &filter).len(), 7);

    let filter = ReportFilter::new().with_text("size 40");
    let labels = visible_labels(&tree, &filter);
    assert!(labels.contains(&"Invalid read of size 4".to_string()));
    assert!(!labels.iter().any(|l| l.contains("definitely lost")));
}

#[test]
fn inverted_text_filter() {
    let tree = tree();
    let filter = ReportFilter::new().with_text("size 40").inverted(true);
    let labels = visible_labels(&tree, &filter);
    assert!(!labels.contains(&"Invalid read of size 4".to_string()));
    assert!(labels.iter().any(|l| l.contains("definitely lost")));
    assert!(labels.contains(&"END".to_string()));
}

#[test]
fn kind_parsed_from_user_input() {
    let kind: ErrorKind = "leak_definitelylost".parse().unwrap();
    let filter = ReportFilter::new().with_kind(kind);
    assert!(!filter.is_empty());
    assert_eq!(visible_labels(&tree(), &filter).len(), 6);
}
