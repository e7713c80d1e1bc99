//! Building trees from complete memcheck reports.

use grindview::report::{ErrorKind, ReportBuilder, ResultTree, RowKind, TreeChange};
use grindview::xml::StreamingXmlParser;

use crate::MEMCHECK_REPORT;

fn build(doc: &[u8], chunk: usize) -> ReportBuilder {
    let mut parser = StreamingXmlParser::new(ReportBuilder::new());
    for part in doc.chunks(chunk) {
        parser.feed(part, false).unwrap();
    }
    parser.feed(&[], true).unwrap();
    parser.into_handler()
}

fn tree_json(tree: &ResultTree) -> serde_json::Value {
    serde_json::to_value(tree).unwrap()
}

#[test]
fn top_level_rows_in_document_order() {
    let builder = build(MEMCHECK_REPORT.as_bytes(), 4096);
    assert_eq!(
        builder.tree().root_labels(),
        vec![
            "STATUS",
            "Invalid read of size 4",
            "ERRORCOUNTS",
            "STATUS",
            "40 bytes in 1 blocks are definitely lost in loss record 1 of 1",
            "ERRORCOUNTS",
            "END",
        ]
    );
    assert!(builder.warnings().is_empty());
}

#[test]
fn tree_does_not_depend_on_chunking() {
    let doc = MEMCHECK_REPORT.as_bytes();
    let whole = tree_json(build(doc, doc.len()).tree());
    for size in [1, 2, 7, 512] {
        assert_eq!(tree_json(build(doc, size).tree()), whole, "chunk size {size}");
    }
}

#[test]
fn invalid_read_entry_shape() {
    let builder = build(MEMCHECK_REPORT.as_bytes(), 33);
    let tree = builder.tree();
    let entry = tree.roots()[1];
    assert_eq!(tree[entry].error_kind, ErrorKind::InvalidRead);

    let children = tree.children(entry);
    assert_eq!(children.len(), 2);
    let first = &tree[children[0]];
    assert_eq!(first.label, "at main (a.c:6)");
    assert_eq!(first.ip, 0x0040_05B4);
    assert_eq!(
        first.location(),
        Some((std::path::PathBuf::from("/tmp/a.c"), 6))
    );

    let aux = children[1];
    assert_eq!(tree[aux].kind, RowKind::Auxiliary);
    let alloc: Vec<&str> = tree
        .children(aux)
        .iter()
        .map(|&id| tree[id].label.as_str())
        .collect();
    assert_eq!(
        alloc,
        vec![
            "at malloc (in /usr/lib/valgrind/vgpreload_memcheck-amd64-linux.so)",
            "by main (a.c:5)",
        ]
    );
}

#[test]
fn leak_entry_is_classified() {
    let builder = build(MEMCHECK_REPORT.as_bytes(), 100);
    let tree = builder.tree();
    let leak = tree.roots()[4];
    assert_eq!(tree[leak].error_kind, ErrorKind::LeakDefinitelyLost);
    assert!(tree[leak].error_kind.is_leak());
    assert_eq!(tree.children(leak).len(), 2);
}

#[test]
fn exactly_one_end_row() {
    let builder = build(MEMCHECK_REPORT.as_bytes(), 9);
    let tree = builder.tree();
    let ends = tree
        .roots()
        .iter()
        .filter(|&&id| tree[id].kind == RowKind::End)
        .count();
    assert_eq!(ends, 1);
    assert_eq!(tree[*tree.roots().last().unwrap()].kind, RowKind::End);
}

#[test]
fn observer_sees_every_insert() {
    let mut parser = StreamingXmlParser::new(ReportBuilder::new());
    let mut rx = parser.handler_mut().subscribe();
    parser.feed(MEMCHECK_REPORT.as_bytes(), true).unwrap();

    let mut inserted = 0;
    while let Ok(change) = rx.try_recv() {
        if matches!(change, TreeChange::Inserted { .. }) {
            inserted += 1;
        }
    }
    assert_eq!(inserted, parser.handler().tree().len());
}
