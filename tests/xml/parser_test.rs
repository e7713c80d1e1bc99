//! Chunking and path tracking over a real report.

use grindview::xml::{EventRecorder, FeedError, ParseEvent, StreamingXmlParser};

use crate::MEMCHECK_REPORT;

fn parse_in_chunks(doc: &[u8], size: usize) -> Vec<ParseEvent> {
    let mut parser = StreamingXmlParser::new(EventRecorder::new());
    for chunk in doc.chunks(size) {
        parser.feed(chunk, false).unwrap();
    }
    parser.feed(&[], true).unwrap();
    assert!(parser.is_finished());
    assert_eq!(parser.path(), "");
    parser.into_handler().into_events()
}

#[test]
fn report_events_do_not_depend_on_chunking() {
    let doc = MEMCHECK_REPORT.as_bytes();
    let whole = parse_in_chunks(doc, doc.len());
    for size in [1, 5, 13, 100, 4096] {
        assert_eq!(parse_in_chunks(doc, size), whole, "chunk size {size}");
    }
}

#[test]
fn report_paths_follow_nesting() {
    let events = parse_in_chunks(MEMCHECK_REPORT.as_bytes(), 64);
    let frame_fns: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            ParseEvent::End { text, path, .. } if path == "/report/error/stack/frame/fn" => {
                Some(text.as_str())
            }
            _ => None,
        })
        .collect();
    assert_eq!(frame_fns, vec!["main", "malloc", "main", "malloc", "main"]);

    let last = events.last().unwrap();
    assert_eq!(last.path(), "/report");
}

#[test]
fn entities_are_decoded_in_text() {
    let events = parse_in_chunks(MEMCHECK_REPORT.as_bytes(), 3);
    let aux = events
        .iter()
        .find_map(|event| match event {
            ParseEvent::End { name, text, .. } if name == "auxwhat" => Some(text.clone()),
            _ => None,
        })
        .unwrap();
    assert!(aux.ends_with("alloc'd"));
}

#[test]
fn text_is_narrowed_to_last_segment() {
    let mut parser = StreamingXmlParser::new(EventRecorder::new());
    parser.feed(b"<a>hello<b>world</b>tail</a>", true).unwrap();
    let ends: Vec<(String, String)> = parser
        .handler()
        .events()
        .iter()
        .filter_map(|event| match event {
            ParseEvent::End { text, path, .. } => Some((text.clone(), path.clone())),
            ParseEvent::Start { .. } => None,
        })
        .collect();
    assert_eq!(
        ends,
        vec![
            ("world".to_string(), "/a/b".to_string()),
            ("tail".to_string(), "/a".to_string()),
        ]
    );
}

#[test]
fn truncated_report_is_malformed_once() {
    let doc = MEMCHECK_REPORT.as_bytes();
    let cut = &doc[..doc.len() / 2];
    let mut parser = StreamingXmlParser::new(EventRecorder::new());
    parser.feed(cut, false).unwrap();
    let err = parser.feed(&[], true).unwrap_err();
    assert!(matches!(err, FeedError::Malformed(_)));
    assert!(parser.is_finished());
    assert!(!parser.handler().events().is_empty());
}
