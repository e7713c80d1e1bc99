//! Markup boundary detection for chunked input.
//!
//! The tokenizer only ever sees input that ends right after a complete
//! markup construct. This scanner remembers where it is inside a tag,
//! comment, CDATA section, processing instruction or DOCTYPE across calls,
//! so chunks may be split at any byte.

use std::ops::Range;

const CDATA_OPEN: &[u8] = b"[CDATA[";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Lex {
    #[default]
    Text,
    /// Just consumed `<`.
    Open,
    Tag {
        quote: Option<u8>,
    },
    /// Just consumed `<!`.
    Bang,
    /// Consumed `<!-`.
    BangDash,
    /// Matched this many bytes of `[CDATA[` after `<!`.
    BangCData(usize),
    Comment {
        dashes: u8,
    },
    CData {
        brackets: u8,
    },
    Pi {
        question: bool,
    },
    Doctype {
        depth: u32,
        quote: Option<u8>,
    },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct BoundaryScanner {
    state: Lex,
    /// Stream offset of the next byte to scan.
    position: u64,
    /// Stream offset of the `<` opening the current construct.
    markup_start: u64,
    /// Complete DOCTYPE declarations not yet taken by the tokenizer.
    doctypes: Vec<Range<u64>>,
}

impl BoundaryScanner {
    /// Scan newly received bytes.
    ///
    /// Returns the offset just past the last markup construct that was
    /// completed inside `bytes`, if any.
    pub(crate) fn scan(&mut self, bytes: &[u8]) -> Option<usize> {
        let mut cut = None;
        for (i, &b) in bytes.iter().enumerate() {
            if self.step(b) {
                cut = Some(i + 1);
            }
            self.position += 1;
        }
        cut
    }

    /// Stream offsets of the DOCTYPE declarations completed since the last
    /// call, in order.
    pub(crate) fn take_doctypes(&mut self) -> Vec<Range<u64>> {
        std::mem::take(&mut self.doctypes)
    }

    /// Whether the scanner is currently inside an unfinished construct.
    pub(crate) fn in_markup(&self) -> bool {
        self.state != Lex::Text
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance by one byte. Returns `true` when the byte closes a construct.
    fn step(&mut self, b: u8) -> bool {
        let (next, closed) = match self.state {
            Lex::Text => {
                if b == b'<' {
                    self.markup_start = self.position;
                    (Lex::Open, false)
                } else {
                    (Lex::Text, false)
                }
            }
            Lex::Open => match b {
                b'!' => (Lex::Bang, false),
                b'?' => (Lex::Pi { question: false }, false),
                b'>' => (Lex::Text, true),
                b'"' | b'\'' => (Lex::Tag { quote: Some(b) }, false),
                _ => (Lex::Tag { quote: None }, false),
            },
            Lex::Tag { quote: Some(q) } => {
                if b == q {
                    (Lex::Tag { quote: None }, false)
                } else {
                    (self.state, false)
                }
            }
            Lex::Tag { quote: None } => match b {
                b'>' => (Lex::Text, true),
                b'"' | b'\'' => (Lex::Tag { quote: Some(b) }, false),
                _ => (self.state, false),
            },
            Lex::Bang => match b {
                b'-' => (Lex::BangDash, false),
                b'[' => (Lex::BangCData(1), false),
                _ => Self::doctype_step(0, None, b),
            },
            Lex::BangDash => {
                if b == b'-' {
                    (Lex::Comment { dashes: 0 }, false)
                } else {
                    Self::doctype_step(0, None, b)
                }
            }
            Lex::BangCData(matched) => {
                if b == CDATA_OPEN[matched] {
                    if matched + 1 == CDATA_OPEN.len() {
                        (Lex::CData { brackets: 0 }, false)
                    } else {
                        (Lex::BangCData(matched + 1), false)
                    }
                } else {
                    Self::doctype_step(0, None, b)
                }
            }
            Lex::Comment { dashes } => match b {
                b'-' => (Lex::Comment { dashes: (dashes + 1).min(2) }, false),
                b'>' if dashes >= 2 => (Lex::Text, true),
                _ => (Lex::Comment { dashes: 0 }, false),
            },
            Lex::CData { brackets } => match b {
                b']' => (Lex::CData { brackets: (brackets + 1).min(2) }, false),
                b'>' if brackets >= 2 => (Lex::Text, true),
                _ => (Lex::CData { brackets: 0 }, false),
            },
            Lex::Pi { question } => match b {
                b'>' if question => (Lex::Text, true),
                _ => (Lex::Pi { question: b == b'?' }, false),
            },
            Lex::Doctype { depth, quote } => Self::doctype_step(depth, quote, b),
        };
        if closed && matches!(self.state, Lex::Doctype { .. }) {
            self.doctypes.push(self.markup_start..self.position + 1);
        }
        self.state = next;
        closed
    }

    fn doctype_step(depth: u32, quote: Option<u8>, b: u8) -> (Lex, bool) {
        if let Some(q) = quote {
            let quote = if b == q { None } else { Some(q) };
            return (Lex::Doctype { depth, quote }, false);
        }
        match b {
            b'"' | b'\'' => (Lex::Doctype { depth, quote: Some(b) }, false),
            b'[' => (Lex::Doctype { depth: depth + 1, quote }, false),
            b']' => (Lex::Doctype { depth: depth.saturating_sub(1), quote }, false),
            b'>' if depth == 0 => (Lex::Text, true),
            _ => (Lex::Doctype { depth, quote }, false),
        }
    }
}
