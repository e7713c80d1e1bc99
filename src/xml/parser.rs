//! Push-based XML parser emitting path-tagged element events.
//!
//! Bytes may arrive in arbitrary chunks. Complete markup is tokenized with
//! `quick-xml` as soon as it is available; anything after the last complete
//! construct stays buffered until the next [`StreamingXmlParser::feed`].

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::error::{FeedError, MalformedXmlError};
use super::path::ElementPath;
use super::scanner::BoundaryScanner;

/// One attribute of a start tag, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Receiver of element events.
///
/// Callbacks run synchronously inside [`StreamingXmlParser::feed`]. The
/// `path` argument is only valid for the duration of the call.
pub trait ElementHandler {
    /// Error a handler may use to abort the stream.
    type Error: std::error::Error + 'static;

    /// An element was opened. `path` already includes it.
    ///
    /// # Errors
    ///
    /// Returning an error stops event delivery for the rest of the document.
    fn element_start(
        &mut self,
        name: &str,
        attributes: &[Attribute],
        path: &str,
    ) -> Result<(), Self::Error>;

    /// An element was closed. `path` still includes it.
    ///
    /// `text` holds only the character data seen since the previous tag
    /// boundary, not the element's whole text content.
    ///
    /// # Errors
    ///
    /// Returning an error stops event delivery for the rest of the document.
    fn element_end(&mut self, name: &str, text: &str, path: &str) -> Result<(), Self::Error>;
}

/// Owned copy of an element event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    Start {
        name: String,
        attributes: Vec<Attribute>,
        path: String,
    },
    End {
        name: String,
        text: String,
        path: String,
    },
}

impl ParseEvent {
    /// The path the event was delivered with.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Start { path, .. } | Self::End { path, .. } => path,
        }
    }
}

/// Handler that records every event it receives.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Vec<ParseEvent>,
}

impl EventRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[ParseEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<ParseEvent> {
        self.events
    }
}

impl ElementHandler for EventRecorder {
    type Error = std::convert::Infallible;

    fn element_start(
        &mut self,
        name: &str,
        attributes: &[Attribute],
        path: &str,
    ) -> Result<(), Self::Error> {
        self.events.push(ParseEvent::Start {
            name: name.to_string(),
            attributes: attributes.to_vec(),
            path: path.to_string(),
        });
        Ok(())
    }

    fn element_end(&mut self, name: &str, text: &str, path: &str) -> Result<(), Self::Error> {
        self.events.push(ParseEvent::End {
            name: name.to_string(),
            text: text.to_string(),
            path: path.to_string(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Open,
    /// An error was reported; input is discarded until the stream ends.
    Poisoned,
    Finished,
}

/// Incremental SAX-style parser over one logical document.
#[derive(Debug)]
pub struct StreamingXmlParser<H> {
    handler: H,
    path: ElementPath,
    text: String,
    pending: Vec<u8>,
    scanner: BoundaryScanner,
    consumed: u64,
    root_seen: bool,
    state: ParserState,
}

impl<H: ElementHandler> StreamingXmlParser<H> {
    /// Create a parser delivering events to `handler`.
    #[must_use]
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            path: ElementPath::new(),
            text: String::new(),
            pending: Vec::new(),
            scanner: BoundaryScanner::default(),
            consumed: 0,
            root_seen: false,
            state: ParserState::Open,
        }
    }

    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    #[must_use]
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Path of the currently open elements.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Whether the end of the stream has been fed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == ParserState::Finished
    }

    /// Total bytes handed to the tokenizer so far.
    #[must_use]
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Forget all document state so a new stream can be fed.
    ///
    /// The handler is kept as is.
    pub fn reset(&mut self) {
        self.path.clear();
        self.text.clear();
        self.pending.clear();
        self.scanner.reset();
        self.consumed = 0;
        self.root_seen = false;
        self.state = ParserState::Open;
    }

    /// Push the next chunk of the document.
    ///
    /// Pass `is_final = true` exactly once, on the chunk that ends the
    /// stream (it may be empty). Events for every construct completed by
    /// this chunk are delivered before the call returns.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Malformed` the first time the document is found to
    /// be ill-formed and `FeedError::Handler` if the handler rejects an event.
    /// Either way the parser stops delivering events; later chunks are
    /// accepted and discarded.
    pub fn feed(&mut self, bytes: &[u8], is_final: bool) -> Result<(), FeedError<H::Error>> {
        match self.state {
            ParserState::Finished => {
                tracing::warn!(len = bytes.len(), "Ignoring XML fed after end of stream");
                return Ok(());
            }
            ParserState::Poisoned => {
                if is_final {
                    self.state = ParserState::Finished;
                }
                return Ok(());
            }
            ParserState::Open => {}
        }

        let result = self.feed_open(bytes, is_final);
        if result.is_err() {
            self.pending.clear();
            self.state = ParserState::Poisoned;
        }
        if is_final {
            self.state = ParserState::Finished;
        }
        result
    }

    fn feed_open(&mut self, bytes: &[u8], is_final: bool) -> Result<(), FeedError<H::Error>> {
        if !bytes.is_empty() {
            let start = self.pending.len();
            self.pending.extend_from_slice(bytes);
            if let Some(cut) = self.scanner.scan(&self.pending[start..]) {
                let rest = self.pending.split_off(start + cut);
                let complete = std::mem::replace(&mut self.pending, rest);
                self.tokenize(&complete)?;
            }
        }
        if is_final {
            self.finish()?;
        }
        Ok(())
    }

    fn tokenize(&mut self, chunk: &[u8]) -> Result<(), FeedError<H::Error>> {
        let offset = self.consumed;
        self.consumed += chunk.len() as u64;

        // quick-xml cannot see where an internal subset ends once the
        // chunk is cut, so DOCTYPE bytes never reach it.
        let local = |at: u64| {
            usize::try_from(at.saturating_sub(offset)).map_or(chunk.len(), |i| i.min(chunk.len()))
        };
        let mut from = 0;
        for doctype in self.scanner.take_doctypes() {
            let start = local(doctype.start);
            self.tokenize_segment(&chunk[from..start], offset + from as u64)?;
            from = local(doctype.end);
        }
        self.tokenize_segment(&chunk[from..], offset + from as u64)
    }

    fn tokenize_segment(&mut self, chunk: &[u8], offset: u64) -> Result<(), FeedError<H::Error>> {
        let mut reader = Reader::from_reader(chunk);
        let config = reader.config_mut();
        config.trim_text(false);
        config.expand_empty_elements = true;
        // Chunks are tokenized independently, so nesting is checked here
        // against the element path instead.
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(err) => {
                    let at = offset + reader.error_position();
                    return Err(MalformedXmlError::new(at, err.to_string()).into());
                }
            };
            match event {
                Event::Start(e) => {
                    let (name, attributes) = start_parts(&e, offset)?;
                    self.start_element(&name, &attributes, offset)?;
                }
                Event::Empty(e) => {
                    let (name, attributes) = start_parts(&e, offset)?;
                    self.start_element(&name, &attributes, offset)?;
                    self.end_element(&name, offset)?;
                }
                Event::End(e) => {
                    let name = decode_name(e.name().as_ref(), offset)?;
                    self.end_element(&name, offset)?;
                }
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map_err(|err| MalformedXmlError::new(offset, err.to_string()))?;
                    self.characters(&text, offset)?;
                }
                Event::CData(e) => {
                    let text = std::str::from_utf8(e.as_ref()).map_err(|err| {
                        MalformedXmlError::new(offset, format!("invalid UTF-8 in CDATA: {err}"))
                    })?;
                    self.characters(text, offset)?;
                }
                Event::Eof => break,
                // Comments, declarations and PIs carry no element data.
                _ => {}
            }
        }
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &str,
        attributes: &[Attribute],
        offset: u64,
    ) -> Result<(), FeedError<H::Error>> {
        if self.path.is_empty() {
            if self.root_seen {
                return Err(
                    MalformedXmlError::new(offset, format!("second root element <{name}>")).into(),
                );
            }
            self.root_seen = true;
        }
        self.path.push(name);
        let result = self
            .handler
            .element_start(name, attributes, self.path.as_str());
        self.text.clear();
        result.map_err(FeedError::Handler)
    }

    fn end_element(&mut self, name: &str, offset: u64) -> Result<(), FeedError<H::Error>> {
        match self.path.last() {
            Some(open) if open == name => {}
            Some(open) => {
                return Err(MalformedXmlError::new(
                    offset,
                    format!("end tag </{name}> does not match <{open}>"),
                )
                .into());
            }
            None => {
                return Err(
                    MalformedXmlError::new(offset, format!("unexpected end tag </{name}>")).into(),
                );
            }
        }
        let result = self
            .handler
            .element_end(name, &self.text, self.path.as_str());
        self.path.pop();
        self.text.clear();
        result.map_err(FeedError::Handler)
    }

    fn characters(&mut self, text: &str, offset: u64) -> Result<(), MalformedXmlError> {
        if self.path.is_empty() {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(MalformedXmlError::new(
                offset,
                "text outside of the root element",
            ));
        }
        self.text.push_str(text);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), MalformedXmlError> {
        let offset = self.consumed;
        if self.scanner.in_markup() {
            return Err(MalformedXmlError::new(
                offset,
                "stream ended inside markup",
            ));
        }
        if !self.path.is_empty() {
            return Err(MalformedXmlError::new(
                offset,
                format!(
                    "stream ended with {} unclosed element(s), innermost <{}>",
                    self.path.depth(),
                    self.path.last().unwrap_or_default()
                ),
            ));
        }
        if !self.pending.iter().all(u8::is_ascii_whitespace) {
            return Err(MalformedXmlError::new(
                offset,
                "text outside of the root element",
            ));
        }
        if !self.root_seen {
            return Err(MalformedXmlError::new(offset, "no root element"));
        }
        Ok(())
    }
}

fn decode_name(raw: &[u8], offset: u64) -> Result<String, MalformedXmlError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|err| MalformedXmlError::new(offset, format!("invalid UTF-8 in name: {err}")))
}

fn start_parts(
    e: &BytesStart<'_>,
    offset: u64,
) -> Result<(String, Vec<Attribute>), MalformedXmlError> {
    let name = decode_name(e.name().as_ref(), offset)?;
    let mut attributes = Vec::new();
    let mut iter = e.attributes();
    // Duplicates are passed through untouched.
    iter.with_checks(false);
    for attr in iter {
        let attr = attr.map_err(|err| MalformedXmlError::new(offset, err.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|err| MalformedXmlError::new(offset, err.to_string()))?;
        attributes.push(Attribute {
            name: decode_name(attr.key.as_ref(), offset)?,
            value: value.into_owned(),
        });
    }
    Ok((name, attributes))
}
