//! XML parser error types.

/// The report stream is not well-formed XML.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed XML at byte {offset}: {message}")]
pub struct MalformedXmlError {
    /// Stream offset of the chunk of markup being tokenized when the error was found.
    pub offset: u64,
    /// Description of the problem.
    pub message: String,
}

impl MalformedXmlError {
    pub(crate) fn new(offset: u64, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Error returned by [`StreamingXmlParser::feed`](super::StreamingXmlParser::feed).
#[derive(thiserror::Error, Debug)]
pub enum FeedError<E>
where
    E: std::error::Error + 'static,
{
    /// The input is not well-formed.
    #[error(transparent)]
    Malformed(#[from] MalformedXmlError),
    /// The element handler refused an event.
    #[error(transparent)]
    Handler(E),
}
