//! Slash-delimited element path tracking.

/// The chain of currently open elements, e.g. `/report/error/stack`.
///
/// Stored as one growable buffer plus the offsets where each segment begins,
/// so popping never has to search for the previous `/`.
#[derive(Debug, Clone, Default)]
pub struct ElementPath {
    buf: String,
    marks: Vec<usize>,
}

impl ElementPath {
    /// Create an empty path (no open elements).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `/name` for a newly opened element.
    pub fn push(&mut self, name: &str) {
        self.marks.push(self.buf.len());
        self.buf.push('/');
        self.buf.push_str(name);
    }

    /// Remove the innermost segment, returning `false` if nothing was open.
    pub fn pop(&mut self) -> bool {
        match self.marks.pop() {
            Some(mark) => {
                self.buf.truncate(mark);
                true
            }
            None => false,
        }
    }

    /// Name of the innermost open element.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.marks.last().map(|&mark| &self.buf[mark + 1..])
    }

    /// Number of open elements.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.marks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    /// The joined path. Empty when no element is open.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.marks.clear();
    }
}

impl std::fmt::Display for ElementPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.buf)
    }
}
