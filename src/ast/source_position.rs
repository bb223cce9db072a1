use std::{fmt, sync::Arc};

/// Where a line came from: the file it was read from (if any) and its
/// 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourcePosition {
    pub file: Option<Arc<str>>,
    pub line: usize,
}

impl SourcePosition {
    pub fn new(file: Option<Arc<str>>, line: usize) -> Self {
        Self { file, line }
    }

    /// Position without a file, used for in-memory sources.
    pub fn line(line: usize) -> Self {
        Self { file: None, line }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}", file, self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}
