//! Error types for the format layer
//!
//! Provides error handling for:
//! - Codec operations (text ↔ [`ConfigObject`](crate::ConfigObject))
//! - Per-file parse and serialize failures reported to callers
//! - Codec lookup by format name

/// Failure raised by a codec, before the file name is known
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}{}", location(*.line, *.column))]
pub struct CodecError {
    /// Human readable reason
    pub message: String,
    /// 1-based line, if derivable
    pub line: Option<usize>,
    /// 1-based column, if derivable
    pub column: Option<usize>,
}

impl CodecError {
    /// Error without position information
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Error pointing at a line (and optionally a column)
    pub fn at(message: impl Into<String>, line: usize, column: Option<usize>) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
            column,
        }
    }

    /// Derive line/column from a byte offset into `content`
    pub fn at_offset(message: impl Into<String>, content: &str, offset: usize) -> Self {
        let offset = offset.min(content.len());
        let before = content.get(..offset).unwrap_or(content);
        let line = before.matches('\n').count() + 1;
        let column = before.rfind('\n').map_or(before.len(), |nl| before.len() - nl - 1) + 1;
        Self::at(message, line, Some(column))
    }
}

fn location(line: Option<usize>, column: Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" (line {line}, column {column})"),
        (Some(line), None) => format!(" (line {line})"),
        _ => String::new(),
    }
}

/// Malformed content in one configuration file
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to parse '{file}' as {format}: {source}")]
pub struct ParseError {
    /// File name inside the bundle
    pub file: String,
    /// Format the file was declared as
    pub format: String,
    /// Codec failure with position
    #[source]
    pub source: CodecError,
}

impl ParseError {
    /// Line of the failure, if known
    #[inline]
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        self.source.line
    }

    /// Column of the failure, if known
    #[inline]
    #[must_use]
    pub fn column(&self) -> Option<usize> {
        self.source.column
    }
}

/// A config object could not be written back as text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to serialize '{file}' as {format}: {source}")]
pub struct SerializeError {
    /// File name inside the bundle
    pub file: String,
    /// Target format
    pub format: String,
    /// Codec failure
    #[source]
    pub source: CodecError,
}

/// No codec registered under the requested name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown config format: '{0}'")]
pub struct UnknownFormatError(pub String);

/// Combined format-layer error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// No codec for the declared format
    #[error(transparent)]
    UnknownFormat(#[from] UnknownFormatError),

    /// File content could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Object could not be written back
    #[error(transparent)]
    Serialize(#[from] SerializeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_error_display_with_location() {
        let err = CodecError::at("unterminated section header", 3, Some(1));
        assert_eq!(err.to_string(), "unterminated section header (line 3, column 1)");
        assert_eq!(CodecError::new("bad").to_string(), "bad");
    }

    #[test]
    fn offset_to_line_column() {
        let content = "a=1\nb=2\nc";
        let err = CodecError::at_offset("x", content, 9);
        assert_eq!((err.line, err.column), (Some(3), Some(2)));

        let err = CodecError::at_offset("x", content, 0);
        assert_eq!((err.line, err.column), (Some(1), Some(1)));
    }

    #[test]
    fn parse_error_names_file() {
        let err = ParseError {
            file: "my.cnf".to_string(),
            format: "ini".to_string(),
            source: CodecError::at("missing ']'", 2, None),
        };
        assert_eq!(err.to_string(), "failed to parse 'my.cnf' as ini: missing ']' (line 2)");
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn error_conversions() {
        let err: FormatError = UnknownFormatError("cue".to_string()).into();
        assert!(matches!(err, FormatError::UnknownFormat(_)));
        assert_eq!(err.to_string(), "unknown config format: 'cue'");
    }
}
